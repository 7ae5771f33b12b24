#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use search_harvester::{
    ApiResponse, PageIndex, SearchClient, SearchQuery, TransportError, TransportFailure,
};
use serde_json::{json, Value};

pub fn init_logging() {
    harvest_logging::initialize_for_tests();
}

pub fn article(id: u32, author: Option<&str>) -> Value {
    let mut doc = json!({
        "pub_date": format!("2023-05-{:02}T04:00:09+0000", id % 28 + 1),
        "headline": { "main": format!("Article {id}"), "kicker": "Modern Love" },
        "snippet": format!("Snippet {id}"),
        "web_url": format!("https://www.example.com/{id}.html"),
        "byline": { "original": null, "person": [] },
    });
    if let Some(author) = author {
        doc["byline"]["original"] = json!(author);
    }
    doc
}

pub fn page_body(hits: u64, docs: Vec<Value>) -> Value {
    json!({
        "status": "OK",
        "response": {
            "meta": { "hits": hits, "offset": 0 },
            "docs": docs,
        }
    })
}

/// Docs on `page` for a result set of `hits` documents, ten per page.
pub fn docs_for_page(hits: u64, page: PageIndex) -> Vec<Value> {
    let start = u64::from(page) * 10;
    let end = (start + 10).min(hits);
    (start..end)
        .map(|i| article(i as u32, Some(format!("By Writer {i}").as_str())))
        .collect()
}

/// In-memory provider: answers any page of a `hits`-sized result set, with
/// per-page status overrides and an optional number of leading network faults.
pub struct ScriptedClient {
    hits: u64,
    statuses: BTreeMap<PageIndex, u16>,
    bodies: BTreeMap<PageIndex, Value>,
    network_faults: Mutex<u32>,
    calls: Mutex<Vec<Option<PageIndex>>>,
}

impl ScriptedClient {
    pub fn new(hits: u64) -> Self {
        Self {
            hits,
            statuses: BTreeMap::new(),
            bodies: BTreeMap::new(),
            network_faults: Mutex::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_status(mut self, page: PageIndex, status: u16) -> Self {
        self.statuses.insert(page, status);
        self
    }

    pub fn with_body(mut self, page: PageIndex, body: Value) -> Self {
        self.bodies.insert(page, body);
        self
    }

    pub fn with_network_faults(self, count: u32) -> Self {
        *self.network_faults.lock().unwrap() = count;
        self
    }

    pub fn calls(&self) -> Vec<Option<PageIndex>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl SearchClient for ScriptedClient {
    async fn get(&self, query: &SearchQuery) -> Result<ApiResponse, TransportError> {
        let page = query.page();
        self.calls.lock().unwrap().push(page);

        {
            let mut faults = self.network_faults.lock().unwrap();
            if *faults > 0 {
                *faults -= 1;
                return Err(TransportError {
                    kind: TransportFailure::Network,
                    message: "connection reset".into(),
                });
            }
        }

        let page = page.unwrap_or(0);
        if let Some(status) = self.statuses.get(&page) {
            return Ok(ApiResponse {
                status: *status,
                body: br#"{"fault":{"faultstring":"rate limit"}}"#.to_vec(),
            });
        }
        let body = self
            .bodies
            .get(&page)
            .cloned()
            .unwrap_or_else(|| page_body(self.hits, docs_for_page(self.hits, page)));
        Ok(ApiResponse {
            status: 200,
            body: serde_json::to_vec(&body).unwrap(),
        })
    }
}

pub type EventLog = std::sync::Arc<Mutex<Vec<String>>>;

/// Wraps a [`ScriptedClient`], logging `get N` for each request into a shared
/// event log and running `after_page` once the response is produced.
pub struct ObservedClient {
    inner: ScriptedClient,
    events: EventLog,
    after_page: Box<dyn Fn(PageIndex) + Send + Sync>,
}

impl ObservedClient {
    pub fn new(inner: ScriptedClient, events: EventLog) -> Self {
        Self {
            inner,
            events,
            after_page: Box::new(|_| {}),
        }
    }

    pub fn after_page(mut self, hook: impl Fn(PageIndex) + Send + Sync + 'static) -> Self {
        self.after_page = Box::new(hook);
        self
    }
}

#[async_trait::async_trait]
impl SearchClient for ObservedClient {
    async fn get(&self, query: &SearchQuery) -> Result<ApiResponse, TransportError> {
        let page = query.page().unwrap_or(0);
        self.events.lock().unwrap().push(format!("get {page}"));
        let response = self.inner.get(query).await;
        (self.after_page)(page);
        response
    }
}

/// Delay policy that only logs `wait` into the shared event log.
pub struct RecordingDelay {
    pub events: EventLog,
}

#[async_trait::async_trait]
impl search_harvester::DelayPolicy for RecordingDelay {
    async fn wait(&mut self) {
        self.events.lock().unwrap().push("wait".to_string());
    }
}
