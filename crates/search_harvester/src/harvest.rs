use std::collections::BTreeSet;
use std::sync::Arc;

use harvest_logging::{harvest_debug, harvest_info, harvest_warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::delay::DelayPolicy;
use crate::fetch::SearchClient;
use crate::persist::PageStore;
use crate::query::SearchQuery;
use crate::record::{normalize, RawRecord};
use crate::retry::RetryPolicy;
use crate::{
    ApiResponse, HarvestError, HarvestReport, MalformedResponseError, PageFailure, PageIndex,
    PageResult, TransportError, TransportFailure,
};

/// Number of documents the provider returns per page.
pub const PAGE_SIZE: u32 = 10;

const STATUS_OK: u16 = 200;

#[derive(Debug, Clone)]
pub struct HarvesterConfig {
    pub page_size: u32,
    pub retry: RetryPolicy,
    pub page_store: Option<PageStore>,
}

impl Default for HarvesterConfig {
    fn default() -> Self {
        Self {
            page_size: PAGE_SIZE,
            retry: RetryPolicy::default(),
            page_store: None,
        }
    }
}

/// Walks every page of a search, one request at a time, and collects the
/// normalized documents. Non-200 pages are recorded and skipped.
pub struct PaginatedHarvester {
    client: Arc<dyn SearchClient>,
    config: HarvesterConfig,
    cancel: Option<CancellationToken>,
}

impl PaginatedHarvester {
    pub fn new(client: Arc<dyn SearchClient>, config: HarvesterConfig) -> Self {
        Self {
            client,
            config,
            cancel: None,
        }
    }

    /// Checked once per page, before the delay; a cancelled run returns the
    /// pages gathered so far with `cancelled` set.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn config(&self) -> &HarvesterConfig {
        &self.config
    }

    /// Requests page 0 and derives the page count from `response.meta.hits`.
    pub async fn estimate_total_pages(&self, query: &SearchQuery) -> Result<u32, HarvestError> {
        let response = self.fetch_with_retry(0, &query.with_page(0)).await?;
        if response.status != STATUS_OK {
            return Err(HarvestError::Transport {
                page: 0,
                source: TransportError::new(
                    TransportFailure::HttpStatus(response.status),
                    "page count request rejected",
                ),
            });
        }

        let document = decode_json(0, &response.body)?;
        let hits = document
            .pointer("/response/meta/hits")
            .and_then(Value::as_u64)
            .ok_or_else(|| malformed(0, MalformedResponseError::MissingField("response.meta.hits".into())))?;

        let pages = hits.div_ceil(u64::from(self.config.page_size.max(1)));
        let pages = u32::try_from(pages).map_err(|_| {
            malformed(0, MalformedResponseError::MissingField("response.meta.hits".into()))
        })?;
        harvest_info!("query matches {hits} documents across {pages} pages");
        Ok(pages)
    }

    /// Fetches pages `0..page_count` in ascending order.
    pub async fn fetch_all_pages(
        &self,
        query: &SearchQuery,
        page_count: u32,
        delay: &mut dyn DelayPolicy,
    ) -> Result<HarvestReport, HarvestError> {
        self.fetch_pages(query, 0..page_count, delay).await
    }

    /// Fetches the given pages in ascending order, each at most once.
    pub async fn fetch_pages(
        &self,
        query: &SearchQuery,
        pages: impl IntoIterator<Item = PageIndex>,
        delay: &mut dyn DelayPolicy,
    ) -> Result<HarvestReport, HarvestError> {
        let pages: BTreeSet<PageIndex> = pages.into_iter().collect();
        let mut report = HarvestReport::new();

        // A bad page directory should fail before any quota is spent.
        if let Some(store) = &self.config.page_store {
            store.ensure_ready()?;
        }

        for page in pages {
            if self.is_cancelled() {
                harvest_info!("harvest cancelled before page {page}");
                report.cancelled = true;
                break;
            }
            delay.wait().await;

            harvest_debug!("requesting page {page}");
            report.pages_requested += 1;
            let response = self.fetch_with_retry(page, &query.with_page(page)).await?;

            match self.page_result(page, &response)? {
                PageResult::Failure { status } => {
                    harvest_warn!("page {page} returned status {status}, skipping");
                    report.record_failure(page, PageFailure::HttpStatus(status));
                }
                PageResult::Success {
                    records,
                    total_hits,
                    ..
                } => {
                    if let Some(hits) = total_hits {
                        if let Some(previous) = report.total_hits.filter(|&prev| prev != hits) {
                            harvest_warn!(
                                "page {page} reports {hits} hits, earlier pages reported {previous}"
                            );
                        }
                        report.total_hits.get_or_insert(hits);
                    }
                    match records.iter().map(normalize).collect::<Result<Vec<_>, _>>() {
                        Ok(normalized) => report.record_page(page, normalized),
                        Err(err) => {
                            harvest_warn!("page {page} has a malformed document: {err}");
                            report
                                .record_failure(page, PageFailure::MalformedDocument(err.to_string()));
                        }
                    }
                }
            }
        }

        harvest_info!(
            "harvest finished: {} records, {} pages requested, failed pages {:?}",
            report.record_count(),
            report.pages_requested,
            report.failed_page_indices()
        );
        Ok(report)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
    }

    async fn fetch_with_retry(
        &self,
        page: PageIndex,
        query: &SearchQuery,
    ) -> Result<ApiResponse, HarvestError> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.client.get(query).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && self.config.retry.allows_another(attempts) => {
                    let backoff = self.config.retry.backoff_for(attempts);
                    harvest_warn!(
                        "page {page} attempt {attempts} failed ({err}), retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => return Err(HarvestError::Transport { page, source: err }),
            }
        }
    }

    /// Classifies a response. A 200 body without `response.docs` is fatal.
    fn page_result(
        &self,
        page: PageIndex,
        response: &ApiResponse,
    ) -> Result<PageResult, HarvestError> {
        if response.status != STATUS_OK {
            return Ok(PageResult::Failure {
                status: response.status,
            });
        }

        let document = decode_json(page, &response.body)?;
        let docs = document
            .pointer("/response/docs")
            .and_then(Value::as_array)
            .ok_or_else(|| malformed(page, MalformedResponseError::MissingField("response.docs".into())))?;
        let records = docs.iter().cloned().map(RawRecord::new).collect();
        let total_hits = document.pointer("/response/meta/hits").and_then(Value::as_u64);

        // The page files are a side output; losing one must not lose the harvest.
        if let Some(store) = &self.config.page_store {
            match store.save(page, &document) {
                Ok(path) => harvest_debug!("saved page {page} to {}", path.display()),
                Err(err) => harvest_warn!("could not save page {page}: {err}"),
            }
        }

        Ok(PageResult::Success {
            status: response.status,
            total_hits,
            records,
        })
    }
}

fn decode_json(page: PageIndex, body: &[u8]) -> Result<Value, HarvestError> {
    serde_json::from_slice(body)
        .map_err(|err| malformed(page, MalformedResponseError::InvalidJson(err.to_string())))
}

fn malformed(page: PageIndex, source: MalformedResponseError) -> HarvestError {
    HarvestError::Malformed { page, source }
}
