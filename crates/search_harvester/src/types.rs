use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::persist::PersistError;
use crate::record::{NormalizedRecord, RawRecord};

/// Zero-based index of a result page.
pub type PageIndex = u32;

/// Status and body of one completed HTTP exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// Outcome of fetching one page, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub enum PageResult {
    Success {
        status: u16,
        total_hits: Option<u64>,
        records: Vec<RawRecord>,
    },
    Failure {
        status: u16,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct TransportError {
    pub kind: TransportFailure,
    pub message: String,
}

impl TransportError {
    pub(crate) fn new(kind: TransportFailure, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Whether another attempt at the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, TransportFailure::Timeout | TransportFailure::Network)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFailure {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportFailure::InvalidUrl => write!(f, "invalid url"),
            TransportFailure::HttpStatus(code) => write!(f, "http status {code}"),
            TransportFailure::Timeout => write!(f, "timeout"),
            TransportFailure::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            TransportFailure::Network => write!(f, "network error"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedResponseError {
    #[error("response body is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("missing or invalid field `{0}`")]
    MissingField(String),
    #[error("unrecognized date `{0}`")]
    InvalidDate(String),
}

/// Fatal errors; any of these aborts the harvest.
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    #[error("transport error on page {page}: {source}")]
    Transport {
        page: PageIndex,
        #[source]
        source: TransportError,
    },
    #[error("malformed response on page {page}: {source}")]
    Malformed {
        page: PageIndex,
        #[source]
        source: MalformedResponseError,
    },
    #[error("persist error: {0}")]
    Persist(#[from] PersistError),
}

/// Why a page was skipped. Never fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageFailure {
    HttpStatus(u16),
    MalformedDocument(String),
}

impl fmt::Display for PageFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageFailure::HttpStatus(code) => write!(f, "http status {code}"),
            PageFailure::MalformedDocument(reason) => write!(f, "malformed document: {reason}"),
        }
    }
}

/// Normalized records of every successful page plus the pages that were skipped.
///
/// Records are kept per page so that a later retry pass can be merged back in
/// without disturbing page order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HarvestReport {
    pages: BTreeMap<PageIndex, Vec<NormalizedRecord>>,
    failures: BTreeMap<PageIndex, PageFailure>,
    /// `response.meta.hits` as reported by the first successful page.
    pub total_hits: Option<u64>,
    pub pages_requested: u32,
    pub cancelled: bool,
}

impl HarvestReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_page(&mut self, page: PageIndex, records: Vec<NormalizedRecord>) {
        self.failures.remove(&page);
        self.pages.insert(page, records);
    }

    pub(crate) fn record_failure(&mut self, page: PageIndex, failure: PageFailure) {
        self.pages.remove(&page);
        self.failures.insert(page, failure);
    }

    /// All normalized records, ordered by page then by position within the page.
    pub fn records(&self) -> impl Iterator<Item = &NormalizedRecord> {
        self.pages.values().flatten()
    }

    pub fn into_records(self) -> Vec<NormalizedRecord> {
        self.pages.into_values().flatten().collect()
    }

    pub fn record_count(&self) -> usize {
        self.pages.values().map(Vec::len).sum()
    }

    pub fn successful_pages(&self) -> BTreeSet<PageIndex> {
        self.pages.keys().copied().collect()
    }

    pub fn failed_page_indices(&self) -> BTreeSet<PageIndex> {
        self.failures.keys().copied().collect()
    }

    pub fn failures(&self) -> &BTreeMap<PageIndex, PageFailure> {
        &self.failures
    }

    pub fn is_complete(&self) -> bool {
        !self.cancelled && self.failures.is_empty()
    }

    /// Fold a later pass (typically a retry of failed pages) into this report.
    /// Pages present in `other` replace whatever this report held for them.
    pub fn merge(&mut self, other: HarvestReport) {
        for (page, records) in other.pages {
            self.record_page(page, records);
        }
        for (page, failure) in other.failures {
            self.record_failure(page, failure);
        }
        if self.total_hits.is_none() {
            self.total_hits = other.total_hits;
        }
        self.pages_requested += other.pages_requested;
        self.cancelled |= other.cancelled;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(title: &str) -> NormalizedRecord {
        NormalizedRecord {
            pub_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            title: title.to_string(),
            author: None,
            snippet: String::new(),
            web_url: format!("https://example.com/{title}"),
        }
    }

    #[test]
    fn records_follow_page_order_regardless_of_insertion() {
        let mut report = HarvestReport::new();
        report.record_page(2, vec![record("c")]);
        report.record_page(0, vec![record("a"), record("b")]);

        let titles: Vec<_> = report.records().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert_eq!(report.record_count(), 3);
    }

    #[test]
    fn merge_replaces_failed_pages_with_retried_results() {
        let mut first = HarvestReport::new();
        first.pages_requested = 3;
        first.record_page(0, vec![record("a")]);
        first.record_failure(1, PageFailure::HttpStatus(403));
        first.record_page(2, vec![record("c")]);

        let mut retry = HarvestReport::new();
        retry.pages_requested = 1;
        retry.record_page(1, vec![record("b")]);

        first.merge(retry);
        let titles: Vec<_> = first.records().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b", "c"]);
        assert!(first.failed_page_indices().is_empty());
        assert_eq!(first.pages_requested, 4);
        assert!(first.is_complete());
    }

    #[test]
    fn only_network_and_timeout_are_retryable() {
        assert!(TransportError::new(TransportFailure::Timeout, "t").is_retryable());
        assert!(TransportError::new(TransportFailure::Network, "n").is_retryable());
        assert!(!TransportError::new(TransportFailure::HttpStatus(500), "s").is_retryable());
        assert!(!TransportError::new(TransportFailure::InvalidUrl, "u").is_retryable());
    }
}
