//! Search harvester: paginated fetching, normalization and CSV export.
mod delay;
mod export;
mod fetch;
mod filename;
mod harvest;
mod partition;
mod persist;
mod query;
mod record;
mod retry;
mod types;

pub use delay::{DelayPolicy, DelayPolicySettings, FixedDelay, NoDelay, TokenBucket};
pub use export::{
    export_partitions, render_csv, write_records_csv, ExportError, ExportOptions, ExportSummary,
    CSV_COLUMNS,
};
pub use fetch::{FetchSettings, ReqwestSearchClient, SearchClient};
pub use filename::{csv_filename, page_filename};
pub use harvest::{HarvesterConfig, PaginatedHarvester, PAGE_SIZE};
pub use partition::partition_by_special_author;
pub use persist::{ensure_output_dir, AtomicFileWriter, PageStore, PersistError};
pub use query::{FilterExpr, QueryValue, SearchQuery, API_KEY_PARAM, FILTER_PARAM, PAGE_PARAM};
pub use record::{normalize, NormalizedRecord, RawRecord};
pub use retry::RetryPolicy;
pub use types::{
    ApiResponse, HarvestError, HarvestReport, MalformedResponseError, PageFailure, PageIndex,
    PageResult, TransportError, TransportFailure,
};
