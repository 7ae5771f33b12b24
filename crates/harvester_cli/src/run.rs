use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use harvest_logging::{harvest_info, harvest_warn};
use search_harvester::{
    export_partitions, partition_by_special_author, ExportOptions, HarvesterConfig,
    PaginatedHarvester, PageIndex, PageStore, ReqwestSearchClient, SearchQuery,
};
use tokio_util::sync::CancellationToken;

use crate::config::CliConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub total_pages: u32,
    pub pages_requested: u32,
    pub primary_count: usize,
    pub secondary_count: usize,
    pub failed_pages: Vec<PageIndex>,
    pub cancelled: bool,
    pub primary_path: Option<PathBuf>,
    pub secondary_path: Option<PathBuf>,
}

/// Estimate, harvest, optionally retry failed pages once, partition, export.
pub async fn run(
    config: &CliConfig,
    api_key: &str,
    estimate_only: bool,
    cancel: CancellationToken,
) -> anyhow::Result<RunSummary> {
    let client = ReqwestSearchClient::new(&config.base_url, config.fetch_settings())
        .context("building search client")?;
    let harvester_config = HarvesterConfig {
        retry: config.retry,
        page_store: config
            .page_dir
            .clone()
            .map(|dir| PageStore::new(dir, config.page_prefix.clone())),
        ..HarvesterConfig::default()
    };
    let harvester =
        PaginatedHarvester::new(Arc::new(client), harvester_config).with_cancellation(cancel);
    let query = SearchQuery::new()
        .with_api_key(api_key)
        .with_filter(config.filter.as_str());

    let total_pages = harvester.estimate_total_pages(&query).await?;
    let page_count = match config.max_pages {
        Some(limit) if limit < total_pages => {
            harvest_info!("limiting harvest to {limit} of {total_pages} pages");
            limit
        }
        _ => total_pages,
    };

    let mut summary = RunSummary {
        total_pages,
        pages_requested: 0,
        primary_count: 0,
        secondary_count: 0,
        failed_pages: Vec::new(),
        cancelled: false,
        primary_path: None,
        secondary_path: None,
    };
    if estimate_only {
        return Ok(summary);
    }

    let mut delay = config.delay.build();
    let mut report = harvester
        .fetch_all_pages(&query, page_count, delay.as_mut())
        .await?;

    if config.retry_failed_pages && !report.cancelled && !report.failed_page_indices().is_empty() {
        let failed = report.failed_page_indices();
        harvest_info!("retrying {} failed pages", failed.len());
        let retry = harvester.fetch_pages(&query, failed, delay.as_mut()).await?;
        report.merge(retry);
    }

    summary.pages_requested = report.pages_requested;
    summary.failed_pages = report.failed_page_indices().into_iter().collect();
    summary.cancelled = report.cancelled;
    if !summary.failed_pages.is_empty() {
        harvest_warn!("pages still missing: {:?}", summary.failed_pages);
    }

    let (primary, secondary) =
        partition_by_special_author(report.into_records(), &config.sentinel_author);
    let options = ExportOptions::with_stem(&config.csv_stem, &config.secondary_label);
    let exported = export_partitions(&config.output_dir, &options, &primary, &secondary)
        .context("writing csv output")?;
    harvest_info!(
        "wrote {} records to {} and {} to {}",
        exported.primary_count,
        exported.primary_path.display(),
        exported.secondary_count,
        exported.secondary_path.display()
    );

    summary.primary_count = exported.primary_count;
    summary.secondary_count = exported.secondary_count;
    summary.primary_path = Some(exported.primary_path);
    summary.secondary_path = Some(exported.secondary_path);
    Ok(summary)
}
