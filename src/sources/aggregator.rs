//! Multi-source channel aggregation

use std::fmt;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{info, warn};

use super::traits::CatalogSource;
use crate::errors::ApiError;
use crate::genapi::merge_channel_lists;
use crate::models::ChannelList;

/// Outcome of one source in an aggregation run
#[derive(Debug)]
pub struct SourceReport {
    pub source: String,
    pub lists: usize,
    pub channels: usize,
    pub errors: Vec<ApiError>,
}

impl SourceReport {
    pub fn failed(&self) -> bool {
        self.lists == 0 && !self.errors.is_empty()
    }
}

/// Per-source results of an aggregation run
#[derive(Debug, Default)]
pub struct FetchSummary {
    pub reports: Vec<SourceReport>,
}

impl FetchSummary {
    pub fn fetched(&self) -> usize {
        self.reports.iter().filter(|r| !r.failed()).count()
    }

    pub fn failed(&self) -> usize {
        self.reports.iter().filter(|r| r.failed()).count()
    }

    /// Every error from every source, with the source name
    pub fn errors(&self) -> impl Iterator<Item = (&str, &ApiError)> {
        self.reports
            .iter()
            .flat_map(|r| r.errors.iter().map(move |e| (r.source.as_str(), e)))
    }
}

impl fmt::Display for FetchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} sources fetched, {} failed", self.fetched(), self.failed())
    }
}

/// Fetches channels from several sources and merges them
pub struct SourceAggregator {
    sources: Vec<Arc<dyn CatalogSource>>,
}

impl SourceAggregator {
    pub fn new(sources: Vec<Arc<dyn CatalogSource>>) -> Self {
        Self { sources }
    }

    pub fn sources(&self) -> &[Arc<dyn CatalogSource>] {
        &self.sources
    }

    pub fn source(&self, name: &str) -> Option<&Arc<dyn CatalogSource>> {
        self.sources.iter().find(|s| s.name() == name)
    }

    /// Query all sources concurrently and merge their channels in source
    /// order. Failing sources are reported in the summary, never fatal.
    pub async fn find_all_channels(&self) -> (ChannelList, FetchSummary) {
        let results = join_all(self.sources.iter().map(|s| s.find_all_channels())).await;

        let mut summary = FetchSummary::default();
        let mut lists = Vec::new();
        for (source, collected) in self.sources.iter().zip(results) {
            for error in &collected.errors {
                warn!(source = source.name(), error = %error, "Source reported an error");
            }
            summary.reports.push(SourceReport {
                source: source.name().to_string(),
                lists: collected.lists.len(),
                channels: collected.channel_count(),
                errors: collected.errors,
            });
            lists.extend(collected.lists);
        }

        let merged = merge_channel_lists(lists);
        info!("{summary} ({} channels)", merged.len());
        (merged, summary)
    }
}
