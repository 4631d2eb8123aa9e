//! Catalogue sources
//!
//! Every source is a [`GenericSource`] compiled from configuration; the
//! Untold preset only supplies defaults for it.

pub mod aggregator;
pub mod factory;
pub mod generic;
pub mod traits;
pub mod untold;

pub use aggregator::{FetchSummary, SourceAggregator, SourceReport};
pub use factory::{SourceContext, SourceFactory};
pub use generic::GenericSource;
pub use traits::{CatalogSource, CollectedChannels};
