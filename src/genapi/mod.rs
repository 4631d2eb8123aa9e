//! Generic API adapter and field-mapping engine
//!
//! - [`path`]: path expressions evaluated against JSON documents
//! - [`modifiers`]: the pluggable `|modifier` functions
//! - [`template`]: Jinja templates for URLs, bodies and `@template` values
//! - [`fields`]: canonical field registry
//! - [`endpoint`]: endpoint definitions and request parameters
//! - [`mapper`]: raw payload to canonical records
//! - [`runner`]: cache-backed fetching for one source
//! - [`merge`]: deduplication of channel lists

pub mod endpoint;
pub mod fields;
pub mod mapper;
pub mod merge;
pub mod modifiers;
pub mod path;
pub mod runner;
pub mod template;

pub use endpoint::{Endpoint, EndpointConfig, MappingSource, RequestParams};
pub use fields::Schema;
pub use mapper::FieldMapper;
pub use merge::merge_channel_lists;
pub use modifiers::{Modifier, ModifierRegistry};
pub use path::{PathExpression, PathResolver};
pub use runner::{EndpointRun, FetchedPayload, GenApi, GenApiBuilder, PayloadOrigin};
pub use template::TemplateExpander;
