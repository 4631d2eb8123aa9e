//! Utility modules shared by the engine and the sources

pub mod http_client;
pub mod url;

pub use http_client::{HttpRequest, HttpResponse, HttpTransport, StandardHttpClient};
pub use url::UrlUtils;
