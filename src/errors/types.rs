//! Error type definitions for audio-mirror

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Engine errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Feed serialization errors
    #[error("RSS error: {message}")]
    Rss { message: String },

    /// Feed files could not be written
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the generic API adapter
#[derive(Error, Debug)]
pub enum ApiError {
    /// Invalid or incomplete configuration
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An operation needs an endpoint the source does not define
    #[error("missing endpoint: {endpoint}")]
    MissingEndpoint { endpoint: String },

    /// Template could not be parsed or rendered
    #[error("Template error in '{template}': {message}")]
    Template { template: String, message: String },

    /// URL could not be built
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Request could not be performed or its body read
    #[error("Transport error: {method} {url} - {message}")]
    Transport {
        method: String,
        url: String,
        message: String,
    },

    /// Upstream answered with an error status
    #[error("unsuccessful status-code: {status} from {url}")]
    Status { status: u16, url: String },

    /// Payload did not match what the mapping expects
    #[error("Decode error: {message}")]
    Decode { message: String },

    /// A mapping expression failed to resolve
    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),
}

/// Errors raised while parsing or evaluating path expressions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// Expression text is not valid
    #[error("invalid path expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    /// Expression names a modifier that is not registered
    #[error("unknown modifier '{name}' in expression '{expression}'")]
    UnknownModifier { name: String, expression: String },

    /// A modifier received input of the wrong shape
    #[error("modifier '{modifier}' received malformed input {fragment}: {reason}")]
    MalformedInput {
        modifier: String,
        fragment: String,
        reason: String,
    },
}

impl AppError {
    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }
}

impl ApiError {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a missing endpoint error
    pub fn missing_endpoint<S: Into<String>>(endpoint: S) -> Self {
        Self::MissingEndpoint {
            endpoint: endpoint.into(),
        }
    }

    /// Create a decode error
    pub fn decode<S: Into<String>>(message: S) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Create a template error
    pub fn template<T: Into<String>, M: ToString>(template: T, message: M) -> Self {
        Self::Template {
            template: template.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error came from talking to the upstream rather than from
    /// local configuration or data.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}

impl ResolveError {
    /// Create a malformed input error for `modifier`
    pub fn malformed<M: Into<String>, R: Into<String>>(
        modifier: M,
        fragment: &serde_json::Value,
        reason: R,
    ) -> Self {
        Self::MalformedInput {
            modifier: modifier.into(),
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }

    /// Create an invalid expression error
    pub fn invalid<E: Into<String>, R: Into<String>>(expression: E, reason: R) -> Self {
        Self::InvalidExpression {
            expression: expression.into(),
            reason: reason.into(),
        }
    }
}
