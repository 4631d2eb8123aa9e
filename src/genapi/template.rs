//! Template expander for endpoint paths, queries, bodies and `@template`
//! mapping values.
//!
//! Templates use Jinja syntax (`{{ podID }}`, `{% if page %}...{% endif %}`)
//! with the minijinja builtin filters plus `query_escape`. Undefined
//! variables are errors rather than empty strings.

use std::fmt;

use minijinja::{Environment, UndefinedBehavior};
use serde_json::{Map, Value};
use tracing::{debug, error};

use crate::errors::{ApiError, ApiResult};

/// Renders templates against a variable map
pub struct TemplateExpander {
    env: Environment<'static>,
}

impl fmt::Debug for TemplateExpander {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateExpander").finish_non_exhaustive()
    }
}

impl Default for TemplateExpander {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateExpander {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.add_filter("query_escape", query_escape);
        Self { env }
    }

    /// Whether `template` contains any placeholders or blocks
    pub fn is_templated(template: &str) -> bool {
        template.contains("{{") || template.contains("{%")
    }

    /// Check that `template` parses
    pub fn validate(&self, template: &str) -> ApiResult<()> {
        if !Self::is_templated(template) {
            return Ok(());
        }
        self.env
            .template_from_str(template)
            .map(|_| ())
            .map_err(|e| ApiError::template(template, e))
    }

    /// Render `template` with `vars`
    pub fn expand(&self, template: &str, vars: &Map<String, Value>) -> ApiResult<String> {
        if !Self::is_templated(template) {
            return Ok(template.to_string());
        }

        debug!(template, "Running template");
        self.env.render_str(template, vars).map_err(|e| {
            error!(template, error = %e, "Failed to run template");
            ApiError::template(template, e)
        })
    }
}

fn query_escape(value: String) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}
