//! Endpoint definitions
//!
//! [`EndpointConfig`] is the serde shape found in configuration files and
//! presets. [`Endpoint::compile`] validates it once (templates parse, mapping
//! targets are canonical fields, path expressions and modifiers are valid)
//! and the compiled form is immutable from then on.

use std::collections::BTreeMap;

use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::fields::{FieldDescriptor, Schema};
use super::path::{PathExpression, PathResolver};
use super::template::TemplateExpander;
use crate::errors::{ApiError, ApiResult};

/// Prefix marking a mapping value as a template rather than a path
pub const TEMPLATE_ESCAPE: &str = "@template ";

/// Declarative endpoint definition as written in configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EndpointConfig {
    /// Path template appended to the source base URL
    pub path: String,
    /// Query template merged into the base URL query
    pub query: String,
    /// HTTP method; empty means GET, or POST when a body is set
    pub method: String,
    /// Body template
    pub body: String,
    /// Path expression locating the record array; empty means the document
    #[serde(alias = "root")]
    pub root_path: String,
    /// Canonical field -> path expression, `@literal:...` or `@template ...`
    pub mapping: BTreeMap<String, String>,
}

impl EndpointConfig {
    pub fn new<S: Into<String>>(path: S) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_query<S: Into<String>>(mut self, query: S) -> Self {
        self.query = query.into();
        self
    }

    #[must_use]
    pub fn with_root_path<S: Into<String>>(mut self, root_path: S) -> Self {
        self.root_path = root_path.into();
        self
    }

    #[must_use]
    pub fn with_mapping<I, K, V>(mut self, mapping: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.mapping = mapping
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }
}

/// Where a mapped field's value comes from
#[derive(Debug, Clone)]
pub enum MappingSource {
    Path(PathExpression),
    Template(String),
}

#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub field: &'static FieldDescriptor,
    pub source: MappingSource,
}

/// A validated, immutable endpoint
#[derive(Debug, Clone)]
pub struct Endpoint {
    config: EndpointConfig,
    schema: Schema,
    root: PathExpression,
    mappings: Vec<FieldMapping>,
    method: Method,
}

impl Endpoint {
    /// Validate `config` for producing `schema` records
    pub fn compile(
        config: &EndpointConfig,
        schema: Schema,
        resolver: &PathResolver,
        templates: &TemplateExpander,
    ) -> ApiResult<Self> {
        let describe = |message: String| {
            ApiError::configuration(format!("endpoint '{}': {message}", config.path))
        };

        for template in [&config.path, &config.query, &config.body] {
            templates.validate(template)?;
        }

        let method = resolve_method(&config.method, !config.body.is_empty())
            .ok_or_else(|| describe(format!("invalid method '{}'", config.method)))?;

        let root = resolver
            .parse(&config.root_path)
            .map_err(|e| describe(format!("root path: {e}")))?;

        let mut mappings = Vec::with_capacity(config.mapping.len());
        for (target, expression) in &config.mapping {
            let field = schema
                .lookup(target)
                .ok_or_else(|| describe(format!("unknown {schema:?} field '{target}'")))?;
            if field.read_only {
                return Err(describe(format!("field '{}' cannot be mapped", field.name)));
            }

            let source = match expression.strip_prefix(TEMPLATE_ESCAPE) {
                Some(template) => {
                    templates.validate(template)?;
                    MappingSource::Template(template.to_string())
                }
                None => MappingSource::Path(
                    resolver
                        .parse(expression)
                        .map_err(|e| describe(format!("mapping for '{target}': {e}")))?,
                ),
            };
            mappings.push(FieldMapping { field, source });
        }

        Ok(Self {
            config: config.clone(),
            schema,
            root,
            mappings,
            method,
        })
    }

    pub fn path(&self) -> &str {
        &self.config.path
    }

    pub fn query(&self) -> &str {
        &self.config.query
    }

    pub fn body(&self) -> &str {
        &self.config.body
    }

    pub fn schema(&self) -> Schema {
        self.schema
    }

    pub fn root(&self) -> &PathExpression {
        &self.root
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }

    pub fn config(&self) -> &EndpointConfig {
        &self.config
    }

    /// The method requests are sent with
    pub fn http_method(&self) -> &Method {
        &self.method
    }

    /// Identity of this endpoint: `"[METHOD ]path[?query]"` using the
    /// unexpanded templates. Independent of request parameter values.
    pub fn composite_key(&self) -> String {
        let mut key = String::new();
        if !self.config.method.is_empty() {
            key.push_str(&self.config.method);
            key.push(' ');
        }
        key.push_str(&self.config.path);
        if !self.config.query.is_empty() {
            key.push('?');
            key.push_str(&self.config.query);
        }
        key
    }
}

fn resolve_method(method: &str, has_body: bool) -> Option<Method> {
    let method = method.trim();
    if method.is_empty() {
        return Some(if has_body { Method::POST } else { Method::GET });
    }
    Method::from_bytes(method.to_ascii_uppercase().as_bytes()).ok()
}

/// Request parameters in caller order.
///
/// Order matters: it is reflected in the cache key, so callers must pass
/// the same parameters in the same order to hit the same entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestParams(Vec<(String, Value)>);

impl RequestParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with<K: Into<String>, V: Into<Value>>(mut self, key: K, value: V) -> Self {
        self.push(key, value);
        self
    }

    pub fn push<K: Into<String>, V: Into<Value>>(&mut self, key: K, value: V) {
        self.0.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// `prefix` followed by `key=value` for every parameter, unsorted
    pub fn cache_key(&self, prefix: &str) -> String {
        let mut key = prefix.to_string();
        for (name, value) in &self.0 {
            key.push_str(name);
            key.push('=');
            match value {
                Value::String(s) => key.push_str(s),
                other => key.push_str(&other.to_string()),
            }
        }
        key
    }

    /// Parameters as template variables
    pub fn to_vars(&self) -> Map<String, Value> {
        self.0.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn compile(config: &EndpointConfig, schema: Schema) -> ApiResult<Endpoint> {
        Endpoint::compile(
            config,
            schema,
            &PathResolver::default(),
            &TemplateExpander::new(),
        )
    }

    #[test]
    fn test_compile_resolves_canonical_fields() {
        let config = EndpointConfig::new("/api/v1/podcasts/original").with_mapping([
            ("Title", "name"),
            ("Image.URL", "cover.lg"),
            ("Locked", r#"@literal:"yes""#),
            ("Summary", "@template {{ item.name }} by {{ item.producer }}"),
        ]);
        let endpoint = compile(&config, Schema::Channel).unwrap();

        let targets: Vec<&str> = endpoint.mappings().iter().map(|m| m.field.name).collect();
        assert_eq!(targets, vec!["image.url", "locked", "summary", "title"]);
        assert!(matches!(
            endpoint.mappings()[2].source,
            MappingSource::Template(ref t) if t == "{{ item.name }} by {{ item.producer }}"
        ));
        assert!(endpoint.root().is_document());
    }

    #[test]
    fn test_compile_rejects_unknown_field() {
        let config = EndpointConfig::new("/x").with_mapping([("Producer", "producer")]);
        let err = compile(&config, Schema::Channel).unwrap_err();
        assert!(matches!(err, ApiError::Configuration { .. }));
        assert!(err.to_string().contains("Producer"));
    }

    #[test]
    fn test_compile_rejects_read_only_field() {
        let config = EndpointConfig::new("/x").with_mapping([("_meta.source", "name")]);
        assert!(matches!(
            compile(&config, Schema::Channel),
            Err(ApiError::Configuration { .. })
        ));
    }

    #[test]
    fn test_compile_rejects_bad_expressions() {
        let unknown_modifier = EndpointConfig::new("/x").with_mapping([("title", "name|shout")]);
        assert!(compile(&unknown_modifier, Schema::Channel).is_err());

        let bad_root = EndpointConfig::new("/x").with_root_path("items..list");
        assert!(compile(&bad_root, Schema::Channel).is_err());

        let bad_template = EndpointConfig::new("/podcasts/{{ podID");
        assert!(matches!(
            compile(&bad_template, Schema::Episode),
            Err(ApiError::Template { .. })
        ));
    }

    #[test]
    fn test_method_defaults() {
        let get = compile(&EndpointConfig::new("/x"), Schema::Channel).unwrap();
        assert_eq!(get.http_method(), &Method::GET);

        let post = EndpointConfig {
            body: r#"{"term": "{{ query }}"}"#.into(),
            ..EndpointConfig::new("/search")
        };
        assert_eq!(compile(&post, Schema::Channel).unwrap().http_method(), &Method::POST);

        let explicit = EndpointConfig {
            method: "put".into(),
            ..EndpointConfig::new("/x")
        };
        assert_eq!(compile(&explicit, Schema::Channel).unwrap().http_method(), &Method::PUT);
    }

    #[test]
    fn test_composite_key() {
        let plain = compile(&EndpointConfig::new("/api/v1/hero"), Schema::Channel).unwrap();
        assert_eq!(plain.composite_key(), "/api/v1/hero");

        let full = EndpointConfig {
            method: "GET".into(),
            ..EndpointConfig::new("/api/v1/podcasts/search").with_query("term={{ query }}")
        };
        assert_eq!(
            compile(&full, Schema::Channel).unwrap().composite_key(),
            "GET /api/v1/podcasts/search?term={{ query }}"
        );
    }

    #[test]
    fn test_cache_key_keeps_caller_order() {
        let params = RequestParams::new().with("podID", "abc").with("page", 2);
        assert_eq!(params.cache_key("episodes-"), "episodes-podID=abcpage=2");

        let reversed = RequestParams::new().with("page", 2).with("podID", "abc");
        assert_ne!(params.cache_key("episodes-"), reversed.cache_key("episodes-"));

        assert_eq!(RequestParams::new().cache_key("originals"), "originals");
        assert_eq!(params.to_vars().get("page"), Some(&json!(2)));
    }
}
