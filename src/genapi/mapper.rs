//! Field mapper: raw payload -> canonical records

use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::{debug, trace};

use super::endpoint::{Endpoint, MappingSource};
use super::fields::{META_SOURCE, META_SOURCE_URL};
use super::path::PathResolver;
use super::template::TemplateExpander;
use crate::errors::{ApiError, ApiResult};

/// Applies an endpoint's mapping table to raw payloads of one source
pub struct FieldMapper<'a> {
    resolver: &'a PathResolver,
    templates: &'a TemplateExpander,
    source_name: &'a str,
    base_url: &'a str,
}

impl<'a> FieldMapper<'a> {
    pub fn new(
        resolver: &'a PathResolver,
        templates: &'a TemplateExpander,
        source_name: &'a str,
        base_url: &'a str,
    ) -> Self {
        Self {
            resolver,
            templates,
            source_name,
            base_url,
        }
    }

    /// Decode `raw` into one `T` per element of the endpoint's root array.
    ///
    /// A root that is not an array fails the whole call, as does any
    /// resolver error on any element.
    pub fn decode<T: DeserializeOwned>(&self, endpoint: &Endpoint, raw: &[u8]) -> ApiResult<Vec<T>> {
        let document: Value = serde_json::from_slice(raw)
            .map_err(|e| ApiError::decode(format!("payload is not valid JSON: {e}")))?;

        let items = match self.resolver.resolve(&document, endpoint.root())? {
            Some(Value::Array(items)) => items,
            other => {
                return Err(ApiError::decode(format!(
                    "expected result to be an array, but was {} from root path '{}'",
                    json_type(other.as_ref()),
                    endpoint.root().source()
                )));
            }
        };

        let composite_key = endpoint.composite_key();
        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.iter().enumerate() {
            let mut record = self.map_record(endpoint, item)?;
            stamp_provenance(&mut record, self.source_name, &composite_key);
            trace!(index, record = %serde_json::Value::Object(record.clone()), "Mapped record");

            let typed = serde_json::from_value(Value::Object(record)).map_err(|e| {
                ApiError::decode(format!(
                    "record {index} does not fit the {:?} schema: {e}",
                    endpoint.schema()
                ))
            })?;
            records.push(typed);
        }

        debug!(
            source = self.source_name,
            endpoint = %composite_key,
            count = records.len(),
            "Decoded records"
        );
        Ok(records)
    }

    /// Evaluate every mapping of `endpoint` against one array element.
    /// Fields that resolve to nothing are left out.
    pub fn map_record(&self, endpoint: &Endpoint, item: &Value) -> ApiResult<Map<String, Value>> {
        let mut record = Map::new();
        for mapping in endpoint.mappings() {
            let value = match &mapping.source {
                MappingSource::Path(expression) => self.resolver.resolve(item, expression)?,
                MappingSource::Template(template) => {
                    let rendered = self.templates.expand(template, &self.template_vars(item))?;
                    Some(Value::String(rendered))
                }
            };

            if let Some(value) = value.and_then(|v| mapping.field.kind.coerce(v)) {
                set_path(&mut record, mapping.field.name, value);
            }
        }
        Ok(record)
    }

    fn template_vars(&self, item: &Value) -> Map<String, Value> {
        let mut vars = Map::new();
        vars.insert("item".to_string(), item.clone());
        vars.insert(
            "api".to_string(),
            json!({ "name": self.source_name, "baseUrl": self.base_url }),
        );
        vars
    }
}

/// Tag a mapped record with where it came from. The source URL is only set
/// when the endpoint has a non-empty composite key.
pub fn stamp_provenance(record: &mut Map<String, Value>, source_name: &str, composite_key: &str) {
    set_path(record, META_SOURCE, Value::String(source_name.to_string()));
    if !composite_key.is_empty() {
        set_path(record, META_SOURCE_URL, Value::String(composite_key.to_string()));
    }
}

/// Set a dot-separated `path` in `record`, creating intermediate objects and
/// replacing non-object intermediates.
pub fn set_path(record: &mut Map<String, Value>, path: &str, value: Value) {
    let mut segments = path.split('.').peekable();
    let mut current = record;
    while let Some(segment) = segments.next() {
        if segments.peek().is_none() {
            current.insert(segment.to_string(), value);
            return;
        }
        let entry = current
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        let Value::Object(next) = entry else {
            return;
        };
        current = next;
    }
}

fn json_type(value: Option<&Value>) -> &'static str {
    match value {
        None | Some(Value::Null) => "nothing",
        Some(Value::Bool(_)) => "a boolean",
        Some(Value::Number(_)) => "a number",
        Some(Value::String(_)) => "a string",
        Some(Value::Array(_)) => "an array",
        Some(Value::Object(_)) => "an object",
    }
}
