//! PathValue resolver
//!
//! Path expressions are parsed once into a [`PathExpression`] (segment list
//! plus optional modifier) and then evaluated against any number of JSON
//! documents.
//!
//! Grammar:
//!
//! ```text
//! expression := path [ "|" ["@"] modifier ]
//!             | "@" modifier                 (modifier on the document itself)
//! path       := "" | "@this" | segment ( "." segment )*
//! modifier   := name [ ":" argument ]
//! ```
//!
//! A segment is an object key, or an index when the current value is an
//! array. `\.` escapes a dot inside a key. `#` on an array yields its length.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::modifiers::{Modifier, ModifierRegistry};
use crate::errors::{ResolveError, ResolveResult};

const THIS: &str = "@this";

/// A parsed, validated path expression
#[derive(Clone)]
pub struct PathExpression {
    source: String,
    segments: Vec<String>,
    modifier: Option<ModifierCall>,
}

#[derive(Clone)]
struct ModifierCall {
    modifier: Arc<dyn Modifier>,
    argument: Option<String>,
}

impl PathExpression {
    /// The text this expression was parsed from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Name of the trailing modifier, if any
    pub fn modifier_name(&self) -> Option<&'static str> {
        self.modifier.as_ref().map(|call| call.modifier.name())
    }

    /// Whether the expression addresses the whole document
    pub fn is_document(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Debug for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PathExpression")
            .field("source", &self.source)
            .field("segments", &self.segments)
            .field("modifier", &self.modifier_name())
            .finish()
    }
}

/// Parses and evaluates path expressions using an explicit modifier registry
#[derive(Debug, Clone)]
pub struct PathResolver {
    registry: Arc<ModifierRegistry>,
}

impl Default for PathResolver {
    fn default() -> Self {
        Self::new(Arc::new(ModifierRegistry::with_builtins()))
    }
}

impl PathResolver {
    pub fn new(registry: Arc<ModifierRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ModifierRegistry {
        &self.registry
    }

    /// Parse `expression`, checking that its modifier exists and has the
    /// argument it needs.
    pub fn parse(&self, expression: &str) -> ResolveResult<PathExpression> {
        let trimmed = expression.trim();

        let (path, modifier) = if trimmed == THIS || trimmed.starts_with("@this|") {
            let rest = trimmed[THIS.len()..].strip_prefix('|');
            ("", rest)
        } else if let Some(rest) = trimmed.strip_prefix('@') {
            ("", Some(rest))
        } else {
            match find_unescaped(trimmed, '|') {
                Some(i) => (&trimmed[..i], Some(&trimmed[i + 1..])),
                None => (trimmed, None),
            }
        };

        let segments = split_segments(expression, path)?;
        let modifier = modifier
            .map(|text| self.parse_modifier(expression, text))
            .transpose()?;

        Ok(PathExpression {
            source: expression.to_string(),
            segments,
            modifier,
        })
    }

    fn parse_modifier(&self, expression: &str, text: &str) -> ResolveResult<ModifierCall> {
        let text = text.strip_prefix('@').unwrap_or(text);
        let (name, argument) = match text.split_once(':') {
            Some((name, argument)) => (name.trim(), Some(argument.to_string())),
            None => (text.trim(), None),
        };
        if name.is_empty() {
            return Err(ResolveError::invalid(expression, "empty modifier name"));
        }

        let modifier = self
            .registry
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownModifier {
                name: name.to_string(),
                expression: expression.to_string(),
            })?;

        if modifier.requires_argument() && argument.is_none() {
            return Err(ResolveError::invalid(
                expression,
                format!("modifier '{name}' requires an argument"),
            ));
        }

        Ok(ModifierCall { modifier, argument })
    }

    /// Evaluate a parsed expression against `document`.
    ///
    /// `Ok(None)` means not found. JSON `null` counts as not found.
    pub fn resolve(
        &self,
        document: &Value,
        expression: &PathExpression,
    ) -> ResolveResult<Option<Value>> {
        let located = locate(document, &expression.segments).filter(|v| !v.is_null());

        match &expression.modifier {
            Some(call) => {
                let value = call.modifier.apply(located.as_ref(), call.argument.as_deref())?;
                Ok(value.filter(|v| !v.is_null()))
            }
            None => Ok(located),
        }
    }

    /// Parse and evaluate in one go
    pub fn resolve_str(&self, document: &Value, expression: &str) -> ResolveResult<Option<Value>> {
        let parsed = self.parse(expression)?;
        self.resolve(document, &parsed)
    }
}

fn locate(document: &Value, segments: &[String]) -> Option<Value> {
    let mut current = document;
    for segment in segments {
        current = match current {
            Value::Object(map) => map.get(segment)?,
            Value::Array(items) if segment == "#" => {
                return Some(Value::from(items.len()));
            }
            Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(current.clone())
}

fn find_unescaped(text: &str, needle: char) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in text.char_indices() {
        match c {
            '\\' if !escaped => escaped = true,
            c if c == needle && !escaped => return Some(i),
            _ => escaped = false,
        }
    }
    None
}

fn split_segments(expression: &str, path: &str) -> ResolveResult<Vec<String>> {
    if path.is_empty() {
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some(next) => current.push(next),
                None => {
                    return Err(ResolveError::invalid(expression, "dangling escape"));
                }
            },
            '.' => segments.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    segments.push(current);

    if segments.iter().any(String::is_empty) {
        return Err(ResolveError::invalid(expression, "empty path segment"));
    }
    Ok(segments)
}
