//! Path modifiers
//!
//! A modifier post-processes whatever a path expression resolved to, e.g.
//! `nested.categories|categories` or `@literal:"yes"`. Modifiers live in a
//! [`ModifierRegistry`] that is built once at startup and handed to the
//! [`PathResolver`](super::path::PathResolver); nothing is registered
//! globally.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Value, json};

use crate::errors::{ResolveError, ResolveResult};

/// A named transformation applied to a resolved value.
pub trait Modifier: Send + Sync {
    /// Name used after the pipe in path expressions
    fn name(&self) -> &'static str;

    /// Whether `name:argument` is mandatory for this modifier
    fn requires_argument(&self) -> bool {
        false
    }

    /// Transform the resolved value.
    ///
    /// `input` is `None` when the path did not resolve. Returning `Ok(None)`
    /// means "not found" and the field is left out of the record.
    fn apply(&self, input: Option<&Value>, argument: Option<&str>) -> ResolveResult<Option<Value>>;
}

/// Ignores the resolved value and yields its argument.
///
/// The argument is read as JSON when it parses (`"yes"`, `true`, `42`) and
/// as a plain string otherwise.
pub struct LiteralModifier;

impl Modifier for LiteralModifier {
    fn name(&self) -> &'static str {
        "literal"
    }

    fn requires_argument(&self) -> bool {
        true
    }

    fn apply(&self, _input: Option<&Value>, argument: Option<&str>) -> ResolveResult<Option<Value>> {
        let Some(argument) = argument else {
            return Ok(None);
        };
        let value = serde_json::from_str::<Value>(argument)
            .unwrap_or_else(|_| Value::String(argument.to_string()));
        Ok(Some(value))
    }
}

/// Turns an array of strings into category records `[{"text": ...}]`.
pub struct CategoriesModifier;

impl Modifier for CategoriesModifier {
    fn name(&self) -> &'static str {
        "categories"
    }

    fn apply(&self, input: Option<&Value>, _argument: Option<&str>) -> ResolveResult<Option<Value>> {
        let Some(input) = input else {
            return Ok(None);
        };
        let Value::Array(entries) = input else {
            return Err(ResolveError::malformed(
                self.name(),
                input,
                "expected an array of strings",
            ));
        };

        let mut categories = Vec::with_capacity(entries.len());
        for entry in entries {
            match entry {
                Value::String(text) => categories.push(json!({ "text": text })),
                _ => {
                    return Err(ResolveError::malformed(
                        self.name(),
                        input,
                        "expected an array of strings",
                    ));
                }
            }
        }
        Ok(Some(Value::Array(categories)))
    }
}

/// Lookup table of modifiers by name
#[derive(Clone, Default)]
pub struct ModifierRegistry {
    modifiers: HashMap<String, Arc<dyn Modifier>>,
}

impl ModifierRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding `literal` and `categories`
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(LiteralModifier));
        registry.register(Arc::new(CategoriesModifier));
        registry
    }

    /// Add a modifier, replacing any previous one with the same name
    pub fn register(&mut self, modifier: Arc<dyn Modifier>) {
        self.modifiers.insert(modifier.name().to_string(), modifier);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Modifier>> {
        self.modifiers.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modifiers.contains_key(name)
    }

    /// Registered names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modifiers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for ModifierRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModifierRegistry")
            .field("modifiers", &self.names())
            .finish()
    }
}
