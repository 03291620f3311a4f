//! Two-pass serializer: count references, then stringify.

use std::collections::HashMap;

use tracing::warn;

use crate::escape::{regexp_literal, safe_key, safe_prop, stringify_string};
use crate::names::get_name;
use crate::value::{Object, ObjectRef, PropertyKey, Value};

/// Default number of rejection warnings logged per serialization.
pub const DEFAULT_MAX_WARNINGS: usize = 100;

/// Identity of a value for reference counting.
///
/// Primitives are keyed by value, composites by node address. Negative zero
/// keeps its own key so it never aliases a positive zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Identity {
    Undefined,
    Null,
    Bool(bool),
    Number(u64),
    String(String),
    Object(usize),
}

fn identity(value: &Value) -> Option<Identity> {
    Some(match value {
        Value::Undefined => Identity::Undefined,
        Value::Null => Identity::Null,
        Value::Bool(b) => Identity::Bool(*b),
        Value::Number(n) if n.is_nan() => Identity::Number(f64::NAN.to_bits()),
        Value::Number(n) => Identity::Number(n.to_bits()),
        Value::String(s) => Identity::String(s.clone()),
        Value::Object(obj) => Identity::Object(obj.identity()),
        Value::Function(_) | Value::Symbol(_) => return None,
    })
}

/// Whether a value has no script representation at all.
fn is_unserializable(value: &Value) -> bool {
    match value {
        Value::Function(_) | Value::Symbol(_) => true,
        Value::Object(obj) => matches!(&*obj.read(), Object::Instance { to_json: None, .. }),
        _ => false,
    }
}

/// Serializer with bounded diagnostics.
///
/// A serializer can be reused; names and counts are scoped to a single
/// [`Serializer::serialize`] call, warnings accumulate.
#[derive(Debug)]
pub struct Serializer {
    max_warnings: usize,
    warnings: Vec<String>,
}

impl Default for Serializer {
    fn default() -> Self {
        Self::new()
    }
}

impl Serializer {
    /// Create a serializer with the default warning limit.
    pub fn new() -> Self {
        Self {
            max_warnings: DEFAULT_MAX_WARNINGS,
            warnings: Vec::new(),
        }
    }

    /// Set the maximum number of warnings logged.
    pub fn max_warnings(mut self, max: usize) -> Self {
        self.max_warnings = max;
        self
    }

    /// Warnings logged so far.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Serialize a value into a self-contained expression.
    pub fn serialize(&mut self, value: &Value) -> String {
        let mut pass = Pass {
            counts: Vec::new(),
            index: HashMap::new(),
            names: HashMap::new(),
            ordered: Vec::new(),
            serializer: self,
        };
        pass.walk(value);
        pass.assign_names();
        pass.finish(value)
    }

    fn log(&mut self, message: String) {
        if self.warnings.len() < self.max_warnings {
            warn!(target: "edge_devalue", "{}", message);
            self.warnings.push(message);
        }
    }
}

/// Serialize a value with default settings.
pub fn serialize(value: &Value) -> String {
    Serializer::new().serialize(value)
}

struct Pass<'a> {
    /// Occurrence counts in first-seen order.
    counts: Vec<(Identity, usize, Value)>,
    index: HashMap<Identity, usize>,
    names: HashMap<Identity, String>,
    /// Named values in name order.
    ordered: Vec<(String, Value)>,
    serializer: &'a mut Serializer,
}

impl Pass<'_> {
    fn walk(&mut self, value: &Value) {
        let Some(id) = identity(value) else {
            match value {
                Value::Function(name) => self.serializer.log(format!(
                    "Cannot stringify a function {}",
                    name.as_deref().unwrap_or_default()
                )),
                Value::Symbol(desc) => self
                    .serializer
                    .log(format!("Cannot stringify a symbol Symbol({})", desc)),
                _ => {}
            }
            return;
        };

        if let Some(&i) = self.index.get(&id) {
            self.counts[i].1 += 1;
            return;
        }
        self.index.insert(id.clone(), self.counts.len());
        self.counts.push((id, 1, value.clone()));

        let Value::Object(obj) = value else {
            return;
        };
        let node = obj.read().clone();
        match node {
            Object::Date(_) | Object::RegExp { .. } | Object::Boxed(_) => {}
            Object::Array(items) => {
                for item in items.iter().flatten() {
                    self.walk(item);
                }
            }
            Object::Set(items) => {
                for item in &items {
                    self.walk(item);
                }
            }
            Object::Map(entries) => {
                for (k, v) in &entries {
                    self.walk(k);
                    self.walk(v);
                }
            }
            Object::Instance {
                class_name,
                to_json,
            } => {
                if to_json.is_none() {
                    self.serializer.log(format!(
                        "Cannot stringify arbitrary non-POJOs {}",
                        class_name
                    ));
                }
            }
            Object::Record { entries, .. } => {
                let symbols: Vec<String> = entries
                    .iter()
                    .filter_map(|(k, _)| match k {
                        PropertyKey::Symbol(desc) => Some(format!("Symbol({})", desc)),
                        PropertyKey::String(_) => None,
                    })
                    .collect();
                if !symbols.is_empty() {
                    self.serializer.log(format!(
                        "Cannot stringify POJOs with symbolic keys {}",
                        symbols.join(",")
                    ));
                }
                for (key, v) in &entries {
                    if key.as_str().is_some() {
                        self.walk(v);
                    }
                }
            }
        }
    }

    fn assign_names(&mut self) {
        let mut repeated: Vec<&(Identity, usize, Value)> = self
            .counts
            .iter()
            .filter(|(_, count, value)| *count > 1 && !is_unserializable(value))
            .collect();
        // Stable: ties keep first-seen order.
        repeated.sort_by(|a, b| b.1.cmp(&a.1));

        for (i, (id, _, value)) in repeated.into_iter().enumerate() {
            let name = get_name(i);
            self.names.insert(id.clone(), name.clone());
            self.ordered.push((name, value.clone()));
        }
    }

    fn finish(&mut self, value: &Value) -> String {
        let main = self.stringify(value);
        if self.names.is_empty() {
            return main;
        }

        let named = std::mem::take(&mut self.ordered);
        let mut params = Vec::with_capacity(named.len());
        let mut values = Vec::with_capacity(named.len());
        // Replacement assignments run before any container is populated.
        let mut assignments = Vec::new();
        let mut statements = Vec::new();

        for (name, value) in &named {
            params.push(name.clone());
            let Value::Object(obj) = value else {
                values.push(stringify_primitive(value));
                continue;
            };
            let node = obj.read().clone();
            match node {
                Object::Boxed(inner) => {
                    values.push(format!("Object({})", stringify_primitive(&inner)))
                }
                Object::RegExp { source, flags } => values.push(regexp_literal(&source, &flags)),
                Object::Date(ms) => values.push(format!("new Date({})", stringify_number(ms))),
                Object::Array(items) => {
                    values.push(format!("Array({})", items.len()));
                    for (i, item) in items.iter().enumerate() {
                        if let Some(item) = item {
                            statements.push(format!("{}[{}]={}", name, i, self.stringify(item)));
                        }
                    }
                }
                Object::Set(items) => {
                    values.push("new Set".to_string());
                    if !items.is_empty() {
                        let adds: Vec<String> = items
                            .iter()
                            .map(|v| format!("add({})", self.stringify(v)))
                            .collect();
                        statements.push(format!("{}.{}", name, adds.join(".")));
                    }
                }
                Object::Map(entries) => {
                    values.push("new Map".to_string());
                    if !entries.is_empty() {
                        let sets: Vec<String> = entries
                            .iter()
                            .map(|(k, v)| format!("set({}, {})", self.stringify(k), self.stringify(v)))
                            .collect();
                        statements.push(format!("{}.{}", name, sets.join(".")));
                    }
                }
                Object::Instance { .. } => {
                    values.push("void 0".to_string());
                    let expr = self.stringify_object(obj);
                    assignments.push(format!("{}={}", name, expr));
                }
                Object::Record {
                    entries,
                    null_proto,
                } => {
                    values.push(if null_proto { "Object.create(null)" } else { "{}" }.to_string());
                    for (key, v) in &entries {
                        let Some(key) = key.as_str() else { continue };
                        if is_unserializable(v) {
                            continue;
                        }
                        statements.push(format!("{}{}={}", name, safe_prop(key), self.stringify(v)));
                    }
                }
            }
        }

        assignments.append(&mut statements);
        assignments.push(format!("return {}", main));
        format!(
            "(function({}){{{}}}({}))",
            params.join(","),
            assignments.join(";"),
            values.join(",")
        )
    }

    fn stringify(&mut self, value: &Value) -> String {
        if let Some(name) = identity(value).and_then(|id| self.names.get(&id)) {
            return name.clone();
        }
        match value {
            Value::Function(_) | Value::Symbol(_) => "void 0".to_string(),
            Value::Object(obj) => self.stringify_object(obj),
            _ => stringify_primitive(value),
        }
    }

    fn stringify_object(&mut self, obj: &ObjectRef) -> String {
        let node = obj.read().clone();
        match node {
            Object::Boxed(inner) => format!("Object({})", self.stringify(&inner)),
            Object::RegExp { source, flags } => regexp_literal(&source, &flags),
            Object::Date(ms) => format!("new Date({})", stringify_number(ms)),
            Object::Array(items) => {
                let members: Vec<String> = items
                    .iter()
                    .map(|item| item.as_ref().map(|v| self.stringify(v)).unwrap_or_default())
                    .collect();
                let tail = match items.last() {
                    None | Some(Some(_)) => "",
                    Some(None) => ",",
                };
                format!("[{}{}]", members.join(","), tail)
            }
            Object::Set(items) => {
                let members: Vec<String> = items.iter().map(|v| self.stringify(v)).collect();
                format!("new Set([{}])", members.join(","))
            }
            Object::Map(entries) => {
                let members: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("[{},{}]", self.stringify(k), self.stringify(v)))
                    .collect();
                format!("new Map([{}])", members.join(","))
            }
            Object::Instance {
                to_json: Some(to_json),
                ..
            } => {
                let mut json = to_json();
                if let Value::String(s) = &json {
                    if let Ok(parsed) = serde_json::from_str::<serde_json::Value>(s) {
                        json = Value::from(parsed);
                    }
                }
                self.stringify(&json)
            }
            Object::Instance { to_json: None, .. } => "void 0".to_string(),
            Object::Record {
                entries,
                null_proto,
            } => {
                let fields: Vec<(String, String)> = entries
                    .iter()
                    .filter_map(|(k, v)| k.as_str().map(|k| (k, v)))
                    .filter(|(_, v)| !is_unserializable(v))
                    .map(|(k, v)| (safe_key(k), self.stringify(v)))
                    .collect();

                if !null_proto {
                    let fields: Vec<String> =
                        fields.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
                    return format!("{{{}}}", fields.join(","));
                }
                if fields.is_empty() {
                    return "Object.create(null)".to_string();
                }
                let fields: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}:{{writable:true,enumerable:true,value:{}}}", k, v))
                    .collect();
                format!("Object.create(null,{{{}}})", fields.join(","))
            }
        }
    }
}

fn stringify_primitive(value: &Value) -> String {
    match value {
        Value::Undefined => "void 0".to_string(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => stringify_number(*n),
        Value::String(s) => stringify_string(s),
        Value::Function(_) | Value::Symbol(_) | Value::Object(_) => "void 0".to_string(),
    }
}

/// Number literal in the shortest form that evaluates back to `n`.
pub(crate) fn stringify_number(n: f64) -> String {
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }
    if n == 0.0 {
        return if n.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    let abs = n.abs();
    let s = if !(1e-6..1e21).contains(&abs) {
        let s = format!("{:e}", n);
        match s.find('e') {
            Some(pos) if !s[pos + 1..].starts_with('-') => {
                format!("{}e+{}", &s[..pos], &s[pos + 1..])
            }
            _ => s,
        }
    } else {
        format!("{}", n)
    };

    if let Some(rest) = s.strip_prefix("0.") {
        format!(".{}", rest)
    } else if let Some(rest) = s.strip_prefix("-0.") {
        format!("-.{}", rest)
    } else {
        s
    }
}
