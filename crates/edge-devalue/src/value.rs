//! Value graph accepted by the serializer.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, TimeZone};
use serde::Serialize;

/// Conversion hook for non-plain instances (the `toJSON` equivalent).
pub type ToJsonFn = Arc<dyn Fn() -> Value + Send + Sync>;

/// A value in the graph.
///
/// Primitives are compared by value; everything behind an [`ObjectRef`] has
/// identity, so cloning a `Value::Object` shares the underlying node.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A function. Never serializable; carries its name for diagnostics.
    Function(Option<String>),
    /// A symbol. Never serializable; carries its description.
    Symbol(String),
    Object(ObjectRef),
}

/// Property key of a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    String(String),
    Symbol(String),
}

impl PropertyKey {
    /// Get the key as a string, if it is not a symbol.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            Self::Symbol(_) => None,
        }
    }
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

/// Composite value stored behind an [`ObjectRef`].
#[derive(Clone)]
pub enum Object {
    /// A plain record. `null_proto` marks `Object.create(null)` records.
    Record {
        entries: Vec<(PropertyKey, Value)>,
        null_proto: bool,
    },
    /// An ordered sequence. `None` is a hole.
    Array(Vec<Option<Value>>),
    Set(Vec<Value>),
    Map(Vec<(Value, Value)>),
    /// Milliseconds since the Unix epoch.
    Date(f64),
    RegExp { source: String, flags: String },
    /// A boxed primitive (`Object(1)`, `Object("x")`, `Object(true)`).
    Boxed(Value),
    /// A non-plain instance; serializable only through `to_json`.
    Instance {
        class_name: String,
        to_json: Option<ToJsonFn>,
    },
}

/// Shared handle to a composite value.
#[derive(Clone)]
pub struct ObjectRef(Arc<RwLock<Object>>);

impl ObjectRef {
    /// Wrap a composite in a new node with its own identity.
    pub fn new(object: Object) -> Self {
        Self(Arc::new(RwLock::new(object)))
    }

    /// Read access to the node.
    pub fn read(&self) -> RwLockReadGuard<'_, Object> {
        self.0.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write access to the node, used to build cyclic graphs.
    pub fn write(&self) -> RwLockWriteGuard<'_, Object> {
        self.0.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether both handles point at the same node.
    pub fn ptr_eq(&self, other: &ObjectRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Insert or replace a string-keyed property on a record.
    ///
    /// Has no effect on non-record nodes.
    pub fn insert(&self, key: impl Into<PropertyKey>, value: Value) {
        if let Object::Record { entries, .. } = &mut *self.write() {
            let key = key.into();
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some(slot) => slot.1 = value,
                None => entries.push((key, value)),
            }
        }
    }

    /// Append to an array, set or map entry list.
    ///
    /// Maps expect `value` to be a two-element array `[key, value]`; use
    /// [`ObjectRef::map_insert`] instead.
    pub fn push(&self, value: Value) {
        match &mut *self.write() {
            Object::Array(items) => items.push(Some(value)),
            Object::Set(items) => items.push(value),
            _ => {}
        }
    }

    /// Append a key/value pair to a map node.
    pub fn map_insert(&self, key: Value, value: Value) {
        if let Object::Map(entries) = &mut *self.write() {
            entries.push((key, value));
        }
    }
}

impl fmt::Debug for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectRef({:#x})", self.identity())
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Undefined => write!(f, "undefined"),
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => write!(f, "{:?}", s),
            Self::Function(name) => write!(f, "function {}", name.as_deref().unwrap_or("")),
            Self::Symbol(desc) => write!(f, "Symbol({})", desc),
            Self::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl Value {
    /// Create a plain record from string keys.
    pub fn record<K, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::object(Object::Record {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            null_proto: false,
        })
    }

    /// Create a record without a prototype.
    pub fn null_record<K, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::object(Object::Record {
            entries: entries.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            null_proto: true,
        })
    }

    /// Create a dense array.
    pub fn array(items: impl IntoIterator<Item = Value>) -> Self {
        Self::object(Object::Array(items.into_iter().map(Some).collect()))
    }

    /// Create an array which may contain holes.
    pub fn sparse_array(items: impl IntoIterator<Item = Option<Value>>) -> Self {
        Self::object(Object::Array(items.into_iter().collect()))
    }

    /// Create a set.
    pub fn set(items: impl IntoIterator<Item = Value>) -> Self {
        Self::object(Object::Set(items.into_iter().collect()))
    }

    /// Create a map.
    pub fn map(entries: impl IntoIterator<Item = (Value, Value)>) -> Self {
        Self::object(Object::Map(entries.into_iter().collect()))
    }

    /// Create a date from milliseconds since the Unix epoch.
    pub fn date(millis: f64) -> Self {
        Self::object(Object::Date(millis))
    }

    /// Create a regular expression.
    pub fn regexp(source: impl Into<String>, flags: impl Into<String>) -> Self {
        Self::object(Object::RegExp {
            source: source.into(),
            flags: flags.into(),
        })
    }

    /// Box a primitive.
    pub fn boxed(primitive: Value) -> Self {
        Self::object(Object::Boxed(primitive))
    }

    /// Create a non-plain instance with an optional conversion hook.
    pub fn instance(class_name: impl Into<String>, to_json: Option<ToJsonFn>) -> Self {
        Self::object(Object::Instance {
            class_name: class_name.into(),
            to_json,
        })
    }

    /// Create a function value.
    pub fn function(name: impl Into<String>) -> Self {
        Self::Function(Some(name.into()))
    }

    /// Wrap a composite in a fresh node.
    pub fn object(object: Object) -> Self {
        Self::Object(ObjectRef::new(object))
    }

    /// Get the shared node, if this is a composite.
    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Self::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Whether this value has no identity of its own.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Self::Object(_) | Self::Function(_) | Self::Symbol(_))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Self::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(dt: DateTime<Tz>) -> Self {
        Self::date(dt.timestamp_millis() as f64)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::array(items.into_iter().map(Value::from)),
            serde_json::Value::Object(map) => {
                Value::record(map.into_iter().map(|(k, v)| (k, Value::from(v))))
            }
        }
    }
}

/// Convert any serializable type into a tree-shaped [`Value`].
///
/// The result never shares nodes; build shared references with the
/// [`Value`] constructors directly.
pub fn to_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, serde_json::Error> {
    serde_json::to_value(value).map(Value::from)
}
