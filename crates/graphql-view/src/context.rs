use std::{collections::BTreeMap, fmt, sync::Arc};

use http::{HeaderMap, Method, Uri};
use serde_json::Value;

/// Key under which the inbound request is exposed to resolvers.
pub const REQUEST_KEY: &str = "request";

/// The parts of the inbound HTTP request made available to resolvers.
#[derive(Debug, Clone)]
pub struct HttpRequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl HttpRequestInfo {
    /// Value of a URL query parameter, without decoding anything but the
    /// percent encoding.
    pub fn query_param(&self, name: &str) -> Option<String> {
        let query = self.uri.query()?;

        serde_urlencoded::from_str::<Vec<(String, String)>>(query)
            .ok()?
            .into_iter()
            .rev()
            .find_map(|(key, value)| (key == name).then_some(value))
    }
}

#[derive(Debug, Clone)]
pub enum ContextValue {
    Request(Box<HttpRequestInfo>),
    Value(Value),
}

impl fmt::Display for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContextValue::Request(request) => write!(f, "<{} {}>", request.method, request.uri),
            ContextValue::Value(value) => value.fmt(f),
        }
    }
}

/// Values shared with every resolver of the operations of one HTTP request.
///
/// Built fresh for each request, the configured entries are copied and never
/// modified.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    entries: BTreeMap<String, ContextValue>,
}

impl RequestContext {
    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.entries.get(key)
    }

    pub fn value(&self, key: &str) -> Option<&Value> {
        match self.entries.get(key)? {
            ContextValue::Value(value) => Some(value),
            ContextValue::Request(_) => None,
        }
    }

    /// The inbound request, unless the configured context shadows it.
    pub fn request(&self) -> Option<&HttpRequestInfo> {
        match self.entries.get(REQUEST_KEY)? {
            ContextValue::Request(request) => Some(request.as_ref()),
            ContextValue::Value(_) => None,
        }
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContextValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }
}

impl fmt::Display for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;

        for (i, (key, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {value}", Value::String(key.clone()))?;
        }

        f.write_str("}")
    }
}

pub type ContextFactory = dyn Fn(&HttpRequestInfo) -> serde_json::Map<String, Value> + Send + Sync;

/// Where the configured part of a [`RequestContext`] comes from.
#[derive(Clone, Default)]
pub enum ContextSource {
    #[default]
    Empty,
    Map(serde_json::Map<String, Value>),
    /// A non-object value, it cannot carry entries and is ignored.
    Scalar(Value),
    Factory(Arc<ContextFactory>),
}

impl fmt::Debug for ContextSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "Empty"),
            Self::Map(map) => f.debug_tuple("Map").field(map).finish(),
            Self::Scalar(value) => f.debug_tuple("Scalar").field(value).finish(),
            Self::Factory(_) => write!(f, "Factory"),
        }
    }
}

impl From<Value> for ContextSource {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => ContextSource::Map(map),
            Value::Null => ContextSource::Empty,
            other => ContextSource::Scalar(other),
        }
    }
}

impl ContextSource {
    /// A fresh context for one request.
    pub fn build(&self, request: HttpRequestInfo) -> RequestContext {
        let configured = match self {
            ContextSource::Empty | ContextSource::Scalar(_) => serde_json::Map::new(),
            ContextSource::Map(map) => map.clone(),
            ContextSource::Factory(factory) => factory(&request),
        };

        let mut entries = configured
            .into_iter()
            .map(|(key, value)| (key, ContextValue::Value(value)))
            .collect::<BTreeMap<_, _>>();

        entries
            .entry(REQUEST_KEY.to_owned())
            .or_insert_with(|| ContextValue::Request(Box::new(request)));

        RequestContext { entries }
    }
}
