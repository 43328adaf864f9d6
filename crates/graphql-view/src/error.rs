use std::borrow::Cow;

use http::{header::ALLOW, HeaderMap, HeaderValue, StatusCode};

/// A failure detected by the adapter before anything reaches the engine.
///
/// Every variant is answered with the uniform `{"errors": [..]}` envelope at
/// [`RequestError::status_code`].
#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("POST body sent invalid JSON.")]
    MalformedJson(#[source] serde_json::Error),
    #[error("POST body sent invalid form data.")]
    MalformedForm(#[source] multer::Error),
    #[error("Bad request: GraphQL request is not well formed: {0}")]
    NotWellFormed(String),
    #[error("Request body could not be read.")]
    UnreadableBody(#[source] axum::Error),
    #[error("Batch GraphQL requests are not enabled.")]
    BatchNotAllowed,
    #[error("Received an empty list in the batch request.")]
    EmptyBatch,
    #[error("GraphQL params should be a dict. Received {0}.")]
    ParamsNotAnObject(serde_json::Value),
    #[error("Must provide query string.")]
    MissingQuery,
    #[error("Variables are invalid JSON.")]
    InvalidVariablesJson,
    #[error("GraphQL only supports GET and POST requests.")]
    UnsupportedMethod,
}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::UnsupportedMethod => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Extra headers sent along the error envelope.
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let RequestError::UnsupportedMethod = self {
            headers.insert(ALLOW, HeaderValue::from_static("GET, POST"));
        }

        headers
    }

    pub fn to_graphql_error(&self) -> GraphqlError {
        GraphqlError::new(self.to_string())
    }
}

/// An error as reported by the engine, or by the adapter itself.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphqlError {
    pub message: Cow<'static, str>,
    pub locations: Vec<Location>,
    pub path: Option<Vec<PathSegment>>,
    // Serialized as a map, but kept as a Vec for efficiency.
    pub extensions: Vec<(Cow<'static, str>, serde_json::Value)>,
}

impl GraphqlError {
    pub fn new(message: impl Into<Cow<'static, str>>) -> Self {
        GraphqlError {
            message: message.into(),
            locations: Vec::new(),
            path: None,
            extensions: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Location) -> Self {
        self.locations.push(location);
        self
    }

    #[must_use]
    pub fn with_locations(mut self, locations: impl IntoIterator<Item = Location>) -> Self {
        self.locations.extend(locations);
        self
    }

    #[must_use]
    pub fn with_path(mut self, path: impl IntoIterator<Item = PathSegment>) -> Self {
        self.path = Some(path.into_iter().collect());
        self
    }

    #[must_use]
    pub fn with_extension(mut self, key: impl Into<Cow<'static, str>>, value: impl Into<serde_json::Value>) -> Self {
        self.extensions.push((key.into(), value.into()));
        self
    }
}

impl std::fmt::Display for GraphqlError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.message.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Location {
    pub line: u32,
    pub column: u32,
}

impl Location {
    pub fn new(line: u32, column: u32) -> Self {
        Location { line, column }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum PathSegment {
    Field(String),
    Index(usize),
}

impl From<&str> for PathSegment {
    fn from(field: &str) -> Self {
        PathSegment::Field(field.to_owned())
    }
}

impl From<String> for PathSegment {
    fn from(field: String) -> Self {
        PathSegment::Field(field)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}
