use axum::response::{IntoResponse, Response};
use headers::HeaderMapExt;
use http::{header::ALLOW, HeaderMap, HeaderValue, StatusCode};
use serde_json::{Map, Value};

use crate::{
    error::{GraphqlError, PathSegment},
    execution::{ExecutionResult, ResultKind},
};

/// Serializes response bodies.
pub trait JsonEncoder: Send + Sync {
    fn encode(&self, value: &Value, pretty: bool) -> Result<String, serde_json::Error>;
}

/// `serde_json` output: two spaces of indentation when pretty, no whitespace
/// at all otherwise.
#[derive(Debug, Default, Clone, Copy)]
pub struct SerdeJsonEncoder;

impl JsonEncoder for SerdeJsonEncoder {
    fn encode(&self, value: &Value, pretty: bool) -> Result<String, serde_json::Error> {
        if pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        }
    }
}

/// Turns an error into its JSON representation in the `errors` list.
pub trait ErrorFormatter: Send + Sync {
    fn format(&self, error: &GraphqlError) -> Value;
}

impl<F> ErrorFormatter for F
where
    F: Fn(&GraphqlError) -> Value + Send + Sync,
{
    fn format(&self, error: &GraphqlError) -> Value {
        self(error)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorFormatter;

impl ErrorFormatter for DefaultErrorFormatter {
    fn format(&self, error: &GraphqlError) -> Value {
        let mut object = Map::new();
        object.insert("message".into(), Value::String(error.message.clone().into_owned()));

        if !error.locations.is_empty() {
            let locations = error
                .locations
                .iter()
                .map(|location| serde_json::json!({ "line": location.line, "column": location.column }))
                .collect();

            object.insert("locations".into(), Value::Array(locations));
        }

        if let Some(path) = &error.path {
            let path = path
                .iter()
                .map(|segment| match segment {
                    PathSegment::Field(name) => Value::String(name.clone()),
                    PathSegment::Index(index) => Value::from(*index),
                })
                .collect();

            object.insert("path".into(), Value::Array(path));
        }

        if !error.extensions.is_empty() {
            let extensions = error
                .extensions
                .iter()
                .map(|(key, value)| (key.clone().into_owned(), value.clone()))
                .collect();

            object.insert("extensions".into(), Value::Object(extensions));
        }

        Value::Object(object)
    }
}

/// A fully serialized response, ready to be sent as JSON.
#[derive(Debug, Clone)]
pub struct EncodedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl EncodedResponse {
    fn json(status: StatusCode, mut headers: HeaderMap, body: String) -> Self {
        headers.typed_insert(headers::ContentType::json());
        EncodedResponse { status, headers, body }
    }

    fn internal_error() -> Self {
        let body = serde_json::json!({ "errors": [{ "message": "Internal Server Error" }] }).to_string();
        Self::json(StatusCode::INTERNAL_SERVER_ERROR, HeaderMap::new(), body)
    }
}

impl IntoResponse for EncodedResponse {
    fn into_response(self) -> Response {
        (self.status, self.headers, self.body).into_response()
    }
}

/// Status of a whole response, looking at every result.
pub(crate) fn status_for<'a>(results: impl IntoIterator<Item = &'a ExecutionResult>) -> StatusCode {
    let mut status = StatusCode::OK;

    for result in results {
        match result.kind {
            ResultKind::RequestError => return StatusCode::BAD_REQUEST,
            ResultKind::MethodNotAllowed => status = StatusCode::METHOD_NOT_ALLOWED,
            ResultKind::Executed => {}
        }
    }

    status
}

/// Encodes execution results, `None` entries are rendered as `null`.
pub(crate) fn encode(
    results: &[Option<ExecutionResult>],
    is_batch: bool,
    formatter: &dyn ErrorFormatter,
    encoder: &dyn JsonEncoder,
    pretty: bool,
) -> EncodedResponse {
    let status = status_for(results.iter().flatten());

    let mut values = results
        .iter()
        .map(|result| match result {
            Some(result) => format_result(result, formatter),
            None => Value::Null,
        })
        .collect::<Vec<_>>();

    let value = if is_batch {
        Value::Array(values)
    } else {
        values.pop().unwrap_or(Value::Null)
    };

    let mut headers = HeaderMap::new();
    if status == StatusCode::METHOD_NOT_ALLOWED {
        headers.insert(ALLOW, HeaderValue::from_static("POST"));
    }

    match encoder.encode(&value, pretty) {
        Ok(body) => EncodedResponse::json(status, headers, body),
        Err(err) => {
            tracing::error!("Failed to serialize response: {err}");
            EncodedResponse::internal_error()
        }
    }
}

/// The `{"errors": [..]}` envelope of a request failing as a whole.
pub(crate) fn encode_errors(
    errors: &[GraphqlError],
    status: StatusCode,
    headers: HeaderMap,
    formatter: &dyn ErrorFormatter,
    encoder: &dyn JsonEncoder,
) -> EncodedResponse {
    let errors = errors.iter().map(|error| formatter.format(error)).collect();
    let value = Value::Object(Map::from_iter([("errors".to_owned(), Value::Array(errors))]));

    match encoder.encode(&value, false) {
        Ok(body) => EncodedResponse::json(status, headers, body),
        Err(err) => {
            tracing::error!("Failed to serialize response: {err}");
            EncodedResponse::internal_error()
        }
    }
}

fn format_result(result: &ExecutionResult, formatter: &dyn ErrorFormatter) -> Value {
    let mut object = Map::new();

    if !result.errors.is_empty() {
        let errors = result.errors.iter().map(|error| formatter.format(error)).collect();
        object.insert("errors".into(), Value::Array(errors));
    }

    if result.kind == ResultKind::Executed {
        object.insert("data".into(), result.data.clone().unwrap_or(Value::Null));
    }

    Value::Object(object)
}
