use std::time::Duration;

use axum::{
    body::Body,
    response::{IntoResponse, Response},
};
use http::{
    header::{
        ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE,
        ACCESS_CONTROL_REQUEST_METHOD, ORIGIN,
    },
    HeaderMap, HeaderValue, StatusCode,
};

const ACCEPTED_METHODS: [&str; 4] = ["GET", "POST", "PUT", "DELETE"];

/// Answers a CORS preflight request.
///
/// The requested method must be one of `GET`, `POST`, `PUT` or `DELETE`, in
/// any case, otherwise the preflight is refused with an empty 400.
pub(crate) fn respond(headers: &HeaderMap, max_age: Duration) -> Response {
    let requested_method = headers
        .get(ACCESS_CONTROL_REQUEST_METHOD)
        .and_then(|value| value.to_str().ok())
        .map(str::trim);

    let accepted = requested_method.is_some_and(|method| {
        ACCEPTED_METHODS
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(method))
    });

    if !accepted {
        tracing::debug!(?requested_method, "refusing preflight request");
        return (StatusCode::BAD_REQUEST, Body::empty()).into_response();
    }

    let origin = headers
        .get(ORIGIN)
        .cloned()
        .unwrap_or_else(|| HeaderValue::from_static(""));

    let mut response_headers = HeaderMap::new();
    response_headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    response_headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, PUT, DELETE"),
    );
    response_headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(max_age.as_secs()));

    (StatusCode::OK, response_headers, Body::empty()).into_response()
}
