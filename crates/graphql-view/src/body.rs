use bytes::Bytes;
use http::{header::CONTENT_TYPE, HeaderMap};
use mediatype::MediaType;
use serde_json::{Map, Value};

use crate::RequestError;

/// How the request body is encoded, from its `Content-Type` essence.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BodyFormat<'a> {
    Graphql,
    Json,
    UrlEncoded,
    /// Keeps the full header value, the boundary is extracted from it.
    Multipart(&'a str),
    Unknown,
}

impl<'a> BodyFormat<'a> {
    pub(crate) fn from_headers(headers: &'a HeaderMap) -> Self {
        let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|value| value.to_str().ok()) else {
            return BodyFormat::Unknown;
        };

        let Ok(media_type) = MediaType::parse(content_type) else {
            return BodyFormat::Unknown;
        };

        let is = |ty: &str, subty: &str| {
            media_type.ty.as_str().eq_ignore_ascii_case(ty) && media_type.subty.as_str().eq_ignore_ascii_case(subty)
        };

        if is("application", "graphql") {
            BodyFormat::Graphql
        } else if is("application", "json") {
            BodyFormat::Json
        } else if is("application", "x-www-form-urlencoded") {
            BodyFormat::UrlEncoded
        } else if is("multipart", "form-data") {
            BodyFormat::Multipart(content_type)
        } else {
            BodyFormat::Unknown
        }
    }
}

/// Extracts the GraphQL payload from a request body.
///
/// The result is either a JSON object shaped like a single operation, a JSON
/// array for batches, or an empty object when the content type carries no
/// GraphQL payload. Any other JSON value is passed through and rejected later
/// by the resolver.
pub(crate) async fn parse(headers: &HeaderMap, body: Bytes) -> Result<Value, RequestError> {
    match BodyFormat::from_headers(headers) {
        BodyFormat::Graphql => {
            let query = String::from_utf8_lossy(&body).into_owned();
            Ok(Value::Object(Map::from_iter([("query".to_owned(), Value::String(query))])))
        }
        BodyFormat::Json => serde_json::from_slice(&body).map_err(RequestError::MalformedJson),
        BodyFormat::UrlEncoded => {
            let fields = serde_urlencoded::from_bytes::<Vec<(String, String)>>(&body)
                .map_err(|err| RequestError::NotWellFormed(err.to_string()))?;

            // Duplicated keys: the last one wins.
            Ok(Value::Object(
                fields
                    .into_iter()
                    .map(|(name, value)| (name, Value::String(value)))
                    .collect(),
            ))
        }
        BodyFormat::Multipart(content_type) => parse_multipart(content_type, body).await,
        BodyFormat::Unknown => Ok(Value::Object(Map::new())),
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<Value, RequestError> {
    let boundary = multer::parse_boundary(content_type).map_err(RequestError::MalformedForm)?;
    let stream = futures::stream::once(async move { Ok::<_, std::convert::Infallible>(body) });
    let mut multipart = multer::Multipart::new(stream, boundary);

    let mut fields = Map::new();

    while let Some(field) = multipart.next_field().await.map_err(RequestError::MalformedForm)? {
        // file uploads are not supported, only plain text fields are kept
        if field.file_name().is_some() {
            continue;
        }

        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        let value = field.text().await.map_err(RequestError::MalformedForm)?;
        fields.insert(name, Value::String(value));
    }

    Ok(Value::Object(fields))
}
