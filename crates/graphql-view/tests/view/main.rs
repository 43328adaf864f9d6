use axum::{body::Body, Router};
use graphql_mocks::{HelloWorldSchema, MockExecutor};
use graphql_view::{GraphQLView, GraphQLViewBuilder};
use http::{header::CONTENT_TYPE, HeaderMap, Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

mod context;
mod errors;
mod settings;

pub(crate) const BASE_URL: &str = "/graphql";

/// How the view hands operations over to the mock engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Mode {
    Blocking,
    Deferred,
}

pub(crate) fn builder(mode: Mode) -> GraphQLViewBuilder<HelloWorldSchema> {
    let builder = GraphQLView::builder(HelloWorldSchema::default());

    match mode {
        Mode::Blocking => builder,
        Mode::Deferred => builder.async_executor(MockExecutor),
    }
}

pub(crate) fn router(mode: Mode) -> Router {
    builder(mode).build().into_router(BASE_URL)
}

pub(crate) fn url_string(params: &[(&str, &str)]) -> String {
    if params.is_empty() {
        return BASE_URL.to_owned();
    }

    format!("{BASE_URL}?{}", serde_urlencoded::to_string(params).unwrap())
}

pub(crate) fn get(url: &str) -> Request<Body> {
    Request::builder().uri(url).method(Method::GET).body(Body::empty()).unwrap()
}

pub(crate) fn get_with_accept(url: &str, accept: &str) -> Request<Body> {
    Request::builder()
        .uri(url)
        .method(Method::GET)
        .header("Accept", accept)
        .body(Body::empty())
        .unwrap()
}

pub(crate) fn post(url: &str, content_type: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .uri(url)
        .method(Method::POST)
        .header(CONTENT_TYPE, content_type)
        .body(body.into())
        .unwrap()
}

pub(crate) fn post_json(url: &str, body: &Value) -> Request<Body> {
    post(url, "application/json", body.to_string())
}

pub(crate) struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.text).unwrap()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|value| value.to_str().unwrap())
    }
}

pub(crate) async fn execute(router: Router, request: Request<Body>) -> TestResponse {
    let response = router.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = body.collect().await.unwrap().to_bytes();

    TestResponse {
        status: parts.status,
        headers: parts.headers,
        text: String::from_utf8(bytes.to_vec()).unwrap(),
    }
}
