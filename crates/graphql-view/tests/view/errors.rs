use axum::body::Body;
use http::{Method, Request, StatusCode};
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use crate::{execute, post, post_json, router, url_string, Mode, BASE_URL};

#[rstest]
#[tokio::test]
async fn handles_batch_correctly_if_is_disabled(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let response = execute(router(mode), post_json(BASE_URL, &json!([]))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "Batch GraphQL requests are not enabled." }] })
    );
}

#[rstest]
#[tokio::test]
async fn handles_incomplete_json_bodies(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let request = post(BASE_URL, "application/json", r#"{"query":"#);

    let response = execute(router(mode), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "POST body sent invalid JSON." }] })
    );
}

#[rstest]
#[tokio::test]
async fn handles_plain_post_text(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let url = url_string(&[("variables", r#"{"who": "Dolly"}"#)]);
    let request = post(&url, "text/plain", "query helloWho($who: String){ test(who: $who) }");

    let response = execute(router(mode), request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "Must provide query string." }] })
    );
}

#[rstest]
#[tokio::test]
async fn handles_json_that_is_not_an_object(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let response = execute(router(mode), post_json(BASE_URL, &json!("{test}"))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "GraphQL params should be a dict. Received \"{test}\"." }] })
    );
}

#[rstest]
#[tokio::test]
async fn handles_unsupported_http_methods(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let request = Request::builder()
        .uri(url_string(&[("query", "{test}")]))
        .method(Method::PUT)
        .body(Body::empty())
        .unwrap();

    let response = execute(router(mode), request).await;

    assert_eq!(response.status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.header("allow"), Some("GET, POST"));
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "GraphQL only supports GET and POST requests." }] })
    );
}

#[tokio::test]
async fn custom_error_formatter_shapes_every_error() {
    let router = crate::builder(Mode::Blocking)
        .error_formatter(|error: &graphql_view::GraphqlError| json!({ "msg": error.message }))
        .build()
        .into_router(BASE_URL);

    let response = execute(router, post_json(BASE_URL, &json!({}))).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), json!({ "errors": [{ "msg": "Must provide query string." }] }));
}

#[rstest]
#[tokio::test]
async fn handles_broken_multipart_bodies(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let truncated = "--boundary\r\nContent-Disposition: form-data; name=\"query\"\r\n\r\n{te";

    for request in [
        post(BASE_URL, "multipart/form-data", "--boundary--\r\n"),
        post(BASE_URL, "multipart/form-data; boundary=boundary", truncated),
    ] {
        let response = execute(router(mode), request).await;

        assert_eq!(response.status, StatusCode::BAD_REQUEST);
        assert_eq!(
            response.json(),
            json!({ "errors": [{ "message": "POST body sent invalid form data." }] })
        );
    }
}

#[rstest]
#[tokio::test]
async fn handles_variables_of_the_wrong_type(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let body = json!({ "query": "query helloWho($who: String){ test(who: $who) }", "variables": [1] });

    let response = execute(router(mode), post_json(BASE_URL, &body)).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.json(),
        json!({ "errors": [{ "message": "Variables are invalid JSON." }] })
    );
}
