use graphql_mocks::{HelloWorldSchema, MockExecutor};
use graphql_view::{GraphQLView, ViewSettings};
use http::StatusCode;
use indoc::indoc;
use pretty_assertions::assert_eq;
use serde_json::json;

use crate::{execute, get, get_with_accept, post_json, Mode};

#[tokio::test]
async fn view_follows_its_settings() {
    let settings: ViewSettings = toml::from_str(indoc! {r#"
        path = "/api/graphql"
        batch = true
        pretty = true
        max_age = "10m"

        [explorer]
        enabled = true
        version = "1.2.3"
    "#})
    .unwrap();

    let view = GraphQLView::builder(HelloWorldSchema::default())
        .settings(settings)
        .unwrap()
        .build();

    assert_eq!(view.path(), "/api/graphql");

    let router = view.router();

    let body = json!([{ "query": "{test}" }]);
    let response = execute(router.clone(), post_json("/api/graphql", &body)).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(
        response.text,
        "[\n  {\n    \"data\": {\n      \"test\": \"Hello World\"\n    }\n  }\n]"
    );

    let response = execute(router.clone(), get_with_accept("/api/graphql?query=%7Btest%7D", "text/html")).await;
    assert!(response.text.contains("graphiql@1.2.3"));

    let response = execute(router, get("/graphql?query=%7Btest%7D")).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[test]
fn missing_explorer_template_is_reported() {
    let settings: ViewSettings = toml::from_str(indoc! {r#"
        [explorer]
        template_path = "/nonexistent/explorer.html"
    "#})
    .unwrap();

    let Err(err) = GraphQLView::builder(HelloWorldSchema::default()).settings(settings) else {
        unreachable!("the template does not exist");
    };

    assert!(err.to_string().starts_with("Could not read the explorer template at /nonexistent/explorer.html"));
}

#[test]
fn enable_async_reflects_the_execution_strategy() {
    assert!(!crate::builder(Mode::Blocking).build().enable_async());
    assert!(crate::builder(Mode::Deferred).build().enable_async());
    assert!(!crate::builder(Mode::Deferred).enable_async(false).build().enable_async());

    let view = GraphQLView::builder_with_async_executor(HelloWorldSchema::default(), MockExecutor).build();
    assert!(view.enable_async());
}

#[test]
fn async_setting_applies_to_async_executors() {
    let settings: ViewSettings = toml::from_str("async_enabled = false").unwrap();

    let view = crate::builder(Mode::Deferred).settings(settings).unwrap().build();

    assert!(!view.enable_async());
}
