use std::{
    any::Any,
    sync::{Arc, Mutex},
};

use graphql_mocks::HelloWorldSchema;
use graphql_view::{ExecutionRequest, ExecutionResult, Executor, HttpRequestInfo, Middleware, Schema};
use http::StatusCode;
use pretty_assertions::assert_eq;
use rstest::rstest;
use serde_json::json;

use crate::{execute, post_json, Mode, BASE_URL};

async fn query_context(router: axum::Router) -> String {
    let response = execute(router, post_json(BASE_URL, &json!({ "query": "{context}" }))).await;
    assert_eq!(response.status, StatusCode::OK);

    response.json()["data"]["context"].as_str().unwrap().to_owned()
}

#[rstest]
#[tokio::test]
async fn context_entries_sit_next_to_the_request(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let router = crate::builder(mode)
        .context(json!({ "session": "CUSTOM CONTEXT" }))
        .build()
        .into_router(BASE_URL);

    let context = query_context(router).await;

    assert_eq!(context, r#"{"request": <POST /graphql>, "session": "CUSTOM CONTEXT"}"#);
}

#[rstest]
#[tokio::test]
async fn context_that_is_not_a_map_is_ignored(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let router = crate::builder(mode)
        .context(json!("CUSTOM CONTEXT"))
        .build()
        .into_router(BASE_URL);

    let context = query_context(router).await;

    assert_eq!(context, "{\"request\": <POST /graphql>}");
}

#[rstest]
#[tokio::test]
async fn configured_request_entry_is_not_replaced(#[values(Mode::Blocking, Mode::Deferred)] mode: Mode) {
    let router = crate::builder(mode)
        .context(json!({ "request": "test" }))
        .build()
        .into_router(BASE_URL);

    let context = query_context(router).await;

    assert_eq!(context, r#"{"request": "test"}"#);
}

#[tokio::test]
async fn context_factory_runs_for_every_request() {
    let router = crate::builder(Mode::Blocking)
        .context_factory(|request: &HttpRequestInfo| {
            serde_json::Map::from_iter([("agent".to_owned(), json!(request.headers.contains_key("user-agent")))])
        })
        .build()
        .into_router(BASE_URL);

    let context = query_context(router).await;

    assert_eq!(context, r#"{"agent": false, "request": <POST /graphql>}"#);
}

#[derive(Debug)]
struct Tracing;

impl Middleware for Tracing {
    fn name(&self) -> &str {
        "tracing"
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Keeps the last request it was handed before executing it.
#[derive(Clone, Default)]
struct Recorder {
    last: Arc<Mutex<Option<ExecutionRequest>>>,
}

impl Executor<HelloWorldSchema> for Recorder {
    fn execute(&self, schema: &HelloWorldSchema, request: ExecutionRequest) -> ExecutionResult {
        *self.last.lock().unwrap() = Some(request.clone());
        schema.execute(request)
    }
}

#[tokio::test]
async fn execution_inputs_are_forwarded_to_the_engine() {
    let recorder = Recorder::default();

    let router = crate::builder(Mode::Blocking)
        .executor(recorder.clone())
        .root_value(json!({ "root": true }))
        .middleware(Tracing)
        .execution_option("introspection", true)
        .build()
        .into_router(BASE_URL);

    let body = json!({
        "query": "query helloWho($who: String){ test(who: $who) }",
        "variables": { "who": "Dolly" },
        "operationName": "helloWho",
    });

    let response = execute(router, post_json(BASE_URL, &body)).await;
    assert_eq!(response.json(), json!({ "data": { "test": "Hello Dolly" } }));

    let request = recorder.last.lock().unwrap().take().unwrap();

    assert_eq!(request.variables, json!({ "who": "Dolly" }).as_object().cloned().unwrap());
    assert_eq!(request.operation_name.as_deref(), Some("helloWho"));
    assert_eq!(request.root_value, Some(json!({ "root": true })));
    assert_eq!(request.options, json!({ "introspection": true }).as_object().cloned().unwrap());
    assert!(!request.allow_only_query);
    assert_eq!(request.middleware.len(), 1);
    assert_eq!(request.middleware[0].name(), "tracing");
    assert!(request.middleware[0].as_any().downcast_ref::<Tracing>().is_some());
    assert_eq!(request.context.request().map(|request| request.uri.path()), Some(BASE_URL));
}

#[tokio::test]
async fn introspection_can_be_disabled_through_execution_options() {
    let router = crate::builder(Mode::Deferred)
        .execution_option("introspection", false)
        .build()
        .into_router(BASE_URL);

    let body = json!({ "query": "{ __schema { queryType { name } } }" });
    let response = execute(router, post_json(BASE_URL, &body)).await;

    assert!(response.json()["data"]["__schema"].is_null());

    let response = execute(crate::router(Mode::Deferred), post_json(BASE_URL, &body)).await;

    assert_eq!(
        response.json(),
        json!({ "data": { "__schema": { "queryType": { "name": "QueryRoot" } } } })
    );
}
