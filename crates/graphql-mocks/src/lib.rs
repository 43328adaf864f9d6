//! Mock GraphQL engines built with async-graphql, for testing the HTTP view.

use std::sync::Arc;

use async_graphql::{ObjectType, SubscriptionType};
use async_graphql_parser::types::{DocumentOperations, OperationType};
use graphql_view::{ExecutionRequest, ExecutionResult, GraphqlError, Location, PathSegment};
use serde_json::Value;

mod async_schema;
mod hello_world;

pub use {async_schema::AsyncSchema, hello_world::HelloWorldSchema};

/// Message of the error returned for subscriptions, which cannot be served
/// over plain HTTP.
pub const SUBSCRIPTIONS_NOT_SUPPORTED: &str = "Subscriptions are not supported over HTTP.";

/// Wraps an async-graphql schema so the view can execute it, either blocking
/// with [`graphql_view::Schema`] or with [`MockExecutor`].
pub struct MockSchema<Query, Mutation, Subscription> {
    schema: async_graphql::Schema<Query, Mutation, Subscription>,
}

impl<Query, Mutation, Subscription> MockSchema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    pub fn new(schema: async_graphql::Schema<Query, Mutation, Subscription>) -> Self {
        MockSchema { schema }
    }

    pub fn sdl(&self) -> String {
        self.schema.sdl()
    }

    pub async fn execute_async(&self, request: ExecutionRequest) -> ExecutionResult {
        if let Err(result) = check_operation(&request) {
            return result;
        }

        let mut graphql_request = async_graphql::Request::new(request.query)
            .variables(async_graphql::Variables::from_json(Value::Object(request.variables)))
            .data(request.context);

        if let Some(operation_name) = request.operation_name {
            graphql_request = graphql_request.operation_name(operation_name);
        }

        if request.options.get("introspection") == Some(&Value::Bool(false)) {
            graphql_request = graphql_request.disable_introspection();
        }

        into_result(self.schema.execute(graphql_request).await)
    }
}

impl<Query, Mutation, Subscription> graphql_view::Schema for MockSchema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    fn execute(&self, request: ExecutionRequest) -> ExecutionResult {
        futures::executor::block_on(self.execute_async(request))
    }
}

/// Executes mock schemas without blocking.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockExecutor;

#[async_trait::async_trait]
impl<Query, Mutation, Subscription> graphql_view::AsyncExecutor<MockSchema<Query, Mutation, Subscription>>
    for MockExecutor
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    async fn execute(
        &self,
        schema: Arc<MockSchema<Query, Mutation, Subscription>>,
        request: ExecutionRequest,
    ) -> ExecutionResult {
        schema.execute_async(request).await
    }
}

/// Selects the operation to run and checks it may run over the request's
/// HTTP method.
fn check_operation(request: &ExecutionRequest) -> Result<(), ExecutionResult> {
    let document = async_graphql_parser::parse_query(&request.query).map_err(|err| {
        let locations = err
            .positions()
            .map(|pos| Location::new(pos.line as u32, pos.column as u32));

        ExecutionResult::request_error([GraphqlError::new(err.to_string()).with_locations(locations)])
    })?;

    let operation_type = match (&document.operations, request.operation_name.as_deref()) {
        (DocumentOperations::Single(operation), _) => operation.node.ty,
        (DocumentOperations::Multiple(operations), Some(name)) => match operations.get(name) {
            Some(operation) => operation.node.ty,
            None => {
                return Err(ExecutionResult::request_error([GraphqlError::new(format!(
                    "Unknown operation named \"{name}\"."
                ))]))
            }
        },
        (DocumentOperations::Multiple(_), None) => {
            return Err(ExecutionResult::request_error([GraphqlError::new(
                "Must provide operation name if query contains multiple operations.",
            )]))
        }
    };

    let operation_type = match operation_type {
        OperationType::Query => return Ok(()),
        OperationType::Mutation => graphql_view::OperationType::Mutation,
        OperationType::Subscription => graphql_view::OperationType::Subscription,
    };

    if request.allow_only_query {
        return Err(ExecutionResult::method_not_allowed(operation_type));
    }

    if operation_type == graphql_view::OperationType::Subscription {
        return Err(ExecutionResult::executed(
            Value::Null,
            [GraphqlError::new(SUBSCRIPTIONS_NOT_SUPPORTED)],
        ));
    }

    Ok(())
}

/// Errors without a path on an empty response mean nothing was executed.
fn into_result(response: async_graphql::Response) -> ExecutionResult {
    let errors = response.errors.into_iter().map(into_graphql_error).collect::<Vec<_>>();
    let data = response.data.into_json().unwrap_or(Value::Null);

    if data.is_null() && !errors.is_empty() && errors.iter().all(|error| error.path.is_none()) {
        ExecutionResult::request_error(errors)
    } else {
        ExecutionResult::executed(data, errors)
    }
}

fn into_graphql_error(error: async_graphql::ServerError) -> GraphqlError {
    let locations = error
        .locations
        .iter()
        .map(|pos| Location::new(pos.line as u32, pos.column as u32));

    let mut graphql_error = GraphqlError::new(error.message).with_locations(locations);

    if !error.path.is_empty() {
        graphql_error = graphql_error.with_path(error.path.into_iter().map(|segment| match segment {
            async_graphql::PathSegment::Field(name) => PathSegment::Field(name),
            async_graphql::PathSegment::Index(index) => PathSegment::Index(index),
        }));
    }

    graphql_error
}
