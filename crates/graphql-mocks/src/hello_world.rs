use async_graphql::{Context, Object, Subscription};
use futures::Stream;
use graphql_view::RequestContext;

use crate::MockSchema;

/// Greets whoever asks, and exposes the request context to the query.
pub type HelloWorldSchema = MockSchema<QueryRoot, MutationRoot, SubscriptionRoot>;

impl Default for HelloWorldSchema {
    fn default() -> Self {
        MockSchema::new(async_graphql::Schema::build(QueryRoot, MutationRoot, SubscriptionRoot).finish())
    }
}

#[derive(Default)]
pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn test(&self, who: Option<String>) -> String {
        format!("Hello {}", who.as_deref().unwrap_or("World"))
    }

    async fn thrower(&self) -> async_graphql::Result<String> {
        Err("Throws!".into())
    }

    /// The `q` URL parameter of the HTTP request.
    async fn request(&self, ctx: &Context<'_>) -> async_graphql::Result<String> {
        ctx.data::<RequestContext>()?
            .request()
            .and_then(|request| request.query_param("q"))
            .ok_or_else(|| "No q parameter in the request".into())
    }

    async fn context(&self, ctx: &Context<'_>) -> async_graphql::Result<String> {
        Ok(ctx.data::<RequestContext>()?.to_string())
    }
}

#[derive(Default)]
pub struct MutationRoot;

#[Object]
impl MutationRoot {
    async fn write_test(&self) -> QueryRoot {
        QueryRoot
    }
}

#[derive(Default)]
pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    async fn subscriptions_test(&self) -> impl Stream<Item = QueryRoot> {
        futures::stream::once(async { QueryRoot })
    }
}
