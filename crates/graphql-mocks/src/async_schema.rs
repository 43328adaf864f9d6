use async_graphql::{EmptyMutation, EmptySubscription, Object};

use crate::MockSchema;

/// A schema whose resolvers suspend before answering.
pub type AsyncSchema = MockSchema<AsyncQuery, EmptyMutation, EmptySubscription>;

impl Default for AsyncSchema {
    fn default() -> Self {
        MockSchema::new(async_graphql::Schema::build(AsyncQuery, EmptyMutation, EmptySubscription).finish())
    }
}

#[derive(Default)]
pub struct AsyncQuery;

#[Object]
impl AsyncQuery {
    async fn a(&self) -> &'static str {
        futures_lite::future::yield_now().await;
        "hey"
    }

    async fn b(&self) -> &'static str {
        for _ in 0..3 {
            futures_lite::future::yield_now().await;
        }
        "hey2"
    }

    async fn c(&self) -> &'static str {
        "hey3"
    }
}
