//! Serve a GraphQL execution engine over HTTP with axum.
//!
//! The engine stays external and is reached through [`Schema`], or through
//! [`Executor`] and [`AsyncExecutor`] for engines needing more control. A
//! [`GraphQLView`] handles the HTTP side: GET and POST requests in every common
//! encoding, batches, CORS preflight requests and the GraphiQL explorer.
//!
//! ```ignore
//! let view = GraphQLView::builder(schema).batch(true).explorer(true).build();
//! let app = view.attach(axum::Router::new(), "/graphql");
//! ```

mod body;
mod config;
mod context;
mod error;
mod execution;
mod explorer;
mod preflight;
mod request;
mod response;
mod view;

pub use config::{ConfigError, ExplorerSettings, ViewSettings};
pub use context::{ContextFactory, ContextSource, ContextValue, HttpRequestInfo, RequestContext, REQUEST_KEY};
pub use error::{GraphqlError, Location, PathSegment, RequestError};
pub use execution::{
    AsyncExecutor, ExecutionRequest, ExecutionResult, ExecutionStrategy, Executor, Middleware, OperationOutcome,
    OperationType, ResultKind, Schema, SchemaExecutor,
};
pub use explorer::{AsyncTemplateEngine, ExplorerValues, TemplateEngine, TemplateError, DEFAULT_GRAPHIQL_VERSION};
pub use request::{OperationRequest, QueryParams, RawVariables, RequestBatch, ResolvedOperation, Variables};
pub use response::{DefaultErrorFormatter, EncodedResponse, ErrorFormatter, JsonEncoder, SerdeJsonEncoder};
pub use view::{GraphQLView, GraphQLViewBuilder};
