use std::{
    any::Any,
    fmt,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};

use futures::FutureExt;
use serde_json::{Map, Value};

use crate::{
    error::GraphqlError,
    request::{ResolvedOperation, Variables},
    RequestContext,
};

/// The GraphQL engine, executing operations to completion on the calling
/// thread.
pub trait Schema: Send + Sync + 'static {
    fn execute(&self, request: ExecutionRequest) -> ExecutionResult;
}

/// Runs operations against `S` without suspending.
pub trait Executor<S>: Send + Sync {
    fn execute(&self, schema: &S, request: ExecutionRequest) -> ExecutionResult;
}

/// Runs operations against `S` asynchronously, allowing several of them to
/// progress together.
#[async_trait::async_trait]
pub trait AsyncExecutor<S>: Send + Sync {
    async fn execute(&self, schema: Arc<S>, request: ExecutionRequest) -> ExecutionResult;
}

/// The default executor, calling [`Schema::execute`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaExecutor;

impl<S: Schema> Executor<S> for SchemaExecutor {
    fn execute(&self, schema: &S, request: ExecutionRequest) -> ExecutionResult {
        schema.execute(request)
    }
}

/// Opaque middleware forwarded to the engine, which downcasts it to the
/// types it knows about.
pub trait Middleware: Send + Sync {
    fn name(&self) -> &str;

    fn as_any(&self) -> &dyn Any;
}

impl fmt::Debug for dyn Middleware {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Middleware").field(&self.name()).finish()
    }
}

/// How operations are handed over to the engine, chosen once when the view is
/// built.
pub enum ExecutionStrategy<S> {
    Blocking(Arc<dyn Executor<S>>),
    Deferred {
        executor: Arc<dyn AsyncExecutor<S>>,
        /// Whether the operations of a batch are awaited together or one
        /// after the other.
        concurrent: bool,
    },
}

impl<S> Clone for ExecutionStrategy<S> {
    fn clone(&self) -> Self {
        match self {
            Self::Blocking(executor) => Self::Blocking(executor.clone()),
            Self::Deferred { executor, concurrent } => Self::Deferred {
                executor: executor.clone(),
                concurrent: *concurrent,
            },
        }
    }
}

impl<S> fmt::Debug for ExecutionStrategy<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blocking(_) => write!(f, "Blocking"),
            Self::Deferred { concurrent, .. } => f.debug_struct("Deferred").field("concurrent", concurrent).finish(),
        }
    }
}

impl<S> ExecutionStrategy<S> {
    /// Whether operations are executed deferred and concurrently.
    pub fn enable_async(&self) -> bool {
        matches!(self, Self::Deferred { concurrent: true, .. })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display, strum::EnumString, strum::IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub enum OperationType {
    Query,
    Mutation,
    Subscription,
}

/// Everything the engine receives for one operation.
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub query: String,
    pub variables: Variables,
    pub operation_name: Option<String>,
    pub root_value: Option<Value>,
    pub context: RequestContext,
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// Engine specific options, forwarded verbatim.
    pub options: Map<String, Value>,
    /// Set for GET requests, only query operations may run.
    pub allow_only_query: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResultKind {
    /// Execution happened, possibly with field errors.
    Executed,
    /// The operation was rejected before execution, e.g. a syntax or
    /// validation error.
    RequestError,
    /// The operation type may not run over the request's HTTP method.
    MethodNotAllowed,
}

/// The outcome of one operation as reported by the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphqlError>,
    pub kind: ResultKind,
}

impl ExecutionResult {
    pub fn executed(data: Value, errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        ExecutionResult {
            data: Some(data),
            errors: errors.into_iter().collect(),
            kind: ResultKind::Executed,
        }
    }

    pub fn request_error(errors: impl IntoIterator<Item = GraphqlError>) -> Self {
        ExecutionResult {
            data: None,
            errors: errors.into_iter().collect(),
            kind: ResultKind::RequestError,
        }
    }

    pub fn method_not_allowed(operation_type: OperationType) -> Self {
        ExecutionResult {
            data: None,
            errors: vec![GraphqlError::new(format!(
                "Can only perform a {operation_type} operation from a POST request."
            ))],
            kind: ResultKind::MethodNotAllowed,
        }
    }
}

/// What became of one operation of a batch.
#[derive(Debug)]
pub enum OperationOutcome {
    Completed(ExecutionResult),
    /// Rendered as `null`.
    Skipped,
}

/// The parts of an [`ExecutionRequest`] shared by every operation of a batch.
#[derive(Debug, Clone)]
pub(crate) struct SharedInput {
    pub root_value: Option<Value>,
    pub context: RequestContext,
    pub middleware: Vec<Arc<dyn Middleware>>,
    pub options: Map<String, Value>,
    pub allow_only_query: bool,
}

impl SharedInput {
    fn request_for(&self, query: String, operation: ResolvedOperation) -> ExecutionRequest {
        ExecutionRequest {
            query,
            variables: operation.variables,
            operation_name: operation.operation_name,
            root_value: self.root_value.clone(),
            context: self.context.clone(),
            middleware: self.middleware.clone(),
            options: self.options.clone(),
            allow_only_query: self.allow_only_query,
        }
    }
}

/// Executes the operations of a batch, returning one outcome per operation in
/// the order they were received.
pub(crate) struct Dispatcher<'a, S> {
    pub schema: &'a Arc<S>,
    pub strategy: &'a ExecutionStrategy<S>,
    pub shared: SharedInput,
    /// Turns method not allowed results and engine panics into
    /// [`OperationOutcome::Skipped`].
    pub catch: bool,
}

impl<S: Send + Sync + 'static> Dispatcher<'_, S> {
    pub async fn dispatch(&self, operations: Vec<ResolvedOperation>) -> Vec<OperationOutcome> {
        tracing::debug!(operations = operations.len(), strategy = ?self.strategy, "dispatching operations");

        match self.strategy {
            ExecutionStrategy::Blocking(executor) => operations
                .into_iter()
                .map(|operation| self.run_blocking(executor.as_ref(), operation))
                .collect(),
            ExecutionStrategy::Deferred {
                executor,
                concurrent: true,
            } => {
                let pending = operations
                    .into_iter()
                    .map(|operation| self.run_deferred(executor.as_ref(), operation));

                futures::future::join_all(pending).await
            }
            ExecutionStrategy::Deferred {
                executor,
                concurrent: false,
            } => {
                let mut outcomes = Vec::with_capacity(operations.len());

                for operation in operations {
                    outcomes.push(self.run_deferred(executor.as_ref(), operation).await);
                }

                outcomes
            }
        }
    }

    fn run_blocking(&self, executor: &dyn Executor<S>, mut operation: ResolvedOperation) -> OperationOutcome {
        let Some(query) = operation.query.take().filter(|query| !query.is_empty()) else {
            return self.missing_query();
        };

        let request = self.shared.request_for(query, operation);

        if !self.catch {
            return OperationOutcome::Completed(executor.execute(self.schema, request));
        }

        match catch_unwind(AssertUnwindSafe(|| executor.execute(self.schema, request))) {
            Ok(result) => self.caught(result),
            Err(panic) => self.panicked(panic),
        }
    }

    async fn run_deferred(&self, executor: &dyn AsyncExecutor<S>, mut operation: ResolvedOperation) -> OperationOutcome {
        let Some(query) = operation.query.take().filter(|query| !query.is_empty()) else {
            return self.missing_query();
        };

        let request = self.shared.request_for(query, operation);
        let execution = executor.execute(self.schema.clone(), request);

        if !self.catch {
            return OperationOutcome::Completed(execution.await);
        }

        match AssertUnwindSafe(execution).catch_unwind().await {
            Ok(result) => self.caught(result),
            Err(panic) => self.panicked(panic),
        }
    }

    /// Outside the explorer, batches without a query are rejected before
    /// reaching the dispatcher.
    fn missing_query(&self) -> OperationOutcome {
        OperationOutcome::Skipped
    }

    fn caught(&self, result: ExecutionResult) -> OperationOutcome {
        if result.kind == ResultKind::MethodNotAllowed {
            tracing::debug!(errors = ?result.errors, "skipping operation not allowed over this method");
            return OperationOutcome::Skipped;
        }

        OperationOutcome::Completed(result)
    }

    fn panicked(&self, panic: Box<dyn Any + Send>) -> OperationOutcome {
        let message = panic
            .downcast_ref::<&str>()
            .map(|message| (*message).to_owned())
            .or_else(|| panic.downcast_ref::<String>().cloned())
            .unwrap_or_default();

        tracing::error!(%message, "engine panicked while executing an operation");

        OperationOutcome::Skipped
    }
}
