use std::{sync::Arc, time::Duration};

use axum::{
    extract::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use http::{request::Parts, Method};
use serde_json::{Map, Value};
use tracing::Instrument;

use crate::{
    body,
    config::{ConfigError, ViewSettings, DEFAULT_MAX_AGE, DEFAULT_PATH, DEFAULT_REQUEST_BODY_LIMIT},
    context::{ContextSource, HttpRequestInfo},
    execution::{
        AsyncExecutor, Dispatcher, ExecutionStrategy, Executor, Middleware, OperationOutcome, Schema,
        SchemaExecutor, SharedInput,
    },
    explorer::{self, AsyncTemplateEngine, Explorer, Renderer, TemplateEngine},
    preflight,
    request::{self, QueryParams, RequestBatch},
    response::{self, DefaultErrorFormatter, ErrorFormatter, JsonEncoder, SerdeJsonEncoder},
    RequestError,
};

struct ViewConfig<S> {
    schema: Arc<S>,
    strategy: ExecutionStrategy<S>,
    root_value: Option<Value>,
    context: ContextSource,
    /// `None` when the explorer is disabled.
    explorer: Option<Explorer>,
    batch: bool,
    pretty: bool,
    max_age: Duration,
    encoder: Arc<dyn JsonEncoder>,
    error_formatter: Arc<dyn ErrorFormatter>,
    middleware: Vec<Arc<dyn Middleware>>,
    execution_options: Map<String, Value>,
    request_body_limit: usize,
    path: String,
}

/// Serves a GraphQL schema over HTTP.
///
/// Cloning is cheap, every clone shares the same configuration.
pub struct GraphQLView<S> {
    config: Arc<ViewConfig<S>>,
}

impl<S> Clone for GraphQLView<S> {
    fn clone(&self) -> Self {
        GraphQLView {
            config: self.config.clone(),
        }
    }
}

impl<S: Schema> GraphQLView<S> {
    /// Starts configuring a view, operations are executed with
    /// [`Schema::execute`] unless another executor is set.
    pub fn builder(schema: S) -> GraphQLViewBuilder<S> {
        GraphQLViewBuilder::new(Arc::new(schema), ExecutionStrategy::Blocking(Arc::new(SchemaExecutor)))
    }
}

impl<S: Send + Sync + 'static> GraphQLView<S> {
    /// Starts configuring a view for a schema only reachable through an
    /// asynchronous executor.
    pub fn builder_with_async_executor(
        schema: S,
        executor: impl AsyncExecutor<S> + 'static,
    ) -> GraphQLViewBuilder<S> {
        GraphQLViewBuilder::new(
            Arc::new(schema),
            ExecutionStrategy::Deferred {
                executor: Arc::new(executor),
                concurrent: true,
            },
        )
    }

    pub fn schema(&self) -> &Arc<S> {
        &self.config.schema
    }

    /// Whether operations are executed deferred and concurrently.
    pub fn enable_async(&self) -> bool {
        self.config.strategy.enable_async()
    }

    /// The configured route, `/graphql` by default.
    pub fn path(&self) -> &str {
        &self.config.path
    }

    /// Mounts the view on `router` at `path`, for every HTTP method.
    pub fn attach<St>(&self, router: Router<St>, path: &str) -> Router<St>
    where
        St: Clone + Send + Sync + 'static,
    {
        let view = self.clone();

        router.route(
            path,
            any(move |request: Request| {
                let view = view.clone();
                async move { view.handle(request).await }
            }),
        )
    }

    pub fn into_router(self, path: &str) -> Router {
        self.attach(Router::new(), path)
    }

    /// A router serving the view at its configured path.
    pub fn router(self) -> Router {
        let path = self.config.path.clone();
        self.into_router(&path)
    }

    pub async fn handle(&self, request: Request) -> Response {
        let span = tracing::info_span!(
            "graphql-request",
            method = %request.method(),
            path = request.uri().path(),
        );

        self.handle_request(request).instrument(span).await
    }

    async fn handle_request(&self, request: Request) -> Response {
        let (parts, body) = request.into_parts();

        if parts.method == Method::OPTIONS {
            return preflight::respond(&parts.headers, self.config.max_age);
        }

        if parts.method != Method::GET && parts.method != Method::POST {
            return self.error_response(RequestError::UnsupportedMethod);
        }

        let params = match QueryParams::from_uri(&parts.uri) {
            Ok(params) => params,
            Err(err) => return self.error_response(err),
        };

        let payload = if parts.method == Method::POST {
            match self.read_body(&parts, body).await {
                Ok(payload) => payload,
                Err(err) => return self.error_response(err),
            }
        } else {
            Value::Object(Map::new())
        };

        let show_explorer = self.config.explorer.is_some()
            && parts.method == Method::GET
            && !params.wants_raw()
            && explorer::accepts_html(&parts.headers);

        let batch = match request::resolve(payload, &params, self.config.batch) {
            Ok(batch) => batch,
            Err(err) => return self.error_response(err),
        };

        // Explorer pages render missing queries as an empty response instead.
        if !show_explorer {
            if let Err(err) = batch.ensure_queries() {
                return self.error_response(err);
            }
        }

        tracing::debug!(
            operations = batch.operations.len(),
            is_batch = batch.is_batch,
            show_explorer,
            "resolved request"
        );

        let pretty = self.config.pretty || show_explorer || params.wants_pretty();

        self.execute(parts, batch, show_explorer, pretty).await
    }

    async fn read_body(&self, parts: &Parts, body: axum::body::Body) -> Result<Value, RequestError> {
        let bytes = axum::body::to_bytes(body, self.config.request_body_limit)
            .await
            .map_err(RequestError::UnreadableBody)?;

        body::parse(&parts.headers, bytes).await
    }

    async fn execute(
        &self,
        parts: Parts,
        batch: RequestBatch,
        show_explorer: bool,
        pretty: bool,
    ) -> Response {
        let config = &self.config;
        let allow_only_query = parts.method == Method::GET;

        let context = config.context.build(HttpRequestInfo {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        });

        let dispatcher = Dispatcher {
            schema: &config.schema,
            strategy: &config.strategy,
            shared: SharedInput {
                root_value: config.root_value.clone(),
                context,
                middleware: config.middleware.clone(),
                options: config.execution_options.clone(),
                allow_only_query,
            },
            catch: show_explorer,
        };

        let first_operation = batch.operations.first().cloned();
        let outcomes = dispatcher.dispatch(batch.operations).await;

        let results = outcomes
            .into_iter()
            .map(|outcome| match outcome {
                OperationOutcome::Completed(result) => Some(result),
                OperationOutcome::Skipped => None,
            })
            .collect::<Vec<_>>();

        let encoded = response::encode(
            &results,
            batch.is_batch,
            config.error_formatter.as_ref(),
            config.encoder.as_ref(),
            pretty,
        );

        let Some(explorer) = config.explorer.as_ref().filter(|_| show_explorer) else {
            return encoded.into_response();
        };

        let first_is_null = results.first().map_or(true, Option::is_none);
        let values = explorer.values(first_operation.as_ref(), &encoded, first_is_null);

        match explorer.render(&values).await {
            Ok(page) => explorer::html_response(page),
            Err(err) => {
                tracing::error!("{err}");

                let error = crate::GraphqlError::new(err.to_string());
                response::encode_errors(
                    &[error],
                    http::StatusCode::INTERNAL_SERVER_ERROR,
                    http::HeaderMap::new(),
                    config.error_formatter.as_ref(),
                    config.encoder.as_ref(),
                )
                .into_response()
            }
        }
    }

    fn error_response(&self, error: RequestError) -> Response {
        tracing::warn!("{error}");

        response::encode_errors(
            &[error.to_graphql_error()],
            error.status_code(),
            error.headers(),
            self.config.error_formatter.as_ref(),
            self.config.encoder.as_ref(),
        )
        .into_response()
    }
}

/// Configures a [`GraphQLView`].
pub struct GraphQLViewBuilder<S> {
    schema: Arc<S>,
    strategy: ExecutionStrategy<S>,
    async_enabled: bool,
    root_value: Option<Value>,
    context: ContextSource,
    explorer_enabled: bool,
    explorer: Explorer,
    batch: bool,
    pretty: bool,
    max_age: Duration,
    encoder: Arc<dyn JsonEncoder>,
    error_formatter: Arc<dyn ErrorFormatter>,
    middleware: Vec<Arc<dyn Middleware>>,
    execution_options: Map<String, Value>,
    request_body_limit: usize,
    path: String,
}

impl<S: Send + Sync + 'static> GraphQLViewBuilder<S> {
    fn new(schema: Arc<S>, strategy: ExecutionStrategy<S>) -> Self {
        GraphQLViewBuilder {
            schema,
            strategy,
            async_enabled: true,
            root_value: None,
            context: ContextSource::Empty,
            explorer_enabled: false,
            explorer: Explorer::default(),
            batch: false,
            pretty: false,
            max_age: DEFAULT_MAX_AGE,
            encoder: Arc::new(SerdeJsonEncoder),
            error_formatter: Arc::new(DefaultErrorFormatter),
            middleware: Vec::new(),
            execution_options: Map::new(),
            request_body_limit: DEFAULT_REQUEST_BODY_LIMIT,
            path: DEFAULT_PATH.to_owned(),
        }
    }

    /// Executes operations to completion, one after the other.
    #[must_use]
    pub fn executor(mut self, executor: impl Executor<S> + 'static) -> Self {
        self.strategy = ExecutionStrategy::Blocking(Arc::new(executor));
        self
    }

    /// Executes operations asynchronously.
    #[must_use]
    pub fn async_executor(mut self, executor: impl AsyncExecutor<S> + 'static) -> Self {
        self.strategy = ExecutionStrategy::Deferred {
            executor: Arc::new(executor),
            concurrent: true,
        };
        self
    }

    /// With an asynchronous executor, whether the operations of a batch run
    /// concurrently. Enabled by default.
    #[must_use]
    pub fn enable_async(mut self, enabled: bool) -> Self {
        self.async_enabled = enabled;
        self
    }

    #[must_use]
    pub fn root_value(mut self, root_value: impl Into<Value>) -> Self {
        self.root_value = Some(root_value.into());
        self
    }

    /// Entries available to every resolver. Anything but a JSON object is
    /// ignored.
    #[must_use]
    pub fn context(mut self, context: impl Into<Value>) -> Self {
        self.context = ContextSource::from(context.into());
        self
    }

    #[must_use]
    pub fn context_factory<F>(mut self, factory: F) -> Self
    where
        F: Fn(&HttpRequestInfo) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.context = ContextSource::Factory(Arc::new(factory));
        self
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    #[must_use]
    pub fn batch(mut self, batch: bool) -> Self {
        self.batch = batch;
        self
    }

    #[must_use]
    pub fn explorer(mut self, enabled: bool) -> Self {
        self.explorer_enabled = enabled;
        self
    }

    #[must_use]
    pub fn explorer_version(mut self, version: impl Into<String>) -> Self {
        self.explorer.version = version.into();
        self
    }

    #[must_use]
    pub fn explorer_template(mut self, template: impl Into<String>) -> Self {
        self.explorer.template = Some(Arc::from(template.into()));
        self
    }

    #[must_use]
    pub fn template_engine(mut self, engine: impl TemplateEngine + 'static) -> Self {
        self.explorer.renderer = Renderer::Sync(Arc::new(engine));
        self
    }

    #[must_use]
    pub fn async_template_engine(mut self, engine: impl AsyncTemplateEngine + 'static) -> Self {
        self.explorer.renderer = Renderer::Async(Arc::new(engine));
        self
    }

    /// Subscriptions endpoint handed to the explorer.
    #[must_use]
    pub fn subscriptions(mut self, url: impl Into<String>) -> Self {
        self.explorer.subscriptions = Some(url.into());
        self
    }

    #[must_use]
    pub fn middleware(mut self, middleware: impl Middleware + 'static) -> Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    #[must_use]
    pub fn max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }

    #[must_use]
    pub fn encoder(mut self, encoder: impl JsonEncoder + 'static) -> Self {
        self.encoder = Arc::new(encoder);
        self
    }

    #[must_use]
    pub fn error_formatter(mut self, formatter: impl ErrorFormatter + 'static) -> Self {
        self.error_formatter = Arc::new(formatter);
        self
    }

    #[must_use]
    pub fn execution_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.execution_options.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn request_body_limit(mut self, limit: usize) -> Self {
        self.request_body_limit = limit;
        self
    }

    #[must_use]
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Applies settings read from a configuration file.
    pub fn settings(mut self, settings: ViewSettings) -> Result<Self, ConfigError> {
        let ViewSettings {
            path,
            pretty,
            batch,
            async_enabled,
            max_age,
            request_body_limit,
            explorer,
            execution_options,
        } = settings;

        if let Some(template) = explorer.load_template()? {
            self.explorer.template = Some(Arc::from(template));
        }

        if let Some(version) = explorer.version {
            self.explorer.version = version;
        }

        if explorer.subscriptions.is_some() {
            self.explorer.subscriptions = explorer.subscriptions;
        }

        self.explorer_enabled = explorer.enabled;
        self.path = path;
        self.pretty = pretty;
        self.batch = batch;
        self.async_enabled = async_enabled;
        self.max_age = max_age;
        self.request_body_limit = request_body_limit;
        self.execution_options.extend(execution_options);

        Ok(self)
    }

    pub fn build(self) -> GraphQLView<S> {
        let strategy = match self.strategy {
            ExecutionStrategy::Deferred { executor, .. } => ExecutionStrategy::Deferred {
                executor,
                concurrent: self.async_enabled,
            },
            blocking => blocking,
        };

        tracing::debug!(?strategy, explorer = self.explorer_enabled, batch = self.batch, "built GraphQL view");

        GraphQLView {
            config: Arc::new(ViewConfig {
                schema: self.schema,
                strategy,
                root_value: self.root_value,
                context: self.context,
                explorer: self.explorer_enabled.then_some(self.explorer),
                batch: self.batch,
                pretty: self.pretty,
                max_age: self.max_age,
                encoder: self.encoder,
                error_formatter: self.error_formatter,
                middleware: self.middleware,
                execution_options: self.execution_options,
                request_body_limit: self.request_body_limit,
                path: self.path,
            }),
        }
    }
}
