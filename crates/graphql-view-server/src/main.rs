use anyhow::Context;
use clap::crate_version;
use graphql_mocks::{AsyncSchema, HelloWorldSchema, MockExecutor};
use graphql_view::GraphQLView;
use tokio::{net::TcpListener, signal};

use crate::args::SchemaKind;

mod args;
mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = args::parse();
    args.init_logging();

    let config = args.config()?;
    let listen_address = args.listen_address(&config);

    let crate_version = crate_version!();
    tracing::info!("GraphQL view server {crate_version}");

    let router = match args.schema {
        SchemaKind::HelloWorld => GraphQLView::builder(HelloWorldSchema::default())
            .settings(config.graphql)?
            .build()
            .router(),
        SchemaKind::Async => GraphQLView::builder_with_async_executor(AsyncSchema::default(), MockExecutor)
            .settings(config.graphql)?
            .build()
            .router(),
    };

    let listener = TcpListener::bind(listen_address)
        .await
        .with_context(|| format!("could not listen on {listen_address}"))?;

    tracing::info!("GraphQL endpoint exposed at http://{listen_address}");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = signal::ctrl_c().await {
        tracing::error!("could not listen for the shutdown signal: {err}");
        std::future::pending::<()>().await;
    }

    tracing::info!("shutting down");
}
