use anyhow::{Context, Result};
use clap::Args;
use quillpress::{
    BlogRepository, DocumentStore,
    api::{self, AppState},
    config::advertised_host,
};
use tokio::net::TcpListener;

use crate::{
    context::{AppContext, Backend},
    examples::ExampleGroup,
    output::OutputManager,
};

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Run against Redis",
        commands: &["quillpress serve", "quillpress serve --bind 0.0.0.0:8080"],
    },
    ExampleGroup {
        title: "Run without Redis",
        commands: &["quillpress serve --memory"],
    },
];

#[derive(Args)]
pub struct ServeArgs {
    /// Address to listen on (overrides server.bind)
    #[arg(long)]
    pub bind: Option<String>,

    /// Keep documents in memory instead of Redis
    #[arg(long)]
    pub memory: bool,
}

pub async fn handle_serve(args: ServeArgs, context: &AppContext, output: &OutputManager) -> Result<()> {
    let bind = args.bind.unwrap_or_else(|| context.settings.server.bind.clone());
    let public_host = context
        .settings
        .server
        .public_host
        .clone()
        .unwrap_or_else(|| advertised_host(&bind));

    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;

    match context.open_store(args.memory).await? {
        Backend::Redis(store) => run(store, listener, public_host, context, output).await,
        Backend::Memory(store) => {
            output.warning("Using the in-memory store; documents are lost on shutdown");
            run(store, listener, public_host, context, output).await
        }
    }
}

async fn run<S: DocumentStore>(
    store: S,
    listener: TcpListener,
    public_host: String,
    context: &AppContext,
    output: &OutputManager,
) -> Result<()> {
    let state = AppState::new(
        BlogRepository::new(store),
        context.settings.server.public_scheme.clone(),
        public_host,
    );

    let addr = listener.local_addr().context("Listener has no local address")?;
    output.success(&format!("QuillPress API listening on http://{addr}"));
    output.key_value("Config", &context.config_path.display().to_string());

    api::serve(listener, api::router(state)).await.context("Server error")?;
    output.info("Server stopped");
    Ok(())
}
