use std::sync::Arc;

use browser_agent::channels::{AppState, session_routes};
use browser_agent::config::AgentConfig;
use browser_agent::dispatch::JobDispatcher;
use browser_agent::extraction::{Extractor, LlmExtractor};
use browser_agent::llm::create_provider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = AgentConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        eprintln!("  export ANTHROPIC_API_KEY=sk-ant-...");
        std::process::exit(1);
    });

    eprintln!("🤖 Browser Agent v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", config.llm.model);
    eprintln!("   Variant: {}", config.session.variant);
    eprintln!("   Routing: {:?}", config.session.routing);
    eprintln!(
        "   Worker: {} {}",
        config.worker.program,
        config.worker.args.join(" ")
    );
    eprintln!("   Session WS: ws://0.0.0.0:{}/ws", config.port);
    eprintln!("   Health: http://0.0.0.0:{}/health\n", config.port);

    let llm = create_provider(&config.llm)?;
    let extractor: Arc<dyn Extractor> = Arc::new(LlmExtractor::new(llm));
    let dispatcher: Arc<dyn JobDispatcher> = Arc::new(config.worker.dispatcher());

    let app = session_routes(AppState {
        settings: config.session,
        extractor,
        dispatcher,
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "Session WebSocket server started");
    axum::serve(listener, app).await?;

    Ok(())
}
