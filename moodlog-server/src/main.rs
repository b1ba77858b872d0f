use clap::Parser;
use moodlog_core::MoodlogConfig;
use tokio::sync::broadcast;
use tracing_subscriber::{fmt, EnvFilter};

use moodlog_server::http::{start_http_server, HttpState};
use moodlog_server::subsystems::pipeline;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "moodlog.toml")]
    config: String,

    #[arg(long)]
    health: bool,
}

/// RUST_LOG, when set and non-blank, replaces the configured level entirely.
fn log_directives(rust_log: Option<String>, configured: &str) -> String {
    match rust_log {
        Some(env) if !env.trim().is_empty() => env,
        _ if !configured.trim().is_empty() => configured.trim().to_string(),
        _ => "info".to_string(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience, production uses real env vars)
    dotenvy::dotenv().ok();

    let args = Args::parse();

    // Load config
    let config = match MoodlogConfig::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", args.config, e);
            std::process::exit(1);
        }
    };

    // Init logging
    let directives = log_directives(std::env::var("RUST_LOG").ok(), &config.service.log_level);
    let filter = EnvFilter::try_new(&directives).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter '{}': {}", directives, e);
        EnvFilter::new("info")
    });
    fmt().with_env_filter(filter).init();

    // Journal store
    let store = match pipeline::build_store(&config).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to open journal store: {}", e);
            std::process::exit(1);
        }
    };

    if args.health {
        match store.health().await {
            Ok(v) => println!("✅ Journal store ready: {}", v),
            Err(e) => {
                println!("❌ Journal store check failed: {}", e);
                std::process::exit(1);
            }
        }

        match pipeline::read_api_key(&config) {
            Some(_) => println!("✅ Analysis key found in ${}", config.analysis.api_key_env),
            None => println!(
                "⚠️  ${} not set, entries will use the keyword fallback",
                config.analysis.api_key_env
            ),
        }

        println!("✅ Moodlog health check passed");
        return Ok(());
    }

    // Inference stage; the credential is read once here
    let stage = pipeline::build_inference_stage(&config, pipeline::read_api_key(&config))?;

    let (tx, _rx) = broadcast::channel(1);
    let shutdown_tx = tx.clone();

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        tracing::info!("Shutdown signal received");
        let _ = shutdown_tx.send(());
    });

    let state = HttpState {
        stage,
        store,
        config,
    };
    start_http_server(state, tx.subscribe()).await?;

    Ok(())
}
