use std::{path::Path, sync::Arc};

use clap::Parser;
use color_eyre::{
    Result,
    eyre::{Context, eyre},
};
use wrp_ingress::{
    AdmissionController, HttpHandler, IngressService, QueueDispatcher,
    adapters::{build_router, log_dispatched},
    config::{ConfigValidator, IngressConfig, load_config},
    metrics::{self, IngressMetrics},
    tracing_setup,
    utils::{GracefulShutdown, drain_consumer},
};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    #[clap(subcommand)]
    command: Option<Commands>,

    #[clap(short, long, default_value = "config.toml")]
    config: String,
}

#[derive(Parser, Debug)]
enum Commands {
    /// Validate configuration file
    Validate {
        /// Configuration file to validate
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Initialize a new configuration file
    Init {
        /// Output path for the new config file
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
    /// Start the ingress server (default)
    Serve {
        /// Configuration file to use
        #[clap(short, long, default_value = "config.toml")]
        config: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    match args.command {
        Some(Commands::Validate { config }) => validate_config_command(&config),
        Some(Commands::Init { config }) => init_config_command(&config).await,
        Some(Commands::Serve { config }) => serve(&config).await,
        None => serve(&args.config).await,
    }
}

async fn serve(config_path: &str) -> Result<()> {
    let config = load_config(config_path)
        .with_context(|| format!("Failed to load config from {config_path}"))?;
    ConfigValidator::validate(&config).map_err(|e| eyre!("Invalid configuration: {e}"))?;

    tracing_setup::init_tracing_with_config(&config.logging)?;
    tracing::info!("Loaded configuration from {config_path}");

    let drain_timeout = config
        .shutdown
        .drain_timeout()
        .wrap_err("Invalid shutdown.drain_timeout")?;
    let config = Arc::new(config);

    let prometheus = metrics::init_metrics(&config.metrics)?;
    let ingress_metrics = IngressMetrics::register();

    let admission = Arc::new(AdmissionController::with_gauge(
        config.admission.max_outstanding,
        ingress_metrics.incoming_queue_depth().clone(),
    ));
    if admission.is_unbounded() {
        tracing::warn!("admission.max_outstanding is 0; load shedding is disabled");
    }

    let (dispatcher, rx) =
        QueueDispatcher::channel(config.dispatch.queue_capacity, ingress_metrics.clone());
    let consumer = tokio::spawn(log_dispatched(rx));

    let ingress = Arc::new(IngressService::new(
        admission,
        ingress_metrics,
        Arc::new(dispatcher),
        config.payload.max_body_bytes,
    ));
    let handler = Arc::new(HttpHandler::new(ingress, config.clone(), prometheus));
    let app = build_router(handler);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    tracing::info!(
        listen_addr = %config.listen_addr,
        notify_path = %config.notify_path,
        max_outstanding = config.admission.max_outstanding,
        "Ingress listening"
    );

    let graceful_shutdown = Arc::new(GracefulShutdown::new());
    let signal_task = {
        let shutdown = graceful_shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = shutdown.run_signal_handler().await {
                tracing::error!("Signal handler error: {:?}", e);
            }
        })
    };

    let shutdown = graceful_shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let reason = shutdown.wait_for_shutdown_signal().await;
            tracing::info!("Shutdown signal received: {:?}", reason);
        })
        .await
        .context("Server error")?;
    signal_task.abort();

    // The router owned the last sender; the consumer now sees the queue close.
    tracing::info!(?drain_timeout, "Draining dispatch queue");
    drain_consumer(consumer, drain_timeout).await;

    tracing::info!("Graceful shutdown completed");
    Ok(())
}

/// Validate configuration file and exit
fn validate_config_command(config_path: &str) -> Result<()> {
    println!("🔍 Validating configuration file: {config_path}");

    if !Path::new(config_path).exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' not found");
        std::process::exit(1);
    }

    let config = match load_config(config_path) {
        Ok(config) => {
            println!("✅ Configuration parsing: OK");
            config
        }
        Err(e) => {
            eprintln!("❌ Configuration parsing failed:");
            eprintln!("   {e:#}");
            std::process::exit(1);
        }
    };

    match ConfigValidator::validate(&config) {
        Ok(()) => {
            print_summary(&config);
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Configuration validation failed:");
            eprintln!("{e}");
            println!();
            println!("💡 Common fixes:");
            println!("   • Verify listen address format (e.g., '0.0.0.0:6000')");
            println!("   • Paths must start with '/' and '/health' is reserved");
            println!("   • Durations use humantime units (e.g., '30s', '2m')");
            std::process::exit(1);
        }
    }
}

fn print_summary(config: &IngressConfig) {
    let threshold = match config.admission.max_outstanding {
        0 => "unbounded".to_string(),
        n => n.to_string(),
    };

    println!("✅ Configuration validation: OK");
    println!();
    println!("📋 Configuration Summary:");
    println!("   • Listen Address: {}", config.listen_addr);
    println!("   • Notify Path: {}", config.notify_path);
    println!("   • Max Outstanding: {threshold}");
    println!("   • Max Body Bytes: {}", config.payload.max_body_bytes);
    println!("   • Queue Capacity: {}", config.dispatch.queue_capacity);
    println!(
        "   • Metrics: {}",
        if config.metrics.enabled {
            config.metrics.path.as_str()
        } else {
            "disabled"
        }
    );
    println!();
    println!("🎉 Configuration is valid and ready to use!");
}

/// Initialize a new configuration file
async fn init_config_command(config_path: &str) -> Result<()> {
    let path = Path::new(config_path);
    if path.exists() {
        eprintln!("❌ Error: Configuration file '{config_path}' already exists");
        std::process::exit(1);
    }

    let default_config = r#"# WRP ingress configuration
# Every key can be overridden from the environment, e.g.
#   WRP_INGRESS__ADMISSION__MAX_OUTSTANDING=500

# The address to listen on
listen_addr = "0.0.0.0:6000"

# Path that accepts msgpack-encoded WRP envelopes
notify_path = "/api/v3/notify"

[admission]
# Requests in flight beyond this number are rejected with 503; 0 disables shedding
max_outstanding = 0

[payload]
max_body_bytes = 1048576

[dispatch]
queue_capacity = 1024

[logging]
level = "info"
json = false

[metrics]
enabled = true
path = "/metrics"

[shutdown]
drain_timeout = "30s"
"#;

    tokio::fs::write(path, default_config)
        .await
        .context("Failed to write config file")?;
    println!("✅ Created default configuration at: {config_path}");
    println!("   Run 'wrp-ingress serve --config {config_path}' to start the server");
    Ok(())
}
