use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use opentelemetry::trace::TracerProvider as _;
use opentelemetry_otlp::WithExportConfig as _;

use lc_console::cli::{Cli, Command, ConfigCommand};
use lc_domain::config::ObservabilityConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to chat when no subcommand is given.
        None => run_chat(false).await,
        Some(Command::Chat { fresh }) => run_chat(fresh).await,
        Some(Command::Status { json }) => {
            init_cli_tracing();
            let (config, _) = lc_console::cli::load_config()?;
            let reachable = lc_console::cli::status::status(Arc::new(config), json).await?;
            if !reachable {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = lc_console::cli::load_config()?;
            let valid = lc_console::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = lc_console::cli::load_config()?;
            lc_console::cli::config::show(&config)
        }
        Some(Command::Version) => {
            println!("labconsole {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run_chat(fresh: bool) -> anyhow::Result<()> {
    let (config, config_path) = lc_console::cli::load_config()?;
    let tracer_provider = init_tracing(&config.observability)?;
    tracing::info!(config = %config_path, "labconsole starting");

    for issue in config.validate() {
        tracing::warn!(%issue, "config issue");
    }

    let result = lc_console::cli::chat::chat(Arc::new(config), fresh).await;

    if let Some(provider) = tracer_provider {
        if let Err(e) = provider.shutdown() {
            tracing::warn!(error = ?e, "OpenTelemetry tracer provider shutdown failed");
        }
    }
    result
}

/// Initialize structured JSON tracing for the interactive chat.
///
/// JSON lines go to `log_file` when configured so they do not interleave
/// with the conversation. When `otlp_endpoint` is configured, an
/// OpenTelemetry layer is added so that every `tracing` span is also
/// exported via OTLP/gRPC. The returned [`SdkTracerProvider`] handle must
/// be shut down on exit to flush pending spans.
///
/// [`SdkTracerProvider`]: opentelemetry_sdk::trace::SdkTracerProvider
fn init_tracing(
    obs: &ObservabilityConfig,
) -> anyhow::Result<Option<opentelemetry_sdk::trace::SdkTracerProvider>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(obs.default_filter()));

    let writer = match &obs.log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).ok();
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_writer(writer);

    match &obs.otlp_endpoint {
        Some(endpoint) => {
            let exporter = match opentelemetry_otlp::SpanExporter::builder()
                .with_tonic()
                .with_endpoint(endpoint)
                .build()
            {
                Ok(e) => e,
                Err(e) => {
                    eprintln!(
                        "WARNING: failed to create OTLP exporter for {endpoint}: {e}; \
                         starting without OpenTelemetry"
                    );
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt_layer)
                        .init();
                    return Ok(None);
                }
            };

            let resource = opentelemetry_sdk::Resource::builder()
                .with_service_name(obs.service_name.clone())
                .build();

            let tracer_provider = opentelemetry_sdk::trace::SdkTracerProvider::builder()
                .with_batch_exporter(exporter)
                .with_sampler(opentelemetry_sdk::trace::Sampler::TraceIdRatioBased(
                    obs.sample_rate,
                ))
                .with_resource(resource)
                .build();

            let otel_layer = tracing_opentelemetry::layer()
                .with_tracer(tracer_provider.tracer("labconsole"));

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .with(otel_layer)
                .init();

            Ok(Some(tracer_provider))
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .init();

            Ok(None)
        }
    }
}

/// Initialize compact stderr-only tracing for CLI one-shot commands.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}
