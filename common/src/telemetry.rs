//! Provides helper functions for initializing logging and trace publication.
use anyhow::Result;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::{runtime, trace, Resource};
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter, Registry};

/// Initialize logging and, when an OTLP endpoint is given, trace export.
///
/// Logs are written to stderr so they never interleave with command output on stdout.
pub fn init(otlp_endpoint: Option<String>) -> Result<()> {
    // Default to INFO if no env is specified
    let log_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;

    let telemetry = match otlp_endpoint {
        Some(endpoint) => {
            let otlp_filter = EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .from_env()?;
            Some(
                tracing_opentelemetry::layer()
                    .with_tracer(tracer(endpoint)?)
                    .with_filter(otlp_filter),
            )
        }
        None => None,
    };
    let logger = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .compact()
        .with_filter(log_filter);

    let collector = Registry::default().with(telemetry).with(logger);

    tracing::subscriber::set_global_default(collector)?;
    Ok(())
}

/// Flush any pending spans before the process exits.
pub fn shutdown() {
    opentelemetry::global::shutdown_tracer_provider();
}

fn tracer(otlp_endpoint: String) -> Result<opentelemetry_sdk::trace::Tracer> {
    let tracer = opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otlp_endpoint),
        )
        .with_trace_config(trace::config().with_resource(Resource::new(vec![
            KeyValue::new(
                "hostname",
                gethostname::gethostname().to_string_lossy().into_owned(),
            ),
            KeyValue::new("service.name", "olmctl"),
        ])))
        // The tool runs on a current thread runtime, the default Tokio runtime would block on
        // shutdown.
        .install_batch(runtime::TokioCurrentThread)?;
    Ok(tracer)
}
