use crate::config::Environment;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, layer::Layered, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

type FilteredRegistry = Layered<EnvFilter, Registry>;

/// Install the global subscriber: env filter, the given OpenTelemetry layer,
/// then a pretty (development) or JSON (production) formatter.
pub(crate) fn install<L>(otel_layer: L, environment: Environment)
where
    L: Layer<FilteredRegistry> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}

/// Initialize tracing with pretty formatting for development and JSON
/// formatting for production.
///
/// Uses `RUST_LOG` for filtering (defaults to "info" if not set). An
/// OpenTelemetry layer is attached too, so spans are exported if a global
/// tracer provider is installed later.
pub fn setup_logging(environment: Environment) {
    install(tracing_opentelemetry::layer(), environment);
}
