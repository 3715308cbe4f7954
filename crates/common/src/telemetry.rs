use crate::{Environment, logging};
use anyhow::Context;
use opentelemetry::KeyValue;
use opentelemetry::global;
use opentelemetry::metrics::{Counter, Histogram};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_semantic_conventions::attribute::{SERVICE_NAME, SERVICE_VERSION};
use opentelemetry_sdk::{
    Resource,
    metrics::{PeriodicReader, SdkMeterProvider},
    propagation::TraceContextPropagator,
    trace::{Sampler, SdkTracerProvider},
};
use std::time::Duration;

/// Initializes OTLP tracing and metrics providers on creation and shuts them
/// down when dropped, flushing anything still buffered.
///
/// The batch exporters need a Tokio runtime; keep one alive for as long as
/// the guard lives.
///
/// # Example
/// ```ignore
/// let _telemetry = TelemetryGuard::init("human-detector", "http://localhost:4317", Environment::Production)?;
/// ```
pub struct TelemetryGuard {
    tracer_provider: SdkTracerProvider,
    meter_provider: SdkMeterProvider,
}

/// How often metrics are pushed to the collector.
const METRICS_EXPORT_INTERVAL: Duration = Duration::from_secs(10);

impl TelemetryGuard {
    /// Set up the providers and install the tracing subscriber with a
    /// tracing-opentelemetry bridge. Replaces [`crate::setup_logging`].
    pub fn init(
        service_name: &str,
        endpoint: &str,
        environment: Environment,
    ) -> anyhow::Result<Self> {
        global::set_text_map_propagator(TraceContextPropagator::new());

        let resource = service_resource(service_name, environment);

        let tracer_provider = tracer_provider(endpoint, resource.clone())
            .context("Failed to build OTLP span exporter")?;
        global::set_tracer_provider(tracer_provider.clone());

        let meter_provider =
            meter_provider(endpoint, resource).context("Failed to build OTLP metric exporter")?;
        global::set_meter_provider(meter_provider.clone());

        let otel_layer =
            tracing_opentelemetry::layer().with_tracer(global::tracer(service_name.to_string()));
        logging::install(otel_layer, environment);

        tracing::info!(endpoint, "OpenTelemetry export enabled");

        Ok(Self {
            tracer_provider,
            meter_provider,
        })
    }
}

fn service_resource(service_name: &str, environment: Environment) -> Resource {
    Resource::builder()
        .with_attributes([
            KeyValue::new(SERVICE_NAME, service_name.to_string()),
            KeyValue::new(SERVICE_VERSION, env!("CARGO_PKG_VERSION")),
            KeyValue::new("deployment.environment", environment.as_str()),
        ])
        .build()
}

fn tracer_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkTracerProvider> {
    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    Ok(SdkTracerProvider::builder()
        .with_resource(resource)
        .with_sampler(Sampler::ParentBased(Box::new(Sampler::AlwaysOn)))
        .with_batch_exporter(exporter)
        .build())
}

fn meter_provider(endpoint: &str, resource: Resource) -> anyhow::Result<SdkMeterProvider> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_tonic()
        .with_endpoint(endpoint)
        .build()?;

    let reader = PeriodicReader::builder(exporter)
        .with_interval(METRICS_EXPORT_INTERVAL)
        .build();

    Ok(SdkMeterProvider::builder()
        .with_resource(resource)
        .with_reader(reader)
        .build())
}

impl Drop for TelemetryGuard {
    fn drop(&mut self) {
        if let Err(e) = self.tracer_provider.shutdown() {
            eprintln!("Failed to shutdown tracer provider: {:?}", e);
        }
        if let Err(e) = self.meter_provider.shutdown() {
            eprintln!("Failed to shutdown meter provider: {:?}", e);
        }
    }
}

/// Per-run pipeline instruments. Built from the global meter, so they are
/// no-ops unless a [`TelemetryGuard`] installed a provider first.
pub struct PipelineMetrics {
    pub frame_duration: Histogram<f64>,
    pub frames_processed: Counter<u64>,
    pub frames_skipped: Counter<u64>,
    pub detections: Counter<u64>,
}

impl PipelineMetrics {
    pub fn new(meter_name: &'static str) -> Self {
        let meter = global::meter(meter_name);
        let latency_buckets = [
            0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.3, 0.5, 0.75, 1.0, 2.0, 5.0,
        ];

        Self {
            frame_duration: meter
                .f64_histogram("pipeline_frame_duration_seconds")
                .with_description("Time to process a single frame (filter + detect + postprocess)")
                .with_unit("s")
                .with_boundaries(latency_buckets.to_vec())
                .build(),
            frames_processed: meter
                .u64_counter("pipeline_frames_total")
                .with_description("Total frames processed")
                .build(),
            frames_skipped: meter
                .u64_counter("pipeline_frames_skipped_total")
                .with_description("Frames dropped because they could not be read or filtered")
                .build(),
            detections: meter
                .u64_counter("pipeline_detections_total")
                .with_description("Target-class detections mapped to the base frame")
                .build(),
        }
    }
}

/// Creates an info-level span and enters it.
#[macro_export]
macro_rules! span {
    ($name:literal) => {
        tracing::info_span!($name).entered()
    };
}

/// Creates a debug-level span and enters it.
#[macro_export]
macro_rules! span_debug {
    ($name:literal) => {
        tracing::debug_span!($name).entered()
    };
}
