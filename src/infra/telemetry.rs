use std::sync::Once;

use metrics::{Unit, describe_counter, describe_gauge, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::{
    application::{
        convert::{METRIC_CONVERSION_MS, METRIC_CONVERSIONS},
        export::pdf::{METRIC_ENGINE_LAUNCHES, METRIC_ENGINES_LIVE},
    },
    config::{LogFormat, LoggingSettings},
};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            METRIC_CONVERSIONS,
            Unit::Count,
            "Total number of conversions by format and outcome."
        );
        describe_histogram!(
            METRIC_CONVERSION_MS,
            Unit::Milliseconds,
            "End-to-end conversion latency in milliseconds."
        );
        describe_counter!(
            METRIC_ENGINE_LAUNCHES,
            Unit::Count,
            "Total number of rendering-engine instances launched."
        );
        describe_gauge!(
            METRIC_ENGINES_LIVE,
            Unit::Count,
            "Rendering-engine instances currently running."
        );
    });
}
