use std::fmt::Display;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use console::Style;
use indicatif::ProgressStyle;

const ANSI_BLUE: Style = Style::new().blue();

pub(crate) static STYLE_PIPELINE: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .expect("Error setting progress bar template")
        .progress_chars("=>-")
});

pub(crate) static STYLE_TASK: LazyLock<ProgressStyle> = LazyLock::new(|| {
    ProgressStyle::default_spinner()
        .template("{spinner:.blue} {msg}")
        .expect("Error setting progress bar template")
});

pub fn as_overhead(s: Instant) -> impl Display {
    as_overhead_duration(s.elapsed())
}

pub(crate) fn as_overhead_duration(d: Duration) -> impl Display {
    ANSI_BLUE.apply_to(format!("(+{}ms)", d.as_millis()))
}

/// Installs the global `tracing` subscriber.
///
/// Log lines are routed through the indicatif layer so they don't tear the
/// progress bars. `RUST_LOG` overrides the default `info` filter. Calling this
/// more than once is harmless, later calls do nothing.
#[cfg(feature = "logging")]
pub fn init_logging() -> anyhow::Result<()> {
    use tracing_indicatif::IndicatifLayer;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::{EnvFilter, fmt};

    static INIT: std::sync::Once = std::sync::Once::new();
    let mut result = Ok(());

    INIT.call_once(|| {
        let indicatif_layer = IndicatifLayer::new();
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        result = tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(indicatif_layer.get_stderr_writer()),
            )
            .with(indicatif_layer)
            .try_init()
            .map_err(anyhow::Error::from);
    });

    result
}

#[cfg(not(feature = "logging"))]
pub fn init_logging() -> anyhow::Result<()> {
    Ok(())
}
