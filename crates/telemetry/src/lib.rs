//! Tracing pipeline honoring [`TelemetrySettings`].

use tracing_subscriber::EnvFilter;

use shelfmark_kernel::settings::{LogFormat, TelemetrySettings};

/// Initialize the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured filter. Safe to call more than once;
/// later calls are no-ops (relevant in tests).
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.filter.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match settings.log_format {
        LogFormat::Pretty => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };

    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        let settings = TelemetrySettings::default();
        init(&settings).unwrap();
        init(&settings).unwrap();
    }
}
