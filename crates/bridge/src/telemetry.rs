use {
    biometry_config::LoggingConfig,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `config.level`. Safe to call more than once; only the
/// first call installs a subscriber.
pub fn init_telemetry(config: &LoggingConfig) {
    let filter = build_filter(config);
    let registry = tracing_subscriber::registry().with(filter);

    let result = if config.json {
        registry
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .try_init()
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .try_init()
    };

    if result.is_ok() {
        tracing::debug!(level = %config.level, json = config.json, "telemetry initialised");
    }
}

fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
