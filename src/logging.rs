//! Console logging for Eddy applications.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, util::SubscriberInitExt};

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "EDDY_LOG";

const DEFAULT_FILTER: &str = "info";

static INSTALLED: Once = Once::new();

/// Installs the console subscriber (idempotent).
///
/// The filter comes from [`LOG_ENV`], then defaults to `info`.
pub fn install() {
    install_with(None);
}

/// Installs the console subscriber with `directive` as the fallback filter
/// (idempotent). [`LOG_ENV`] still takes precedence.
pub fn install_with(directive: Option<&str>) {
    INSTALLED.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV)
            .unwrap_or_else(|_| EnvFilter::new(directive.unwrap_or(DEFAULT_FILTER)));

        let console = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(filter);

        if tracing_subscriber::registry().with(console).try_init().is_err() {
            eprintln!("Eddy logging could not be installed; a subscriber is already set");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_is_idempotent() {
        install_with(Some("eddy=debug"));
        install();
        assert!(INSTALLED.is_completed());
    }
}
