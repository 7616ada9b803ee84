//! Runtime settings.
//!
//! Settings are plain JSON:
//!
//! ```json
//! { "log_filter": "eddy_core=debug", "core": { "warn_unkeyed": false } }
//! ```
//!
//! Every field is optional.

use std::env;

use eddy_core::Config;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Environment variable [`Settings::from_env`] reads.
pub const CONFIG_ENV: &str = "EDDY_CONFIG";

/// Settings of an [`App`](crate::App).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Engine configuration.
    pub core: Config,
    /// Filter directive for [`logging::install_with`](crate::logging::install_with).
    pub log_filter: Option<String>,
}

impl Settings {
    /// Parses settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from [`CONFIG_ENV`], falling back to the defaults when
    /// the variable is unset.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the variable holds
    /// malformed JSON.
    pub fn from_env() -> Result<Self> {
        match env::var(CONFIG_ENV) {
            Ok(json) => Self::from_json(&json),
            Err(_) => Ok(Self::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_use_defaults() {
        let settings = Settings::from_json(r#"{ "core": { "verify_equal": true } }"#).unwrap();
        assert!(settings.core.verify_equal);
        assert!(settings.core.warn_unkeyed);
        assert_eq!(settings.log_filter, None);
    }

    #[test]
    fn rejects_malformed_json() {
        assert!(Settings::from_json("{ core: }").is_err());
    }
}
