//! Logging setup
//!
//! The engine logs through the `log` facade. Embedders that already install a
//! logger can skip this module; everyone else calls [`init`] once with the
//! `[general]` section of the configuration.
//!
//! # Usage
//!
//! ```no_run
//! use axiom_insets::{logging, EngineConfig};
//!
//! let config = EngineConfig::default();
//! logging::init(&config.general);
//! ```

use crate::config::GeneralConfig;
use env_logger::{Builder, Env};
use log::debug;

/// Filter used when neither `RUST_LOG` nor `log_filter` is set.
pub fn default_filter(general: &GeneralConfig) -> &str {
    if !general.log_filter.is_empty() {
        &general.log_filter
    } else if general.debug {
        "debug"
    } else {
        "info"
    }
}

/// Installs `env_logger` as the global logger.
///
/// `RUST_LOG` still wins over the configured filter. Returns false when a
/// logger was already installed, which is not an error.
pub fn init(general: &GeneralConfig) -> bool {
    let installed = Builder::from_env(Env::default().default_filter_or(default_filter(general)))
        .format_timestamp_millis()
        .try_init()
        .is_ok();
    if installed {
        debug!("📝 Logging initialized (filter: {})", default_filter(general));
    }
    installed
}
