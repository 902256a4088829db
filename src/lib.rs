//! # Axiom Insets Engine
//!
//! Window-manager side coordination of screen insets: the regions (status
//! bar, navigation bar, IME, gesture areas, ...) that application content has
//! to avoid, and the handoff of their window surfaces to client processes that
//! want to animate them.
//!
//! ## Architecture
//!
//! - `provider`: One state machine per inset type, owning its source and the
//!   control handoff of the backing window's surface
//! - `controller`: Display-wide aggregation, per-recipient filtering and
//!   batched control notifications
//! - `control_map`: Bidirectional index between inset types and control targets
//! - `batch`: Targets waiting for the next after-commit flush
//! - `host`: Traits through which the display drives layout, compositing and
//!   client delivery
//! - `state`, `geometry`, `types`: Value types exchanged with clients
//! - `config`: Configuration parsing and management
//! - `logging`: `env_logger` setup
//!
//! ## Usage
//!
//! ```rust,no_run
//! use axiom_insets::{logging, EngineConfig, InsetsStateController};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = EngineConfig::load("~/.config/axiom/insets.toml")?;
//!     logging::init(&config.general);
//!     let controller = InsetsStateController::shared(&config.insets);
//!     // Hand `controller` to the display; it calls in with itself as host.
//!     # drop(controller);
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod config;
pub mod control_map;
pub mod controller;
pub mod geometry;
pub mod host;
pub mod logging;
pub mod provider;
pub mod state;
pub mod types;

// Re-export main types for easy access
pub use config::{ConfigError, EngineConfig, InsetsMode};
pub use controller::{InsetsStateController, SharedInsetsController, WindowMetricsRequest};
pub use host::InsetsHost;
pub use provider::InsetsSourceProvider;
pub use state::{InsetsSource, InsetsSourceControl, InsetsState};
pub use types::{ControlTarget, InsetType, WindowId};

// Re-export common error types
pub use anyhow::{Context, Error, Result};

/// Version information for the insets engine
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
