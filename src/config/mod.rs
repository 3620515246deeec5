//! Service configuration subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ControlPlaneConfig (validated, immutable)
//!     → consumed once at startup by main
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Fragment documents are not service configuration; they are watched
//!   and reloaded by the sync subsystem

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, ControlPlaneConfig, ListenerConfig, ListenersConfig, LogFormat, MergeConfig,
    ObservabilityConfig, WatchConfig,
};
pub use validation::{validate_config, ValidationError};
