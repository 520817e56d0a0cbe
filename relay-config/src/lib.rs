//! Configuration types and loading for relay transfers.
//!
//! Configuration is layered: a base file, an environment-specific file, and `APP_`-prefixed
//! environment variable overrides. See [`load_config`] for the exact resolution order.

mod environment;
mod load;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
