pub mod config;
pub mod errors;
pub mod utils;

pub use config::GatewayConfig;
pub use errors::{GatewayError, GatewayResult};
