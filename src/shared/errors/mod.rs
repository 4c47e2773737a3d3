pub mod gateway_error;

pub use gateway_error::{ErrorKind, GatewayError, GatewayResult};
