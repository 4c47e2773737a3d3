pub mod provider;

pub use provider::{Operation, Provider, ProviderCategory, ProviderListing};
