pub mod language;
pub mod resource_identifier;

pub use language::{normalize_language, LanguageTag, UNKNOWN_LANGUAGE_CODE};
pub use resource_identifier::{parse_resource_identifier, IdentifierParser, ParsedIdentifier};
