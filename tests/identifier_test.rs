//! Identifier normalizer tests

use tatakai_core::modules::identifier::UNKNOWN_LANGUAGE_CODE;
use tatakai_core::{normalize_language, parse_resource_identifier};

#[test]
fn canonical_url_parses_back_to_the_same_identifier() {
    for slug in [
        "naruto-shippuden-1x1",
        "one-piece-2x15",
        "attack-on-titan-final-season-4x28",
        "k-1x12",
    ] {
        let parsed = parse_resource_identifier(slug).expect("slug should parse");
        let reparsed =
            parse_resource_identifier(&parsed.canonical_url).expect("canonical URL should parse");

        assert_eq!(reparsed.raw_slug, parsed.raw_slug);
        assert_eq!(reparsed.resource_slug, parsed.resource_slug);
        assert_eq!((reparsed.season, reparsed.episode), (parsed.season, parsed.episode));
        assert_eq!(reparsed.canonical_url, parsed.canonical_url);
    }
}

#[test]
fn parsed_identifier_serializes_in_camel_case() {
    let parsed = parse_resource_identifier("naruto-shippuden-1x1").unwrap();
    let json = serde_json::to_value(&parsed).unwrap();

    assert_eq!(json["rawSlug"], "naruto-shippuden-1x1");
    assert_eq!(json["resourceSlug"], "naruto-shippuden");
    assert_eq!(json["season"], 1);
    assert_eq!(json["episode"], 1);
    assert_eq!(
        json["canonicalUrl"],
        "https://watchanimeworld.in/episode/naruto-shippuden-1x1/"
    );
}

#[test]
fn invalid_identifiers_are_rejected() {
    assert!(parse_resource_identifier("not-a-valid-format").is_none());
    assert!(parse_resource_identifier("https://watchanimeworld.in/episode/not-an-episode/").is_none());
}

#[test]
fn language_normalization_is_total() {
    for label in ["Hindi", "english", "JAPANESE", "Tamil", "und", "Klingon", "", "  "] {
        let tag = normalize_language(label);
        assert!(!tag.code.is_empty(), "{label:?} produced an empty code");
    }

    let unmapped = normalize_language("Esperanto");
    assert_eq!(unmapped.name, "Esperanto");
    assert_eq!(unmapped.code, UNKNOWN_LANGUAGE_CODE);
}

#[test]
fn only_japanese_is_the_original_track() {
    assert!(!normalize_language("Japanese").is_dub);
    for label in ["Hindi", "Tamil", "Telugu", "Malayalam", "Bengali", "Marathi", "Kannada", "English"] {
        assert!(normalize_language(label).is_dub, "{label} should be a dub");
    }
}

#[test]
fn language_tag_serializes_in_camel_case() {
    let json = serde_json::to_value(normalize_language("Telugu")).unwrap();
    assert_eq!(json["name"], "Telugu");
    assert_eq!(json["code"], "te");
    assert_eq!(json["isDub"], true);
}
