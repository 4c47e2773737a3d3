//! Episode slugs of the form `<resource>-<season>x<episode>`, given either
//! bare (`naruto-shippuden-1x1`) or as a full episode URL.

use regex::Regex;
use reqwest::Url;
use serde::Serialize;
use std::sync::OnceLock;

pub const DEFAULT_EPISODE_BASE: &str = "https://watchanimeworld.in";
pub const DEFAULT_ROUTE_PREFIX: &str = "episode";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedIdentifier {
    pub raw_slug: String,
    pub resource_slug: String,
    pub season: u32,
    pub episode: u32,
    pub canonical_url: String,
}

/// Parser bound to one site's base URL and episode route prefix
#[derive(Debug, Clone)]
pub struct IdentifierParser {
    base_url: String,
    route_prefix: String,
}

impl Default for IdentifierParser {
    fn default() -> Self {
        Self::new(DEFAULT_EPISODE_BASE, DEFAULT_ROUTE_PREFIX)
    }
}

impl IdentifierParser {
    pub fn new(base_url: impl Into<String>, route_prefix: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            route_prefix: route_prefix.into().trim_matches('/').to_string(),
        }
    }

    /// Parse a slug or URL; anything that is not exactly the trailing
    /// `-<digits>x<digits>` shape is rejected as a whole
    pub fn parse(&self, input: &str) -> Option<ParsedIdentifier> {
        let input = input.trim();
        let (slug, canonical_url) = if input.starts_with("http") {
            (self.slug_from_url(input)?, input.to_string())
        } else {
            (
                input.to_string(),
                format!("{}/{}/{}/", self.base_url, self.route_prefix, input),
            )
        };

        let captures = slug_pattern().captures(&slug)?;
        let resource_slug = captures.get(1)?.as_str().to_string();
        let season = positive(captures.get(2)?.as_str())?;
        let episode = positive(captures.get(3)?.as_str())?;

        Some(ParsedIdentifier {
            raw_slug: slug,
            resource_slug,
            season,
            episode,
            canonical_url,
        })
    }

    /// Path must be `/<prefix>/<slug>` with an optional trailing slash
    fn slug_from_url(&self, input: &str) -> Option<String> {
        let url = Url::parse(input).ok()?;
        let mut segments: Vec<&str> = url.path_segments()?.collect();
        if segments.last() == Some(&"") {
            segments.pop();
        }

        match segments.as_slice() {
            [.., prefix, slug] if *prefix == self.route_prefix && !slug.is_empty() => {
                Some(slug.to_string())
            }
            _ => None,
        }
    }
}

/// Parse with the default episode site
pub fn parse_resource_identifier(input: &str) -> Option<ParsedIdentifier> {
    IdentifierParser::default().parse(input)
}

fn slug_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(.+?)-(\d+)x(\d+)$").expect("episode slug pattern is valid")
    })
}

fn positive(digits: &str) -> Option<u32> {
    digits.parse::<u32>().ok().filter(|n| *n > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_slug() {
        let parsed = parse_resource_identifier("naruto-shippuden-1x1").unwrap();
        assert_eq!(parsed.resource_slug, "naruto-shippuden");
        assert_eq!(parsed.season, 1);
        assert_eq!(parsed.episode, 1);
        assert_eq!(parsed.raw_slug, "naruto-shippuden-1x1");
        assert_eq!(
            parsed.canonical_url,
            "https://watchanimeworld.in/episode/naruto-shippuden-1x1/"
        );
    }

    #[test]
    fn test_parses_full_url() {
        let url = "https://watchanimeworld.in/episode/one-piece-2x15/";
        let parsed = parse_resource_identifier(url).unwrap();
        assert_eq!(parsed.resource_slug, "one-piece");
        assert_eq!(parsed.season, 2);
        assert_eq!(parsed.episode, 15);
        assert_eq!(parsed.canonical_url, url);
    }

    #[test]
    fn test_only_the_trailing_suffix_counts() {
        let parsed = parse_resource_identifier("show-1x1-2x3").unwrap();
        assert_eq!(parsed.resource_slug, "show-1x1");
        assert_eq!((parsed.season, parsed.episode), (2, 3));
    }

    #[test]
    fn test_resource_part_is_taken_verbatim() {
        let parsed = parse_resource_identifier("one piece-1x2").unwrap();
        assert_eq!(parsed.resource_slug, "one piece");
        assert_eq!((parsed.season, parsed.episode), (1, 2));
        assert_eq!(
            parsed.canonical_url,
            "https://watchanimeworld.in/episode/one piece-1x2/"
        );
    }

    #[test]
    fn test_rejects_malformed_input() {
        for input in [
            "not-a-valid-format",
            "naruto-1x",
            "naruto-x1",
            "-1x1",
            "naruto-1x1-extra",
            "naruto-ax1",
            "naruto-0x1",
            "naruto-1x99999999999",
            "",
        ] {
            assert!(parse_resource_identifier(input).is_none(), "{input}");
        }
    }

    #[test]
    fn test_rejects_urls_outside_the_episode_route() {
        assert!(parse_resource_identifier("https://watchanimeworld.in/series/naruto-1x1/").is_none());
        assert!(parse_resource_identifier("https://watchanimeworld.in/episode/").is_none());
        assert!(parse_resource_identifier("http://[bad-url").is_none());
    }

    #[test]
    fn test_custom_site() {
        let parser = IdentifierParser::new("https://mirror.example/", "/watch/");
        let parsed = parser.parse("bleach-1x4").unwrap();
        assert_eq!(parsed.canonical_url, "https://mirror.example/watch/bleach-1x4/");
        assert!(parser
            .parse("https://mirror.example/watch/bleach-1x4")
            .is_some());
    }
}
