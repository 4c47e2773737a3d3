use crate::shared::errors::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Aggregation-library categories exposed under `/consumet/<category>`
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderCategory {
    Anime,
    Manga,
    Meta,
    News,
    LightNovels,
    Comics,
}

impl ProviderCategory {
    pub const ALL: [ProviderCategory; 6] = [
        ProviderCategory::Anime,
        ProviderCategory::Manga,
        ProviderCategory::Meta,
        ProviderCategory::News,
        ProviderCategory::LightNovels,
        ProviderCategory::Comics,
    ];

    pub fn route_segment(&self) -> &'static str {
        match self {
            ProviderCategory::Anime => "anime",
            ProviderCategory::Manga => "manga",
            ProviderCategory::Meta => "meta",
            ProviderCategory::News => "news",
            ProviderCategory::LightNovels => "light-novels",
            ProviderCategory::Comics => "comics",
        }
    }

    pub fn from_route(segment: &str) -> GatewayResult<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.route_segment() == segment)
            .ok_or_else(|| {
                GatewayError::InvalidInput(format!("Unknown provider category: {}", segment))
            })
    }

    /// Every provider registered in this category, in listing order
    pub fn providers(&self) -> &'static [Provider] {
        match self {
            ProviderCategory::Anime => &[
                Provider::Gogoanime,
                Provider::Zoro,
                Provider::Enime,
                Provider::AnimePahe,
                Provider::NineAnime,
            ],
            ProviderCategory::Manga => &[
                Provider::MangaDex,
                Provider::MangaHere,
                Provider::MangaKakalot,
                Provider::MangaPark,
            ],
            ProviderCategory::Meta => &[Provider::Anilist, Provider::Tmdb],
            ProviderCategory::News => &[Provider::AnimeNewsNetwork],
            ProviderCategory::LightNovels => &[Provider::ReadLightNovels],
            ProviderCategory::Comics => &[Provider::GetComics],
        }
    }

    pub fn listing(&self) -> ProviderListing {
        let label = match self {
            ProviderCategory::LightNovels => "light novel",
            other => other.route_segment(),
        };

        ProviderListing {
            message: format!("Available {} providers", label),
            providers: self.providers().iter().map(|p| p.route_name()).collect(),
        }
    }
}

impl fmt::Display for ProviderCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.route_segment())
    }
}

/// Body of a category's provider listing route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderListing {
    pub message: String,
    pub providers: Vec<&'static str>,
}

/// Operations a provider can serve
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Operation {
    Search,
    Info,
    Watch,
    Read,
    RecentEpisodes,
    Trending,
    NewsFeed,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Search => "search",
            Operation::Info => "info",
            Operation::Watch => "watch",
            Operation::Read => "read",
            Operation::RecentEpisodes => "recent-episodes",
            Operation::Trending => "trending",
            Operation::NewsFeed => "news-feed",
        }
    }
}

/// Closed set of upstream providers reachable through the aggregation library
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Provider {
    #[serde(rename = "gogoanime")]
    Gogoanime,
    #[serde(rename = "zoro")]
    Zoro,
    #[serde(rename = "enime")]
    Enime,
    #[serde(rename = "animepahe")]
    AnimePahe,
    #[serde(rename = "9anime")]
    NineAnime,
    #[serde(rename = "mangadex")]
    MangaDex,
    #[serde(rename = "mangahere")]
    MangaHere,
    #[serde(rename = "mangakakalot")]
    MangaKakalot,
    #[serde(rename = "mangapark")]
    MangaPark,
    #[serde(rename = "anilist")]
    Anilist,
    #[serde(rename = "tmdb")]
    Tmdb,
    #[serde(rename = "ann")]
    AnimeNewsNetwork,
    #[serde(rename = "read_light_novels")]
    ReadLightNovels,
    #[serde(rename = "getComics")]
    GetComics,
}

impl Provider {
    /// Path segment the provider is mounted under
    pub fn route_name(&self) -> &'static str {
        match self {
            Provider::Gogoanime => "gogoanime",
            Provider::Zoro => "zoro",
            Provider::Enime => "enime",
            Provider::AnimePahe => "animepahe",
            Provider::NineAnime => "9anime",
            Provider::MangaDex => "mangadex",
            Provider::MangaHere => "mangahere",
            Provider::MangaKakalot => "mangakakalot",
            Provider::MangaPark => "mangapark",
            Provider::Anilist => "anilist",
            Provider::Tmdb => "tmdb",
            Provider::AnimeNewsNetwork => "ann",
            Provider::ReadLightNovels => "read_light_novels",
            Provider::GetComics => "getComics",
        }
    }

    pub fn category(&self) -> ProviderCategory {
        match self {
            Provider::Gogoanime
            | Provider::Zoro
            | Provider::Enime
            | Provider::AnimePahe
            | Provider::NineAnime => ProviderCategory::Anime,
            Provider::MangaDex
            | Provider::MangaHere
            | Provider::MangaKakalot
            | Provider::MangaPark => ProviderCategory::Manga,
            Provider::Anilist | Provider::Tmdb => ProviderCategory::Meta,
            Provider::AnimeNewsNetwork => ProviderCategory::News,
            Provider::ReadLightNovels => ProviderCategory::LightNovels,
            Provider::GetComics => ProviderCategory::Comics,
        }
    }

    pub fn capabilities(&self) -> &'static [Operation] {
        match self {
            Provider::Gogoanime => &[
                Operation::Search,
                Operation::Info,
                Operation::Watch,
                Operation::RecentEpisodes,
            ],
            Provider::Zoro | Provider::Enime | Provider::AnimePahe | Provider::NineAnime => {
                &[Operation::Search, Operation::Info, Operation::Watch]
            }
            Provider::MangaDex
            | Provider::MangaHere
            | Provider::MangaKakalot
            | Provider::MangaPark => &[Operation::Search, Operation::Info, Operation::Read],
            Provider::Anilist => &[
                Operation::Search,
                Operation::Info,
                Operation::Trending,
                Operation::Watch,
            ],
            // Listed under meta, but no routes are mounted for it
            Provider::Tmdb => &[],
            Provider::AnimeNewsNetwork => &[Operation::NewsFeed],
            Provider::ReadLightNovels | Provider::GetComics => &[Operation::Search],
        }
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.capabilities().contains(&operation)
    }

    pub fn ensure_supports(&self, operation: Operation) -> GatewayResult<()> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(GatewayError::NotFound(format!(
                "{} does not support {}",
                self,
                operation.as_str()
            )))
        }
    }

    /// Resolve a route segment within a category
    pub fn from_route(category: ProviderCategory, name: &str) -> GatewayResult<Self> {
        category
            .providers()
            .iter()
            .copied()
            .find(|provider| provider.route_name().eq_ignore_ascii_case(name))
            .ok_or_else(|| {
                GatewayError::InvalidInput(format!("Unknown {} provider: {}", category, name))
            })
    }

    /// Cache key namespaced by category, provider and operation
    pub fn cache_key(&self, operation: Operation, args: &[&str]) -> String {
        let mut key = format!(
            "consumet:{}:{}:{}",
            self.category().route_segment(),
            self.route_name(),
            operation.as_str()
        );
        for arg in args {
            key.push(':');
            key.push_str(&urlencoding::encode(arg));
        }
        key
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.route_name())
    }
}
