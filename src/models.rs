use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Movie or TV show. The tracking API calls shows "show", the metadata API "tv".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Movie,
    Show,
}

impl MediaKind {
    /// Path segment used by the metadata API.
    pub fn tmdb_segment(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "tv",
        }
    }

    /// Singular key used by the tracking API ("movie" / "show").
    pub fn trakt_key(self) -> &'static str {
        match self {
            MediaKind::Movie => "movie",
            MediaKind::Show => "show",
        }
    }

    /// Plural key used in tracking API list payloads.
    pub fn trakt_plural(self) -> &'static str {
        match self {
            MediaKind::Movie => "movies",
            MediaKind::Show => "shows",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.trakt_key())
    }
}

impl FromStr for MediaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "movie" | "movies" => Ok(MediaKind::Movie),
            "show" | "shows" | "tv" => Ok(MediaKind::Show),
            other => Err(format!("unknown media kind: {}", other)),
        }
    }
}

/// One entry of a search or discovery listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaSummary {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub overview: String,
    pub year: Option<String>,
    pub poster_url: Option<String>,
    pub rating: Option<f64>,
}

/// Normalised details for a single movie or show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemDetails {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub overview: String,
    pub year: String,
    pub genres: Vec<String>,
    pub rating: Option<f64>,
    pub seasons: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub episode_number: u32,
    pub name: String,
    pub air_date: Option<String>,
    pub overview: Option<String>,
}

/// A personal list on the tracking service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraktList {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub item_count: u32,
    pub ids: ListIds,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListIds {
    pub trakt: u64,
    #[serde(default)]
    pub slug: Option<String>,
}

/// A movie or show inside a tracking list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListItem {
    pub kind: MediaKind,
    pub title: String,
    pub trakt_id: Option<u64>,
    pub tmdb_id: Option<u64>,
}

/// A list item joined with its metadata. Missing metadata leaves the
/// optional fields empty and `id` at zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedListItem {
    pub id: u64,
    pub kind: MediaKind,
    pub title: String,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub overview: String,
    pub year: String,
}

impl EnrichedListItem {
    pub fn placeholder(item: &ListItem) -> Self {
        Self {
            id: 0,
            kind: item.kind,
            title: if item.title.is_empty() {
                "Unknown Title".to_string()
            } else {
                item.title.clone()
            },
            poster_url: None,
            backdrop_url: None,
            overview: String::new(),
            year: String::new(),
        }
    }
}
