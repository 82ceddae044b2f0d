use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{require, TmdbConfig};
use crate::error::{ApiError, ConfigError};
use crate::models::{Episode, ItemDetails, MediaKind, MediaSummary};

const IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

/// `w500` poster URL for a metadata image path.
pub fn poster_url(path: Option<&str>) -> Option<String> {
    image_url("w500", path)
}

/// `w780` backdrop URL for a metadata image path.
pub fn backdrop_url(path: Option<&str>) -> Option<String> {
    image_url("w780", path)
}

fn image_url(size: &str, path: Option<&str>) -> Option<String> {
    path.filter(|p| !p.is_empty())
        .map(|p| format!("{}/{}{}", IMAGE_BASE, size, p))
}

fn year_of(date: Option<&str>) -> Option<String> {
    date.and_then(|d| d.split('-').next())
        .filter(|y| !y.is_empty())
        .map(str::to_string)
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    vote_average: Option<f64>,
}

impl Listing {
    fn into_summary(self, kind: MediaKind) -> MediaSummary {
        MediaSummary {
            id: self.id,
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            overview: self.overview.unwrap_or_default(),
            year: year_of(self.release_date.as_deref().or(self.first_air_date.as_deref())),
            poster_url: poster_url(self.poster_path.as_deref()),
            rating: self.vote_average,
        }
    }
}

#[derive(Debug, Deserialize)]
struct Genre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ExternalIds {
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Details {
    id: u64,
    title: Option<String>,
    name: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    #[serde(default)]
    genres: Vec<Genre>,
    vote_average: Option<f64>,
    number_of_seasons: Option<u32>,
    external_ids: Option<ExternalIds>,
}

impl Details {
    fn into_item(self, kind: MediaKind) -> ItemDetails {
        ItemDetails {
            id: self.id,
            kind,
            title: self.title.or(self.name).unwrap_or_default(),
            poster_url: poster_url(self.poster_path.as_deref()),
            backdrop_url: backdrop_url(self.backdrop_path.as_deref()),
            overview: self.overview.unwrap_or_default(),
            year: year_of(self.release_date.as_deref().or(self.first_air_date.as_deref()))
                .unwrap_or_default(),
            genres: self.genres.into_iter().map(|g| g.name).collect(),
            rating: self.vote_average,
            seasons: match kind {
                MediaKind::Show => self.number_of_seasons,
                MediaKind::Movie => None,
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct Season {
    #[serde(default)]
    episodes: Vec<Episode>,
}

/// Client for the movie/TV metadata API. The key travels as `api_key`.
pub struct TmdbClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl TmdbClient {
    pub fn new(config: &TmdbConfig) -> Result<Self, ConfigError> {
        let api_key = require(&config.api_key, "TMDB_API")?.to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        info!("Requesting metadata: {}", url);

        let response = self
            .client
            .get(&url)
            .query(&[("api_key", self.api_key.as_str())])
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status { url, status });
        }

        Ok(response.json().await?)
    }

    async fn listing(
        &self,
        path: &str,
        params: &[(&str, &str)],
        kind: MediaKind,
    ) -> Result<Vec<MediaSummary>, ApiError> {
        let page: Page<Listing> = self.get(path, params).await?;
        let results: Vec<_> = page
            .results
            .into_iter()
            .map(|l| l.into_summary(kind))
            .collect();

        info!("Found {} {} results", results.len(), kind);
        Ok(results)
    }

    pub async fn search_movies(&self, query: &str) -> Result<Vec<MediaSummary>, ApiError> {
        self.listing(
            "/search/movie",
            &[
                ("query", query),
                ("include_adult", "false"),
                ("language", "en-US"),
                ("page", "1"),
            ],
            MediaKind::Movie,
        )
        .await
    }

    pub async fn search_shows(&self, query: &str) -> Result<Vec<MediaSummary>, ApiError> {
        self.listing(
            "/search/tv",
            &[
                ("query", query),
                ("include_adult", "false"),
                ("language", "en-US"),
                ("page", "1"),
            ],
            MediaKind::Show,
        )
        .await
    }

    pub async fn upcoming_movies(&self) -> Result<Vec<MediaSummary>, ApiError> {
        self.listing(
            "/movie/upcoming",
            &[("language", "en-US"), ("page", "1")],
            MediaKind::Movie,
        )
        .await
    }

    pub async fn popular_movies(&self) -> Result<Vec<MediaSummary>, ApiError> {
        self.listing(
            "/movie/popular",
            &[("language", "en-US"), ("page", "1")],
            MediaKind::Movie,
        )
        .await
    }

    pub async fn trending_shows(&self) -> Result<Vec<MediaSummary>, ApiError> {
        self.listing("/trending/tv/day", &[("language", "en-US")], MediaKind::Show)
            .await
    }

    pub async fn item_details(&self, id: u64, kind: MediaKind) -> Result<ItemDetails, ApiError> {
        let path = format!("/{}/{}", kind.tmdb_segment(), id);
        let details: Details = self.get(&path, &[]).await?;
        Ok(details.into_item(kind))
    }

    pub async fn movie_details(&self, id: u64) -> Result<ItemDetails, ApiError> {
        self.item_details(id, MediaKind::Movie).await
    }

    pub async fn show_details(&self, id: u64) -> Result<ItemDetails, ApiError> {
        self.item_details(id, MediaKind::Show).await
    }

    pub async fn season_episodes(&self, show_id: u64, season: u32) -> Result<Vec<Episode>, ApiError> {
        let path = format!("/tv/{}/season/{}", show_id, season);
        let season: Season = self.get(&path, &[]).await?;
        Ok(season.episodes)
    }

    /// IMDb id for a title, or `None` if it has none or the lookup fails.
    pub async fn imdb_id(&self, id: u64, kind: MediaKind) -> Option<String> {
        let path = format!("/{}/{}", kind.tmdb_segment(), id);
        match self
            .get::<Details>(&path, &[("append_to_response", "external_ids")])
            .await
        {
            Ok(details) => details
                .external_ids
                .and_then(|ids| ids.imdb_id)
                .filter(|id| !id.is_empty()),
            Err(e) => {
                warn!("IMDb id lookup for {} {} failed: {}", kind, id, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_need_a_path() {
        assert_eq!(
            poster_url(Some("/abc.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w500/abc.jpg")
        );
        assert_eq!(
            backdrop_url(Some("/b.jpg")).as_deref(),
            Some("https://image.tmdb.org/t/p/w780/b.jpg")
        );
        assert_eq!(poster_url(None), None);
        assert_eq!(poster_url(Some("")), None);
    }

    #[test]
    fn show_details_use_name_and_air_date() {
        let details: Details = serde_json::from_str(
            r#"{
                "id": 70523,
                "name": "Dark",
                "overview": "A missing child...",
                "poster_path": "/p.jpg",
                "backdrop_path": null,
                "first_air_date": "2017-12-01",
                "genres": [{"id": 18, "name": "Drama"}, {"id": 9648, "name": "Mystery"}],
                "vote_average": 8.4,
                "number_of_seasons": 3
            }"#,
        )
        .unwrap();

        let item = details.into_item(MediaKind::Show);
        assert_eq!(item.title, "Dark");
        assert_eq!(item.year, "2017");
        assert_eq!(item.genres, vec!["Drama", "Mystery"]);
        assert_eq!(item.seasons, Some(3));
        assert!(item.backdrop_url.is_none());
    }

    #[test]
    fn missing_api_key_is_a_config_error() {
        assert!(matches!(
            TmdbClient::new(&TmdbConfig::default()),
            Err(ConfigError::MissingCredential("TMDB_API"))
        ));
    }
}
