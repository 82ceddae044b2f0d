//! Search URLs on the content-indexing sites for a title or an episode.

use crate::config::SourcesConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeTarget {
    /// What the user is looking for, e.g. `"Dark S01E03"`.
    pub search_term: String,
    pub url: String,
}

/// `S01E03` style tag for an episode.
pub fn episode_tag(season: u32, episode: u32) -> String {
    format!("S{:02}E{:02}", season, episode)
}

/// Search for a whole movie or show by title.
pub fn title_target(sources: &SourcesConfig, title: &str) -> ScrapeTarget {
    ScrapeTarget {
        search_term: title.to_string(),
        url: format!("{}{}", sources.movie_search, urlencoding::encode(title)),
    }
}

/// Search for one episode. An IMDb id, when known, is a more precise query
/// than the title.
pub fn episode_target(
    sources: &SourcesConfig,
    title: &str,
    season: u32,
    episode: u32,
    imdb_id: Option<&str>,
) -> ScrapeTarget {
    let search_term = format!("{} {}", title, episode_tag(season, episode));
    let base = &sources.episode_search;
    let url = match imdb_id.filter(|id| !id.is_empty()) {
        Some(id) => format!("{}{}", base, id),
        None => format!("{}{}", base, urlencoding::encode(&search_term)),
    };

    ScrapeTarget { search_term, url }
}
