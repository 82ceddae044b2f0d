//! Pulls candidate download links out of fetched HTML.
//!
//! Indexing sites are uncontrolled, so extraction is best-effort: broken
//! markup or a page without links gives back fewer (or zero) candidates,
//! never an error.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Url;
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use tracing::{info, warn};

use crate::config::ScraperConfig;
use crate::error::ExtractorError;
use crate::fetcher::PageSource;
use crate::links::CandidateLink;

lazy_static! {
    static ref FLAT_LINK: Regex = Regex::new(
        r#"(?i)https?://(?:www\.)?(?:mega\.nz|1fichier\.com|rapidgator\.net|uploaded\.net|filefactory\.com|turbobit\.net|zippyshare\.com|mediafire\.com)/[^\s"'<>]+"#
    )
    .unwrap();
    static ref ANCHOR: Selector = Selector::parse("a[href]").unwrap();
}

/// Domains the post-pages strategy accepts links from.
const POST_HOSTS: &[&str] = &[
    "mega.nz",
    "rapidgator.net",
    "1fichier.com",
    "mediafire.com",
    "turbobit.net",
    "filefactory.com",
    "zippyshare.com",
    "uploaded.net",
    "file.io",
    "sendspace.com",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// One regex over the whole document.
    #[default]
    Flat,
    /// Follow post links from a results page and collect anchors there.
    Posts,
}

impl FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "flat" => Ok(StrategyKind::Flat),
            "posts" => Ok(StrategyKind::Posts),
            other => Err(format!("unknown strategy: {} (expected flat or posts)", other)),
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::Flat => f.write_str("flat"),
            StrategyKind::Posts => f.write_str("posts"),
        }
    }
}

#[async_trait]
pub trait LinkExtractor: Send + Sync {
    fn name(&self) -> &'static str;

    /// Candidate links found for the page at `page_url` whose body is `html`.
    /// `source` is used for any further pages the strategy needs.
    async fn extract(&self, page_url: &str, html: &str, source: &dyn PageSource)
        -> Vec<CandidateLink>;
}

/// Builds the extractor selected by `kind` using the scraper settings.
pub fn for_strategy(
    kind: StrategyKind,
    config: &ScraperConfig,
) -> Result<Box<dyn LinkExtractor>, ExtractorError> {
    Ok(match kind {
        StrategyKind::Flat => Box::new(FlatRegexExtractor),
        StrategyKind::Posts => Box::new(PostPagesExtractor::new(
            &config.post_selector,
            &config.post_path_marker,
            config.max_posts,
        )?),
    })
}

/// Every non-overlapping whitelisted-host URL anywhere in the document.
pub struct FlatRegexExtractor;

impl FlatRegexExtractor {
    pub fn scan(html: &str) -> Vec<CandidateLink> {
        FLAT_LINK
            .find_iter(html)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[async_trait]
impl LinkExtractor for FlatRegexExtractor {
    fn name(&self) -> &'static str {
        "flat"
    }

    async fn extract(
        &self,
        _page_url: &str,
        html: &str,
        _source: &dyn PageSource,
    ) -> Vec<CandidateLink> {
        let links = Self::scan(html);
        info!("Found {} candidate links", links.len());
        links
    }
}

/// Two hops: post links on the results page, then hosted-file anchors on
/// each of the first `max_posts` posts.
pub struct PostPagesExtractor {
    post_selector: Selector,
    path_marker: String,
    max_posts: usize,
}

impl PostPagesExtractor {
    pub fn new(
        post_selector: &str,
        path_marker: &str,
        max_posts: usize,
    ) -> Result<Self, ExtractorError> {
        let post_selector =
            Selector::parse(post_selector).map_err(|e| ExtractorError::InvalidSelector {
                selector: post_selector.to_string(),
                reason: format!("{:?}", e),
            })?;

        Ok(Self {
            post_selector,
            path_marker: path_marker.to_string(),
            max_posts,
        })
    }

    /// Distinct post URLs on a results page, capped at `max_posts`.
    pub fn post_links(&self, page_url: &str, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();
        let mut seen = HashSet::new();

        document
            .select(&self.post_selector)
            .filter_map(|a| a.value().attr("href"))
            .filter(|href| href.contains(&self.path_marker))
            .filter_map(|href| resolve(base.as_ref(), href))
            .filter(|url| seen.insert(url.clone()))
            .take(self.max_posts)
            .collect()
    }

    /// Anchors on a post page that point at an accepted host.
    pub fn hosted_links(post_url: &str, html: &str) -> Vec<CandidateLink> {
        let document = Html::parse_document(html);
        let base = Url::parse(post_url).ok();

        document
            .select(&ANCHOR)
            .filter_map(|a| a.value().attr("href"))
            .filter_map(|href| resolve(base.as_ref(), href))
            .filter(|url| is_post_host(url))
            .collect()
    }
}

#[async_trait]
impl LinkExtractor for PostPagesExtractor {
    fn name(&self) -> &'static str {
        "posts"
    }

    async fn extract(
        &self,
        page_url: &str,
        html: &str,
        source: &dyn PageSource,
    ) -> Vec<CandidateLink> {
        let posts = self.post_links(page_url, html);
        info!("Following {} post pages", posts.len());

        let mut links = Vec::new();
        for post in &posts {
            match source.fetch(post).await {
                Ok(body) => {
                    let found = Self::hosted_links(post, &body);
                    info!("Found {} links on {}", found.len(), post);
                    links.extend(found);
                }
                Err(e) => warn!("Skipping post {}: {}", post, e),
            }
        }

        links
    }
}

fn resolve(base: Option<&Url>, href: &str) -> Option<String> {
    let url = match base {
        Some(base) => base.join(href.trim()).ok()?,
        None => Url::parse(href.trim()).ok()?,
    };
    matches!(url.scheme(), "http" | "https").then(|| url.to_string())
}

fn is_post_host(url: &str) -> bool {
    let Some(host) = Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
    else {
        return false;
    };
    let host = host.strip_prefix("www.").unwrap_or(&host);

    POST_HOSTS
        .iter()
        .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use pretty_assertions::assert_eq;
    use reqwest::StatusCode;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Serves canned pages and records what was asked for.
    struct CannedPages {
        pages: HashMap<String, String>,
        requested: Mutex<Vec<String>>,
    }

    impl CannedPages {
        fn new(pages: &[(&str, &str)]) -> Self {
            Self {
                pages: pages
                    .iter()
                    .map(|(u, b)| (u.to_string(), b.to_string()))
                    .collect(),
                requested: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl PageSource for CannedPages {
        async fn fetch(&self, url: &str) -> Result<String, FetchError> {
            self.requested.lock().unwrap().push(url.to_string());
            self.pages.get(url).cloned().ok_or_else(|| FetchError::Status {
                url: url.to_string(),
                status: StatusCode::NOT_FOUND,
            })
        }
    }

    #[test]
    fn flat_scan_ignores_pages_without_hosts() {
        assert!(FlatRegexExtractor::scan("").is_empty());
        assert!(FlatRegexExtractor::scan("<html><body><a href=\"https://example.com/x\">x</a>").is_empty());
        assert!(FlatRegexExtractor::scan("<<<not>even html").is_empty());
    }

    #[test]
    fn flat_scan_finds_links_in_arbitrary_text() {
        let html = r#"
            <p>mirror one: https://mega.nz/#abc and again https://mega.nz/#abc</p>
            <a href="https://www.mediafire.com/xyz">mf</a>
            <span>'https://RAPIDGATOR.net/file/123'</span>
        "#;

        assert_eq!(
            FlatRegexExtractor::scan(html),
            vec![
                "https://mega.nz/#abc".to_string(),
                "https://mega.nz/#abc".to_string(),
                "https://www.mediafire.com/xyz".to_string(),
                "https://RAPIDGATOR.net/file/123".to_string(),
            ]
        );
    }

    #[test]
    fn flat_scan_stops_at_markup() {
        let links = FlatRegexExtractor::scan("<li>https://1fichier.com/?abc</li>");
        assert_eq!(links, vec!["https://1fichier.com/?abc".to_string()]);
    }

    #[test]
    fn post_links_filter_by_marker_and_cap() {
        let extractor = PostPagesExtractor::new("h2 a", "/download/", 3).unwrap();
        let html = r#"
            <h2><a href="/download/one.html">One</a></h2>
            <h2><a href="/about">About</a></h2>
            <h2><a href="/download/one.html">One again</a></h2>
            <h2><a href="https://site.test/download/two.html">Two</a></h2>
            <h2><a href="/download/three.html">Three</a></h2>
            <h2><a href="/download/four.html">Four</a></h2>
            <p><a href="/download/not-a-heading.html">x</a></p>
        "#;

        assert_eq!(
            extractor.post_links("https://site.test/search/heat", html),
            vec![
                "https://site.test/download/one.html".to_string(),
                "https://site.test/download/two.html".to_string(),
                "https://site.test/download/three.html".to_string(),
            ]
        );
    }

    #[test]
    fn hosted_links_accept_extended_whitelist_only() {
        let html = r#"
            <a href="https://file.io/abc">io</a>
            <a href="https://www.sendspace.com/file/xyz">ss</a>
            <a href="https://mega.nz/file/q">mega</a>
            <a href="https://notmega.nz.evil.test/x">evil</a>
            <a href="https://example.com/mega.nz">other</a>
            <a href="magnet:?xt=urn:btih:abc">magnet</a>
            <a href="/relative">rel</a>
        "#;

        assert_eq!(
            PostPagesExtractor::hosted_links("https://site.test/download/one.html", html),
            vec![
                "https://file.io/abc".to_string(),
                "https://www.sendspace.com/file/xyz".to_string(),
                "https://mega.nz/file/q".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn posts_strategy_follows_posts_and_skips_failures() {
        let results = r#"
            <h2><a href="/download/a.html">A</a></h2>
            <h2><a href="/download/missing.html">Missing</a></h2>
            <h2><a href="/download/b.html">B</a></h2>
        "#;
        let source = CannedPages::new(&[
            (
                "https://site.test/download/a.html",
                r#"<a href="https://rapidgator.net/file/1">rg</a>"#,
            ),
            (
                "https://site.test/download/b.html",
                r#"<a href="https://mediafire.com/file/2">mf</a><a href="https://rapidgator.net/file/1">rg</a>"#,
            ),
        ]);
        let extractor = PostPagesExtractor::new("h2 a", "/download/", 3).unwrap();

        let links = extractor
            .extract("https://site.test/search/x", results, &source)
            .await;

        assert_eq!(
            links,
            vec![
                "https://rapidgator.net/file/1".to_string(),
                "https://mediafire.com/file/2".to_string(),
                "https://rapidgator.net/file/1".to_string(),
            ]
        );
        assert_eq!(source.requested.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn flat_strategy_never_fetches() {
        let source = CannedPages::new(&[]);
        let links = FlatRegexExtractor
            .extract("https://site.test", "https://mega.nz/#k", &source)
            .await;

        assert_eq!(links, vec!["https://mega.nz/#k".to_string()]);
        assert!(source.requested.lock().unwrap().is_empty());
    }

    #[test]
    fn invalid_post_selector_is_rejected() {
        assert!(matches!(
            PostPagesExtractor::new("h2 >>> [", "/d/", 3),
            Err(ExtractorError::InvalidSelector { ref selector, .. }) if selector == "h2 >>> ["
        ));
    }

    #[test]
    fn configured_selector_is_checked_when_building() {
        let config = ScraperConfig {
            post_selector: "h2 >>> [".to_string(),
            ..ScraperConfig::default()
        };
        assert!(for_strategy(StrategyKind::Flat, &config).is_ok());
        assert!(matches!(
            for_strategy(StrategyKind::Posts, &config),
            Err(ExtractorError::InvalidSelector { .. })
        ));
    }

    #[test]
    fn strategy_parses_from_cli_text() {
        assert_eq!("Posts".parse::<StrategyKind>(), Ok(StrategyKind::Posts));
        assert!("dom".parse::<StrategyKind>().is_err());
    }
}
