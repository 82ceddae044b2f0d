use async_trait::async_trait;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::{ProxyConfig, ScraperConfig};
use crate::error::FetchError;

/// Anything that can hand back the HTML of a page.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Plain HTTP GET with a browser-like user agent, optionally routed through
/// a JS-rendering proxy. No retries.
pub struct PageFetcher {
    client: reqwest::Client,
    proxy: Option<ProxyConfig>,
}

impl PageFetcher {
    pub fn new(config: &ScraperConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            proxy: config.proxy.clone(),
        })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        match &self.proxy {
            Some(proxy) => self.client.get(&proxy.base_url).query(&[
                ("api_key", proxy.api_key.as_str()),
                ("url", url),
                ("render_js", if proxy.render_js { "true" } else { "false" }),
                ("premium_proxy", "false"),
            ]),
            None => self.client.get(url),
        }
    }
}

#[async_trait]
impl PageSource for PageFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        info!(
            "Fetching {}{}",
            url,
            if self.proxy.is_some() { " via proxy" } else { "" }
        );

        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        let status = response.status();
        info!("{} responded with {}", url, status);
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status,
            });
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(url, e))?;

        info!("Received {} bytes from {}", html.len(), url);
        debug!("Body starts: {}", snippet(&html, 500));

        Ok(html)
    }
}

fn snippet(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("héllo", 2), "hé");
        assert_eq!(snippet("abc", 10), "abc");
        assert_eq!(snippet("", 3), "");
    }
}
