use reqwest::StatusCode;
use thiserror::Error;

/// Failure to retrieve a page. Aborts the scrape it belongs to.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
}

impl FetchError {
    pub(crate) fn from_reqwest(url: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else {
            FetchError::Transport {
                url: url.to_string(),
                source,
            }
        }
    }
}

/// Scraper settings that cannot be turned into an extractor.
#[derive(Error, Debug)]
pub enum ExtractorError {
    #[error("invalid post selector {selector:?}: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Failure to hand a single link to the transfer service.
#[derive(Error, Debug)]
pub enum SubmissionError {
    #[error("transfer request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("transfer service returned HTTP {0}")]
    Status(StatusCode),
    #[error("transfer rejected: {0}")]
    Rejected(String),
    #[error("no transfer service API key configured")]
    MissingApiKey,
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("not logged in")]
    NotLoggedIn,
    #[error("no refresh token available")]
    NoRefreshToken,
    #[error("token refresh rejected with HTTP {0}")]
    RefreshRejected(StatusCode),
    #[error("device authorization failed with HTTP {0}")]
    DeviceCodeRejected(StatusCode),
    #[error("authentication timed out")]
    DeviceCodeExpired,
    #[error("profile lookup failed with HTTP {0}")]
    ProfileUnavailable(StatusCode),
    #[error("authorization request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Errors from the metadata and list-tracking APIs.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: StatusCode },
    #[error(transparent)]
    Auth(#[from] AuthError),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("credential store is corrupt: {0}")]
    Json(#[from] serde_json::Error),
    #[error("cannot resolve data directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("credential store lock poisoned")]
    Poisoned,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot resolve config directory: {0}")]
    Xdg(#[from] xdg::BaseDirectoriesError),
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),
    #[error("cannot build HTTP client: {0}")]
    Client(#[from] reqwest::Error),
}
