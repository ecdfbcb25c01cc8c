//! Explicit configuration values handed to each client at construction.

use std::time::Duration;

use url::Url;

use crate::auth::Token;
use crate::error::{CommitLensError, Result};

pub const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com/";
pub const DEFAULT_COMPLETION_API_URL: &str = "https://api.openai.com/v1/";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-4-turbo";
pub const DEFAULT_AUTHORIZE_URL: &str = "https://github.com/login/oauth/authorize";
pub const DEFAULT_TOKEN_URL: &str = "https://github.com/login/oauth/access_token";
pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:8501/callback";
pub const DEFAULT_SCOPE: &str = "repo";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// GitHub REST and GraphQL endpoints.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    /// REST base, always ending in `/`. GraphQL lives at `<api_url>graphql`.
    pub api_url: Url,
    pub token: Option<Token>,
    pub timeout: Duration,
}

impl GitHubConfig {
    pub fn new(api_url: &str, token: Option<Token>, timeout: Duration) -> Result<Self> {
        Ok(Self {
            api_url: base_url(api_url)?,
            token: token.filter(|t| !t.is_empty()),
            timeout,
        })
    }
}

/// Chat completion endpoint and model.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_url: Url,
    pub api_key: Token,
    pub model: String,
    pub timeout: Duration,
}

impl CompletionConfig {
    pub fn new(api_url: &str, api_key: Token, model: &str, timeout: Duration) -> Result<Self> {
        if api_key.is_empty() {
            return Err(CommitLensError::Config(
                "A completion API key is required (set OPENAI_API_KEY)".to_string(),
            ));
        }

        Ok(Self {
            api_url: base_url(api_url)?,
            api_key,
            model: model.to_string(),
            timeout,
        })
    }
}

/// A pre-registered OAuth application.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    pub client_id: String,
    pub client_secret: Token,
    pub redirect_uri: String,
    pub scope: String,
    pub authorize_url: Url,
    pub token_url: Url,
    pub timeout: Duration,
}

/// Options of the analysis run that are not credentials.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisOptions {
    /// Completion requests in flight at once. `1` keeps requests strictly sequential.
    pub concurrency: usize,
    /// Surface commits whose analysis failed in the report.
    pub include_skipped: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            concurrency: 1,
            include_skipped: false,
        }
    }
}

/// Parse a base URL, normalising it to end in `/` so relative joins append.
pub fn base_url(raw: &str) -> Result<Url> {
    let mut url =
        Url::parse(raw).map_err(|e| CommitLensError::Config(format!("Invalid URL '{raw}': {e}")))?;

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }

    Ok(url)
}

/// Parse an absolute endpoint URL as-is.
pub fn endpoint_url(raw: &str) -> Result<Url> {
    Url::parse(raw).map_err(|e| CommitLensError::Config(format!("Invalid URL '{raw}': {e}")))
}
