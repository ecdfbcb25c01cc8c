use reqwest::Client;
use url::Url;

use crate::auth::Token;
use crate::config::GitHubConfig;
use crate::error::{CommitLensError, Result};
use crate::providers::http_client;

pub struct GitHubClient {
    pub client: Client,
    pub api_url: Url,
    pub graphql_url: Url,
    pub token: Option<Token>,
}

impl GitHubClient {
    pub fn new(config: &GitHubConfig) -> Result<Self> {
        Self::with_token(config, config.token.clone())
    }

    /// Build a client for `config`'s endpoints that authenticates as `token`.
    pub fn with_token(config: &GitHubConfig, token: Option<Token>) -> Result<Self> {
        let client = http_client(config.timeout)?;

        let graphql_url = graphql_endpoint(&config.api_url)?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            graphql_url,
            token,
        })
    }

    pub fn auth_request(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let request = request.header(reqwest::header::ACCEPT, "application/vnd.github+json");
        if let Some(token) = &self.token {
            request.bearer_auth(token.as_str())
        } else {
            request
        }
    }

    pub fn rest_url(&self, path: &str) -> Result<Url> {
        self.api_url
            .join(path)
            .map_err(|e| CommitLensError::Config(format!("Invalid REST URL '{path}': {e}")))
    }

    /// `repos/{owner}/{repo}` followed by `resource`, each part one encoded path segment.
    pub fn repository_url(&self, owner: &str, repo: &str, resource: &[&str]) -> Result<Url> {
        let mut url = self.rest_url("repos/")?;
        url.path_segments_mut()
            .map_err(|()| CommitLensError::Config("GitHub API URL cannot be a base".to_string()))?
            .pop_if_empty()
            .extend([owner, repo])
            .extend(resource);
        Ok(url)
    }
}

/// GraphQL lives beside the REST root on GitHub Enterprise Server
/// (`/api/v3/` serves REST, `/api/graphql` serves GraphQL).
fn graphql_endpoint(api_url: &Url) -> Result<Url> {
    let path = if api_url.path().ends_with("/v3/") {
        "../graphql"
    } else {
        "graphql"
    };

    api_url
        .join(path)
        .map_err(|e| CommitLensError::Config(format!("Invalid GraphQL URL: {e}")))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn client(api_url: &str) -> GitHubClient {
        let config = GitHubConfig::new(api_url, None, Duration::from_secs(5)).unwrap();
        GitHubClient::new(&config).unwrap()
    }

    #[test]
    fn test_graphql_url_is_joined_to_api_url() {
        let client = client("https://api.github.com");
        assert_eq!(client.graphql_url.as_str(), "https://api.github.com/graphql");
    }

    #[test]
    fn test_graphql_url_on_enterprise_server() {
        let client = client("https://github.example.com/api/v3");
        assert_eq!(
            client.graphql_url.as_str(),
            "https://github.example.com/api/graphql"
        );
        assert_eq!(
            client.rest_url("user").unwrap().as_str(),
            "https://github.example.com/api/v3/user"
        );
    }

    #[test]
    fn test_graphql_url_keeps_other_prefixes() {
        let client = client("http://127.0.0.1:4010/github/");
        assert_eq!(
            client.graphql_url.as_str(),
            "http://127.0.0.1:4010/github/graphql"
        );
    }

    #[test]
    fn test_repository_url_encodes_segments() {
        let client = client("https://api.github.com/");
        let url = client.repository_url("acme", "wid gets", &["issues"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/wid%20gets/issues"
        );
    }

    #[test]
    fn test_repository_url_nested_resource() {
        let client = client("https://api.github.com/");
        let url = client.repository_url("acme", "widgets", &["issues", "7"]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/acme/widgets/issues/7");

        let url = client.repository_url("acme", "widgets", &[]).unwrap();
        assert_eq!(url.as_str(), "https://api.github.com/repos/acme/widgets");
    }

    #[test]
    fn test_rest_url_joins_path() {
        let client = client("https://api.github.com/");
        assert_eq!(
            client.rest_url("user/repos").unwrap().as_str(),
            "https://api.github.com/user/repos"
        );
    }
}
