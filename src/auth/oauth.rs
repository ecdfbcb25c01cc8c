//! OAuth web-application flow: send the user to the authorize page, then trade
//! the code they come back with for an access token.

use log::{info, warn};
use reqwest::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use url::Url;

use super::token::Token;
use crate::config::OAuthConfig;
use crate::error::Result;
use crate::providers::http_client;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

pub struct AuthSession {
    client: Client,
    config: OAuthConfig,
}

impl AuthSession {
    pub fn new(config: OAuthConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(config.timeout)?,
            config,
        })
    }

    /// Browser-navigable URL that starts the authorization.
    pub fn authorization_url(&self) -> Url {
        let mut url = self.config.authorize_url.clone();
        url.query_pairs_mut()
            .append_pair("client_id", &self.config.client_id)
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scope);
        url
    }

    /// Trade an authorization `code` for an access token.
    ///
    /// Returns `Ok(None)` when the provider answers without a token, e.g. for an
    /// expired or already used code.
    pub async fn exchange_code_for_token(&self, code: &str) -> Result<Option<Token>> {
        let params = [
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self
            .client
            .post(self.config.token_url.clone())
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("Token endpoint responded with {}", response.status());
            return Ok(None);
        }

        let body = response.json::<TokenResponse>().await?;
        if let Some(error) = &body.error {
            warn!(
                "Token exchange rejected: {error} ({})",
                body.error_description.as_deref().unwrap_or("no description")
            );
        }

        Ok(body
            .access_token
            .filter(|token| !token.is_empty())
            .map(Token::from))
    }

    /// Exchange `code` and open a console session holding the resulting token.
    pub async fn login(&self, code: &str) -> Result<Option<ConsoleSession>> {
        let session = self.exchange_code_for_token(code).await?.map(ConsoleSession::new);
        if session.is_some() {
            info!("Authentication successful");
        }
        Ok(session)
    }
}

/// An authenticated console session; the token is fixed for its lifetime.
#[derive(Debug, Clone)]
pub struct ConsoleSession {
    token: Token,
}

impl ConsoleSession {
    pub fn new(token: Token) -> Self {
        Self { token }
    }

    pub fn token(&self) -> &Token {
        &self.token
    }
}
