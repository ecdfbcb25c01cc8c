pub mod github;
pub mod openai;

use std::time::Duration;

use reqwest::Client;

use crate::error::{CommitLensError, Result};

const USER_AGENT: &str = concat!("CommitLens/", env!("CARGO_PKG_VERSION"));

/// HTTP client shared by every outbound integration.
pub fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| CommitLensError::Config(format!("Failed to create HTTP client: {e}")))
}
