use std::fs::File;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use serde::Serialize;

use crate::auth::{AuthSession, ConsoleSession, Token};
use crate::config::{
    endpoint_url, AnalysisOptions, CompletionConfig, GitHubConfig, OAuthConfig,
    DEFAULT_AUTHORIZE_URL, DEFAULT_COMPLETION_API_URL, DEFAULT_COMPLETION_MODEL,
    DEFAULT_GITHUB_API_URL, DEFAULT_REDIRECT_URI, DEFAULT_SCOPE, DEFAULT_TIMEOUT_SECS,
    DEFAULT_TOKEN_URL,
};
use crate::pipeline::{AnalysisPipeline, AnalysisRequest};
use crate::providers::github::{OperationOutcome, RepoOperationsClient, Visibility};

#[derive(Parser)]
#[command(name = "commitlens")]
#[command(author, version, about = "Commit quality insights and GitHub operations", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output file path (defaults to stdout)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Pretty print JSON output
    #[arg(short, long, global = true, default_value_t = false)]
    pretty: bool,

    /// GitHub API URL
    #[arg(long, global = true, env = "GITHUB_API_URL", default_value = DEFAULT_GITHUB_API_URL)]
    github_url: String,

    /// Timeout for each HTTP request, in seconds
    #[arg(long, global = true, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Score recent commits; reads {"owner", "repo", "days"} as JSON from stdin
    Analyze {
        /// GitHub API token used for the GraphQL query
        #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
        github_token: Option<String>,

        /// Completion API key
        #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
        openai_api_key: Option<String>,

        /// Completion API base URL
        #[arg(long, env = "OPENAI_API_URL", default_value = DEFAULT_COMPLETION_API_URL)]
        openai_url: String,

        /// Completion model
        #[arg(short, long, env = "OPENAI_MODEL", default_value = DEFAULT_COMPLETION_MODEL)]
        model: String,

        /// Read the request from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Number of commits analysed concurrently
        #[arg(short, long, default_value_t = 1, value_parser = clap::value_parser!(u16).range(1..))]
        concurrency: u16,

        /// List commits whose analysis failed under "skipped"
        #[arg(long, default_value_t = false)]
        include_skipped: bool,
    },

    /// Print the URL that starts the GitHub OAuth login
    AuthUrl {
        #[command(flatten)]
        oauth: OAuthArgs,
    },

    /// Exchange an OAuth authorization code for an access token
    Login {
        #[command(flatten)]
        oauth: OAuthArgs,

        /// Authorization code GitHub redirected back with
        #[arg(long)]
        code: String,
    },

    /// Create a repository for the authenticated user
    CreateRepo {
        #[command(flatten)]
        session: SessionArgs,

        /// Repository name
        #[arg(long)]
        name: String,

        /// Repository description
        #[arg(long, default_value = "")]
        description: String,

        #[arg(long, value_enum, default_value_t = Visibility::Public)]
        visibility: Visibility,
    },

    /// Open an issue
    CreateIssue {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,

        /// Issue title
        #[arg(long)]
        title: String,

        /// Issue body
        #[arg(long, default_value = "")]
        body: String,

        /// GitHub username to assign
        #[arg(long)]
        assignee: Option<String>,
    },

    /// Change the title and body of an issue
    UpdateIssue {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,

        /// Issue number
        #[arg(long)]
        number: u64,

        /// New issue title
        #[arg(long)]
        title: String,

        /// New issue body
        #[arg(long, default_value = "")]
        body: String,
    },

    /// Close an issue
    CloseIssue {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,

        /// Issue number
        #[arg(long)]
        number: u64,
    },

    /// Open a pull request
    CreatePr {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,

        /// Pull request title
        #[arg(long)]
        title: String,

        /// Branch with the changes
        #[arg(long)]
        head: String,

        /// Branch to merge into
        #[arg(long)]
        base: String,

        /// Pull request description
        #[arg(long, default_value = "")]
        body: String,
    },

    /// List unread notifications
    Notifications {
        #[command(flatten)]
        session: SessionArgs,
    },

    /// Print stars, forks, open issues, commit activity, recent issues and workflow runs as JSON
    RepoStats {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,
    },

    /// Print issues and pull requests as one timeline, newest first, as JSON
    RepoActivity {
        #[command(flatten)]
        session: SessionArgs,

        #[command(flatten)]
        target: RepoTarget,
    },
}

#[derive(Args)]
struct SessionArgs {
    /// OAuth access token obtained with `login`
    #[arg(long, env = "GITHUB_OAUTH_TOKEN", hide_env_values = true)]
    token: String,
}

impl SessionArgs {
    fn session(&self) -> ConsoleSession {
        ConsoleSession::new(Token::from(self.token.as_str()))
    }
}

#[derive(Args)]
struct RepoTarget {
    /// Repository owner (defaults to the authenticated user)
    #[arg(long)]
    owner: Option<String>,

    /// Repository name
    #[arg(long)]
    repo: String,
}

#[derive(Args)]
struct OAuthArgs {
    /// OAuth application client ID
    #[arg(long, env = "GITHUB_CLIENT_ID")]
    client_id: String,

    /// OAuth application client secret
    #[arg(long, env = "GITHUB_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    /// Redirect URI registered for the application
    #[arg(long, env = "GITHUB_REDIRECT_URI", default_value = DEFAULT_REDIRECT_URI)]
    redirect_uri: String,

    /// Requested scope
    #[arg(long, default_value = DEFAULT_SCOPE)]
    scope: String,

    #[arg(long, default_value = DEFAULT_AUTHORIZE_URL)]
    authorize_url: String,

    #[arg(long, default_value = DEFAULT_TOKEN_URL)]
    token_url: String,
}

impl OAuthArgs {
    fn config(&self, timeout: Duration) -> Result<OAuthConfig> {
        Ok(OAuthConfig {
            client_id: self.client_id.clone(),
            client_secret: Token::from(self.client_secret.clone().unwrap_or_default()),
            redirect_uri: self.redirect_uri.clone(),
            scope: self.scope.clone(),
            authorize_url: endpoint_url(&self.authorize_url)?,
            token_url: endpoint_url(&self.token_url)?,
            timeout,
        })
    }
}

/// The single JSON object printed on stdout when a command fails.
pub fn error_document(error: &anyhow::Error) -> serde_json::Value {
    serde_json::json!({ "error": format!("{error:#}") })
}

impl Cli {
    pub async fn execute(&self) -> Result<()> {
        let timeout = Duration::from_secs(self.timeout);

        match &self.command {
            Commands::Analyze {
                github_token,
                openai_api_key,
                openai_url,
                model,
                input,
                concurrency,
                include_skipped,
            } => {
                // Input is validated before any client exists, so bad input never reaches the network.
                let request = match input {
                    Some(path) => AnalysisRequest::from_reader(File::open(path)?)?,
                    None => AnalysisRequest::from_reader(std::io::stdin().lock())?,
                };

                let github = GitHubConfig::new(
                    &self.github_url,
                    github_token.as_deref().map(Token::from),
                    timeout,
                )?;
                let completion = CompletionConfig::new(
                    openai_url,
                    Token::from(openai_api_key.clone().unwrap_or_default()),
                    model,
                    timeout,
                )?;
                let options = AnalysisOptions {
                    concurrency: usize::from(*concurrency),
                    include_skipped: *include_skipped,
                };

                let report = AnalysisPipeline::new(&github, &completion, options)?
                    .run(&request)
                    .await?;

                self.write_json(&report)
            }
            Commands::AuthUrl { oauth } => {
                let session = AuthSession::new(oauth.config(timeout)?)?;
                self.write_text(session.authorization_url().as_str())
            }
            Commands::Login { oauth, code } => {
                if oauth.client_secret.as_deref().unwrap_or_default().is_empty() {
                    bail!("A client secret is required to exchange the code (set GITHUB_CLIENT_SECRET)");
                }

                let session = AuthSession::new(oauth.config(timeout)?)?;
                let console = session
                    .login(code)
                    .await?
                    .ok_or_else(|| anyhow!("Failed to authenticate with GitHub."))?;

                info!("Export the token below as GITHUB_OAUTH_TOKEN to run operations");
                self.write_text(console.token().as_str())
            }
            Commands::CreateRepo {
                session,
                name,
                description,
                visibility,
            } => {
                let operations = self.operations(session, timeout)?;
                let outcome = operations
                    .create_repository(name, description, *visibility)
                    .await;
                self.finish(&outcome)
            }
            Commands::CreateIssue {
                session,
                target,
                title,
                body,
                assignee,
            } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let outcome = operations
                    .create_issue(&owner, &target.repo, title, body, assignee.as_deref())
                    .await;
                self.finish(&outcome)
            }
            Commands::UpdateIssue {
                session,
                target,
                number,
                title,
                body,
            } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let outcome = operations
                    .update_issue(&owner, &target.repo, *number, title, body)
                    .await;
                self.finish(&outcome)
            }
            Commands::CloseIssue {
                session,
                target,
                number,
            } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let outcome = operations.close_issue(&owner, &target.repo, *number).await;
                self.finish(&outcome)
            }
            Commands::CreatePr {
                session,
                target,
                title,
                head,
                base,
                body,
            } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let outcome = operations
                    .create_pull_request(&owner, &target.repo, title, head, base, body)
                    .await;
                self.finish(&outcome)
            }
            Commands::Notifications { session } => {
                let operations = self.operations(session, timeout)?;
                let outcome = operations.list_notifications().await;
                self.finish(&outcome)
            }
            Commands::RepoStats { session, target } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let stats = operations.repo_stats(&owner, &target.repo).await?;
                self.write_json(&stats)
            }
            Commands::RepoActivity { session, target } => {
                let operations = self.operations(session, timeout)?;
                let owner = Self::resolve_owner(&operations, target).await?;
                let activity = operations.repo_activity(&owner, &target.repo).await?;
                self.write_json(&activity)
            }
        }
    }

    fn operations(&self, session: &SessionArgs, timeout: Duration) -> Result<RepoOperationsClient> {
        let config = GitHubConfig::new(&self.github_url, None, timeout)?;
        Ok(RepoOperationsClient::new(&config, &session.session())?)
    }

    async fn resolve_owner(operations: &RepoOperationsClient, target: &RepoTarget) -> Result<String> {
        if let Some(owner) = &target.owner {
            return Ok(owner.clone());
        }

        operations
            .current_user()
            .await
            .map_err(|e| anyhow!("Failed to resolve the authenticated user: {e}"))
    }

    fn finish(&self, outcome: &OperationOutcome) -> Result<()> {
        if outcome.is_success() {
            self.write_text(&outcome.to_string())
        } else {
            bail!("{outcome}")
        }
    }

    fn write_json<T: Serialize>(&self, value: &T) -> Result<()> {
        let json_output = if self.pretty {
            serde_json::to_string_pretty(value)?
        } else {
            serde_json::to_string(value)?
        };

        self.write_text(&json_output)
    }

    fn write_text(&self, text: &str) -> Result<()> {
        if let Some(output_path) = &self.output {
            std::fs::write(output_path, format!("{text}\n"))?;
            info!("Output written to: {}", output_path.display());
        } else {
            println!("{text}");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;
    use serde_json::json;

    use super::*;
    use crate::error::CommitLensError;

    fn input_file(name: &str, contents: &[u8]) -> PathBuf {
        let path = std::env::temp_dir().join(format!("commitlens-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    async fn analyze_file(path: &std::path::Path) -> anyhow::Error {
        // Nothing listens on port 9; reaching the network would surface as a network error.
        let cli = Cli::try_parse_from([
            "commitlens",
            "analyze",
            "--github-url",
            "http://127.0.0.1:9/",
            "--openai-url",
            "http://127.0.0.1:9/",
            "--openai-api-key",
            "sk-test",
            "--input",
            path.to_str().unwrap(),
        ])
        .unwrap();

        cli.execute().await.unwrap_err()
    }

    #[test]
    fn test_error_document_shape() {
        let error = anyhow::Error::from(CommitLensError::InputParse("expected value".to_string()));

        assert_eq!(
            error_document(&error),
            json!({ "error": "Failed to parse input JSON: expected value" })
        );
    }

    #[tokio::test]
    async fn test_analyze_rejects_malformed_input_before_any_request() {
        let path = input_file("malformed.json", b"{\"owner\": \"acme\", ");

        let error = analyze_file(&path).await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            error.downcast_ref::<CommitLensError>(),
            Some(CommitLensError::InputParse(_))
        ));
        let document = error_document(&error);
        assert!(document["error"]
            .as_str()
            .unwrap()
            .starts_with("Failed to parse input JSON"));
    }

    #[tokio::test]
    async fn test_analyze_rejects_non_utf8_input() {
        let path = input_file("binary.json", &[0xff, 0xfe, 0x00, 0x7b]);

        let error = analyze_file(&path).await;
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(
            error.downcast_ref::<CommitLensError>(),
            Some(CommitLensError::InputParse(_))
        ));
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_analyze_with_flags() {
        let cli = Cli::try_parse_from([
            "commitlens",
            "analyze",
            "--openai-api-key",
            "sk-test",
            "--concurrency",
            "4",
            "--include-skipped",
            "--pretty",
        ])
        .unwrap();

        assert!(cli.pretty);
        match cli.command {
            Commands::Analyze {
                openai_api_key,
                concurrency,
                include_skipped,
                ..
            } => {
                assert_eq!(openai_api_key.as_deref(), Some("sk-test"));
                assert_eq!(concurrency, 4);
                assert!(include_skipped);
            }
            _ => panic!("expected analyze"),
        }
    }

    #[test]
    fn test_parse_rejects_zero_concurrency() {
        let result = Cli::try_parse_from(["commitlens", "analyze", "--concurrency", "0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_create_repo_visibility() {
        let cli = Cli::try_parse_from([
            "commitlens",
            "create-repo",
            "--token",
            "gho_x",
            "--name",
            "widgets",
            "--visibility",
            "private",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateRepo {
                name, visibility, ..
            } => {
                assert_eq!(name, "widgets");
                assert_eq!(visibility, Visibility::Private);
            }
            _ => panic!("expected create-repo"),
        }
    }

    #[test]
    fn test_parse_create_issue_owner_is_optional() {
        let cli = Cli::try_parse_from([
            "commitlens",
            "create-issue",
            "--token",
            "gho_x",
            "--repo",
            "widgets",
            "--title",
            "Crash",
        ])
        .unwrap();

        match cli.command {
            Commands::CreateIssue { target, body, .. } => {
                assert!(target.owner.is_none());
                assert_eq!(target.repo, "widgets");
                assert_eq!(body, "");
            }
            _ => panic!("expected create-issue"),
        }
    }

    #[test]
    fn test_parse_close_issue_requires_number() {
        let base = ["commitlens", "close-issue", "--token", "gho_x", "--repo", "widgets"];
        assert!(Cli::try_parse_from(base).is_err());

        let cli = Cli::try_parse_from(base.iter().copied().chain(["--number", "12"])).unwrap();
        match cli.command {
            Commands::CloseIssue { number, .. } => assert_eq!(number, 12),
            _ => panic!("expected close-issue"),
        }
    }

    #[test]
    fn test_parse_repo_stats_with_owner() {
        let cli = Cli::try_parse_from([
            "commitlens",
            "repo-stats",
            "--token",
            "gho_x",
            "--owner",
            "acme",
            "--repo",
            "widgets",
        ])
        .unwrap();

        match cli.command {
            Commands::RepoStats { target, .. } => {
                assert_eq!(target.owner.as_deref(), Some("acme"));
                assert_eq!(target.repo, "widgets");
            }
            _ => panic!("expected repo-stats"),
        }
    }

    #[tokio::test]
    async fn test_repo_activity_writes_timeline_json() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/repos/acme/widgets/issues")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/repos/acme/widgets/pulls")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!([{
                    "number": 3,
                    "title": "Add caching",
                    "state": "open",
                    "created_at": "2024-05-04T09:00:00Z",
                    "merged_at": null,
                    "user": { "login": "linus" }
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let output = input_file("activity.json", b"");
        let url = server.url();
        let cli = Cli::try_parse_from([
            "commitlens",
            "repo-activity",
            "--github-url",
            url.as_str(),
            "--token",
            "gho_x",
            "--owner",
            "acme",
            "--repo",
            "widgets",
            "--output",
            output.to_str().unwrap(),
        ])
        .unwrap();

        cli.execute().await.unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&output).unwrap()).unwrap();
        std::fs::remove_file(&output).unwrap();

        assert_eq!(
            written,
            json!([{
                "type": "pull",
                "actor": "linus",
                "action": "open",
                "number": 3,
                "title": "Add caching",
                "timestamp": "2024-05-04T09:00:00Z"
            }])
        );
    }
}
