use std::{
    env,
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
};

use anyhow::{bail, Context};
use regex::Regex;
use serde::Deserialize;
use url::Url;

#[derive(Debug, Clone, Deserialize)]
pub struct OrghookConfig {
    pub github: GitHubConfig,
    pub ci: CiConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub secret_scan: SecretScanConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GitHubConfig {
    /// Base URL of the GitHub REST API
    #[serde(default = "default_github_api")]
    pub api_url: Url,
    /// Token used for every GitHub API call. Can be overridden with `GITHUB_TOKEN`.
    #[serde(default)]
    pub token: String,
    /// Organization whose repositories get provisioned
    pub organization: String,
    /// Where the push hook registered on new repositories sends its deliveries
    pub push_callback_url: Url,
    pub roster: RosterConfig,
    /// Shared secret used to check `X-Hub-Signature-256` on incoming deliveries. When unset,
    /// incoming webhooks aren't authenticated at all.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RosterConfig {
    /// Full name (`owner/name`) of the repository holding the member list
    pub repository: String,
    /// Path of the member list inside that repository
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CiConfig {
    /// Jenkins root URL, jobs are created under `<base_url>/createItem`
    pub base_url: Url,
    pub username: Option<String>,
    /// Can be overridden with `JENKINS_API_TOKEN`.
    pub api_token: Option<String>,
    /// Job definition template, the built-in one is used when unset
    pub job_template: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_slack_api")]
    pub api_url: Url,
    #[serde(default = "default_channel")]
    pub channel: String,
    /// Notifications are disabled without a token. Can be overridden with `SLACK_TOKEN`.
    pub token: Option<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: default_slack_api(),
            channel: default_channel(),
            token: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite database file. Can be overridden with `DATABASE_PATH`.
    pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SecretScanConfig {
    /// Literal looked for in every patch
    #[serde(default = "default_marker")]
    pub marker: String,
    /// Extra patterns, any match flags the patch
    #[serde(with = "serde_regex", default)]
    pub patterns: Vec<Regex>,
    #[serde(default = "default_issue_title")]
    pub issue_title: String,
    #[serde(default = "default_label")]
    pub label: String,
}

impl Default for SecretScanConfig {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            patterns: Vec::new(),
            issue_title: default_issue_title(),
            label: default_label(),
        }
    }
}

impl OrghookConfig {
    /// Reads the YAML configuration at `path`, then applies environment overrides for secrets.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let config_file =
            File::open(path).with_context(|| format!("couldn't open {}:", path.display()))?;
        let mut config: OrghookConfig = serde_yaml::from_reader(BufReader::new(config_file))
            .context("couldn't parse config file")?;

        config.apply_overrides(|key| env::var(key).ok());
        config.validate()?;

        Ok(config)
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(token) = lookup("GITHUB_TOKEN") {
            self.github.token = token;
        }
        if let Some(secret) = lookup("GITHUB_WEBHOOK_SECRET") {
            self.github.webhook_secret = Some(secret);
        }
        if let Some(token) = lookup("JENKINS_API_TOKEN") {
            self.ci.api_token = Some(token);
        }
        if let Some(token) = lookup("SLACK_TOKEN") {
            self.chat.token = Some(token);
        }
        if let Some(path) = lookup("DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        if self.github.token.is_empty() {
            bail!("no GitHub token configured, set `github.token` or GITHUB_TOKEN");
        }
        if self.secret_scan.marker.is_empty() {
            bail!("`secret_scan.marker` can't be empty");
        }

        Ok(())
    }
}

fn default_github_api() -> Url {
    Url::parse("https://api.github.com/").expect("static URL is valid")
}

fn default_slack_api() -> Url {
    Url::parse("https://slack.com/api/").expect("static URL is valid")
}

fn default_channel() -> String {
    "general".to_owned()
}

fn default_branch() -> String {
    "main".to_owned()
}

fn default_marker() -> String {
    "mysecret".to_owned()
}

fn default_issue_title() -> String {
    "Leaked secrets detected".to_owned()
}

fn default_label() -> String {
    "leaked-secrets".to_owned()
}
