use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

pub const DEFAULT_RESULTS_DIR: &str = "./trufflehog_results";
pub const DEFAULT_TOOL_NAME: &str = "trufflehog";
pub const DEFAULT_ORG_CACHE: &str = "unique_orgs.txt";
pub const DEFAULT_EMPTY_ORGS_FILE: &str = "skipped_empty_orgs.txt";
pub const DEFAULT_FAILED_ORGS_FILE: &str = "failed_orgs.txt";

/// Scanner executable used when none is configured.
pub fn default_scanner() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("./trufflehog.exe")
    } else {
        PathBuf::from("trufflehog")
    }
}

/// API token. Clones share one zeroized-on-drop secret; formatting never
/// reveals the value.
#[derive(Clone)]
pub struct Token(Arc<SecretString>);

impl Token {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Arc::new(SecretString::from(value.into())))
    }
}

impl ExposeSecret<str> for Token {
    fn expose_secret(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Token(***)")
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Everything a run needs, passed explicitly to each component.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server root, e.g. `https://git.example.com`, without a trailing slash.
    pub base_url: String,
    pub token: Token,
    pub results_dir: PathBuf,
    pub scanner: PathBuf,
    /// Tool name embedded in each log file name.
    pub tool_name: String,
    pub org_cache: PathBuf,
    pub empty_orgs_file: PathBuf,
    pub failed_orgs_file: PathBuf,
    /// Ignore an existing organization cache and fetch the list again.
    pub refresh_orgs: bool,
    pub page_size: u32,
    pub graphql_timeout: Duration,
}

impl Config {
    pub fn new(base_url: &str, token: Token) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            results_dir: PathBuf::from(DEFAULT_RESULTS_DIR),
            scanner: default_scanner(),
            tool_name: DEFAULT_TOOL_NAME.to_string(),
            org_cache: PathBuf::from(DEFAULT_ORG_CACHE),
            empty_orgs_file: PathBuf::from(DEFAULT_EMPTY_ORGS_FILE),
            failed_orgs_file: PathBuf::from(DEFAULT_FAILED_ORGS_FILE),
            refresh_orgs: false,
            page_size: 100,
            graphql_timeout: Duration::from_secs(30),
        }
    }

    pub fn rest_endpoint(&self) -> String {
        format!("{}/api/v3", self.base_url)
    }

    pub fn graphql_endpoint(&self) -> String {
        format!("{}/api/graphql", self.base_url)
    }

    pub fn organizations_url(&self) -> String {
        format!("{}/organizations?per_page={}", self.rest_endpoint(), self.page_size)
    }

    pub fn org_dir(&self, org: &str) -> PathBuf {
        self.results_dir.join(org)
    }

    pub fn log_path(&self, org: &str) -> PathBuf {
        self.org_dir(org)
            .join(format!("{org}_{}_results.log", self.tool_name))
    }

    /// Rebase every relative state path onto `dir`.
    pub fn rooted_at(mut self, dir: &Path) -> Self {
        for path in [
            &mut self.results_dir,
            &mut self.org_cache,
            &mut self.empty_orgs_file,
            &mut self.failed_orgs_file,
        ] {
            if path.is_relative() {
                *path = dir.join(&*path);
            }
        }
        self
    }
}
