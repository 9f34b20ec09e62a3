use std::path::PathBuf;

use clap::Parser;
use clap_verbosity_flag::{InfoLevel, Verbosity};
use orgsweep::config::{
    DEFAULT_EMPTY_ORGS_FILE, DEFAULT_FAILED_ORGS_FILE, DEFAULT_ORG_CACHE, DEFAULT_RESULTS_DIR,
    DEFAULT_TOOL_NAME, default_scanner,
};
use orgsweep::{Config, Token};

/// Run a secret scanner against every organization on a GitHub Enterprise server
#[derive(Parser)]
#[command(name = "orgsweep", version)]
pub struct Cli {
    /// Server base URL, e.g. https://git.example.com
    #[arg(long, env = "ORGSWEEP_BASE_URL")]
    pub base_url: String,

    /// API token used for the REST and GraphQL APIs and passed to the scanner
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub github_token: String,

    /// Directory holding one results folder per organization
    #[arg(long, env = "ORGSWEEP_RESULTS_DIR", default_value = DEFAULT_RESULTS_DIR)]
    pub results_dir: PathBuf,

    /// Scanner executable [default: trufflehog, or ./trufflehog.exe on Windows]
    #[arg(long, env = "ORGSWEEP_SCANNER")]
    pub scanner: Option<PathBuf>,

    /// Tool name used in log file names
    #[arg(long, default_value = DEFAULT_TOOL_NAME)]
    pub tool_name: String,

    /// Organization list cache; a non-empty cache skips fetching
    #[arg(long, default_value = DEFAULT_ORG_CACHE)]
    pub org_cache: PathBuf,

    /// Where organizations without repositories are recorded
    #[arg(long, default_value = DEFAULT_EMPTY_ORGS_FILE)]
    pub empty_orgs_file: PathBuf,

    /// Where organizations whose scan failed are recorded
    #[arg(long, default_value = DEFAULT_FAILED_ORGS_FILE)]
    pub failed_orgs_file: PathBuf,

    /// Fetch the organization list even if the cache is populated
    #[arg(long)]
    pub refresh_orgs: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub verbose: Verbosity<InfoLevel>,
}

impl Cli {
    pub fn config(&self) -> Config {
        let mut config = Config::new(&self.base_url, Token::new(self.github_token.clone()));
        config.results_dir = self.results_dir.clone();
        config.scanner = self.scanner.clone().unwrap_or_else(default_scanner);
        config.tool_name = self.tool_name.clone();
        config.org_cache = self.org_cache.clone();
        config.empty_orgs_file = self.empty_orgs_file.clone();
        config.failed_orgs_file = self.failed_orgs_file.clone();
        config.refresh_orgs = self.refresh_orgs;
        config
    }
}
