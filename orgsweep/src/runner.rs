use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, error, info, instrument};

use crate::config::Config;
use crate::github::GitHubClient;
use crate::markers::MarkerFile;
use crate::orgs::load_organizations;
use crate::repos::list_repositories;
use crate::scanner::{ScanOutcome, Scanner, ScannerRunner};

/// What happened to one organization during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrgStatus {
    /// Its results directory already existed.
    AlreadyDone,
    /// No repositories were found; recorded in the empty marker.
    Empty,
    Scanned(ScanOutcome),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub scanned: usize,
    pub already_done: usize,
    pub empty: usize,
    pub failed: usize,
}

impl RunSummary {
    fn record(&mut self, status: &OrgStatus) {
        match status {
            OrgStatus::AlreadyDone => self.already_done += 1,
            OrgStatus::Empty => self.empty += 1,
            OrgStatus::Scanned(outcome) => {
                self.scanned += 1;
                if !outcome.is_success() {
                    self.failed += 1;
                }
            }
        }
    }
}

/// Drives a full sweep: one organization at a time, in list order.
pub struct Runner {
    config: Config,
    client: GitHubClient,
    scanner: Scanner,
    empty_orgs: MarkerFile,
    failed_orgs: MarkerFile,
}

impl Runner {
    pub fn new(config: Config, runner: Arc<dyn ScannerRunner>) -> Result<Self> {
        let client = GitHubClient::new(&config)?;
        let scanner = Scanner::new(&config, runner);
        Ok(Self {
            empty_orgs: MarkerFile::new(&config.empty_orgs_file),
            failed_orgs: MarkerFile::new(&config.failed_orgs_file),
            config,
            client,
            scanner,
        })
    }

    /// Process every organization. Per-organization failures are recorded
    /// and skipped over; only local filesystem errors end the run.
    #[instrument(skip(self), fields(results = %self.config.results_dir.display()))]
    pub async fn run(&self) -> Result<RunSummary> {
        fs::create_dir_all(&self.config.results_dir).with_context(|| {
            format!(
                "failed to create results directory {}",
                self.config.results_dir.display()
            )
        })?;

        let orgs = load_organizations(&self.config, &self.client).await?;
        info!(count = orgs.len(), "starting scans for all organizations");

        let mut summary = RunSummary::default();
        for org in &orgs {
            let status = self.process_org(org).await?;
            summary.record(&status);
        }

        info!(
            scanned = summary.scanned,
            already_done = summary.already_done,
            empty = summary.empty,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    #[instrument(skip(self))]
    pub async fn process_org(&self, org: &str) -> Result<OrgStatus> {
        let org_dir = self.config.org_dir(org);
        if org_dir.is_dir() {
            info!(org, "skipping: results directory already exists");
            return Ok(OrgStatus::AlreadyDone);
        }

        let repos = list_repositories(&self.client, org, self.config.page_size).await;
        if repos.is_empty() {
            self.empty_orgs.append(org)?;
            info!(
                org,
                marker = %self.empty_orgs.path().display(),
                "skipping: no repositories found"
            );
            return Ok(OrgStatus::Empty);
        }
        debug!(org, repos = repos.len(), "found repositories");

        fs::create_dir_all(&org_dir)
            .with_context(|| format!("failed to create {}", org_dir.display()))?;
        let log_path = self.config.log_path(org);
        info!(org, repos = repos.len(), "running scanner");

        let outcome = self.scanner.scan(org, &log_path).await?;
        if outcome.is_success() {
            info!(org, log = %log_path.display(), "results saved");
        } else {
            self.failed_orgs.append(org)?;
            error!(
                org,
                log = %log_path.display(),
                marker = %self.failed_orgs.path().display(),
                %outcome,
                "scan failed"
            );
        }

        Ok(OrgStatus::Scanned(outcome))
    }
}
