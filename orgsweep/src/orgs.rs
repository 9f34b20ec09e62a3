use std::collections::BTreeSet;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, instrument, warn};

use crate::config::Config;
use crate::github::GitHubClient;
use crate::paging::{LinkPages, collect_pages};

#[derive(Deserialize)]
struct OrgSummary {
    login: Option<String>,
}

/// Return the organizations to process, from the local cache when it is
/// present and non-empty, otherwise from the server.
///
/// A populated cache is returned as-is, so organizations created upstream
/// after the first run are not seen until the cache is removed or
/// `refresh_orgs` is set.
#[instrument(skip(config, client), fields(cache = %config.org_cache.display()))]
pub async fn load_organizations(config: &Config, client: &GitHubClient) -> Result<Vec<String>> {
    if !config.refresh_orgs {
        if let Some(cached) = read_cache(&config.org_cache)? {
            info!(count = cached.len(), "organization cache is populated; skipping fetch");
            return Ok(cached);
        }
    }

    let orgs = fetch_organizations(config, client).await;
    write_cache(&config.org_cache, &orgs)?;
    info!(count = orgs.len(), "saved organizations to cache");
    Ok(orgs)
}

/// Walk the organization listing. Failures end the walk early and keep
/// whatever was already collected.
pub async fn fetch_organizations(config: &Config, client: &GitHubClient) -> Vec<String> {
    let pages = LinkPages::<OrgSummary>::new(client.clone(), config.organizations_url());
    let collected = collect_pages(pages).await;

    if let Some(e) = &collected.error {
        warn!(
            error = %e,
            fetched = collected.items.len(),
            "failed to fetch organizations; continuing with partial list"
        );
    }

    let unique: BTreeSet<String> = collected
        .items
        .into_iter()
        .filter_map(|org| org.login)
        .collect();
    unique.into_iter().collect()
}

fn read_cache(path: &Path) -> Result<Option<Vec<String>>> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to read {}", path.display()));
        }
    };
    if contents.is_empty() {
        return Ok(None);
    }

    Ok(Some(
        contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect(),
    ))
}

fn write_cache(path: &Path, orgs: &[String]) -> Result<()> {
    let mut file =
        fs::File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    for org in orgs {
        writeln!(file, "{org}").with_context(|| format!("failed to write {}", path.display()))?;
    }
    file.sync_all()
        .with_context(|| format!("failed to sync {}", path.display()))
}
