use std::time::Duration;

use anyhow::{Context, Result, bail};
use reqwest::header::LINK;
use secrecy::ExposeSecret;
use serde_json::Value;
use tracing::instrument;

use crate::config::{Config, Token};

/// One page of a link-paginated REST listing.
#[derive(Debug)]
pub struct RestPage {
    pub body: Value,
    pub next: Option<String>,
}

#[derive(Clone)]
pub struct GitHubClient {
    client: reqwest::Client,
    token: Token,
    graphql_url: String,
    graphql_timeout: Duration,
}

impl GitHubClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("orgsweep")
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            token: config.token.clone(),
            graphql_url: config.graphql_endpoint(),
            graphql_timeout: config.graphql_timeout,
        })
    }

    /// Fetch one REST page and the URL of the page after it, if any.
    #[instrument(skip(self))]
    pub async fn get_page(&self, url: &str) -> Result<RestPage> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("token {}", self.token.expose_secret()))
            .send()
            .await
            .with_context(|| format!("request to {url} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("{url} returned HTTP {status}: {body}");
        }

        let next = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .and_then(parse_next_link);

        let body = response
            .json()
            .await
            .with_context(|| format!("failed to parse JSON from {url}"))?;

        Ok(RestPage { body, next })
    }

    /// Send a GraphQL query with variables and return its `data` object.
    #[instrument(skip(self, query))]
    pub async fn graphql_post(&self, query: &str, variables: &Value) -> Result<Value> {
        let body = serde_json::json!({ "query": query, "variables": variables });

        let response = self
            .client
            .post(&self.graphql_url)
            .header("Authorization", format!("Bearer {}", self.token.expose_secret()))
            .header("Accept", "application/vnd.github+json")
            .timeout(self.graphql_timeout)
            .json(&body)
            .send()
            .await
            .context("GraphQL request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("GraphQL API returned HTTP {status}: {body}");
        }

        let json: Value = response
            .json()
            .await
            .context("failed to parse GraphQL response")?;

        if let Some(errors) = json.get("errors") {
            bail!("GraphQL errors: {errors}");
        }

        json.get("data")
            .cloned()
            .context("missing 'data' field in GraphQL response")
    }
}

/// Pick the `rel="next"` target out of a `Link` header.
pub fn parse_next_link(header: &str) -> Option<String> {
    header
        .split(',')
        .find(|segment| segment.contains(r#"rel="next""#))
        .and_then(|segment| {
            let start = segment.find('<')? + 1;
            let end = segment.find('>')?;
            (start <= end).then(|| segment[start..end].to_string())
        })
}
