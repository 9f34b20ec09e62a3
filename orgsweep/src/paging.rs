use std::marker::PhantomData;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::github::GitHubClient;

/// A finite sequence of pages produced on demand.
///
/// Sources are consumed by value through [`collect_pages`], so a sequence is
/// walked exactly once and never restarted midway.
#[async_trait]
pub trait PageSource: Send {
    type Item: Send;

    /// Fetch the next page, or `Ok(None)` once the sequence is exhausted.
    async fn next_page(&mut self) -> Result<Option<Vec<Self::Item>>>;
}

/// Items gathered from a page sequence, plus the error that cut it short.
#[derive(Debug)]
pub struct Collected<T> {
    pub items: Vec<T>,
    pub error: Option<anyhow::Error>,
}

/// Drain a page source in order. The first error stops the walk; items from
/// earlier pages are kept.
pub async fn collect_pages<P: PageSource>(mut pages: P) -> Collected<P::Item> {
    let mut items = Vec::new();
    loop {
        match pages.next_page().await {
            Ok(Some(page)) => items.extend(page),
            Ok(None) => return Collected { items, error: None },
            Err(e) => {
                return Collected {
                    items,
                    error: Some(e),
                };
            }
        }
    }
}

/// REST listing that follows `Link: <...>; rel="next"` headers.
pub struct LinkPages<T> {
    client: GitHubClient,
    next_url: Option<String>,
    _item: PhantomData<fn() -> T>,
}

impl<T> LinkPages<T> {
    pub fn new(client: GitHubClient, start_url: impl Into<String>) -> Self {
        Self {
            client,
            next_url: Some(start_url.into()),
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> PageSource for LinkPages<T>
where
    T: DeserializeOwned + Send,
{
    type Item = T;

    async fn next_page(&mut self) -> Result<Option<Vec<T>>> {
        let Some(url) = self.next_url.take() else {
            return Ok(None);
        };
        debug!(url = %url, "fetching page");

        let page = self.client.get_page(&url).await?;
        let items: Vec<T> = serde_json::from_value(page.body)
            .with_context(|| format!("unexpected page shape from {url}"))?;
        self.next_url = page.next;
        Ok(Some(items))
    }
}
