use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::github::GitHubClient;
use crate::paging::{PageSource, collect_pages};

const REPOSITORIES_QUERY: &str = r#"query($org: String!, $first: Int!, $after: String) {
  organization(login: $org) {
    repositories(first: $first, after: $after) {
      pageInfo {
        endCursor
        hasNextPage
      }
      nodes {
        name
      }
    }
  }
}"#;

#[derive(Deserialize)]
struct QueryData {
    organization: Option<Organization>,
}

#[derive(Deserialize)]
struct Organization {
    repositories: RepositoryConnection,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RepositoryConnection {
    page_info: PageInfo,
    #[serde(default)]
    nodes: Vec<Option<RepositoryNode>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    end_cursor: Option<String>,
    has_next_page: bool,
}

#[derive(Deserialize)]
struct RepositoryNode {
    name: String,
}

/// Repository names of one organization, walked with `endCursor`/`hasNextPage`.
pub struct CursorPages {
    client: GitHubClient,
    org: String,
    page_size: u32,
    after: Option<String>,
    done: bool,
}

impl CursorPages {
    pub fn new(client: GitHubClient, org: impl Into<String>, page_size: u32) -> Self {
        Self {
            client,
            org: org.into(),
            page_size,
            after: None,
            done: false,
        }
    }
}

#[async_trait]
impl PageSource for CursorPages {
    type Item = String;

    async fn next_page(&mut self) -> Result<Option<Vec<String>>> {
        if self.done {
            return Ok(None);
        }

        let variables = serde_json::json!({
            "org": self.org,
            "first": self.page_size,
            "after": self.after,
        });
        let data = self
            .client
            .graphql_post(REPOSITORIES_QUERY, &variables)
            .await?;
        let data: QueryData =
            serde_json::from_value(data).context("unexpected repositories response shape")?;
        let org = data
            .organization
            .with_context(|| format!("organization {} is missing or not accessible", self.org))?;

        let connection = org.repositories;
        let names = connection
            .nodes
            .into_iter()
            .flatten()
            .map(|node| node.name)
            .collect();

        match (connection.page_info.has_next_page, connection.page_info.end_cursor) {
            (true, Some(cursor)) => {
                debug!(org = %self.org, "more repositories, fetching next page");
                self.after = Some(cursor);
            }
            (true, None) => {
                warn!(org = %self.org, "hasNextPage without endCursor; stopping");
                self.done = true;
            }
            (false, _) => self.done = true,
        }

        Ok(Some(names))
    }
}

/// List the repositories of `org`.
///
/// Any failure (transport, HTTP status, GraphQL errors, or an organization
/// that is absent or inaccessible) yields an empty list.
#[instrument(skip(client))]
pub async fn list_repositories(client: &GitHubClient, org: &str, page_size: u32) -> Vec<String> {
    let collected = collect_pages(CursorPages::new(client.clone(), org, page_size)).await;

    if let Some(e) = collected.error {
        warn!(org, error = %e, "could not list repositories; treating organization as empty");
        return Vec::new();
    }

    debug!(org, repos = collected.items.len(), "listed repositories");
    collected.items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, Token};
    use serde_json::{Value, json};
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> GitHubClient {
        GitHubClient::new(&Config::new(&server.uri(), Token::new("tok"))).unwrap()
    }

    fn repo_page(names: &[&str], next: Option<&str>) -> Value {
        let nodes: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
        json!({
            "data": {
                "organization": {
                    "repositories": {
                        "pageInfo": { "endCursor": next, "hasNextPage": next.is_some() },
                        "nodes": nodes
                    }
                }
            }
        })
    }

    #[tokio::test]
    async fn pages_are_accumulated_in_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .and(body_partial_json(json!({ "variables": { "org": "acme", "after": null } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_page(&["api", "web"], Some("c1"))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/api/graphql"))
            .and(body_partial_json(json!({ "variables": { "org": "acme", "after": "c1" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_page(&["docs"], None)))
            .expect(1)
            .mount(&server)
            .await;

        let repos = list_repositories(&client_for(&server), "acme", 100).await;
        assert_eq!(repos, vec!["api", "web", "docs"]);
    }

    #[tokio::test]
    async fn missing_organization_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "data": {} })))
            .mount(&server)
            .await;

        assert!(list_repositories(&client_for(&server), "ghost", 100).await.is_empty());
    }

    #[tokio::test]
    async fn null_organization_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({ "data": { "organization": null } })),
            )
            .mount(&server)
            .await;

        assert!(list_repositories(&client_for(&server), "ghost", 100).await.is_empty());
    }

    #[tokio::test]
    async fn errors_field_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "organization": null },
                "errors": [{ "type": "NOT_FOUND", "message": "Could not resolve to an Organization" }]
            })))
            .mount(&server)
            .await;

        assert!(list_repositories(&client_for(&server), "ghost", 100).await.is_empty());
    }

    #[tokio::test]
    async fn error_status_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        assert!(list_repositories(&client_for(&server), "acme", 100).await.is_empty());
    }

    #[tokio::test]
    async fn transport_failure_is_empty() {
        // Nothing listens on port 1.
        let client = GitHubClient::new(&Config::new("http://127.0.0.1:1", Token::new("tok"))).unwrap();

        assert!(list_repositories(&client, "acme", 100).await.is_empty());
    }

    #[tokio::test]
    async fn failure_on_later_page_discards_earlier_pages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "after": null } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_page(&["api"], Some("c1"))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "after": "c1" } })))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        assert!(list_repositories(&client_for(&server), "acme", 100).await.is_empty());
    }

    #[tokio::test]
    async fn next_page_without_cursor_stops() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": { "organization": { "repositories": {
                    "pageInfo": { "endCursor": null, "hasNextPage": true },
                    "nodes": [{ "name": "api" }]
                } } }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let repos = list_repositories(&client_for(&server), "acme", 100).await;
        assert_eq!(repos, vec!["api"]);
    }

    #[tokio::test]
    async fn page_size_is_sent_as_first() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": { "org": "acme", "first": 25 } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(repo_page(&["api"], None)))
            .expect(1)
            .mount(&server)
            .await;

        let repos = list_repositories(&client_for(&server), "acme", 25).await;
        assert_eq!(repos, vec!["api"]);
    }
}
