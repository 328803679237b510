//! WordPress REST client: create, list and update posts.
//!
//! All requests authenticate with HTTP Basic using an application password.

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};
use url::Url;

use pbnforge_shared::{Credentials, PbnError, Result, WordPressConfig};

/// User-Agent string for WordPress requests.
const USER_AGENT: &str = concat!("pbnforge/", env!("CARGO_PKG_VERSION"));

/// REST route of the post collection, relative to the site root.
const POSTS_ROUTE: &str = "wp-json/wp/v2/posts";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// A post returned by the listing endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct WpPost {
    pub id: u64,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub content: Rendered,
}

/// `{ "rendered": "…" }` wrapper used by WordPress for HTML fields.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rendered {
    #[serde(default)]
    pub rendered: String,
}

/// The part of a create/update response we keep.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PublishedPost {
    pub id: u64,
    #[serde(default)]
    pub link: String,
}

#[derive(Debug, Serialize)]
struct CreatePostBody<'a> {
    title: &'a str,
    content: &'a str,
    status: &'a str,
}

#[derive(Debug, Serialize)]
struct UpdatePostBody<'a> {
    content: &'a str,
}

// ---------------------------------------------------------------------------
// PublishError
// ---------------------------------------------------------------------------

/// Why a post could not be created. Every variant means the same thing to
/// the caller (no new post); they differ only in the diagnostic.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("authorization failed (HTTP 401): check the login and application password")]
    Unauthorized,

    #[error("WordPress REST API not found on this site (HTTP 404)")]
    NotFound,

    #[error("method not allowed (HTTP 405): the site is probably blocking API requests")]
    MethodNotAllowed,

    #[error("unexpected server response (HTTP {0})")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("connection failed: site not found or not responding ({0})")]
    Connection(String),

    #[error("invalid site URL: {0}")]
    InvalidUrl(String),

    #[error("post created but the response could not be read: {0}")]
    InvalidResponse(String),
}

impl PublishError {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthorized,
            StatusCode::NOT_FOUND => Self::NotFound,
            StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowed,
            other => Self::Status(other.as_u16()),
        }
    }

    fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Connection(err.to_string())
        }
    }
}

// ---------------------------------------------------------------------------
// WpClient
// ---------------------------------------------------------------------------

/// Shared HTTP client for every site in a run.
pub struct WpClient {
    http: Client,
    pub(crate) recent_posts: u32,
    pub(crate) max_links_per_post: usize,
    post_status: String,
}

impl WpClient {
    /// Create a client from the `[wordpress]` config section.
    pub fn new(config: &WordPressConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| PbnError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            recent_posts: config.recent_posts,
            max_links_per_post: config.max_links_per_post,
            post_status: config.post_status.clone(),
        })
    }

    /// Create a new post. Success is exactly HTTP 201.
    #[instrument(skip_all, fields(site = %site_url))]
    pub async fn publish(
        &self,
        site_url: &str,
        credentials: &Credentials,
        title: &str,
        body_html: &str,
    ) -> std::result::Result<PublishedPost, PublishError> {
        let endpoint =
            posts_endpoint(site_url).map_err(|e| PublishError::InvalidUrl(e.to_string()))?;

        let body = CreatePostBody {
            title,
            content: body_html,
            status: &self.post_status,
        };

        info!(%endpoint, "publishing post");

        let response = self
            .http
            .post(endpoint)
            .basic_auth(&credentials.username, Some(&credentials.app_password))
            .json(&body)
            .send()
            .await
            .map_err(PublishError::from_transport)?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let err = PublishError::from_status(status);
            warn!(error = %err, "publish failed");
            return Err(err);
        }

        let mut post: PublishedPost = response
            .json()
            .await
            .map_err(|e| PublishError::InvalidResponse(e.to_string()))?;

        if post.link.is_empty() {
            post.link = shortlink(site_url, post.id)
                .map_err(|e| PublishError::InvalidUrl(e.to_string()))?
                .to_string();
        }

        info!(post_id = post.id, link = %post.link, "post published");
        Ok(post)
    }

    /// Fetch the most recent posts, newest first.
    #[instrument(skip_all, fields(site = %site_url))]
    pub async fn list_recent_posts(
        &self,
        site_url: &str,
        credentials: &Credentials,
    ) -> Result<Vec<WpPost>> {
        let endpoint = posts_endpoint(site_url)?;

        let response = self
            .http
            .get(endpoint.clone())
            .query(&[("per_page", self.recent_posts)])
            .basic_auth(&credentials.username, Some(&credentials.app_password))
            .send()
            .await
            .map_err(|e| PbnError::Network(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PbnError::Network(format!("{endpoint}: HTTP {status}")));
        }

        let posts: Vec<WpPost> = response
            .json()
            .await
            .map_err(|e| PbnError::parse(format!("{endpoint}: {e}")))?;

        debug!(count = posts.len(), "fetched recent posts");
        Ok(posts)
    }

    /// Replace the content of an existing post.
    ///
    /// Returns `Ok(None)` when the site answered with a non-success status.
    #[instrument(skip_all, fields(site = %site_url, post_id = post_id))]
    pub async fn update_post_content(
        &self,
        site_url: &str,
        credentials: &Credentials,
        post_id: u64,
        content: &str,
    ) -> Result<Option<PublishedPost>> {
        let endpoint = post_endpoint(site_url, post_id)?;

        let response = self
            .http
            .post(endpoint.clone())
            .basic_auth(&credentials.username, Some(&credentials.app_password))
            .json(&UpdatePostBody { content })
            .send()
            .await
            .map_err(|e| PbnError::Network(format!("{endpoint}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "post update rejected");
            return Ok(None);
        }

        let post: PublishedPost = response
            .json()
            .await
            .map_err(|e| PbnError::parse(format!("{endpoint}: {e}")))?;
        Ok(Some(post))
    }
}

// ---------------------------------------------------------------------------
// Endpoint helpers
// ---------------------------------------------------------------------------

/// `{site}/wp-json/wp/v2/posts`, tolerant of a trailing slash on the site URL.
pub fn posts_endpoint(site_url: &str) -> Result<Url> {
    let base = site_root(site_url)?;
    base.join(POSTS_ROUTE)
        .map_err(|e| PbnError::validation(format!("invalid site URL '{site_url}': {e}")))
}

/// `{site}/wp-json/wp/v2/posts/{id}`.
pub fn post_endpoint(site_url: &str, post_id: u64) -> Result<Url> {
    let base = site_root(site_url)?;
    base.join(&format!("{POSTS_ROUTE}/{post_id}"))
        .map_err(|e| PbnError::validation(format!("invalid site URL '{site_url}': {e}")))
}

/// `{site}/?p={id}`, the permalink WordPress resolves for any post id.
pub fn shortlink(site_url: &str, post_id: u64) -> Result<Url> {
    let mut url = site_root(site_url)?;
    url.query_pairs_mut()
        .clear()
        .append_pair("p", &post_id.to_string());
    Ok(url)
}

/// Parse the site URL and make sure its path ends with `/` so `join` appends.
fn site_root(site_url: &str) -> Result<Url> {
    let trimmed = site_url.trim().trim_end_matches('/');
    Url::parse(&format!("{trimmed}/"))
        .map_err(|e| PbnError::validation(format!("invalid site URL '{site_url}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{basic_auth, body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn creds() -> Credentials {
        Credentials {
            username: "admin_bot".into(),
            app_password: "abcd efgh".into(),
        }
    }

    fn client() -> WpClient {
        WpClient::new(&WordPressConfig::default()).expect("client")
    }

    #[test]
    fn endpoints_handle_trailing_slash_and_subpath() {
        assert_eq!(
            posts_endpoint("https://site.example/").unwrap().as_str(),
            "https://site.example/wp-json/wp/v2/posts"
        );
        assert_eq!(
            post_endpoint("https://site.example/blog", 7).unwrap().as_str(),
            "https://site.example/blog/wp-json/wp/v2/posts/7"
        );
        assert!(posts_endpoint("not a url").is_err());
    }

    #[tokio::test]
    async fn publish_created_returns_post() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(basic_auth("admin_bot", "abcd efgh"))
            .and(body_partial_json(serde_json::json!({
                "title": "Hello",
                "content": "<p>Body</p>",
                "status": "publish"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": 99,
                "link": "https://site.example/hello/"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let post = client()
            .publish(&server.uri(), &creds(), "Hello", "<p>Body</p>")
            .await
            .expect("published");
        assert_eq!(post.id, 99);
        assert_eq!(post.link, "https://site.example/hello/");
    }

    #[tokio::test]
    async fn publish_without_link_falls_back_to_shortlink() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wp/v2/posts"))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({ "id": 42 })))
            .mount(&server)
            .await;

        let post = client()
            .publish(&server.uri(), &creds(), "Hello", "<p>Body</p>")
            .await
            .expect("published");
        assert_eq!(post.link, format!("{}/?p=42", server.uri()));
        assert_eq!(
            shortlink("https://site.example/blog", 7).unwrap().as_str(),
            "https://site.example/blog/?p=7"
        );
    }

    fn status_of(err: &PublishError) -> Option<u16> {
        match err {
            PublishError::Unauthorized => Some(401),
            PublishError::NotFound => Some(404),
            PublishError::MethodNotAllowed => Some(405),
            PublishError::Status(code) => Some(*code),
            _ => None,
        }
    }

    #[tokio::test]
    async fn publish_maps_status_codes() {
        for code in [401_u16, 404, 405, 500, 200] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(code).set_body_json(serde_json::json!({
                    "id": 1, "link": "https://site.example/x/"
                })))
                .mount(&server)
                .await;

            let err = client()
                .publish(&server.uri(), &creds(), "T", "B")
                .await
                .expect_err("non-201 must fail");
            assert_eq!(status_of(&err), Some(code), "HTTP {code} mapped to {err:?}");
        }
    }

    #[test]
    fn publish_errors_have_distinct_diagnostics() {
        let messages = [
            PublishError::Unauthorized.to_string(),
            PublishError::NotFound.to_string(),
            PublishError::MethodNotAllowed.to_string(),
            PublishError::Status(502).to_string(),
        ];
        assert!(messages[0].contains("authorization"));
        for (i, a) in messages.iter().enumerate() {
            for b in &messages[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[tokio::test]
    async fn publish_connection_refused_is_error() {
        // Reserve a port, then release it so nothing is listening.
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let err = client()
            .publish(&format!("http://{addr}"), &creds(), "T", "B")
            .await
            .expect_err("closed port");
        assert!(matches!(
            err,
            PublishError::Connection(_) | PublishError::Timeout
        ));
    }

    #[tokio::test]
    async fn list_recent_posts_requests_five() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wp-json/wp/v2/posts"))
            .and(query_param("per_page", "5"))
            .and(basic_auth("admin_bot", "abcd efgh"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                { "id": 2, "link": "https://s/2/", "content": { "rendered": "<p>b</p>" } },
                { "id": 1, "link": "https://s/1/", "content": { "rendered": "<p>a</p>" } }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let posts = client()
            .list_recent_posts(&server.uri(), &creds())
            .await
            .unwrap();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0].id, 2);
        assert_eq!(posts[1].content.rendered, "<p>a</p>");
    }

    #[tokio::test]
    async fn update_rejected_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/wp-json/wp/v2/posts/5"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let updated = client()
            .update_post_content(&server.uri(), &creds(), 5, "<p>x</p>")
            .await
            .unwrap();
        assert!(updated.is_none());
    }
}
