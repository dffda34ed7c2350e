use crate::errors::{RelayError, Result};
use crate::pull_request::PullRequestRef;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

const API_PATH: &str = "rest/api/1.0/";

// The members endpoint is paginated; a large limit returns every member in one page.
const GROUP_MEMBERS_LIMIT: &str = "99999";

/// The subset of the Stash REST API used by the relay.
#[async_trait]
pub trait StashApi: Send + Sync {
    /// Login names of every member of `group`, in the order Stash returns them.
    async fn group_members(&self, group: &str) -> Result<Vec<String>>;

    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestState>;

    /// Fails if `update.version` is no longer the current version of the pull request.
    async fn update_reviewers(&self, pr: &PullRequestRef, update: &PullRequestUpdate)
    -> Result<()>;
}

#[derive(Deserialize)]
struct GroupMembersPage {
    values: Vec<UserRef>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub user: UserRef,
}

impl Participant {
    pub fn new(name: impl Into<String>) -> Self {
        Participant {
            user: UserRef { name: name.into() },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct PullRequestState {
    pub version: i64,
    pub author: Participant,
}

impl PullRequestState {
    pub fn author_name(&self) -> &str {
        &self.author.user.name
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PullRequestUpdate {
    pub id: String,
    pub version: i64,
    pub reviewers: Vec<Participant>,
}

impl PullRequestUpdate {
    pub fn new(pr: &PullRequestRef, version: i64, reviewers: &[String]) -> Self {
        PullRequestUpdate {
            id: pr.id.clone(),
            version,
            reviewers: reviewers.iter().map(Participant::new).collect(),
        }
    }

    pub fn reviewer_names(&self) -> Vec<&str> {
        self.reviewers
            .iter()
            .map(|reviewer| reviewer.user.name.as_str())
            .collect()
    }
}

/// Stash REST client authenticating every call with basic auth.
#[derive(Clone)]
pub struct StashClient {
    client: reqwest::Client,
    base_url: Url,
    user: String,
    pass: String,
}

impl StashClient {
    pub fn new(stash: &str, user: &str, pass: &str) -> Result<Self> {
        Ok(StashClient {
            client: reqwest::Client::new(),
            base_url: api_base_url(stash)?,
            user: user.to_string(),
            pass: pass.to_string(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RelayError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn pull_request_endpoint(&self, pr: &PullRequestRef) -> Result<Url> {
        self.endpoint(&[
            "projects",
            &pr.project,
            "repos",
            &pr.repository,
            "pull-requests",
            &pr.id,
        ])
    }
}

#[async_trait]
impl StashApi for StashClient {
    async fn group_members(&self, group: &str) -> Result<Vec<String>> {
        let url = self.endpoint(&["admin", "groups", "more-members"])?;
        let response = self
            .client
            .get(url)
            .basic_auth(&self.user, Some(&self.pass))
            .query(&[("context", group), ("limit", GROUP_MEMBERS_LIMIT)])
            .send()
            .await?;

        let page = check_status(response)
            .await?
            .json::<GroupMembersPage>()
            .await?;

        Ok(page.values.into_iter().map(|user| user.name).collect())
    }

    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestState> {
        let response = self
            .client
            .get(self.pull_request_endpoint(pr)?)
            .basic_auth(&self.user, Some(&self.pass))
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    async fn update_reviewers(
        &self,
        pr: &PullRequestRef,
        update: &PullRequestUpdate,
    ) -> Result<()> {
        let response = self
            .client
            .put(self.pull_request_endpoint(pr)?)
            .basic_auth(&self.user, Some(&self.pass))
            .json(update)
            .send()
            .await?;

        check_status(response).await?;
        Ok(())
    }
}

/// `http://{stash}/rest/api/1.0/`, unless `stash` already names a scheme.
fn api_base_url(stash: &str) -> Result<Url> {
    let origin = if stash.contains("://") {
        stash.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", stash.trim_end_matches('/'))
    };

    Url::parse(&format!("{origin}/{API_PATH}"))
        .map_err(|e| RelayError::InvalidBaseUrl(format!("{stash}: {e}")))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().clone();
    let body = response.text().await.unwrap_or_default();
    Err(RelayError::UpstreamUnavailable(format!(
        "{status} from {url}: {}",
        body.trim()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::{BodyExt, Full};
    use hyper::body::{Bytes, Incoming};
    use hyper::service::service_fn;
    use hyper::{Method, Request, Response, StatusCode};
    use hyper_util::rt::{TokioExecutor, TokioIo};
    use std::convert::Infallible;
    use tokio::net::TcpListener;

    // base64("snobs:secret")
    const EXPECTED_AUTH: &str = "Basic c25vYnM6c2VjcmV0";
    const PR_PATH: &str = "/rest/api/1.0/projects/FOO/repos/bar/pull-requests/42";
    const CURRENT_VERSION: i64 = 3;

    fn respond(status: StatusCode, body: String) -> Response<Full<Bytes>> {
        let mut response = Response::new(Full::new(Bytes::from(body)));
        *response.status_mut() = status;
        response
    }

    // Minimal stand-in for the Stash endpoints used by the relay
    async fn stash_handler(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
        let authorized = req
            .headers()
            .get("authorization")
            .is_some_and(|value| value == EXPECTED_AUTH);
        if !authorized {
            return Ok(respond(StatusCode::UNAUTHORIZED, "unauthorized".into()));
        }

        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let query = req.uri().query().unwrap_or("").to_string();

        let response = if method == Method::GET && path == "/rest/api/1.0/admin/groups/more-members"
        {
            if query == "context=devs&limit=99999" {
                respond(
                    StatusCode::OK,
                    r#"{"size":2,"values":[{"name":"alice","id":1},{"name":"bob","id":2}]}"#.into(),
                )
            } else {
                respond(StatusCode::BAD_REQUEST, format!("unexpected query {query}"))
            }
        } else if method == Method::GET && path == PR_PATH {
            respond(
                StatusCode::OK,
                format!(
                    r#"{{"id":42,"version":{CURRENT_VERSION},"author":{{"user":{{"name":"bob"}},"role":"AUTHOR"}}}}"#
                ),
            )
        } else if method == Method::PUT && path == PR_PATH {
            let body = req.into_body().collect().await.unwrap().to_bytes();
            let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
            if payload["version"] == CURRENT_VERSION {
                respond(StatusCode::OK, payload.to_string())
            } else {
                respond(StatusCode::CONFLICT, "stale version".into())
            }
        } else {
            respond(StatusCode::NOT_FOUND, "not found".into())
        };

        Ok(response)
    }

    async fn start_test_server() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to address");

        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            loop {
                let (stream, _) = listener.accept().await.unwrap();
                let io = TokioIo::new(stream);

                tokio::spawn(async move {
                    let _ = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
                        .serve_connection(io, service_fn(stash_handler))
                        .await;
                });
            }
        });

        port
    }

    fn pr() -> PullRequestRef {
        PullRequestRef {
            project: "FOO".into(),
            repository: "bar".into(),
            id: "42".into(),
        }
    }

    #[test]
    fn test_api_base_url() {
        assert_eq!(
            api_base_url("stash.example.com").unwrap().as_str(),
            "http://stash.example.com/rest/api/1.0/"
        );
        assert_eq!(
            api_base_url("https://stash.example.com/").unwrap().as_str(),
            "https://stash.example.com/rest/api/1.0/"
        );
        assert!(matches!(
            api_base_url("http://stash example.com"),
            Err(RelayError::InvalidBaseUrl(_))
        ));
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = StashClient::new("stash", "snobs", "secret").unwrap();
        let pr = PullRequestRef {
            project: "~jdoe".into(),
            repository: "my repo".into(),
            id: "7".into(),
        };
        assert_eq!(
            client.pull_request_endpoint(&pr).unwrap().as_str(),
            "http://stash/rest/api/1.0/projects/~jdoe/repos/my%20repo/pull-requests/7"
        );
    }

    #[test]
    fn test_update_payload_shape() {
        let update = PullRequestUpdate::new(&pr(), 3, &["alice".to_string()]);
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            serde_json::json!({
                "id": "42",
                "version": 3,
                "reviewers": [{"user": {"name": "alice"}}],
            })
        );
    }

    #[tokio::test]
    async fn test_group_members() {
        let port = start_test_server().await;
        let client = StashClient::new(&format!("127.0.0.1:{port}"), "snobs", "secret").unwrap();

        let members = client.group_members("devs").await.unwrap();
        assert_eq!(members, vec!["alice", "bob"]);
    }

    #[tokio::test]
    async fn test_bad_credentials() {
        let port = start_test_server().await;
        let client = StashClient::new(&format!("127.0.0.1:{port}"), "snobs", "wrong").unwrap();

        let result = client.group_members("devs").await;
        assert!(matches!(result, Err(RelayError::UpstreamUnavailable(_))));
    }

    #[tokio::test]
    async fn test_pull_request_and_update() {
        let port = start_test_server().await;
        let client = StashClient::new(&format!("127.0.0.1:{port}"), "snobs", "secret").unwrap();

        let state = client.pull_request(&pr()).await.unwrap();
        assert_eq!(state.version, CURRENT_VERSION);
        assert_eq!(state.author_name(), "bob");

        let update = PullRequestUpdate::new(&pr(), state.version, &["alice".to_string()]);
        client.update_reviewers(&pr(), &update).await.unwrap();
    }

    #[tokio::test]
    async fn test_stale_version_is_rejected() {
        let port = start_test_server().await;
        let client = StashClient::new(&format!("127.0.0.1:{port}"), "snobs", "secret").unwrap();

        let update = PullRequestUpdate::new(&pr(), CURRENT_VERSION - 1, &["alice".to_string()]);
        let err = client.update_reviewers(&pr(), &update).await.unwrap_err();
        match err {
            RelayError::UpstreamUnavailable(message) => {
                assert!(message.starts_with("409"), "{message}");
                assert!(message.ends_with("stale version"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_unreachable_stash() {
        let client = StashClient::new("127.0.0.1:1", "snobs", "secret").unwrap();
        let result = client.pull_request(&pr()).await;
        assert!(matches!(result, Err(RelayError::UpstreamUnavailable(_))));
    }
}
