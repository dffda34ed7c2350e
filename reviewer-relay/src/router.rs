use crate::errors::RelayError;
use crate::groups::GroupResolver;
use crate::metrics_defs::REQUESTS;
use crate::pull_request::PullRequestRef;
use crate::reviewers::ReviewerAssigner;
use http_body_util::combinators::BoxBody;
use hyper::body::Bytes;
use hyper::{Request, Response, StatusCode};
use shared::counter;
use shared::http::{make_json_response, make_text_response};
use std::sync::Arc;

pub type RelayBody = BoxBody<Bytes, RelayError>;

const SUCCESS_BODY: &[u8] = br#"{"success":true}"#;

/// The two request shapes the relay understands.
#[derive(Debug, PartialEq, Eq)]
pub enum Route<'a> {
    /// `/{group}`
    ListUsers { group: &'a str },
    /// `/{group}/{pull-request-url}`
    AssignReviewers {
        group: &'a str,
        pull_request: &'a str,
    },
}

impl<'a> Route<'a> {
    /// Splits an already percent-decoded path at its first `/` once the
    /// surrounding slashes are removed. Everything after the group is the
    /// pull request URL, which itself contains slashes.
    pub fn from_path(path: &'a str) -> Result<Self, RelayError> {
        let path = path.trim_matches('/');
        if path.is_empty() {
            return Err(RelayError::BadRequest);
        }

        Ok(match path.split_once('/') {
            Some((group, pull_request)) => Route::AssignReviewers {
                group,
                pull_request,
            },
            None => Route::ListUsers { group: path },
        })
    }

    fn mode(&self) -> &'static str {
        match self {
            Route::ListUsers { .. } => "list_users",
            Route::AssignReviewers { .. } => "assign_reviewers",
        }
    }
}

struct RouterInner {
    resolver: GroupResolver,
    assigner: ReviewerAssigner,
    intersect: Vec<String>,
}

/// Dispatches requests to group listing or reviewer assignment
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// When `intersect` is non-empty, groups used for assignment are first
    /// intersected with those groups.
    pub fn new(resolver: GroupResolver, assigner: ReviewerAssigner, intersect: Vec<String>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                resolver,
                assigner,
                intersect,
            }),
        }
    }

    /// Routes an incoming request. Every failure is answered with a plain
    /// text error response.
    pub async fn route<B>(&self, req: Request<B>) -> Response<RelayBody>
    where
        B: Send + 'static,
    {
        let path = match urlencoding::decode(req.uri().path()) {
            Ok(path) => path.into_owned(),
            Err(_) => return self.handle_bad_request(),
        };

        let route = match Route::from_path(&path) {
            Ok(route) => route,
            Err(_) => return self.handle_bad_request(),
        };
        counter!(REQUESTS, "mode" => route.mode()).increment(1);

        match route {
            Route::ListUsers { group } => self.handle_list_users(group).await,
            Route::AssignReviewers {
                group,
                pull_request,
            } => self.handle_assign_reviewers(group, pull_request).await,
        }
    }

    async fn handle_list_users(&self, group: &str) -> Response<RelayBody> {
        let users = match self.inner.resolver.resolve(group).await {
            Ok(users) => users,
            Err(err) => {
                return make_text_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string());
            }
        };

        match serde_json::to_vec(&users) {
            Ok(body) => make_json_response(StatusCode::OK, body),
            Err(err) => make_text_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
        }
    }

    async fn handle_assign_reviewers(&self, group: &str, pull_request: &str) -> Response<RelayBody> {
        let resolved = if self.inner.intersect.is_empty() {
            self.inner.resolver.resolve(group).await
        } else {
            self.inner
                .resolver
                .resolve_intersection(group, &self.inner.intersect)
                .await
        };

        let users = match resolved {
            Ok(users) => users,
            Err(err) => return make_text_response(StatusCode::BAD_REQUEST, &err.to_string()),
        };

        let pr = match PullRequestRef::parse(pull_request) {
            Ok(pr) => pr,
            Err(err) => {
                tracing::debug!(pull_request, "not a pull request url");
                return make_text_response(StatusCode::BAD_REQUEST, &err.to_string());
            }
        };

        match self.inner.assigner.assign(&pr, &users).await {
            Ok(_) => make_json_response(StatusCode::OK, SUCCESS_BODY.to_vec()),
            Err(err) => make_text_response(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string()),
        }
    }

    fn handle_bad_request(&self) -> Response<RelayBody> {
        counter!(REQUESTS, "mode" => "bad_request").increment(1);
        make_text_response(StatusCode::BAD_REQUEST, &RelayError::BadRequest.to_string())
    }
}
