use crate::errors::RelayError;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

// Matches anywhere in the input. The `users|projects` group must be present
// but does not affect the result.
static PULL_REQUEST_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(https?://.*/)",
        r"(users|projects)/([^/]+)",
        r"/repos/([^/]+)",
        r"/pull-requests/(\d+)",
    ))
    .expect("pull request pattern is valid")
});

/// Identifies a pull request on Stash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PullRequestRef {
    pub project: String,
    pub repository: String,
    pub id: String,
}

impl PullRequestRef {
    /// Extracts the pull request from a Stash web URL such as
    /// `https://stash/projects/FOO/repos/bar/pull-requests/42/overview`.
    pub fn parse(url: &str) -> Result<Self, RelayError> {
        let captures = PULL_REQUEST_URL
            .captures(url)
            .ok_or(RelayError::InvalidUrl)?;

        Ok(PullRequestRef {
            project: captures[3].to_string(),
            repository: captures[4].to_string(),
            id: captures[5].to_string(),
        })
    }
}

impl FromStr for PullRequestRef {
    type Err = RelayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PullRequestRef::parse(s)
    }
}

impl fmt::Display for PullRequestRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.project, self.repository, self.id)
    }
}
