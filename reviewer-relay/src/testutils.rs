use crate::errors::{RelayError, Result};
use crate::pull_request::PullRequestRef;
use crate::stash::{Participant, PullRequestState, PullRequestUpdate, StashApi};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;

/// In-memory Stash that records every call made against it.
///
/// Groups not registered with `with_group` fail to resolve, like an unknown
/// group on a real server.
#[derive(Default)]
pub struct MockStash {
    groups: HashMap<String, Vec<String>>,
    pull_requests: HashMap<String, PullRequestState>,
    pub group_lookups: Mutex<Vec<String>>,
    pub updates: Mutex<Vec<(PullRequestRef, PullRequestUpdate)>>,
}

impl MockStash {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(mut self, group: &str, members: &[&str]) -> Self {
        self.groups.insert(
            group.to_string(),
            members.iter().map(|m| m.to_string()).collect(),
        );
        self
    }

    pub fn with_pull_request(mut self, pr: &PullRequestRef, version: i64, author: &str) -> Self {
        self.pull_requests.insert(
            pr.to_string(),
            PullRequestState {
                version,
                author: Participant::new(author),
            },
        );
        self
    }

    pub fn lookups_of(&self, group: &str) -> usize {
        self.group_lookups
            .lock()
            .iter()
            .filter(|g| g.as_str() == group)
            .count()
    }
}

#[async_trait]
impl StashApi for MockStash {
    async fn group_members(&self, group: &str) -> Result<Vec<String>> {
        self.group_lookups.lock().push(group.to_string());
        self.groups
            .get(group)
            .cloned()
            .ok_or_else(|| RelayError::UpstreamUnavailable(format!("404 no such group {group}")))
    }

    async fn pull_request(&self, pr: &PullRequestRef) -> Result<PullRequestState> {
        self.pull_requests
            .get(&pr.to_string())
            .cloned()
            .ok_or_else(|| RelayError::UpstreamUnavailable(format!("404 no such pull request {pr}")))
    }

    async fn update_reviewers(
        &self,
        pr: &PullRequestRef,
        update: &PullRequestUpdate,
    ) -> Result<()> {
        let current = self.pull_request(pr).await?;
        if current.version != update.version {
            return Err(RelayError::UpstreamUnavailable(format!(
                "409 Conflict: version {} is stale, current is {}",
                update.version, current.version
            )));
        }

        self.updates.lock().push((pr.clone(), update.clone()));
        Ok(())
    }
}

pub fn pull_request_ref(project: &str, repository: &str, id: &str) -> PullRequestRef {
    PullRequestRef {
        project: project.to_string(),
        repository: repository.to_string(),
        id: id.to_string(),
    }
}
