use crate::errors::Result;
use crate::metrics_defs::{ASSIGN_FAILURE, ASSIGN_SUCCESS};
use crate::pull_request::PullRequestRef;
use crate::stash::{PullRequestUpdate, StashApi};
use shared::counter;
use std::sync::Arc;

/// Sets the reviewers of a pull request.
pub struct ReviewerAssigner {
    stash: Arc<dyn StashApi>,
    // The relay's own Stash account is never requested as a reviewer.
    own_account: String,
}

impl ReviewerAssigner {
    pub fn new(stash: Arc<dyn StashApi>, own_account: impl Into<String>) -> Self {
        ReviewerAssigner {
            stash,
            own_account: own_account.into(),
        }
    }

    /// Replaces the reviewers of `pr` with `candidates`, minus the pull
    /// request author and the relay's own account, and returns the reviewers
    /// that were sent.
    ///
    /// The update carries the version read just before it. A concurrent
    /// change to the pull request makes Stash reject the update, which is
    /// returned as an error and not retried.
    pub async fn assign(&self, pr: &PullRequestRef, candidates: &[String]) -> Result<Vec<String>> {
        let result = self.try_assign(pr, candidates).await;
        match &result {
            Ok(reviewers) => {
                counter!(ASSIGN_SUCCESS).increment(1);
                tracing::info!(pull_request = %pr, reviewers = ?reviewers, "reviewers assigned");
            }
            Err(err) => {
                counter!(ASSIGN_FAILURE).increment(1);
                tracing::error!(pull_request = %pr, error = %err, "failed to assign reviewers");
            }
        }
        result
    }

    async fn try_assign(&self, pr: &PullRequestRef, candidates: &[String]) -> Result<Vec<String>> {
        let state = self.stash.pull_request(pr).await?;

        let excluded = [state.author_name(), self.own_account.as_str()];
        let reviewers = select_reviewers(candidates, &excluded);
        let update = PullRequestUpdate::new(pr, state.version, &reviewers);
        self.stash.update_reviewers(pr, &update).await?;

        Ok(reviewers)
    }
}

/// `candidates` in order, without any of `excluded`.
pub fn select_reviewers(candidates: &[String], excluded: &[&str]) -> Vec<String> {
    candidates
        .iter()
        .filter(|user| !excluded.contains(&user.as_str()))
        .cloned()
        .collect()
}
