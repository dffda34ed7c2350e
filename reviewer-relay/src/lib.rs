pub mod config;
pub mod errors;
pub mod groups;
pub mod intersection;
pub mod metrics_defs;
pub mod pull_request;
pub mod reviewers;
pub mod router;
pub mod service;
pub mod stash;

#[cfg(test)]
mod testutils;

use crate::errors::RelayError;
use crate::groups::{GroupResolver, MembershipCache};
use crate::reviewers::ReviewerAssigner;
use crate::router::Router;
use crate::service::RelayService;
use crate::stash::{StashApi, StashClient};
use shared::http::run_http_service;
use std::sync::Arc;

pub async fn run(config: config::Config) -> Result<(), RelayError> {
    let router = build_router(&config)?;

    run_http_service(&config.listen, move |peer_addr| {
        RelayService::new(router.clone(), peer_addr)
    })
    .await
}

/// Wires the Stash client, the membership cache and the assigner together.
/// The cache lives as long as the returned router.
pub fn build_router(config: &config::Config) -> Result<Router, RelayError> {
    let stash: Arc<dyn StashApi> =
        Arc::new(StashClient::new(&config.stash, &config.user, &config.pass)?);
    let cache = Arc::new(MembershipCache::new());

    let resolver = GroupResolver::new(stash.clone(), cache, config.strict_groups);
    let assigner = ReviewerAssigner::new(stash, config.user.clone());

    Ok(Router::new(resolver, assigner, config.intersect.clone()))
}
