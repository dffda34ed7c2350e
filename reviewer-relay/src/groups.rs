use crate::errors::Result;
use crate::intersection::intersect;
use crate::metrics_defs::{GROUP_CACHE_HIT, GROUP_CACHE_MISS, GROUP_LOOKUP_ERROR};
use crate::stash::StashApi;
use parking_lot::RwLock;
use shared::counter;
use std::collections::HashMap;
use std::sync::Arc;

/// Process-wide group membership, filled lazily and never evicted.
///
/// Entries are write-once: the first insert for a group wins and later
/// inserts for the same group are ignored. Guards are only held for the
/// duration of a map operation, never across an upstream call.
#[derive(Default)]
pub struct MembershipCache {
    groups: RwLock<HashMap<String, Vec<String>>>,
}

impl MembershipCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, group: &str) -> Option<Vec<String>> {
        self.groups.read().get(group).cloned()
    }

    /// Returns false if the group was already cached.
    pub fn insert(&self, group: &str, members: Vec<String>) -> bool {
        let mut write_guard = self.groups.write();
        if write_guard.contains_key(group) {
            return false;
        }
        write_guard.insert(group.to_string(), members);
        true
    }
}

/// Resolves group names to member lists through the cache.
pub struct GroupResolver {
    stash: Arc<dyn StashApi>,
    cache: Arc<MembershipCache>,
    strict: bool,
}

impl GroupResolver {
    /// With `strict` unset, a failed lookup resolves to an empty group
    /// instead of an error.
    pub fn new(stash: Arc<dyn StashApi>, cache: Arc<MembershipCache>, strict: bool) -> Self {
        GroupResolver {
            stash,
            cache,
            strict,
        }
    }

    pub async fn resolve(&self, group: &str) -> Result<Vec<String>> {
        if let Some(members) = self.cache.get(group) {
            counter!(GROUP_CACHE_HIT).increment(1);
            return Ok(members);
        }
        counter!(GROUP_CACHE_MISS).increment(1);

        let members = match self.stash.group_members(group).await {
            Ok(members) => members,
            Err(err) => {
                counter!(GROUP_LOOKUP_ERROR).increment(1);
                if self.strict {
                    return Err(err);
                }
                tracing::warn!(group, error = %err, "group lookup failed, treating group as empty");
                return Ok(Vec::new());
            }
        };

        // Empty groups are looked up again next time
        if !members.is_empty() {
            self.cache.insert(group, members.clone());
        }

        Ok(members)
    }

    /// Members of `target` that belong to at least one of `others`.
    pub async fn resolve_intersection(&self, target: &str, others: &[String]) -> Result<Vec<String>> {
        let target_members = self.resolve(target).await?;
        tracing::info!("[{target}]: {}", target_members.join(", "));

        let mut other_members = Vec::new();
        for group in others {
            let members = self.resolve(group).await?;
            tracing::info!("[{group}]: {}", members.join(", "));
            other_members.extend(members);
        }

        let members = intersect(&target_members, &other_members);
        tracing::info!("[intersection]: {}", members.join(", "));

        Ok(members)
    }
}
