//! Metrics definitions for the relay.

use shared::metrics_defs::{MetricDef, MetricType};

pub const REQUESTS: MetricDef = MetricDef {
    name: "requests",
    metric_type: MetricType::Counter,
    description: "Inbound requests. Tagged with mode (list_users, assign_reviewers, bad_request).",
};

pub const GROUP_CACHE_HIT: MetricDef = MetricDef {
    name: "groups.cache.hit",
    metric_type: MetricType::Counter,
    description: "Group resolutions answered from the membership cache",
};

pub const GROUP_CACHE_MISS: MetricDef = MetricDef {
    name: "groups.cache.miss",
    metric_type: MetricType::Counter,
    description: "Group resolutions that had to query Stash",
};

pub const GROUP_LOOKUP_ERROR: MetricDef = MetricDef {
    name: "groups.lookup.error",
    metric_type: MetricType::Counter,
    description: "Failed group member lookups, including those resolved to an empty group",
};

pub const ASSIGN_SUCCESS: MetricDef = MetricDef {
    name: "reviewers.assign.success",
    metric_type: MetricType::Counter,
    description: "Pull requests whose reviewers were updated",
};

pub const ASSIGN_FAILURE: MetricDef = MetricDef {
    name: "reviewers.assign.failure",
    metric_type: MetricType::Counter,
    description: "Reviewer updates that failed, including stale version conflicts",
};

pub const ALL_METRICS: &[MetricDef] = &[
    REQUESTS,
    GROUP_CACHE_HIT,
    GROUP_CACHE_MISS,
    GROUP_LOOKUP_ERROR,
    ASSIGN_SUCCESS,
    ASSIGN_FAILURE,
];
