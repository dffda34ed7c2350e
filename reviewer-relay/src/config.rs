use serde::Deserialize;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("missing required setting: {0}")]
    MissingSetting(&'static str),

    #[error("empty group name in intersect")]
    EmptyIntersectGroup,
}

/// Relay configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Address to bind to, e.g. "0.0.0.0:8080" or ":8080"
    pub listen: String,
    /// Stash host, e.g. "stash.example.com". A value with a scheme is used
    /// as the origin verbatim.
    pub stash: String,
    /// Account used for basic auth. Never added as a reviewer.
    pub user: String,
    pub pass: String,
    /// Groups the requested group is intersected with before assignment.
    /// When empty, the requested group is used as is.
    #[serde(default)]
    pub intersect: Vec<String>,
    /// Propagate group lookup failures instead of resolving them to an
    /// empty member list.
    #[serde(default)]
    pub strict_groups: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            ("listen", &self.listen),
            ("stash", &self.stash),
            ("user", &self.user),
            ("pass", &self.pass),
        ];

        for (name, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingSetting(name));
            }
        }

        if self.intersect.iter().any(|group| group.trim().is_empty()) {
            return Err(ValidationError::EmptyIntersectGroup);
        }

        Ok(())
    }
}
