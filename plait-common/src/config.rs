// plait-common/src/config.rs
use std::env;

use tracing::debug;

use super::error::{PlaitError, Result};
use crate::model::tags::TagMatchPolicy;

// Fallback wrapper container set if PLAIT_WRAPPERS is not set or is empty.
const DEFAULT_WRAPPER_CONTAINERS: &[&str] = &["Shared"];

#[derive(Debug, Clone)]
pub struct Config {
    pub tag_policy: TagMatchPolicy,
    pub wrapper_containers: Vec<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        debug!("Loading plait configuration");

        let tag_policy = match env::var("PLAIT_TAG_POLICY").ok().filter(|s| !s.is_empty()) {
            Some(raw) => raw.parse::<TagMatchPolicy>().map_err(|e| {
                PlaitError::Config(format!("Invalid PLAIT_TAG_POLICY '{raw}': {e}"))
            })?,
            None => {
                debug!(
                    "PLAIT_TAG_POLICY environment variable not set or empty, falling back to default: {}",
                    TagMatchPolicy::default()
                );
                TagMatchPolicy::default()
            }
        };

        let wrapper_containers = match env::var("PLAIT_WRAPPERS").ok().filter(|s| !s.is_empty()) {
            Some(raw) => raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            None => DEFAULT_WRAPPER_CONTAINERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        };

        debug!(
            "Configuration loaded successfully (tag_policy={}, wrappers={:?}).",
            tag_policy, wrapper_containers
        );
        Ok(Self {
            tag_policy,
            wrapper_containers,
        })
    }

    pub fn is_wrapper_container(&self, raw: &str) -> bool {
        self.wrapper_containers.iter().any(|w| w == raw)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tag_policy: TagMatchPolicy::default(),
            wrapper_containers: DEFAULT_WRAPPER_CONTAINERS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

pub fn load_config() -> Result<Config> {
    Config::load()
}
