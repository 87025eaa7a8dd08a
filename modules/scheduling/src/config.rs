use serde::{Deserialize, Serialize};

/// Configuration for the scheduling module (`modules.scheduling`)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulingConfig {
    #[serde(default = "default_max_profile_name_length")]
    pub max_profile_name_length: usize,
    #[serde(default = "default_max_title_length")]
    pub max_title_length: usize,
    #[serde(default = "default_max_description_length")]
    pub max_description_length: usize,
    #[serde(default = "default_timezone")]
    pub default_timezone: String,
    #[serde(default = "default_update_retry_limit")]
    pub update_retry_limit: u32,
}

impl Default for SchedulingConfig {
    fn default() -> Self {
        Self {
            max_profile_name_length: default_max_profile_name_length(),
            max_title_length: default_max_title_length(),
            max_description_length: default_max_description_length(),
            default_timezone: default_timezone(),
            update_retry_limit: default_update_retry_limit(),
        }
    }
}

fn default_max_profile_name_length() -> usize {
    50
}

fn default_max_title_length() -> usize {
    100
}

fn default_max_description_length() -> usize {
    500
}

fn default_timezone() -> String {
    "UTC".to_string()
}

fn default_update_retry_limit() -> u32 {
    3
}
