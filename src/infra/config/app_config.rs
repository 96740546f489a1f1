use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// User the local backend signs in as unless `[identity]` says otherwise.
pub const DEMO_USER_ID: Uuid = Uuid::from_u128(0x7e57_0000_0000_0000_0000_0000_0000_0001);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct AppConfig {
    pub logging: LogConfig,
    pub identity: IdentityConfig,
    pub chat: ChatConfig,
    pub local: LocalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Overrides the per-user data directory.
    pub dir: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            dir: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IdentityConfig {
    pub user_id: Uuid,
    pub display_name: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            user_id: DEMO_USER_ID,
            display_name: "Coach Carter".to_owned(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatConfig {
    pub page_size: usize,
    pub max_content_len: usize,
    pub orphan_reaction_limit: usize,
    pub notice_capacity: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            page_size: 50,
            max_content_len: 4_000,
            orphan_reaction_limit: 256,
            notice_capacity: 32,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LocalConfig {
    pub seed_demo: bool,
    pub latency_ms: u64,
    /// Zero disables the demo teammate.
    pub teammate_every_secs: u64,
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            seed_demo: true,
            latency_ms: 150,
            teammate_every_secs: 45,
        }
    }
}
