use std::path::PathBuf;

use serde::Deserialize;

use super::app_config::{AppConfig, ChatConfig, IdentityConfig, LocalConfig, LogConfig};

#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub logging: Option<FileLogConfig>,
    pub identity: Option<FileIdentityConfig>,
    pub chat: Option<FileChatConfig>,
    pub local: Option<FileLocalConfig>,
}

impl FileConfig {
    pub fn merge_into(self, config: &mut AppConfig) {
        if let Some(logging) = self.logging {
            logging.merge_into(&mut config.logging);
        }

        if let Some(identity) = self.identity {
            identity.merge_into(&mut config.identity);
        }

        if let Some(chat) = self.chat {
            chat.merge_into(&mut config.chat);
        }

        if let Some(local) = self.local {
            local.merge_into(&mut config.local);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLogConfig {
    pub level: Option<String>,
    pub dir: Option<PathBuf>,
}

impl FileLogConfig {
    fn merge_into(self, config: &mut LogConfig) {
        if let Some(level) = self.level {
            config.level = level;
        }

        if let Some(dir) = self.dir {
            config.dir = Some(dir);
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileIdentityConfig {
    pub user_id: Option<uuid::Uuid>,
    pub display_name: Option<String>,
}

impl FileIdentityConfig {
    fn merge_into(self, config: &mut IdentityConfig) {
        if let Some(user_id) = self.user_id {
            config.user_id = user_id;
        }

        if let Some(display_name) = self.display_name {
            config.display_name = display_name;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileChatConfig {
    pub page_size: Option<usize>,
    pub max_content_len: Option<usize>,
    pub orphan_reaction_limit: Option<usize>,
    pub notice_capacity: Option<usize>,
}

impl FileChatConfig {
    fn merge_into(self, config: &mut ChatConfig) {
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }

        if let Some(max_content_len) = self.max_content_len {
            config.max_content_len = max_content_len;
        }

        if let Some(limit) = self.orphan_reaction_limit {
            config.orphan_reaction_limit = limit;
        }

        if let Some(capacity) = self.notice_capacity {
            config.notice_capacity = capacity;
        }
    }
}

#[derive(Debug, Deserialize, Default)]
pub struct FileLocalConfig {
    pub seed_demo: Option<bool>,
    pub latency_ms: Option<u64>,
    pub teammate_every_secs: Option<u64>,
}

impl FileLocalConfig {
    fn merge_into(self, config: &mut LocalConfig) {
        if let Some(seed_demo) = self.seed_demo {
            config.seed_demo = seed_demo;
        }

        if let Some(latency_ms) = self.latency_ms {
            config.latency_ms = latency_ms;
        }

        if let Some(every) = self.teammate_every_secs {
            config.teammate_every_secs = every;
        }
    }
}
