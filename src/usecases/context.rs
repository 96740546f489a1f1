use std::sync::Arc;

use tokio::runtime::Runtime;
use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    backend::local::LocalBackend,
    domain::{chat_session::SessionConfig, message::SenderProfile},
    infra::config::AppConfig,
};

pub struct AppContext {
    pub config: AppConfig,
    pub runtime: Runtime,
    pub backend: Arc<LocalBackend>,
    _log_guard: Option<WorkerGuard>,
}

impl AppContext {
    pub fn new(
        config: AppConfig,
        runtime: Runtime,
        backend: Arc<LocalBackend>,
        log_guard: Option<WorkerGuard>,
    ) -> Self {
        Self {
            config,
            runtime,
            backend,
            _log_guard: log_guard,
        }
    }

    pub fn identity(&self) -> SenderProfile {
        SenderProfile {
            user_id: self.config.identity.user_id,
            display_name: self.config.identity.display_name.clone(),
            avatar_url: None,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            user: self.identity(),
            page_size: self.config.chat.page_size,
            max_content_len: self.config.chat.max_content_len,
            orphan_reaction_limit: self.config.chat.orphan_reaction_limit,
            notice_capacity: self.config.chat.notice_capacity,
        }
    }
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("config", &self.config)
            .field("backend_user", &self.backend.auth_user())
            .finish_non_exhaustive()
    }
}
