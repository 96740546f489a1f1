use std::{path::Path, sync::Arc, time::Duration};

use tracing_appender::non_blocking::WorkerGuard;

use crate::{
    backend::{local::LocalBackend, seed::seed_demo},
    infra::{self, config::AppConfig, error::AppError},
    usecases::context::AppContext,
};

pub fn bootstrap(config_path: Option<&Path>) -> Result<AppContext, AppError> {
    let config = infra::config::load(config_path)?;
    let log_guard = infra::logging::init(&config.logging)?;

    build_context(config, Some(log_guard))
}

fn build_context(config: AppConfig, log_guard: Option<WorkerGuard>) -> Result<AppContext, AppError> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("huddle-io")
        .enable_all()
        .build()
        .map_err(AppError::RuntimeStart)?;

    let backend = Arc::new(LocalBackend::new(
        config.identity.user_id,
        Duration::from_millis(config.local.latency_ms),
    ));
    let context = AppContext::new(config, runtime, backend, log_guard);

    if context.config.local.seed_demo {
        seed_demo(&context.backend, &context.identity()).map_err(AppError::Seed)?;
    } else {
        context
            .backend
            .put_profile(context.identity())
            .map_err(AppError::Seed)?;
    }

    tracing::info!(
        user_id = %context.config.identity.user_id,
        latency_ms = context.config.local.latency_ms,
        seeded = context.config.local.seed_demo,
        "application context ready"
    );
    Ok(context)
}
