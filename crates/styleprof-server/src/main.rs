mod api;
mod middleware;
mod scheduler;

use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use styleprof_core::AppConfig;
use styleprof_jobs::{JobManager, JobStore, MemoryJobStore, PgJobStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

/// How long shutdown waits for cancelled jobs to record their failure.
const JOB_DRAIN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = styleprof_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let (store, pool) = open_store(&config).await?;
    let manager = Arc::new(JobManager::from_config(&config, store)?);

    scheduler::sweep_stale_jobs(&manager, config.stale_job_age()).await;
    let _scheduler =
        scheduler::build_scheduler(Arc::clone(&manager), config.stale_job_age()).await?;

    let auth = AuthState::from_env(matches!(
        config.env,
        styleprof_core::Environment::Development
    ))?;
    let shutdown = CancellationToken::new();
    let state = AppState {
        manager: Arc::clone(&manager),
        shutdown: shutdown.clone(),
        pool,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "styleprof-server listening");
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await;

    // Also reached when `serve` fails, so jobs are cancelled either way.
    shutdown.cancel();
    manager.drain(JOB_DRAIN_GRACE).await;
    served?;
    Ok(())
}

/// Postgres-backed store when `DATABASE_URL` is set, in-memory otherwise.
async fn open_store(config: &AppConfig) -> anyhow::Result<(Arc<dyn JobStore>, Option<PgPool>)> {
    if config.database_url.is_none() {
        tracing::warn!("DATABASE_URL not set; job records are kept in memory only");
        return Ok((Arc::new(MemoryJobStore::new()), None));
    }

    let pool = styleprof_db::connect_from_app_config(config).await?;
    let applied = styleprof_db::run_migrations(&pool).await?;
    tracing::info!(applied, "database migrations up to date");
    Ok((Arc::new(PgJobStore::new(pool.clone())), Some(pool)))
}

async fn shutdown_signal(jobs: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, cancelling in-flight jobs");
    jobs.cancel();
}
