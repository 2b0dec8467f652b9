use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use styleprof_core::{AppConfig, Job, JobState, TriggerRequest};
use styleprof_jobs::{ArtifactPaths, JobError, JobManager, JobStore, MemoryJobStore, PgJobStore};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const EXIT_FAILED: u8 = 1;
const EXIT_INPUT: u8 = 2;
const EXIT_CONFLICT: u8 = 3;

#[derive(Debug, Parser)]
#[command(name = "styleprof-cli")]
#[command(about = "Build style profiles from interview transcripts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Profile one transcript and wait for the job to finish.
    Run {
        /// Chunked markdown transcript.
        #[arg(long)]
        transcript: PathBuf,
        /// Defaults to the transcript's file stem.
        #[arg(long)]
        project_id: Option<String>,
        /// Defaults to the project id.
        #[arg(long)]
        client_id: Option<String>,
        #[arg(long)]
        display_name: Option<String>,
        /// Artifact root; overrides `STYLEPROF_OUTPUT_DIR`.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Show a persisted job (requires `DATABASE_URL`).
    Status {
        id: Uuid,
        /// Print the full job record as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List recent persisted jobs (requires `DATABASE_URL`).
    Jobs {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Fail running jobs older than `STYLEPROF_STALE_JOB_SECS`.
    Recover,
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    Ping,
    Migrate,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    match dispatch(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

async fn dispatch(cli: Cli) -> anyhow::Result<ExitCode> {
    let mut config = styleprof_core::load_app_config()?;
    init_tracing(&config)?;

    match cli.command {
        Commands::Run {
            transcript,
            project_id,
            client_id,
            display_name,
            output,
        } => {
            if let Some(output) = output {
                config.output_dir = output;
            }
            let trigger = build_trigger(&transcript, project_id, client_id, display_name)?;
            run_job(&config, trigger).await
        }
        Commands::Status { id, json } => {
            let store = require_db_store(&config).await?;
            let job = store.get_job(id).await.map_err(JobError::from)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&job)?);
            } else {
                println!("{}", summarize(&job, &config.output_dir));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Jobs { limit } => {
            let store = require_db_store(&config).await?;
            let jobs = store.list_jobs(limit).await.map_err(JobError::from)?;
            if jobs.is_empty() {
                println!("no jobs");
            }
            for job in &jobs {
                println!("{}", list_line(job));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Recover => {
            let store = require_db_store(&config).await?;
            let manager = JobManager::from_config(&config, store)?;
            let recovered = manager.recover_stale_jobs(config.stale_job_age()).await?;
            println!("recovered {} stale job(s)", recovered.len());
            for job in &recovered {
                println!("{}", list_line(job));
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Db { command } => {
            let pool = styleprof_db::connect_from_app_config(&config).await?;
            match command {
                DbCommands::Ping => {
                    styleprof_db::health_check(&pool).await?;
                    println!("database ok");
                }
                DbCommands::Migrate => {
                    let applied = styleprof_db::run_migrations(&pool).await?;
                    println!("migrations up to date ({applied} applied)");
                }
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_tracing(config: &AppConfig) -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

/// Trigger for a local transcript file.
///
/// The path is made absolute against the working directory so it does not
/// resolve under `STYLEPROF_TRANSCRIPT_ROOT`.
fn build_trigger(
    transcript: &Path,
    project_id: Option<String>,
    client_id: Option<String>,
    display_name: Option<String>,
) -> anyhow::Result<TriggerRequest> {
    let absolute = std::path::absolute(transcript)
        .with_context(|| format!("cannot resolve {}", transcript.display()))?;

    let project_id = project_id.unwrap_or_else(|| {
        transcript
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    });

    Ok(TriggerRequest {
        project_id,
        client_id: client_id.unwrap_or_default(),
        transcript_ref: absolute.display().to_string(),
        display_name,
    })
}

async fn run_job(config: &AppConfig, trigger: TriggerRequest) -> anyhow::Result<ExitCode> {
    let store = open_store(config).await?;
    let manager = JobManager::from_config(config, store)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted; cancelling remaining work");
            on_interrupt.cancel();
        }
    });

    let job = manager.run(trigger, &cancel).await?;
    println!("{}", summarize(&job, manager.output_dir()));

    Ok(match job.state {
        JobState::Completed => ExitCode::SUCCESS,
        _ => ExitCode::from(EXIT_FAILED),
    })
}

async fn open_store(config: &AppConfig) -> anyhow::Result<Arc<dyn JobStore>> {
    if config.database_url.is_none() {
        return Ok(Arc::new(MemoryJobStore::new()));
    }
    require_db_store(config).await
}

async fn require_db_store(config: &AppConfig) -> anyhow::Result<Arc<dyn JobStore>> {
    let pool = styleprof_db::connect_from_app_config(config).await?;
    styleprof_db::run_migrations(&pool).await?;
    Ok(Arc::new(PgJobStore::new(pool)))
}

fn exit_code_for(error: &anyhow::Error) -> u8 {
    match error.downcast_ref::<JobError>() {
        Some(e) if e.is_input() => EXIT_INPUT,
        Some(JobError::Conflict { .. }) => EXIT_CONFLICT,
        _ => EXIT_FAILED,
    }
}

fn summarize(job: &Job, output_dir: &Path) -> String {
    let mut lines = vec![
        format!("job:      {}", job.id),
        format!("project:  {} (client {})", job.project_id, job.client_id),
        format!("state:    {}", job.state),
        format!("attempt:  {}", job.attempt),
    ];

    match job.state {
        JobState::Completed => {
            let paths = ArtifactPaths::for_job(output_dir, job.id);
            lines.push(format!("profile:  {}", paths.profile.display()));
            lines.push(format!("scores:   {}", paths.scores.display()));
            lines.push(format!("notified: {}", job.notification_state));
            for missing in job.missing_sections() {
                lines.push(format!("missing:  {} ({})", missing.name, missing.reason));
            }
        }
        JobState::Failed => {
            if let Some(error) = &job.error {
                lines.push(format!("error:    {error}"));
            }
        }
        JobState::Pending | JobState::Running => {}
    }

    lines.join("\n")
}

fn list_line(job: &Job) -> String {
    format!(
        "{}  {:<9}  {}  attempt {}  {}",
        job.id,
        job.state.as_str(),
        job.project_id,
        job.attempt,
        job.created_at.format("%Y-%m-%d %H:%M:%S")
    )
}

#[cfg(test)]
mod tests;
