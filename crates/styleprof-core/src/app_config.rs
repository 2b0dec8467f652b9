use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    /// `None` runs every component against the in-memory job store.
    pub database_url: Option<String>,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub output_dir: PathBuf,
    pub transcript_root: PathBuf,
    pub speaker_label: String,
    pub analysis_timeout_secs: u64,
    pub analysis_concurrency: usize,
    pub scoring_timeout_secs: u64,
    pub scoring_concurrency: usize,
    pub notify_url: Option<String>,
    pub notify_api_key: Option<String>,
    pub notify_timeout_secs: u64,
    pub notify_max_attempts: u32,
    pub notify_backoff_base_ms: u64,
    pub stale_job_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

/// The configuration produced when no variable is set.
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            env: Environment::Development,
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            log_level: "info".to_string(),
            output_dir: PathBuf::from("./output"),
            transcript_root: PathBuf::from("."),
            speaker_label: "Speaker 2".to_string(),
            analysis_timeout_secs: 30,
            analysis_concurrency: 5,
            scoring_timeout_secs: 10,
            scoring_concurrency: 8,
            notify_url: None,
            notify_api_key: None,
            notify_timeout_secs: 10,
            notify_max_attempts: 3,
            notify_backoff_base_ms: 500,
            stale_job_secs: 3600,
            db_max_connections: 10,
            db_min_connections: 1,
            db_acquire_timeout_secs: 10,
        }
    }
}

impl AppConfig {
    #[must_use]
    pub fn notify_backoff_base(&self) -> Duration {
        Duration::from_millis(self.notify_backoff_base_ms)
    }

    #[must_use]
    pub fn analysis_timeout(&self) -> Duration {
        Duration::from_secs(self.analysis_timeout_secs)
    }

    #[must_use]
    pub fn scoring_timeout(&self) -> Duration {
        Duration::from_secs(self.scoring_timeout_secs)
    }

    #[must_use]
    pub fn notify_timeout(&self) -> Duration {
        Duration::from_secs(self.notify_timeout_secs)
    }

    #[must_use]
    pub fn stale_job_age(&self) -> Duration {
        Duration::from_secs(self.stale_job_secs)
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("output_dir", &self.output_dir)
            .field("transcript_root", &self.transcript_root)
            .field("speaker_label", &self.speaker_label)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[redacted]"),
            )
            .field("analysis_timeout_secs", &self.analysis_timeout_secs)
            .field("analysis_concurrency", &self.analysis_concurrency)
            .field("scoring_timeout_secs", &self.scoring_timeout_secs)
            .field("scoring_concurrency", &self.scoring_concurrency)
            .field("notify_url", &self.notify_url)
            .field(
                "notify_api_key",
                &self.notify_api_key.as_ref().map(|_| "[redacted]"),
            )
            .field("notify_timeout_secs", &self.notify_timeout_secs)
            .field("notify_max_attempts", &self.notify_max_attempts)
            .field("notify_backoff_base_ms", &self.notify_backoff_base_ms)
            .field("stale_job_secs", &self.stale_job_secs)
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .finish()
    }
}
