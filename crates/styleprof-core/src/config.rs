use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a pure
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let optional = |var: &str| -> Option<String> {
        lookup(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_addr = |var: &str, default: &str| -> Result<SocketAddr, ConfigError> {
        or_default(var, default)
            .parse::<SocketAddr>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_positive_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))?;
        if value == 0 {
            return Err(invalid(var, "must be at least 1".to_string()));
        }
        Ok(value)
    };

    let database_url = optional("DATABASE_URL");
    let env = parse_environment(&or_default("STYLEPROF_ENV", "development"));
    let bind_addr = parse_addr("STYLEPROF_BIND_ADDR", "0.0.0.0:5000")?;
    let log_level = or_default("STYLEPROF_LOG_LEVEL", "info");
    let output_dir = PathBuf::from(or_default("STYLEPROF_OUTPUT_DIR", "./output"));
    let transcript_root = PathBuf::from(or_default("STYLEPROF_TRANSCRIPT_ROOT", "."));
    let speaker_label = or_default("STYLEPROF_SPEAKER_LABEL", "Speaker 2");

    let analysis_timeout_secs = parse_u64("STYLEPROF_ANALYSIS_TIMEOUT_SECS", "30")?;
    let analysis_concurrency = parse_positive_usize("STYLEPROF_ANALYSIS_CONCURRENCY", "5")?;
    let scoring_timeout_secs = parse_u64("STYLEPROF_SCORING_TIMEOUT_SECS", "10")?;
    let scoring_concurrency = parse_positive_usize("STYLEPROF_SCORING_CONCURRENCY", "8")?;

    let notify_url = optional("STYLEPROF_NOTIFY_URL");
    let notify_api_key = optional("STYLEPROF_NOTIFY_API_KEY");
    let notify_timeout_secs = parse_u64("STYLEPROF_NOTIFY_TIMEOUT_SECS", "10")?;
    let notify_max_attempts = parse_u32("STYLEPROF_NOTIFY_MAX_ATTEMPTS", "3")?;
    if notify_max_attempts == 0 {
        return Err(invalid(
            "STYLEPROF_NOTIFY_MAX_ATTEMPTS",
            "must be at least 1".to_string(),
        ));
    }
    let notify_backoff_base_ms = parse_u64("STYLEPROF_NOTIFY_BACKOFF_BASE_MS", "500")?;
    let stale_job_secs = parse_u64("STYLEPROF_STALE_JOB_SECS", "3600")?;

    let db_max_connections = parse_u32("STYLEPROF_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("STYLEPROF_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_u64("STYLEPROF_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        output_dir,
        transcript_root,
        speaker_label,
        analysis_timeout_secs,
        analysis_concurrency,
        scoring_timeout_secs,
        scoring_concurrency,
        notify_url,
        notify_api_key,
        notify_timeout_secs,
        notify_max_attempts,
        notify_backoff_base_ms,
        stale_job_secs,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
