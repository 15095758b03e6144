use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

pub const DEFAULT_OFF_MIRRORS: &str = "https://world.openfoodfacts.org,https://world.openfoodfacts.net";
pub const DEFAULT_OFF_USER_AGENT: &str = "nutrack/0.1 (support@nutrack.app)";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if a value is present but invalid.
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
/// Returns `ConfigError` if a value is present but invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the process environment so tests can drive it from a
/// `HashMap` without `set_var`/`remove_var`.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let env = parse_environment(&or_default("NUTRACK_ENV", "development"));

    let bind_addr = or_default("NUTRACK_BIND_ADDR", "0.0.0.0:8080")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("NUTRACK_BIND_ADDR", e.to_string()))?;

    let log_level = or_default("NUTRACK_LOG_LEVEL", "info");

    let off_mirrors = parse_mirrors(&or_default("NUTRACK_OFF_MIRRORS", DEFAULT_OFF_MIRRORS))
        .map_err(|reason| invalid("NUTRACK_OFF_MIRRORS", reason))?;

    let off_timeout_ms = or_default("NUTRACK_OFF_TIMEOUT_MS", "5000")
        .parse::<u64>()
        .map_err(|e| invalid("NUTRACK_OFF_TIMEOUT_MS", e.to_string()))?;
    if off_timeout_ms == 0 {
        return Err(invalid(
            "NUTRACK_OFF_TIMEOUT_MS",
            "timeout must be greater than zero".to_string(),
        ));
    }

    let off_user_agent = or_default("NUTRACK_OFF_USER_AGENT", DEFAULT_OFF_USER_AGENT);

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        off_mirrors,
        off_timeout_ms,
        off_user_agent,
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

/// Split a comma-separated mirror list, trimming whitespace and trailing slashes.
fn parse_mirrors(raw: &str) -> Result<Vec<String>, String> {
    let mirrors: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_end_matches('/').to_string())
        .collect();

    if mirrors.is_empty() {
        return Err("at least one mirror base URL is required".to_string());
    }

    if let Some(bad) = mirrors
        .iter()
        .find(|m| !(m.starts_with("https://") || m.starts_with("http://")))
    {
        return Err(format!("mirror \"{bad}\" must start with http:// or https://"));
    }

    Ok(mirrors)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
