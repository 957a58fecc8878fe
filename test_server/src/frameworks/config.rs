use std::{env, path::PathBuf, time::Duration};

// Runtime/server settings read from the environment.

pub fn http_port() -> u16 {
    env::var("TEST_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000)
}

pub fn auth_service_url() -> String {
    env::var("AUTH_SERVICE_URL").unwrap_or_else(|_| "http://127.0.0.1:3002".to_string())
}

pub fn auth_verify_timeout() -> Duration {
    let millis = env::var("AUTH_VERIFY_TIMEOUT_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(1500);
    Duration::from_millis(millis)
}

// Postgres catalog is used only when this is set.
pub fn database_url() -> Option<String> {
    env::var("DATABASE_URL")
        .ok()
        .filter(|value| !value.trim().is_empty())
}

pub fn catalog_path() -> PathBuf {
    env::var("CATALOG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("catalog.toml"))
}

pub fn guest_ttl() -> Duration {
    let seconds = env::var("GUEST_TTL_SECONDS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(DEFAULT_GUEST_TTL_SECONDS);
    Duration::from_secs(seconds)
}

pub fn guest_storage_quota_bytes() -> usize {
    env::var("GUEST_STORAGE_QUOTA_BYTES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
        .unwrap_or(DEFAULT_GUEST_STORAGE_QUOTA_BYTES)
}

pub fn guest_sweep_interval() -> Duration {
    let seconds = env::var("GUEST_SWEEP_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .filter(|value| *value > 0)
        .unwrap_or(300);
    Duration::from_secs(seconds)
}

pub const DEFAULT_GUEST_TTL_SECONDS: u64 = 7 * 24 * 60 * 60;
// Same order of magnitude as browser local storage.
pub const DEFAULT_GUEST_STORAGE_QUOTA_BYTES: usize = 5 * 1024 * 1024;
pub const DB_MAX_CONNECTIONS: u32 = 5;
