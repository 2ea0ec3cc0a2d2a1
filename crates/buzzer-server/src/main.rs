use std::path::PathBuf;
use std::time::Duration;

use buzzer::prelude::*;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_UPLOADS_DIR: &str = "uploads";

/// Settings read from the environment at startup.
#[derive(Debug, Clone, PartialEq)]
struct Config {
    host: String,
    port: u16,
    uploads_dir: PathBuf,
    idle_timeout: Duration,
    ping_interval: Duration,
}

impl Config {
    fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Unset or unparsable values fall back to their defaults.
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_PORT);
        let idle_secs = lookup("BUZZER_IDLE_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_IDLE_TIMEOUT.as_secs());
        let ping_secs = lookup("BUZZER_PING_INTERVAL_SECS")
            .and_then(|v| v.trim().parse().ok())
            .filter(|secs| *secs > 0)
            .unwrap_or(DEFAULT_PING_INTERVAL.as_secs());

        Self {
            host: lookup("BUZZER_BIND_HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            uploads_dir: lookup("BUZZER_UPLOADS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_UPLOADS_DIR)),
            idle_timeout: Duration::from_secs(idle_secs),
            ping_interval: Duration::from_secs(ping_secs),
        }
    }

    fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "buzzer=info".into()),
        )
        .init();

    let config = Config::from_env();
    tracing::info!(
        addr = %config.bind_addr(),
        uploads = %config.uploads_dir.display(),
        idle_timeout = ?config.idle_timeout,
        ping_interval = ?config.ping_interval,
        "starting buzzer server"
    );

    let server = BuzzerServer::builder()
        .bind(&config.bind_addr())
        .idle_timeout(config.idle_timeout)
        .ping_interval(config.ping_interval)
        .image_store(UploadDirStore::new(&config.uploads_dir))
        .build()
        .await?;

    server.run().await?;
    Ok(())
}
