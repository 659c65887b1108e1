use anyhow::Result;
use std::fs;
use std::time::Duration;

/// Database connection settings.
///
/// The URL may carry a password in the user-info component
/// (`redis://:secret@host:6379`); the client AUTHs with it on connect.
#[derive(Clone, Debug)]
pub struct DbConfig {
    pub url: String,
    /// How long an operation may wait for an idle pooled connection.
    pub idle_timeout: Duration,
    /// Log every store operation at debug level.
    pub log_commands: bool,
}

impl Default for DbConfig {
    fn default() -> Self {
        // Read configuration from environment variables when present.
        // Env vars:
        // - DOCDEX_DB_URL
        // - DOCDEX_DB_IDLE_TIMEOUT_SECONDS
        // - DOCDEX_DB_LOG_COMMANDS
        let url = std::env::var("DOCDEX_DB_URL")
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string());
        let idle_timeout = std::env::var("DOCDEX_DB_IDLE_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(250));
        let log_commands = std::env::var("DOCDEX_DB_LOG_COMMANDS")
            .ok()
            .and_then(|s| s.parse::<bool>().ok())
            .unwrap_or(false);
        Self {
            url,
            idle_timeout,
            log_commands,
        }
    }
}

/// CLI-level options that binaries pass to `load_db_config`.
/// Keep this small and explicit; binaries can expand for extra fields.
#[derive(Clone, Debug, Default)]
pub struct MergeOpts {
    pub config_path: Option<std::path::PathBuf>,
    pub cli_url: Option<String>,
    pub cli_idle_timeout_seconds: Option<u64>,
    pub cli_log_commands: Option<bool>,
}

/// Load and merge DbConfig from: defaults <- config file <- env vars <- CLI
pub fn load_db_config(mut base: DbConfig, opts: MergeOpts) -> Result<DbConfig> {
    if let Some(path) = opts.config_path.as_ref() {
        if path.exists() {
            let s = fs::read_to_string(path)?;
            let v: toml::Value = toml::from_str(&s)?;
            if let Some(u) = v.get("url").and_then(|x| x.as_str()) {
                base.url = u.to_string();
            }
            if let Some(t) = v.get("idle_timeout_seconds").and_then(|x| x.as_integer()) {
                base.idle_timeout = Duration::from_secs(t as u64);
            }
            if let Some(b) = v.get("log_commands").and_then(|x| x.as_bool()) {
                base.log_commands = b;
            }
        }
    }

    // env vars override file
    if let Ok(u) = std::env::var("DOCDEX_DB_URL") {
        base.url = u;
    }
    if let Ok(t) = std::env::var("DOCDEX_DB_IDLE_TIMEOUT_SECONDS") {
        if let Ok(v) = t.parse::<u64>() {
            base.idle_timeout = Duration::from_secs(v);
        }
    }
    if let Ok(b) = std::env::var("DOCDEX_DB_LOG_COMMANDS") {
        if let Ok(v) = b.parse::<bool>() {
            base.log_commands = v;
        }
    }

    // CLI overrides everything
    if let Some(u) = opts.cli_url {
        base.url = u;
    }
    if let Some(t) = opts.cli_idle_timeout_seconds {
        base.idle_timeout = Duration::from_secs(t);
    }
    if let Some(b) = opts.cli_log_commands {
        base.log_commands = b;
    }

    Ok(base)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::EnvFilter;

    fn init_test_logging() {
        static INIT: std::sync::Once = std::sync::Once::new();
        INIT.call_once(|| {
            let filter =
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
            let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
        });
    }

    fn clear_env() {
        std::env::remove_var("DOCDEX_DB_URL");
        std::env::remove_var("DOCDEX_DB_IDLE_TIMEOUT_SECONDS");
        std::env::remove_var("DOCDEX_DB_LOG_COMMANDS");
    }

    #[test]
    #[serial_test::serial]
    fn file_env_cli_precedence() {
        init_test_logging();
        clear_env();

        let base = DbConfig {
            url: "redis://base:6379".into(),
            idle_timeout: Duration::from_secs(250),
            log_commands: false,
        };

        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let toml = r#"
url = "redis://from-file:6379"
idle_timeout_seconds = 11
"#;
        fs::write(tmp.path(), toml).unwrap();

        std::env::set_var("DOCDEX_DB_URL", "redis://from-env:6379");
        std::env::set_var("DOCDEX_DB_IDLE_TIMEOUT_SECONDS", "22");

        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            cli_url: Some("redis://from-cli:6379".into()),
            cli_idle_timeout_seconds: Some(33),
            cli_log_commands: None,
        };

        let got = load_db_config(base, opts).expect("load");
        assert_eq!(got.url, "redis://from-cli:6379");
        assert_eq!(got.idle_timeout.as_secs(), 33);
        assert!(!got.log_commands);

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn env_overrides_file() {
        init_test_logging();
        clear_env();

        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let toml = r#"
url = "redis://file-only:6379"
idle_timeout_seconds = 7
log_commands = true
"#;
        fs::write(tmp.path(), toml).unwrap();
        std::env::set_var("DOCDEX_DB_URL", "redis://env-only:6379");

        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let got = load_db_config(DbConfig::default(), opts).expect("load");
        assert_eq!(got.url, "redis://env-only:6379");
        assert_eq!(got.idle_timeout.as_secs(), 7);
        assert!(got.log_commands);

        clear_env();
    }

    #[test]
    #[serial_test::serial]
    fn invalid_env_is_ignored() {
        init_test_logging();
        clear_env();

        let tmp = tempfile::NamedTempFile::new().expect("tempfile");
        let toml = r#"
idle_timeout_seconds = 12
"#;
        fs::write(tmp.path(), toml).unwrap();
        std::env::set_var("DOCDEX_DB_IDLE_TIMEOUT_SECONDS", "not-a-number");

        let opts = MergeOpts {
            config_path: Some(tmp.path().to_path_buf()),
            ..Default::default()
        };
        let got = load_db_config(DbConfig::default(), opts).expect("load");
        assert_eq!(got.idle_timeout.as_secs(), 12);

        clear_env();
    }
}
