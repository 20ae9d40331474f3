// # piholectl - Pi-hole list reconciler
//
// This binary is a THIN integration layer:
// - DO NOT add diffing or apply logic here, it belongs in pihole-core
// - Configuration is via environment variables ONLY
// - stdout carries only the JSON result, logs go to stderr
//
// piholectl is responsible for:
// 1. Reading configuration from environment variables
// 2. Loading the declared manifest
// 3. Connecting to the Pi-hole instance
// 4. Running exactly one reconciliation and printing the result
//
// ## Configuration
//
// - `PIHOLE_URL`: Base URL of the instance (http or https)
// - `PIHOLE_PASSWORD`: Web interface / API password
// - `PIHOLE_MANIFEST`: Path to the JSON manifest
// - `PIHOLE_DRY_RUN`: `true`/`false`/`1`/`0` (default false)
// - `PIHOLE_LOG_LEVEL`: trace, debug, info, warn, error (default info)
//
// ## Example
//
// ```bash
// export PIHOLE_URL=https://pihole.lan
// export PIHOLE_PASSWORD=your_password
// export PIHOLE_MANIFEST=/etc/pihole/lists.json
//
// piholectl
// ```

use anyhow::Result;
use pihole_api::PiholeClient;
use pihole_core::{ConnectionConfig, Error, Manifest, ReconcileOptions, Reconciler};
use serde_json::Value;
use std::env;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for the possible run outcomes
///
/// - 0: Run finished (changed or not)
/// - 1: Configuration or manifest error
/// - 2: Runtime error (connection, fetch, validation, apply)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PiholeExitCode {
    /// Reconciliation finished
    Success = 0,
    /// Configuration or manifest error
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<PiholeExitCode> for ExitCode {
    fn from(code: PiholeExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

impl PiholeExitCode {
    /// Pick the exit code for a failed run
    fn for_error(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidInput(_) | Error::DuplicateEntry { .. } => {
                PiholeExitCode::ConfigError
            }
            _ => PiholeExitCode::RuntimeError,
        }
    }
}

/// Application configuration
struct Config {
    url: String,
    password: String,
    manifest_path: PathBuf,
    dry_run: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through a variable lookup
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name).ok_or_else(|| {
                anyhow::anyhow!("{} is required. Set it via: export {}=...", name, name)
            })
        };

        Ok(Self {
            url: required("PIHOLE_URL")?.trim().trim_end_matches('/').to_string(),
            password: required("PIHOLE_PASSWORD")?,
            manifest_path: PathBuf::from(required("PIHOLE_MANIFEST")?),
            dry_run: match lookup("PIHOLE_DRY_RUN") {
                Some(value) => parse_bool("PIHOLE_DRY_RUN", &value)?,
                None => false,
            },
            log_level: lookup("PIHOLE_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.connection().validate()?;

        if self.manifest_path.as_os_str().is_empty() {
            anyhow::bail!("PIHOLE_MANIFEST cannot be empty");
        }
        if !self.manifest_path.is_file() {
            anyhow::bail!(
                "PIHOLE_MANIFEST does not point to a file: {}",
                self.manifest_path.display()
            );
        }

        parse_level(&self.log_level)?;
        Ok(())
    }

    fn connection(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.url.clone(), self.password.clone())
    }

    fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            dry_run: self.dry_run,
        }
    }
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("url", &self.url)
            .field("password", &"<REDACTED>")
            .field("manifest_path", &self.manifest_path)
            .field("dry_run", &self.dry_run)
            .field("log_level", &self.log_level)
            .finish()
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" | "" => Ok(false),
        other => anyhow::bail!("{} must be true, false, 1 or 0. Got: {}", name, other),
    }
}

fn parse_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "PIHOLE_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            value
        ),
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return PiholeExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return PiholeExitCode::ConfigError.into();
    }

    let log_level = parse_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return PiholeExitCode::ConfigError.into();
    }

    let manifest = match Manifest::from_file(&config.manifest_path) {
        Ok(manifest) => manifest,
        Err(e) => {
            error!("{}", e);
            return PiholeExitCode::ConfigError.into();
        }
    };

    info!(
        "Loaded {} manifest from {}",
        manifest.mode_name(),
        config.manifest_path.display()
    );

    let rt = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return PiholeExitCode::RuntimeError.into();
        }
    };

    rt.block_on(reconcile(&config, &manifest)).into()
}

/// Connect, run one reconciliation, print the result, close the session
async fn reconcile(config: &Config, manifest: &Manifest) -> PiholeExitCode {
    let client = match PiholeClient::connect(&config.connection()).await {
        Ok(client) => client,
        Err(e) => {
            error!("{}", e);
            return PiholeExitCode::for_error(&e);
        }
    };

    let reconciler = Reconciler::new(
        Box::new(client.clone()),
        Box::new(client.clone()),
        config.options(),
    );
    let outcome = reconciler.run(manifest).await;

    if let Err(e) = client.close().await {
        warn!("Failed to close Pi-hole session: {}", e);
    }

    match outcome {
        Ok(result) => {
            print_json(&result.to_output());
            PiholeExitCode::Success
        }
        Err(e) => {
            if let Some(partial) = e.partial_result() {
                print_json(&partial.to_output());
            }
            error!("Reconciliation failed: {}", e);
            PiholeExitCode::for_error(&e)
        }
    }
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(_) => println!("{}", value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    fn manifest_file() -> tempfile::NamedTempFile {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), r#"{"mode": "patch", "lists": []}"#).unwrap();
        file
    }

    #[test]
    fn config_reads_defaults() {
        let manifest = manifest_file();
        let path = manifest.path().to_str().unwrap();
        let config = load(&[
            ("PIHOLE_URL", "https://pihole.lan/"),
            ("PIHOLE_PASSWORD", "secret"),
            ("PIHOLE_MANIFEST", path),
        ])
        .unwrap();

        assert_eq!(config.url, "https://pihole.lan");
        assert!(!config.dry_run);
        assert_eq!(config.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn config_requires_password() {
        let err = load(&[
            ("PIHOLE_URL", "https://pihole.lan"),
            ("PIHOLE_MANIFEST", "/tmp/lists.json"),
        ])
        .unwrap_err();

        assert!(err.to_string().contains("PIHOLE_PASSWORD"));
    }

    #[test]
    fn config_parses_dry_run_flag() {
        let with_flag = |flag: &str| {
            load(&[
                ("PIHOLE_URL", "https://pihole.lan"),
                ("PIHOLE_PASSWORD", "secret"),
                ("PIHOLE_MANIFEST", "/tmp/lists.json"),
                ("PIHOLE_DRY_RUN", flag),
            ])
        };

        assert!(with_flag("1").unwrap().dry_run);
        assert!(with_flag("TRUE").unwrap().dry_run);
        assert!(!with_flag("false").unwrap().dry_run);
        assert!(with_flag("maybe").is_err());
    }

    #[test]
    fn validate_rejects_bad_values() {
        let manifest = manifest_file();
        let path = manifest.path().to_str().unwrap();

        let bad_scheme = load(&[
            ("PIHOLE_URL", "ftp://pihole.lan"),
            ("PIHOLE_PASSWORD", "secret"),
            ("PIHOLE_MANIFEST", path),
        ])
        .unwrap();
        assert!(bad_scheme.validate().is_err());

        let bad_level = load(&[
            ("PIHOLE_URL", "https://pihole.lan"),
            ("PIHOLE_PASSWORD", "secret"),
            ("PIHOLE_MANIFEST", path),
            ("PIHOLE_LOG_LEVEL", "loud"),
        ])
        .unwrap();
        assert!(bad_level.validate().is_err());

        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.json");
        let missing_manifest = load(&[
            ("PIHOLE_URL", "https://pihole.lan"),
            ("PIHOLE_PASSWORD", "secret"),
            ("PIHOLE_MANIFEST", missing.to_str().unwrap()),
        ])
        .unwrap();
        assert!(missing_manifest.validate().is_err());
    }

    #[test]
    fn debug_hides_password() {
        let config = load(&[
            ("PIHOLE_URL", "https://pihole.lan"),
            ("PIHOLE_PASSWORD", "hunter2-secret"),
            ("PIHOLE_MANIFEST", "/tmp/lists.json"),
        ])
        .unwrap();

        let debug_str = format!("{:?}", config);
        assert!(!debug_str.contains("hunter2-secret"));
        assert!(debug_str.contains("<REDACTED>"));
    }

    #[test]
    fn exit_codes_follow_error_stage() {
        assert_eq!(
            PiholeExitCode::for_error(&Error::invalid_input("bad manifest")),
            PiholeExitCode::ConfigError
        );
        assert_eq!(
            PiholeExitCode::for_error(&Error::connection("refused")),
            PiholeExitCode::RuntimeError
        );
        assert_eq!(
            PiholeExitCode::for_error(&Error::fetch("block lists: boom")),
            PiholeExitCode::RuntimeError
        );
        assert_eq!(PiholeExitCode::Success as u8, 0);
    }
}
