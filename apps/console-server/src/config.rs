//! Layered server configuration.
//!
//! Sources, later ones winning: built-in defaults, the YAML file given with
//! `--config`, `CONSOLE__*` environment variables (`__` separates nesting
//! levels, e.g. `CONSOLE__BACKEND__REST__ANON_KEY`) and finally CLI flags.

use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result};
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use marketplace_admin::config::ConsoleConfig;
use memory_backend_plugin::MemoryBackendConfig;
use rest_backend_plugin::RestBackendConfig;
use serde::{Deserialize, Serialize};

pub const ENV_PREFIX: &str = "CONSOLE__";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub backend: BackendConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Whole-request deadline; exceeded requests get 504.
    pub request_timeout_secs: u64,
    pub cors: CorsConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 8087)),
            request_timeout_secs: 30,
            cors: CorsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CorsConfig {
    pub enabled: bool,
    /// `"*"` allows any origin.
    pub allowed_origins: Vec<String>,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            allowed_origins: Vec::new(),
            max_age_secs: 600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Rest,
    Memory,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub rest: RestBackendConfig,
    pub memory: MemoryBackendConfig,
}

/// Flags that override loaded values.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub port: Option<u16>,
    pub verbose: u8,
    pub mock: bool,
}

impl AppConfig {
    /// Load defaults, then `path` (when given), then the environment.
    ///
    /// # Errors
    /// Returns an error if the file is unreadable or any layer fails to
    /// deserialize into the typed sections.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file_exact(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }

    pub fn apply_cli_overrides(&mut self, cli: &CliOverrides) {
        if let Some(port) = cli.port {
            self.server.bind_addr.set_port(port);
        }
        match cli.verbose {
            0 => {}
            1 => "info".clone_into(&mut self.logging.level),
            2 => "debug".clone_into(&mut self.logging.level),
            _ => "trace".clone_into(&mut self.logging.level),
        }
        if cli.mock {
            self.backend.kind = BackendKind::Memory;
        }
    }

    /// Effective configuration as YAML, secrets redacted.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_yaml(&self) -> Result<String> {
        serde_saphyr::to_string(self).context("failed to render configuration")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write as _;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        figment::Jail::expect_with(|_| {
            let cfg = AppConfig::load(None).unwrap();
            assert_eq!(cfg.server.bind_addr.to_string(), "127.0.0.1:8087");
            assert_eq!(cfg.logging.level, "info");
            assert_eq!(cfg.backend.kind, BackendKind::Rest);
            assert_eq!(cfg.console.page_size, 10);
            Ok(())
        });
    }

    #[test]
    fn yaml_then_env_then_cli() {
        let file = yaml_file(
            r#"
server:
  bind_addr: "0.0.0.0:9000"
logging:
  level: warn
backend:
  kind: rest
  rest:
    url: "https://project.example.co"
    anon_key: "from-file"
console:
  page_size: 25
"#,
        );
        figment::Jail::expect_with(|jail| {
            jail.set_env("CONSOLE__BACKEND__REST__ANON_KEY", "from-env");
            jail.set_env("CONSOLE__CONSOLE__PAGE_SIZE", "50");

            let mut cfg = AppConfig::load(Some(file.path())).unwrap();
            assert_eq!(cfg.backend.rest.url, "https://project.example.co");
            assert_eq!(cfg.backend.rest.anon_key.expose(), "from-env");
            assert_eq!(cfg.console.page_size, 50);
            assert_eq!(cfg.logging.level, "warn");

            cfg.apply_cli_overrides(&CliOverrides {
                port: Some(9100),
                verbose: 2,
                mock: true,
            });
            assert_eq!(cfg.server.bind_addr.to_string(), "0.0.0.0:9100");
            assert_eq!(cfg.logging.level, "debug");
            assert_eq!(cfg.backend.kind, BackendKind::Memory);
            Ok(())
        });
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = yaml_file("server:\n  bind: \"0.0.0.0:1\"\n");
        figment::Jail::expect_with(|_| {
            assert!(AppConfig::load(Some(file.path())).is_err());
            Ok(())
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        figment::Jail::expect_with(|_| {
            assert!(AppConfig::load(Some(Path::new("/nonexistent/console.yaml"))).is_err());
            Ok(())
        });
    }

    #[test]
    fn printed_config_hides_the_anon_key() {
        let mut cfg = AppConfig::default();
        cfg.backend.rest.anon_key = console_security::SecretString::new("very-secret");
        let yaml = cfg.to_yaml().unwrap();
        assert!(!yaml.contains("very-secret"));
        assert!(yaml.contains("[REDACTED]"));
    }
}
