use std::error::Error;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::domain::Actor;

pub const CONFIG_DIR: &str = ".stockgrid";
pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_API_URL: &str = "http://localhost:4000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;
pub const DEFAULT_AREA_ID: &str = "default";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Json,
    Sqlite,
    Http,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Json => "json",
            Backend::Sqlite => "sqlite",
            Backend::Http => "http",
        }
    }

    fn default_store_path(self) -> PathBuf {
        let file = match self {
            Backend::Sqlite => "stock.sqlite",
            Backend::Json | Backend::Http => "matrix.json",
        };
        Path::new(CONFIG_DIR).join(file)
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawConfig {
    #[serde(default)]
    store: RawStore,
    #[serde(default)]
    http: RawHttp,
    #[serde(default)]
    actor: RawActor,
    #[serde(default)]
    logging: RawLogging,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStore {
    backend: Option<Backend>,
    path: Option<PathBuf>,
    area_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHttp {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawActor {
    name: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawLogging {
    filter: Option<String>,
}

/// Command-line and environment values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub backend: Option<Backend>,
    pub api_url: Option<String>,
    pub actor: Option<String>,
    pub actor_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub root: PathBuf,
    pub backend: Backend,
    pub store_path: PathBuf,
    pub area_id: String,
    pub api_url: String,
    pub timeout: Duration,
    pub actor: Actor,
    pub log_filter: Option<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Toml(toml::de::Error),
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {}", path.display(), source)
            }
            ConfigError::Toml(err) => write!(f, "invalid config TOML: {}", err),
            ConfigError::Invalid(message) => write!(f, "invalid config: {}", message),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml(err) => Some(err),
            ConfigError::Invalid(_) => None,
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        ConfigError::Toml(value)
    }
}

pub fn default_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR).join(CONFIG_FILE)
}

impl Config {
    /// Reads `explicit` (which must exist) or the default file under `root`
    /// (which may be missing), then applies `overrides`.
    pub fn load(
        root: &Path,
        explicit: Option<&Path>,
        overrides: Overrides,
    ) -> Result<Self, ConfigError> {
        let path = explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| default_config_path(root));
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound && explicit.is_none() => {
                String::new()
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };
        Self::from_toml(root, &raw, overrides)
    }

    pub fn from_toml(root: &Path, raw: &str, overrides: Overrides) -> Result<Self, ConfigError> {
        let file: RawConfig = toml::from_str(raw)?;

        let backend = overrides
            .backend
            .or(file.store.backend)
            .unwrap_or_default();
        let store_path = file
            .store
            .path
            .unwrap_or_else(|| backend.default_store_path());
        let store_path = if store_path.is_absolute() {
            store_path
        } else {
            root.join(store_path)
        };

        let area_id = file
            .store
            .area_id
            .unwrap_or_else(|| DEFAULT_AREA_ID.to_string());
        if area_id.trim().is_empty() {
            return Err(ConfigError::Invalid("store.area_id must not be empty".to_string()));
        }

        let timeout_ms = file.http.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS);
        if timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "http.timeout_ms must be positive".to_string(),
            ));
        }

        let api_url = overrides
            .api_url
            .or(file.http.base_url)
            .map(|url| url.trim().to_string())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if backend == Backend::Http
            && !(api_url.starts_with("http://") || api_url.starts_with("https://"))
        {
            return Err(ConfigError::Invalid(format!(
                "http.base_url must start with http:// or https://, got '{}'",
                api_url
            )));
        }

        let actor = Actor {
            name: overrides.actor.or(file.actor.name),
            title: overrides.actor_title.or(file.actor.title),
        };

        Ok(Self {
            root: root.to_path_buf(),
            backend,
            store_path,
            area_id,
            api_url,
            timeout: Duration::from_millis(timeout_ms),
            actor,
            log_filter: file.logging.filter.filter(|filter| !filter.trim().is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{Backend, Config, ConfigError, Overrides, CONFIG_DIR};
    use crate::domain::Actor;
    use std::path::Path;
    use std::time::Duration;
    use uuid::Uuid;

    #[test]
    fn empty_file_yields_defaults() {
        let root = Path::new("/srv/yard");
        let config = Config::from_toml(root, "", Overrides::default()).expect("defaults load");
        assert_eq!(config.backend, Backend::Json);
        assert_eq!(config.store_path, root.join(CONFIG_DIR).join("matrix.json"));
        assert_eq!(config.area_id, "default");
        assert_eq!(config.timeout, Duration::from_millis(10_000));
        assert_eq!(config.actor, Actor::default());
        assert_eq!(config.log_filter, None);
    }

    #[test]
    fn file_values_and_overrides_merge() {
        let raw = r#"
[store]
backend = "sqlite"
area_id = "yard-2"

[http]
timeout_ms = 2500

[actor]
name = "Steve"
title = "Factory Manager"

[logging]
filter = "stockgrid=debug"
"#;
        let root = Path::new("/srv/yard");
        let config = Config::from_toml(
            root,
            raw,
            Overrides {
                actor_title: Some("Supervisor".to_string()),
                ..Overrides::default()
            },
        )
        .expect("config should load");
        assert_eq!(config.backend, Backend::Sqlite);
        assert_eq!(config.store_path, root.join(CONFIG_DIR).join("stock.sqlite"));
        assert_eq!(config.area_id, "yard-2");
        assert_eq!(config.timeout, Duration::from_millis(2500));
        assert_eq!(config.actor.label(), "Steve (Supervisor)");
        assert_eq!(config.log_filter.as_deref(), Some("stockgrid=debug"));

        let http = Config::from_toml(
            root,
            raw,
            Overrides {
                backend: Some(Backend::Http),
                api_url: Some("https://matrix.example.test/".to_string()),
                ..Overrides::default()
            },
        )
        .expect("http override should load");
        assert_eq!(http.backend, Backend::Http);
        assert_eq!(http.api_url, "https://matrix.example.test/");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = Config::from_toml(
            Path::new("."),
            "[store]\nbackend = \"json\"\ncolour = \"red\"\n",
            Overrides::default(),
        )
        .expect_err("unknown key should fail");
        assert!(matches!(err, ConfigError::Toml(_)));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let zero = Config::from_toml(
            Path::new("."),
            "[http]\ntimeout_ms = 0\n",
            Overrides::default(),
        )
        .expect_err("zero timeout should fail");
        assert!(zero.to_string().contains("timeout_ms"));

        let scheme = Config::from_toml(
            Path::new("."),
            "[store]\nbackend = \"http\"\n[http]\nbase_url = \"ftp://nope\"\n",
            Overrides::default(),
        )
        .expect_err("non-http url should fail");
        assert!(matches!(scheme, ConfigError::Invalid(_)));

        let backend = Config::from_toml(
            Path::new("."),
            "[store]\nbackend = \"redis\"\n",
            Overrides::default(),
        )
        .expect_err("unknown backend should fail");
        assert!(matches!(backend, ConfigError::Toml(_)));
    }

    #[test]
    fn load_tolerates_missing_default_but_not_missing_explicit_file() {
        let root = std::env::temp_dir().join(format!("stockgrid-config-{}", Uuid::now_v7()));
        std::fs::create_dir_all(root.join(CONFIG_DIR)).expect("root should be creatable");

        Config::load(&root, None, Overrides::default()).expect("missing default is fine");
        let missing = root.join("absent.toml");
        let err = Config::load(&root, Some(&missing), Overrides::default())
            .expect_err("missing explicit config should fail");
        assert!(matches!(err, ConfigError::Io { .. }));

        std::fs::write(
            root.join(CONFIG_DIR).join("config.toml"),
            "[store]\npath = \"data/m.json\"\n",
        )
        .expect("config should write");
        let config = Config::load(&root, None, Overrides::default()).expect("config loads");
        assert_eq!(config.store_path, root.join("data/m.json"));

        let _ = std::fs::remove_dir_all(root);
    }
}
