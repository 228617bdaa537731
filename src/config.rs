use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
};

use crate::store::{
    sources::{utf8_args, DEFAULT_ENV_PREFIX},
    ConfigSource, ConfigurationBuilder, ConfigurationStore,
};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub file: String,
    pub level: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: "logs/configview.log".to_string(),
            level: Some("info".to_string()),
        }
    }
}

/// Settings the service itself needs, read out of the merged store.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    pub fn from_store(store: &ConfigurationStore) -> Self {
        let mut config = AppConfig::default();

        if let Some(bind) = non_empty(store, "server:bind") {
            config.server.bind = bind.to_string();
        }

        if let Some(file) = non_empty(store, "logging:file") {
            config.logging.file = file.to_string();
        }

        if let Some(level) = non_empty(store, "logging:level") {
            config.logging.level = Some(level.to_string());
        }

        config
    }
}

fn non_empty<'a>(store: &'a ConfigurationStore, key: &str) -> Option<&'a str> {
    store
        .get(key)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Builds the store from the process environment: base file, environment
/// overlay file, prefixed variables, then command-line arguments.
pub fn load() -> anyhow::Result<ConfigurationStore> {
    let config_file = std::env::var_os("CONFIG_FILE").map(PathBuf::from);
    let environment = std::env::var("APP_ENVIRONMENT").ok();
    let args = utf8_args(std::env::args_os().skip(1))?;

    let store = layered_sources(
        config_file,
        environment.as_deref(),
        ConfigSource::environment(DEFAULT_ENV_PREFIX),
        args,
    )
    .build()?;

    Ok(store)
}

/// An explicit `config_file` must exist; without one the default candidates
/// are tried and may all be absent.
fn layered_sources(
    config_file: Option<PathBuf>,
    environment: Option<&str>,
    env_vars: ConfigSource,
    args: Vec<String>,
) -> ConfigurationBuilder {
    let mut builder = ConfigurationStore::builder();

    let base = match config_file {
        Some(path) => Some((path, false)),
        None => locate_default_config().map(|path| (path, true)),
    };

    if let Some((path, optional)) = base {
        let overlay = environment
            .map(str::trim)
            .filter(|env| !env.is_empty())
            .map(|env| overlay_path(&path, env));
        builder = builder.add_source(ConfigSource::File { path, optional });
        if let Some(overlay) = overlay {
            builder = builder.add_source(ConfigSource::optional_file(overlay));
        }
    }

    builder
        .add_source(env_vars)
        .add_source(ConfigSource::command_line(args))
}

/// `config/config.yaml` + `staging` -> `config/config.staging.yaml`.
fn overlay_path(base: &Path, environment: &str) -> PathBuf {
    let stem = base
        .file_stem()
        .and_then(OsStr::to_str)
        .unwrap_or("config");
    let file_name = match base.extension().and_then(OsStr::to_str) {
        Some(ext) => format!("{stem}.{environment}.{ext}"),
        None => format!("{stem}.{environment}"),
    };
    base.with_file_name(file_name)
}

fn locate_default_config() -> Option<PathBuf> {
    let candidates = [
        PathBuf::from("config/config.yaml"),
        PathBuf::from("../config/config.yaml"),
        PathBuf::from("config/config.json"),
    ];

    candidates.into_iter().find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ConfigError,
        store::sources::environment_pairs,
    };
    use std::fs;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("configview-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn env_vars(items: &[(&str, &str)]) -> ConfigSource {
        let vars = items.iter().map(|(k, v)| (k.to_string(), v.to_string()));
        ConfigSource::memory(environment_pairs(DEFAULT_ENV_PREFIX, vars))
    }

    fn entries(store: &ConfigurationStore) -> Vec<(&str, &str)> {
        store
            .iter()
            .map(|pair| (pair.key.as_str(), pair.value.as_str()))
            .collect()
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let dir = scratch_dir();
        let base = dir.join("config.yaml");
        fs::write(&base, "a: base\nb: base\nc: base\nd: base\n").unwrap();
        fs::write(dir.join("config.staging.yaml"), "b: overlay\nc: overlay\nd: overlay\n").unwrap();

        let store = layered_sources(
            Some(base),
            Some("staging"),
            env_vars(&[("CONFIGVIEW_C", "env"), ("CONFIGVIEW_D", "env"), ("OTHER", "x")]),
            vec!["--d=cli".to_string()],
        )
        .build();
        let _ = fs::remove_dir_all(&dir);
        let store = store.unwrap();

        assert_eq!(
            entries(&store),
            vec![("a", "base"), ("b", "overlay"), ("c", "env"), ("d", "cli")]
        );
    }

    #[test]
    fn missing_overlay_and_blank_environment_are_ignored() {
        let dir = scratch_dir();
        let base = dir.join("config.json");
        fs::write(&base, r#"{"Logging": {"Level": "Debug"}}"#).unwrap();

        let with_missing_overlay = layered_sources(
            Some(base.clone()),
            Some("prod"),
            env_vars(&[]),
            Vec::new(),
        )
        .build();
        let with_blank_env =
            layered_sources(Some(base), Some("  "), env_vars(&[]), Vec::new()).build();
        let _ = fs::remove_dir_all(&dir);

        for store in [with_missing_overlay.unwrap(), with_blank_env.unwrap()] {
            assert_eq!(entries(&store), vec![("Logging:Level", "Debug")]);
        }
    }

    #[test]
    fn explicit_config_file_must_exist() {
        let missing = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));

        let result = layered_sources(Some(missing.clone()), None, env_vars(&[]), Vec::new()).build();

        assert!(matches!(result, Err(ConfigError::FileNotFound(path)) if path == missing));
    }

    #[test]
    fn malformed_argument_fails_the_build() {
        let dir = scratch_dir();
        let base = dir.join("config.yaml");
        fs::write(&base, "a: 1\n").unwrap();

        let result = layered_sources(Some(base), None, env_vars(&[]), vec!["--dangling".to_string()])
            .build();
        let _ = fs::remove_dir_all(&dir);

        assert!(matches!(result, Err(ConfigError::InvalidArgument(_))));
    }

    #[test]
    fn defaults_apply_to_empty_store() {
        let config = AppConfig::from_store(&ConfigurationStore::new());

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.logging.file, "logs/configview.log");
        assert_eq!(config.logging.level.as_deref(), Some("info"));
    }

    #[test]
    fn reads_settings_case_insensitively() {
        let store: ConfigurationStore = [
            ("Server:Bind", "0.0.0.0:9000"),
            ("LOGGING:LEVEL", "debug"),
            ("logging:file", "/var/log/configview.log"),
        ]
        .into_iter()
        .collect();

        let config = AppConfig::from_store(&store);

        assert_eq!(config.server.bind, "0.0.0.0:9000");
        assert_eq!(config.logging.level.as_deref(), Some("debug"));
        assert_eq!(config.logging.file, "/var/log/configview.log");
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let store: ConfigurationStore = [("server:bind", "  "), ("logging:level", "")]
            .into_iter()
            .collect();

        let config = AppConfig::from_store(&store);

        assert_eq!(config.server.bind, "127.0.0.1:8080");
        assert_eq!(config.logging.level.as_deref(), Some("info"));
    }

    #[test]
    fn overlay_sits_next_to_base_file() {
        assert_eq!(
            overlay_path(Path::new("config/config.yaml"), "staging"),
            PathBuf::from("config/config.staging.yaml")
        );
        assert_eq!(
            overlay_path(Path::new("/etc/app/settings.json"), "prod"),
            PathBuf::from("/etc/app/settings.prod.json")
        );
    }
}
