use std::{
    ffi::OsString,
    fmt, fs,
    path::{Path, PathBuf},
};

use super::document::{flatten_document, parse_json, parse_yaml};
use crate::error::ConfigError;

pub const DEFAULT_ENV_PREFIX: &str = "CONFIGVIEW_";

/// One origin of configuration entries.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    /// A YAML or JSON document, picked by file extension.
    File { path: PathBuf, optional: bool },
    /// Process environment variables starting with `prefix`; `__` maps to `:`.
    Environment { prefix: String },
    /// `--key=value`, `--key value`, `/key=value`, `/key value` or `key=value`.
    CommandLine { args: Vec<String> },
    Memory { pairs: Vec<(String, String)> },
}

impl ConfigSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            optional: false,
        }
    }

    pub fn optional_file(path: impl Into<PathBuf>) -> Self {
        Self::File {
            path: path.into(),
            optional: true,
        }
    }

    pub fn environment(prefix: impl Into<String>) -> Self {
        Self::Environment {
            prefix: prefix.into(),
        }
    }

    pub fn command_line<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::CommandLine {
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    pub fn memory<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Memory {
            pairs: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn load(&self) -> Result<Vec<(String, String)>, ConfigError> {
        match self {
            ConfigSource::File { path, optional } => load_file(path, *optional),
            ConfigSource::Environment { prefix } => {
                let vars = std::env::vars_os()
                    .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)));
                Ok(environment_pairs(prefix, vars))
            }
            ConfigSource::CommandLine { args } => parse_command_line(args),
            ConfigSource::Memory { pairs } => Ok(pairs.clone()),
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::File { path, .. } => write!(f, "file:{}", path.display()),
            ConfigSource::Environment { prefix } => write!(f, "environment:{prefix}"),
            ConfigSource::CommandLine { .. } => f.write_str("command-line"),
            ConfigSource::Memory { .. } => f.write_str("memory"),
        }
    }
}

fn load_file(path: &Path, optional: bool) -> Result<Vec<(String, String)>, ConfigError> {
    if !path.exists() {
        if optional {
            return Ok(Vec::new());
        }
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase());
    let document = match extension.as_deref() {
        Some("yaml" | "yml") => parse_yaml(&contents).map_err(|source| ConfigError::Yaml {
            path: path.to_path_buf(),
            source,
        })?,
        Some("json") => parse_json(&contents).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?,
        _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
    };

    flatten_document(&document)
}

pub fn environment_pairs<I>(prefix: &str, vars: I) -> Vec<(String, String)>
where
    I: IntoIterator<Item = (String, String)>,
{
    vars.into_iter()
        .filter_map(|(name, value)| {
            let head = name.get(..prefix.len())?;
            if !head.eq_ignore_ascii_case(prefix) {
                return None;
            }
            let key = name[prefix.len()..].replace("__", ":");
            if key.is_empty() {
                return None;
            }
            Some((key, value))
        })
        .collect()
}

pub fn parse_command_line(args: &[String]) -> Result<Vec<(String, String)>, ConfigError> {
    let mut pairs = Vec::new();
    let mut iter = args.iter();

    while let Some(arg) = iter.next() {
        let (body, switch) = if let Some(rest) = arg.strip_prefix("--") {
            (rest, true)
        } else if let Some(rest) = arg.strip_prefix('/') {
            (rest, true)
        } else {
            (arg.as_str(), false)
        };

        match body.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                pairs.push((key.to_string(), value.to_string()));
            }
            None if switch && !body.is_empty() => {
                let value = iter
                    .next()
                    .ok_or_else(|| ConfigError::InvalidArgument(arg.clone()))?;
                pairs.push((body.to_string(), value.clone()));
            }
            _ => return Err(ConfigError::InvalidArgument(arg.clone())),
        }
    }

    Ok(pairs)
}

/// Converts raw process arguments, rejecting any that are not valid UTF-8.
pub fn utf8_args<I>(args: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = OsString>,
{
    args.into_iter()
        .map(|arg| {
            arg.into_string()
                .map_err(|raw| ConfigError::InvalidArgument(raw.to_string_lossy().into_owned()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn environment_prefix_is_stripped_and_case_insensitive() {
        let vars = pairs(&[
            ("CONFIGVIEW_LOGGING__LEVEL", "debug"),
            ("configview_server__bind", "0.0.0.0:9000"),
            ("PATH", "/usr/bin"),
            ("CONFIGVIEW_", "ignored"),
        ]);

        assert_eq!(
            environment_pairs(DEFAULT_ENV_PREFIX, vars),
            pairs(&[("LOGGING:LEVEL", "debug"), ("server:bind", "0.0.0.0:9000")])
        );
    }

    #[test]
    fn empty_prefix_takes_every_variable() {
        let vars = pairs(&[("HOME", "/root"), ("A__B", "c")]);
        assert_eq!(
            environment_pairs("", vars),
            pairs(&[("HOME", "/root"), ("A:B", "c")])
        );
    }

    #[test]
    fn parses_command_line_forms() {
        let parsed = parse_command_line(&args(&[
            "--logging:level=debug",
            "--server:bind",
            "0.0.0.0:7000",
            "/name=demo",
            "/zone",
            "b",
            "region=eu",
            "--flag=",
        ]))
        .unwrap();

        assert_eq!(
            parsed,
            pairs(&[
                ("logging:level", "debug"),
                ("server:bind", "0.0.0.0:7000"),
                ("name", "demo"),
                ("zone", "b"),
                ("region", "eu"),
                ("flag", ""),
            ])
        );
    }

    #[test]
    fn rejects_malformed_command_line() {
        assert!(matches!(
            parse_command_line(&args(&["--dangling"])),
            Err(ConfigError::InvalidArgument(arg)) if arg == "--dangling"
        ));
        assert!(matches!(
            parse_command_line(&args(&["/dangling"])),
            Err(ConfigError::InvalidArgument(arg)) if arg == "/dangling"
        ));
        assert!(matches!(
            parse_command_line(&args(&["bare"])),
            Err(ConfigError::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_command_line(&args(&["--=value"])),
            Err(ConfigError::InvalidArgument(_))
        ));
    }

    #[test]
    fn environment_source_reads_process_variables() {
        let prefix = format!("CV{}_", uuid::Uuid::new_v4().simple()).to_uppercase();
        let name = format!("{prefix}Logging__Level");
        std::env::set_var(&name, "Trace");

        let loaded = ConfigSource::environment(&prefix).load();
        std::env::remove_var(&name);

        assert_eq!(loaded.unwrap(), pairs(&[("Logging:Level", "Trace")]));
    }

    #[test]
    fn utf8_args_pass_through() {
        let converted = utf8_args(["--a=1", "b=2"].map(OsString::from)).unwrap();
        assert_eq!(converted, args(&["--a=1", "b=2"]));
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_argument_is_rejected() {
        use std::os::unix::ffi::OsStringExt;

        let raw = OsString::from_vec(b"--name=caf\xff".to_vec());
        assert!(matches!(
            utf8_args([OsString::from("--ok=1"), raw]),
            Err(ConfigError::InvalidArgument(arg)) if arg.starts_with("--name=caf")
        ));
    }

    #[test]
    fn missing_optional_file_is_empty() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        let source = ConfigSource::optional_file(&path);
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn missing_required_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("{}.yaml", uuid::Uuid::new_v4()));
        let source = ConfigSource::file(&path);
        assert!(matches!(source.load(), Err(ConfigError::FileNotFound(p)) if p == path));
    }

    #[test]
    fn loads_yaml_file_from_disk() {
        let path = std::env::temp_dir().join(format!("{}.yml", uuid::Uuid::new_v4()));
        fs::write(&path, "Logging:\n  Level: Debug\n").unwrap();

        let loaded = ConfigSource::file(&path).load();
        let _ = fs::remove_file(&path);

        assert_eq!(loaded.unwrap(), pairs(&[("Logging:Level", "Debug")]));
    }

    #[test]
    fn unsupported_extension_is_an_error() {
        let path = std::env::temp_dir().join(format!("{}.toml", uuid::Uuid::new_v4()));
        fs::write(&path, "a = 1\n").unwrap();

        let loaded = ConfigSource::file(&path).load();
        let _ = fs::remove_file(&path);

        assert!(matches!(loaded, Err(ConfigError::UnsupportedFormat(_))));
    }

    #[test]
    fn displays_source_origin() {
        assert_eq!(ConfigSource::environment("APP_").to_string(), "environment:APP_");
        assert_eq!(ConfigSource::command_line(["a=b"]).to_string(), "command-line");
    }
}
