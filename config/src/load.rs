use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use rust_cli_config::builder::{ConfigBuilder, DefaultState};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::environment::Environment;

/// Environment variable naming the configuration directory. Defaults to `./configuration`.
const CONFIG_DIR_ENV_NAME: &str = "APP_CONFIG_DIR";

/// Directory name used when [`CONFIG_DIR_ENV_NAME`] is unset.
const DEFAULT_CONFIG_DIR: &str = "configuration";

/// Extensions tried for each layer, in order.
const CONFIG_FILE_EXTENSIONS: &[&str] = &["yaml", "yml", "json"];

/// Prefix of override variables, e.g. `APP_WAREHOUSE__HOST`.
const ENV_PREFIX: &str = "APP";
const ENV_PREFIX_SEPARATOR: &str = "_";
const ENV_KEY_SEPARATOR: &str = "__";
const LIST_SEPARATOR: &str = ",";

/// Implemented by configuration roots loaded through [`load_config`].
pub trait Config {
    /// Keys whose environment overrides are comma-separated lists.
    const LIST_PARSE_KEYS: &'static [&'static str];
}

/// One configuration file in the layering order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLayer {
    Base,
    Environment(Environment),
}

impl ConfigLayer {
    fn file_stem(self) -> &'static str {
        match self {
            ConfigLayer::Base => "base",
            ConfigLayer::Environment(environment) => environment.as_str(),
        }
    }
}

impl fmt::Display for ConfigLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigLayer::Base => f.write_str("base configuration"),
            ConfigLayer::Environment(environment) => {
                write!(f, "{environment} environment configuration")
            }
        }
    }
}

/// Errors raised while locating, parsing or deserializing configuration.
#[derive(Debug, Error)]
pub enum LoadConfigError {
    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] io::Error),

    #[error("configuration directory `{}` does not exist", .0.display())]
    DirectoryMissing(PathBuf),

    #[error("could not locate {layer} in `{}`; attempted: {}", directory.display(), display_paths(attempted))]
    FileMissing {
        layer: ConfigLayer,
        directory: PathBuf,
        attempted: Vec<PathBuf>,
    },

    #[error("failed to load {layer} from `{}`: {source}", path.display())]
    FileInvalid {
        layer: ConfigLayer,
        path: PathBuf,
        source: rust_cli_config::ConfigError,
    },

    #[error("failed to build configuration: {0}")]
    Build(#[source] rust_cli_config::ConfigError),

    #[error("failed to deserialize configuration: {0}")]
    Deserialization(#[source] rust_cli_config::ConfigError),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|path| format!("`{}`", path.display()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Resolves the configuration directory from `APP_CONFIG_DIR`, relative paths being taken from
/// the current directory.
pub fn configuration_directory() -> Result<PathBuf, LoadConfigError> {
    let current_dir = std::env::current_dir().map_err(LoadConfigError::CurrentDir)?;

    Ok(match std::env::var_os(CONFIG_DIR_ENV_NAME) {
        Some(dir) => current_dir.join(dir),
        None => current_dir.join(DEFAULT_CONFIG_DIR),
    })
}

/// Loads `T` from the configuration directory for the current environment.
///
/// The base file is overlaid by the environment file (`dev` or `prod`), and both by
/// `APP_`-prefixed variables. Nested keys use double underscores (`APP_WAREHOUSE__HOST`) and
/// keys listed in [`Config::LIST_PARSE_KEYS`] take comma-separated values.
pub fn load_config<T>() -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    let directory = configuration_directory()?;
    let environment = Environment::load()?;

    load_config_from_dir(&directory, environment)
}

/// Loads `T` from `directory` for an explicit environment.
pub fn load_config_from_dir<T>(
    directory: &Path,
    environment: Environment,
) -> Result<T, LoadConfigError>
where
    T: Config + DeserializeOwned,
{
    if !directory.is_dir() {
        return Err(LoadConfigError::DirectoryMissing(directory.to_path_buf()));
    }

    let mut builder = rust_cli_config::Config::builder();
    for layer in [ConfigLayer::Base, ConfigLayer::Environment(environment)] {
        let path = find_layer_file(directory, layer)?;
        builder = add_layer(builder, layer, path)?;
    }

    builder
        .add_source(environment_overrides::<T>())
        .build()
        .map_err(LoadConfigError::Build)?
        .try_deserialize::<T>()
        .map_err(LoadConfigError::Deserialization)
}

fn environment_overrides<T: Config>() -> rust_cli_config::Environment {
    let source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_KEY_SEPARATOR);

    if T::LIST_PARSE_KEYS.is_empty() {
        return source;
    }

    T::LIST_PARSE_KEYS.iter().fold(
        source.try_parsing(true).list_separator(LIST_SEPARATOR),
        |source, key| source.with_list_parse_key(key),
    )
}

fn find_layer_file(directory: &Path, layer: ConfigLayer) -> Result<PathBuf, LoadConfigError> {
    let attempted = CONFIG_FILE_EXTENSIONS
        .iter()
        .map(|extension| directory.join(format!("{}.{extension}", layer.file_stem())))
        .collect::<Vec<_>>();

    match attempted.iter().find(|path| path.is_file()) {
        Some(path) => Ok(path.clone()),
        None => Err(LoadConfigError::FileMissing {
            layer,
            directory: directory.to_path_buf(),
            attempted,
        }),
    }
}

/// Adds `path` on top of `builder`, building once so a broken file is reported by name.
fn add_layer(
    builder: ConfigBuilder<DefaultState>,
    layer: ConfigLayer,
    path: PathBuf,
) -> Result<ConfigBuilder<DefaultState>, LoadConfigError> {
    let builder = builder.add_source(rust_cli_config::File::from(path.as_path()));

    match builder.clone().build() {
        Ok(_) => Ok(builder),
        Err(source) => Err(LoadConfigError::FileInvalid {
            layer,
            path,
            source,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        port: u16,
        #[serde(default)]
        tables: Vec<String>,
    }

    impl Config for Sample {
        const LIST_PARSE_KEYS: &'static [&'static str] = &["tables"];
    }

    fn scratch_dir(label: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "warehouse-loader-config-{label}-{}",
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn environment_file_overrides_base_file() {
        let dir = scratch_dir("layering");
        std::fs::write(
            dir.join("base.yaml"),
            "name: base\nport: 5432\ntables: [dim_date]\n",
        )
        .unwrap();
        std::fs::write(dir.join("prod.json"), r#"{"name": "prod"}"#).unwrap();

        let sample: Sample = load_config_from_dir(&dir, Environment::Prod).unwrap();

        assert_eq!(sample.name, "prod");
        assert_eq!(sample.port, 5432);
        assert_eq!(sample.tables, vec!["dim_date".to_owned()]);
    }

    #[test]
    fn missing_environment_file_lists_attempted_paths() {
        let dir = scratch_dir("missing");
        std::fs::write(dir.join("base.yaml"), "name: base\nport: 1\n").unwrap();

        let err = load_config_from_dir::<Sample>(&dir, Environment::Dev).unwrap_err();

        let LoadConfigError::FileMissing {
            layer, attempted, ..
        } = &err
        else {
            panic!("expected a missing file error, got {err}");
        };
        assert_eq!(*layer, ConfigLayer::Environment(Environment::Dev));
        assert_eq!(attempted.len(), CONFIG_FILE_EXTENSIONS.len());
        assert!(err.to_string().contains("dev environment configuration"));
        assert!(err.to_string().contains("dev.yml"));
    }

    #[test]
    fn unparsable_layer_is_reported_by_name() {
        let dir = scratch_dir("invalid");
        std::fs::write(dir.join("base.yaml"), "name: base\nport: 1\n").unwrap();
        std::fs::write(dir.join("dev.json"), "{ not json").unwrap();

        let err = load_config_from_dir::<Sample>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(
            err,
            LoadConfigError::FileInvalid {
                layer: ConfigLayer::Environment(Environment::Dev),
                ..
            }
        ));
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = std::env::temp_dir().join("warehouse-loader-config-does-not-exist");
        let err = load_config_from_dir::<Sample>(&dir, Environment::Dev).unwrap_err();

        assert!(matches!(err, LoadConfigError::DirectoryMissing(_)));
    }
}
