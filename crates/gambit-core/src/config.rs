// Configuration loading and parsing (gambit.toml).

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

use crate::economy::ProfileDefaults;

/// Compiled-in copy of `defaults/gambit.toml`.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../defaults/gambit.toml");

const CONFIG_FILE_NAME: &str = "gambit.toml";
const DATABASE_FILE_NAME: &str = "gambit.db";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// gambit.toml structs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub profile: ProfileConfig,
    pub economy: EconomyConfig,
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileConfig {
    pub username: String,
    pub starting_balance: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EconomyConfig {
    #[serde(default = "default_quicksell_rate")]
    pub quicksell_rate: f64,
    #[serde(default = "default_coins_per_value_unit")]
    pub coins_per_value_unit: u64,
    #[serde(default = "default_refund_duplicates")]
    pub refund_duplicates: bool,
}

fn default_quicksell_rate() -> f64 {
    0.8
}

fn default_coins_per_value_unit() -> u64 {
    100
}

fn default_refund_duplicates() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogSourceKind {
    Static,
    Csv,
    Remote,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub source: CatalogSourceKind,
    #[serde(default = "default_catalog_count")]
    pub count: usize,
    #[serde(default = "default_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub api_base: String,
    #[serde(default)]
    pub csv_path: Option<String>,
}

fn default_catalog_count() -> usize {
    100
}

fn default_cache_ttl_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    10
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    pub path: Option<String>,
}

/// Largest ranking page the remote source serves.
pub const MAX_CATALOG_COUNT: usize = 200;

impl Config {
    /// The compiled-in defaults, for when no config directory is available.
    pub fn builtin() -> Result<Config, ConfigError> {
        parse(DEFAULT_CONFIG_TOML, Path::new(CONFIG_FILE_NAME))
    }

    pub fn profile_defaults(&self) -> ProfileDefaults {
        ProfileDefaults {
            username: self.profile.username.trim().to_string(),
            starting_balance: self.profile.starting_balance,
        }
    }

    /// Database location: `[storage] path` if set, otherwise the platform
    /// data directory.
    pub fn database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.storage.path {
            return Ok(PathBuf::from(path));
        }
        let dirs = ProjectDirs::from("org", "gambit", "gambit").ok_or_else(|| {
            ConfigError::ValidationError {
                field: "storage.path".into(),
                message: "no platform data directory; set a path explicitly".into(),
            }
        })?;
        Ok(dirs.data_dir().join(DATABASE_FILE_NAME))
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Load and validate `config/gambit.toml` relative to `base_dir`.
///
/// Does not copy defaults; `load_config()` does that first.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join(CONFIG_FILE_NAME);
    let text = read_file(&path)?;
    parse(&text, &path)
}

/// Copy `defaults/gambit.toml` to `config/gambit.toml` unless the latter
/// already exists. Returns the path written, if any.
pub fn ensure_config_file(base_dir: &Path) -> Result<Option<PathBuf>, ConfigError> {
    let target = base_dir.join("config").join(CONFIG_FILE_NAME);
    if target.exists() {
        return Ok(None);
    }
    let source = base_dir.join("defaults").join(CONFIG_FILE_NAME);
    if !source.exists() {
        return Err(ConfigError::DefaultsCopyError {
            message: format!(
                "no config/{name} or defaults/{name} in {}",
                base_dir.display(),
                name = CONFIG_FILE_NAME
            ),
        });
    }
    if let Some(dir) = target.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to create {}: {e}", dir.display()),
        })?;
    }
    std::fs::copy(&source, &target).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to copy {}: {e}", source.display()),
    })?;
    Ok(Some(target))
}

/// Load config relative to `base_dir`, copying defaults first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    if let Some(path) = ensure_config_file(base_dir)? {
        info!("Copied default config to {}", path.display());
    }
    load_config_from(base_dir)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn parse(text: &str, path: &Path) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    validate(&config)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.into(),
        message: message.into(),
    }
}

fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.profile.username.trim().is_empty() {
        return Err(invalid("profile.username", "must not be blank"));
    }

    let rate = config.economy.quicksell_rate;
    if !(0.0..=1.0).contains(&rate) {
        return Err(invalid(
            "economy.quicksell_rate",
            format!("must be between 0.0 and 1.0 inclusive, got {rate}"),
        ));
    }
    if config.economy.coins_per_value_unit == 0 {
        return Err(invalid("economy.coins_per_value_unit", "must be greater than 0"));
    }

    let catalog = &config.catalog;
    if catalog.count == 0 || catalog.count > MAX_CATALOG_COUNT {
        return Err(invalid(
            "catalog.count",
            format!("must be between 1 and {MAX_CATALOG_COUNT}, got {}", catalog.count),
        ));
    }
    if catalog.request_timeout_secs == 0 {
        return Err(invalid("catalog.request_timeout_secs", "must be greater than 0"));
    }
    match catalog.source {
        CatalogSourceKind::Remote if catalog.api_base.trim().is_empty() => {
            return Err(invalid("catalog.api_base", "required when source = \"remote\""));
        }
        CatalogSourceKind::Csv
            if catalog.csv_path.as_deref().map_or(true, |p| p.trim().is_empty()) =>
        {
            return Err(invalid("catalog.csv_path", "required when source = \"csv\""));
        }
        _ => {}
    }

    if let Some(path) = &config.storage.path {
        if path.trim().is_empty() {
            return Err(invalid("storage.path", "must not be blank when set"));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    /// Helper: returns the gambit-core crate root (works whether `cargo test`
    /// runs from the crate root or the workspace root).
    fn project_root() -> PathBuf {
        let cwd = std::env::current_dir().unwrap();
        if cwd.join("defaults").exists() {
            cwd
        } else if cwd.join("crates/gambit-core/defaults").exists() {
            cwd.join("crates/gambit-core")
        } else {
            panic!("Cannot locate defaults/ directory from CWD {:?}", cwd);
        }
    }

    /// Write `body` as config/gambit.toml under a fresh temp dir.
    fn write_config(name: &str, body: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("config/gambit.toml"), body).unwrap();
        tmp
    }

    fn with_replaced(from: &str, to: &str) -> String {
        assert!(DEFAULT_CONFIG_TOML.contains(from), "defaults lack {from:?}");
        DEFAULT_CONFIG_TOML.replacen(from, to, 1)
    }

    fn expect_field(err: ConfigError, expected: &str) {
        match err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, expected),
            other => panic!("expected ValidationError, got: {other}"),
        }
    }

    #[test]
    fn builtin_defaults_are_valid() {
        let config = Config::builtin().expect("defaults should parse");
        assert_eq!(config.profile.username, "Guest Player");
        assert_eq!(config.profile.starting_balance, 2500);
        assert!((config.economy.quicksell_rate - 0.8).abs() < 1e-9);
        assert_eq!(config.economy.coins_per_value_unit, 100);
        assert!(config.economy.refund_duplicates);
        assert_eq!(config.catalog.source, CatalogSourceKind::Remote);
        assert_eq!(config.catalog.cache_ttl_secs, 3600);
        assert!(config.storage.path.is_none());
    }

    #[test]
    fn load_valid_config_from_project_files() {
        let root = project_root();
        let tmp = std::env::temp_dir().join("gambit_config_project_files");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::copy(
            root.join("defaults/gambit.toml"),
            tmp.join("defaults/gambit.toml"),
        )
        .unwrap();

        let config = load_config(&tmp).expect("should load valid config");
        assert_eq!(config.profile_defaults(), ProfileDefaults::default());
        assert!(tmp.join("config/gambit.toml").exists());

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn economy_section_defaults_when_keys_omitted() {
        let tmp = write_config(
            "gambit_config_economy_defaults",
            r#"
[profile]
username = "Tal"
starting_balance = 10

[economy]

[catalog]
source = "static"
"#,
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.economy.coins_per_value_unit, 100);
        assert_eq!(config.catalog.count, 100);
        assert_eq!(config.catalog.request_timeout_secs, 10);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_blank_username() {
        let tmp = write_config(
            "gambit_config_blank_user",
            &with_replaced("username = \"Guest Player\"", "username = \"  \""),
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "profile.username");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_quicksell_rate_out_of_range() {
        let tmp = write_config(
            "gambit_config_rate",
            &with_replaced("quicksell_rate = 0.8", "quicksell_rate = 1.5"),
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "economy.quicksell_rate");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_coins_per_value_unit() {
        let tmp = write_config(
            "gambit_config_cpu",
            &with_replaced("coins_per_value_unit = 100", "coins_per_value_unit = 0"),
        );
        expect_field(
            load_config_from(&tmp).unwrap_err(),
            "economy.coins_per_value_unit",
        );
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_catalog_count_out_of_range() {
        let tmp = write_config(
            "gambit_config_count",
            &with_replaced("count = 100", "count = 0"),
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "catalog.count");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn csv_source_requires_path() {
        let tmp = write_config(
            "gambit_config_csv",
            &with_replaced("source = \"remote\"", "source = \"csv\""),
        );
        expect_field(load_config_from(&tmp).unwrap_err(), "catalog.csv_path");
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn unknown_source_is_parse_error() {
        let tmp = write_config(
            "gambit_config_bad_source",
            &with_replaced("source = \"remote\"", "source = \"carrier-pigeon\""),
        );
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::ParseError { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn explicit_storage_path_wins() {
        let tmp = write_config(
            "gambit_config_storage",
            &with_replaced("# path = \"gambit.db\"", "path = \"/tmp/g.db\""),
        );
        let config = load_config_from(&tmp).unwrap();
        assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/g.db"));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("gambit_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();
        assert!(matches!(
            load_config_from(&tmp).unwrap_err(),
            ConfigError::FileNotFound { .. }
        ));
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_copies_defaults_once() {
        let tmp = std::env::temp_dir().join("gambit_config_ensure_copies");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::write(tmp.join("defaults/gambit.toml"), DEFAULT_CONFIG_TOML).unwrap();

        let copied = ensure_config_file(&tmp).unwrap();
        assert_eq!(copied, Some(tmp.join("config/gambit.toml")));
        assert_eq!(load_config_from(&tmp).unwrap().catalog.count, 100);

        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_keeps_edited_copy() {
        let tmp = std::env::temp_dir().join("gambit_config_ensure_skips");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(tmp.join("defaults")).unwrap();
        fs::create_dir_all(tmp.join("config")).unwrap();
        fs::write(tmp.join("defaults/gambit.toml"), DEFAULT_CONFIG_TOML).unwrap();
        fs::write(tmp.join("config/gambit.toml"), "# custom\n").unwrap();

        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        let content = fs::read_to_string(tmp.join("config/gambit.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_works_without_defaults_dir() {
        let tmp = write_config("gambit_config_no_defaults", DEFAULT_CONFIG_TOML);
        assert_eq!(ensure_config_file(&tmp).unwrap(), None);
        assert!(load_config(&tmp).is_ok());
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn ensure_config_file_errors_when_nothing_to_copy() {
        let tmp = std::env::temp_dir().join("gambit_config_both_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        match ensure_config_file(&tmp).unwrap_err() {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("defaults/gambit.toml"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&tmp);
    }
}
