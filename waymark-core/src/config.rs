//! `waymark.conf` loading and the immutable [`Settings`] value.
//!
//! The config file is line-oriented `KEY=VALUE`. Surrounding quotes are
//! stripped from values and blank lines are skipped; there is no comment
//! syntax and no nesting.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::registry::Registry;
use crate::types::MigrationId;
use crate::vcs;

pub const CONFIG_FILE: &str = "waymark.conf";
pub const DEFAULT_MIGRATIONS_DIR: &str = "migrations";
pub const DEFAULT_ENVIRONMENT: &str = "dev";

/// Parse `KEY=VALUE` text. `path` is only used for error messages.
pub fn parse_config_str(path: &Path, contents: &str) -> Result<BTreeMap<String, String>, ConfigError> {
    let mut vars = BTreeMap::new();
    for (idx, line) in contents.lines().enumerate() {
        let line_no = idx + 1;
        if line.trim().is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(ConfigError::Malformed {
                path: path.to_path_buf(),
                line_no,
            });
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::EmptyKey {
                path: path.to_path_buf(),
                line_no,
            });
        }
        vars.insert(key.to_string(), strip_quotes(value.trim()).to_string());
    }
    Ok(vars)
}

/// Load a config file. A missing file is an empty map.
pub fn load_config(path: &Path) -> Result<BTreeMap<String, String>, ConfigError> {
    if !path.is_file() {
        tracing::info!(path = %path.display(), "config file not found, moving on");
        return Ok(BTreeMap::new());
    }
    tracing::debug!(path = %path.display(), "loading config file");
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config_str(path, &contents)
}

fn strip_quotes(value: &str) -> &str {
    for quote in ['\'', '"'] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}

/// Resolved configuration, built once at startup and then only read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    project_dir: PathBuf,
    migrations_dir: PathBuf,
    environment: String,
    vars: BTreeMap<String, String>,
}

impl Settings {
    /// Read `<project_dir>/waymark.conf` and resolve the migrations root.
    pub fn load(project_dir: &Path, environment: impl Into<String>) -> Result<Self, ConfigError> {
        let project_dir = project_dir
            .canonicalize()
            .map_err(|source| ConfigError::Io {
                path: project_dir.to_path_buf(),
                source,
            })?;
        let vars = load_config(&project_dir.join(CONFIG_FILE))?;
        Ok(Self::from_parts(project_dir, environment, vars))
    }

    /// Build settings from already-known parts.
    ///
    /// `MIGRATIONS_DIR` in `vars` is resolved against `project_dir` when
    /// relative; it defaults to `<project_dir>/migrations`.
    pub fn from_parts(
        project_dir: impl Into<PathBuf>,
        environment: impl Into<String>,
        vars: BTreeMap<String, String>,
    ) -> Self {
        let project_dir = project_dir.into();
        let migrations_dir = match vars.get("MIGRATIONS_DIR") {
            Some(dir) if !dir.is_empty() => project_dir.join(dir),
            _ => project_dir.join(DEFAULT_MIGRATIONS_DIR),
        };
        Self {
            project_dir,
            migrations_dir,
            environment: environment.into(),
            vars,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn migrations_dir(&self) -> &Path {
        &self.migrations_dir
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn vars(&self) -> &BTreeMap<String, String> {
        &self.vars
    }

    pub fn registry(&self) -> Registry {
        Registry::at(&self.migrations_dir)
    }

    pub fn migration_dir(&self, id: &MigrationId) -> PathBuf {
        self.migrations_dir.join(id.as_str())
    }

    /// `TEMPLATES_DIR` resolved against the project directory, if set.
    pub fn templates_dir(&self) -> Option<PathBuf> {
        self.vars
            .get("TEMPLATES_DIR")
            .filter(|dir| !dir.is_empty())
            .map(|dir| self.project_dir.join(dir))
    }

    /// Branch or release tag recorded with registry writes.
    pub fn branch(&self) -> String {
        vcs::current_branch(&self.migrations_dir)
    }

    /// Variables added on top of the inherited environment of a migration
    /// script: every config pair, then the well-known keys.
    pub fn child_env(&self, id: &MigrationId) -> Vec<(String, String)> {
        let mut env: Vec<(String, String)> = self
            .vars
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.push((
            "PROJECT_DIR".to_string(),
            self.project_dir.display().to_string(),
        ));
        env.push((
            "MIGRATIONS_DIR".to_string(),
            self.migrations_dir.display().to_string(),
        ));
        env.push(("ENVIRONMENT".to_string(), self.environment.clone()));
        env.push(("MIGRATION_ID".to_string(), id.to_string()));
        env
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn p() -> PathBuf {
        PathBuf::from("waymark.conf")
    }

    #[test]
    fn parses_pairs_and_strips_quotes() {
        let vars = parse_config_str(&p(), "A=1\nB='two'\n\nC=\"three\"\nD=x=y\n").unwrap();
        assert_eq!(vars["A"], "1");
        assert_eq!(vars["B"], "two");
        assert_eq!(vars["C"], "three");
        assert_eq!(vars["D"], "x=y");
    }

    #[test]
    fn line_without_equals_is_malformed() {
        let err = parse_config_str(&p(), "A=1\nnonsense\n").unwrap_err();
        assert!(matches!(err, ConfigError::Malformed { line_no: 2, .. }), "got: {err}");
    }

    #[test]
    fn empty_key_is_rejected() {
        let err = parse_config_str(&p(), "=value\n").unwrap_err();
        assert!(matches!(err, ConfigError::EmptyKey { line_no: 1, .. }));
    }

    #[test]
    fn missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(load_config(&tmp.path().join(CONFIG_FILE)).unwrap().is_empty());
    }

    #[test]
    fn migrations_dir_default_and_override() {
        let s = Settings::from_parts("/srv/app", "dev", BTreeMap::new());
        assert_eq!(s.migrations_dir(), Path::new("/srv/app/migrations"));

        let mut vars = BTreeMap::new();
        vars.insert("MIGRATIONS_DIR".to_string(), "db/changes".to_string());
        let s = Settings::from_parts("/srv/app", "dev", vars);
        assert_eq!(s.migrations_dir(), Path::new("/srv/app/db/changes"));
    }

    #[test]
    fn templates_dir_is_optional() {
        let s = Settings::from_parts("/srv/app", "dev", BTreeMap::new());
        assert_eq!(s.templates_dir(), None);

        let mut vars = BTreeMap::new();
        vars.insert("TEMPLATES_DIR".to_string(), "tools/templates".to_string());
        let s = Settings::from_parts("/srv/app", "dev", vars);
        assert_eq!(s.templates_dir(), Some(PathBuf::from("/srv/app/tools/templates")));
    }

    #[test]
    fn load_reads_config_from_project_dir() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(CONFIG_FILE), "DB_HOST=localhost\n").unwrap();
        let s = Settings::load(tmp.path(), "production").unwrap();
        assert_eq!(s.vars()["DB_HOST"], "localhost");
        assert_eq!(s.environment(), "production");
        assert!(s.project_dir().is_absolute());
    }

    #[test]
    fn child_env_carries_config_and_well_known_keys() {
        let mut vars = BTreeMap::new();
        vars.insert("DB_HOST".to_string(), "db".to_string());
        let s = Settings::from_parts("/srv/app", "staging", vars);
        let env = s.child_env(&MigrationId::from("1500000000-a"));
        let get = |k: &str| env.iter().find(|(key, _)| key == k).map(|(_, v)| v.as_str());
        assert_eq!(get("DB_HOST"), Some("db"));
        assert_eq!(get("ENVIRONMENT"), Some("staging"));
        assert_eq!(get("MIGRATION_ID"), Some("1500000000-a"));
        assert_eq!(get("PROJECT_DIR"), Some("/srv/app"));
    }
}
