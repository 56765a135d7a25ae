//! Site configuration: the static-site YAML file and the `mktheapidocs`
//! block inside its `plugins` list.
//!
//! ```yaml
//! docs_dir: docs
//! nav:
//!   - Home: index.md
//!   - api-docs-api
//! plugins:
//!   - search
//!   - mktheapidocs:
//!       python_path: [src]
//!       modules:
//!         my_pkg:
//!           section: api
//!           source_repo: https://github.com/me/repo/blob/$BRANCH
//! ```

use crate::discover::{self, DiscoveredModule};
use regex::{Captures, Regex};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

static RE_ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(?:\{(\w+)\}|(\w+))").unwrap());

const PLUGIN_NAME: &str = "mktheapidocs";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config YAML '{}': {source}", path.display())]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error("no `mktheapidocs` entry under `plugins`")]
    MissingPlugin,
    #[error("invalid `mktheapidocs` block: {0}")]
    Plugin(#[source] serde_yaml::Error),
    #[error("`{0}` not found. Have you installed it?")]
    ModuleNotFound(String),
    #[error("Missing section for {0}")]
    MissingSection(String),
    #[error("Missing source_repo for {0}")]
    MissingSourceRepo(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    #[serde(default = "default_docs_dir")]
    pub docs_dir: PathBuf,
    #[serde(default)]
    pub nav: Option<serde_yaml::Value>,
    #[serde(default)]
    pub plugins: Vec<serde_yaml::Value>,
    /// Directory relative paths in the file are resolved against
    #[serde(skip)]
    pub root: PathBuf,
}

fn default_docs_dir() -> PathBuf {
    PathBuf::from("docs")
}

#[derive(Debug, Clone, Deserialize)]
pub struct PluginConfig {
    #[serde(default)]
    pub modules: BTreeMap<String, ModuleConfig>,
    #[serde(default = "default_python_path")]
    pub python_path: Vec<PathBuf>,
}

fn default_python_path() -> Vec<PathBuf> {
    vec![PathBuf::from(".")]
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModuleConfig {
    pub section: Option<String>,
    pub source_repo: Option<String>,
}

/// One configured root module, validated and discovered.
#[derive(Debug, Clone)]
pub struct ModuleTarget {
    pub name: String,
    pub section: String,
    /// `source_repo` with environment variables expanded
    pub source_repo: String,
    pub modules: Vec<DiscoveredModule>,
}

impl SiteConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let yaml = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let root = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        // absolute, so watched paths match what the watcher reports
        let root = std::path::absolute(root).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::parse(&yaml, &root).map_err(|e| ConfigError::Yaml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Parse YAML text, resolving relative directories against `root`.
    pub fn parse(yaml: &str, root: &Path) -> Result<Self, serde_yaml::Error> {
        let mut config: SiteConfig = serde_yaml::from_str(yaml)?;
        config.docs_dir = root.join(&config.docs_dir);
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// This plugin's block, with `python_path` resolved against the root.
    pub fn plugin(&self) -> Result<PluginConfig, ConfigError> {
        let block = self
            .plugins
            .iter()
            .find_map(|entry| entry.as_mapping()?.get(PLUGIN_NAME))
            .ok_or(ConfigError::MissingPlugin)?;
        let mut config: PluginConfig =
            serde_yaml::from_value(block.clone()).map_err(ConfigError::Plugin)?;
        config.python_path = config.python_path.iter().map(|p| self.root.join(p)).collect();
        Ok(config)
    }
}

impl PluginConfig {
    /// Check every configured module and discover its files.
    pub fn targets(&self) -> Result<Vec<ModuleTarget>, ConfigError> {
        self.modules
            .iter()
            .map(|(name, module)| {
                let modules = discover::discover(name, &self.python_path)
                    .map_err(|_| ConfigError::ModuleNotFound(name.clone()))?;
                let section = module
                    .section
                    .clone()
                    .ok_or_else(|| ConfigError::MissingSection(name.clone()))?;
                let source_repo = module
                    .source_repo
                    .as_deref()
                    .map(expand_env)
                    .ok_or_else(|| ConfigError::MissingSourceRepo(name.clone()))?;
                Ok(ModuleTarget {
                    name: name.clone(),
                    section,
                    source_repo,
                    modules,
                })
            })
            .collect()
    }
}

/// Expand `$VAR` and `${VAR}`; unknown variables are left as written.
pub fn expand_env(text: &str) -> String {
    RE_ENV_VAR
        .replace_all(text, |caps: &Captures<'_>| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            std::env::var(name).unwrap_or_else(|_| caps[0].to_string())
        })
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = "
site_dir: public
nav:
  - Home: index.md
  - api-docs-api
plugins:
  - search
  - mktheapidocs:
      python_path: [src]
      modules:
        pkg:
          section: api
          source_repo: https://example.com/${MKTHEAPIDOCS_TEST_BRANCH}
";

    #[test]
    fn parses_site_and_plugin_blocks() {
        let config = SiteConfig::parse(CONFIG, Path::new("/site")).unwrap();
        assert_eq!(config.docs_dir, PathBuf::from("/site/docs"));
        assert!(config.nav.is_some());

        let plugin = config.plugin().unwrap();
        assert_eq!(plugin.python_path, vec![PathBuf::from("/site/src")]);
        assert_eq!(plugin.modules["pkg"].section.as_deref(), Some("api"));
    }

    #[test]
    fn missing_plugin_block() {
        let config = SiteConfig::parse("plugins: [search]", Path::new(".")).unwrap();
        assert!(matches!(config.plugin(), Err(ConfigError::MissingPlugin)));
    }

    #[test]
    fn missing_section_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join("tool.py"), "").unwrap();
        let plugin = PluginConfig {
            modules: BTreeMap::from([(
                "tool".to_string(),
                ModuleConfig {
                    section: None,
                    source_repo: Some("x".into()),
                },
            )]),
            python_path: vec![tmp.path().to_path_buf()],
        };
        let err = plugin.targets().unwrap_err();
        assert_eq!(err.to_string(), "Missing section for tool");
    }

    #[test]
    fn unknown_module_is_reported() {
        let plugin = PluginConfig {
            modules: BTreeMap::from([(
                "definitely_not_here".to_string(),
                ModuleConfig {
                    section: Some("api".into()),
                    source_repo: Some("x".into()),
                },
            )]),
            python_path: vec![PathBuf::from("/nonexistent")],
        };
        assert!(matches!(plugin.targets(), Err(ConfigError::ModuleNotFound(_))));
    }

    #[test]
    fn env_vars_are_expanded() {
        std::env::set_var("MKTHEAPIDOCS_TEST_BRANCH", "main");
        assert_eq!(expand_env("https://x/${MKTHEAPIDOCS_TEST_BRANCH}"), "https://x/main");
        assert_eq!(expand_env("https://x/$MKTHEAPIDOCS_TEST_BRANCH/y"), "https://x/main/y");
        assert_eq!(expand_env("$MKTHEAPIDOCS_UNSET_VAR"), "$MKTHEAPIDOCS_UNSET_VAR");
    }
}
