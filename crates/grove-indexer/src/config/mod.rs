//! Project configuration: `.grove.toml`, JS/TS path aliases and the cache root

use crate::discovery::FilterSet;
use crate::extractor::DEFAULT_MAX_FILE_BYTES;
use crate::resolver::PathAlias;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILE: &str = ".grove.toml";

/// Environment variable overriding the cache root.
pub const CACHE_DIR_ENV: &str = "GROVE_CACHE_DIR";

pub const DEFAULT_MAX_AGE_HOURS: u64 = 24;

/// Upper bound on the default extraction pool size.
pub const MAX_DEFAULT_WORKERS: usize = 8;

const TS_CONFIG_FILES: &[&str] = &["tsconfig.json", "jsconfig.json"];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid configuration in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// One alias target or several, as written in `[aliases]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AliasTargets {
    One(String),
    Many(Vec<String>),
}

impl AliasTargets {
    fn into_vec(self) -> Vec<String> {
        match self {
            AliasTargets::One(target) => vec![target],
            AliasTargets::Many(targets) => targets,
        }
    }
}

/// Contents of `<root>/.grove.toml`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroveConfig {
    /// Extra exclude globs, on top of the built-in defaults.
    pub exclude: Vec<String>,
    /// When non-empty, only files matching one of these globs are scanned.
    pub include: Vec<String>,
    pub max_age_hours: Option<u64>,
    pub workers: Option<usize>,
    pub max_file_bytes: Option<u64>,
    /// Relative paths are taken from the project root.
    pub cache_dir: Option<PathBuf>,
    pub aliases: BTreeMap<String, AliasTargets>,
}

impl GroveConfig {
    /// Read `<root>/.grove.toml`; a missing file yields the defaults.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join(CONFIG_FILE);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No {} in {}", CONFIG_FILE, root.display());
                return Ok(GroveConfig::default());
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let mut config: GroveConfig =
            toml::from_str(&text).map_err(|source| ConfigError::Parse { path, source })?;
        if let Some(dir) = config.cache_dir.take() {
            config.cache_dir = Some(if dir.is_relative() { root.join(dir) } else { dir });
        }
        Ok(config)
    }

    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_hours.unwrap_or(DEFAULT_MAX_AGE_HOURS) * 3600)
    }

    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_bytes.unwrap_or(DEFAULT_MAX_FILE_BYTES)
    }

    /// Configured worker count, or available parallelism capped at
    /// [`MAX_DEFAULT_WORKERS`].
    pub fn workers(&self) -> usize {
        self.workers.filter(|w| *w > 0).unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
                .min(MAX_DEFAULT_WORKERS)
        })
    }

    /// Default excludes plus configured excludes, and the include list.
    pub fn filter_set(&self) -> Result<FilterSet, ConfigError> {
        FilterSet::with_defaults(&self.exclude, &self.include)
    }

    /// Aliases from `[aliases]` followed by the project's own
    /// `tsconfig.json`/`jsconfig.json` `compilerOptions.paths`.
    pub fn path_aliases(&self, root: &Path) -> Vec<PathAlias> {
        let mut aliases: Vec<PathAlias> = self
            .aliases
            .iter()
            .map(|(pattern, targets)| {
                let targets = targets
                    .clone()
                    .into_vec()
                    .into_iter()
                    .map(|t| t.trim_start_matches("./").to_string())
                    .collect();
                PathAlias::new(pattern.clone(), targets)
            })
            .collect();

        for name in TS_CONFIG_FILES {
            let path = root.join(name);
            let Ok(text) = std::fs::read_to_string(&path) else {
                continue;
            };
            match parse_ts_paths(&text) {
                Ok(found) => {
                    tracing::debug!("Loaded {} path aliases from {}", found.len(), name);
                    aliases.extend(found);
                }
                Err(e) => tracing::warn!("Ignoring path aliases in {}: {}", path.display(), e),
            }
            break;
        }
        aliases
    }

    /// Cache root: explicit flag, then `cache_dir`, then `GROVE_CACHE_DIR`,
    /// then the user cache directory, then the system temp directory.
    pub fn cache_root(&self, flag: Option<&Path>) -> PathBuf {
        resolve_cache_root(flag, self.cache_dir.as_deref(), |key| std::env::var(key).ok())
    }
}

fn resolve_cache_root(
    flag: Option<&Path>,
    configured: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> PathBuf {
    if let Some(dir) = flag.or(configured) {
        return dir.to_path_buf();
    }
    let non_empty = |key: &str| env(key).filter(|v| !v.is_empty()).map(PathBuf::from);
    if let Some(dir) = non_empty(CACHE_DIR_ENV) {
        return dir;
    }
    if let Some(xdg) = non_empty("XDG_CACHE_HOME") {
        return xdg.join("grove");
    }
    if let Some(home) = non_empty("HOME") {
        return home.join(".cache").join("grove");
    }
    std::env::temp_dir().join("grove")
}

/// `compilerOptions.paths` joined onto `compilerOptions.baseUrl`.
fn parse_ts_paths(text: &str) -> Result<Vec<PathAlias>, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(&strip_json_comments(text))?;
    let Some(options) = value.get("compilerOptions") else {
        return Ok(Vec::new());
    };

    let base = options
        .get("baseUrl")
        .and_then(|b| b.as_str())
        .map(|b| b.trim_start_matches("./").trim_end_matches('/'))
        .filter(|b| *b != ".")
        .unwrap_or("");
    let rooted = |target: &str| {
        let target = target.trim_start_matches("./");
        if base.is_empty() {
            target.to_string()
        } else {
            format!("{}/{}", base, target)
        }
    };

    let mut aliases = Vec::new();
    if let Some(paths) = options.get("paths").and_then(|p| p.as_object()) {
        for (pattern, targets) in paths {
            let targets: Vec<String> = targets
                .as_array()
                .map(|list| list.iter().filter_map(|t| t.as_str()).map(&rooted).collect())
                .unwrap_or_default();
            if !targets.is_empty() {
                aliases.push(PathAlias::new(pattern.clone(), targets));
            }
        }
    }
    // bare specifiers also resolve under a non-root baseUrl
    if !base.is_empty() {
        aliases.push(PathAlias::new("*", vec![format!("{}/*", base)]));
    }
    Ok(aliases)
}

/// Drop `//` and `/* */` comments and trailing commas outside of strings.
fn strip_json_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        let next = chars.peek().copied();
        match (c, next) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            }
            ('/', Some('/')) => {
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut previous = '\0';
                for skipped in chars.by_ref() {
                    if previous == '*' && skipped == '/' {
                        break;
                    }
                    previous = skipped;
                }
            }
            (',', _) => {
                let rest = chars.clone().find(|c| !c.is_whitespace());
                if !matches!(rest, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_config_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let config = GroveConfig::load(dir.path()).unwrap();
        assert_eq!(config, GroveConfig::default());
        assert_eq!(config.max_age(), Duration::from_secs(24 * 3600));
        assert_eq!(config.max_file_bytes(), DEFAULT_MAX_FILE_BYTES);
        assert!((1..=MAX_DEFAULT_WORKERS).contains(&config.workers()));
    }

    #[test]
    fn test_load_config_file() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
exclude = ["fixtures", "*.min.js"]
include = ["src/**"]
max_age_hours = 2
workers = 3
max_file_bytes = 4096
cache_dir = ".cache/grove"

[aliases]
"@app/*" = "src/app/*"
"~shared" = ["packages/shared", "./vendor/shared"]
"#,
        )
        .unwrap();

        let config = GroveConfig::load(dir.path()).unwrap();
        assert_eq!(config.exclude, vec!["fixtures", "*.min.js"]);
        assert_eq!(config.max_age(), Duration::from_secs(7200));
        assert_eq!(config.workers(), 3);
        assert_eq!(config.max_file_bytes(), 4096);
        assert_eq!(config.cache_dir, Some(dir.path().join(".cache/grove")));
        assert_eq!(config.cache_root(None), dir.path().join(".cache/grove"));

        let aliases = config.path_aliases(dir.path());
        assert_eq!(aliases.len(), 2);
        assert_eq!(aliases[0], PathAlias::new("@app/*", vec!["src/app/*".into()]));
        assert_eq!(
            aliases[1],
            PathAlias::new("~shared", vec!["packages/shared".into(), "vendor/shared".into()])
        );
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "workers = \"many\"\n").unwrap();
        assert!(matches!(
            GroveConfig::load(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_tsconfig_paths_with_comments() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("tsconfig.json"),
            r#"{
  // editor settings
  "compilerOptions": {
    "baseUrl": "./src",
    /* aliases */
    "paths": {
      "@/*": ["./*"],
      "@lib": ["lib/index.ts"],
    },
  },
}"#,
        )
        .unwrap();

        let aliases = GroveConfig::default().path_aliases(dir.path());
        assert_eq!(
            aliases,
            vec![
                PathAlias::new("@/*", vec!["src/*".into()]),
                PathAlias::new("@lib", vec!["src/lib/index.ts".into()]),
                PathAlias::new("*", vec!["src/*".into()]),
            ]
        );
    }

    #[test]
    fn test_malformed_tsconfig_is_ignored() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("tsconfig.json"), "{ not json").unwrap();
        assert!(GroveConfig::default().path_aliases(dir.path()).is_empty());
    }

    #[test]
    fn test_cache_root_precedence() {
        let env = |pairs: &'static [(&'static str, &'static str)]| {
            move |key: &str| {
                pairs
                    .iter()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.to_string())
            }
        };
        let all = env(&[
            ("GROVE_CACHE_DIR", "/env/grove"),
            ("XDG_CACHE_HOME", "/xdg"),
            ("HOME", "/home/me"),
        ]);

        assert_eq!(
            resolve_cache_root(Some(Path::new("/flag")), Some(Path::new("/conf")), &all),
            PathBuf::from("/flag")
        );
        assert_eq!(
            resolve_cache_root(None, Some(Path::new("/conf")), &all),
            PathBuf::from("/conf")
        );
        assert_eq!(resolve_cache_root(None, None, &all), PathBuf::from("/env/grove"));
        assert_eq!(
            resolve_cache_root(None, None, env(&[("XDG_CACHE_HOME", "/xdg"), ("HOME", "/home/me")])),
            PathBuf::from("/xdg/grove")
        );
        assert_eq!(
            resolve_cache_root(None, None, env(&[("HOME", "/home/me")])),
            PathBuf::from("/home/me/.cache/grove")
        );
        assert_eq!(
            resolve_cache_root(None, None, env(&[])),
            std::env::temp_dir().join("grove")
        );
    }

    #[test]
    fn test_strip_json_comments_keeps_strings() {
        let stripped = strip_json_comments(r#"{"url": "http://x/*y*/", "a": [1, 2,], } // end"#);
        let value: serde_json::Value = serde_json::from_str(&stripped).unwrap();
        assert_eq!(value["url"], "http://x/*y*/");
        assert_eq!(value["a"], serde_json::json!([1, 2]));
    }
}
