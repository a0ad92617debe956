use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::VolleyConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["volley.toml", "volley.yaml", "volley.yml", "volley.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<VolleyConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./volley.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/volley/volley.{toml,yaml,yml,json}` (user-global)
///
/// Returns `VolleyConfig::default()` if no config file is found.
pub fn discover_and_load() -> VolleyConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    VolleyConfig::default()
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/volley/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "volley") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/volley/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "volley").map(|d| d.config_dir().to_path_buf())
}

/// Expand a leading `~/` to the user's home directory.
///
/// Paths without the prefix are returned unchanged, as is `~` itself when
/// no home directory can be resolved.
pub fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(stripped) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match directories::BaseDirs::new() {
        Some(dirs) => dirs.home_dir().join(stripped),
        None => path.to_path_buf(),
    }
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<VolleyConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
