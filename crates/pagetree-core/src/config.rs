use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::io::IsTerminal;
use std::path::Path;

/// Workspace directory name under the project root.
pub const WORKSPACE_DIR: &str = ".pagetree";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub tree: TreeConfig,
    #[serde(default)]
    pub render: RenderConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    #[serde(default = "default_space")]
    pub default_space: String,
    #[serde(default = "default_true")]
    pub persist_expansion: bool,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            default_space: default_space(),
            persist_expansion: default_true(),
        }
    }
}

/// Glyph set for the connecting guide lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GuideStyle {
    #[default]
    Unicode,
    Ascii,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    #[serde(default)]
    pub guides: GuideStyle,
    #[serde(default = "default_true")]
    pub show_status: bool,
    #[serde(default = "default_true")]
    pub show_labels: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            guides: GuideStyle::default(),
            show_status: default_true(),
            show_labels: default_true(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct UserConfig {
    #[serde(default)]
    pub output: Option<String>,
    /// Identity recorded as author and owner of new pages.
    #[serde(default)]
    pub user: Option<String>,
}

pub fn load_project_config(project_root: &Path) -> Result<ProjectConfig> {
    let path = project_root.join(WORKSPACE_DIR).join("config.toml");
    if !path.exists() {
        return Ok(ProjectConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<ProjectConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };

    let path = config_dir.join("pagetree/config.toml");
    if !path.exists() {
        return Ok(UserConfig::default());
    }

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<UserConfig>(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))
}

/// Identity used for authorship: `--user` > `PAGETREE_USER` > user config >
/// `USER` > `"unknown"`.
#[must_use]
pub fn resolve_actor(cli_user: Option<&str>, user_config: &UserConfig) -> String {
    let from_env = |name: &str| env::var(name).ok().filter(|v| !v.trim().is_empty());
    cli_user
        .map(str::to_string)
        .filter(|v| !v.trim().is_empty())
        .or_else(|| from_env("PAGETREE_USER"))
        .or_else(|| user_config.user.clone().filter(|v| !v.trim().is_empty()))
        .or_else(|| from_env("USER"))
        .unwrap_or_else(|| "unknown".to_string())
}

/// Output mode: `--json` > `FORMAT` > user config > TTY detection.
#[must_use]
pub fn resolve_output(
    cli_json: bool,
    user_output: Option<String>,
    env_format: Option<String>,
) -> String {
    fn normalize_output_mode(raw: &str) -> Option<&'static str> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pretty" | "human" => Some("pretty"),
            "text" | "plain" => Some("text"),
            "json" => Some("json"),
            _ => None,
        }
    }

    if cli_json {
        return "json".to_string();
    }

    if let Some(mode) = env_format.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if let Some(mode) = user_output.as_deref().and_then(normalize_output_mode) {
        return mode.to_string();
    }

    if std::io::stdout().is_terminal() {
        "pretty".to_string()
    } else {
        "text".to_string()
    }
}

const fn default_true() -> bool {
    true
}

fn default_space() -> String {
    "default".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_project_config_uses_defaults() {
        let root = tempfile::tempdir().expect("temp dir");
        let cfg = load_project_config(root.path()).expect("load should succeed");
        assert_eq!(cfg.tree.default_space, "default");
        assert!(cfg.tree.persist_expansion);
        assert_eq!(cfg.render.guides, GuideStyle::Unicode);
        assert!(cfg.render.show_status);
    }

    #[test]
    fn project_config_parses_partial_tables() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(WORKSPACE_DIR);
        std::fs::create_dir_all(&dir).expect("create workspace dir");
        std::fs::write(
            dir.join("config.toml"),
            "[tree]\ndefault_space = \"docs\"\n\n[render]\nguides = \"ascii\"\nshow_labels = false\n",
        )
        .expect("write config");

        let cfg = load_project_config(root.path()).expect("load");
        assert_eq!(cfg.tree.default_space, "docs");
        assert!(cfg.tree.persist_expansion);
        assert_eq!(cfg.render.guides, GuideStyle::Ascii);
        assert!(!cfg.render.show_labels);
        assert!(cfg.render.show_status);
    }

    #[test]
    fn malformed_project_config_is_an_error() {
        let root = tempfile::tempdir().expect("temp dir");
        let dir = root.path().join(WORKSPACE_DIR);
        std::fs::create_dir_all(&dir).expect("create workspace dir");
        std::fs::write(dir.join("config.toml"), "[tree\n").expect("write config");
        assert!(load_project_config(root.path()).is_err());
    }

    #[test]
    fn cli_json_overrides_env_and_config() {
        let output = resolve_output(true, Some("pretty".to_string()), Some("text".to_string()));
        assert_eq!(output, "json");
    }

    #[test]
    fn env_beats_user_config() {
        let output = resolve_output(false, Some("json".to_string()), Some("text".to_string()));
        assert_eq!(output, "text");
    }

    #[test]
    fn aliases_are_normalized() {
        assert_eq!(resolve_output(false, None, Some("human".to_string())), "pretty");
        assert_eq!(resolve_output(false, Some("plain".to_string()), None), "text");
    }

    #[test]
    fn cli_user_wins() {
        let cfg = UserConfig {
            output: None,
            user: Some("configured".into()),
        };
        assert_eq!(resolve_actor(Some("flag"), &cfg), "flag");
    }

    #[test]
    fn user_config_parses_identity() {
        let cfg: UserConfig = toml::from_str("output = \"json\"\nuser = \"ada\"\n").expect("parse");
        assert_eq!(cfg.output.as_deref(), Some("json"));
        assert_eq!(cfg.user.as_deref(), Some("ada"));
    }
}
