use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::category::CategorySet;
use crate::flow::FlowCategories;
use crate::timing::is_truthy;

/// Per-project analytics settings, read from `.tideline/config.toml`.
///
/// ```toml
/// [categories]
/// "To Do" = ["wait"]
/// "In Progress" = ["work"]
/// "Done" = ["done"]
///
/// [flow]
/// done = "done"
/// work = "work"
///
/// [fields]
/// status = "status"
/// sprint = "Sprint"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default)]
    pub categories: CategorySet,
    #[serde(default)]
    pub flow: FlowCategories,
    #[serde(default)]
    pub fields: FieldConfig,
}

/// Changelog field names the pipeline reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldConfig {
    #[serde(default = "default_status_field")]
    pub status: String,
    #[serde(default = "default_sprint_field")]
    pub sprint: String,
}

impl Default for FieldConfig {
    fn default() -> Self {
        Self {
            status: default_status_field(),
            sprint: default_sprint_field(),
        }
    }
}

/// Settings shared across projects, read from the user config directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Status mappings applied to every project before its own.
    #[serde(default)]
    pub categories: CategorySet,
    #[serde(default)]
    pub timing: bool,
}

/// Project and user settings after precedence is applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EffectiveConfig {
    pub analytics: AnalyticsConfig,
    pub timing: bool,
}

pub fn load_project_config(project_root: &Path) -> Result<AnalyticsConfig> {
    read_toml_or_default(&project_root.join(".tideline/config.toml"))
}

pub fn load_user_config() -> Result<UserConfig> {
    let Some(config_dir) = dirs::config_dir() else {
        return Ok(UserConfig::default());
    };
    read_toml_or_default(&config_dir.join("tideline/config.toml"))
}

/// Load both layers and merge them. `TIDELINE_TIMING`, when set, wins over
/// the user's `timing` flag.
pub fn resolve_config(project_root: &Path) -> Result<EffectiveConfig> {
    let project = load_project_config(project_root)?;
    let user = load_user_config()?;
    let env_timing = std::env::var("TIDELINE_TIMING").ok();
    Ok(merge_layers(project, user, env_timing.as_deref()))
}

fn merge_layers(
    project: AnalyticsConfig,
    user: UserConfig,
    env_timing: Option<&str>,
) -> EffectiveConfig {
    let mut categories = user.categories;
    categories.extend_from(&project.categories);

    let timing = env_timing.map_or(user.timing, is_truthy);

    EffectiveConfig {
        analytics: AnalyticsConfig {
            categories,
            ..project
        },
        timing,
    }
}

fn read_toml_or_default<T>(path: &Path) -> Result<T>
where
    T: Default + for<'de> Deserialize<'de>,
{
    if !path.exists() {
        tracing::debug!(path = %path.display(), "config file absent; using defaults");
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;

    toml::from_str::<T>(&content).with_context(|| format!("Failed to parse {}", path.display()))
}

fn default_status_field() -> String {
    "status".to_string()
}

fn default_sprint_field() -> String {
    "Sprint".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_project(dir: &TempDir, content: &str) {
        let path = dir.path().join(".tideline");
        std::fs::create_dir_all(&path).expect("create config dir");
        std::fs::write(path.join("config.toml"), content).expect("write config");
    }

    #[test]
    fn missing_project_config_is_default() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_project_config(dir.path()).expect("load");
        assert_eq!(config, AnalyticsConfig::default());
        assert_eq!(config.fields.sprint, "Sprint");
        assert_eq!(config.flow.done, "done");
    }

    #[test]
    fn partial_project_config_fills_defaults() {
        let dir = TempDir::new().expect("tempdir");
        write_project(
            &dir,
            r#"
[categories]
"In Progress" = ["work"]
"Done" = ["done"]

[fields]
status = "Status"
"#,
        );
        let config = load_project_config(dir.path()).expect("load");
        assert!(config.categories.has_category("in progress", "work"));
        assert_eq!(config.fields.status, "Status");
        assert_eq!(config.fields.sprint, "Sprint");
        assert_eq!(config.flow, FlowCategories::default());
    }

    #[test]
    fn malformed_project_config_names_the_file() {
        let dir = TempDir::new().expect("tempdir");
        write_project(&dir, "[categories\n");
        let err = load_project_config(dir.path()).expect_err("parse failure");
        assert!(format!("{err:#}").contains("config.toml"));
    }

    #[test]
    fn project_categories_extend_user_categories() {
        let user = UserConfig {
            categories: CategorySet::new()
                .with("Done", &["done"])
                .with("Blocked", &["wait"]),
            timing: false,
        };
        let project = AnalyticsConfig {
            categories: CategorySet::new().with("Done", &["closed"]),
            ..AnalyticsConfig::default()
        };

        let merged = merge_layers(project, user, None);
        let categories = &merged.analytics.categories;
        assert!(categories.has_category("Done", "done"));
        assert!(categories.has_category("Done", "closed"));
        assert!(categories.has_category("Blocked", "wait"));
    }

    #[test]
    fn env_timing_overrides_user_flag() {
        let user = UserConfig {
            timing: true,
            ..UserConfig::default()
        };
        assert!(merge_layers(AnalyticsConfig::default(), user.clone(), None).timing);
        assert!(!merge_layers(AnalyticsConfig::default(), user, Some("off")).timing);
        assert!(
            merge_layers(AnalyticsConfig::default(), UserConfig::default(), Some("YES")).timing
        );
    }
}
