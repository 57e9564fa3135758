//! Runtime configuration for the analysis pipeline, loaded from an optional
//! `.rdlt/config.toml` next to the input file with environment-variable
//! overrides (§11).

use crate::error::{RdltError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RdltConfig {
    pub analysis: AnalysisConfig,
    pub output: OutputConfig,
}

impl Default for RdltConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Knobs affecting the core pipeline (C3–C9).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Hard ceiling on C9 DFS recursion depth. Paths reaching it without
    /// hitting the sink are recorded as deadlocks rather than pursued
    /// further (§4.9).
    pub max_depth: usize,
    /// Hard cap on simple paths enumerated per `all_paths` call (C1), the
    /// scaling hotspot named in §5. Exceeding it does not abort the run —
    /// the enumeration truncates and the report's `path_enum_truncated`
    /// flag is set (see DESIGN.md for why this is a soft cap rather than
    /// the fatal `AnalysisIncomplete` wording in §11 would suggest).
    pub path_enum_ceiling: usize,
    /// Open Question #1 resolution: when `true`, an abstract arc's
    /// self-loop reusability is the count of distinct closed walks through
    /// the in-bridge rather than a flat existence count of `1`. Default
    /// `false` matches the reference's literal always-emit-once behavior.
    pub self_loop_walk_counting: bool,
    /// Whether contraction-path arcs are explored before other outgoing
    /// arcs at each C9 branch point (mirrors the reference's
    /// `group_by_successor_paths` prioritization).
    pub prioritize_contraction_paths: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_depth: 15,
            path_enum_ceiling: 10_000,
            self_loop_walk_counting: false,
            prioritize_contraction_paths: true,
        }
    }
}

/// Knobs affecting report rendering (A3).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    /// Mirrored/overridden by `--json`.
    pub json: bool,
    pub include_activity_profiles: bool,
    pub max_profiles_in_report: usize,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            json: false,
            include_activity_profiles: true,
            max_profiles_in_report: 200,
        }
    }
}

fn env_override<T: FromStr>(key: &str, current: T) -> T {
    match std::env::var(key) {
        Ok(val) => val.parse().unwrap_or(current),
        Err(_) => current,
    }
}

impl RdltConfig {
    /// Loads `.rdlt/config.toml` from `project_root` if present, falling
    /// back to defaults, then applies `RDLT_*` environment overrides.
    /// Absence of the file is not an error.
    pub fn load(project_root: &Path) -> Result<Self> {
        let config_path = project_root.join(".rdlt").join("config.toml");
        let mut config = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str(&contents).map_err(|e| RdltError::Config(e.to_string()))?
        } else {
            RdltConfig::default()
        };

        config.analysis.max_depth = env_override("RDLT_ANALYSIS_MAX_DEPTH", config.analysis.max_depth);
        config.analysis.path_enum_ceiling =
            env_override("RDLT_ANALYSIS_PATH_ENUM_CEILING", config.analysis.path_enum_ceiling);
        config.analysis.self_loop_walk_counting = env_override(
            "RDLT_ANALYSIS_SELF_LOOP_WALK_COUNTING",
            config.analysis.self_loop_walk_counting,
        );
        config.output.json = env_override("RDLT_OUTPUT_JSON", config.output.json);

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.analysis.max_depth == 0 {
            return Err(RdltError::Config("analysis.max_depth must be greater than 0".to_string()));
        }
        if self.analysis.path_enum_ceiling == 0 {
            return Err(RdltError::Config(
                "analysis.path_enum_ceiling must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = RdltConfig::default();
        assert_eq!(config.analysis.max_depth, 15);
        assert_eq!(config.analysis.path_enum_ceiling, 10_000);
        assert!(!config.analysis.self_loop_walk_counting);
        assert!(!config.output.json);
    }

    #[test]
    fn test_config_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join(".rdlt")).unwrap();
        let mut f = std::fs::File::create(dir.path().join(".rdlt").join("config.toml")).unwrap();
        writeln!(
            f,
            "[analysis]\nself_loop_walk_counting = true\nmax_depth = 50\n\n[output]\njson = true\n"
        )
        .unwrap();
        let config = RdltConfig::load(dir.path()).unwrap();
        assert!(config.analysis.self_loop_walk_counting);
        assert_eq!(config.analysis.max_depth, 50);
        assert!(config.output.json);
    }

    #[test]
    fn test_config_load_nonexistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = RdltConfig::load(dir.path()).unwrap();
        assert_eq!(config, RdltConfig::default());
    }

    #[test]
    fn test_validate_rejects_zero_depth() {
        let mut config = RdltConfig::default();
        config.analysis.max_depth = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_path_ceiling() {
        let mut config = RdltConfig::default();
        config.analysis.path_enum_ceiling = 0;
        assert!(config.validate().is_err());
    }
}
