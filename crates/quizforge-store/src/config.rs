//! Configuration loading.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizforge_core::attempt::{AttemptGate, MaxAttempts, Unlimited};
use quizforge_core::integrity::IntegrityPolicy;

/// Attempt-limit settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttemptSettings {
    /// Refuse attempts beyond a quiz's `max_attempts`. Off by default, in
    /// which case `max_attempts` is advisory.
    pub enforce_max_attempts: bool,
}

/// Top-level quizforge configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizforgeConfig {
    /// Directory holding progress documents.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Directory scanned for quiz definitions.
    #[serde(default = "default_quiz_dir")]
    pub quiz_dir: PathBuf,
    /// Module counts per training, for trainings with modules that have no quiz.
    #[serde(default)]
    pub trainings: BTreeMap<String, usize>,
    /// Integrity rules. Every rule is disabled unless configured.
    #[serde(default)]
    pub integrity: IntegrityPolicy,
    #[serde(default)]
    pub attempts: AttemptSettings,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./quizforge-data")
}

fn default_quiz_dir() -> PathBuf {
    PathBuf::from("./quizzes")
}

impl Default for QuizforgeConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            quiz_dir: default_quiz_dir(),
            trainings: BTreeMap::new(),
            integrity: IntegrityPolicy::default(),
            attempts: AttemptSettings::default(),
        }
    }
}

impl QuizforgeConfig {
    /// The attempt gate these settings select.
    pub fn attempt_gate(&self) -> Arc<dyn AttemptGate> {
        if self.attempts.enforce_max_attempts {
            Arc::new(MaxAttempts)
        } else {
            Arc::new(Unlimited)
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(s) if s.contains("${") => PathBuf::from(resolve_env_vars(s)),
        _ => path.to_path_buf(),
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizforge.toml` in the current directory
/// 2. `~/.config/quizforge/config.toml`
///
/// Environment variable overrides: `QUIZFORGE_DATA_DIR`, `QUIZFORGE_QUIZ_DIR`.
pub fn load_config() -> Result<QuizforgeConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizforgeConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizforge.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = toml::from_str::<QuizforgeConfig>(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!("loaded config from {}", path.display());
            config
        }
        None => QuizforgeConfig::default(),
    };

    // Apply env var overrides
    if let Ok(dir) = std::env::var("QUIZFORGE_DATA_DIR") {
        config.data_dir = PathBuf::from(dir);
    }
    if let Ok(dir) = std::env::var("QUIZFORGE_QUIZ_DIR") {
        config.quiz_dir = PathBuf::from(dir);
    }

    config.data_dir = resolve_path(&config.data_dir);
    config.quiz_dir = resolve_path(&config.quiz_dir);

    Ok(config)
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizforge"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_env_vars_basic() {
        std::env::set_var("_QUIZFORGE_TEST_VAR", "hello");
        assert_eq!(resolve_env_vars("${_QUIZFORGE_TEST_VAR}"), "hello");
        assert_eq!(
            resolve_env_vars("prefix_${_QUIZFORGE_TEST_VAR}_suffix"),
            "prefix_hello_suffix"
        );
        assert_eq!(resolve_env_vars("unterminated ${oops"), "unterminated ${oops");
        std::env::remove_var("_QUIZFORGE_TEST_VAR");
    }

    #[test]
    fn default_config() {
        let config = QuizforgeConfig::default();
        assert_eq!(config.quiz_dir, PathBuf::from("./quizzes"));
        assert_eq!(config.integrity, IntegrityPolicy::default());
        assert!(config.integrity.active_rules().is_empty());
        assert!(!config.attempts.enforce_max_attempts);
    }

    #[test]
    fn parse_full_config() {
        let toml_str = r#"
data_dir = "/var/lib/quizforge"
quiz_dir = "content/quizzes"

[trainings]
fire-safety = 4

[integrity.violation_ceiling]
enabled = true
max_violations = 3

[integrity.penalty]
enabled = true

[attempts]
enforce_max_attempts = true
"#;
        let config: QuizforgeConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.data_dir, PathBuf::from("/var/lib/quizforge"));
        assert_eq!(config.trainings["fire-safety"], 4);
        assert!(config.integrity.violation_ceiling.enabled);
        assert_eq!(config.integrity.violation_ceiling.max_violations, 3);
        assert!(config.integrity.penalty.enabled);
        assert_eq!(config.integrity.penalty.per_violation_percent, 5);
        assert!(!config.integrity.min_duration.enabled);
        assert!(config.attempts.enforce_max_attempts);
    }

    #[test]
    fn explicit_path_must_exist() {
        let err = load_config_from(Some(Path::new("/definitely/missing.toml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn load_from_file_expands_paths() {
        std::env::set_var("_QUIZFORGE_TEST_ROOT", "/srv");
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quizforge.toml");
        std::fs::write(&path, "data_dir = \"${_QUIZFORGE_TEST_ROOT}/progress\"\n").unwrap();

        let config = load_config_from(Some(&path)).unwrap();
        if std::env::var("QUIZFORGE_DATA_DIR").is_err() {
            assert_eq!(config.data_dir, PathBuf::from("/srv/progress"));
        }
        std::env::remove_var("_QUIZFORGE_TEST_ROOT");
    }
}
