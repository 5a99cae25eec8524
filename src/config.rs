use std::path::Path;

use serde::Deserialize;
use tracing::warn;

pub const CONFIG_FILE: &str = "cp-link.toml";

/// Configuration loaded from `cp-link.toml` next to the package's package.json.
///
/// Every field is a fallback: command-line flags and `CP_LINK_DEST` win.
#[derive(Debug, Deserialize, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct CpLinkConfig {
    /// Default destination project.
    pub destination: Option<String>,
    /// Build command run before each copy.
    pub build_command: Option<String>,
    /// Quiet period after the last change before rebuilding.
    pub debounce_ms: Option<u64>,
    /// Extra gitignore-style patterns that never trigger a rebuild.
    pub ignore: Option<Vec<String>>,
}

impl CpLinkConfig {
    /// Load configuration from `cp-link.toml` in the given root directory.
    ///
    /// Returns a default (empty) configuration if the file does not exist or cannot be parsed.
    pub fn load(root: &Path) -> Self {
        let config_path = root.join(CONFIG_FILE);

        if !config_path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&config_path) {
            Ok(contents) => match toml::from_str::<Self>(&contents) {
                Ok(config) => config,
                Err(err) => {
                    warn!("failed to parse {CONFIG_FILE}: {err}. Using defaults.");
                    Self::default()
                }
            },
            Err(err) => {
                warn!("failed to read {CONFIG_FILE}: {err}. Using defaults.");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(CpLinkConfig::load(dir.path()), CpLinkConfig::default());
    }

    #[test]
    fn test_load_reads_all_keys() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join(CONFIG_FILE),
            r#"
destination = "~/projects/app"
build_command = "pnpm build"
debounce_ms = 250
ignore = ["*.log", "coverage/"]
"#,
        )
        .unwrap();

        let config = CpLinkConfig::load(dir.path());
        assert_eq!(config.destination.as_deref(), Some("~/projects/app"));
        assert_eq!(config.build_command.as_deref(), Some("pnpm build"));
        assert_eq!(config.debounce_ms, Some(250));
        assert_eq!(
            config.ignore,
            Some(vec!["*.log".to_string(), "coverage/".to_string()])
        );
    }

    #[test]
    fn test_load_invalid_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "debounce_ms = \"soon\"").unwrap();
        assert_eq!(CpLinkConfig::load(dir.path()), CpLinkConfig::default());
    }
}
