//! TOML configuration files for the command-line adapter.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use geotoken_core::GameConfig;
use serde::Deserialize;

/// Directory used for saves when neither the command line nor the file names one.
pub const DEFAULT_SAVE_DIR: &str = ".geotoken";

/// Settings read from a configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Game parameters; absent fields keep their defaults.
    pub game: GameConfig,
    /// Directory holding the save file.
    pub save_dir: Option<PathBuf>,
}

impl Settings {
    /// Loads settings from `path`, or returns the defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("invalid configuration in {}", path.display()))
    }

    /// Parses and validates settings from TOML text.
    pub fn parse(contents: &str) -> Result<Self> {
        let settings: Self =
            toml::from_str(contents).context("failed to parse configuration toml contents")?;
        settings
            .game
            .validate()
            .context("configuration describes an unplayable game")?;
        Ok(settings)
    }

    /// Save directory, preferring `override_dir` over the file and the default.
    #[must_use]
    pub fn save_dir(&self, override_dir: Option<&Path>) -> PathBuf {
        override_dir
            .map(Path::to_path_buf)
            .or_else(|| self.save_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SAVE_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geotoken_core::TokenValue;

    #[test]
    fn empty_file_uses_defaults() {
        let settings = Settings::parse("").expect("empty config is valid");
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.save_dir(None), PathBuf::from(DEFAULT_SAVE_DIR));
    }

    #[test]
    fn partial_game_table_keeps_other_defaults() {
        let settings = Settings::parse(
            r#"
            save_dir = "saves"

            [game]
            win_value = 64
            interaction_radius = 2
            anchor = { lat = 51.5, lng = -0.12 }
            "#,
        )
        .expect("valid config");

        assert_eq!(settings.game.win_value, TokenValue::new(64));
        assert_eq!(settings.game.interaction_radius, 2);
        assert_eq!(settings.game.anchor.lat, 51.5);
        assert_eq!(settings.game.spawn_probability, 0.3);
        assert_eq!(settings.save_dir(None), PathBuf::from("saves"));
        assert_eq!(
            settings.save_dir(Some(Path::new("elsewhere"))),
            PathBuf::from("elsewhere")
        );
    }

    #[test]
    fn unknown_and_invalid_fields_are_rejected() {
        assert!(Settings::parse("[game]\ncolour = \"red\"").is_err());
        assert!(Settings::parse("[game]\nspawn_probability = 1.5").is_err());
        assert!(Settings::parse("[game]\ncell_size_degrees = 0.0").is_err());
    }
}
