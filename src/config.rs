//! Configuration management and validation.
//!
//! Provides the immutable settings object passed by reference into every
//! codec and session: century threshold, provenance author, header copy
//! selection, correction/bitflag toggles and data-directory discovery.

use crate::app::models::Format;
use crate::constants::{MGD77_HOME_ENV, MGD77_OLDEST_YY, MGD77_PATHS_FILE};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Settings shared by all MGD77 sessions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Override for the MGD77 home directory (holds `mgd77_paths.txt`)
    pub home: Option<PathBuf>,

    /// Two-digit years below this value are placed in the 21st century
    pub oldest_yy: i32,

    /// Author recorded in container provenance attributes
    pub author: String,

    /// Write the original rather than the revised header copy
    pub original_header: bool,

    /// Apply secondary scale/offset and adjust codes per set (standard, container)
    pub use_corrections: [bool; 2],

    /// Honour stored bitflags per set (standard, container)
    pub use_flags: [bool; 2],

    /// Store magnetic and gravity columns of new containers as 4-byte integers
    #[serde(default)]
    pub high_resolution: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            home: None,
            oldest_yy: MGD77_OLDEST_YY,
            author: std::env::var("USER").unwrap_or_else(|_| "unknown".to_string()),
            original_header: false,
            use_corrections: [true, true],
            use_flags: [true, true],
            high_resolution: false,
        }
    }
}

impl Config {
    /// Build a configuration from defaults plus the environment
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(home) = std::env::var(MGD77_HOME_ENV) {
            if !home.trim().is_empty() {
                debug!("Using {} from environment: {}", MGD77_HOME_ENV, home);
                config.home = Some(PathBuf::from(home));
            }
        }
        config
    }

    /// Set the MGD77 home directory
    pub fn with_home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    /// Set the century disambiguation threshold
    pub fn with_oldest_yy(mut self, oldest_yy: i32) -> Self {
        self.oldest_yy = oldest_yy;
        self
    }

    /// Set the provenance author
    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Write the original header copy even for container output
    pub fn with_original_header(mut self) -> Self {
        self.original_header = true;
        self
    }

    /// Disable secondary corrections for both sets
    pub fn without_corrections(mut self) -> Self {
        self.use_corrections = [false, false];
        self
    }

    /// Disable bitflag enforcement for both sets
    pub fn without_flags(mut self) -> Self {
        self.use_flags = [false, false];
        self
    }

    /// Keep mag, diur, msd, eot and faa at high resolution in containers
    pub fn with_high_resolution(mut self) -> Self {
        self.high_resolution = true;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !(0..=99).contains(&self.oldest_yy) {
            return Err(Error::configuration(format!(
                "oldest_yy must be a two-digit year, got {}",
                self.oldest_yy
            )));
        }
        if self.author.trim().is_empty() {
            return Err(Error::configuration("author must not be empty"));
        }
        Ok(())
    }

    /// Resolve the MGD77 home directory
    ///
    /// Uses the configured override, otherwise `<data dir>/mgd77`, falling
    /// back to `./share/mgd77` when the platform has no data directory.
    pub fn home_dir(&self) -> PathBuf {
        if let Some(home) = &self.home {
            return home.clone();
        }
        dirs::data_dir()
            .map(|dir| dir.join("mgd77"))
            .unwrap_or_else(|| PathBuf::from("share").join("mgd77"))
    }

    /// Data directories listed in the home directory's path file
    pub fn data_dirs(&self) -> Result<Vec<PathBuf>> {
        let list = self.home_dir().join(MGD77_PATHS_FILE);
        if !list.exists() {
            debug!("No path list at {}", list.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&list)
            .map_err(|e| Error::io(format!("Failed to read {}", list.display()), e))?;

        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(PathBuf::from)
            .collect())
    }

    /// Find a cruise file by name
    ///
    /// An existing path is returned as is. Otherwise the current directory
    /// and every listed data directory are searched for the name with each
    /// known format extension.
    pub fn locate(&self, name: &str) -> Result<PathBuf> {
        let direct = Path::new(name);
        if direct.is_file() {
            return Ok(direct.to_path_buf());
        }

        let mut dirs = vec![PathBuf::from(".")];
        dirs.extend(self.data_dirs()?);

        for dir in &dirs {
            for format in Format::ALL {
                let candidate = dir.join(format!("{}.{}", name, format.extension()));
                if candidate.is_file() {
                    debug!("Located {} at {}", name, candidate.display());
                    return Ok(candidate);
                }
            }
        }

        Err(Error::file_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.oldest_yy, 39);
        assert!(!config.original_header);
        assert_eq!(config.use_corrections, [true, true]);
        assert_eq!(config.use_flags, [true, true]);
        assert!(!config.high_resolution);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = Config::default()
            .with_oldest_yy(50)
            .with_author("tester")
            .with_original_header()
            .without_corrections()
            .without_flags()
            .with_high_resolution();
        assert_eq!(config.oldest_yy, 50);
        assert!(config.high_resolution);
        assert_eq!(config.author, "tester");
        assert!(config.original_header);
        assert_eq!(config.use_corrections, [false, false]);
        assert_eq!(config.use_flags, [false, false]);
    }

    #[test]
    fn test_validate_rejects_bad_threshold() {
        let config = Config::default().with_oldest_yy(120);
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { .. })
        ));
    }

    #[test]
    fn test_home_override() {
        let config = Config::default().with_home("/opt/mgd77");
        assert_eq!(config.home_dir(), PathBuf::from("/opt/mgd77"));
    }

    #[test]
    fn test_data_dirs_and_locate() {
        let home = TempDir::new().unwrap();
        let data = TempDir::new().unwrap();

        let mut list = fs::File::create(home.path().join(MGD77_PATHS_FILE)).unwrap();
        writeln!(list, "# data directories").unwrap();
        writeln!(list, "{}", data.path().display()).unwrap();
        writeln!(list).unwrap();

        fs::write(data.path().join("01010083.mgd77"), "").unwrap();

        let config = Config::default().with_home(home.path());
        let dirs = config.data_dirs().unwrap();
        assert_eq!(dirs, vec![data.path().to_path_buf()]);

        let found = config.locate("01010083").unwrap();
        assert_eq!(found, data.path().join("01010083.mgd77"));

        match config.locate("missing").unwrap_err() {
            Error::FileNotFound { path } => assert_eq!(path, "missing"),
            _ => panic!("Expected FileNotFound error"),
        }
    }

    #[test]
    fn test_missing_path_list_is_empty() {
        let home = TempDir::new().unwrap();
        let config = Config::default().with_home(home.path());
        assert!(config.data_dirs().unwrap().is_empty());
    }
}
