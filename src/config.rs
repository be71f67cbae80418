//! Configuration management for brtimg.
//!
//! Reads configuration from a .env file and environment variables.
//! Environment variables take precedence over the .env file.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};

/// Default mock configuration file path.
pub const DEFAULT_MOCK_CONFIG: &str = "conf/base-runtime-mock.cfg";
/// Default modulemd document path.
pub const DEFAULT_MODULEMD: &str = "conf/base-runtime.yaml";
/// Default name for the final image.
pub const DEFAULT_IMAGE_NAME: &str = "base-runtime-docker";
/// Default profile to build the image from.
pub const DEFAULT_PROFILE: &str = "baseimage";
/// Default mock state directory.
pub const DEFAULT_MOCK_ROOT_DIR: &str = "/var/lib/mock";
/// Default per-command deadline in seconds.
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 600;

/// brtimg configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the mock configuration file (MOCK_CONFIG)
    pub mock_config: PathBuf,
    /// Path to the modulemd YAML document (MODULEMD)
    pub modulemd: PathBuf,
    /// Name of the final image (IMAGE_NAME)
    pub image_name: String,
    /// Profile whose rpms go into the image (TEST_PROFILE)
    pub profile: String,
    /// Optional JSON file of label key/values baked into the image (DOCKER_LABELS)
    pub labels_file: Option<PathBuf>,
    /// Directory where mock keeps chroots (MOCK_ROOT_DIR)
    pub mock_root_dir: PathBuf,
    /// Deadline applied to every external command (COMMAND_TIMEOUT_SECS)
    pub command_timeout: Duration,
}

impl Config {
    /// Load configuration from the environment.
    ///
    /// Call after `dotenvy::dotenv()` so .env values are visible; relative
    /// paths resolve against `base_dir`.
    pub fn load(base_dir: &Path) -> Self {
        let resolve = |s: String| {
            let path = PathBuf::from(s);
            if path.is_absolute() {
                path
            } else {
                base_dir.join(path)
            }
        };

        let mock_config = std::env::var("MOCK_CONFIG")
            .map(&resolve)
            .unwrap_or_else(|_| base_dir.join(DEFAULT_MOCK_CONFIG));

        let modulemd = std::env::var("MODULEMD")
            .map(&resolve)
            .unwrap_or_else(|_| base_dir.join(DEFAULT_MODULEMD));

        let image_name =
            std::env::var("IMAGE_NAME").unwrap_or_else(|_| DEFAULT_IMAGE_NAME.to_string());

        let profile = std::env::var("TEST_PROFILE").unwrap_or_else(|_| DEFAULT_PROFILE.to_string());

        let labels_file = std::env::var("DOCKER_LABELS").ok().map(resolve);

        let mock_root_dir = std::env::var("MOCK_ROOT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_MOCK_ROOT_DIR));

        let command_timeout = std::env::var("COMMAND_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_COMMAND_TIMEOUT_SECS));

        Self {
            mock_config,
            modulemd,
            image_name,
            profile,
            labels_file,
            mock_root_dir,
            command_timeout,
        }
    }

    /// Name of the intermediate image the chroot is imported under.
    pub fn scratch_image(&self) -> String {
        format!("{}-scratch", self.image_name)
    }

    /// Load image labels from the configured JSON file, if any.
    ///
    /// A BTreeMap keeps label order deterministic across builds.
    pub fn load_labels(&self) -> Result<BTreeMap<String, String>> {
        let Some(ref path) = self.labels_file else {
            return Ok(BTreeMap::new());
        };

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read labels file {}", path.display()))?;
        let labels = serde_json::from_str(&content)
            .with_context(|| format!("Labels file {} is not a JSON object", path.display()))?;
        Ok(labels)
    }

    /// Print configuration for debugging.
    pub fn print(&self) {
        println!("Configuration:");
        println!("  MOCK_CONFIG: {}", self.mock_config.display());
        println!("  MODULEMD: {}", self.modulemd.display());
        println!("  IMAGE_NAME: {}", self.image_name);
        println!("  TEST_PROFILE: {}", self.profile);
        match &self.labels_file {
            Some(path) => println!("  DOCKER_LABELS: {}", path.display()),
            None => println!("  DOCKER_LABELS: (none)"),
        }
        println!("  MOCK_ROOT_DIR: {}", self.mock_root_dir.display());
        println!(
            "  COMMAND_TIMEOUT_SECS: {}",
            self.command_timeout.as_secs()
        );
    }
}
