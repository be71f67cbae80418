//! Mock chroot configuration parsing and rewrite.
//!
//! The mock configuration is a line-oriented file of `config_opts[...]`
//! assignments. Only two directives matter to the pipeline: `root` (the
//! chroot identifier under /var/lib/mock) and `chroot_setup_cmd` (the
//! package-install command mock runs when initializing the chroot). All
//! other lines pass through a rewrite byte-identical; mock itself remains
//! the authority on the file format.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::Regex;

use crate::error::BuildError;

/// Fixed prefix of the chroot_setup_cmd payload.
pub const SETUP_CMD_PREFIX: &str = "install --setopt=tsflags=nodocs";

fn root_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^config_opts\s*\[\s*'root'\s*\]\s*=\s*'([^']*)'").unwrap()
    })
}

fn setup_cmd_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^config_opts\s*\[\s*'chroot_setup_cmd'\s*\]").unwrap())
}

fn setup_pkgs_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^config_opts\s*\[\s*'chroot_setup_cmd'\s*\]\s*=\s*'install --setopt=tsflags=nodocs\s*(.*)\s*'",
        )
        .unwrap()
    })
}

/// Parsed view of a mock configuration file.
#[derive(Debug, Clone)]
pub struct MockConfig {
    /// Path the configuration was read from.
    pub path: PathBuf,
    /// Chroot identifier (`config_opts['root']`). Never empty.
    pub root: String,
    /// Sorted package list from chroot_setup_cmd, when the directive's
    /// payload matched the strict install-command form. `None` means the
    /// directive is present but its package list could not be parsed.
    pub setup_packages: Option<Vec<String>>,
    /// Raw file lines, terminators included, in original order.
    lines: Vec<String>,
}

impl MockConfig {
    /// Parse a mock configuration file.
    ///
    /// Fails when the file has no `root` assignment or no
    /// `chroot_setup_cmd` directive; the pipeline cannot proceed without
    /// either.
    pub fn parse(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BuildError::io(format!("reading mock config {}", path.display()), e))?;

        let mut root = String::new();
        let mut setup_found = false;
        let mut setup_packages = None;
        let mut lines = Vec::new();

        for line in content.split_inclusive('\n') {
            lines.push(line.to_string());

            if root.is_empty() {
                if let Some(caps) = root_re().captures(line) {
                    root = caps[1].to_string();
                }
            }

            if setup_cmd_re().is_match(line) {
                setup_found = true;
                if let Some(caps) = setup_pkgs_re().captures(line) {
                    let mut pkgs: Vec<String> =
                        caps[1].split_whitespace().map(str::to_string).collect();
                    pkgs.sort();
                    setup_packages = Some(pkgs);
                }
            }
        }

        if root.is_empty() {
            return Err(BuildError::Config(format!(
                "mock configuration file {} does not specify mock root",
                path.display()
            )));
        }

        if !setup_found {
            return Err(BuildError::Config(format!(
                "mock configuration file {} does not define chroot_setup_cmd",
                path.display()
            )));
        }

        Ok(Self {
            path: path.to_path_buf(),
            root,
            setup_packages,
            lines,
        })
    }

    /// Path of the chroot filesystem root mock will populate.
    pub fn chroot_root(&self, mock_root_dir: &Path) -> PathBuf {
        mock_root_dir.join(&self.root).join("root")
    }

    /// Rewrite the chroot_setup_cmd directive with a new package list.
    ///
    /// Every other line is written back byte-identical. The replacement is
    /// staged in a sibling temp file and renamed over the original so a
    /// failure mid-write never truncates the configuration.
    pub fn rewrite_setup_cmd(&self, packages: &[String]) -> Result<(), BuildError> {
        let new_line = format!(
            "config_opts['chroot_setup_cmd'] = '{}'\n",
            setup_command(packages)
        );

        let dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut tmp = tempfile::NamedTempFile::new_in(dir)
            .map_err(|e| BuildError::io("creating temp file for mock config rewrite", e))?;

        for line in &self.lines {
            if setup_cmd_re().is_match(line) {
                tmp.write_all(new_line.as_bytes())
            } else {
                tmp.write_all(line.as_bytes())
            }
            .map_err(|e| BuildError::io("writing rewritten mock config", e))?;
        }

        tmp.persist(&self.path).map_err(|e| {
            BuildError::io(
                format!("replacing mock config {}", self.path.display()),
                e.error,
            )
        })?;

        Ok(())
    }
}

/// Render the chroot_setup_cmd payload for a package list.
pub fn setup_command(packages: &[String]) -> String {
    format!("{} {}", SETUP_CMD_PREFIX, packages.join(" "))
}
