//! Shared test utilities for brtimg tests.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

use brtimg::config::Config;
use brtimg::error::BuildError;
use brtimg::smoke::{Exec, ModuleRunner};

/// Test environment with a temporary config directory.
pub struct TestEnv {
    /// Temporary directory (kept alive for lifetime of TestEnv)
    pub _temp_dir: TempDir,
    /// Base directory for config files
    pub base_dir: PathBuf,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_dir = temp_dir.path().to_path_buf();
        Self {
            _temp_dir: temp_dir,
            base_dir,
        }
    }

    /// Write a mock configuration with the given chroot_setup_cmd payload.
    pub fn write_mock_cfg(&self, setup_payload: &str) -> PathBuf {
        let path = self.base_dir.join("mock.cfg");
        let content = format!(
            "config_opts['root'] = 'base-runtime'\n\
             config_opts['target_arch'] = 'x86_64'\n\
             config_opts['chroot_setup_cmd'] = '{setup_payload}'\n\
             config_opts['dist'] = 'el7'\n"
        );
        fs::write(&path, content).expect("Failed to write mock cfg");
        path
    }

    /// Write a modulemd document with the given baseimage rpms.
    pub fn write_modulemd(&self, rpms: &[&str]) -> PathBuf {
        let path = self.base_dir.join("module.yaml");
        let mut content = String::from("data:\n  profiles:\n    baseimage:\n      rpms:\n");
        for rpm in rpms {
            content.push_str(&format!("        - {rpm}\n"));
        }
        fs::write(&path, content).expect("Failed to write modulemd");
        path
    }

    /// Build a Config pointing at this environment's files.
    pub fn config(&self, mock_config: &Path, modulemd: &Path) -> Config {
        Config {
            mock_config: mock_config.to_path_buf(),
            modulemd: modulemd.to_path_buf(),
            image_name: "base-runtime-docker".to_string(),
            profile: "baseimage".to_string(),
            labels_file: None,
            mock_root_dir: self.base_dir.join("mockroot"),
            command_timeout: Duration::from_secs(30),
        }
    }
}

/// Script-free fake module runner driven by a responder function.
///
/// The responder maps a command line to an `Exec`; commands and copied
/// paths are recorded for assertions.
pub struct FakeRunner<F: FnMut(&str) -> Exec> {
    pub responder: F,
    pub commands: Vec<String>,
    pub copied: Vec<(PathBuf, String)>,
}

impl<F: FnMut(&str) -> Exec> FakeRunner<F> {
    pub fn new(responder: F) -> Self {
        Self {
            responder,
            commands: Vec::new(),
            copied: Vec::new(),
        }
    }
}

impl<F: FnMut(&str) -> Exec> ModuleRunner for FakeRunner<F> {
    fn run(&mut self, cmd: &str) -> Result<Exec, BuildError> {
        self.commands.push(cmd.to_string());
        Ok((self.responder)(cmd))
    }

    fn copy_in(&mut self, src: &Path, dest: &str) -> Result<(), BuildError> {
        self.copied.push((src.to_path_buf(), dest.to_string()));
        Ok(())
    }
}

/// Shorthand for building an Exec.
pub fn exec(code: i32, stdout: &str, stderr: &str) -> Exec {
    Exec {
        code,
        stdout: stdout.to_string(),
        stderr: stderr.to_string(),
    }
}
