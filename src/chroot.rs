//! Chroot lifecycle: init with mock, then dnf bootstrap inside the chroot.
//!
//! All chroot paths under /var/lib/mock are root-owned, so writes into the
//! chroot go through non-interactive sudo. `sudo -n` never prompts; if the
//! host is not configured for passwordless sudo the command fails and the
//! error propagates.

use std::path::Path;

use crate::config::Config;
use crate::dnfconf;
use crate::error::BuildError;
use crate::mockcfg::MockConfig;
use crate::process::Cmd;

/// Initialize a fresh chroot from the mock configuration.
pub fn init(config: &Config) -> Result<(), BuildError> {
    println!("Initializing chroot with mock...");
    Cmd::new("mock")
        .arg("-r")
        .arg(config.mock_config.to_string_lossy())
        .arg("--init")
        .timeout(config.command_timeout)
        .run()?;
    Ok(())
}

/// Write the bootstrap dnf configuration into the chroot.
///
/// Ensures /etc/dnf exists, then replaces the `[main]` section of the
/// chroot's dnf.conf while keeping any repo sections mock already wrote.
pub fn bootstrap_dnf(config: &Config, mockcfg: &MockConfig) -> Result<(), BuildError> {
    let chroot_root = mockcfg.chroot_root(&config.mock_root_dir);
    let dnf_dir = chroot_root.join("etc/dnf");
    let dnf_conf = dnf_dir.join("dnf.conf");

    println!("Writing dnf configuration into chroot...");

    Cmd::new("sudo")
        .args(["-n", "mkdir", "-p"])
        .arg(dnf_dir.to_string_lossy())
        .timeout(config.command_timeout)
        .run()?;

    let merged = dnfconf::merge_bootstrap(&read_existing(&dnf_conf));

    Cmd::new("sudo")
        .args(["-n", "tee"])
        .arg(dnf_conf.to_string_lossy())
        .stdin_bytes(merged)
        .timeout(config.command_timeout)
        .run()?;

    Ok(())
}

/// Read the chroot's current dnf.conf, treating unreadable as absent.
fn read_existing(dnf_conf: &Path) -> String {
    // Direct read first; the file is usually world-readable even when
    // root-owned. Fall back to sudo for stricter setups.
    if let Ok(content) = std::fs::read_to_string(dnf_conf) {
        return content;
    }

    Cmd::new("sudo")
        .args(["-n", "cat"])
        .arg(dnf_conf.to_string_lossy())
        .allow_fail()
        .run()
        .map(|r| if r.success() { r.stdout } else { String::new() })
        .unwrap_or_default()
}
