//! Stale artifact cleanup.
//!
//! A build must start from nothing: no containers using the target image,
//! no previous image under either name, no leftover mock chroot. Cleanup
//! failure blocks the run entirely rather than risking a partial-state
//! build.

use std::time::Duration;

use serde::Deserialize;

use crate::config::Config;
use crate::error::BuildError;
use crate::process::Cmd;

/// One line of `docker ps --format '{{json .}}'` output.
#[derive(Debug, Deserialize)]
struct ContainerLine {
    #[serde(rename = "ID")]
    id: String,
}

/// Remove every artifact a previous run may have left behind.
pub fn cleanup_artifacts(config: &Config) -> Result<(), BuildError> {
    let timeout = config.command_timeout;

    remove_image_and_containers(&config.image_name, timeout)?;
    remove_image_and_containers(&config.scratch_image(), timeout)?;

    println!("Cleaning mock chroot...");
    Cmd::new("mock")
        .arg("-r")
        .arg(config.mock_config.to_string_lossy())
        .arg("--clean")
        .timeout(timeout)
        .run()?;

    Ok(())
}

/// Remove containers created from `image`, then the image itself.
fn remove_image_and_containers(image: &str, timeout: Duration) -> Result<(), BuildError> {
    let listing = Cmd::new("docker")
        .args(["ps", "-a", "--filter"])
        .arg(format!("ancestor={image}"))
        .args(["--format", "{{json .}}"])
        .timeout(timeout)
        .run()?;

    for id in container_ids(&listing.stdout) {
        println!("Removing container {id}...");
        Cmd::new("docker")
            .args(["rm", "-f"])
            .arg(&id)
            .timeout(timeout)
            .run()?;
    }

    let existing = Cmd::new("docker")
        .args(["images", "-q"])
        .arg(image)
        .timeout(timeout)
        .run()?;

    if !existing.stdout_trimmed().is_empty() {
        println!("Removing image {image}...");
        Cmd::new("docker")
            .args(["rmi", "-f"])
            .arg(image)
            .timeout(timeout)
            .run()?;
    }

    Ok(())
}

/// Parse container ids from json-lines `docker ps` output.
fn container_ids(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| serde_json::from_str::<ContainerLine>(line).ok())
        .map(|c| c.id)
        .collect()
}
