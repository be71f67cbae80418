//! Image assembly: archive the chroot, import it, build the final image.
//!
//! The chroot is streamed through tar into `docker import` under a scratch
//! name, then a generated Dockerfile layers the locale environment and any
//! configured labels on top. The scratch image is removed no matter how the
//! build step ends.

use std::collections::BTreeMap;
use std::path::Path;

use crate::config::Config;
use crate::error::{BuildError, BuildWarning};
use crate::mockcfg::MockConfig;
use crate::process::Cmd;

/// Archive the chroot and produce the final tagged image.
///
/// Returns the non-fatal warnings gathered along the way (currently only
/// archive completeness).
pub fn assemble(config: &Config, mockcfg: &MockConfig) -> Result<Vec<BuildWarning>, BuildError> {
    let mut warnings = Vec::new();
    let chroot_root = mockcfg.chroot_root(&config.mock_root_dir);
    let scratch = config.scratch_image();

    // Resolve everything that can fail on its own before the scratch image
    // exists; once imported, the only way out is through the rmi below.
    let labels = config
        .load_labels()
        .map_err(|e| BuildError::Config(format!("{e:#}")))?;
    let dockerfile = render_dockerfile(&scratch, &labels);

    let tar_cmd = archive_command(config, &chroot_root, &mut warnings);

    println!("Importing chroot as image {scratch}...");
    Cmd::new("sh")
        .arg("-c")
        .arg(format!("{tar_cmd} | docker import - {scratch}"))
        .timeout(config.command_timeout)
        .run()?;

    println!("Building final image {}...", config.image_name);
    let build_result = Cmd::new("docker")
        .args(["build", "-t", &config.image_name, "-"])
        .stdin_bytes(dockerfile)
        .timeout(config.command_timeout)
        .run();

    // The scratch image must not outlive the build, pass or fail.
    let rmi_result = Cmd::new("docker")
        .args(["rmi", &scratch])
        .timeout(config.command_timeout)
        .run();

    build_result?;
    rmi_result?;

    Ok(warnings)
}

/// Pick the tar command used to archive the chroot.
///
/// Prefers `sudo -n tar` so root-owned content is included; when sudo is
/// unavailable without a prompt, falls back to plain tar and records a
/// completeness warning.
fn archive_command(config: &Config, chroot_root: &Path, warnings: &mut Vec<BuildWarning>) -> String {
    let tar_cmd = format!("tar -C {} -c .", chroot_root.display());

    let probe = Cmd::new("sh")
        .arg("-c")
        .arg(format!("sudo -n {tar_cmd} >/dev/null"))
        .timeout(config.command_timeout)
        .allow_fail()
        .run();

    match probe {
        Ok(result) if result.success() => format!("sudo -n {tar_cmd}"),
        _ => {
            println!("Warning: no sudo rights to run '{tar_cmd}' as root");
            println!(
                "Warning: generated image '{}' may be incomplete",
                config.image_name
            );
            warnings.push(BuildWarning::IncompleteArchive {
                image: config.image_name.clone(),
            });
            tar_cmd
        }
    }
}

/// Render the Dockerfile that layers metadata on the imported chroot.
pub fn render_dockerfile(base_image: &str, labels: &BTreeMap<String, String>) -> String {
    let mut out = format!("FROM {base_image}\n");
    // C.utf8 is the module's default locale; the glibc i18n checks rely on it.
    out.push_str("ENV LANG C.utf8\n");
    for (key, value) in labels {
        out.push_str(&format!("LABEL {key}=\"{value}\"\n"));
    }
    out
}
