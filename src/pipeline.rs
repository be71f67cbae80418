//! The build pipeline: reconcile the package set, then build the image.
//!
//! Stages run strictly in sequence, each consuming and returning an explicit
//! context rather than mutating shared state:
//!
//!   prepare   parse the mock config, resolve the profile package set
//!   reconcile rewrite chroot_setup_cmd if the sets differ
//!   provision cleanup, mock --init, dnf bootstrap
//!   assemble  archive, import, build, drop the scratch image
//!
//! The run either produces a named final image (possibly with warnings
//! attached) or aborts with an attributable error. There is no partial
//! success.

use crate::chroot;
use crate::clean;
use crate::config::Config;
use crate::error::{BuildError, BuildWarning};
use crate::image;
use crate::mockcfg::MockConfig;
use crate::modulemd::{ModuleDoc, ModuleProfile};

/// Result of a completed build.
#[derive(Debug)]
pub struct BuildOutcome {
    /// Name of the final tagged image.
    pub image: String,
    /// Non-fatal conditions the caller should surface.
    pub warnings: Vec<BuildWarning>,
}

/// State threaded through the pipeline stages.
#[derive(Debug)]
pub struct PipelineContext<'a> {
    config: &'a Config,
    mockcfg: MockConfig,
    profile: ModuleProfile,
    warnings: Vec<BuildWarning>,
}

impl<'a> PipelineContext<'a> {
    /// Parse the mock configuration and resolve the profile package set.
    pub fn prepare(config: &'a Config) -> Result<Self, BuildError> {
        let mockcfg = MockConfig::parse(&config.mock_config)?;
        println!("mock root: {}", mockcfg.root);

        let doc = ModuleDoc::load(&config.modulemd)?;
        let profile = doc.profile(&config.profile)?;
        println!(
            "profile '{}' requires {} packages",
            profile.name,
            profile.rpms.len()
        );

        Ok(Self {
            config,
            mockcfg,
            profile,
            warnings: Vec::new(),
        })
    }

    /// Rewrite chroot_setup_cmd when the configured set differs from the
    /// profile's. An unparsed directive counts as different.
    pub fn reconcile(mut self) -> Result<Self, BuildError> {
        let configured = self.mockcfg.setup_packages.as_deref();
        if configured == Some(&self.profile.rpms[..]) {
            return Ok(self);
        }

        self.mockcfg.rewrite_setup_cmd(&self.profile.rpms)?;
        println!("Warning: list of packages to be installed by mock changed");
        self.warnings.push(BuildWarning::SetupCommandRewritten {
            packages: self.profile.rpms.clone(),
        });

        // Re-extract so downstream stages see exactly what was written.
        self.mockcfg = MockConfig::parse(&self.config.mock_config)?;
        Ok(self)
    }

    /// Clean stale artifacts and initialize the chroot.
    ///
    /// Cleanup failure is fatal before anything else runs; a build must not
    /// start on top of leftover state.
    pub fn provision(self) -> Result<Self, BuildError> {
        clean::cleanup_artifacts(self.config)
            .map_err(|e| BuildError::Cleanup(e.to_string()))?;
        println!("artifact cleanup successful");

        chroot::init(self.config)?;
        chroot::bootstrap_dnf(self.config, &self.mockcfg)?;
        Ok(self)
    }

    /// Archive the chroot and build the final image.
    pub fn assemble(mut self) -> Result<BuildOutcome, BuildError> {
        let assembly_warnings = image::assemble(self.config, &self.mockcfg)?;
        self.warnings.extend(assembly_warnings);

        Ok(BuildOutcome {
            image: self.config.image_name.clone(),
            warnings: self.warnings,
        })
    }

    /// Current package reconciliation warnings (for inspection in tests).
    pub fn warnings(&self) -> &[BuildWarning] {
        &self.warnings
    }

    /// Parsed mock configuration (for inspection in tests).
    pub fn mockcfg(&self) -> &MockConfig {
        &self.mockcfg
    }
}

/// Run the full build pipeline.
pub fn run_build(config: &Config) -> Result<BuildOutcome, BuildError> {
    PipelineContext::prepare(config)?
        .reconcile()?
        .provision()?
        .assemble()
}
