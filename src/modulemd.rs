//! Modulemd document decoding.
//!
//! The modulemd YAML names, per profile, the rpms a built module must carry
//! (`data.profiles.<name>.rpms`) plus the module's public package API
//! (`data.api.rpms`). Decoding validates level by level so a malformed
//! document always fails naming the first key missing along the path.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::BuildError;

#[derive(Debug, Clone, Deserialize)]
struct RawDocument {
    data: Option<RawData>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawData {
    profiles: Option<BTreeMap<String, RawProfile>>,
    api: Option<RawApi>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawProfile {
    rpms: Option<Vec<String>>,
}

#[derive(Debug, Clone, Deserialize)]
struct RawApi {
    rpms: Option<Vec<String>>,
}

/// Validated modulemd document.
#[derive(Debug, Clone)]
pub struct ModuleDoc {
    raw: RawDocument,
}

/// A named profile's required package list, sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleProfile {
    pub name: String,
    pub rpms: Vec<String>,
}

impl ModuleDoc {
    /// Read and decode a modulemd YAML file.
    pub fn load(path: &Path) -> Result<Self, BuildError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            BuildError::schema(
                "data",
                format!("could not read modulemd {}: {e}", path.display()),
            )
        })?;
        Self::from_yaml(&content)
    }

    /// Decode a modulemd document from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self, BuildError> {
        let raw: RawDocument = serde_yaml::from_str(content)
            .map_err(|e| BuildError::schema("data", format!("modulemd is not valid YAML: {e}")))?;
        Ok(Self { raw })
    }

    fn data(&self) -> Result<&RawData, BuildError> {
        self.raw
            .data
            .as_ref()
            .ok_or_else(|| BuildError::schema("data", "key was not found in modulemd document"))
    }

    /// Resolve a profile's required packages, sorted.
    ///
    /// Validation order is fixed: data, profiles, the profile name, rpms,
    /// then non-emptiness; the first missing level is the one reported.
    pub fn profile(&self, name: &str) -> Result<ModuleProfile, BuildError> {
        let profiles = self
            .data()?
            .profiles
            .as_ref()
            .ok_or_else(|| BuildError::schema("profiles", "key was not found in 'data' section"))?;

        let profile = profiles
            .get(name)
            .ok_or_else(|| BuildError::schema(name, "key was not found in 'profiles' section"))?;

        let rpms = profile.rpms.as_ref().ok_or_else(|| {
            BuildError::schema("rpms", format!("key was not found in '{name}' profile"))
        })?;

        if rpms.is_empty() {
            return Err(BuildError::schema(
                "rpms",
                format!("'{name}' profile lists no packages to install"),
            ));
        }

        let mut rpms = rpms.clone();
        rpms.sort();

        Ok(ModuleProfile {
            name: name.to_string(),
            rpms,
        })
    }

    /// The module's public package API (`data.api.rpms`), sorted.
    pub fn api_rpms(&self) -> Result<Vec<String>, BuildError> {
        let api = self
            .data()?
            .api
            .as_ref()
            .ok_or_else(|| BuildError::schema("api", "key was not found in 'data' section"))?;

        let rpms = api
            .rpms
            .as_ref()
            .ok_or_else(|| BuildError::schema("rpms", "key was not found in 'api' section"))?;

        let mut rpms = rpms.clone();
        rpms.sort();
        Ok(rpms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = "\
data:
  api:
    rpms:
      - bash
      - coreutils
      - glibc
  profiles:
    baseimage:
      rpms:
        - coreutils
        - bash
    buildroot:
      rpms:
        - gcc
";

    fn schema_key(err: BuildError) -> String {
        match err {
            BuildError::Schema { key, .. } => key,
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_profile_rpms_sorted() {
        let doc = ModuleDoc::from_yaml(FULL).unwrap();
        let profile = doc.profile("baseimage").unwrap();
        assert_eq!(profile.rpms, vec!["bash", "coreutils"]);
    }

    #[test]
    fn test_api_rpms() {
        let doc = ModuleDoc::from_yaml(FULL).unwrap();
        assert_eq!(doc.api_rpms().unwrap(), vec!["bash", "coreutils", "glibc"]);
    }

    #[test]
    fn test_missing_data_names_data() {
        let doc = ModuleDoc::from_yaml("document: irrelevant\n").unwrap();
        assert_eq!(schema_key(doc.profile("baseimage").unwrap_err()), "data");
    }

    #[test]
    fn test_missing_profiles_names_profiles() {
        let doc = ModuleDoc::from_yaml("data:\n  name: base-runtime\n").unwrap();
        assert_eq!(schema_key(doc.profile("baseimage").unwrap_err()), "profiles");
    }

    #[test]
    fn test_missing_profile_names_profile() {
        let doc = ModuleDoc::from_yaml("data:\n  profiles:\n    other:\n      rpms: [bash]\n")
            .unwrap();
        assert_eq!(schema_key(doc.profile("baseimage").unwrap_err()), "baseimage");
    }

    #[test]
    fn test_missing_rpms_names_rpms() {
        let doc =
            ModuleDoc::from_yaml("data:\n  profiles:\n    baseimage:\n      description: x\n")
                .unwrap();
        assert_eq!(schema_key(doc.profile("baseimage").unwrap_err()), "rpms");
    }

    #[test]
    fn test_empty_rpms_is_schema_error() {
        let doc =
            ModuleDoc::from_yaml("data:\n  profiles:\n    baseimage:\n      rpms: []\n").unwrap();
        let err = doc.profile("baseimage").unwrap_err();
        match err {
            BuildError::Schema { key, detail } => {
                assert_eq!(key, "rpms");
                assert!(detail.contains("no packages"));
            }
            other => panic!("expected Schema error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_api_names_api() {
        let doc = ModuleDoc::from_yaml("data:\n  profiles:\n    p:\n      rpms: [bash]\n").unwrap();
        assert_eq!(schema_key(doc.api_rpms().unwrap_err()), "api");
    }

    #[test]
    fn test_invalid_yaml_is_schema_error() {
        let err = ModuleDoc::from_yaml(": : :").unwrap_err();
        assert!(matches!(err, BuildError::Schema { .. }));
    }
}
