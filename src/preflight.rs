//! Preflight checks: verify host tools before a build.

use std::fmt;

/// Outcome of one preflight check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

/// A named check with its status and optional detail.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub detail: Option<String>,
}

impl CheckResult {
    pub fn pass(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            detail: None,
        }
    }

    pub fn pass_with(name: &str, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Pass,
            detail: Some(detail.to_string()),
        }
    }

    pub fn warn(name: &str, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Warn,
            detail: Some(detail.to_string()),
        }
    }

    pub fn fail(name: &str, detail: &str) -> Self {
        Self {
            name: name.to_string(),
            status: CheckStatus::Fail,
            detail: Some(detail.to_string()),
        }
    }
}

impl fmt::Display for CheckResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.status {
            CheckStatus::Pass => "PASS",
            CheckStatus::Warn => "WARN",
            CheckStatus::Fail => "FAIL",
        };
        match &self.detail {
            Some(detail) => write!(f, "[{tag}] {}: {detail}", self.name),
            None => write!(f, "[{tag}] {}", self.name),
        }
    }
}

/// Check that every host tool the pipeline drives is available.
pub fn check_host_tools() -> Vec<CheckResult> {
    let mut results = Vec::new();

    let required_tools = [
        ("mock", "mock", "Required to build the chroot"),
        ("docker", "docker", "Required to import and build the image"),
        ("tar", "tar", "Required to archive the chroot"),
        ("rpm", "rpm", "Required by the smoke battery"),
    ];

    for (tool, package, purpose) in required_tools {
        results.push(check_tool_exists(tool, package, purpose, true));
    }

    // sudo is optional: without it the archive falls back to unprivileged
    // tar and the image may be incomplete.
    results.push(check_tool_exists(
        "sudo",
        "sudo",
        "Without it the archived chroot may be incomplete",
        false,
    ));

    results
}

/// Check if a tool exists in PATH.
fn check_tool_exists(tool: &str, package: &str, purpose: &str, required: bool) -> CheckResult {
    match which::which(tool) {
        Ok(path) => CheckResult::pass_with(tool, &path.display().to_string()),
        Err(_) => {
            let msg = format!("Not found. Install '{package}' package. {purpose}");
            if required {
                CheckResult::fail(tool, &msg)
            } else {
                CheckResult::warn(tool, &msg)
            }
        }
    }
}

/// True when no check failed outright.
pub fn all_passed(results: &[CheckResult]) -> bool {
    results.iter().all(|r| r.status != CheckStatus::Fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_status_and_name() {
        let result = CheckResult::fail("mock", "Not found");
        let rendered = result.to_string();
        assert!(rendered.contains("FAIL"));
        assert!(rendered.contains("mock"));
    }

    #[test]
    fn test_all_passed_ignores_warnings() {
        let results = vec![CheckResult::pass("a"), CheckResult::warn("b", "meh")];
        assert!(all_passed(&results));
    }

    #[test]
    fn test_all_passed_false_on_failure() {
        let results = vec![CheckResult::pass("a"), CheckResult::fail("b", "missing")];
        assert!(!all_passed(&results));
    }

    #[test]
    fn test_tar_is_found_on_host() {
        // tar exists on any sane build host; exercises the which path.
        let result = check_tool_exists("tar", "tar", "", true);
        assert_eq!(result.status, CheckStatus::Pass);
    }
}
