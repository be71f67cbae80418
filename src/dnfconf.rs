//! dnf configuration bootstrap for the chroot.
//!
//! The imported image carries only a lightweight package manager, so the
//! chroot gets a minimal /etc/dnf/dnf.conf before it is archived. The
//! `[main]` section is ours to own; any other section already present in
//! the chroot (repo definitions written by mock) is preserved verbatim.

/// Settings written to the `[main]` section of the chroot's dnf.conf.
pub const BOOTSTRAP_MAIN: &str = "\
[main]
gpgcheck=1
installonly_limit=3
clean_requirements_on_remove=True
";

/// Strip the `[main]` section from a dnf.conf, keeping all other sections
/// byte-identical.
pub fn strip_main_section(content: &str) -> String {
    let mut out = String::new();
    let mut in_main = false;

    for line in content.split_inclusive('\n') {
        if let Some(name) = section_name(line) {
            in_main = name == "main";
        }
        if !in_main {
            out.push_str(line);
        }
    }

    out
}

/// Section name of a `[name]` header line, tolerating trailing content
/// such as whitespace or comments after the closing bracket.
fn section_name(line: &str) -> Option<&str> {
    let rest = line.trim().strip_prefix('[')?;
    let end = rest.find(']')?;
    Some(rest[..end].trim())
}

/// Merge the bootstrap `[main]` section with whatever non-main sections an
/// existing dnf.conf carries.
pub fn merge_bootstrap(existing: &str) -> String {
    let rest = strip_main_section(existing);
    let mut out = String::from(BOOTSTRAP_MAIN);
    if !rest.is_empty() {
        out.push_str(&rest);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_removes_main_only() {
        let conf = "\
[main]
gpgcheck=0
keepcache=1
[base-repo]
baseurl=http://example.com/repo
enabled=1
";
        let stripped = strip_main_section(conf);
        assert!(!stripped.contains("gpgcheck"));
        assert!(!stripped.contains("keepcache"));
        assert_eq!(
            stripped,
            "[base-repo]\nbaseurl=http://example.com/repo\nenabled=1\n"
        );
    }

    #[test]
    fn test_strip_handles_main_in_middle() {
        let conf = "\
[repo-a]
baseurl=http://a
[main]
gpgcheck=0
[repo-b]
baseurl=http://b
";
        let stripped = strip_main_section(conf);
        assert_eq!(stripped, "[repo-a]\nbaseurl=http://a\n[repo-b]\nbaseurl=http://b\n");
    }

    #[test]
    fn test_strip_handles_decorated_main_header() {
        let conf = "\
[main] # settings
gpgcheck=0
[repo]
baseurl=http://x
";
        let stripped = strip_main_section(conf);
        assert_eq!(stripped, "[repo]\nbaseurl=http://x\n");

        let padded = "[main]  \ngpgcheck=0\n[repo]\nbaseurl=http://x\n";
        assert_eq!(strip_main_section(padded), "[repo]\nbaseurl=http://x\n");
    }

    #[test]
    fn test_strip_does_not_match_main_prefix_sections() {
        let conf = "[mainline]\nbaseurl=http://x\n[main]\ngpgcheck=0\n";
        assert_eq!(strip_main_section(conf), "[mainline]\nbaseurl=http://x\n");
    }

    #[test]
    fn test_strip_without_main_is_identity() {
        let conf = "[repo]\nbaseurl=http://x\n";
        assert_eq!(strip_main_section(conf), conf);
    }

    #[test]
    fn test_merge_on_empty_is_bootstrap() {
        assert_eq!(merge_bootstrap(""), BOOTSTRAP_MAIN);
    }

    #[test]
    fn test_merge_replaces_main_preserves_repos() {
        let existing = "[main]\ngpgcheck=0\n[repo]\nbaseurl=http://x\n";
        let merged = merge_bootstrap(existing);

        assert!(merged.starts_with("[main]\ngpgcheck=1\n"));
        assert!(merged.contains("installonly_limit=3"));
        assert!(merged.ends_with("[repo]\nbaseurl=http://x\n"));
        assert!(!merged.contains("gpgcheck=0"));
    }
}
