//! Smoke battery for the assembled image.
//!
//! Checks run inside a live container of the final image through the
//! `ModuleRunner` trait, so the battery itself stays independent of docker.
//! Covered areas: basic command execution, required package presence,
//! default locale behavior, user management, and a C compiler round-trip.

use std::path::Path;
use std::time::Duration;

use regex::Regex;

use crate::error::BuildError;
use crate::process::Cmd;

/// Output of one command executed inside the module.
#[derive(Debug, Clone)]
pub struct Exec {
    pub code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl Exec {
    /// Stdout followed by stderr.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }
}

/// Executes commands inside a running instance of the image.
pub trait ModuleRunner {
    /// Run a shell command inside the module.
    fn run(&mut self, cmd: &str) -> Result<Exec, BuildError>;

    /// Copy a host path into the module.
    fn copy_in(&mut self, src: &Path, dest: &str) -> Result<(), BuildError>;
}

/// Expected outcome of a smoke check.
#[derive(Debug, Clone)]
pub enum Expect {
    /// Zero exit status.
    Success,
    /// Nonzero exit status.
    Failure,
    /// Zero exit status and combined output containing the literal.
    Contains(String),
    /// Zero exit status and combined output matching the regex.
    Pattern(String),
    /// Combined output matching the regex; exit status ignored. Used for
    /// locale message checks where the command itself is expected to fail.
    Output(String),
}

/// One command with its expected outcome.
#[derive(Debug, Clone)]
pub struct SmokeCheck {
    pub name: String,
    pub cmd: String,
    pub expect: Expect,
}

impl SmokeCheck {
    fn new(name: &str, cmd: &str, expect: Expect) -> Self {
        Self {
            name: name.to_string(),
            cmd: cmd.to_string(),
            expect,
        }
    }

    /// Evaluate an execution result against the expectation.
    fn evaluate(&self, exec: &Exec) -> Result<(), String> {
        let combined = exec.combined();
        let ok = match &self.expect {
            Expect::Success => exec.code == 0,
            Expect::Failure => exec.code != 0,
            Expect::Contains(literal) => exec.code == 0 && combined.contains(literal),
            Expect::Pattern(pattern) => {
                let re = Regex::new(pattern).map_err(|e| format!("bad pattern: {e}"))?;
                exec.code == 0 && re.is_match(&combined)
            }
            Expect::Output(pattern) => {
                let re = Regex::new(pattern).map_err(|e| format!("bad pattern: {e}"))?;
                re.is_match(&combined)
            }
        };

        if ok {
            Ok(())
        } else {
            Err(format!(
                "'{}' returned exit status {}; output:\n{}",
                self.cmd, exec.code, combined
            ))
        }
    }
}

/// Aggregated smoke results.
#[derive(Debug, Default)]
pub struct SmokeReport {
    pub checked: usize,
    pub failures: Vec<String>,
}

impl SmokeReport {
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Basic pass/fail commands.
pub fn smoke_battery() -> Vec<SmokeCheck> {
    vec![
        SmokeCheck::new("hello", "echo 'Hello, World!'", Expect::Success),
        SmokeCheck::new("release file", "cat /etc/redhat-release", Expect::Success),
        SmokeCheck::new(
            "os release",
            "cat /etc/os-release",
            Expect::Pattern("NAME=".to_string()),
        ),
        SmokeCheck::new("glibc installed", "rpm -q glibc", Expect::Success),
        SmokeCheck::new("failing command fails", "exit 1", Expect::Failure),
    ]
}

/// Default locale checks: LANG must be C.utf8 and glibc must respond in the
/// default locale, including error messages from failing commands.
pub fn locale_battery() -> Vec<SmokeCheck> {
    vec![
        SmokeCheck::new("default LANG", "echo $LANG", Expect::Pattern(r"C\.utf8".to_string())),
        SmokeCheck::new(
            "default ls message",
            "ls /invalid_path",
            Expect::Output("No such file or directory".to_string()),
        ),
        SmokeCheck::new(
            "default cp message",
            "cp invalid_file tmp",
            Expect::Output("No such file or directory".to_string()),
        ),
        SmokeCheck::new(
            "default locale date",
            "date -u -d \"2017-03-31\"",
            Expect::Contains("Fri Mar 31 00:00:00 UTC 2017".to_string()),
        ),
        SmokeCheck::new(
            "default rm prompt",
            "touch file; yes | rm -i file",
            Expect::Output("remove regular empty file".to_string()),
        ),
        SmokeCheck::new(
            "default locale numfmt",
            "numfmt --grouping 1234567890.98",
            Expect::Contains("1234567890.98".to_string()),
        ),
    ]
}

/// A glibc langpack with the checks that depend on it.
#[derive(Debug, Clone)]
pub struct LangpackSuite {
    pub langpack: String,
    pub checks: Vec<SmokeCheck>,
}

/// The english and spanish locale suites; each installs its langpack,
/// runs the checks, and removes the langpack again.
pub fn langpack_suites() -> Vec<LangpackSuite> {
    vec![
        LangpackSuite {
            langpack: "glibc-langpack-en".to_string(),
            checks: vec![
                SmokeCheck::new(
                    "english ls message",
                    "LC_ALL=en_US ls /invalid_path",
                    Expect::Output("No such file or directory".to_string()),
                ),
                SmokeCheck::new(
                    "english cp message",
                    "LC_ALL=en_US cp invalid_file tmp",
                    Expect::Output("No such file or directory".to_string()),
                ),
                SmokeCheck::new(
                    "english date",
                    "LC_ALL=en_US date -u -d \"2017-03-31\"",
                    Expect::Output("Fri Mar 31 00:00:00 UTC 2017".to_string()),
                ),
                SmokeCheck::new(
                    "english rm prompt",
                    "touch file; yes | LC_ALL=en_US rm -i file",
                    Expect::Output("remove regular empty file".to_string()),
                ),
                SmokeCheck::new(
                    "english numfmt grouping",
                    "LC_ALL=en_US numfmt --grouping 1234567890.98",
                    Expect::Output(r"1,234,567,890\.98".to_string()),
                ),
            ],
        },
        LangpackSuite {
            langpack: "glibc-langpack-es".to_string(),
            checks: vec![
                SmokeCheck::new(
                    "spanish ls message",
                    "LC_ALL=es_ES ls /invalid_path",
                    Expect::Output("No existe el fichero o el directorio".to_string()),
                ),
                SmokeCheck::new(
                    "spanish cp message",
                    "LC_ALL=es_ES cp invalid_file tmp",
                    Expect::Output("No existe el fichero o el directorio".to_string()),
                ),
                SmokeCheck::new(
                    "spanish date",
                    "LC_ALL=es_ES date -u -d \"2017-03-31\"",
                    Expect::Output("vie mar 31 00:00:00 UTC 2017".to_string()),
                ),
                SmokeCheck::new(
                    "spanish numfmt grouping",
                    "LC_ALL=es_ES numfmt --grouping 1234567890,98",
                    Expect::Output(r"1\.234\.567\.890,98".to_string()),
                ),
            ],
        },
    ]
}

/// Install each langpack, run its locale checks, and remove it again.
///
/// A failed install records a failure and skips that suite's checks; the
/// other suites still run.
pub fn run_langpack_suites(
    runner: &mut dyn ModuleRunner,
    report: &mut SmokeReport,
) -> Result<(), BuildError> {
    for suite in langpack_suites() {
        let install = runner.run(&format!("microdnf install -y {}", suite.langpack))?;
        report.checked += 1;
        if install.code != 0 {
            report.failures.push(format!(
                "could not install {}:\n{}",
                suite.langpack,
                install.combined()
            ));
            continue;
        }

        run_battery(runner, &suite.checks, report)?;

        let remove = runner.run(&format!("microdnf remove -y {}", suite.langpack))?;
        report.checked += 1;
        if remove.code != 0 {
            report.failures.push(format!(
                "could not remove {}:\n{}",
                suite.langpack,
                remove.combined()
            ));
        }
    }
    Ok(())
}

/// dnf round-trip: install dnf with microdnf, install and remove a package
/// with it, then remove dnf again.
pub fn dnf_battery() -> Vec<SmokeCheck> {
    vec![
        SmokeCheck::new("install dnf", "microdnf install -y dnf", Expect::Success),
        SmokeCheck::new("dnf installs a package", "dnf install -y tar", Expect::Success),
        SmokeCheck::new("dnf removes a package", "dnf remove -y tar", Expect::Success),
        SmokeCheck::new("remove dnf", "microdnf remove -y dnf", Expect::Success),
    ]
}

/// User add/modify/delete sequence.
pub fn user_battery(user: &str) -> Vec<SmokeCheck> {
    vec![
        SmokeCheck::new("add user", &format!("adduser {user}"), Expect::Success),
        SmokeCheck::new(
            "user in passwd",
            &format!("grep {user} /etc/passwd"),
            Expect::Success,
        ),
        SmokeCheck::new("home created", &format!("ls /home/{user}"), Expect::Success),
        SmokeCheck::new(
            "set password",
            &format!("usermod --password testpassword {user}"),
            Expect::Success,
        ),
        SmokeCheck::new(
            "user can write home",
            &format!("su - {user} -c \"touch ~/testfile.txt\""),
            Expect::Success,
        ),
        SmokeCheck::new(
            "remove user",
            &format!("userdel -r {user}"),
            Expect::Success,
        ),
        SmokeCheck::new(
            "home removed",
            &format!("ls /home/{user}"),
            Expect::Failure,
        ),
        SmokeCheck::new(
            "user gone from passwd",
            &format!("grep {user} /etc/passwd"),
            Expect::Failure,
        ),
    ]
}

/// Run a battery of checks, collecting failures into the report.
pub fn run_battery(
    runner: &mut dyn ModuleRunner,
    checks: &[SmokeCheck],
    report: &mut SmokeReport,
) -> Result<(), BuildError> {
    for check in checks {
        let exec = runner.run(&check.cmd)?;
        report.checked += 1;
        match check.evaluate(&exec) {
            Ok(()) => println!("ok: {}", check.name),
            Err(detail) => {
                println!("FAIL: {}", check.name);
                report.failures.push(format!("{}: {}", check.name, detail));
            }
        }
    }
    Ok(())
}

/// Verify every profile rpm is installed in the image.
pub fn check_required_packages(
    runner: &mut dyn ModuleRunner,
    required: &[String],
    report: &mut SmokeReport,
) -> Result<(), BuildError> {
    let exec = runner.run("rpm -qa --qf '%{name}\\n'")?;
    report.checked += 1;

    if exec.code != 0 {
        report
            .failures
            .push(format!("could not list installed packages:\n{}", exec.combined()));
        return Ok(());
    }

    let installed: Vec<&str> = exec
        .stdout
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    for pkg in required {
        if !installed.contains(&pkg.as_str()) {
            report
                .failures
                .push(format!("required package '{pkg}' is not installed"));
        }
    }
    Ok(())
}

const HELLO_C: &str = "\
#include <stdio.h>

int main(void)
{
    printf(\"Hello, world!\\n\");
    return 0;
}
";

const HELLO_MAKEFILE: &str = "\
hello: hello.c
\tcc -o hello hello.c
";

/// Compiler round-trip: install the toolchain, copy in a tiny C project,
/// build it, and require the exact expected stdout from the binary.
pub fn compiler_check(
    runner: &mut dyn ModuleRunner,
    report: &mut SmokeReport,
) -> Result<(), BuildError> {
    let staging = tempfile::tempdir()
        .map_err(|e| BuildError::io("creating compiler check staging directory", e))?;
    std::fs::write(staging.path().join("hello.c"), HELLO_C)
        .map_err(|e| BuildError::io("writing hello.c", e))?;
    std::fs::write(staging.path().join("Makefile"), HELLO_MAKEFILE)
        .map_err(|e| BuildError::io("writing Makefile", e))?;

    let install = runner.run("microdnf install -y gcc make 1>&2")?;
    report.checked += 1;
    if install.code != 0 {
        report.failures.push(format!(
            "could not install compiler toolchain:\n{}",
            install.combined()
        ));
        return Ok(());
    }

    runner.copy_in(staging.path(), "/mnt")?;

    // Build noise goes to stderr; stdout must be exactly the greeting.
    let exec = runner.run("cd /mnt && make 1>&2 && ./hello")?;
    report.checked += 1;

    if exec.code != 0 {
        report.failures.push(format!(
            "compiler round-trip failed with exit status {}:\n{}",
            exec.code,
            exec.combined()
        ));
    } else if exec.stdout != "Hello, world!\n" {
        report.failures.push(format!(
            "compiler round-trip produced unexpected stdout: {:?}",
            exec.stdout
        ));
    }
    Ok(())
}

/// Run the full smoke suite against a runner.
pub fn run_smoke(
    runner: &mut dyn ModuleRunner,
    required_packages: &[String],
) -> Result<SmokeReport, BuildError> {
    let mut report = SmokeReport::default();

    run_battery(runner, &smoke_battery(), &mut report)?;
    run_battery(runner, &locale_battery(), &mut report)?;
    run_langpack_suites(runner, &mut report)?;
    run_battery(runner, &user_battery("usertest"), &mut report)?;
    run_battery(runner, &dnf_battery(), &mut report)?;
    check_required_packages(runner, required_packages, &mut report)?;
    compiler_check(runner, &mut report)?;

    Ok(report)
}

/// Runner backed by a detached docker container of the image.
pub struct DockerRunner {
    container: String,
    timeout: Duration,
}

impl DockerRunner {
    /// Start a container of `image` that idles until removed.
    pub fn start(image: &str, timeout: Duration) -> Result<Self, BuildError> {
        let result = Cmd::new("docker")
            .args(["run", "-d", image, "sleep", "infinity"])
            .timeout(timeout)
            .run()?;

        Ok(Self {
            container: result.stdout_trimmed().to_string(),
            timeout,
        })
    }

    /// Container id.
    pub fn container(&self) -> &str {
        &self.container
    }
}

impl ModuleRunner for DockerRunner {
    fn run(&mut self, cmd: &str) -> Result<Exec, BuildError> {
        let result = Cmd::new("docker")
            .args(["exec", &self.container, "sh", "-c", cmd])
            .timeout(self.timeout)
            .allow_fail()
            .run()?;

        Ok(Exec {
            code: result.code(),
            stdout: result.stdout,
            stderr: result.stderr,
        })
    }

    fn copy_in(&mut self, src: &Path, dest: &str) -> Result<(), BuildError> {
        Cmd::new("docker")
            .arg("cp")
            .arg(format!("{}/.", src.display()))
            .arg(format!("{}:{}", self.container, dest))
            .timeout(self.timeout)
            .run()?;
        Ok(())
    }
}

impl Drop for DockerRunner {
    fn drop(&mut self) {
        let _ = Cmd::new("docker")
            .args(["rm", "-f", &self.container])
            .allow_fail()
            .run();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exec(code: i32, stdout: &str, stderr: &str) -> Exec {
        Exec {
            code,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
        }
    }

    #[test]
    fn test_expect_success() {
        let check = SmokeCheck::new("t", "true", Expect::Success);
        assert!(check.evaluate(&exec(0, "", "")).is_ok());
        assert!(check.evaluate(&exec(1, "", "")).is_err());
    }

    #[test]
    fn test_expect_failure() {
        let check = SmokeCheck::new("t", "exit 1", Expect::Failure);
        assert!(check.evaluate(&exec(1, "", "")).is_ok());
        assert!(check.evaluate(&exec(0, "", "")).is_err());
    }

    #[test]
    fn test_expect_contains_uses_combined_output() {
        let check = SmokeCheck::new("t", "cmd", Expect::Contains("needle".to_string()));
        assert!(check.evaluate(&exec(0, "", "has needle here")).is_ok());
        assert!(check.evaluate(&exec(0, "nothing", "")).is_err());
        // Nonzero exit fails even when the literal is present.
        assert!(check.evaluate(&exec(2, "needle", "")).is_err());
    }

    #[test]
    fn test_expect_pattern() {
        let check = SmokeCheck::new("t", "echo $LANG", Expect::Pattern(r"C\.utf8".to_string()));
        assert!(check.evaluate(&exec(0, "C.utf8\n", "")).is_ok());
        assert!(check.evaluate(&exec(0, "en_US.UTF-8\n", "")).is_err());
    }

    #[test]
    fn test_expect_output_ignores_exit_code() {
        let check = SmokeCheck::new(
            "t",
            "ls /invalid_path",
            Expect::Output("No such file or directory".to_string()),
        );
        // ls fails, but the localized message is what matters.
        assert!(check
            .evaluate(&exec(2, "", "ls: cannot access '/invalid_path': No such file or directory\n"))
            .is_ok());
        assert!(check.evaluate(&exec(2, "", "mensaje en otro idioma\n")).is_err());
    }

    #[test]
    fn test_langpack_suites_cover_english_and_spanish() {
        let suites = langpack_suites();
        let packs: Vec<&str> = suites.iter().map(|s| s.langpack.as_str()).collect();
        assert_eq!(packs, vec!["glibc-langpack-en", "glibc-langpack-es"]);
        assert!(suites.iter().all(|s| !s.checks.is_empty()));
    }
}
