//! External command execution with captured output and bounded runtime.
//!
//! Every external tool the pipeline drives (mock, docker, tar, sudo) goes
//! through `Cmd`, which captures stdout and stderr, enforces an optional
//! deadline, and turns nonzero exits into `BuildError::Command` carrying the
//! full command line and combined output.

use std::io::{Read, Write};
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::time::{Duration, Instant};

use crate::error::BuildError;

/// How often to poll a running child when a deadline is set.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Result of a command execution.
#[derive(Debug, Clone)]
pub struct CommandResult {
    /// Exit status of the command.
    pub status: ExitStatus,
    /// Captured stdout as a string.
    pub stdout: String,
    /// Captured stderr as a string.
    pub stderr: String,
}

impl CommandResult {
    /// Returns true if the command exited successfully.
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Get the exit code, or -1 if terminated by signal.
    pub fn code(&self) -> i32 {
        self.status.code().unwrap_or(-1)
    }

    /// Stdout followed by stderr, the way the build log reports output.
    pub fn combined(&self) -> String {
        let mut out = self.stdout.clone();
        out.push_str(&self.stderr);
        out
    }

    /// Get stdout, trimmed of whitespace.
    pub fn stdout_trimmed(&self) -> &str {
        self.stdout.trim()
    }
}

/// Builder for configuring command execution.
pub struct Cmd {
    program: String,
    args: Vec<String>,
    current_dir: Option<std::path::PathBuf>,
    stdin_data: Option<Vec<u8>>,
    timeout: Option<Duration>,
    /// If true, don't fail on non-zero exit.
    allow_fail: bool,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new(program: impl AsRef<str>) -> Self {
        Self {
            program: program.as_ref().to_string(),
            args: Vec::new(),
            current_dir: None,
            stdin_data: None,
            timeout: None,
            allow_fail: false,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<str>) -> Self {
        self.args.push(arg.as_ref().to_string());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            self.args.push(arg.as_ref().to_string());
        }
        self
    }

    /// Set the working directory.
    pub fn dir(mut self, dir: &Path) -> Self {
        self.current_dir = Some(dir.to_path_buf());
        self
    }

    /// Feed the given bytes to the child's stdin.
    pub fn stdin_bytes(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.stdin_data = Some(data.into());
        self
    }

    /// Kill the child and fail with `BuildError::Timeout` after `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Allow non-zero exit codes without failing.
    pub fn allow_fail(mut self) -> Self {
        self.allow_fail = true;
        self
    }

    /// Render the command line for diagnostics.
    fn command_line(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            line.push_str(arg);
        }
        line
    }

    /// Run the command and capture output.
    pub fn run(self) -> Result<CommandResult, BuildError> {
        let command_line = self.command_line();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd.stdin(if self.stdin_data.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        });

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| BuildError::Launch {
            command: command_line.clone(),
            source,
        })?;

        // Drain the pipes on threads so a chatty child can't block on a
        // full pipe while we wait for it.
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();
        let stdout_reader = std::thread::spawn(move || read_all(stdout_pipe));
        let stderr_reader = std::thread::spawn(move || read_all(stderr_pipe));

        if let Some(data) = self.stdin_data {
            if let Some(mut stdin) = child.stdin.take() {
                // The child may exit without reading; a broken pipe here
                // shows up in the exit status instead.
                let _ = stdin.write_all(&data);
            }
        }

        let status = match self.timeout {
            None => child.wait().map_err(|source| BuildError::Launch {
                command: command_line.clone(),
                source,
            })?,
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                loop {
                    match child.try_wait() {
                        Ok(Some(status)) => break status,
                        Ok(None) => {
                            if Instant::now() >= deadline {
                                let _ = child.kill();
                                let _ = child.wait();
                                return Err(BuildError::Timeout {
                                    command: command_line,
                                    secs: timeout.as_secs(),
                                });
                            }
                            std::thread::sleep(POLL_INTERVAL);
                        }
                        Err(source) => {
                            return Err(BuildError::Launch {
                                command: command_line,
                                source,
                            })
                        }
                    }
                }
            }
        };

        let stdout = stdout_reader.join().unwrap_or_default();
        let stderr = stderr_reader.join().unwrap_or_default();

        let result = CommandResult {
            status,
            stdout,
            stderr,
        };

        if !self.allow_fail && !result.success() {
            return Err(BuildError::Command {
                command: command_line,
                code: result.code(),
                output: result.combined(),
            });
        }

        Ok(result)
    }
}

fn read_all(pipe: Option<impl Read>) -> String {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_end(&mut buf);
    }
    String::from_utf8_lossy(&buf).into_owned()
}

/// Run a command with arguments. Fails with captured output on error.
pub fn run<I, S>(program: &str, args: I) -> Result<CommandResult, BuildError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Cmd::new(program).args(args).run()
}

/// Run a shell command via `sh -c`.
pub fn shell(command: &str) -> Result<CommandResult, BuildError> {
    run("sh", ["-c", command])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_success() {
        let result = run("echo", ["hello"]).unwrap();
        assert!(result.success());
        assert_eq!(result.stdout_trimmed(), "hello");
    }

    #[test]
    fn test_run_captures_stderr() {
        let result = Cmd::new("ls")
            .arg("/nonexistent_path_12345")
            .allow_fail()
            .run()
            .unwrap();

        assert!(!result.success());
        assert!(!result.stderr.is_empty());
    }

    #[test]
    fn test_nonzero_exit_is_command_error() {
        let err = run("ls", ["/nonexistent_path_12345"]).unwrap_err();
        match err {
            BuildError::Command {
                command,
                code,
                output,
            } => {
                assert!(command.starts_with("ls"));
                assert_ne!(code, 0);
                assert!(output.contains("No such file") || output.contains("cannot access"));
            }
            other => panic!("expected Command error, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_program_is_launch_error() {
        let err = run("nonexistent_program_12345", [] as [&str; 0]).unwrap_err();
        assert!(matches!(err, BuildError::Launch { .. }));
    }

    #[test]
    fn test_shell_command() {
        let result = shell("echo hello && echo world").unwrap();
        assert!(result.success());
        assert!(result.stdout.contains("hello"));
        assert!(result.stdout.contains("world"));
    }

    #[test]
    fn test_stdin_payload() {
        let result = Cmd::new("cat").stdin_bytes("from stdin").run().unwrap();
        assert_eq!(result.stdout_trimmed(), "from stdin");
    }

    #[test]
    fn test_combined_output_order() {
        let result = shell("echo out; echo err 1>&2").unwrap();
        let combined = result.combined();
        assert!(combined.contains("out"));
        assert!(combined.contains("err"));
    }

    #[test]
    fn test_timeout_kills_child() {
        let err = Cmd::new("sleep")
            .arg("30")
            .timeout(Duration::from_millis(200))
            .run()
            .unwrap_err();

        match err {
            BuildError::Timeout { command, .. } => assert!(command.starts_with("sleep")),
            other => panic!("expected Timeout error, got {other:?}"),
        }
    }

    #[test]
    fn test_timeout_not_hit() {
        let result = Cmd::new("echo")
            .arg("quick")
            .timeout(Duration::from_secs(10))
            .run()
            .unwrap();
        assert_eq!(result.stdout_trimmed(), "quick");
    }

    #[test]
    fn test_allow_fail() {
        let result = Cmd::new("false").allow_fail().run().unwrap();
        assert!(!result.success());
        assert_eq!(result.code(), 1);
    }

    #[test]
    fn test_run_in_directory() {
        let result = Cmd::new("pwd").dir(Path::new("/tmp")).run().unwrap();
        assert!(result.stdout_trimmed().contains("tmp"));
    }
}
