// src/process/command.rs

//! Command description and builder.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use crate::process::error::ProcessError;
use crate::process::managed::ManagedProcess;
use crate::process::sink::{CaptureBuffer, OutputSink};

/// Timeout applied to synchronous runs unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// How long `stop_async` waits after SIGTERM before killing outright.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(10);

/// Program plus ordered arguments.
///
/// `Display` renders a shell-like line, quoting empty arguments and arguments
/// containing whitespace or quotes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            let needs_quotes =
                arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || c == '"' || c == '\'');
            if needs_quotes {
                write!(f, " {arg:?}")?;
            } else {
                write!(f, " {arg}")?;
            }
        }
        Ok(())
    }
}

/// Everything about a run except the program and its arguments.
#[derive(Debug, Clone)]
pub struct CmdOptions {
    /// Deadline for synchronous runs. `None` means no forced deadline.
    /// Ignored by `start_async`.
    pub timeout: Option<Duration>,
    /// Merged over the inherited environment.
    pub env: BTreeMap<String, String>,
    pub stdout: Vec<OutputSink>,
    pub stderr: Vec<OutputSink>,
    /// Log the command line at `info` before running it.
    pub print_command: bool,
    pub stop_grace: Duration,
}

impl Default for CmdOptions {
    fn default() -> Self {
        Self {
            timeout: Some(DEFAULT_TIMEOUT),
            env: BTreeMap::new(),
            stdout: Vec::new(),
            stderr: Vec::new(),
            print_command: false,
            stop_grace: DEFAULT_STOP_GRACE,
        }
    }
}

/// Deferred description of an external command.
///
/// ```no_run
/// # async fn demo() -> Result<(), probekit::process::ProcessError> {
/// use std::time::Duration;
/// use probekit::process::{CaptureBuffer, Cmd};
///
/// let out = CaptureBuffer::new();
/// Cmd::new("kubectl")
///     .args(["get", "pods", "-n", "monitoring"])
///     .timeout(Duration::from_secs(30))
///     .capture_stdout(&out)
///     .run()
///     .await?;
/// println!("{}", out.contents());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Cmd {
    command: CommandLine,
    options: CmdOptions,
}

impl Cmd {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            command: CommandLine::new(program),
            options: CmdOptions::default(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.command.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.command.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Replace all options at once (e.g. defaults loaded from config).
    pub fn with_options(mut self, options: CmdOptions) -> Self {
        self.options = options;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.options.timeout = Some(timeout);
        self
    }

    pub fn no_timeout(mut self) -> Self {
        self.options.timeout = None;
        self
    }

    pub fn env(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.env.insert(name.into(), value.into());
        self
    }

    pub fn stdout_sink(mut self, sink: OutputSink) -> Self {
        self.options.stdout.push(sink);
        self
    }

    pub fn stderr_sink(mut self, sink: OutputSink) -> Self {
        self.options.stderr.push(sink);
        self
    }

    pub fn capture_stdout(self, buf: &CaptureBuffer) -> Self {
        self.stdout_sink(OutputSink::Capture(buf.clone()))
    }

    pub fn capture_stderr(self, buf: &CaptureBuffer) -> Self {
        self.stderr_sink(OutputSink::Capture(buf.clone()))
    }

    pub fn print_stdout(self) -> Self {
        self.stdout_sink(OutputSink::Stdout)
    }

    pub fn print_stderr(self) -> Self {
        self.stderr_sink(OutputSink::Stderr)
    }

    pub fn print_output(self) -> Self {
        self.print_stdout().print_stderr()
    }

    /// Mirror both streams into the tracing log.
    pub fn log_output(self) -> Self {
        self.stdout_sink(OutputSink::Log).stderr_sink(OutputSink::Log)
    }

    pub fn print_command(mut self) -> Self {
        self.options.print_command = true;
        self
    }

    pub fn stop_grace(mut self, grace: Duration) -> Self {
        self.options.stop_grace = grace;
        self
    }

    pub fn command_line(&self) -> &CommandLine {
        &self.command
    }

    pub fn options(&self) -> &CmdOptions {
        &self.options
    }

    pub fn into_process(self) -> ManagedProcess {
        ManagedProcess::new(self.command, self.options)
    }

    /// Run to completion. See [`ManagedProcess::run`].
    pub async fn run(self) -> Result<(), ProcessError> {
        self.into_process().run().await
    }

    /// Run to completion and return everything written to stdout.
    pub async fn output(self) -> Result<String, ProcessError> {
        let out = CaptureBuffer::new();
        self.capture_stdout(&out).run().await?;
        Ok(out.contents())
    }

    /// Launch a long-lived helper. See [`ManagedProcess::start_async`].
    pub async fn start_async(self) -> Result<ManagedProcess, ProcessError> {
        let mut process = self.into_process();
        process.start_async().await?;
        Ok(process)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.command.fmt(f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_line_quotes_where_needed() {
        let cmd = Cmd::new("helm").args(["install", "--set", "a=b c", ""]);
        assert_eq!(cmd.to_string(), r#"helm install --set "a=b c" """#);
    }

    #[test]
    fn builder_only_touches_options() {
        let buf = CaptureBuffer::new();
        let cmd = Cmd::new("kubectl")
            .arg("apply")
            .env("KUBECONFIG", "/tmp/kc")
            .no_timeout()
            .capture_stdout(&buf)
            .log_output()
            .print_command();

        assert_eq!(cmd.command_line().args, vec!["apply".to_string()]);
        let opts = cmd.options();
        assert_eq!(opts.timeout, None);
        assert_eq!(opts.env.get("KUBECONFIG").map(String::as_str), Some("/tmp/kc"));
        assert_eq!(opts.stdout.len(), 2);
        assert_eq!(opts.stderr.len(), 1);
        assert!(opts.print_command);
    }

    #[test]
    fn defaults_use_fifteen_second_timeout() {
        let cmd = Cmd::new("true");
        assert_eq!(cmd.options().timeout, Some(DEFAULT_TIMEOUT));
        assert_eq!(cmd.options().stop_grace, DEFAULT_STOP_GRACE);
        assert!(cmd.options().stdout.is_empty());
    }
}
