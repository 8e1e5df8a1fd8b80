// src/process/mod.rs

//! Process runner.
//!
//! Tests shell out for two kinds of work: short, bounded commands
//! (`kubectl apply`, `helm install`) that must never hang the suite, and
//! long-lived companions (`kubectl port-forward`, `kubectl proxy`) that run
//! in the background and are shut down explicitly. Both are described with
//! the same [`Cmd`] builder.
//!
//! - [`command`] holds the builder, its options and the printable command line.
//! - [`managed`] owns the child process and its lifecycle state machine.
//! - [`sink`] drains stdout/stderr into capture buffers, the terminal or logs.
//! - [`error`] is the process failure taxonomy.

pub mod command;
pub mod error;
pub mod managed;
pub mod sink;

pub use command::{Cmd, CmdOptions, CommandLine, DEFAULT_STOP_GRACE, DEFAULT_TIMEOUT};
pub use error::ProcessError;
pub use managed::{ManagedProcess, ProcessState};
pub use sink::{CaptureBuffer, OutputSink, Stream};
