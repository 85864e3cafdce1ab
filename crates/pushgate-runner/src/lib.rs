//! Process execution for pushgate.
//!
//! Every git invocation goes through [`CommandSpec`] and a [`ProcessRunner`]
//! with an explicit timeout, so a hung repository operation turns into a
//! [`RunnerError::Timeout`] rather than a hung push.
//!
//! # Security Model
//!
//! Arguments are passed as discrete argv elements; no shell is ever involved.
//! Ref names and paths reach git exactly as received.

pub mod command_spec;
pub mod error;
pub mod native;
pub mod process;

#[cfg(any(test, feature = "test-utils"))]
pub mod scripted;

pub use command_spec::CommandSpec;
pub use error::{RunnerError, ceil_secs};
pub use native::NativeRunner;
pub use process::{ProcessOutput, ProcessRunner};

#[cfg(any(test, feature = "test-utils"))]
pub use scripted::ScriptedRunner;
