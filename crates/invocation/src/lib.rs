//! Exec-time side of the binfmt registry.
//!
//! [`MiscLoader`] is one candidate loader in an exec pipeline: it looks the candidate up in
//! the [`Registry`](binfmt_registry::Registry) and, on a hit, rewrites the [`ExecRequest`]
//! so that the bound interpreter runs with the original path among its arguments. A miss is
//! reported as [`Outcome::NotRecognized`], which tells the pipeline to try its next loader.
//!
//! [`FsLoader`] opens interpreter programs from the local filesystem.

mod args;
mod dispatch;
mod fs;
mod request;

pub use args::ArgList;
pub use dispatch::{MiscLoader, Outcome};
pub use fs::{Executable, FsLoader};
pub use request::{ExecFlags, ExecRequest};

#[cfg(test)]
mod tests;
