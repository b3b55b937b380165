//! Core types for the binary-format dispatch registry: rule records, option flags,
//! the probe window, caller buffers, collaborator traits and the error taxonomy.

/// Caller-supplied byte buffers.
pub mod buffer;
/// Error taxonomy shared by every layer.
pub mod error;
/// Collaborator interfaces for opening interpreter programs.
pub mod exec;
/// Per-rule option flags.
pub mod flags;
/// Fixed-size probe window over a candidate file's leading bytes.
pub mod probe;
/// Rule definitions and registered rule records.
pub mod rule;

pub use buffer::UserBuffer;
pub use error::{Error, Invalid, Result};
pub use exec::{ExecFile, ProgramLoader};
pub use flags::OptionFlags;
pub use probe::ProbeWindow;
pub use rule::{Magic, Matcher, ResourceId, Rule, RuleDef};

/// Size of the probe window handed over by the exec pipeline.
pub const PROBE_WINDOW: usize = 256;

/// Shortest registration buffer accepted by the grammar parser.
pub const MIN_REGISTER_LENGTH: usize = 11;

/// Longest registration buffer accepted by the grammar parser.
///
/// Sized for seven delimiters, a ~50 byte name, a three digit offset, magic and mask at
/// 128 bytes each (512 escaped) and a ~50 byte interpreter path, rounded up.
pub const MAX_REGISTER_LENGTH: usize = 1920;

/// Name of the aggregate control that accepts registrations.
pub const REGISTER_NODE: &str = "register";

/// Name of the aggregate control that exposes the global switch.
pub const STATUS_NODE: &str = "status";
