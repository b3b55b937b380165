//! Grammar for rule registrations and control commands.
//!
//! A registration is a single buffer whose first byte picks the field delimiter:
//!
//! ```text
//! :name:type:offset:magic:mask:interpreter:flags
//! ```
//!
//! See [`parse_rule`] for the field rules and [`parse_command`] for the `0`/`1`/`-1`
//! command language accepted by the status and per-rule controls.

mod command;
pub mod escape;
mod parser;

pub use command::{Command, parse_command};
pub use parser::{parse_rule, parse_rule_bytes};
