//! Control surfaces over the rule registry.
//!
//! The tree starts with two aggregate nodes, `register` and `status`, and gains one node per
//! registered rule, named after the rule.
//!
//! | Node | Read | Write |
//! |------|------|-------|
//! | `register` | unsupported | a registration line |
//! | `status` | `enabled` or `disabled` | `0`, `1` or `-1`, applied globally |
//! | rule | its status block | `0`, `1` or `-1`, applied to that rule |
//!
//! Structural changes (register, delete, delete-all, shutdown) run inside one coarse
//! section guarding the tree. Enable and disable commands only flip atomics and never wait
//! on it.

mod control;
mod status;
mod tree;

pub use control::Control;
pub use status::render_status;
