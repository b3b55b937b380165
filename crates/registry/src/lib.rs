#![cfg_attr(doc, allow(rustdoc::private_intra_doc_links))]
//! Registry of binary format rules.
//!
//! # Purpose
//!
//! Maps a candidate file (its probe window and name) to the first registered [`Rule`] that
//! recognizes it, while rules are concurrently added, toggled and removed.
//!
//! # Mental Model
//!
//! 1. **Arena:** every registered record lives in a slab slot next to its `users` count.
//!    Slots are addressed by [`RuleId`], which pairs the slab key with a generation so a
//!    stale id never resolves to a later record that reused the key.
//! 2. **Order:** a separate vector of ids records registration order; lookups walk it and
//!    the first enabled match wins.
//! 3. **Handles:** a lookup hit bumps `users` before the reader lock is released and
//!    returns a [`Handle`]. Dropping the handle releases that hold.
//! 4. **Two-phase removal:** [`Registry::remove`] unlinks the id from the order under the
//!    writer lock, then releases the registry's own hold. Whichever of "removal" or "last
//!    handle dropped" comes last finalizes the record: its preopened interpreter is closed
//!    and its slot freed.
//!
//! # Key Types
//!
//! | Type | Role |
//! |------|------|
//! | [`Registry`] | Ordered arena behind a reader/writer lock plus the global switch. |
//! | [`RuleId`] | Generation-checked slot identifier. |
//! | [`Handle`] | Counted hold on one record; releases on drop. |
//!
//! # Concurrency
//!
//! - **Reads:** `lookup` and `get` take the shared lock only for the scan and the counter
//!   increment.
//! - **Writes:** `insert`, `remove` and `remove_all` take the exclusive lock. Finalization
//!   runs after the exclusive section has been left and takes it again only to free the
//!   slot, never recursively.
//! - Per-record enable bits and the global switch are atomics and never touch the lock.
//!
//! # Invariants
//!
//! - A record is reachable from lookup iff it is linked.
//!   - Enforced in: [`Registry::remove`], [`Registry::remove_all`].
//!   - Tested by: `invariants::test_unlinked_never_found`
//! - `users` never reaches zero while a handle is alive, and finalization runs exactly once,
//!   only after unlinking.
//!   - Enforced in: [`Registry::release`].
//!   - Tested by: `invariants::test_removal_deferred_until_release`,
//!     `invariants::test_concurrent_lookup_and_churn`
//! - Lookups honour registration order.
//!   - Enforced in: [`Registry::insert`] (append only).
//!   - Tested by: `tests::first_registered_wins`

mod arena;
mod handle;
mod registry;

pub use arena::RuleId;
pub use binfmt_primitives::Rule;
pub use handle::Handle;
pub use registry::Registry;

#[cfg(test)]
mod invariants;
