use std::sync::Arc;
use std::sync::atomic::Ordering;

use binfmt_primitives::Rule;

use crate::arena::{RuleId, Slot};
use crate::registry::Registry;

/// A counted hold on a registered record.
///
/// The record stays valid for as long as the handle lives, even if it is removed from the
/// registry in the meantime. Dropping the handle releases the hold exactly once.
pub struct Handle<'r> {
	pub(crate) registry: &'r Registry,
	pub(crate) id: RuleId,
	pub(crate) slot: Arc<Slot>,
}

impl Handle<'_> {
	/// Identifier of the held record.
	pub fn id(&self) -> RuleId {
		self.id
	}

	/// Returns true while the record is still reachable from lookups.
	pub fn is_linked(&self) -> bool {
		self.slot.is_linked()
	}

	/// Current number of holders, registry membership included.
	pub fn users(&self) -> usize {
		self.slot.users.load(Ordering::Acquire)
	}

	/// Releases the hold now instead of at end of scope.
	pub fn release(self) {}
}

impl Clone for Handle<'_> {
	fn clone(&self) -> Self {
		self.slot.users.fetch_add(1, Ordering::AcqRel);
		Self {
			registry: self.registry,
			id: self.id,
			slot: Arc::clone(&self.slot),
		}
	}
}

impl std::ops::Deref for Handle<'_> {
	type Target = Rule;

	fn deref(&self) -> &Rule {
		&self.slot.rule
	}
}

impl std::fmt::Debug for Handle<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Handle")
			.field("id", &self.id)
			.field("name", &self.slot.rule.name())
			.field("linked", &self.is_linked())
			.finish()
	}
}

impl Drop for Handle<'_> {
	fn drop(&mut self) {
		self.registry.release(self.id, &self.slot);
	}
}
