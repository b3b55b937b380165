//! Slot storage for registered records.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use binfmt_primitives::Rule;
use slab::Slab;

/// Stable identifier of a registered record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RuleId {
	pub(crate) key: usize,
	pub(crate) generation: u64,
}

impl std::fmt::Display for RuleId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}v{}", self.key, self.generation)
	}
}

/// One arena slot: the record plus its hold count.
#[derive(Debug)]
pub(crate) struct Slot {
	pub(crate) rule: Rule,
	pub(crate) generation: u64,
	/// Registry membership counts as one user.
	pub(crate) users: AtomicUsize,
	/// Cleared under the writer lock when the id leaves the order.
	pub(crate) linked: AtomicBool,
}

impl Slot {
	pub(crate) fn new(rule: Rule, generation: u64) -> Self {
		Self {
			rule,
			generation,
			users: AtomicUsize::new(1),
			linked: AtomicBool::new(true),
		}
	}

	pub(crate) fn is_linked(&self) -> bool {
		self.linked.load(Ordering::Acquire)
	}
}

/// Arena contents guarded by the registry lock.
#[derive(Debug, Default)]
pub(crate) struct Entries {
	pub(crate) slots: Slab<Arc<Slot>>,
	/// Linked ids in registration order.
	pub(crate) order: Vec<RuleId>,
	pub(crate) next_generation: u64,
}

impl Entries {
	/// Returns the slot for `id` if it is still the same record.
	pub(crate) fn slot(&self, id: RuleId) -> Option<&Arc<Slot>> {
		self.slots
			.get(id.key)
			.filter(|slot| slot.generation == id.generation)
	}

	/// Returns the slot for `id` if it is still linked.
	pub(crate) fn linked(&self, id: RuleId) -> Option<&Arc<Slot>> {
		self.slot(id).filter(|slot| slot.is_linked())
	}

	pub(crate) fn push(&mut self, rule: Rule) -> (RuleId, Arc<Slot>) {
		let generation = self.next_generation;
		self.next_generation += 1;
		let slot = Arc::new(Slot::new(rule, generation));
		let key = self.slots.insert(Arc::clone(&slot));
		let id = RuleId { key, generation };
		self.order.push(id);
		(id, slot)
	}

	/// Takes `id` out of the order and marks it unlinked. Returns `None` if it already was.
	pub(crate) fn unlink(&mut self, id: RuleId) -> Option<Arc<Slot>> {
		let slot = Arc::clone(self.linked(id)?);
		self.order.retain(|linked| *linked != id);
		slot.linked.store(false, Ordering::Release);
		Some(slot)
	}

	/// Frees the tombstoned slot of a finalized record.
	pub(crate) fn free(&mut self, id: RuleId) {
		if self.slot(id).is_some_and(|slot| !slot.is_linked()) {
			self.slots.remove(id.key);
		}
	}
}
