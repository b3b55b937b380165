use std::ffi::OsStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use binfmt_primitives::{Error, ProbeWindow, ResourceId, Result, Rule};
use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::arena::{Entries, RuleId, Slot};
use crate::handle::Handle;

/// Process-wide rule registry.
///
/// Created empty and enabled. Dropping it removes every remaining record, which finalizes
/// each one once its outstanding handles are gone.
#[derive(Debug)]
pub struct Registry {
	entries: RwLock<Entries>,
	enabled: AtomicBool,
}

impl Default for Registry {
	fn default() -> Self {
		Self::new()
	}
}

impl Registry {
	pub fn new() -> Self {
		Self {
			entries: RwLock::new(Entries::default()),
			enabled: AtomicBool::new(true),
		}
	}

	/// Global switch gating every lookup.
	pub fn is_enabled(&self) -> bool {
		self.enabled.load(Ordering::Acquire)
	}

	/// Flips the global switch; per-record enable bits are left alone.
	pub fn set_enabled(&self, enabled: bool) {
		self.enabled.store(enabled, Ordering::Release);
		debug!(enabled, "registry switch");
	}

	/// Appends a record behind every existing one.
	///
	/// # Errors
	///
	/// [`Error::AlreadyExists`] if a linked record already carries the same name. The
	/// rejected record is dropped, closing any interpreter it holds.
	pub fn insert(&self, rule: Rule) -> Result<RuleId> {
		let mut entries = self.entries.write();
		let taken = entries
			.order
			.iter()
			.filter_map(|&id| entries.slot(id))
			.any(|slot| slot.rule.name() == rule.name());
		if taken {
			return Err(Error::AlreadyExists(rule.name().to_owned()));
		}
		let name = rule.name().to_owned();
		let (id, _) = entries.push(rule);
		debug!(rule = %name, %id, position = entries.order.len() - 1, "inserted");
		Ok(id)
	}

	/// Finds the first enabled record, in registration order, matching the candidate.
	///
	/// Returns `None` when the global switch is off or nothing matches.
	pub fn lookup(&self, probe: &ProbeWindow, filename: impl AsRef<OsStr>) -> Option<Handle<'_>> {
		if !self.is_enabled() {
			return None;
		}
		let filename = filename.as_ref();
		let entries = self.entries.read();
		let (id, slot) = entries.order.iter().find_map(|&id| {
			let slot = entries.slot(id)?;
			let rule = &slot.rule;
			(rule.is_enabled() && rule.matcher().matches(probe, filename)).then_some((id, slot))
		})?;
		slot.users.fetch_add(1, Ordering::AcqRel);
		let slot = Arc::clone(slot);
		drop(entries);

		trace!(rule = %slot.rule.name(), %id, ?filename, "lookup hit");
		Some(Handle {
			registry: self,
			id,
			slot,
		})
	}

	/// Takes a hold on a linked record, enabled or not.
	pub fn get(&self, id: RuleId) -> Option<Handle<'_>> {
		let entries = self.entries.read();
		let slot = entries.linked(id)?;
		slot.users.fetch_add(1, Ordering::AcqRel);
		Some(Handle {
			registry: self,
			id,
			slot: Arc::clone(slot),
		})
	}

	/// Takes a hold on the linked record called `name`.
	pub fn find(&self, name: &str) -> Option<Handle<'_>> {
		let entries = self.entries.read();
		let (id, slot) = entries
			.order
			.iter()
			.filter_map(|&id| Some((id, entries.slot(id)?)))
			.find(|(_, slot)| slot.rule.name() == name)?;
		slot.users.fetch_add(1, Ordering::AcqRel);
		Some(Handle {
			registry: self,
			id,
			slot: Arc::clone(slot),
		})
	}

	/// Sets the enable bit of one record. Returns false if `id` is no longer linked.
	pub fn set_rule_enabled(&self, id: RuleId, enabled: bool) -> bool {
		match self.get(id) {
			Some(handle) => {
				handle.set_enabled(enabled);
				debug!(rule = %handle.name(), enabled, "rule switch");
				true
			}
			None => false,
		}
	}

	/// Unlinks a record and drops the registry's own hold on it.
	///
	/// Idempotent: returns `None` if the record was already unlinked. Otherwise returns the
	/// record's control resource so the caller can detach it.
	pub fn remove(&self, id: RuleId) -> Option<ResourceId> {
		let slot = self.entries.write().unlink(id)?;
		let resource = slot.rule.resource();
		debug!(rule = %slot.rule.name(), %id, "unlinked");
		self.release(id, &slot);
		Some(resource)
	}

	/// Unlinks every record, returning their control resources in registration order.
	pub fn remove_all(&self) -> Vec<ResourceId> {
		let unlinked: Vec<(RuleId, Arc<Slot>)> = {
			let mut entries = self.entries.write();
			let order = entries.order.clone();
			order
				.into_iter()
				.filter_map(|id| Some((id, entries.unlink(id)?)))
				.collect()
		};
		debug!(count = unlinked.len(), "unlinked all");
		unlinked
			.into_iter()
			.map(|(id, slot)| {
				let resource = slot.rule.resource();
				self.release(id, &slot);
				resource
			})
			.collect()
	}

	/// Drops one hold. The last hold on an unlinked record finalizes it.
	///
	/// Must not be called with the registry lock held.
	pub(crate) fn release(&self, id: RuleId, slot: &Slot) {
		let previous = slot.users.fetch_sub(1, Ordering::AcqRel);
		debug_assert!(previous > 0, "released a record with no users");
		if previous != 1 {
			return;
		}
		debug_assert!(!slot.is_linked(), "last hold dropped on a linked record");
		slot.rule.finalize();
		self.entries.write().free(id);
		debug!(rule = %slot.rule.name(), %id, "finalized");
	}

	/// Number of linked records.
	pub fn len(&self) -> usize {
		self.entries.read().order.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	/// Names of linked records in registration order.
	pub fn names(&self) -> Vec<String> {
		let entries = self.entries.read();
		entries
			.order
			.iter()
			.filter_map(|&id| entries.slot(id))
			.map(|slot| slot.rule.name().to_owned())
			.collect()
	}

	/// Number of arena slots still occupied, tombstones included.
	#[cfg(test)]
	pub(crate) fn occupied_slots(&self) -> usize {
		self.entries.read().slots.len()
	}
}

impl Drop for Registry {
	fn drop(&mut self) {
		let removed = self.remove_all();
		if !removed.is_empty() {
			debug!(count = removed.len(), "registry shut down");
		}
	}
}
