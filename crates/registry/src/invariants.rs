use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use binfmt_primitives::ProbeWindow;

use crate::Registry;
use crate::tests::{counted_rule, rule};

/// Must make a removed record unreachable from lookups immediately, even while held.
///
/// * Enforced in: `Registry::remove`, `Registry::remove_all`
/// * Failure symptom: a deleted rule keeps rewriting exec requests.
#[cfg_attr(test, test)]
pub(crate) fn test_unlinked_never_found() {
	let registry = Registry::new();
	let id = registry.insert(rule(r":elf:M::\x7fELF::/usr/bin/qemu-elf:", 1)).unwrap();
	let probe = ProbeWindow::from_prefix(b"\x7fELF");

	let held = registry.lookup(&probe, "a.out").unwrap();
	registry.remove(id);

	assert!(!held.is_linked());
	assert!(registry.lookup(&probe, "a.out").is_none());
	assert!(registry.get(id).is_none());
	assert!(registry.find("elf").is_none());
	assert_eq!(held.name(), "elf");
}

/// Must postpone finalization of a removed record until its last handle is dropped, and
/// run it exactly once.
///
/// * Enforced in: `Registry::release`
/// * Failure symptom: an in-flight exec sees its preopened interpreter closed, or the
///   interpreter is closed twice.
#[cfg_attr(test, test)]
pub(crate) fn test_removal_deferred_until_release() {
	let closed = Arc::new(AtomicUsize::new(0));
	let registry = Registry::new();
	let id = registry
		.insert(counted_rule(r":elf:M::\x7fELF::/usr/bin/qemu-elf:F", 1, &closed))
		.unwrap();
	let probe = ProbeWindow::from_prefix(b"\x7fELF");

	let first = registry.lookup(&probe, "a.out").unwrap();
	let second = first.clone();
	registry.remove(id);
	assert_eq!(closed.load(Ordering::SeqCst), 0);
	assert!(first.has_interpreter_file());
	assert_eq!(registry.occupied_slots(), 1);

	drop(first);
	assert_eq!(closed.load(Ordering::SeqCst), 0);
	assert!(second.has_interpreter_file());

	drop(second);
	assert_eq!(closed.load(Ordering::SeqCst), 1);
	assert_eq!(registry.occupied_slots(), 0);

	registry.remove(id);
	assert_eq!(closed.load(Ordering::SeqCst), 1);
}

/// Must keep every handed-out record intact while writers insert and remove concurrently,
/// and finalize each record exactly once.
///
/// * Enforced in: `Registry::lookup`, `Registry::remove`, `Registry::release`
/// * Failure symptom: use-after-finalize on a looked-up record, leaked slots, or a
///   double close under churn.
#[cfg_attr(test, test)]
pub(crate) fn test_concurrent_lookup_and_churn() {
	const WRITERS: usize = 2;
	const READERS: usize = 4;
	const ROUNDS: usize = 200;

	let closed = Arc::new(AtomicUsize::new(0));
	let inserted = AtomicUsize::new(0);
	let done = AtomicBool::new(false);
	let registry = Registry::new();
	let probe = ProbeWindow::from_prefix(b"\x7fELF\x02");

	std::thread::scope(|scope| {
		for reader in 0..READERS {
			let (registry, done, probe) = (&registry, &done, &probe);
			scope.spawn(move || {
				let filename = format!("reader-{reader}");
				while !done.load(Ordering::Acquire) {
					if let Some(hit) = registry.lookup(probe, &filename) {
						assert!(hit.name().starts_with("churn-"));
						assert!(hit.has_interpreter_file());
						assert!(hit.users() >= 1);
					}
				}
			});
		}

		let writers: Vec<_> = (0..WRITERS)
			.map(|writer| {
				let (registry, closed, inserted) = (&registry, &closed, &inserted);
				scope.spawn(move || {
					for round in 0..ROUNDS {
						let line = format!(r":churn-{writer}-{round}:M::\x7fELF::/usr/bin/qemu-elf:F");
						let id = registry.insert(counted_rule(&line, round as u64, closed)).unwrap();
						inserted.fetch_add(1, Ordering::SeqCst);
						if round % 3 == 0 {
							registry.set_rule_enabled(id, false);
						}
						assert!(registry.remove(id).is_some());
					}
				})
			})
			.collect();
		for writer in writers {
			writer.join().unwrap();
		}
		done.store(true, Ordering::Release);
	});

	assert!(registry.is_empty());
	assert_eq!(registry.occupied_slots(), 0);
	assert_eq!(closed.load(Ordering::SeqCst), inserted.load(Ordering::SeqCst));
	assert_eq!(inserted.load(Ordering::SeqCst), WRITERS * ROUNDS);
}
