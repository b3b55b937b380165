use std::path::Path;
use std::sync::Arc;

use binfmt_grammar::{Command, parse_command, parse_rule};
use binfmt_primitives::{Error, Invalid, OptionFlags, ProgramLoader, Result, Rule, UserBuffer};
use binfmt_registry::{Registry, RuleId};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::status::{render_status, render_switch};
use crate::tree::{NodeKind, Tree};

/// The mounted control tree over one registry.
pub struct Control {
	registry: Arc<Registry>,
	loader: Arc<dyn ProgramLoader>,
	/// Coarse section held across every structural change.
	tree: Mutex<Tree>,
}

impl std::fmt::Debug for Control {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Control")
			.field("registry", &self.registry)
			.field("tree", &self.tree)
			.finish_non_exhaustive()
	}
}

impl Control {
	/// Mounts a tree with the `register` and `status` nodes.
	///
	/// `loader` opens interpreters for rules that ask to be preopened.
	pub fn new(registry: Arc<Registry>, loader: Arc<dyn ProgramLoader>) -> Self {
		Self {
			registry,
			loader,
			tree: Mutex::new(Tree::mount()),
		}
	}

	pub fn registry(&self) -> &Arc<Registry> {
		&self.registry
	}

	/// Node names: the aggregates first, then rules in registration order.
	pub fn list(&self) -> Vec<String> {
		self.tree.lock().names()
	}

	/// Reads the text of `name` starting at `offset` into `buf`.
	///
	/// Returns the number of bytes copied, zero once `offset` is past the end.
	///
	/// # Errors
	///
	/// [`Error::NotFound`] for an unknown node and [`Error::InvalidArgument`] for `register`.
	pub fn read(&self, name: &str, offset: usize, buf: &mut [u8]) -> Result<usize> {
		let text = self.read_to_string(name)?;
		let Some(tail) = text.as_bytes().get(offset..) else {
			return Ok(0);
		};
		let count = tail.len().min(buf.len());
		buf[..count].copy_from_slice(&tail[..count]);
		Ok(count)
	}

	/// Reads the full text of `name`.
	pub fn read_to_string(&self, name: &str) -> Result<String> {
		match self.kind(name)? {
			NodeKind::Register => Err(Invalid::Unsupported("register").into()),
			NodeKind::Status => Ok(render_switch(self.registry.is_enabled()).to_owned()),
			NodeKind::Rule(id) => {
				let rule = self
					.registry
					.get(id)
					.ok_or_else(|| Error::NotFound(name.to_owned()))?;
				Ok(render_status(&rule))
			}
		}
	}

	/// Writes `input` to `name`, returning the number of bytes consumed.
	///
	/// An empty command write consumes nothing and changes nothing.
	///
	/// # Errors
	///
	/// Whatever the addressed node rejects: grammar and command errors, name collisions,
	/// preopen failures, or [`Error::NotFound`] when the node is gone.
	pub fn write<B: UserBuffer + ?Sized>(&self, name: &str, input: &B) -> Result<usize> {
		match self.kind(name)? {
			NodeKind::Register => {
				self.register(input)?;
			}
			NodeKind::Status => {
				if let Some(command) = parse_command(input)? {
					self.apply_global(command);
				}
			}
			NodeKind::Rule(id) => {
				if let Some(command) = parse_command(input)? {
					self.apply_rule(name, id, command)?;
				}
			}
		}
		Ok(input.len())
	}

	/// Parses a registration line, preopens its interpreter if asked, and links the rule.
	///
	/// # Errors
	///
	/// Grammar errors from the parser, the loader's error when preopening fails, and
	/// [`Error::AlreadyExists`] when a node of that name exists. No state is left behind on
	/// any failure.
	pub fn register<B: UserBuffer + ?Sized>(&self, input: &B) -> Result<RuleId> {
		let def = parse_rule(input)?;

		let preopened = if def.flags.contains(OptionFlags::OPEN_FILE) {
			match self.loader.open_exec(Path::new(&def.interpreter)) {
				Ok(file) => Some(file),
				Err(error) => {
					warn!(rule = %def.name, interpreter = %def.interpreter, %error, "failed to preopen interpreter");
					return Err(error.into());
				}
			}
		} else {
			None
		};

		let mut tree = self.tree.lock();
		if tree.contains(&def.name) {
			return Err(Error::AlreadyExists(def.name));
		}
		let name = def.name.clone();
		let resource = tree.allocate();
		let mut rule = Rule::new(def, resource);
		if let Some(file) = preopened {
			rule = rule.with_interpreter_file(file);
		}
		let flags = rule.flags();
		let id = self.registry.insert(rule)?;
		tree.attach(name.clone(), resource, id);
		info!(rule = %name, %id, %resource, flags = %flags.letters(), "registered");
		Ok(id)
	}

	/// Removes every rule and its node, leaving the aggregate nodes mounted.
	pub fn shutdown(&self) {
		let mut tree = self.tree.lock();
		let removed = self.registry.remove_all();
		tree.detach_resources(&removed);
		info!(count = removed.len(), "control tree shut down");
	}

	fn kind(&self, name: &str) -> Result<NodeKind> {
		self.tree
			.lock()
			.get(name)
			.map(|node| node.kind)
			.ok_or_else(|| Error::NotFound(name.to_owned()))
	}

	fn apply_global(&self, command: Command) {
		match command {
			Command::Disable => self.registry.set_enabled(false),
			Command::Enable => self.registry.set_enabled(true),
			Command::Remove => {
				let mut tree = self.tree.lock();
				let removed = self.registry.remove_all();
				tree.detach_resources(&removed);
				info!(count = removed.len(), "removed all rules");
				return;
			}
		}
		info!(enabled = self.registry.is_enabled(), "registry switch");
	}

	fn apply_rule(&self, name: &str, id: RuleId, command: Command) -> Result<()> {
		match command {
			Command::Disable | Command::Enable => {
				let enabled = command == Command::Enable;
				if !self.registry.set_rule_enabled(id, enabled) {
					return Err(Error::NotFound(name.to_owned()));
				}
				debug!(rule = name, enabled, "rule switch");
			}
			Command::Remove => {
				let mut tree = self.tree.lock();
				// The node may have been replaced since it was resolved.
				if tree.get(name).map(|node| node.kind) != Some(NodeKind::Rule(id)) {
					return Err(Error::NotFound(name.to_owned()));
				}
				self.registry.remove(id);
				tree.detach(name);
				info!(rule = name, %id, "removed");
			}
		}
		Ok(())
	}
}
