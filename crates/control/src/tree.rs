use binfmt_primitives::{REGISTER_NODE, ResourceId, STATUS_NODE};
use binfmt_registry::RuleId;
use indexmap::IndexMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NodeKind {
	Register,
	Status,
	Rule(RuleId),
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Node {
	pub(crate) resource: ResourceId,
	pub(crate) kind: NodeKind,
}

/// Named control nodes in creation order.
#[derive(Debug)]
pub(crate) struct Tree {
	nodes: IndexMap<String, Node>,
	next_resource: u64,
}

impl Tree {
	/// A freshly mounted tree holding only the aggregate nodes.
	pub(crate) fn mount() -> Self {
		let mut tree = Self {
			nodes: IndexMap::new(),
			next_resource: 0,
		};
		let register = tree.allocate();
		tree.nodes.insert(
			REGISTER_NODE.to_owned(),
			Node {
				resource: register,
				kind: NodeKind::Register,
			},
		);
		let status = tree.allocate();
		tree.nodes.insert(
			STATUS_NODE.to_owned(),
			Node {
				resource: status,
				kind: NodeKind::Status,
			},
		);
		tree
	}

	pub(crate) fn allocate(&mut self) -> ResourceId {
		let id = ResourceId(self.next_resource);
		self.next_resource += 1;
		id
	}

	pub(crate) fn get(&self, name: &str) -> Option<Node> {
		self.nodes.get(name).copied()
	}

	pub(crate) fn contains(&self, name: &str) -> bool {
		self.nodes.contains_key(name)
	}

	pub(crate) fn attach(&mut self, name: String, resource: ResourceId, id: RuleId) {
		self.nodes.insert(
			name,
			Node {
				resource,
				kind: NodeKind::Rule(id),
			},
		);
	}

	pub(crate) fn detach(&mut self, name: &str) {
		self.nodes.shift_remove(name);
	}

	/// Drops every rule node whose resource is listed.
	pub(crate) fn detach_resources(&mut self, resources: &[ResourceId]) {
		self.nodes.retain(|_, node| {
			!(matches!(node.kind, NodeKind::Rule(_)) && resources.contains(&node.resource))
		});
	}

	pub(crate) fn names(&self) -> Vec<String> {
		self.nodes.keys().cloned().collect()
	}
}
