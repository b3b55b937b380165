use std::path::Path;

use anyhow::Context;
use binfmt_invocation::ArgList;
use serde::Deserialize;

/// Startup configuration read from TOML.
///
/// ```toml
/// enabled = true
/// arg_budget = 131072
/// rules = [":py:E::py::/usr/bin/python3:"]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
	/// Global registry switch applied after the rules are registered.
	pub enabled: bool,
	/// Byte budget of the argument list built by `check`.
	pub arg_budget: usize,
	/// Registration lines, applied in order through the `register` node.
	pub rules: Vec<String>,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			enabled: true,
			arg_budget: ArgList::DEFAULT_BUDGET,
			rules: Vec::new(),
		}
	}
}

impl Config {
	pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
		toml::from_str(text)
	}

	pub fn load(path: &Path) -> anyhow::Result<Self> {
		let text = std::fs::read_to_string(path)
			.with_context(|| format!("reading config {}", path.display()))?;
		Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
	}
}
