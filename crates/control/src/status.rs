use binfmt_grammar::escape::to_hex;
use binfmt_primitives::{Matcher, Rule};

/// Renders the status block read from a rule's node.
///
/// ```text
/// enabled
/// interpreter /usr/bin/qemu-elf
/// flags: OC
/// offset 0
/// magic 7f454c46
/// mask ffffffff
/// ```
///
/// Extension rules print `extension .<ext>` in place of the offset, magic and mask lines.
pub fn render_status(rule: &Rule) -> String {
	let mut out = String::from(render_switch(rule.is_enabled()));
	out.push_str(&format!("interpreter {}\n", rule.interpreter()));
	out.push_str(&format!("flags: {}\n", rule.flags().letters()));
	match rule.matcher() {
		Matcher::Extension(ext) => out.push_str(&format!("extension .{ext}\n")),
		Matcher::Magic(magic) => {
			out.push_str(&format!("offset {}\n", magic.offset));
			out.push_str(&format!("magic {}\n", to_hex(&magic.pattern)));
			if let Some(mask) = &magic.mask {
				out.push_str(&format!("mask {}\n", to_hex(mask)));
			}
		}
	}
	out
}

/// Text read from the `status` node.
pub(crate) fn render_switch(enabled: bool) -> &'static str {
	if enabled { "enabled\n" } else { "disabled\n" }
}
