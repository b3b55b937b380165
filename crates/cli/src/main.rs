//! `binfmt` binary.
//!
//! Builds an in-memory registry, applies the configured rules through the `register` node
//! and runs one subcommand against the resulting control tree.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use binfmt_control::Control;
use binfmt_invocation::{ArgList, ExecRequest, FsLoader, MiscLoader, Outcome};
use binfmt_primitives::{ProgramLoader, REGISTER_NODE, STATUS_NODE};
use binfmt_registry::Registry;
use clap::{Parser, Subcommand};
use tracing::info;

use crate::config::Config;

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(name = "binfmt")]
#[command(about = "Register interpreters for binary formats and test exec dispatch")]
struct Cli {
	/// TOML file with startup rules
	#[arg(short, long, value_name = "PATH")]
	config: Option<PathBuf>,

	/// Verbose logging
	#[arg(short, long)]
	verbose: bool,

	#[command(subcommand)]
	command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Print a node, or every node when none is given
	Status { node: Option<String> },
	/// Write a command or registration line to a node
	Write {
		node: String,
		#[arg(allow_hyphen_values = true)]
		value: String,
	},
	/// Register rules
	Register {
		#[arg(required = true)]
		rules: Vec<String>,
	},
	/// Show how executing FILE would be dispatched
	Check {
		file: PathBuf,
		#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
		args: Vec<String>,
	},
}

fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	setup_tracing(cli.verbose);

	let config = match &cli.config {
		Some(path) => Config::load(path)?,
		None => Config::default(),
	};

	let registry = Arc::new(Registry::new());
	let loader: Arc<dyn ProgramLoader> = Arc::new(FsLoader);
	let control = Control::new(Arc::clone(&registry), Arc::clone(&loader));
	let dispatcher = MiscLoader::new(registry, loader);

	for rule in &config.rules {
		control
			.register(rule.as_str())
			.with_context(|| format!("registering {rule:?}"))?;
	}
	if !config.enabled {
		control.write(STATUS_NODE, "0")?;
	}
	info!(rules = config.rules.len(), enabled = config.enabled, "registry ready");

	let result = run(cli.command, &control, &dispatcher, &config);
	control.shutdown();
	result
}

fn run(command: Command, control: &Control, dispatcher: &MiscLoader, config: &Config) -> anyhow::Result<()> {
	match command {
		Command::Status { node: Some(node) } => {
			print!("{}", control.read_to_string(&node)?);
		}
		Command::Status { node: None } => print_tree(control)?,
		Command::Write { node, value } => {
			let written = control
				.write(&node, value.as_str())
				.with_context(|| format!("writing to {node}"))?;
			info!(%node, written, "write accepted");
			print_tree(control)?;
		}
		Command::Register { rules } => {
			for rule in &rules {
				control
					.write(REGISTER_NODE, rule.as_str())
					.with_context(|| format!("registering {rule:?}"))?;
			}
			print_tree(control)?;
		}
		Command::Check { file, args } => {
			let argv = std::iter::once(file.clone().into_os_string()).chain(args.into_iter().map(Into::into));
			let argv = ArgList::with_budget(argv, config.arg_budget)?;
			let mut request = ExecRequest::open(&file, argv)
				.with_context(|| format!("reading {}", file.display()))?;
			match dispatcher.load(&mut request)? {
				Outcome::Rewritten => {
					println!("interpreter: {}", request.interp.display());
					println!("flags: {:?}", request.flags);
					for (i, arg) in request.argv.iter().enumerate() {
						println!("argv[{i}]: {}", arg.to_string_lossy());
					}
				}
				Outcome::NotRecognized => println!("not recognized"),
			}
		}
	}
	Ok(())
}

fn print_tree(control: &Control) -> anyhow::Result<()> {
	for name in control.list() {
		if name == REGISTER_NODE {
			continue;
		}
		println!("[{name}]");
		print!("{}", control.read_to_string(&name)?);
	}
	Ok(())
}

fn setup_tracing(verbose: bool) {
	use tracing_subscriber::EnvFilter;

	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
		if verbose {
			EnvFilter::new("binfmt=trace,debug")
		} else {
			EnvFilter::new("warn")
		}
	});
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn check_collects_trailing_args() {
		let cli = Cli::try_parse_from(["binfmt", "check", "script.py", "-x", "input"]).unwrap();
		match cli.command {
			Command::Check { file, args } => {
				assert_eq!(file, PathBuf::from("script.py"));
				assert_eq!(args, ["-x", "input"]);
			}
			other => panic!("unexpected command {other:?}"),
		}
	}

	#[test]
	fn write_accepts_negative_command() {
		let cli = Cli::try_parse_from(["binfmt", "write", "status", "-1"]).unwrap();
		assert!(matches!(cli.command, Command::Write { ref value, .. } if value == "-1"));
	}

	#[test]
	fn register_requires_a_rule() {
		assert!(Cli::try_parse_from(["binfmt", "register"]).is_err());
	}
}
