use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use binfmt_control::Control;
use binfmt_primitives::{Error, ProbeWindow, ProgramLoader};
use binfmt_registry::Registry;
use tempfile::TempDir;

use crate::{ArgList, ExecFlags, ExecRequest, FsLoader, MiscLoader, Outcome};

struct Fixture {
	dir: TempDir,
	interpreter: PathBuf,
	control: Control,
	loader: MiscLoader,
}

impl Fixture {
	fn new() -> Self {
		let dir = tempfile::tempdir().unwrap();
		let interpreter = dir.path().join("interp");
		fs::write(&interpreter, b"#!/bin/sh\n").unwrap();
		fs::set_permissions(&interpreter, fs::Permissions::from_mode(0o755)).unwrap();

		let registry = Arc::new(Registry::new());
		let control = Control::new(Arc::clone(&registry), Arc::new(FsLoader));
		let loader = MiscLoader::new(registry, Arc::new(FsLoader));
		Self {
			dir,
			interpreter,
			control,
			loader,
		}
	}

	fn interp(&self) -> &str {
		self.interpreter.to_str().unwrap()
	}

	fn register_py(&self, flags: &str) {
		let line = format!(":py:E::py::{}:{flags}", self.interp());
		self.control.register(line.as_str()).unwrap();
	}

	fn script(&self) -> PathBuf {
		self.dir.path().join("script.py")
	}
}

fn request(path: &Path, args: &[&str]) -> ExecRequest {
	ExecRequest::new(path, ProbeWindow::default(), ArgList::new(args.iter().copied()).unwrap())
}

#[test]
fn rewrite_replaces_argv0() {
	let fx = Fixture::new();
	fx.register_py("");
	let script = fx.script();
	let mut req = request(&script, &["script.py", "-v", "input"]);

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::Rewritten);
	let script = script.to_str().unwrap();
	assert_eq!(req.argv.to_vec(), [fx.interp(), script, "-v", "input"]);
	assert_eq!(req.interp, fx.interpreter);
	assert_eq!(req.flags, ExecFlags::empty());

	let file = req.file.as_ref().unwrap();
	assert_eq!(file.path(), fx.interpreter);
	assert!(file.write_denied());
}

#[test]
fn rewrite_preserves_argv0() {
	let fx = Fixture::new();
	fx.register_py("P");
	let script = fx.script();
	let mut req = request(&script, &["./script.py", "input"]);

	fx.loader.load(&mut req).unwrap();
	let script = script.to_str().unwrap();
	assert_eq!(req.argv.to_vec(), [fx.interp(), script, "./script.py", "input"]);
	assert_eq!(req.flags, ExecFlags::PRESERVE_ARGV0);
}

#[test]
fn open_binary_flags_propagate() {
	let fx = Fixture::new();
	fx.register_py("C");
	let mut req = request(&fx.script(), &["script.py"]);

	fx.loader.load(&mut req).unwrap();
	assert_eq!(req.flags, ExecFlags::EXECFD | ExecFlags::EXECFD_CREDS);
}

#[test]
fn non_utf8_path_is_passed_through_unchanged() {
	let fx = Fixture::new();
	fx.register_py("");
	let script = fx.dir.path().join(OsStr::from_bytes(b"caf\xe9.py"));
	fs::write(&script, b"print(1)\n").unwrap();
	let mut req = request(&script, &["script"]);

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::Rewritten);
	let argv = req.argv.to_vec();
	assert_eq!(argv[1].as_os_str(), script.as_os_str());
	assert!(Path::new(&argv[1]).exists());
}

#[test]
fn preopened_interpreter_survives_unlink() {
	let fx = Fixture::new();
	fx.register_py("F");
	fs::remove_file(&fx.interpreter).unwrap();
	let mut req = request(&fx.script(), &["script.py"]);

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::Rewritten);
	assert!(req.file.unwrap().write_denied());
}

#[test]
fn missing_interpreter_fails_and_releases() {
	let fx = Fixture::new();
	fx.register_py("");
	fs::remove_file(&fx.interpreter).unwrap();
	let mut req = request(&fx.script(), &["script.py"]);

	let err = fx.loader.load(&mut req).unwrap_err();
	assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
	assert_eq!(fx.control.registry().find("py").unwrap().users(), 2);
}

#[test]
fn inaccessible_path_is_not_found() {
	let fx = Fixture::new();
	fx.register_py("");
	let mut req = request(&fx.script(), &["script.py"]);
	req.path_inaccessible = true;

	assert!(matches!(fx.loader.load(&mut req), Err(Error::NotFound(_))));
	assert_eq!(req.argv.to_vec(), ["script.py"]);
	assert_eq!(fx.control.registry().find("py").unwrap().users(), 2);
}

#[test]
fn unmatched_request_is_untouched() {
	let fx = Fixture::new();
	fx.register_py("");
	let path = fx.dir.path().join("tool.rb");
	let mut req = request(&path, &["tool.rb"]);

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::NotRecognized);
	assert_eq!(req.argv.to_vec(), ["tool.rb"]);
	assert_eq!(req.interp, path);
	assert!(req.file.is_none());
}

#[test]
fn disabled_registry_declines() {
	let fx = Fixture::new();
	fx.register_py("");
	fx.control.write("status", "0").unwrap();
	let mut req = request(&fx.script(), &["script.py"]);

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::NotRecognized);
	assert!(req.file.is_none());
}

#[test]
fn argument_budget_is_enforced() {
	let fx = Fixture::new();
	fx.register_py("");
	let argv = ArgList::with_budget(["script.py"], 16).unwrap();
	let mut req = ExecRequest::new(fx.script(), ProbeWindow::default(), argv);

	assert!(matches!(fx.loader.load(&mut req), Err(Error::ArgumentListTooLong)));
}

#[test]
fn magic_rule_matches_file_on_disk() {
	let fx = Fixture::new();
	let line = format!(":elf:M::\\x7fELF::{}:", fx.interp());
	fx.control.register(line.as_str()).unwrap();

	let binary = fx.dir.path().join("a.out");
	fs::write(&binary, b"\x7fELF\x02\x01\x01\x00").unwrap();
	let mut req = ExecRequest::open(&binary, ArgList::new(["a.out"]).unwrap()).unwrap();

	assert_eq!(fx.loader.load(&mut req).unwrap(), Outcome::Rewritten);
	assert_eq!(req.argv.len(), 2);
}

#[test]
fn fs_loader_rejects_non_executables() {
	let dir = tempfile::tempdir().unwrap();
	let plain = dir.path().join("plain");
	fs::write(&plain, b"data").unwrap();
	fs::set_permissions(&plain, fs::Permissions::from_mode(0o644)).unwrap();

	assert!(FsLoader.open_exec(&plain).is_err());
	assert_eq!(
		FsLoader.open_exec(dir.path()).unwrap_err().kind(),
		io::ErrorKind::PermissionDenied
	);
	assert_eq!(
		FsLoader.open_exec(&dir.path().join("missing")).unwrap_err().kind(),
		io::ErrorKind::NotFound
	);
}

#[test]
fn fs_loader_marks_handles_write_denied() {
	let fx = Fixture::new();
	let file = FsLoader.open_exec(&fx.interpreter).unwrap();
	assert!(file.write_denied());

	let clone = file.clone_deny_write().unwrap();
	assert!(clone.write_denied());
	assert_eq!(clone.path(), file.path());
	drop(file);
	assert_eq!(clone.path(), fx.interpreter);
}

#[test]
fn arg_list_charges_nul_terminators() {
	let mut args = ArgList::with_budget(["ab", "c"], 8).unwrap();
	assert_eq!(args.used(), 5);
	assert!(matches!(args.push_front("abc"), Err(Error::ArgumentListTooLong)));
	assert_eq!(args.len(), 2);

	assert_eq!(args.pop_front(), Some(OsString::from("ab")));
	assert_eq!(args.used(), 2);
	args.push_front("abcde").unwrap();
	assert_eq!(args.iter().collect::<Vec<_>>(), ["abcde", "c"]);
}
