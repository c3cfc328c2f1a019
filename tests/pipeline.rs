//! Integration tests for the launch pipeline against the real system.
//!
//! Most tests fork and run the pipeline in the child, since a
//! successful run changes the identity and namespaces of the process
//! that runs it.  The rest run the built `sandboxed-exec` program.
//! Tests that need root skip themselves otherwise.

use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::os::unix::fs::PermissionsExt;
use std::os::unix::io::AsRawFd;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::{dup2, fork, geteuid, pipe, ForkResult, Gid, Group, Uid, User};

use sandboxed_exec::config::BUILTIN;
use sandboxed_exec::{Config, Launcher, OsSystem};
use tempfile::TempDir;

struct Outcome {
    code: i32,
    output: String,
}

fn leak(s: String) -> &'static str {
    Box::leak(s.into_boxed_str())
}

/// `nobody` and the name of its primary group, if this host has them.
fn nobody() -> Option<(Uid, Gid, &'static str)> {
    let user = User::from_name("nobody").ok()??;
    let group = Group::from_gid(user.gid).ok()??;
    Some((user.uid, user.gid, leak(group.name)))
}

fn config(user: &'static str, group: &'static str, program: &'static str) -> Config {
    Config { user: user, group: group, workdir: "/", program: program, log: "warn" }
}

/// Run the pipeline in a child process; collect its exit status and
/// everything it wrote to stdout or stderr.
fn run_forked(config: Config, args: &[&str]) -> Outcome {
    let argv: Vec<OsString> = args.iter().map(OsString::from).collect();
    let (rd, wr) = pipe().expect("pipe");

    match unsafe { fork() }.expect("fork") {
        ForkResult::Child => {
            drop(rd);
            let _ = dup2(wr.as_raw_fd(), 1);
            let _ = dup2(wr.as_raw_fd(), 2);
            let mut launcher = Launcher::new(OsSystem, config);
            let code = match launcher.run(argv) {
                Ok(never) => match never {},
                Err(e) => {
                    let _ = writeln!(io::stderr(), "error: {}", e);
                    1
                }
            };
            unsafe { libc::_exit(code) }
        }
        ForkResult::Parent { child } => {
            drop(wr);
            let mut output = String::new();
            File::from(rd).read_to_string(&mut output).expect("read child output");
            let code = match waitpid(child, None).expect("waitpid") {
                WaitStatus::Exited(_, code) => code,
                other => panic!("child did not exit normally: {:?}", other),
            };
            Outcome { code: code, output: output }
        }
    }
}

/// Copy the credential reporter somewhere an unprivileged user can
/// execute it from.  The directory is removed when the guard drops.
fn stage_reporter() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::set_permissions(dir.path(), fs::Permissions::from_mode(0o755))
        .expect("chmod dir");
    let exe = dir.path().join("report-creds");
    fs::copy(env!("CARGO_BIN_EXE_report-creds"), &exe).expect("copy reporter");
    fs::set_permissions(&exe, fs::Permissions::from_mode(0o755)).expect("chmod exe");
    (dir, exe)
}

/// Run the launcher program itself with `arg0` and `args`.
fn run_launcher(arg0: &str, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_sandboxed-exec"))
        .arg0(arg0)
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("spawn sandboxed-exec")
}

/// As root, the built-in target would really run if it is installed.
fn launcher_would_succeed() -> bool {
    geteuid().is_root() && Path::new(BUILTIN.program).exists()
}

fn field<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.split_whitespace()
        .find_map(|kv| kv.strip_prefix(key).and_then(|v| v.strip_prefix('=')))
}

fn own_namespace(ns: &str) -> String {
    fs::read_link(format!("/proc/self/ns/{}", ns))
        .map(|t| t.to_string_lossy().into_owned())
        .unwrap_or_else(|_| String::from("-"))
}

fn skip_if_unsupported(out: &Outcome) -> bool {
    if out.code != 0 && out.output.contains("namespace isolation")
        && out.output.contains("EPERM") {
        println!("namespaces unavailable here, skipping: {}", out.output.trim());
        return true;
    }
    false
}

#[test]
fn unknown_user_fails_in_identity_lookup() {
    let out = run_forked(config("no-such-user-sandboxed-exec", "nogroup", "/bin/true"),
                         &["true"]);
    assert_eq!(out.code, 1);
    assert!(out.output.contains("identity lookup"), "{}", out.output);
    assert!(out.output.contains("no-such-user-sandboxed-exec"), "{}", out.output);
    assert_eq!(out.output.lines().count(), 1, "{}", out.output);
}

#[test]
fn unprivileged_caller_is_stopped_at_group_init() {
    if geteuid().is_root() {
        println!("running as root, skipping");
        return;
    }
    let (_, _, group) = match nobody() {
        Some(n) => n,
        None => { println!("no nobody user, skipping"); return; }
    };
    let out = run_forked(config("nobody", group, "/bin/true"), &["true"]);
    assert_eq!(out.code, 1);
    assert!(out.output.contains("supplementary group initialization"),
            "{}", out.output);
    assert!(out.output.contains("EPERM"), "{}", out.output);
}

#[test]
fn replacement_image_runs_unprivileged_and_isolated() {
    if !geteuid().is_root() {
        println!("not running as root, skipping");
        return;
    }
    let (uid, gid, group) = match nobody() {
        Some(n) => n,
        None => { println!("no nobody user, skipping"); return; }
    };
    let (staging, exe) = stage_reporter();
    let exe = leak(exe.to_string_lossy().into_owned());

    let out = run_forked(config("nobody", group, exe), &["report-creds", "a", "b"]);
    drop(staging);
    if skip_if_unsupported(&out) {
        return;
    }
    assert_eq!(out.code, 0, "{}", out.output);

    let line = out.output.trim();
    let ids = |id: String| format!("{},{},{}", id, id, id);
    assert_eq!(field(line, "uid"), Some(ids(uid.to_string()).as_str()), "{}", line);
    assert_eq!(field(line, "gid"), Some(ids(gid.to_string()).as_str()), "{}", line);
    assert_eq!(field(line, "argv"), Some("3"), "{}", line);

    let groups = field(line, "groups").expect("groups");
    assert!(groups.split(',').any(|g| g == gid.to_string()), "{}", line);
    assert!(!groups.split(',').any(|g| g == "0"), "{}", line);

    for ns in ["net", "ipc", "uts", "mnt", "pid_for_children"] {
        let theirs = field(line, &format!("ns.{}", ns)).expect("ns field");
        assert_ne!(theirs, own_namespace(ns), "{} namespace shared", ns);
    }
}

#[test]
fn missing_program_fails_at_execution() {
    if !geteuid().is_root() {
        println!("not running as root, skipping");
        return;
    }
    let (_, _, group) = match nobody() {
        Some(n) => n,
        None => { println!("no nobody user, skipping"); return; }
    };
    let out = run_forked(config("nobody", group, "/nonexistent/sandboxed-exec-target"),
                         &["target"]);
    if skip_if_unsupported(&out) {
        return;
    }
    assert_eq!(out.code, 1);
    assert!(out.output.contains("execution"), "{}", out.output);
    assert!(out.output.contains("ENOENT"), "{}", out.output);
}

#[test]
fn staged_reporter_is_executable_by_anyone_and_cleaned_up() {
    let (staging, exe) = stage_reporter();
    let dir = staging.path().to_path_buf();
    let mode = |p: &Path| fs::metadata(p).expect("stat").permissions().mode() & 0o777;
    assert_eq!(mode(&dir), 0o755);
    assert_eq!(mode(&exe), 0o755);

    drop(staging);
    assert!(!dir.exists(), "{} left behind", dir.display());
}

#[test]
fn launcher_failure_is_one_diagnostic_line_and_status_one() {
    if launcher_would_succeed() {
        println!("{} is installed and we are root, skipping",
                 BUILTIN.program);
        return;
    }
    let out = run_launcher("sandboxed-exec", &["a", "b"]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(1), "{}", stderr);
    assert!(out.stdout.is_empty(), "{:?}", out.stdout);
    assert_eq!(stderr.lines().count(), 1, "{}", stderr);
    assert!(stderr.ends_with('\n'), "{:?}", stderr);
    assert!(stderr.starts_with("sandboxed-exec: "), "{}", stderr);
}

#[test]
fn launcher_diagnostic_prefix_ignores_argv0() {
    if launcher_would_succeed() {
        println!("{} is installed and we are root, skipping",
                 BUILTIN.program);
        return;
    }
    let out = run_launcher("spoofed\nname: ok", &[]);
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert_eq!(out.status.code(), Some(1), "{}", stderr);
    assert_eq!(stderr.lines().count(), 1, "{}", stderr);
    assert!(stderr.starts_with("sandboxed-exec: "), "{}", stderr);
    assert!(!stderr.contains("spoofed"), "{}", stderr);
}
