/* Run a fixed program in fresh namespaces as an unprivileged user.
 *
 * Copyright © 2015 Zack Weinberg
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * http://www.apache.org/licenses/LICENSE-2.0
 * There is NO WARRANTY.
 *
 *    sandboxed-exec [args...]
 *
 * looks up the user and group it was built to drop to (by default
 * "nobody" and "nogroup"), initializes the supplementary group list
 * for that user, changes to the root directory, and detaches into new
 * mount, PID, IPC, network, UTS and SysV-semaphore namespaces, with a
 * private file descriptor table and filesystem attributes.  It then
 * sets its real, effective and saved group ID, and after that its
 * real, effective and saved user ID, to the target identity, and
 * finally execs the program it was built to run (by default
 * /usr/bin/lynx).  Its own argument vector, including argv[0], is
 * passed to that program verbatim, and the environment is inherited
 * unchanged.
 *
 * No user namespace is created: inside one, setresuid and setresgid
 * would not change the process's identity on the host.
 *
 * The target identity and program are fixed when this program is
 * compiled (see SANDBOX_* in config.rs); nothing about its behavior
 * can be changed by whoever invokes it.
 *
 * If any step fails, one line naming the step and the system error is
 * written to stderr and the program exits with status 1.  No step is
 * undone.  Every step before the privilege drop is harmless to stop
 * after, and a failure at exec leaves an isolated, unprivileged
 * process that simply exits.
 *
 * This program must be installed setuid root, or run as root.
 *
 * This program uses Linux-specific namespace features.  It should
 * not be expected to work anywhere else.
 */

use std::env;
use std::io::Write;
use std::process;

use sandboxed_exec::{Config, Launcher, OsSystem};

/// Diagnostic prefix.  Not taken from argv[0], which the caller picks.
const PROGNAME: &str = "sandboxed-exec";

/// The logger never consults the environment; its level is part of
/// the build-time configuration.
fn init_logging(config: &Config) {
    env_logger::Builder::new()
        .filter_level(config.log_level())
        .target(env_logger::Target::Stderr)
        .format(|buf, record| writeln!(buf, "{}: {}", PROGNAME, record.args()))
        .init();
}

fn main() {
    let config = Config::default();
    init_logging(&config);

    let mut launcher = Launcher::new(OsSystem, config);
    match launcher.run(env::args_os().collect()) {
        Ok(replaced) => match replaced {},
        Err(e) => {
            log::error!("{}", e);
            process::exit(libc::EXIT_FAILURE);
        }
    }
}
