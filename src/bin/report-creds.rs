/* Report the credentials and namespaces this process is running with.
 *
 * Copyright © 2015 Zack Weinberg
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 * http://www.apache.org/licenses/LICENSE-2.0
 * There is NO WARRANTY.
 *
 *    report-creds [args...]
 *
 * writes one line to stdout of the form
 *
 *   uid=R,E,S gid=R,E,S groups=G,... ns.net=ID ns.ipc=ID ... argv=N
 *
 * and exits successfully.  The ns.* fields are the targets of the
 * corresponding /proc/self/ns links ("-" if unreadable).  It is meant
 * to be built into sandboxed-exec as its target program, so that the
 * state a sandboxed program inherits can be observed from outside.
 */

use std::fs;
use std::io::{self, Write};
use std::process;

use nix::unistd::{getgroups, getresgid, getresuid};

const NAMESPACES: [&str; 5] = ["mnt", "pid_for_children", "ipc", "net", "uts"];

fn join<T: ToString>(items: &[T]) -> String {
    items.iter().map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

fn report() -> nix::Result<String> {
    let u = getresuid()?;
    let g = getresgid()?;
    let groups = getgroups()?;

    let mut line = format!("uid={} gid={} groups={}",
                           join(&[u.real, u.effective, u.saved]),
                           join(&[g.real, g.effective, g.saved]),
                           join(&groups));
    for ns in NAMESPACES.iter() {
        let target = fs::read_link(format!("/proc/self/ns/{}", ns))
            .map(|t| t.to_string_lossy().into_owned())
            .unwrap_or_else(|_| String::from("-"));
        line.push_str(&format!(" ns.{}={}", ns, target));
    }
    line.push_str(&format!(" argv={}", std::env::args_os().count()));
    Ok(line)
}

fn main() {
    match report() {
        Ok(line) => {
            println!("{}", line);
            process::exit(libc::EXIT_SUCCESS);
        }
        Err(e) => {
            writeln!(io::stderr(), "report-creds: {}", e).unwrap();
            process::exit(libc::EXIT_FAILURE);
        }
    }
}
