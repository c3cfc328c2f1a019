//! Everything the launcher asks of the operating system.
//!
//! Each method is exactly one system or library call.  The launcher
//! only ever talks to the OS through this trait, so tests can stand
//! in for any single step.

use std::convert::Infallible;
use std::ffi::{CStr, CString};
use std::path::Path;

use nix::errno::Errno;
use nix::sched::CloneFlags;
use nix::unistd::{Gid, Uid};

/// A user or group record, reduced to what the pipeline uses.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Identity<Id> {
    pub name: String,
    pub id: Id,
}

pub type UserRecord = Identity<Uid>;
pub type GroupRecord = Identity<Gid>;

/// Real, effective and saved ids for both dimensions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Credentials {
    pub uid: [Uid; 3],
    pub gid: [Gid; 3],
}

impl Credentials {
    /// All six ids equal the given pair.
    pub fn all_equal(&self, uid: Uid, gid: Gid) -> bool {
        self.uid.iter().all(|&u| u == uid) && self.gid.iter().all(|&g| g == gid)
    }
}

pub trait System {
    /// What a successful `execv` yields.  For the real system this is
    /// uninhabited: success means this process image is gone.
    type Replaced;

    fn user_by_name(&mut self, name: &str) -> Result<Option<UserRecord>, Errno>;
    fn group_by_name(&mut self, name: &str) -> Result<Option<GroupRecord>, Errno>;
    fn initgroups(&mut self, user: &CStr, group: Gid) -> Result<(), Errno>;
    fn chdir(&mut self, dir: &Path) -> Result<(), Errno>;
    fn unshare(&mut self, flags: CloneFlags) -> Result<(), Errno>;
    fn setresgid(&mut self, gid: Gid) -> Result<(), Errno>;
    fn setresuid(&mut self, uid: Uid) -> Result<(), Errno>;
    fn credentials(&mut self) -> Result<Credentials, Errno>;
    fn execv(&mut self, program: &CStr, argv: &[CString])
             -> Result<Self::Replaced, Errno>;
}

/// The running kernel and C library.
#[derive(Debug, Default)]
pub struct OsSystem;

impl System for OsSystem {
    type Replaced = Infallible;

    fn user_by_name(&mut self, name: &str) -> Result<Option<UserRecord>, Errno> {
        nix::unistd::User::from_name(name)
            .map(|u| u.map(|u| Identity { name: u.name, id: u.uid }))
    }

    fn group_by_name(&mut self, name: &str) -> Result<Option<GroupRecord>, Errno> {
        nix::unistd::Group::from_name(name)
            .map(|g| g.map(|g| Identity { name: g.name, id: g.gid }))
    }

    fn initgroups(&mut self, user: &CStr, group: Gid) -> Result<(), Errno> {
        nix::unistd::initgroups(user, group)
    }

    fn chdir(&mut self, dir: &Path) -> Result<(), Errno> {
        nix::unistd::chdir(dir)
    }

    fn unshare(&mut self, flags: CloneFlags) -> Result<(), Errno> {
        nix::sched::unshare(flags)
    }

    fn setresgid(&mut self, gid: Gid) -> Result<(), Errno> {
        nix::unistd::setresgid(gid, gid, gid)
    }

    fn setresuid(&mut self, uid: Uid) -> Result<(), Errno> {
        nix::unistd::setresuid(uid, uid, uid)
    }

    fn credentials(&mut self) -> Result<Credentials, Errno> {
        let u = nix::unistd::getresuid()?;
        let g = nix::unistd::getresgid()?;
        Ok(Credentials {
            uid: [u.real, u.effective, u.saved],
            gid: [g.real, g.effective, g.saved],
        })
    }

    fn execv(&mut self, program: &CStr, argv: &[CString])
             -> Result<Infallible, Errno> {
        nix::unistd::execv(program, argv)
    }
}
