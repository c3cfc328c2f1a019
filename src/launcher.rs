//! The launch pipeline: resolve the target identity, isolate, drop
//! privilege, exec.  Each step runs once, in order, and any failure
//! ends the run.  Nothing is undone on failure; the ordering alone
//! guarantees that an interrupted run leaves either no process or an
//! unprivileged one.

use std::ffi::{CString, OsString};
use std::os::unix::ffi::OsStringExt;
use std::path::Path;

use nix::errno::Errno;
use nix::sched::CloneFlags;

use crate::config::Config;
use crate::err::*;
use crate::stage::{Cursor, Stage};
use crate::system::{GroupRecord, System, UserRecord};

/// The namespaces created for the target, plus the unsharing of the
/// fd table and filesystem attributes.  CLONE_NEWUSER is excluded:
/// inside a new user namespace the later setresgid/setresuid no
/// longer take effect against the host's ids.
pub const ISOLATION: CloneFlags = CloneFlags::CLONE_FILES
    .union(CloneFlags::CLONE_FS)
    .union(CloneFlags::CLONE_NEWIPC)
    .union(CloneFlags::CLONE_NEWNET)
    .union(CloneFlags::CLONE_NEWNS)
    .union(CloneFlags::CLONE_NEWPID)
    .union(CloneFlags::CLONE_NEWUTS)
    .union(CloneFlags::CLONE_SYSVSEM);

struct Target {
    user: UserRecord,
    group: GroupRecord,
}

pub struct Launcher<S: System> {
    sys: S,
    config: Config,
    cursor: Cursor,
}

impl<S: System> Launcher<S> {
    pub fn new(sys: S, config: Config) -> Launcher<S> {
        Launcher { sys: sys, config: config, cursor: Cursor::new() }
    }

    /// The stage the pipeline reached, whether or not it completed.
    pub fn stage(&self) -> Option<Stage> {
        self.cursor.current()
    }

    #[cfg(test)]
    pub(crate) fn system(&self) -> &S {
        &self.sys
    }

    /// Run the whole pipeline.  With the real system this returns
    /// only on failure.
    pub fn run(&mut self, argv: Vec<OsString>) -> Result<S::Replaced, LaunchError> {
        let target = self.resolve()?;
        self.init_groups(&target)?;
        self.reset_workdir()?;
        self.isolate()?;
        self.drop_group(&target)?;
        self.drop_user(&target)?;
        self.exec(argv)
    }

    fn resolve(&mut self) -> Result<Target, LaunchError> {
        let stage = self.cursor.enter(Stage::Resolving);
        let (uname, gname) = (self.config.user, self.config.group);

        let user = self.sys.user_by_name(uname)
            .map_err(|e| map_nix_err(stage, e, format!("getpwnam({})", uname)))?
            .ok_or_else(|| map_not_found(stage, format!("no such user '{}'", uname)))?;
        let group = self.sys.group_by_name(gname)
            .map_err(|e| map_nix_err(stage, e, format!("getgrnam({})", gname)))?
            .ok_or_else(|| map_not_found(stage, format!("no such group '{}'", gname)))?;

        if user.id.is_root() {
            return Err(LaunchError::new(
                stage, format!("user '{}' is root", uname), Errno::EPERM));
        }
        if group.id.as_raw() == 0 {
            return Err(LaunchError::new(
                stage, format!("group '{}' is gid 0", gname), Errno::EPERM));
        }

        log::debug!("target user {} ({}), group {} ({})",
                    user.name, user.id, group.name, group.id);
        Ok(Target { user: user, group: group })
    }

    fn init_groups(&mut self, target: &Target) -> Result<(), LaunchError> {
        let stage = self.cursor.enter(Stage::GroupInit);
        let name = CString::new(target.user.name.as_str())
            .map_err(|_| map_nul_err(stage, format!("user name {:?}",
                                                    target.user.name)))?;
        self.sys.initgroups(&name, target.group.id)
            .map_err(|e| map_nix_err(stage, e,
                                     format!("initgroups({}, {})",
                                             target.user.name, target.group.id)))
    }

    fn reset_workdir(&mut self) -> Result<(), LaunchError> {
        let stage = self.cursor.enter(Stage::Chdir);
        let dir = self.config.workdir;
        self.sys.chdir(Path::new(dir))
            .map_err(|e| map_nix_err(stage, e, format!("chdir({})", dir)))
    }

    fn isolate(&mut self) -> Result<(), LaunchError> {
        let stage = self.cursor.enter(Stage::Isolating);
        self.sys.unshare(ISOLATION)
            .map_err(|e| map_nix_err(stage, e,
                                     format!("unshare({:?})", ISOLATION)))
    }

    fn drop_group(&mut self, target: &Target) -> Result<(), LaunchError> {
        let stage = self.cursor.enter(Stage::DroppingGroup);
        let gid = target.group.id;
        self.sys.setresgid(gid)
            .map_err(|e| map_nix_err(stage, e, format!("setresgid({})", gid)))
    }

    /// Drop the user ids, then confirm that none of the six ids kept
    /// its old value.
    fn drop_user(&mut self, target: &Target) -> Result<(), LaunchError> {
        let stage = self.cursor.enter(Stage::DroppingUser);
        let (uid, gid) = (target.user.id, target.group.id);
        self.sys.setresuid(uid)
            .map_err(|e| map_nix_err(stage, e, format!("setresuid({})", uid)))?;

        let creds = self.sys.credentials()
            .map_err(|e| map_nix_err(stage, e, String::from("getresuid")))?;
        if !creds.all_equal(uid, gid) {
            return Err(LaunchError::new(
                stage,
                format!("ids after drop are uid {:?} gid {:?}, wanted {}/{}",
                        creds.uid, creds.gid, uid, gid),
                Errno::EPERM));
        }
        Ok(())
    }

    fn exec(&mut self, argv: Vec<OsString>) -> Result<S::Replaced, LaunchError> {
        let stage = self.cursor.enter(Stage::Exec);
        let program = self.config.program;
        let c_program = CString::new(program)
            .map_err(|_| map_nul_err(stage, format!("program path {:?}", program)))?;
        let c_argv = argv.into_iter().enumerate()
            .map(|(i, a)| CString::new(a.into_vec())
                 .map_err(|_| map_nul_err(stage, format!("argv[{}]", i))))
            .collect::<Result<Vec<CString>, LaunchError>>()?;

        self.sys.execv(&c_program, &c_argv)
            .map_err(|e| map_nix_err(stage, e, format!("execv({})", program)))
    }
}
