//! Build-time configuration.
//!
//! Nothing here is read at run time.  The launcher runs with more
//! privilege than whoever invokes it, so its target identity and
//! program are captured from the build environment when the crate is
//! compiled:
//!
//! ```text
//! SANDBOX_USER     user to drop to              (default nobody)
//! SANDBOX_GROUP    group to drop to             (default nogroup)
//! SANDBOX_WORKDIR  directory to chdir into      (default /)
//! SANDBOX_PROGRAM  absolute path of the target  (default /usr/bin/lynx)
//! SANDBOX_LOG      log level, error..trace      (default warn)
//! ```

use log::LevelFilter;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    pub user:    &'static str,
    pub group:   &'static str,
    pub workdir: &'static str,
    pub program: &'static str,
    pub log:     &'static str,
}

macro_rules! build_env {
    ($var:literal, $default:literal) => {
        match option_env!($var) {
            Some(v) => v,
            None => $default,
        }
    };
}

pub const BUILTIN: Config = Config {
    user:    build_env!("SANDBOX_USER", "nobody"),
    group:   build_env!("SANDBOX_GROUP", "nogroup"),
    workdir: build_env!("SANDBOX_WORKDIR", "/"),
    program: build_env!("SANDBOX_PROGRAM", "/usr/bin/lynx"),
    log:     build_env!("SANDBOX_LOG", "warn"),
};

const fn is_absolute(path: &str) -> bool {
    let b = path.as_bytes();
    !b.is_empty() && b[0] == b'/'
}

const _: () = assert!(is_absolute(BUILTIN.program),
                      "SANDBOX_PROGRAM must be an absolute path");
const _: () = assert!(is_absolute(BUILTIN.workdir),
                      "SANDBOX_WORKDIR must be an absolute path");

impl Config {
    /// The level handed to the logger.  An unrecognized name falls
    /// back to `Warn`; errors are never filtered out.
    pub fn log_level(&self) -> LevelFilter {
        match self.log.parse::<LevelFilter>() {
            Ok(LevelFilter::Off) | Err(_) => LevelFilter::Warn,
            Ok(level) => level,
        }
    }
}

impl Default for Config {
    fn default() -> Config {
        BUILTIN
    }
}
