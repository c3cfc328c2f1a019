//! The launch pipeline, as an explicit list of named stages.

use std::fmt;

/// One irreversible step of the launch pipeline.  Declared in
/// execution order; `PartialOrd` follows that order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    Resolving,
    GroupInit,
    Chdir,
    Isolating,
    DroppingGroup,
    DroppingUser,
    Exec,
}

impl Stage {
    /// Every stage, in the only order they may run.
    pub const PIPELINE: [Stage; 7] = [
        Stage::Resolving,
        Stage::GroupInit,
        Stage::Chdir,
        Stage::Isolating,
        Stage::DroppingGroup,
        Stage::DroppingUser,
        Stage::Exec,
    ];

    /// The stage that must come after this one, if any.
    pub fn next(self) -> Option<Stage> {
        let i = self as usize;
        Stage::PIPELINE.get(i + 1).copied()
    }

    /// Whether both privilege drops are complete by the time this
    /// stage runs.  A failure at any earlier stage ends the process
    /// while it is still privileged.
    pub fn runs_unprivileged(self) -> bool {
        self > Stage::DroppingUser
    }

    pub fn description(self) -> &'static str {
        match self {
            Stage::Resolving     => "identity lookup",
            Stage::GroupInit     => "supplementary group initialization",
            Stage::Chdir         => "working directory reset",
            Stage::Isolating     => "namespace isolation",
            Stage::DroppingGroup => "group privilege drop",
            Stage::DroppingUser  => "user privilege drop",
            Stage::Exec          => "execution of target program",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Forward-only position in `Stage::PIPELINE`.  A cursor can only be
/// moved onto the successor of the stage it is at.
#[derive(Debug)]
pub struct Cursor {
    at: Option<Stage>,
}

impl Cursor {
    pub fn new() -> Cursor {
        Cursor { at: None }
    }

    /// The stage most recently entered, if any.
    pub fn current(&self) -> Option<Stage> {
        self.at
    }

    /// Move onto `stage`.  Entering anything but the next stage in
    /// the pipeline is a bug in the caller.
    pub fn enter(&mut self, stage: Stage) -> Stage {
        let expected = match self.at {
            None => Some(Stage::Resolving),
            Some(s) => s.next(),
        };
        debug_assert_eq!(expected, Some(stage),
                         "pipeline stage entered out of order");
        log::debug!("entering stage: {}", stage);
        self.at = Some(stage);
        stage
    }
}
