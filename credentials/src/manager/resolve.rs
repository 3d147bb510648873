//! The order in which a secret is looked for.
//!
//! Kept free of I/O: the manager walks the steps returned here and performs
//! each lookup itself, stopping at the first hit.

use std::fmt;

/// Whether the caller may block on terminal input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Interactive,
    /// Automated pipelines: never touch the terminal, fail deterministically.
    NonInteractive,
}

impl Mode {
    pub fn is_interactive(self) -> bool {
        self == Self::Interactive
    }
}

/// One place a secret can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Value passed explicitly by the caller (e.g. a `--token` flag).
    Explicit,
    /// The active backend.
    Stored,
    /// The named environment variable.
    Environment,
    /// Ask the user, echo disabled.
    Prompt,
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Explicit => "explicit value",
            Self::Stored => "stored credential",
            Self::Environment => "environment",
            Self::Prompt => "prompt",
        };
        f.write_str(s)
    }
}

const INTERACTIVE: &[Step] = &[Step::Explicit, Step::Stored, Step::Environment, Step::Prompt];
const NON_INTERACTIVE: &[Step] = &[Step::Explicit, Step::Stored, Step::Environment];

/// Lookup steps for `mode`, in priority order. Exhausting them means the
/// credential is missing.
pub fn resolution_order(mode: Mode) -> &'static [Step] {
    match mode {
        Mode::Interactive => INTERACTIVE,
        Mode::NonInteractive => NON_INTERACTIVE,
    }
}
