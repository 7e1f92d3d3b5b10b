use std::fmt;

/// Where an import currently stands.
///
/// ```text
/// Idle -> Validating -> Clearing -> Writing -> Done
///             |            |           |
///             +------------+-----------+-----> Failed
/// ```
///
/// `Idle`, `Done`, and `Failed` are rest states; a new import may start from
/// any of them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ImportPhase {
    Idle,
    Validating,
    Clearing,
    Writing,
    Done,
    Failed,
}

impl ImportPhase {
    pub fn is_rest(self) -> bool {
        matches!(self, Self::Idle | Self::Done | Self::Failed)
    }

    /// Whether `self -> next` is a legal step.
    pub fn can_advance_to(self, next: Self) -> bool {
        use ImportPhase::*;
        match (self, next) {
            (Idle | Done | Failed, Validating) => true,
            (Validating, Clearing) | (Clearing, Writing) | (Writing, Done) => true,
            (Validating | Clearing | Writing, Failed) => true,
            _ => false,
        }
    }
}

impl Default for ImportPhase {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Validating => "validating",
            Self::Clearing => "clearing",
            Self::Writing => "writing",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(s)
    }
}
