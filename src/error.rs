use thiserror::Error;

pub type Result<T> = std::result::Result<T, RigError>;

/// The kind of index a name lookup or insertion was performed against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Joint,
    Controller,
}

impl std::fmt::Display for NameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NameKind::Joint => write!(f, "joint"),
            NameKind::Controller => write!(f, "controller"),
        }
    }
}

/// Errors produced while building or querying a rig
#[derive(Debug, Error)]
pub enum RigError {
    #[error("duplicate {kind} name '{name}'")]
    DuplicateKey { kind: NameKind, name: String },

    #[error("{kind} '{name}' not found")]
    UnknownName { kind: NameKind, name: String },

    #[error("joint '{name}' is its own ancestor")]
    Cycle { name: String },

    #[error(
        "sanity check fails: computed transform of joint '{name}' does not conform to world position, diff norm: {diff}"
    )]
    Consistency { name: String, diff: f64 },

    #[error("no local transform set for joint '{name}'")]
    MissingLocalTransform { name: String },

    #[error("global transform of joint '{name}' is singular (determinant {determinant})")]
    SingularMatrix { name: String, determinant: f64 },

    #[error("not a rotation matrix (orthonormality deviation {deviation}, determinant {determinant})")]
    DegenerateRotation { deviation: f64, determinant: f64 },

    #[error("cannot decompose matrix with degenerate scale {scale:?}")]
    DegenerateScale { scale: [f64; 3] },

    #[error("invalid record '{name}': {reason}")]
    InvalidRecord { name: String, reason: String },
}

impl RigError {
    pub(crate) fn unknown_joint(name: impl Into<String>) -> Self {
        Self::UnknownName {
            kind: NameKind::Joint,
            name: name.into(),
        }
    }

    pub(crate) fn unknown_controller(name: impl Into<String>) -> Self {
        Self::UnknownName {
            kind: NameKind::Controller,
            name: name.into(),
        }
    }
}
