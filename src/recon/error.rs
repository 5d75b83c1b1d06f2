use std::fmt;

/// Validation errors surfaced by the reconciliation core.
///
/// Data-quality conditions (odd punch counts, punches without a shift) are
/// deliberately NOT errors: they come out of the classifier as anomaly
/// records. This enum covers only malformed input and rejected workflow
/// requests.
#[derive(Debug, PartialEq, Eq)]
pub enum ReconError {
    /// A clock string was not a valid `HH:MM` time.
    BadTime(String),
    /// Refuse requires a non-empty comment.
    MissingRefusalComment,
    /// Correct requires a non-empty justification.
    MissingJustification,
    /// Validate with pay_missing_hours set requires a comment.
    MissingValidationComment,
    /// The treat action string was not valider/refuser/corriger.
    UnknownAction(String),
    /// The correction payload was absent or did not describe a usable fix.
    InvalidCorrection(String),
}

impl fmt::Display for ReconError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadTime(value) => write!(f, "invalid HH:MM time: '{value}'"),
            Self::MissingRefusalComment => {
                write!(f, "a non-empty comment is required to refuse an anomaly")
            }
            Self::MissingJustification => {
                write!(f, "a non-empty justification is required to correct an anomaly")
            }
            Self::MissingValidationComment => {
                write!(f, "a comment is required when pay_missing_hours is set")
            }
            Self::UnknownAction(action) => {
                write!(f, "unknown action '{action}', expected valider, refuser or corriger")
            }
            Self::InvalidCorrection(reason) => write!(f, "invalid correction payload: {reason}"),
        }
    }
}

impl std::error::Error for ReconError {}
