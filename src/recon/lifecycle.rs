//! Anomaly review workflow decisions.
//!
//! `pending → {validated, refused, corrected}` is the only reviewer-driven
//! transition family; `obsolete` is reserved for superseding reconciliation
//! passes. This module holds the pure part: request validation, the
//! decision table (status, score delta, shift mutation), and segment
//! rewriting for corrections. Applying a decision to the database lives in
//! the anomaly API, guarded by a compare-and-swap on the status column.

use serde::Deserialize;
use utoipa::ToSchema;

use crate::model::anomaly::AnomalyStatus;
use crate::model::shift::Segment;
use crate::recon::error::ReconError;
use crate::recon::hours::parse_hhmm;

/// Score adjustment applied when an anomaly is validated.
pub const VALIDATE_SCORE_DELTA: i32 = 1;
/// Refusal weighs exactly double a validation, negatively.
pub const REFUSE_SCORE_DELTA: i32 = -2 * VALIDATE_SCORE_DELTA;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CorrectionPayload {
    /// What went wrong administratively, e.g. `wrong_start`, `wrong_end`,
    /// `wrong_segments`.
    #[schema(example = "wrong_start")]
    pub error_type: String,
    /// Replacement start for the first segment.
    #[schema(example = "09:30")]
    pub new_start: Option<String>,
    /// Replacement end for the last segment.
    #[schema(example = "17:30")]
    pub new_end: Option<String>,
    /// Full segment replacement; wins over new_start/new_end when present.
    pub segments: Option<Vec<Segment>>,
}

/// Body of `POST /anomaly/{id}/treat`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct TreatRequest {
    /// One of `valider`, `refuser`, `corriger`.
    #[schema(example = "valider")]
    pub action: String,
    pub comment: Option<String>,
    /// On validate: mark the short hours payable in full.
    pub pay_missing_hours: Option<bool>,
    pub correction: Option<CorrectionPayload>,
}

/// A fully validated reviewer action.
#[derive(Debug, Clone)]
pub enum TreatAction {
    Validate {
        comment: Option<String>,
        pay_missing_hours: bool,
    },
    Refuse {
        comment: String,
    },
    Correct {
        justification: String,
        correction: CorrectionPayload,
    },
}

/// What applying an action does, independent of any particular anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    pub new_status: AnomalyStatus,
    pub score_delta: i32,
    pub mutates_shift: bool,
    /// Validate and correct clear the consecutive-refusal streak.
    pub resets_refusals: bool,
    pub counts_refusal: bool,
}

/// Check a raw request against the workflow's preconditions.
pub fn parse_request(req: TreatRequest) -> Result<TreatAction, ReconError> {
    let comment = req.comment.map(|c| c.trim().to_string()).filter(|c| !c.is_empty());

    match req.action.as_str() {
        "valider" => {
            let pay_missing_hours = req.pay_missing_hours.unwrap_or(false);
            if pay_missing_hours && comment.is_none() {
                return Err(ReconError::MissingValidationComment);
            }
            Ok(TreatAction::Validate {
                comment,
                pay_missing_hours,
            })
        }
        "refuser" => {
            let comment = comment.ok_or(ReconError::MissingRefusalComment)?;
            Ok(TreatAction::Refuse { comment })
        }
        "corriger" => {
            let justification = comment.ok_or(ReconError::MissingJustification)?;
            let correction = req
                .correction
                .ok_or_else(|| ReconError::InvalidCorrection("payload is required".to_string()))?;
            validate_correction(&correction)?;
            Ok(TreatAction::Correct {
                justification,
                correction,
            })
        }
        other => Err(ReconError::UnknownAction(other.to_string())),
    }
}

fn validate_correction(correction: &CorrectionPayload) -> Result<(), ReconError> {
    if let Some(segments) = &correction.segments {
        if segments.is_empty() {
            return Err(ReconError::InvalidCorrection(
                "replacement segments must not be empty".to_string(),
            ));
        }
        for segment in segments {
            parse_hhmm(&segment.start)?;
            parse_hhmm(&segment.end)?;
        }
        return Ok(());
    }
    if correction.new_start.is_none() && correction.new_end.is_none() {
        return Err(ReconError::InvalidCorrection(
            "expected segments or new_start/new_end".to_string(),
        ));
    }
    if let Some(start) = &correction.new_start {
        parse_hhmm(start)?;
    }
    if let Some(end) = &correction.new_end {
        parse_hhmm(end)?;
    }
    Ok(())
}

/// The decision table for the three terminal actions.
pub fn decide(action: &TreatAction) -> Decision {
    match action {
        TreatAction::Validate { .. } => Decision {
            new_status: AnomalyStatus::Validated,
            score_delta: VALIDATE_SCORE_DELTA,
            mutates_shift: false,
            resets_refusals: true,
            counts_refusal: false,
        },
        TreatAction::Refuse { .. } => Decision {
            new_status: AnomalyStatus::Refused,
            score_delta: REFUSE_SCORE_DELTA,
            mutates_shift: false,
            resets_refusals: false,
            counts_refusal: true,
        },
        // Correction attributes the deviation to an administrative error,
        // not employee behavior. No score movement.
        TreatAction::Correct { .. } => Decision {
            new_status: AnomalyStatus::Corrected,
            score_delta: 0,
            mutates_shift: true,
            resets_refusals: true,
            counts_refusal: false,
        },
    }
}

/// Produce the corrected segment list. The caller audits the prior value
/// before persisting the replacement.
pub fn apply_correction(
    segments: &[Segment],
    correction: &CorrectionPayload,
) -> Result<Vec<Segment>, ReconError> {
    if let Some(replacement) = &correction.segments {
        return Ok(replacement.clone());
    }
    if segments.is_empty() {
        return Err(ReconError::InvalidCorrection(
            "shift has no segments to adjust".to_string(),
        ));
    }
    let mut corrected = segments.to_vec();
    if let Some(start) = &correction.new_start {
        if let Some(first) = corrected.first_mut() {
            first.start = start.clone();
        }
    }
    if let Some(end) = &correction.new_end {
        if let Some(last) = corrected.last_mut() {
            last.end = end.clone();
        }
    }
    Ok(corrected)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(action: &str, comment: Option<&str>) -> TreatRequest {
        TreatRequest {
            action: action.to_string(),
            comment: comment.map(str::to_string),
            pay_missing_hours: None,
            correction: None,
        }
    }

    #[test]
    fn refuse_penalty_is_exactly_double_validate_reward() {
        assert_eq!(REFUSE_SCORE_DELTA, -2 * VALIDATE_SCORE_DELTA);
        let validate = decide(&parse_request(req("valider", None)).unwrap());
        let refuse = decide(&parse_request(req("refuser", Some("no-show"))).unwrap());
        assert_eq!(refuse.score_delta, -2 * validate.score_delta);
    }

    #[test]
    fn correct_applies_zero_penalty_and_mutates_the_shift() {
        let action = TreatAction::Correct {
            justification: "planner typo".to_string(),
            correction: CorrectionPayload {
                error_type: "wrong_start".to_string(),
                new_start: Some("09:30".to_string()),
                new_end: None,
                segments: None,
            },
        };
        let decision = decide(&action);
        assert_eq!(decision.score_delta, 0);
        assert!(decision.mutates_shift);
        assert!(decision.resets_refusals);
    }

    #[test]
    fn validate_and_refuse_never_mutate_the_shift() {
        assert!(!decide(&parse_request(req("valider", None)).unwrap()).mutates_shift);
        assert!(!decide(&parse_request(req("refuser", Some("x"))).unwrap()).mutates_shift);
    }

    #[test]
    fn refuse_without_comment_is_rejected() {
        assert_eq!(
            parse_request(req("refuser", None)).unwrap_err(),
            ReconError::MissingRefusalComment
        );
        assert_eq!(
            parse_request(req("refuser", Some("   "))).unwrap_err(),
            ReconError::MissingRefusalComment
        );
    }

    #[test]
    fn correct_requires_justification_and_payload() {
        assert_eq!(
            parse_request(req("corriger", None)).unwrap_err(),
            ReconError::MissingJustification
        );
        let missing_payload = parse_request(req("corriger", Some("typo"))).unwrap_err();
        assert!(matches!(missing_payload, ReconError::InvalidCorrection(_)));
    }

    #[test]
    fn validate_with_pay_flag_requires_comment() {
        let mut r = req("valider", None);
        r.pay_missing_hours = Some(true);
        assert_eq!(
            parse_request(r).unwrap_err(),
            ReconError::MissingValidationComment
        );
    }

    #[test]
    fn unknown_action_is_rejected_with_the_offending_value() {
        match parse_request(req("annuler", None)).unwrap_err() {
            ReconError::UnknownAction(a) => assert_eq!(a, "annuler"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn correction_with_malformed_replacement_time_is_rejected() {
        let mut r = req("corriger", Some("typo"));
        r.correction = Some(CorrectionPayload {
            error_type: "wrong_start".to_string(),
            new_start: Some("9h30".to_string()),
            new_end: None,
            segments: None,
        });
        assert!(matches!(parse_request(r).unwrap_err(), ReconError::BadTime(_)));
    }

    #[test]
    fn apply_correction_adjusts_first_start_and_last_end() {
        let segments = vec![Segment::new("09:00", "13:00"), Segment::new("14:00", "18:00")];
        let correction = CorrectionPayload {
            error_type: "wrong_start".to_string(),
            new_start: Some("09:30".to_string()),
            new_end: Some("17:30".to_string()),
            segments: None,
        };
        let corrected = apply_correction(&segments, &correction).unwrap();
        assert_eq!(corrected[0].start, "09:30");
        assert_eq!(corrected[0].end, "13:00");
        assert_eq!(corrected[1].end, "17:30");
    }

    #[test]
    fn apply_correction_full_replacement_wins() {
        let segments = vec![Segment::new("09:00", "18:00")];
        let correction = CorrectionPayload {
            error_type: "wrong_segments".to_string(),
            new_start: None,
            new_end: None,
            segments: Some(vec![Segment::new("10:00", "15:00")]),
        };
        let corrected = apply_correction(&segments, &correction).unwrap();
        assert_eq!(corrected.len(), 1);
        assert_eq!(corrected[0].start, "10:00");
        assert_eq!(corrected[0].end, "15:00");
    }
}
