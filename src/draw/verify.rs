//! Draw Verification
//!
//! Re-derives the seed and payout order from a published record and
//! checks for exact agreement, flagging the first point of divergence.
//! Single-shot pure computation: no storage, no network, no state.

use serde::{Serialize, Deserialize};

use crate::core::hash::is_hex_digest;
use super::inputs::DrawInputs;
use super::order::{generate_fair_order, RankedMember};
use super::seed::{compute_seed, Seed};

/// A published draw in the shape any verifier accepts:
/// the seed, the committed inputs, and the ordered results.
///
/// This is also the shape of the manual verification path, so a caller
/// can check a draw without trusting the storage layer at all.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    /// The published commitment digest.
    pub seed: Seed,

    /// The committed inputs the seed was derived from.
    pub inputs: DrawInputs,

    /// The published payout order, position by position.
    pub results: Vec<RecordedScore>,
}

/// One entry of a published result list.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordedScore {
    /// Member identifier at this position.
    #[serde(rename = "memberId")]
    pub member_id: String,

    /// Published score digest for this member.
    pub score: String,
}

impl From<RankedMember> for RecordedScore {
    fn from(ranked: RankedMember) -> Self {
        Self {
            member_id: ranked.member_id,
            score: ranked.score,
        }
    }
}

/// Why a verification attempt failed.
///
/// These are deterministic facts about the data, not transient faults;
/// retrying can never change the verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VerifyFailure {
    /// The record is missing a well-formed field; reported before any
    /// hashing is attempted.
    MalformedRecord {
        /// Which field is malformed and why.
        reason: String,
    },

    /// Recomputed seed disagrees with the published seed. Terminal for
    /// the attempt: no further comparison is meaningful.
    SeedMismatch {
        /// Seed recomputed from the record's inputs.
        expected: Seed,
        /// Seed the record claims.
        recorded: Seed,
    },

    /// Recomputed member count disagrees with the published result
    /// count. Indicates membership tampering rather than reordering.
    LengthMismatch {
        /// Count recomputed from the inputs.
        expected: usize,
        /// Count in the published results.
        recorded: usize,
    },

    /// Member at a position disagrees with the recomputed order.
    MemberMismatch {
        /// 1-based position of the first divergence.
        position: u32,
        /// Member id the recomputation puts there.
        expected: String,
        /// Member id the record puts there.
        recorded: String,
    },

    /// Score at a position disagrees with the recomputed value.
    ScoreMismatch {
        /// 1-based position of the first divergence.
        position: u32,
        /// Member the score belongs to.
        member_id: String,
        /// Recomputed score.
        expected: String,
        /// Published score.
        recorded: String,
    },
}

impl std::fmt::Display for VerifyFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedRecord { reason } => {
                write!(f, "Malformed record: {}", reason)
            }
            Self::SeedMismatch { expected, recorded } => {
                write!(f, "Seed mismatch: expected {}, recorded {}", expected, recorded)
            }
            Self::LengthMismatch { expected, recorded } => {
                write!(
                    f,
                    "Member count mismatch: expected {} results, recorded {}",
                    expected, recorded
                )
            }
            Self::MemberMismatch { position, expected, recorded } => {
                write!(
                    f,
                    "Order mismatch at position {}: expected member {}, recorded {}",
                    position, expected, recorded
                )
            }
            Self::ScoreMismatch { position, member_id, expected, recorded } => {
                write!(
                    f,
                    "Score mismatch at position {} for member {}: expected {}, recorded {}",
                    position, member_id, expected, recorded
                )
            }
        }
    }
}

/// Outcome of a verification attempt.
///
/// An invalid draw is an expected, meaningful outcome, not an error:
/// the verifier always terminates with a definite verdict for
/// well-formed input and never panics.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    /// Did the record check out exactly?
    pub is_valid: bool,

    /// The first divergence found, if any.
    pub failure: Option<VerifyFailure>,
}

impl VerificationReport {
    fn valid() -> Self {
        Self { is_valid: true, failure: None }
    }

    fn invalid(failure: VerifyFailure) -> Self {
        Self { is_valid: false, failure: Some(failure) }
    }

    /// Human-readable verdict for audit trails and clients.
    pub fn diagnostic(&self) -> String {
        match &self.failure {
            None => "Verification successful: the draw is mathematically valid".to_string(),
            Some(failure) => failure.to_string(),
        }
    }
}

/// Verify a published draw record.
///
/// 1. Reject records whose seed or scores are not digest-shaped,
///    before any hashing.
/// 2. Recompute the seed; a mismatch short-circuits the attempt.
/// 3. Recompute the fair order and compare counts, then each position's
///    member id and score, reporting the first divergence.
pub fn verify(record: &DrawRecord) -> VerificationReport {
    if let Some(reason) = malformed_reason(record) {
        return VerificationReport::invalid(VerifyFailure::MalformedRecord { reason });
    }

    let expected_seed = compute_seed(&record.inputs);
    if expected_seed != record.seed {
        return VerificationReport::invalid(VerifyFailure::SeedMismatch {
            expected: expected_seed,
            recorded: record.seed.clone(),
        });
    }

    let expected_order = generate_fair_order(&expected_seed, &record.inputs.members);

    if expected_order.len() != record.results.len() {
        return VerificationReport::invalid(VerifyFailure::LengthMismatch {
            expected: expected_order.len(),
            recorded: record.results.len(),
        });
    }

    for (index, (expected, recorded)) in
        expected_order.iter().zip(record.results.iter()).enumerate()
    {
        let position = index as u32 + 1;

        if expected.member_id != recorded.member_id {
            return VerificationReport::invalid(VerifyFailure::MemberMismatch {
                position,
                expected: expected.member_id.clone(),
                recorded: recorded.member_id.clone(),
            });
        }

        if expected.score != recorded.score {
            return VerificationReport::invalid(VerifyFailure::ScoreMismatch {
                position,
                member_id: expected.member_id.clone(),
                expected: expected.score.clone(),
                recorded: recorded.score.clone(),
            });
        }
    }

    VerificationReport::valid()
}

/// Shape check performed before any hashing.
fn malformed_reason(record: &DrawRecord) -> Option<String> {
    if !record.seed.is_well_formed() {
        return Some("seed is not a 64-char lowercase hex digest".to_string());
    }
    if record.inputs.members.is_empty() {
        return Some("inputs contain no members".to_string());
    }
    for entry in &record.results {
        if entry.member_id.is_empty() {
            return Some("result entry has an empty member id".to_string());
        }
        if !is_hex_digest(&entry.score) {
            return Some(format!(
                "score for member {} is not a 64-char lowercase hex digest",
                entry.member_id
            ));
        }
    }
    None
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn valid_record() -> DrawRecord {
        let inputs = DrawInputs::new(
            vec!["A".into(), "B".into(), "C".into()],
            1_700_000_000_000,
            "secret",
        );
        let seed = compute_seed(&inputs);
        let results = generate_fair_order(&seed, &inputs.members)
            .into_iter()
            .map(RecordedScore::from)
            .collect();
        DrawRecord { seed, inputs, results }
    }

    #[test]
    fn test_round_trip_valid() {
        let report = verify(&valid_record());
        assert!(report.is_valid);
        assert!(report.failure.is_none());
        assert!(report.diagnostic().contains("valid"));
    }

    #[test]
    fn test_seed_tamper_detected() {
        let mut record = valid_record();
        record.seed = Seed(record.seed.as_str().replacen('f', "0", 1));

        let report = verify(&record);
        assert!(!report.is_valid);
        match report.failure {
            Some(VerifyFailure::SeedMismatch { ref expected, ref recorded }) => {
                // Diagnostic names both values for audit.
                assert_ne!(expected, recorded);
                assert!(report.diagnostic().contains(expected.as_str()));
                assert!(report.diagnostic().contains(recorded.as_str()));
            }
            other => panic!("expected SeedMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_input_tamper_reports_seed_mismatch() {
        // Changing a committed input invalidates the seed first; the
        // verifier short-circuits without comparing the order.
        let mut record = valid_record();
        record.inputs.members[1] = "B2".into();

        let report = verify(&record);
        assert!(matches!(report.failure, Some(VerifyFailure::SeedMismatch { .. })));
    }

    #[test]
    fn test_length_tamper_detected() {
        let mut record = valid_record();
        record.results.pop();

        let report = verify(&record);
        match report.failure {
            Some(VerifyFailure::LengthMismatch { expected, recorded }) => {
                assert_eq!(expected, 3);
                assert_eq!(recorded, 2);
            }
            other => panic!("expected LengthMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_swapped_positions_detected() {
        let mut record = valid_record();
        record.results.swap(0, 1);

        let report = verify(&record);
        match report.failure {
            Some(VerifyFailure::MemberMismatch { position, .. }) => {
                assert_eq!(position, 1);
            }
            other => panic!("expected MemberMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_score_tamper_detected() {
        let mut record = valid_record();
        record.results[2].score = record.results[2].score.replacen('c', "d", 1);

        let report = verify(&record);
        match report.failure {
            Some(VerifyFailure::ScoreMismatch { position, ref member_id, .. }) => {
                assert_eq!(position, 3);
                assert_eq!(member_id, &record.results[2].member_id);
            }
            other => panic!("expected ScoreMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_malformed_seed_rejected_before_hashing() {
        let mut record = valid_record();
        record.seed = Seed("not-a-digest".into());

        let report = verify(&record);
        assert!(matches!(report.failure, Some(VerifyFailure::MalformedRecord { .. })));
    }

    #[test]
    fn test_malformed_score_rejected() {
        let mut record = valid_record();
        record.results[0].score = "zz".into();

        let report = verify(&record);
        match report.failure {
            Some(VerifyFailure::MalformedRecord { ref reason }) => {
                assert!(reason.contains(&record.results[0].member_id));
            }
            other => panic!("expected MalformedRecord, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_members_rejected() {
        let mut record = valid_record();
        record.inputs.members.clear();

        let report = verify(&record);
        assert!(matches!(report.failure, Some(VerifyFailure::MalformedRecord { .. })));
    }

    #[test]
    fn test_verify_does_not_mutate() {
        let record = valid_record();
        let before = record.clone();
        let _ = verify(&record);
        assert_eq!(record, before);
    }

    proptest! {
        /// Round-trip: a record built from the engine always verifies.
        #[test]
        fn prop_round_trip(
            members in proptest::collection::btree_set("[a-z0-9]{1,10}", 2..8),
            timestamp in 0i64..4_102_444_800_000,
            salt in "[a-z]{1,12}",
        ) {
            let members: Vec<String> = members.into_iter().collect();
            let inputs = DrawInputs::new(members.clone(), timestamp, salt);
            let seed = compute_seed(&inputs);
            let results = generate_fair_order(&seed, &members)
                .into_iter()
                .map(RecordedScore::from)
                .collect();

            let report = verify(&DrawRecord { seed, inputs, results });
            prop_assert!(report.is_valid);
        }

        /// Tampering with any single member id in the inputs flips the
        /// verdict to invalid.
        #[test]
        fn prop_member_tamper_invalid(
            members in proptest::collection::btree_set("[a-z0-9]{2,10}", 2..8),
            victim_index in 0usize..8,
        ) {
            let members: Vec<String> = members.into_iter().collect();
            let inputs = DrawInputs::new(members.clone(), 1_700_000_000_000, "salt".to_string());
            let seed = compute_seed(&inputs);
            let results: Vec<RecordedScore> = generate_fair_order(&seed, &members)
                .into_iter()
                .map(RecordedScore::from)
                .collect();

            let mut tampered = DrawRecord { seed, inputs, results };
            let victim = victim_index % tampered.inputs.members.len();
            tampered.inputs.members[victim].push('x');

            prop_assert!(!verify(&tampered).is_valid);
        }
    }
}
