//! Fair Order Generator
//!
//! Derives a per-member score from the seed and produces the payout order
//! by sorting members on that score. The order is a pure function of
//! {seed, member set}; input sequence order never matters.

use serde::{Serialize, Deserialize};

use crate::core::hash::sha256_hex;
use super::seed::Seed;

/// One member's place in the payout schedule.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedMember {
    /// Member identifier.
    #[serde(rename = "memberId")]
    pub member_id: String,

    /// Lowercase hex SHA-256 of `seed ‖ member_id`.
    pub score: String,

    /// 1-based rank; position 1 receives the first payout month.
    pub position: u32,
}

/// Compute a member's score: `hex(sha256(seed + member_id))`.
pub fn member_score(seed: &Seed, member_id: &str) -> String {
    sha256_hex(&format!("{}{}", seed.as_str(), member_id))
}

/// Produce the payout order for a member set under a seed.
///
/// Members are scored and sorted ascending on the hex score string.
/// Ties (astronomically unlikely in a 256-bit digest space) break on the
/// member id itself, so the result is deterministic and stable for any
/// input arrangement. Fewer than 2 members is not rejected here: the
/// result is simply a 0- or 1-element order, and the serving boundary is
/// responsible for refusing to persist such a draw.
pub fn generate_fair_order(seed: &Seed, members: &[String]) -> Vec<RankedMember> {
    let mut ranked: Vec<RankedMember> = members
        .iter()
        .map(|member_id| RankedMember {
            member_id: member_id.clone(),
            score: member_score(seed, member_id),
            position: 0,
        })
        .collect();

    ranked.sort_by(|a, b| {
        a.score
            .cmp(&b.score)
            .then_with(|| a.member_id.cmp(&b.member_id))
    });

    for (index, member) in ranked.iter_mut().enumerate() {
        member.position = index as u32 + 1;
    }

    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draw::inputs::DrawInputs;
    use crate::draw::seed::compute_seed;
    use proptest::prelude::*;

    fn abc_seed() -> Seed {
        compute_seed(&DrawInputs::new(
            vec!["A".into(), "B".into(), "C".into()],
            1_700_000_000_000,
            "secret",
        ))
    }

    #[test]
    fn test_golden_order() {
        // Fixed vectors for the published scenario. Must never change.
        let order = generate_fair_order(&abc_seed(), &["A".into(), "B".into(), "C".into()]);

        assert_eq!(order.len(), 3);
        assert_eq!(order[0].member_id, "A");
        assert_eq!(
            order[0].score,
            "31da9500c76b03057b7849111a6b7fccf25f014d06b4c0d4281c5a46f1352e18"
        );
        assert_eq!(order[1].member_id, "B");
        assert_eq!(
            order[1].score,
            "9b7f21b641811b6ed755dd876369229bfc20a22d92d9dc5a9f7e2c8f6b22d923"
        );
        assert_eq!(order[2].member_id, "C");
        assert_eq!(
            order[2].score,
            "c915843601507ac30f4e93162c0d2a8b8d3713f70163f2438092fdc237bb8617"
        );
        assert_eq!(
            order.iter().map(|r| r.position).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
    }

    #[test]
    fn test_input_order_irrelevant() {
        let seed = abc_seed();
        let forward = generate_fair_order(&seed, &["A".into(), "B".into(), "C".into()]);
        let backward = generate_fair_order(&seed, &["C".into(), "B".into(), "A".into()]);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_scores_ascending() {
        let seed = abc_seed();
        let members: Vec<String> = (0..16).map(|i| format!("member-{i}")).collect();
        let order = generate_fair_order(&seed, &members);

        for pair in order.windows(2) {
            assert!(pair[0].score < pair[1].score);
        }
    }

    #[test]
    fn test_degenerate_member_counts() {
        let seed = abc_seed();
        assert!(generate_fair_order(&seed, &[]).is_empty());

        let solo = generate_fair_order(&seed, &["only".into()]);
        assert_eq!(solo.len(), 1);
        assert_eq!(solo[0].position, 1);
    }

    #[test]
    fn test_no_collisions_in_sample() {
        // Collision-freedom is a statistical property of the digest,
        // checked here over a generated population.
        let seed = abc_seed();
        let members: Vec<String> = (0..500).map(|i| format!("m{i}")).collect();
        let order = generate_fair_order(&seed, &members);

        let mut scores: Vec<&str> = order.iter().map(|r| r.score.as_str()).collect();
        scores.sort_unstable();
        scores.dedup();
        assert_eq!(scores.len(), members.len());
    }

    #[test]
    fn test_tie_break_is_member_id_order() {
        // Equal scores cannot be constructed through the hash, so check
        // the comparator contract directly: same score sorts by id.
        let a = RankedMember { member_id: "a".into(), score: "00".into(), position: 0 };
        let b = RankedMember { member_id: "b".into(), score: "00".into(), position: 0 };
        let mut pair = vec![b.clone(), a.clone()];
        pair.sort_by(|x, y| x.score.cmp(&y.score).then_with(|| x.member_id.cmp(&y.member_id)));
        assert_eq!(pair[0].member_id, "a");
        assert_eq!(pair[1].member_id, "b");
    }

    proptest! {
        /// Position assignment is identical for any permutation of the
        /// same member set under the same seed.
        #[test]
        fn prop_order_determinism(
            members in proptest::collection::btree_set("[a-z0-9]{1,10}", 2..10),
            salt in "[a-z]{1,10}",
        ) {
            let members: Vec<String> = members.into_iter().collect();
            let seed = compute_seed(&DrawInputs::new(members.clone(), 1_700_000_000_000, salt));

            let forward = generate_fair_order(&seed, &members);
            let mut reversed_input = members.clone();
            reversed_input.reverse();
            let backward = generate_fair_order(&seed, &reversed_input);

            prop_assert_eq!(forward, backward);
        }
    }
}
