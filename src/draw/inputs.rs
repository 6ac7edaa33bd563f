//! Draw Inputs
//!
//! The commitment preimage: everything a draw is derived from.
//! Once captured by the serving boundary, an input set is never edited;
//! the seed, scores and payout order are pure functions of it.

use serde::{Serialize, Deserialize};

/// Committed inputs for a draw.
///
/// The member list is treated as a *set*: it is canonicalized by
/// lexicographic sort before hashing, so submission order cannot change
/// the outcome. The only way to change the draw is to change the set of
/// members, the timestamp, the salt, or the external event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawInputs {
    /// Member identifiers, unique within a pool.
    pub members: Vec<String>,

    /// Milliseconds since epoch, captured once at commitment time.
    pub timestamp: i64,

    /// Organizer-supplied secret. The engine accepts an empty salt;
    /// the serving boundary rejects it.
    pub salt: String,

    /// Optional reference to entropy outside the system's control
    /// (e.g. a public block hash). Absent is the empty string.
    #[serde(default, rename = "externalEvent")]
    pub external_event: String,
}

impl DrawInputs {
    /// Create an input set with no external event.
    pub fn new(members: Vec<String>, timestamp: i64, salt: impl Into<String>) -> Self {
        Self {
            members,
            timestamp,
            salt: salt.into(),
            external_event: String::new(),
        }
    }

    /// Attach an external event reference.
    pub fn with_external_event(mut self, event: impl Into<String>) -> Self {
        self.external_event = event.into();
        self
    }

    /// Members in canonical (ascending lexicographic) order.
    pub fn canonical_members(&self) -> Vec<String> {
        let mut sorted = self.members.clone();
        sorted.sort();
        sorted
    }

    /// Build the commitment preimage, byte for byte:
    ///
    /// ```text
    /// sorted(members).join(",") + "|" + str(timestamp) + "|" + externalEvent + "|" + salt
    /// ```
    ///
    /// This format is a compatibility contract shared with every
    /// independent verifier; any change to delimiter, case, or field
    /// order breaks verification of previously published draws.
    ///
    /// Known limitation: the delimiters are not escaped against member
    /// ids or salts that themselves contain `|` or `,`. Two distinct
    /// input sets could in principle serialize to the same preimage.
    pub fn preimage(&self) -> String {
        [
            self.canonical_members().join(","),
            self.timestamp.to_string(),
            self.external_event.clone(),
            self.salt.clone(),
        ]
        .join("|")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc_inputs() -> DrawInputs {
        DrawInputs::new(
            vec!["A".into(), "B".into(), "C".into()],
            1_700_000_000_000,
            "secret",
        )
    }

    #[test]
    fn test_preimage_format() {
        // The exact byte sequence any independent implementation must produce.
        assert_eq!(abc_inputs().preimage(), "A,B,C|1700000000000||secret");
    }

    #[test]
    fn test_preimage_with_external_event() {
        let inputs = abc_inputs().with_external_event("block-843210");
        assert_eq!(inputs.preimage(), "A,B,C|1700000000000|block-843210|secret");
    }

    #[test]
    fn test_members_canonicalized() {
        let shuffled = DrawInputs::new(
            vec!["C".into(), "A".into(), "B".into()],
            1_700_000_000_000,
            "secret",
        );
        assert_eq!(shuffled.preimage(), abc_inputs().preimage());
        // The stored member list itself keeps submission order.
        assert_eq!(shuffled.members[0], "C");
    }

    #[test]
    fn test_serde_external_event_default() {
        // Records published before the field existed deserialize with "".
        let json = r#"{"members":["A","B"],"timestamp":1,"salt":"s"}"#;
        let inputs: DrawInputs = serde_json::from_str(json).unwrap();
        assert_eq!(inputs.external_event, "");
    }
}
