//! Ballot parsing and tally computation.
//!
//! # Purpose
//! Pure functions over vote counts: parse the two accepted vote tokens and
//! derive the aggregate snapshot that gets broadcast to observers.
use serde::{Deserialize, Serialize};

/// A single binary-choice vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ballot {
    Yes,
    No,
}

impl Ballot {
    /// Parse a raw vote token. Only the exact tokens `"yes"` and `"no"` are
    /// accepted; anything else is `None` so callers can drop it without
    /// surfacing an error.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "yes" => Some(Ballot::Yes),
            "no" => Some(Ballot::No),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Ballot::Yes => "yes",
            Ballot::No => "no",
        }
    }
}

/// Aggregate counts and derived percentages at a point in time.
///
/// Derived, never stored: recomputed from the vote store on every query.
/// `p_yes + p_no` is exactly 100 whenever `total > 0` and 0 otherwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub yes: u64,
    pub no: u64,
    pub total: u64,
    #[serde(rename = "pYes")]
    pub p_yes: u8,
    #[serde(rename = "pNo")]
    pub p_no: u8,
}

impl Tally {
    /// Compute the snapshot for the given counts.
    ///
    /// The yes percentage is rounded half-up; the no percentage is derived as
    /// the complement so independent rounding can never make the pair drift
    /// off 100.
    pub fn compute(yes: u64, no: u64) -> Self {
        let total = yes + no;
        if total == 0 {
            return Self {
                yes,
                no,
                total,
                p_yes: 0,
                p_no: 0,
            };
        }
        let p_yes = ((100 * yes + total / 2) / total) as u8;
        Self {
            yes,
            no,
            total,
            p_yes,
            p_no: 100 - p_yes,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_only_the_two_vote_tokens() {
        assert_eq!(Ballot::parse("yes"), Some(Ballot::Yes));
        assert_eq!(Ballot::parse("no"), Some(Ballot::No));
        assert_eq!(Ballot::parse("maybe"), None);
        assert_eq!(Ballot::parse("YES"), None);
        assert_eq!(Ballot::parse(""), None);
        assert_eq!(Ballot::parse(" yes"), None);
    }

    #[test]
    fn empty_tally_has_zero_percentages() {
        let tally = Tally::compute(0, 0);
        assert_eq!(tally.total, 0);
        assert_eq!(tally.p_yes, 0);
        assert_eq!(tally.p_no, 0);
        assert!(tally.is_empty());
    }

    #[test]
    fn one_third_majority_rounds_to_33_67() {
        // 33.33/66.67 in truth; the pair must still sum to exactly 100.
        let tally = Tally::compute(1, 2);
        assert_eq!(tally.p_yes, 33);
        assert_eq!(tally.p_no, 67);
    }

    #[test]
    fn exact_half_rounds_up() {
        // 3/8 = 37.5, rounded half-up to 38.
        let tally = Tally::compute(3, 5);
        assert_eq!(tally.p_yes, 38);
        assert_eq!(tally.p_no, 62);
    }

    #[test]
    fn percentages_always_sum_to_100_for_nonempty_tallies() {
        for yes in 0..40u64 {
            for no in 0..40u64 {
                let tally = Tally::compute(yes, no);
                assert_eq!(tally.yes + tally.no, tally.total);
                let expected = if tally.total > 0 { 100 } else { 0 };
                assert_eq!(
                    u32::from(tally.p_yes) + u32::from(tally.p_no),
                    expected,
                    "yes={yes} no={no}"
                );
            }
        }
    }

    #[test]
    fn unanimous_votes_hit_the_extremes() {
        let all_yes = Tally::compute(4, 0);
        assert_eq!((all_yes.p_yes, all_yes.p_no), (100, 0));
        let all_no = Tally::compute(0, 7);
        assert_eq!((all_no.p_yes, all_no.p_no), (0, 100));
    }

    #[test]
    fn tally_serializes_with_wire_field_names() {
        let tally = Tally::compute(1, 1);
        let value = serde_json::to_value(tally).expect("serialize");
        assert_eq!(value["yes"], 1);
        assert_eq!(value["no"], 1);
        assert_eq!(value["total"], 2);
        assert_eq!(value["pYes"], 50);
        assert_eq!(value["pNo"], 50);
    }
}
