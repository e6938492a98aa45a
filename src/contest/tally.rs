use std::collections::BTreeSet;

use crate::types::{Candidate, UserId};

/// Result of tallying one voting venue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TallyOutcome {
    /// The venue held no candidates at all
    NoCandidates,
    /// Every candidate was excluded (already won this tier)
    NoEligibleWinners,
    /// All eligible candidates at the maximum count; ties are all winners
    Winners {
        winners: Vec<Candidate>,
        max_votes: u32,
    },
}

/// Compute the winner set from candidates and an exclusion set.
///
/// Ties at the maximum all win; the result does not depend on input order.
/// Candidates must already carry adjusted vote counts (the service's own
/// seed reaction subtracted).
pub fn tally(candidates: &[Candidate], excluded: &BTreeSet<UserId>) -> TallyOutcome {
    if candidates.is_empty() {
        return TallyOutcome::NoCandidates;
    }

    let eligible: Vec<&Candidate> = candidates
        .iter()
        .filter(|c| !excluded.contains(&c.author_id))
        .collect();

    if eligible.is_empty() {
        return TallyOutcome::NoEligibleWinners;
    }

    let max_votes = eligible.iter().map(|c| c.votes).max().unwrap_or(0);
    let mut winners: Vec<Candidate> = eligible
        .into_iter()
        .filter(|c| c.votes == max_votes)
        .cloned()
        .collect();
    winners.sort_by_key(|c| c.author_id);

    TallyOutcome::Winners { winners, max_votes }
}
