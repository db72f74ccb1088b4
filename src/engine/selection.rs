use rand::Rng;
use std::collections::HashMap;

use crate::database::models::{ReviewAssignment, ReviewReplacement, User};

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReplacementPlan {
    pub replacements: Vec<ReviewReplacement>,
    pub removals: Vec<ReviewAssignment>,
}

/// Greedy single pass over `assignments`.
///
/// For each assignment the candidate pool is scanned circularly from a random
/// offset; the first user who is neither the author nor already on that pull
/// request wins. Picks are written back into `reviewers`, so a later
/// assignment on the same pull request cannot choose the same user again. A
/// user may be picked for any number of different pull requests. Assignments
/// without an eligible candidate become removals.
pub fn plan_replacements<R: Rng + ?Sized>(
    assignments: &[ReviewAssignment],
    candidates: &[User],
    reviewers: &mut HashMap<String, Vec<String>>,
    rng: &mut R,
) -> ReplacementPlan {
    let mut plan = ReplacementPlan::default();

    for assignment in assignments {
        let current = reviewers
            .entry(assignment.pull_request_id.clone())
            .or_default();

        let picked = if candidates.is_empty() {
            None
        } else {
            let start = rng.gen_range(0..candidates.len());
            (0..candidates.len())
                .map(|i| &candidates[(start + i) % candidates.len()])
                .find(|u| u.user_id != assignment.author_id && !current.contains(&u.user_id))
        };

        match picked {
            Some(user) => {
                current.push(user.user_id.clone());
                plan.replacements.push(ReviewReplacement {
                    pull_request_id: assignment.pull_request_id.clone(),
                    old_user_id: assignment.reviewer_id.clone(),
                    new_user_id: user.user_id.clone(),
                });
            }
            None => plan.removals.push(assignment.clone()),
        }
    }

    plan
}
