//! Run scoring.

use crate::domain::Score;

pub const BASE_SCORE: i64 = 100;
pub const SPEED_BONUS: i64 = 10;
/// Runs faster than this earn the speed bonus.
pub const SPEED_BONUS_THRESHOLD_MS: u64 = 5 * 60 * 1000;
/// Commits beyond this count are penalised.
pub const COMMITS_THRESHOLD: u32 = 20;
pub const PENALTY_PER_EXTRA_COMMIT: i64 = 2;

/// Compute the score breakdown for a run. Not clamped.
pub fn score(runtime_ms: u64, total_commits: u32) -> Score {
    let speed_bonus = if runtime_ms < SPEED_BONUS_THRESHOLD_MS {
        SPEED_BONUS
    } else {
        0
    };
    let extra_commits = i64::from(total_commits.saturating_sub(COMMITS_THRESHOLD));
    let efficiency_penalty = extra_commits * PENALTY_PER_EXTRA_COMMIT;

    Score {
        base_score: BASE_SCORE,
        speed_bonus,
        efficiency_penalty,
        final_score: BASE_SCORE + speed_bonus - efficiency_penalty,
    }
}
