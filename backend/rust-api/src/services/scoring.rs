//! Pure scoring rules behind competency tracking and question selection.
//!
//! Everything here works on plain values so it can be tested without stores
//! or sessions.

use chrono::{DateTime, Utc};
use rand::distr::{weighted::WeightedIndex, Distribution};
use rand::Rng;
use std::cmp::Ordering;

use crate::models::competency::{Competency, MasteryLevel, ReadinessReport, Trend};
use crate::models::question::DifficultyBand;
use crate::models::PracticeMode;

/// (level, minimum accuracy, minimum attempts), strongest level first.
pub const MASTERY_THRESHOLDS: [(MasteryLevel, f64, u32); 5] = [
    (MasteryLevel::Master, 0.95, 20),
    (MasteryLevel::Expert, 0.80, 10),
    (MasteryLevel::Proficient, 0.60, 5),
    (MasteryLevel::Developing, 0.40, 5),
    (MasteryLevel::Novice, 0.0, 0),
];

// Balanced mode mixture
pub const BALANCED_NEW_CONTENT_SHARE: f64 = 0.5;
pub const BALANCED_REVIEW_SHARE: f64 = 0.3;
pub const BALANCED_WEAK_SHARE: f64 = 0.2;

pub const WEAK_FOCUS_SHARE: f64 = 0.7;

/// Review weight saturates after this many seconds without practice (14 days)
pub const REVIEW_HORIZON_SECS: f64 = 14.0 * 86_400.0;
const REVIEW_WEIGHT_UNIT_SECS: f64 = 7.0 * 86_400.0;
pub const REVIEW_MAX_WEIGHT: f64 = REVIEW_HORIZON_SECS / REVIEW_WEIGHT_UNIT_SECS;

pub const WEAK_AREA_MIN_ATTEMPTS: u32 = 5;
pub const WEAK_AREA_TARGET_ACCURACY: f64 = 0.70;

const HINT_STRUGGLE_ACCURACY: f64 = 0.60;
const HINT_STRUGGLE_ELAPSED_MS: u64 = 60_000;
const HINT_ALWAYS_ELAPSED_MS: u64 = 180_000;

const READINESS_COVERAGE_WEIGHT: f64 = 0.3;
const READINESS_ACCURACY_WEIGHT: f64 = 0.4;
const READINESS_MASTERY_WEIGHT: f64 = 0.3;

pub fn mastery_for(accuracy: f64, attempts: u32) -> MasteryLevel {
    MASTERY_THRESHOLDS
        .iter()
        .find(|(_, min_accuracy, min_attempts)| {
            accuracy >= *min_accuracy && attempts >= *min_attempts
        })
        .map(|(level, _, _)| *level)
        .unwrap_or(MasteryLevel::Novice)
}

/// Appends an outcome, dropping the oldest ones beyond `capacity`.
pub fn push_outcome(outcomes: &mut Vec<bool>, correct: bool, capacity: usize) {
    outcomes.push(correct);
    if outcomes.len() > capacity {
        let overflow = outcomes.len() - capacity;
        outcomes.drain(..overflow);
    }
}

/// Compares the last `window` outcomes with the `window` before them.
/// Outcomes are oldest first; fewer than two full windows is `Stable`.
pub fn trend_for(outcomes: &[bool], window: usize, margin: f64) -> Trend {
    if window == 0 || outcomes.len() < window * 2 {
        return Trend::Stable;
    }

    let recent = &outcomes[outcomes.len() - window..];
    let prior = &outcomes[outcomes.len() - window * 2..outcomes.len() - window];
    let recent_correct = recent.iter().filter(|c| **c).count() as i64;
    let prior_correct = prior.iter().filter(|c| **c).count() as i64;

    // Difference of counts keeps the comparison exact at the margin
    let diff = (recent_correct - prior_correct) as f64 / window as f64;
    if diff > margin {
        Trend::Improving
    } else if diff < -margin {
        Trend::Declining
    } else {
        Trend::Stable
    }
}

pub fn target_band(mastery: MasteryLevel) -> DifficultyBand {
    match mastery {
        MasteryLevel::Novice | MasteryLevel::Developing => DifficultyBand::Easy,
        MasteryLevel::Proficient => DifficultyBand::Medium,
        MasteryLevel::Expert | MasteryLevel::Master => DifficultyBand::Hard,
    }
}

/// Weakest first: lower mastery, then lower accuracy, then fewer attempts.
pub fn weakness_order(a: &Competency, b: &Competency) -> Ordering {
    a.mastery_level
        .cmp(&b.mastery_level)
        .then_with(|| a.accuracy().total_cmp(&b.accuracy()))
        .then_with(|| a.total_attempts.cmp(&b.total_attempts))
        .then_with(|| a.topic_id.cmp(&b.topic_id))
}

fn weakness_score(competency: &Competency) -> f64 {
    let levels_below_master = (MasteryLevel::Master as u8 - competency.mastery_level as u8) as f64;
    levels_below_master + (1.0 - competency.accuracy())
}

fn new_content_score(competency: &Competency) -> f64 {
    1.0 / (1.0 + competency.total_attempts as f64)
}

/// Grows with time since last practice, capped at the review horizon;
/// never-practiced topics get the cap.
pub fn review_weight(last_practiced: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_practiced {
        None => REVIEW_MAX_WEIGHT,
        Some(at) => {
            let elapsed = (now - at).num_seconds().max(0) as f64;
            elapsed.min(REVIEW_HORIZON_SECS) / REVIEW_WEIGHT_UNIT_SECS
        }
    }
}

fn normalized(scores: Vec<f64>) -> Vec<f64> {
    let total: f64 = scores.iter().sum();
    if scores.is_empty() || total <= 0.0 {
        let uniform = if scores.is_empty() {
            0.0
        } else {
            1.0 / scores.len() as f64
        };
        return vec![uniform; scores.len()];
    }
    scores.into_iter().map(|s| s / total).collect()
}

/// Selection weight per topic, aligned with `topics`.
pub fn topic_weights(
    mode: PracticeMode,
    topics: &[Competency],
    now: DateTime<Utc>,
    weak_topic_count: usize,
) -> Vec<f64> {
    match mode {
        PracticeMode::Competition => vec![1.0; topics.len()],
        PracticeMode::Review => topics
            .iter()
            .map(|c| review_weight(c.last_practiced, now))
            .collect(),
        PracticeMode::Balanced => {
            let new_content = normalized(topics.iter().map(new_content_score).collect());
            let review = normalized(
                topics
                    .iter()
                    .map(|c| review_weight(c.last_practiced, now))
                    .collect(),
            );
            let weak = normalized(topics.iter().map(weakness_score).collect());

            new_content
                .iter()
                .zip(review.iter())
                .zip(weak.iter())
                .map(|((n, r), w)| {
                    BALANCED_NEW_CONTENT_SHARE * n
                        + BALANCED_REVIEW_SHARE * r
                        + BALANCED_WEAK_SHARE * w
                })
                .collect()
        }
        PracticeMode::WeakFocus => {
            let weakest = weakest_indices(topics, weak_topic_count);
            let rest = topics.len() - weakest.len();
            if rest == 0 {
                return vec![1.0; topics.len()];
            }

            let weak_each = WEAK_FOCUS_SHARE / weakest.len() as f64;
            let rest_each = (1.0 - WEAK_FOCUS_SHARE) / rest as f64;
            (0..topics.len())
                .map(|i| {
                    if weakest.contains(&i) {
                        weak_each
                    } else {
                        rest_each
                    }
                })
                .collect()
        }
    }
}

/// Indices of the `count` weakest topics
pub fn weakest_indices(topics: &[Competency], count: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..topics.len()).collect();
    order.sort_by(|a, b| weakness_order(&topics[*a], &topics[*b]));
    order.truncate(count.max(1));
    order
}

/// Picks an index proportionally to `weights`. Falls back to a uniform pick
/// when no weight is positive.
pub fn weighted_pick<R: Rng>(weights: &[f64], rng: &mut R) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    match WeightedIndex::new(weights) {
        Ok(distribution) => Some(distribution.sample(rng)),
        Err(_) => Some(rng.random_range(0..weights.len())),
    }
}

/// Equal weight per topic; topics without attempts count as zero.
pub fn readiness(all_topics: &[String], competencies: &[Competency]) -> ReadinessReport {
    let mut topics: Vec<&str> = all_topics.iter().map(String::as_str).collect();
    for competency in competencies {
        if !topics.contains(&competency.topic_id.as_str()) {
            topics.push(competency.topic_id.as_str());
        }
    }
    if topics.is_empty() {
        return ReadinessReport::empty();
    }

    let started: Vec<&Competency> = competencies
        .iter()
        .filter(|c| c.total_attempts > 0)
        .collect();
    let total = topics.len() as f64;

    let coverage = started.len() as f64 / total * 100.0;
    let accuracy = started.iter().map(|c| c.accuracy()).sum::<f64>() / total * 100.0;
    let mastery = started
        .iter()
        .map(|c| c.mastery_level.readiness_weight())
        .sum::<f64>()
        / total
        * 100.0;
    let score = coverage * READINESS_COVERAGE_WEIGHT
        + accuracy * READINESS_ACCURACY_WEIGHT
        + mastery * READINESS_MASTERY_WEIGHT;

    ReadinessReport {
        score: as_percent(score),
        coverage: as_percent(coverage),
        accuracy: as_percent(accuracy),
        mastery: as_percent(mastery),
        topics_total: topics.len(),
        topics_started: started.len(),
    }
}

fn as_percent(value: f64) -> u8 {
    // Absorb float error so 49.999999 reads as 50
    (value + 1e-9).clamp(0.0, 100.0).floor() as u8
}

pub fn is_weak_area(competency: &Competency) -> bool {
    competency.total_attempts >= WEAK_AREA_MIN_ATTEMPTS
        && competency.accuracy() < WEAK_AREA_TARGET_ACCURACY
}

pub fn should_offer_hint(competency: Option<&Competency>, elapsed_ms: u64) -> bool {
    if elapsed_ms > HINT_ALWAYS_ELAPSED_MS {
        return true;
    }
    competency.is_some_and(|c| {
        c.total_attempts > 0
            && c.accuracy() < HINT_STRUGGLE_ACCURACY
            && elapsed_ms > HINT_STRUGGLE_ELAPSED_MS
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rand::{rngs::StdRng, SeedableRng};

    fn competency(topic: &str, attempts: u32, correct: u32) -> Competency {
        let mut c = Competency::new("u1", topic);
        c.total_attempts = attempts;
        c.correct_attempts = correct;
        c.mastery_level = mastery_for(c.accuracy(), attempts);
        c
    }

    #[test]
    fn mastery_is_capped_below_five_attempts() {
        assert_eq!(mastery_for(1.0, 4), MasteryLevel::Novice);
        assert_eq!(mastery_for(0.75, 4), MasteryLevel::Novice);
        assert_eq!(mastery_for(1.0, 0), MasteryLevel::Novice);
    }

    #[test]
    fn mastery_threshold_table() {
        assert_eq!(mastery_for(0.39, 50), MasteryLevel::Novice);
        assert_eq!(mastery_for(2.0 / 5.0, 5), MasteryLevel::Developing);
        assert_eq!(mastery_for(0.7, 10), MasteryLevel::Proficient);
        assert_eq!(mastery_for(8.0 / 11.0, 11), MasteryLevel::Proficient);
        assert_eq!(mastery_for(0.8, 10), MasteryLevel::Expert);
        assert_eq!(mastery_for(19.0 / 20.0, 20), MasteryLevel::Master);
    }

    #[test]
    fn mastery_falls_back_to_level_whose_volume_gate_is_met() {
        // High accuracy but not enough volume for expert or master
        assert_eq!(mastery_for(1.0, 5), MasteryLevel::Proficient);
        assert_eq!(mastery_for(1.0, 12), MasteryLevel::Expert);
    }

    #[test]
    fn push_outcome_is_bounded() {
        let mut outcomes = vec![];
        for i in 0..7 {
            push_outcome(&mut outcomes, i % 2 == 0, 4);
        }
        assert_eq!(outcomes, vec![false, true, false, true]);
    }

    #[test]
    fn trend_needs_two_full_windows() {
        let outcomes = vec![true; 19];
        assert_eq!(trend_for(&outcomes, 10, 0.1), Trend::Stable);
    }

    #[test]
    fn trend_compares_recent_against_prior_window() {
        let mut improving = vec![false; 10];
        improving.extend(vec![true; 10]);
        assert_eq!(trend_for(&improving, 10, 0.1), Trend::Improving);

        let mut declining = vec![true; 10];
        declining.extend(vec![false; 10]);
        assert_eq!(trend_for(&declining, 10, 0.1), Trend::Declining);
    }

    #[test]
    fn trend_difference_equal_to_margin_is_stable() {
        // prior 7/10, recent 8/10
        let mut outcomes = vec![true, true, true, true, true, true, true, false, false, false];
        outcomes.extend(vec![true, true, true, true, true, true, true, true, false, false]);
        assert_eq!(trend_for(&outcomes, 10, 0.1), Trend::Stable);
    }

    #[test]
    fn target_band_follows_mastery() {
        assert_eq!(target_band(MasteryLevel::Novice), DifficultyBand::Easy);
        assert_eq!(target_band(MasteryLevel::Proficient), DifficultyBand::Medium);
        assert_eq!(target_band(MasteryLevel::Expert), DifficultyBand::Hard);
        assert_eq!(target_band(MasteryLevel::Master), DifficultyBand::Hard);
    }

    #[test]
    fn review_weight_grows_and_caps() {
        let now = Utc::now();
        assert_eq!(review_weight(None, now), REVIEW_MAX_WEIGHT);
        assert_eq!(review_weight(Some(now), now), 0.0);
        let week = review_weight(Some(now - Duration::days(7)), now);
        assert!((week - 1.0).abs() < 1e-9);
        assert_eq!(
            review_weight(Some(now - Duration::days(60)), now),
            REVIEW_MAX_WEIGHT
        );
    }

    #[test]
    fn competition_weights_are_uniform() {
        let topics = vec![competency("1.1", 10, 2), competency("2.1", 0, 0)];
        let weights = topic_weights(PracticeMode::Competition, &topics, Utc::now(), 3);
        assert_eq!(weights, vec![1.0, 1.0]);
    }

    #[test]
    fn weak_focus_gives_weakest_topics_seventy_percent() {
        let topics = vec![
            competency("1.1", 20, 19),
            competency("2.1", 10, 2),
            competency("3.1", 20, 18),
            competency("4.1", 10, 3),
        ];
        let weights = topic_weights(PracticeMode::WeakFocus, &topics, Utc::now(), 2);
        let weak: f64 = weights[1] + weights[3];
        let rest: f64 = weights[0] + weights[2];
        assert!((weak - 0.7).abs() < 1e-9);
        assert!((rest - 0.3).abs() < 1e-9);
    }

    #[test]
    fn weak_focus_without_rest_is_uniform() {
        let topics = vec![competency("1.1", 10, 2)];
        let weights = topic_weights(PracticeMode::WeakFocus, &topics, Utc::now(), 3);
        assert_eq!(weights, vec![1.0]);
    }

    #[test]
    fn balanced_weights_sum_to_one_and_favor_new_content() {
        let now = Utc::now();
        let mut practiced = competency("1.1", 30, 29);
        practiced.last_practiced = Some(now);
        let fresh = Competency::new("u1", "2.1");

        let weights = topic_weights(PracticeMode::Balanced, &[practiced, fresh], now, 3);
        assert!((weights.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(weights[1] > weights[0]);
    }

    #[test]
    fn review_mode_prefers_stale_topics() {
        let now = Utc::now();
        let mut recent = competency("1.1", 5, 5);
        recent.last_practiced = Some(now - Duration::hours(1));
        let mut stale = competency("2.1", 5, 5);
        stale.last_practiced = Some(now - Duration::days(10));
        let never = Competency::new("u1", "3.1");

        let weights = topic_weights(PracticeMode::Review, &[recent, stale, never], now, 3);
        assert!(weights[1] > weights[0]);
        assert!(weights[2] >= weights[1]);
    }

    #[test]
    fn weighted_pick_handles_degenerate_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(weighted_pick(&[], &mut rng), None);
        let pick = weighted_pick(&[0.0, 0.0, 0.0], &mut rng).unwrap();
        assert!(pick < 3);
        assert_eq!(weighted_pick(&[0.0, 5.0, 0.0], &mut rng), Some(1));
    }

    #[test]
    fn weighted_pick_is_uniform_for_equal_weights() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 4];
        let draws = 20_000;
        for _ in 0..draws {
            counts[weighted_pick(&[1.0; 4], &mut rng).unwrap()] += 1;
        }
        for count in counts {
            let share = count as f64 / draws as f64;
            assert!((share - 0.25).abs() < 0.02, "share {} not near 0.25", share);
        }
    }

    #[test]
    fn readiness_penalizes_untouched_topics() {
        let all_topics = vec!["1.1".to_string(), "2.1".to_string()];
        let only_one = vec![competency("1.1", 20, 20)];

        let report = readiness(&all_topics, &only_one);
        assert_eq!(report.topics_total, 2);
        assert_eq!(report.topics_started, 1);
        assert_eq!(report.coverage, 50);
        assert_eq!(report.accuracy, 50);
        assert_eq!(report.mastery, 50);
        assert_eq!(report.score, 50);

        let both = vec![competency("1.1", 20, 20), competency("2.1", 20, 20)];
        assert_eq!(readiness(&all_topics, &both).score, 100);
    }

    #[test]
    fn readiness_without_topics_is_zero() {
        assert_eq!(readiness(&[], &[]), ReadinessReport::empty());
    }

    #[test]
    fn weak_area_needs_volume_and_low_accuracy() {
        assert!(is_weak_area(&competency("1.1", 10, 5)));
        assert!(!is_weak_area(&competency("1.1", 4, 0)));
        assert!(!is_weak_area(&competency("1.1", 10, 7)));
    }

    #[test]
    fn hint_offer_rules() {
        let struggling = competency("1.1", 10, 3);
        let strong = competency("1.1", 10, 9);

        assert!(should_offer_hint(Some(&struggling), 61_000));
        assert!(!should_offer_hint(Some(&struggling), 30_000));
        assert!(!should_offer_hint(Some(&strong), 61_000));
        assert!(should_offer_hint(Some(&strong), 181_000));
        assert!(!should_offer_hint(None, 61_000));
        assert!(should_offer_hint(None, 200_000));
    }
}
