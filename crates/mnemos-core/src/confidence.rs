//! Confidence scoring and feedback-cue detection.
//!
//! Confidence blends retrievability, how well the entry matched the query,
//! and the raw strength sum, then halves if the entry has been contradicted
//! — a superseded fact should never present as more than moderately
//! confident, no matter how strong its own trace is.

/// `ĉ = clamp01(0.4·R + 0.4·s_match + 0.2·tanh(r1+r2))`, halved if
/// `contradicted`.
pub fn confidence_score(
    retrievability: f64,
    match_score: f64,
    strength_sum: f64,
    contradicted: bool,
) -> f64 {
    let raw = 0.4 * retrievability + 0.4 * match_score + 0.2 * strength_sum.tanh();
    let clamped = raw.clamp(0.0, 1.0);
    if contradicted {
        clamped / 2.0
    } else {
        clamped
    }
}

/// Polarity of a feedback phrase: whether it should reward or penalize the
/// most-recently-accessed entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackPolarity {
    Positive,
    Negative,
    Neutral,
}

const POSITIVE_CUES: &[&str] = &[
    "yes",
    "correct",
    "right",
    "exactly",
    "that's it",
    "thanks",
    "perfect",
    "good",
];

const NEGATIVE_CUES: &[&str] = &[
    "no",
    "wrong",
    "incorrect",
    "not right",
    "that's not it",
    "nope",
];

/// Classify a caller-supplied cue phrase against the built-in dictionary.
/// Case-insensitive substring match; negative cues are checked first so
/// phrases like "no, that's wrong" aren't mistaken for the positive cue
/// hiding inside "that's" style false positives.
pub fn classify_feedback(cue: &str) -> FeedbackPolarity {
    classify_feedback_with_dictionary(cue, POSITIVE_CUES, NEGATIVE_CUES)
}

/// Same classification, but against a caller-supplied dictionary instead of
/// the built-in one.
pub fn classify_feedback_with_dictionary(
    cue: &str,
    positive_cues: &[&str],
    negative_cues: &[&str],
) -> FeedbackPolarity {
    let lowered = cue.to_lowercase();

    if negative_cues.iter().any(|c| lowered.contains(c)) {
        return FeedbackPolarity::Negative;
    }
    if positive_cues.iter().any(|c| lowered.contains(c)) {
        return FeedbackPolarity::Positive;
    }
    FeedbackPolarity::Neutral
}

/// Signed adjustment `±reward_magnitude · magnitude` to apply to importance
/// and `working_strength` for each of the last-N accessed entries.
/// Neutral feedback yields zero and is a no-op for callers.
pub fn reward_delta(polarity: FeedbackPolarity, magnitude: f64, reward_magnitude: f64) -> f64 {
    match polarity {
        FeedbackPolarity::Positive => reward_magnitude * magnitude,
        FeedbackPolarity::Negative => -reward_magnitude * magnitude,
        FeedbackPolarity::Neutral => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_score_clamps_to_unit_interval() {
        assert_eq!(confidence_score(2.0, 2.0, 10.0, false), 1.0);
        assert_eq!(confidence_score(-1.0, -1.0, -10.0, false), 0.0);
    }

    #[test]
    fn confidence_score_contradiction_halves_result() {
        let clean = confidence_score(1.0, 1.0, 1.0, false);
        let contradicted = confidence_score(1.0, 1.0, 1.0, true);
        assert!((contradicted - clean / 2.0).abs() < 1e-9);
    }

    #[test]
    fn classifies_positive_cues() {
        assert_eq!(classify_feedback("Yes, exactly right!"), FeedbackPolarity::Positive);
    }

    #[test]
    fn classifies_negative_cues() {
        assert_eq!(classify_feedback("No, that's wrong"), FeedbackPolarity::Negative);
    }

    #[test]
    fn negative_cue_takes_priority_over_embedded_positive_word() {
        assert_eq!(
            classify_feedback("no, that's not right"),
            FeedbackPolarity::Negative
        );
    }

    #[test]
    fn unrecognized_cue_is_neutral() {
        assert_eq!(classify_feedback("tell me more"), FeedbackPolarity::Neutral);
    }

    #[test]
    fn custom_dictionary_overrides_built_in_cues() {
        assert_eq!(
            classify_feedback_with_dictionary("affirmative", &["affirmative"], &["negative"]),
            FeedbackPolarity::Positive
        );
    }

    #[test]
    fn reward_delta_signs_match_polarity() {
        assert!(reward_delta(FeedbackPolarity::Positive, 1.0, 0.3) > 0.0);
        assert!(reward_delta(FeedbackPolarity::Negative, 1.0, 0.3) < 0.0);
        assert_eq!(reward_delta(FeedbackPolarity::Neutral, 1.0, 0.3), 0.0);
    }
}
