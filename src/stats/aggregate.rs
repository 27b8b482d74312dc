use super::models::{AggregateStats, RatingHistogram, Suggestion};
use super::{MIDDLE_TIER_ABOVE, TOP_TIER_ABOVE};
use crate::feedback::FeedbackEvent;

/// Computes histogram, average and suggestion from the full event set.
///
/// Pure and order-independent: ratings are summed as integers before the
/// single division, so any permutation of the same events gives the same
/// result.
pub fn aggregate(events: &[FeedbackEvent]) -> AggregateStats {
    if events.is_empty() {
        return AggregateStats::empty();
    }

    let mut histogram = RatingHistogram::default();
    let mut sum: i128 = 0;
    for event in events {
        histogram.record(event.rating);
        sum += i128::from(event.rating);
    }

    let average = sum as f64 / events.len() as f64;

    AggregateStats {
        histogram,
        average: Some(average),
        count: events.len(),
        suggestion: suggestion_for(average),
    }
}

/// Tier thresholds are strict greater-than
pub fn suggestion_for(average: f64) -> Suggestion {
    if average > TOP_TIER_ABOVE {
        Suggestion::KeepItUp
    } else if average > MIDDLE_TIER_ABOVE {
        Suggestion::MinorImprovements
    } else {
        Suggestion::AddressKeyIssues
    }
}
