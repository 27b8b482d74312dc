use serde::Serialize;
use strum_macros::{Display, EnumIter};

use crate::feedback::RATING_RANGE;

/// Count of feedback events per rating, buckets 1 through 5
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RatingHistogram([u32; 5]);

impl RatingHistogram {
    /// Counts one rating. Out-of-range ratings are ignored; returns whether
    /// the rating was counted.
    pub fn record(&mut self, rating: i64) -> bool {
        match Self::bucket(rating) {
            Some(index) => {
                self.0[index] += 1;
                true
            }
            None => false,
        }
    }

    pub fn count(&self, rating: i64) -> u32 {
        Self::bucket(rating).map(|index| self.0[index]).unwrap_or(0)
    }

    /// `(rating, count)` pairs from 1 to 5
    pub fn iter(&self) -> impl Iterator<Item = (i64, u32)> + '_ {
        RATING_RANGE.zip(self.0.iter().copied())
    }

    pub fn total(&self) -> u32 {
        self.0.iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    fn bucket(rating: i64) -> Option<usize> {
        RATING_RANGE
            .contains(&rating)
            .then(|| (rating - *RATING_RANGE.start()) as usize)
    }
}

/// Textual suggestion derived from the average rating
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, EnumIter)]
#[serde(rename_all = "snake_case")]
pub enum Suggestion {
    #[strum(serialize = "No feedback yet.")]
    NoFeedbackYet,
    #[strum(serialize = "Great job! Keep up the good work!")]
    KeepItUp,
    #[strum(serialize = "Good work! A few improvements can make it even better.")]
    MinorImprovements,
    #[strum(serialize = "Consider addressing key issues to enhance user experience.")]
    AddressKeyIssues,
}

/// Statistics derived from one feedback snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    pub histogram: RatingHistogram,
    /// `None` means no data
    pub average: Option<f64>,
    /// Number of events the average was taken over
    pub count: usize,
    pub suggestion: Suggestion,
}

impl AggregateStats {
    pub fn empty() -> Self {
        Self {
            histogram: RatingHistogram::default(),
            average: None,
            count: 0,
            suggestion: Suggestion::NoFeedbackYet,
        }
    }

    /// Average rounded to two decimals for display
    pub fn average_rounded(&self) -> Option<f64> {
        self.average.map(|average| (average * 100.0).round() / 100.0)
    }

    pub fn has_data(&self) -> bool {
        self.average.is_some()
    }
}

impl Default for AggregateStats {
    fn default() -> Self {
        Self::empty()
    }
}
