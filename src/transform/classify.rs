//! Threshold classification of a continuous indicator into ordinal buckets.

use crate::domain::Thresholds;
use crate::table::Table;

/// Bucket assigned to missing (NaN) inputs.
pub const MISSING_BUCKET: u8 = 0;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Condition {
    Missing,
    Below(f64),
    AtMost(f64),
}

impl Condition {
    fn matches(self, x: f64) -> bool {
        match self {
            Condition::Missing => x.is_nan(),
            Condition::Below(edge) => x < edge,
            Condition::AtMost(edge) => x <= edge,
        }
    }
}

/// Ordered rules; the first matching rule wins, otherwise `default`.
#[derive(Debug, Clone, PartialEq)]
pub struct Classifier {
    rules: Vec<(Condition, u8)>,
    default: u8,
}

impl Classifier {
    /// Five-band layout around `center` with edges `c-2w, c-w, c+w, c+2w`.
    ///
    /// | bucket | range                  |
    /// |--------|------------------------|
    /// | 0      | NaN                    |
    /// | 1      | `x < c-2w`             |
    /// | 2      | `c-2w <= x < c-w`      |
    /// | 3      | `c-w <= x <= c+w`      |
    /// | 4      | `c+w < x <= c+2w`      |
    /// | 5      | `x > c+2w` (default)   |
    pub fn symmetric(t: Thresholds) -> Self {
        let (c, w) = (t.center, t.width);
        Self {
            rules: vec![
                // NaN fails every comparison, so it has to be tested first.
                (Condition::Missing, MISSING_BUCKET),
                (Condition::Below(c - 2.0 * w), 1),
                (Condition::Below(c - w), 2),
                (Condition::AtMost(c + w), 3),
                (Condition::AtMost(c + 2.0 * w), 4),
            ],
            default: 5,
        }
    }

    pub fn classify(&self, x: f64) -> u8 {
        self.rules
            .iter()
            .find(|(cond, _)| cond.matches(x))
            .map(|&(_, bucket)| bucket)
            .unwrap_or(self.default)
    }

    /// Write the bucket of `value` into `output` for every row.
    pub fn classify_column(&self, table: &mut Table, value: &str, output: &str) {
        table.derive(output, |r| i64::from(self.classify(r.num(value))).into());
    }
}
