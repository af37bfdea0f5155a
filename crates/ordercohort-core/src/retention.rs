//! Month-offset buckets shared by cohort rows and the grand-total view.

use serde::{Deserialize, Serialize};

/// One column of a retention table: `m0`..`m11`, or everything twelve or
/// more calendar months out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RetentionBucket {
    M0,
    M1,
    M2,
    M3,
    M4,
    M5,
    M6,
    M7,
    M8,
    M9,
    M10,
    M11,
    M12Plus,
}

impl RetentionBucket {
    /// All buckets in column order.
    pub const ALL: [RetentionBucket; 13] = [
        Self::M0,
        Self::M1,
        Self::M2,
        Self::M3,
        Self::M4,
        Self::M5,
        Self::M6,
        Self::M7,
        Self::M8,
        Self::M9,
        Self::M10,
        Self::M11,
        Self::M12Plus,
    ];

    /// Bucket for a calendar-month difference. Negative differences have no
    /// bucket.
    #[must_use]
    pub fn from_month_diff(diff: i32) -> Option<Self> {
        let index = usize::try_from(diff).ok()?;
        Some(Self::ALL.get(index).copied().unwrap_or(Self::M12Plus))
    }

    /// JSON key of the bucket, e.g. `"m3"` or `"m12_plus"`.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            Self::M0 => "m0",
            Self::M1 => "m1",
            Self::M2 => "m2",
            Self::M3 => "m3",
            Self::M4 => "m4",
            Self::M5 => "m5",
            Self::M6 => "m6",
            Self::M7 => "m7",
            Self::M8 => "m8",
            Self::M9 => "m9",
            Self::M10 => "m10",
            Self::M11 => "m11",
            Self::M12Plus => "m12_plus",
        }
    }
}

impl std::fmt::Display for RetentionBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A value per retention bucket. Serializes as
/// `{ "m0": .., "m1": .., ..., "m11": .., "m12_plus": .. }`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Retention<T> {
    pub m0: T,
    pub m1: T,
    pub m2: T,
    pub m3: T,
    pub m4: T,
    pub m5: T,
    pub m6: T,
    pub m7: T,
    pub m8: T,
    pub m9: T,
    pub m10: T,
    pub m11: T,
    pub m12_plus: T,
}

impl<T> Retention<T> {
    #[must_use]
    pub fn get(&self, bucket: RetentionBucket) -> &T {
        match bucket {
            RetentionBucket::M0 => &self.m0,
            RetentionBucket::M1 => &self.m1,
            RetentionBucket::M2 => &self.m2,
            RetentionBucket::M3 => &self.m3,
            RetentionBucket::M4 => &self.m4,
            RetentionBucket::M5 => &self.m5,
            RetentionBucket::M6 => &self.m6,
            RetentionBucket::M7 => &self.m7,
            RetentionBucket::M8 => &self.m8,
            RetentionBucket::M9 => &self.m9,
            RetentionBucket::M10 => &self.m10,
            RetentionBucket::M11 => &self.m11,
            RetentionBucket::M12Plus => &self.m12_plus,
        }
    }

    pub fn get_mut(&mut self, bucket: RetentionBucket) -> &mut T {
        match bucket {
            RetentionBucket::M0 => &mut self.m0,
            RetentionBucket::M1 => &mut self.m1,
            RetentionBucket::M2 => &mut self.m2,
            RetentionBucket::M3 => &mut self.m3,
            RetentionBucket::M4 => &mut self.m4,
            RetentionBucket::M5 => &mut self.m5,
            RetentionBucket::M6 => &mut self.m6,
            RetentionBucket::M7 => &mut self.m7,
            RetentionBucket::M8 => &mut self.m8,
            RetentionBucket::M9 => &mut self.m9,
            RetentionBucket::M10 => &mut self.m10,
            RetentionBucket::M11 => &mut self.m11,
            RetentionBucket::M12Plus => &mut self.m12_plus,
        }
    }

    /// Iterate `(bucket, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (RetentionBucket, &T)> + '_ {
        RetentionBucket::ALL
            .into_iter()
            .map(move |bucket| (bucket, self.get(bucket)))
    }

    /// Build a new table by applying `f` to every bucket.
    #[must_use]
    pub fn map<U, F>(&self, mut f: F) -> Retention<U>
    where
        F: FnMut(RetentionBucket, &T) -> U,
    {
        Retention {
            m0: f(RetentionBucket::M0, &self.m0),
            m1: f(RetentionBucket::M1, &self.m1),
            m2: f(RetentionBucket::M2, &self.m2),
            m3: f(RetentionBucket::M3, &self.m3),
            m4: f(RetentionBucket::M4, &self.m4),
            m5: f(RetentionBucket::M5, &self.m5),
            m6: f(RetentionBucket::M6, &self.m6),
            m7: f(RetentionBucket::M7, &self.m7),
            m8: f(RetentionBucket::M8, &self.m8),
            m9: f(RetentionBucket::M9, &self.m9),
            m10: f(RetentionBucket::M10, &self.m10),
            m11: f(RetentionBucket::M11, &self.m11),
            m12_plus: f(RetentionBucket::M12Plus, &self.m12_plus),
        }
    }
}

impl Retention<u32> {
    /// Sum of all bucket counts.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.iter().map(|(_, count)| u64::from(*count)).sum()
    }
}

/// `part / whole * 100`, or `0.0` when `whole` is zero.
#[must_use]
#[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
