//! Time patterns: ordered multipliers with a lookup cursor.

use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Pattern {
    pub id: Arc<str>,
    values: Vec<f64>,
    /// Position of the last lookup (0-based). `None` means past the end.
    cursor: Option<usize>,
    /// Period counter advanced by the quality routing clock.
    interval: i64,
}

impl Pattern {
    pub fn new(id: Arc<str>) -> Self {
        Self { id, ..Self::default() }
    }

    pub fn len(&self) -> usize { self.values.len() }
    pub fn is_empty(&self) -> bool { self.values.is_empty() }
    pub fn values(&self) -> &[f64] { &self.values }
    pub fn cursor(&self) -> Option<usize> { self.cursor }
    pub fn interval(&self) -> i64 { self.interval }

    /// Replaces all multipliers, rewinding the cursor and interval.
    pub fn set_values(&mut self, values: Vec<f64>) {
        self.values = values;
        self.cursor = if self.values.is_empty() { None } else { Some(0) };
        self.interval = 0;
    }

    /// Multiplier for a 1-based `period`, or 0.0 when the period lies beyond
    /// the pattern. A beyond-the-end lookup leaves the cursor where the last
    /// lookup put it; a period below 1 clears it.
    pub fn value_at(&mut self, period: i64) -> f64 {
        if period > self.values.len() as i64 {
            return 0.0;
        }
        if period < 1 {
            self.cursor = None;
            return 0.0;
        }
        let pos = (period - 1) as usize;
        self.cursor = Some(pos);
        self.values[pos]
    }

    /// Overwrites the multiplier at a 1-based period. Returns `false` when the
    /// period is out of range.
    pub fn set_value_at(&mut self, period: i64, value: f64) -> bool {
        if period < 1 || period > self.values.len() as i64 {
            return false;
        }
        let pos = (period - 1) as usize;
        self.values[pos] = value;
        self.cursor = Some(pos);
        true
    }

    /// Moves the cursor forward to the period that contains `step` (0-based
    /// count of pattern time steps), wrapping around at the end.
    /// Returns the multiplier at the new position, or 1.0 for an empty pattern.
    pub fn advance_to(&mut self, step: i64) -> f64 {
        let n = self.values.len();
        if n == 0 {
            return 1.0;
        }
        let mut pos = self.cursor.unwrap_or(0);
        while self.interval < step {
            pos = (pos + 1) % n;
            self.interval += 1;
        }
        self.cursor = Some(pos);
        self.values[pos]
    }

    /// Rewinds the cursor and interval without touching the multipliers.
    pub fn reset(&mut self) {
        self.cursor = if self.values.is_empty() { None } else { Some(0) };
        self.interval = 0;
    }
}
