//! Year-indexed time series shared by every balance computation.

use std::fmt;

use crate::error::BalanceError;

/// Identifies the year grid of a balance computation.
///
/// All series taking part in one evaluation must live on the same span;
/// alignment is checked by span equality, never by per-element comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearSpan {
    /// First year of the grid.
    pub start_year: i32,
    /// Number of consecutive years.
    pub len: usize,
}

impl YearSpan {
    /// Creates a span of `len` consecutive years starting at `start_year`.
    ///
    /// # Panics
    ///
    /// Panics if `len` is zero.
    pub fn new(start_year: i32, len: usize) -> Self {
        assert!(len > 0, "a year span must cover at least one year");
        Self { start_year, len }
    }

    /// Last year of the grid (inclusive).
    pub fn end_year(&self) -> i32 {
        self.start_year + (self.len as i32 - 1)
    }

    /// Iterates over the years of the grid in order.
    pub fn years(&self) -> impl Iterator<Item = i32> + use<> {
        self.start_year..=self.end_year()
    }
}

impl fmt::Display for YearSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start_year, self.end_year())
    }
}

/// An immutable series of one value per consecutive year.
///
/// Contiguity and strictly increasing years are guaranteed by construction:
/// the value at index `i` belongs to year `start_year + i`. There are no
/// public mutators; a series is built once per evaluation and then only read.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    start_year: i32,
    values: Vec<f64>,
}

impl TimeSeries {
    /// Creates a series from its first year and per-year values.
    ///
    /// # Panics
    ///
    /// Panics if `values` is empty.
    pub fn new(start_year: i32, values: Vec<f64>) -> Self {
        assert!(!values.is_empty(), "a time series must hold at least one year");
        Self { start_year, values }
    }

    /// Creates an all-zero series over the given span.
    pub fn zeros(span: YearSpan) -> Self {
        Self {
            start_year: span.start_year,
            values: vec![0.0; span.len],
        }
    }

    /// The span this series lives on.
    pub fn span(&self) -> YearSpan {
        YearSpan {
            start_year: self.start_year,
            len: self.values.len(),
        }
    }

    /// Per-year values, ordered by year.
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of years covered.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always `false`: construction rejects empty series.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value for `year`, or `None` when the year is outside the span.
    pub fn value_at(&self, year: i32) -> Option<f64> {
        let offset = year.checked_sub(self.start_year)?;
        if offset < 0 {
            return None;
        }
        self.values.get(offset as usize).copied()
    }

    /// Iterates over `(year, value)` pairs in year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (self.start_year + i as i32, v))
    }

    /// Returns a copy scaled by `factor`.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            start_year: self.start_year,
            values: self.values.iter().map(|v| v * factor).collect(),
        }
    }

    /// Element-wise sum with `other`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::ShapeMismatch`] when the spans differ.
    pub fn plus(&self, other: &TimeSeries) -> Result<TimeSeries, BalanceError> {
        check_span(self.span(), other.span(), "sum operand")?;
        let values = self
            .values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a + b)
            .collect();
        Ok(Self {
            start_year: self.start_year,
            values,
        })
    }

    /// Verifies this series lives on `span`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::ShapeMismatch`] naming `what` when it does not.
    pub fn check_span(&self, span: YearSpan, what: &str) -> Result<(), BalanceError> {
        check_span(span, self.span(), what)
    }
}

/// Compares two spans, reporting the offender by name on disagreement.
pub(crate) fn check_span(
    expected: YearSpan,
    actual: YearSpan,
    what: &str,
) -> Result<(), BalanceError> {
    if expected == actual {
        Ok(())
    } else {
        Err(BalanceError::ShapeMismatch {
            what: what.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_end_year() {
        let span = YearSpan::new(2020, 31);
        assert_eq!(span.end_year(), 2050);
        assert_eq!(span.years().count(), 31);
    }

    #[test]
    #[should_panic]
    fn zero_length_span_panics() {
        YearSpan::new(2020, 0);
    }

    #[test]
    fn value_at_maps_years_to_indices() {
        let ts = TimeSeries::new(2020, vec![1.0, 2.0, 3.0]);
        assert_eq!(ts.value_at(2020), Some(1.0));
        assert_eq!(ts.value_at(2022), Some(3.0));
        assert_eq!(ts.value_at(2019), None);
        assert_eq!(ts.value_at(2023), None);
    }

    #[test]
    fn zeros_covers_span() {
        let span = YearSpan::new(2025, 5);
        let ts = TimeSeries::zeros(span);
        assert_eq!(ts.span(), span);
        assert!(ts.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn plus_requires_matching_span() {
        let a = TimeSeries::new(2020, vec![1.0, 2.0]);
        let b = TimeSeries::new(2021, vec![1.0, 2.0]);
        assert!(a.plus(&b).is_err());

        let c = TimeSeries::new(2020, vec![3.0, 4.0]);
        let sum = a.plus(&c).expect("aligned series should add");
        assert_eq!(sum.values(), &[4.0, 6.0]);
    }

    #[test]
    fn scaled_multiplies_every_year() {
        let ts = TimeSeries::new(2020, vec![1.0, -2.0, 0.5]);
        assert_eq!(ts.scaled(2.0).values(), &[2.0, -4.0, 1.0]);
    }

    #[test]
    fn iter_pairs_years_with_values() {
        let ts = TimeSeries::new(2030, vec![7.0, 8.0]);
        let pairs: Vec<(i32, f64)> = ts.iter().collect();
        assert_eq!(pairs, vec![(2030, 7.0), (2031, 8.0)]);
    }

    #[test]
    fn shape_mismatch_names_offender() {
        let span = YearSpan::new(2020, 3);
        let ts = TimeSeries::new(2020, vec![1.0, 2.0]);
        let err = ts.check_span(span, "coal.production").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("coal.production"), "got: {msg}");
        assert!(msg.contains("2020..=2022"), "got: {msg}");
    }
}
