//! Element-wise aggregation of contributor series into a stream total.

use std::collections::BTreeMap;

use crate::error::BalanceError;
use crate::series::{TimeSeries, YearSpan};

/// Sums contributor series element-wise, scaled by one conversion factor.
///
/// Pure summation: the factor converts every contributor from its native
/// unit to the stream unit and is common to the whole call. Callers that
/// need the unscaled per-contributor breakdown for reporting keep their own
/// copy of `contributors`; this function only returns the total.
///
/// # Arguments
///
/// * `span` - Year grid of the enclosing balance computation
/// * `contributors` - Per-technology (or per-sector) series
/// * `conversion_factor` - Scalar applied to every contributor
///
/// # Returns
///
/// The aggregated total over `span`. An empty contributor map yields an
/// all-zero series, not an error: several call sites deliberately aggregate
/// a stream with no current contributors (a sector not yet producing a
/// given carrier).
///
/// # Errors
///
/// Returns [`BalanceError::ShapeMismatch`] naming the first contributor
/// whose span differs from `span`.
pub fn aggregate(
    span: YearSpan,
    contributors: &BTreeMap<String, TimeSeries>,
    conversion_factor: f64,
) -> Result<TimeSeries, BalanceError> {
    let mut total = vec![0.0; span.len];
    for (name, series) in contributors {
        series.check_span(span, name)?;
        for (slot, value) in total.iter_mut().zip(series.values()) {
            *slot += value * conversion_factor;
        }
    }
    Ok(TimeSeries::new(span.start_year, total))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contributors(entries: &[(&str, Vec<f64>)]) -> BTreeMap<String, TimeSeries> {
        entries
            .iter()
            .map(|(name, values)| (name.to_string(), TimeSeries::new(2020, values.clone())))
            .collect()
    }

    #[test]
    fn two_contributors_with_conversion_factor() {
        // [10,10,10] + [5,5,5], factor 2 → [30,30,30]
        let span = YearSpan::new(2020, 3);
        let map = contributors(&[
            ("coal", vec![10.0, 10.0, 10.0]),
            ("gas", vec![5.0, 5.0, 5.0]),
        ]);
        let total = aggregate(span, &map, 2.0).expect("aligned contributors");
        assert_eq!(total.values(), &[30.0, 30.0, 30.0]);
    }

    #[test]
    fn empty_map_yields_zeros() {
        let span = YearSpan::new(2030, 4);
        let total = aggregate(span, &BTreeMap::new(), 1.0).expect("empty is fine");
        assert_eq!(total.span(), span);
        assert!(total.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn misaligned_contributor_is_fatal() {
        let span = YearSpan::new(2020, 3);
        let mut map = contributors(&[("solar", vec![1.0, 2.0, 3.0])]);
        map.insert("wind".to_string(), TimeSeries::new(2020, vec![1.0, 2.0]));
        let err = aggregate(span, &map, 1.0).unwrap_err();
        assert!(err.to_string().contains("wind"));
    }

    #[test]
    fn unit_factor_is_identity() {
        let span = YearSpan::new(2020, 2);
        let map = contributors(&[("a", vec![1.5, 2.5])]);
        let total = aggregate(span, &map, 1.0).expect("single contributor");
        assert_eq!(total.values(), &[1.5, 2.5]);
    }
}
