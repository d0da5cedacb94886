//! Bounded, smooth availability ratio of supply against demand.

use crate::error::BalanceError;
use crate::series::{TimeSeries, check_span};
use crate::smoothing::{EPSILON, safe_ratio};

/// Availability ratio in percent, one value per year, always in `[0, 100]`.
///
/// 100 means demand is fully met by current aggregate production; the value
/// falls toward 0 as supply vanishes while demand persists. Never NaN or
/// infinite for finite inputs.
#[derive(Debug, Clone, PartialEq)]
pub struct Ratio(TimeSeries);

impl Ratio {
    /// The underlying percentage series.
    pub fn series(&self) -> &TimeSeries {
        &self.0
    }

    /// Consumes the ratio, returning the percentage series.
    pub fn into_series(self) -> TimeSeries {
        self.0
    }

    /// Per-year percentage values.
    pub fn values(&self) -> &[f64] {
        self.0.values()
    }

    /// All-100 ratio over a span (fully available).
    pub(crate) fn full(span: crate::series::YearSpan) -> Self {
        Ratio(TimeSeries::new(span.start_year, vec![100.0; span.len]))
    }
}

/// Computes the percentage of demand satisfiable by available supply.
///
/// Per year:
/// - demand within [`EPSILON`] of zero → 100 (nothing requested is fully
///   served);
/// - otherwise `clamp(safe_ratio(production, demand), 0, 1) * 100`.
///
/// The clamp guarantees the `[0, 100]` bounds for any finite input. The
/// same function serves both per-stream balancing and the simplified
/// single-aggregate "market" mode; the caller merely feeds it summed
/// totals in the latter case.
///
/// Negative supply or demand is a caller contract violation; it is clamped
/// into range rather than failing the evaluation, because optimizer line
/// searches may transiently step into slightly negative points. A warning
/// names the stream so the violation is visible.
///
/// # Errors
///
/// Returns [`BalanceError::ShapeMismatch`] when the two series disagree on
/// their year span.
pub fn availability_ratio(
    stream_id: &str,
    production: &TimeSeries,
    demand: &TimeSeries,
) -> Result<Ratio, BalanceError> {
    check_span(production.span(), demand.span(), stream_id)?;

    if production
        .values()
        .iter()
        .chain(demand.values())
        .any(|&v| v < 0.0)
    {
        tracing::warn!(
            stream = stream_id,
            "negative supply or demand clamped into ratio bounds"
        );
    }

    let values = production
        .values()
        .iter()
        .zip(demand.values())
        .map(|(&p, &d)| ratio_percent(p, d))
        .collect();
    Ok(Ratio(TimeSeries::new(production.span().start_year, values)))
}

/// Single-year ratio kernel shared with the partial derivatives below.
fn ratio_percent(production: f64, demand: f64) -> f64 {
    if demand.abs() <= EPSILON {
        return 100.0;
    }
    safe_ratio(production, demand).clamp(0.0, 1.0) * 100.0
}

/// Per-year partial derivatives of the ratio for the jacobian hook.
///
/// Both outputs are diagonal blocks: year `t` of the ratio depends only on
/// year `t` of supply and demand. Inside the open unit interval of the raw
/// quotient the derivatives are those of `100 * p / (d + EPSILON)`; where
/// the clamp or the zero-demand floor is active they are zero.
///
/// # Returns
///
/// `(d_ratio_d_production, d_ratio_d_demand)` as per-year vectors.
pub fn ratio_partials(production: &TimeSeries, demand: &TimeSeries) -> (Vec<f64>, Vec<f64>) {
    let mut d_prod = Vec::with_capacity(production.len());
    let mut d_dem = Vec::with_capacity(production.len());
    for (&p, &d) in production.values().iter().zip(demand.values()) {
        let raw = safe_ratio(p, d);
        if d.abs() <= EPSILON || !(0.0..1.0).contains(&raw) {
            d_prod.push(0.0);
            d_dem.push(0.0);
        } else {
            let den = d + EPSILON;
            d_prod.push(100.0 / den);
            d_dem.push(-100.0 * p / (den * den));
        }
    }
    (d_prod, d_dem)
}
