//! Composes aggregation, ratios, and the smoothed penalty per stream.

use std::collections::BTreeMap;

use crate::config::{BalanceConfig, DemandDetailMode};
use crate::error::BalanceError;
use crate::series::{TimeSeries, YearSpan};
use crate::smoothing::{safe_ratio, smoothed_objective};

use super::aggregator::aggregate;
use super::ratio::{Ratio, availability_ratio};
use super::stream::Stream;

pub use crate::config::DemandDetailMode as DemandDetail;

/// All series entering one balance evaluation.
///
/// Entities live for one evaluation (one optimizer iteration or one
/// what-if run); nothing here persists across evaluations.
#[derive(Debug, Clone)]
pub struct BalanceInput {
    /// Year grid shared by every series in the evaluation.
    pub span: YearSpan,
    streams: BTreeMap<String, Stream>,
}

impl BalanceInput {
    /// Creates an input with no streams yet.
    pub fn new(span: YearSpan) -> Self {
        Self {
            span,
            streams: BTreeMap::new(),
        }
    }

    /// Adds a stream, keyed by its id.
    pub fn with_stream(mut self, stream: Stream) -> Self {
        self.streams.insert(stream.id.clone(), stream);
        self
    }

    /// Streams by id.
    pub fn streams(&self) -> &BTreeMap<String, Stream> {
        &self.streams
    }
}

/// Balance outcome for a single stream.
#[derive(Debug, Clone)]
pub struct StreamBalance {
    /// Aggregated production in the stream unit.
    pub production_total: TimeSeries,
    /// Aggregated demand in the stream unit.
    pub demand_total: TimeSeries,
    /// Availability ratio applied by downstream consumers as a limiter.
    ///
    /// In aggregate mode this is the shared market ratio, not a
    /// stream-specific one.
    pub ratio: Ratio,
    /// Unscaled per-producer breakdown, retained for reporting.
    pub production_by: BTreeMap<String, TimeSeries>,
    /// Unscaled per-consumer breakdown, retained for reporting.
    pub demand_by: BTreeMap<String, TimeSeries>,
    /// Smoothed production-vs-demand penalty for this stream alone.
    ///
    /// `None` in aggregate mode, where only the totals penalty is defined.
    pub objective: Option<f64>,
}

/// Result of one full balance evaluation.
#[derive(Debug, Clone)]
pub struct BalanceResult {
    /// Per-stream balances, in configuration order of ids.
    pub per_stream: BTreeMap<String, StreamBalance>,
    /// Scalar production-vs-demand objective across all streams and years.
    pub objective: f64,
    /// The single market-wide ratio, present only in aggregate mode.
    pub market_ratio: Option<Ratio>,
    /// Demand-detail mode that produced this result. `Aggregate` records
    /// the caveat that ratios are not stream-specific.
    pub detail: DemandDetail,
}

/// Runs one balance evaluation over all configured streams.
///
/// For every configured stream: aggregates production and demand over the
/// shared span (converting to the configured unit), computes the
/// availability ratio, and accumulates the smoothed penalty of the
/// normalized `(demand - production) / demand` difference. Objectives are
/// summed across streams so adding a stream never dilutes an existing
/// imbalance.
///
/// In [`DemandDetail::Aggregate`] mode the same ratio and penalty functions
/// run once on unit-converted totals summed across all streams; every
/// stream then carries the shared market ratio.
///
/// Streams present in the configuration but absent from the input are
/// balanced with zero contributors (all-zero totals). Streams present in
/// the input but not configured are a structural error.
///
/// # Errors
///
/// Stops on the first structural inconsistency: [`BalanceError::UnknownStream`],
/// [`BalanceError::ShapeMismatch`], or [`BalanceError::UnitMismatch`]
/// (aggregate mode across incompatible dimensions). No partial results.
pub fn balance(config: &BalanceConfig, input: &BalanceInput) -> Result<BalanceResult, BalanceError> {
    if config.streams.is_empty() {
        return Err(BalanceError::InvalidConfig(crate::error::ConfigError {
            field: "stream".to_string(),
            message: "at least one stream must be configured".to_string(),
        }));
    }
    for id in input.streams().keys() {
        if config.stream(id).is_none() {
            return Err(BalanceError::UnknownStream(id.clone()));
        }
    }

    let span = input.span;
    let empty = Stream::new("", crate::units::Unit::TerawattHour);
    let mut per_stream = BTreeMap::new();
    let mut totals: Vec<(String, TimeSeries, TimeSeries)> = Vec::new();

    for cfg in &config.streams {
        let stream = input.streams().get(&cfg.id).unwrap_or(&empty);
        stream.validate(span)?;

        // Contributors arrive in the stream's native unit; fold the unit
        // conversion into the one scalar factor of the aggregation call.
        let unit_factor = if stream.id.is_empty() {
            1.0
        } else {
            stream.unit.factor_to(cfg.unit)?
        };
        let factor = cfg.conversion_factor * unit_factor;

        let production_total = aggregate(span, &stream.production, factor)?;
        let demand_total = aggregate(span, &stream.demand, factor)?;

        totals.push((cfg.id.clone(), production_total.clone(), demand_total.clone()));
        per_stream.insert(
            cfg.id.clone(),
            StreamBalance {
                production_total,
                demand_total,
                // Placeholder until the mode below decides which ratio applies.
                ratio: Ratio::full(span),
                production_by: stream.production.clone(),
                demand_by: stream.demand.clone(),
                objective: None,
            },
        );
    }

    match config.balance.demand_detail {
        DemandDetailMode::PerStream => {
            let mut objective = 0.0;
            for (id, production, demand) in &totals {
                let ratio = availability_ratio(id, production, demand)?;
                let stream_objective = smoothed_objective(&normalized_delta(production, demand));
                objective += stream_objective;

                tracing::debug!(
                    stream = id.as_str(),
                    min_ratio = min_of(ratio.values()),
                    objective = stream_objective,
                    "stream balanced"
                );

                let entry = per_stream.get_mut(id).ok_or_else(|| {
                    BalanceError::UnknownStream(id.clone())
                })?;
                entry.ratio = ratio;
                entry.objective = Some(stream_objective);
            }
            Ok(BalanceResult {
                per_stream,
                objective,
                market_ratio: None,
                detail: DemandDetail::PerStream,
            })
        }
        DemandDetailMode::Aggregate => {
            // Same math on summed totals: convert each stream total into
            // the first configured stream's unit, then sum.
            let common_unit = config.streams[0].unit;
            let mut production_sum = TimeSeries::zeros(span);
            let mut demand_sum = TimeSeries::zeros(span);
            for (id, production, demand) in &totals {
                let unit = config
                    .stream(id)
                    .map(|s| s.unit)
                    .ok_or_else(|| BalanceError::UnknownStream(id.clone()))?;
                let f = unit.factor_to(common_unit)?;
                production_sum = production_sum.plus(&production.scaled(f))?;
                demand_sum = demand_sum.plus(&demand.scaled(f))?;
            }

            let market_ratio = availability_ratio("market", &production_sum, &demand_sum)?;
            let objective = smoothed_objective(&normalized_delta(&production_sum, &demand_sum));

            tracing::debug!(
                min_ratio = min_of(market_ratio.values()),
                objective,
                "market balanced on aggregate totals"
            );

            for entry in per_stream.values_mut() {
                entry.ratio = market_ratio.clone();
            }
            Ok(BalanceResult {
                per_stream,
                objective,
                market_ratio: Some(market_ratio),
                detail: DemandDetail::Aggregate,
            })
        }
    }
}

/// Per-year `(demand - production) / demand`, smoothed against zero demand.
pub(crate) fn normalized_delta(production: &TimeSeries, demand: &TimeSeries) -> Vec<f64> {
    production
        .values()
        .iter()
        .zip(demand.values())
        .map(|(&p, &d)| safe_ratio(d - p, d))
        .collect()
}

fn min_of(values: &[f64]) -> f64 {
    values.iter().copied().fold(f64::INFINITY, f64::min)
}
