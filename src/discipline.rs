//! Engine-facing adapter contract.
//!
//! The external MDO engine speaks a flat mapping from fully-qualified
//! variable names to values, drives a configure/compute lifecycle, and
//! asks for per-output/per-input partial-derivative blocks when it wants
//! analytic derivatives. This module is the thin boundary between that
//! world and the plain in-memory structures the core computes on; nothing
//! in here knows about the engine's namespace or data manager.

use std::collections::BTreeMap;

use crate::balance::{BalanceInput, Stream, balance};
use crate::balance::orchestrator::normalized_delta;
use crate::balance::ratio::ratio_partials;
use crate::config::{BalanceConfig, DemandDetailMode};
use crate::error::BalanceError;
use crate::profile::{BasisMatrix, basis_matrix, build};
use crate::series::{TimeSeries, YearSpan};
use crate::smoothing::{EPSILON, smoothed_objective_gradient};

/// A value exchanged with the external engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// A named scalar (objective, constraint).
    Scalar(f64),
    /// A plain array (decision variables such as poles).
    Vector(Vec<f64>),
    /// A year-indexed series.
    Series(TimeSeries),
}

impl Value {
    fn kind(&self) -> &'static str {
        match self {
            Value::Scalar(_) => "scalar",
            Value::Vector(_) => "vector",
            Value::Series(_) => "series",
        }
    }
}

/// Flat mapping from fully-qualified variable names to values.
pub type VariableMap = BTreeMap<String, Value>;

/// Partial-derivative blocks keyed by `(output name, input name)`.
pub type PartialsMap = BTreeMap<(String, String), BasisMatrix>;

/// Looks up a series variable.
///
/// # Errors
///
/// [`BalanceError::MissingVariable`] when absent,
/// [`BalanceError::WrongValueKind`] when present with another kind.
pub fn get_series<'a>(map: &'a VariableMap, name: &str) -> Result<&'a TimeSeries, BalanceError> {
    match map.get(name) {
        Some(Value::Series(ts)) => Ok(ts),
        Some(other) => Err(BalanceError::WrongValueKind {
            name: name.to_string(),
            expected: "series",
            actual: other.kind(),
        }),
        None => Err(BalanceError::MissingVariable(name.to_string())),
    }
}

/// Looks up a vector variable. Same failure contract as [`get_series`].
pub fn get_vector<'a>(map: &'a VariableMap, name: &str) -> Result<&'a [f64], BalanceError> {
    match map.get(name) {
        Some(Value::Vector(v)) => Ok(v),
        Some(other) => Err(BalanceError::WrongValueKind {
            name: name.to_string(),
            expected: "vector",
            actual: other.kind(),
        }),
        None => Err(BalanceError::MissingVariable(name.to_string())),
    }
}

/// Looks up a scalar variable. Same failure contract as [`get_series`].
pub fn get_scalar(map: &VariableMap, name: &str) -> Result<f64, BalanceError> {
    match map.get(name) {
        Some(Value::Scalar(s)) => Ok(*s),
        Some(other) => Err(BalanceError::WrongValueKind {
            name: name.to_string(),
            expected: "scalar",
            actual: other.kind(),
        }),
        None => Err(BalanceError::MissingVariable(name.to_string())),
    }
}

/// A computation unit the external engine can drive.
///
/// Implementations are pure with respect to the variable map: `compute`
/// reads declared inputs and returns declared outputs, and
/// `compute_partials` exposes the analytic derivative blocks the engine
/// requests instead of falling back to finite differences.
pub trait Discipline {
    /// Stable name the engine registers this discipline under.
    fn name(&self) -> &str;

    /// Evaluates outputs from the flat input map.
    ///
    /// # Errors
    ///
    /// Variable-resolution failures or any structural error from the core.
    fn compute(&self, inputs: &VariableMap) -> Result<VariableMap, BalanceError>;

    /// Analytic partial-derivative blocks for the engine's jacobian hook.
    ///
    /// The default exposes none, delegating derivatives to external
    /// finite-difference or adjoint tooling.
    ///
    /// # Errors
    ///
    /// Same contract as [`Discipline::compute`].
    fn compute_partials(&self, _inputs: &VariableMap) -> Result<PartialsMap, BalanceError> {
        Ok(PartialsMap::new())
    }
}

/// Balance core wrapped as a discipline.
///
/// Input names follow `production.<stream>.<contributor>` and
/// `demand.<stream>.<consumer>`; outputs are `production_total.<stream>`,
/// `demand_total.<stream>`, `ratio.<stream>`, and the `objective` scalar.
#[derive(Debug, Clone)]
pub struct BalanceDiscipline {
    config: BalanceConfig,
    span: YearSpan,
}

impl BalanceDiscipline {
    /// Creates the discipline for a validated configuration and year grid.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::InvalidConfig`] carrying the first
    /// validation failure.
    pub fn new(config: BalanceConfig, span: YearSpan) -> Result<Self, BalanceError> {
        if let Some(error) = config.validate().into_iter().next() {
            return Err(BalanceError::InvalidConfig(error));
        }
        Ok(Self { config, span })
    }

    /// Rebuilds the typed balance input from the engine's flat map.
    fn input_from_map(&self, inputs: &VariableMap) -> Result<BalanceInput, BalanceError> {
        let mut streams: BTreeMap<String, Stream> = BTreeMap::new();
        for (name, value) in inputs {
            let mut parts = name.splitn(3, '.');
            let (role, stream_id, contributor) = match (parts.next(), parts.next(), parts.next()) {
                (Some(role @ ("production" | "demand")), Some(stream), Some(contributor)) => {
                    (role, stream, contributor)
                }
                _ => continue, // not a balance variable
            };

            let cfg = self
                .config
                .stream(stream_id)
                .ok_or_else(|| BalanceError::UnknownStream(stream_id.to_string()))?;
            let series = match value {
                Value::Series(ts) => ts.clone(),
                other => {
                    return Err(BalanceError::WrongValueKind {
                        name: name.clone(),
                        expected: "series",
                        actual: other.kind(),
                    });
                }
            };

            let stream = streams
                .entry(stream_id.to_string())
                .or_insert_with(|| Stream::new(stream_id, cfg.unit));
            if role == "production" {
                stream.production.insert(contributor.to_string(), series);
            } else {
                stream.demand.insert(contributor.to_string(), series);
            }
        }

        let mut input = BalanceInput::new(self.span);
        for stream in streams.into_values() {
            input = input.with_stream(stream);
        }
        Ok(input)
    }
}

impl Discipline for BalanceDiscipline {
    fn name(&self) -> &str {
        "stream_balance"
    }

    fn compute(&self, inputs: &VariableMap) -> Result<VariableMap, BalanceError> {
        let input = self.input_from_map(inputs)?;
        let result = balance(&self.config, &input)?;

        let mut outputs = VariableMap::new();
        for (id, stream_balance) in &result.per_stream {
            outputs.insert(
                format!("production_total.{id}"),
                Value::Series(stream_balance.production_total.clone()),
            );
            outputs.insert(
                format!("demand_total.{id}"),
                Value::Series(stream_balance.demand_total.clone()),
            );
            outputs.insert(
                format!("ratio.{id}"),
                Value::Series(stream_balance.ratio.series().clone()),
            );
        }
        outputs.insert("objective".to_string(), Value::Scalar(result.objective));
        Ok(outputs)
    }

    fn compute_partials(&self, inputs: &VariableMap) -> Result<PartialsMap, BalanceError> {
        let input = self.input_from_map(inputs)?;
        let result = balance(&self.config, &input)?;

        let mut partials = PartialsMap::new();
        match self.config.balance.demand_detail {
            DemandDetailMode::PerStream => {
                for (id, stream_balance) in &result.per_stream {
                    let (d_prod, d_dem) = ratio_partials(
                        &stream_balance.production_total,
                        &stream_balance.demand_total,
                    );
                    partials.insert(
                        (format!("ratio.{id}"), format!("production_total.{id}")),
                        diagonal(&d_prod),
                    );
                    partials.insert(
                        (format!("ratio.{id}"), format!("demand_total.{id}")),
                        diagonal(&d_dem),
                    );

                    let delta = normalized_delta(
                        &stream_balance.production_total,
                        &stream_balance.demand_total,
                    );
                    let gradient = smoothed_objective_gradient(&delta);
                    let (d_obj_p, d_obj_d) = objective_chain(
                        &gradient,
                        &stream_balance.production_total,
                        &stream_balance.demand_total,
                    );
                    partials.insert(
                        ("objective".to_string(), format!("production_total.{id}")),
                        row_vector(&d_obj_p),
                    );
                    partials.insert(
                        ("objective".to_string(), format!("demand_total.{id}")),
                        row_vector(&d_obj_d),
                    );
                }
            }
            DemandDetailMode::Aggregate => {
                // Every published ratio is the shared market ratio and the
                // objective is built from the summed totals, so each block
                // must be derived from the market sums and chained through
                // the unit-conversion factor of the input stream. The
                // ratio of every stream depends on every stream's totals.
                let common_unit = self.config.streams[0].unit;
                let mut production_sum = TimeSeries::zeros(self.span);
                let mut demand_sum = TimeSeries::zeros(self.span);
                let mut factors: BTreeMap<String, f64> = BTreeMap::new();
                for (id, stream_balance) in &result.per_stream {
                    let unit = self
                        .config
                        .stream(id)
                        .map(|s| s.unit)
                        .ok_or_else(|| BalanceError::UnknownStream(id.clone()))?;
                    let f = unit.factor_to(common_unit)?;
                    production_sum =
                        production_sum.plus(&stream_balance.production_total.scaled(f))?;
                    demand_sum = demand_sum.plus(&stream_balance.demand_total.scaled(f))?;
                    factors.insert(id.clone(), f);
                }

                let (d_prod, d_dem) = ratio_partials(&production_sum, &demand_sum);
                let gradient =
                    smoothed_objective_gradient(&normalized_delta(&production_sum, &demand_sum));
                let (d_obj_p, d_obj_d) = objective_chain(&gradient, &production_sum, &demand_sum);

                for (in_id, f) in &factors {
                    let dp: Vec<f64> = d_prod.iter().map(|v| v * f).collect();
                    let dd: Vec<f64> = d_dem.iter().map(|v| v * f).collect();
                    for out_id in result.per_stream.keys() {
                        partials.insert(
                            (format!("ratio.{out_id}"), format!("production_total.{in_id}")),
                            diagonal(&dp),
                        );
                        partials.insert(
                            (format!("ratio.{out_id}"), format!("demand_total.{in_id}")),
                            diagonal(&dd),
                        );
                    }

                    let gp: Vec<f64> = d_obj_p.iter().map(|v| v * f).collect();
                    let gd: Vec<f64> = d_obj_d.iter().map(|v| v * f).collect();
                    partials.insert(
                        ("objective".to_string(), format!("production_total.{in_id}")),
                        row_vector(&gp),
                    );
                    partials.insert(
                        ("objective".to_string(), format!("demand_total.{in_id}")),
                        row_vector(&gd),
                    );
                }
            }
        }
        Ok(partials)
    }
}

/// Investment-profile builder wrapped as a discipline.
///
/// Reads the `poles` vector, emits the dense `curve` vector and the
/// `curve_at_poles` compact export; the basis matrix is the one jacobian
/// block (`curve` with respect to `poles`).
#[derive(Debug, Clone)]
pub struct ProfileDiscipline {
    target_length: usize,
}

impl ProfileDiscipline {
    /// Creates the discipline for a fixed dense-curve length.
    pub fn new(target_length: usize) -> Self {
        Self { target_length }
    }
}

impl Discipline for ProfileDiscipline {
    fn name(&self) -> &str {
        "investment_profile"
    }

    fn compute(&self, inputs: &VariableMap) -> Result<VariableMap, BalanceError> {
        let poles = get_vector(inputs, "poles")?;
        let profile = build(poles, self.target_length)?;

        let mut outputs = VariableMap::new();
        outputs.insert(
            "curve".to_string(),
            Value::Vector(profile.curve().to_vec()),
        );
        outputs.insert(
            "curve_at_poles".to_string(),
            Value::Vector(profile.at_poles()),
        );
        Ok(outputs)
    }

    fn compute_partials(&self, inputs: &VariableMap) -> Result<PartialsMap, BalanceError> {
        let poles = get_vector(inputs, "poles")?;
        let basis = basis_matrix(poles.len(), self.target_length)?;

        let mut partials = PartialsMap::new();
        partials.insert(
            ("curve".to_string(), "poles".to_string()),
            (*basis).clone(),
        );
        Ok(partials)
    }
}

/// Chains an objective gradient over the normalized delta onto the totals
/// it was built from: `delta = (d - p) / (d + EPSILON)`.
fn objective_chain(
    gradient: &[f64],
    production: &TimeSeries,
    demand: &TimeSeries,
) -> (Vec<f64>, Vec<f64>) {
    let mut d_prod = Vec::with_capacity(gradient.len());
    let mut d_dem = Vec::with_capacity(gradient.len());
    for ((g, &p), &d) in gradient
        .iter()
        .zip(production.values())
        .zip(demand.values())
    {
        let den = d + EPSILON;
        d_prod.push(-g / den);
        d_dem.push(g * (p + EPSILON) / (den * den));
    }
    (d_prod, d_dem)
}

/// Square matrix with `values` on the diagonal.
fn diagonal(values: &[f64]) -> BasisMatrix {
    let n = values.len();
    let mut data = vec![0.0; n * n];
    for (i, &v) in values.iter().enumerate() {
        data[i * n + i] = v;
    }
    BasisMatrix::from_raw(n, n, data)
}

/// Single-row matrix (gradient of a scalar output).
fn row_vector(values: &[f64]) -> BasisMatrix {
    BasisMatrix::from_raw(1, values.len(), values.to_vec())
}
