//! A balanced stream: one tracked quantity with its contributor series.

use std::collections::BTreeMap;

use crate::error::BalanceError;
use crate::series::{TimeSeries, YearSpan};
use crate::units::Unit;

/// One tracked quantity (energy carrier, resource, or emission) whose
/// production and demand are balanced across contributors.
///
/// Contributor maps use `BTreeMap` so reporting columns come out in a
/// deterministic order. Every contributor series must live on the span of
/// the enclosing balance computation; [`Stream::validate`] checks this
/// before any math runs.
#[derive(Debug, Clone)]
pub struct Stream {
    /// Stream identifier (e.g. `"electricity"`, `"carbon_storage"`).
    pub id: String,
    /// Unit all contributor series are expressed in.
    pub unit: Unit,
    /// Production series keyed by producing technology.
    pub production: BTreeMap<String, TimeSeries>,
    /// Demand series keyed by consuming sector.
    pub demand: BTreeMap<String, TimeSeries>,
}

impl Stream {
    /// Creates an empty stream with no contributors yet.
    pub fn new(id: impl Into<String>, unit: Unit) -> Self {
        Self {
            id: id.into(),
            unit,
            production: BTreeMap::new(),
            demand: BTreeMap::new(),
        }
    }

    /// Adds (or replaces) a producer series.
    pub fn with_producer(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.production.insert(name.into(), series);
        self
    }

    /// Adds (or replaces) a consumer demand series.
    pub fn with_consumer(mut self, name: impl Into<String>, series: TimeSeries) -> Self {
        self.demand.insert(name.into(), series);
        self
    }

    /// Checks that every contributor series lives on `span`.
    ///
    /// # Errors
    ///
    /// Returns [`BalanceError::ShapeMismatch`] naming the first offending
    /// contributor.
    pub fn validate(&self, span: YearSpan) -> Result<(), BalanceError> {
        for (name, series) in &self.production {
            series.check_span(span, &format!("{}.production.{name}", self.id))?;
        }
        for (name, series) in &self.demand {
            series.check_span(span, &format!("{}.demand.{name}", self.id))?;
        }
        Ok(())
    }
}
