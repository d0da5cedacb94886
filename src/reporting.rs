//! Year-keyed tables published to the downstream engine and charts.
//!
//! Each table carries one column per contributor plus a `Total` column,
//! which is exactly the dataframe-like shape the external engine consumes.

use std::collections::BTreeMap;
use std::fmt;

use crate::balance::StreamBalance;
use crate::series::{TimeSeries, YearSpan};

/// A table keyed by year with named value columns and a `Total` column.
#[derive(Debug, Clone)]
pub struct BalanceTable {
    /// Table title (e.g. `"electricity production [TWh]"`).
    pub title: String,
    /// Year grid of all columns.
    pub span: YearSpan,
    /// Named contributor columns, in deterministic order.
    pub columns: Vec<(String, Vec<f64>)>,
    /// The aggregated `Total` column.
    pub total: Vec<f64>,
}

impl BalanceTable {
    fn from_breakdown(
        title: String,
        breakdown: &BTreeMap<String, TimeSeries>,
        total: &TimeSeries,
    ) -> Self {
        let columns = breakdown
            .iter()
            .map(|(name, series)| (name.clone(), series.values().to_vec()))
            .collect();
        Self {
            title,
            span: total.span(),
            columns,
            total: total.values().to_vec(),
        }
    }

    /// Production view of a stream balance: one column per producer.
    pub fn production(stream_id: &str, balance: &StreamBalance) -> Self {
        Self::from_breakdown(
            format!("{stream_id} production"),
            &balance.production_by,
            &balance.production_total,
        )
    }

    /// Demand view of a stream balance: one column per consumer.
    pub fn demand(stream_id: &str, balance: &StreamBalance) -> Self {
        Self::from_breakdown(
            format!("{stream_id} demand"),
            &balance.demand_by,
            &balance.demand_total,
        )
    }

    /// Ratio view: no contributor columns, only the percentage total.
    pub fn ratio(stream_id: &str, balance: &StreamBalance) -> Self {
        let series = balance.ratio.series();
        Self {
            title: format!("{stream_id} availability ratio [%]"),
            span: series.span(),
            columns: Vec::new(),
            total: series.values().to_vec(),
        }
    }

    /// Column headers in output order: `year`, contributors, `Total`.
    pub fn headers(&self) -> Vec<String> {
        let mut headers = Vec::with_capacity(self.columns.len() + 2);
        headers.push("year".to_string());
        headers.extend(self.columns.iter().map(|(name, _)| name.clone()));
        headers.push("Total".to_string());
        headers
    }
}

impl fmt::Display for BalanceTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- {} ---", self.title)?;
        write!(f, "{:>6}", "year")?;
        for (name, _) in &self.columns {
            write!(f, " {name:>12}")?;
        }
        writeln!(f, " {:>12}", "Total")?;

        for (i, year) in self.span.years().enumerate() {
            write!(f, "{year:>6}")?;
            for (_, values) in &self.columns {
                write!(f, " {:>12.3}", values[i])?;
            }
            writeln!(f, " {:>12.3}", self.total[i])?;
        }
        Ok(())
    }
}
