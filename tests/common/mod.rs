//! Shared test fixtures for integration tests.

use stream_balance::balance::{BalanceInput, Stream};
use stream_balance::config::BalanceConfig;
use stream_balance::series::{TimeSeries, YearSpan};
use stream_balance::units::Unit;

/// Default year grid (2020 through 2050 inclusive).
pub fn default_span() -> YearSpan {
    YearSpan::new(2020, 31)
}

/// Electricity stream with two producers ramping up against flat demand.
pub fn electricity_stream(span: YearSpan) -> Stream {
    let ramp = |peak: f64| {
        let values = (0..span.len)
            .map(|i| peak * i as f64 / (span.len - 1) as f64)
            .collect();
        TimeSeries::new(span.start_year, values)
    };
    Stream::new("electricity", Unit::TerawattHour)
        .with_producer("solar", ramp(60.0))
        .with_producer("wind", ramp(40.0))
        .with_consumer("industry", flat(span, 50.0))
        .with_consumer("residential", flat(span, 30.0))
}

/// Hydrogen stream where supply always covers demand.
pub fn hydrogen_stream(span: YearSpan) -> Stream {
    Stream::new("hydrogen", Unit::TerawattHour)
        .with_producer("electrolysis", flat(span, 20.0))
        .with_consumer("steel", flat(span, 5.0))
}

/// Constant series over the span.
pub fn flat(span: YearSpan, value: f64) -> TimeSeries {
    TimeSeries::new(span.start_year, vec![value; span.len])
}

/// Energy-preset configuration plus an input holding both fixture streams.
pub fn default_config_and_input() -> (BalanceConfig, BalanceInput) {
    let span = default_span();
    let config = BalanceConfig::energy();
    let input = BalanceInput::new(span)
        .with_stream(electricity_stream(span))
        .with_stream(hydrogen_stream(span));
    (config, input)
}
