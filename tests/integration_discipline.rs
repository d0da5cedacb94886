//! Integration tests for the engine-facing discipline adapter.

mod common;

use stream_balance::config::BalanceConfig;
use stream_balance::discipline::{
    BalanceDiscipline, Discipline, ProfileDiscipline, Value, VariableMap, get_scalar, get_series,
    get_vector,
};
use stream_balance::series::{TimeSeries, YearSpan};

fn balance_inputs() -> VariableMap {
    let span = common::default_span();
    let mut inputs = VariableMap::new();
    for (name, series) in [
        ("production.electricity.solar", common::flat(span, 60.0)),
        ("production.electricity.wind", common::flat(span, 40.0)),
        ("demand.electricity.industry", common::flat(span, 50.0)),
        ("demand.hydrogen.steel", common::flat(span, 5.0)),
        ("production.hydrogen.electrolysis", common::flat(span, 20.0)),
    ] {
        inputs.insert(name.to_string(), Value::Series(series));
    }
    inputs
}

#[test]
fn compute_publishes_per_stream_tables_and_objective() {
    let discipline = BalanceDiscipline::new(BalanceConfig::energy(), common::default_span())
        .expect("valid config");
    let outputs = discipline.compute(&balance_inputs()).expect("computes");

    let production = get_series(&outputs, "production_total.electricity").expect("total");
    assert!(production.values().iter().all(|&v| (v - 100.0).abs() < 1e-9));

    let ratio = get_series(&outputs, "ratio.electricity").expect("ratio");
    assert!(ratio.values().iter().all(|&v| (v - 100.0).abs() < 1e-3));

    let objective = get_scalar(&outputs, "objective").expect("objective");
    assert!(objective.is_finite());
}

#[test]
fn unknown_stream_variable_is_fatal() {
    let discipline = BalanceDiscipline::new(BalanceConfig::energy(), common::default_span())
        .expect("valid config");
    let mut inputs = balance_inputs();
    inputs.insert(
        "production.antimatter.reactor".to_string(),
        Value::Series(common::flat(common::default_span(), 1.0)),
    );
    let err = discipline.compute(&inputs).unwrap_err();
    assert!(err.to_string().contains("antimatter"));
}

#[test]
fn jacobian_blocks_cover_every_stream_ratio() {
    let discipline = BalanceDiscipline::new(BalanceConfig::energy(), common::default_span())
        .expect("valid config");
    let partials = discipline
        .compute_partials(&balance_inputs())
        .expect("partials");

    for id in ["electricity", "hydrogen", "biogas"] {
        let key = (
            format!("ratio.{id}"),
            format!("production_total.{id}"),
        );
        let block = partials.get(&key).expect("ratio block per stream");
        assert_eq!(block.rows(), common::default_span().len);
        assert_eq!(block.cols(), common::default_span().len);
    }
}

#[test]
fn aggregate_mode_jacobian_matches_published_outputs() {
    let span = YearSpan::new(2020, 3);
    let config = BalanceConfig::from_toml_str(
        r#"
[balance]
demand_detail = "aggregate"

[[stream]]
id = "electricity"
unit = "TWh"

[[stream]]
id = "hydrogen"
unit = "TWh"
"#,
    )
    .expect("config parses");
    let discipline = BalanceDiscipline::new(config, span).expect("valid config");

    let inputs_with_solar = |solar_year_1: f64| {
        let mut inputs = VariableMap::new();
        inputs.insert(
            "production.electricity.solar".to_string(),
            Value::Series(TimeSeries::new(2020, vec![40.0, solar_year_1, 60.0])),
        );
        inputs.insert(
            "demand.electricity.industry".to_string(),
            Value::Series(TimeSeries::new(2020, vec![100.0; 3])),
        );
        inputs.insert(
            "production.hydrogen.electrolysis".to_string(),
            Value::Series(TimeSeries::new(2020, vec![20.0; 3])),
        );
        inputs.insert(
            "demand.hydrogen.steel".to_string(),
            Value::Series(TimeSeries::new(2020, vec![50.0; 3])),
        );
        inputs
    };

    let partials = discipline
        .compute_partials(&inputs_with_solar(50.0))
        .expect("partials");
    let h = 1e-4;

    // Every stream publishes the shared market ratio, so both the own and
    // the cross block must match the finite difference of the published
    // output when electricity production moves.
    for out in ["electricity", "hydrogen"] {
        let block = partials
            .get(&(
                format!("ratio.{out}"),
                "production_total.electricity".to_string(),
            ))
            .expect("ratio block");
        let ratio_at = |solar: f64| {
            let outputs = discipline.compute(&inputs_with_solar(solar)).expect("computes");
            get_series(&outputs, &format!("ratio.{out}")).expect("ratio").values()[1]
        };
        let fd = (ratio_at(50.0 + h) - ratio_at(50.0 - h)) / (2.0 * h);
        assert!(
            (block.get(1, 1) - fd).abs() < 1e-5,
            "ratio.{out}: analytic {} vs fd {fd}",
            block.get(1, 1)
        );
    }

    let grad = partials
        .get(&(
            "objective".to_string(),
            "production_total.electricity".to_string(),
        ))
        .expect("objective gradient");
    let objective_at = |solar: f64| {
        get_scalar(
            &discipline.compute(&inputs_with_solar(solar)).expect("computes"),
            "objective",
        )
        .expect("objective")
    };
    let fd = (objective_at(50.0 + h) - objective_at(50.0 - h)) / (2.0 * h);
    assert!(
        (grad.get(0, 1) - fd).abs() < 1e-6,
        "objective: analytic {} vs fd {fd}",
        grad.get(0, 1)
    );
}

#[test]
fn profile_discipline_chains_into_balance_inputs() {
    // One optimizer iteration: poles -> dense curve -> balance input.
    let span = common::default_span();
    let profile = ProfileDiscipline::new(span.len);

    let mut profile_inputs = VariableMap::new();
    profile_inputs.insert(
        "poles".to_string(),
        Value::Vector(vec![0.0, 30.0, 80.0, 100.0]),
    );
    let profile_outputs = profile.compute(&profile_inputs).expect("profile computes");
    let curve = get_vector(&profile_outputs, "curve").expect("curve");

    let balance = BalanceDiscipline::new(BalanceConfig::energy(), span).expect("valid config");
    let mut inputs = VariableMap::new();
    inputs.insert(
        "production.electricity.new_build".to_string(),
        Value::Series(TimeSeries::new(span.start_year, curve.to_vec())),
    );
    inputs.insert(
        "demand.electricity.grid".to_string(),
        Value::Series(common::flat(span, 50.0)),
    );

    let outputs = balance.compute(&inputs).expect("balance computes");
    let ratio = get_series(&outputs, "ratio.electricity").expect("ratio");
    assert!(ratio.values()[0] < 1.0);
    assert!((ratio.values()[span.len - 1] - 100.0).abs() < 1e-3);
}

#[test]
fn profile_partials_match_curve_linearity() {
    let discipline = ProfileDiscipline::new(12);
    let poles = vec![2.0, 5.0, 1.0];

    let mut inputs = VariableMap::new();
    inputs.insert("poles".to_string(), Value::Vector(poles.clone()));

    let outputs = discipline.compute(&inputs).expect("computes");
    let curve = get_vector(&outputs, "curve").expect("curve");

    let partials = discipline.compute_partials(&inputs).expect("partials");
    let basis = partials
        .get(&("curve".to_string(), "poles".to_string()))
        .expect("basis block");

    // curve == B · poles, the linearity the external adjoint relies on.
    let reproduced = basis.mul_vec(&poles);
    for (a, b) in curve.iter().zip(&reproduced) {
        assert!((a - b).abs() < 1e-12);
    }
}
