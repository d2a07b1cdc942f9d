//! 배관망 사이징 종단 간 테스트.
use std::sync::Arc;

use hydraulic_sizing_toolbox::catalog::Catalog;
use hydraulic_sizing_toolbox::hydraulics::SolverSettings;
use hydraulic_sizing_toolbox::network::{ProjectSnapshot, TopologyError};
use hydraulic_sizing_toolbox::sizing::{
    Cancellation, Severity, SizingEngine, SizingError, SizingSettings, ViolationKind,
};

fn assert_close(label: &str, actual: f64, expected: f64, rel_tol: f64) {
    let denom = expected.abs().max(1.0);
    let diff = (actual - expected).abs();
    assert!(
        diff <= rel_tol * denom,
        "{label} expected {expected:.6} got {actual:.6} (diff {diff:.6}, tol {rel_tol})"
    );
}

fn engine_with(settings: SizingSettings) -> SizingEngine {
    let catalog = Catalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.toml"))
        .expect("sample catalog should load");
    SizingEngine::new(Arc::new(catalog), settings)
}

fn engine() -> SizingEngine {
    engine_with(SizingSettings::default())
}

fn snapshot(src: &str) -> ProjectSnapshot {
    ProjectSnapshot::from_toml_str(src).expect("snapshot should parse")
}

const HEADER: &str = r#"
name = "test"
role = "cold-water"
psd_standard = "as35002018LoadingUnits"
fluid = "water"
temperature_c = 20.0
"#;

/// 300 kPa 공급점에서 10 m 동관으로 세면기 하나를 공급한다.
fn basin_project(extra_edge_fields: &str) -> ProjectSnapshot {
    snapshot(&format!(
        r#"{HEADER}
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "basin"
kind = "fixture"
fixture = "basin"

[[edges]]
uid = "e1"
from = "src"
to = "basin"
length_m = 10.0
material = "copperTypeB"
{extra_edge_fields}
"#
    ))
}

#[test]
fn single_basin_on_dn15_copper() {
    let report = engine().size(&basin_project("")).expect("sizing");
    let edge = &report.edges[0];
    assert_close("design flow", edge.design_flow_ls, 0.09, 1e-12);
    assert_eq!(edge.nominal_mm, Some(15.0));
    assert_close("velocity", edge.velocity_m_s, 0.9806, 1e-3);
    assert_close("friction", edge.friction_loss_kpa, 13.690, 1e-3);
    assert_close(
        "node pressure",
        edge.downstream_pressure_kpa.expect("resolved"),
        286.31,
        1e-3,
    );
    let fixture = &report.fixtures[0];
    assert_close(
        "residual",
        fixture.residual_pressure_kpa.expect("resolved"),
        276.53,
        1e-3,
    );
    assert!(report.violations.is_empty(), "{:?}", report.violations);
}

#[test]
fn repeated_runs_give_identical_reports() {
    let engine = engine();
    let snap = basin_project("");
    let first = engine.size(&snap).expect("first");
    let second = engine.size(&snap).expect("second");
    assert_eq!(first, second);
}

#[test]
fn spare_capacity_scales_design_flow() {
    let mut snap = basin_project("");
    snap.spare_capacity_pct = Some(20.0);
    let report = engine().size(&snap).expect("sizing");
    assert_close("raw", report.edges[0].raw_flow_ls, 0.09, 1e-12);
    assert_close("design", report.edges[0].design_flow_ls, 0.108, 1e-12);
}

#[test]
fn fixed_size_over_velocity_is_flagged() {
    let mut snap = basin_project("nominal_mm = 15.0");
    snap.max_velocity_m_s = Some(0.5);
    let report = engine().size(&snap).expect("sizing");
    assert_eq!(report.edges[0].nominal_mm, Some(15.0));
    assert!(report.violations.iter().any(|v| v.entity_uid == "e1"
        && matches!(v.kind, ViolationKind::OverriddenSizeInsufficient { .. })));
    // 선정은 실패했지만 압력은 계속 전파된다
    assert!(report.fixtures[0].residual_pressure_kpa.is_some());
}

#[test]
fn unknown_fixed_size_is_fatal() {
    let err = engine()
        .size(&basin_project("nominal_mm = 17.0"))
        .expect_err("17 mm is not a catalogue size");
    assert!(matches!(err, SizingError::UnknownPipeSize { .. }));
}

#[test]
fn larger_size_chosen_when_velocity_limit_is_tight() {
    let mut snap = basin_project("");
    snap.max_velocity_m_s = Some(0.5);
    let report = engine().size(&snap).expect("sizing");
    assert_eq!(report.edges[0].nominal_mm, Some(20.0));
    assert!(report.edges[0].velocity_m_s <= 0.5);
}

#[test]
fn unconverged_edge_leaves_fixture_unresolved() {
    let settings = SizingSettings {
        solver: SolverSettings {
            tolerance: 0.0,
            max_iterations: 1,
            ..SolverSettings::default()
        },
        ..SizingSettings::default()
    };
    let report = engine_with(settings).size(&basin_project("")).expect("sizing");
    assert!(!report.edges[0].resolved);
    assert!(report.edges[0].downstream_pressure_kpa.is_none());
    let kinds: Vec<_> = report
        .violations
        .iter()
        .map(|v| (v.entity_uid.as_str(), &v.kind))
        .collect();
    assert!(kinds
        .iter()
        .any(|(uid, k)| *uid == "e1" && matches!(k, ViolationKind::Convergence { iterations: 1 })));
    assert!(kinds
        .iter()
        .any(|(uid, k)| *uid == "basin" && matches!(k, ViolationKind::UpstreamUnresolved)));
    assert!(report.has_errors());
}

#[test]
fn high_fixture_reports_insufficient_pressure() {
    let snap = snapshot(&format!(
        r#"{HEADER}
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "roofBasin"
kind = "fixture"
fixture = "basin"
elevation_m = 25.0

[[edges]]
uid = "riser"
from = "src"
to = "roofBasin"
length_m = 30.0
material = "copperTypeB"
"#
    ));
    let report = engine().size(&snap).expect("sizing");
    assert!(report
        .violations
        .iter()
        .any(|v| matches!(v.kind, ViolationKind::NoSuitablePipeSize { .. })));
    assert!(report.violations.iter().any(|v| v.entity_uid == "roofBasin"
        && matches!(v.kind, ViolationKind::InsufficientPressure { .. })));
}

#[test]
fn errors_sort_before_warnings() {
    let snap = snapshot(&format!(
        r#"{HEADER}
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 900.0

[[nodes]]
uid = "basin"
kind = "fixture"
fixture = "basin"

[[nodes]]
uid = "roofBasin"
kind = "fixture"
fixture = "basin"
elevation_m = 80.0

[[edges]]
uid = "low"
from = "src"
to = "basin"
length_m = 2.0
material = "copperTypeB"

[[edges]]
uid = "high"
from = "src"
to = "roofBasin"
length_m = 90.0
material = "copperTypeB"
"#
    ));
    let report = engine().size(&snap).expect("sizing");
    // 낮은 세면기는 과압(경고), 옥상 세면기는 압력 부족(오류)
    assert!(report.violations.iter().any(|v| v.entity_uid == "basin"
        && matches!(v.kind, ViolationKind::FixturePressureExceeded { .. })));
    assert!(report.has_errors());
    let severities: Vec<Severity> = report.violations.iter().map(|v| v.severity).collect();
    let mut sorted = severities.clone();
    sorted.sort();
    assert_eq!(severities, sorted);
}

#[test]
fn dwellings_and_continuous_flow_are_added() {
    let snap = snapshot(
        r#"
name = "load node"
role = "cold-water"
psd_standard = "as35002018LoadingUnits"
dwelling_standard = "as35002018Dwellings"
fluid = "water"

[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 500.0

[[nodes]]
uid = "flats"
kind = "load_node"
dwellings = 4
continuous_flow_ls = 0.05

[[edges]]
uid = "service"
from = "src"
to = "flats"
length_m = 15.0
material = "copperTypeB"
"#,
    );
    let report = engine().size(&snap).expect("sizing");
    let expected = 0.03 * 4.0 + 0.4554 * 2.0 + 0.05;
    assert_close("flow", report.edges[0].design_flow_ls, expected, 1e-12);
}

#[test]
fn temperature_outside_viscosity_table_uses_boundary_value() {
    let mut hot = basin_project("");
    hot.temperature_c = Some(150.0);
    let report = engine().size(&hot).expect("out-of-table temperature is not fatal");

    let warnings: Vec<_> = report.violations_for("water").collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(warnings[0].severity, Severity::Warning);
    match &warnings[0].kind {
        ViolationKind::FluidTemperatureOutOfRange {
            fluid,
            temperature_c,
            used_temperature_c,
        } => {
            assert_eq!(fluid, "water");
            assert_eq!(*temperature_c, 150.0);
            assert_eq!(*used_temperature_c, 70.0);
        }
        other => panic!("unexpected {other:?}"),
    }

    // 70 °C 물성과 같은 손실
    let mut boundary = basin_project("");
    boundary.temperature_c = Some(70.0);
    let at_boundary = engine().size(&boundary).expect("sizing");
    assert_eq!(at_boundary.violations_for("water").count(), 0);
    assert_close(
        "friction",
        report.edges[0].friction_loss_kpa,
        at_boundary.edges[0].friction_loss_kpa,
        1e-12,
    );

    let mut cold = basin_project("");
    cold.temperature_c = Some(2.0);
    let report = engine().size(&cold).expect("sizing");
    assert!(report.violations_for("water").any(|v| matches!(
        v.kind,
        ViolationKind::FluidTemperatureOutOfRange { used_temperature_c, .. }
            if used_temperature_c == 10.0
    )));
}

#[test]
fn device_below_minimum_flow_is_a_warning() {
    let snap = snapshot(&format!(
        r#"{HEADER}
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "tap"
kind = "load_node"
continuous_flow_ls = 0.05

[[edges]]
uid = "e1"
from = "src"
to = "tap"
length_m = 5.0
material = "copperTypeB"
devices = [{{ device = "tmv" }}]
"#
    ));
    let report = engine().size(&snap).expect("sizing");
    let below: Vec<_> = report
        .violations_for("e1")
        .filter(|v| matches!(v.kind, ViolationKind::DeviceBelowMinFlow { .. }))
        .collect();
    assert_eq!(below.len(), 1);
    assert_eq!(below[0].severity, Severity::Warning);
    if let ViolationKind::DeviceBelowMinFlow {
        device,
        flow_ls,
        min_flow_ls,
    } = &below[0].kind
    {
        assert_eq!(device, "tmv");
        assert_close("flow", *flow_ls, 0.05, 1e-12);
        assert_close("min flow", *min_flow_ls, 0.066, 1e-12);
    }
    assert!(!report.has_errors(), "{:?}", report.violations);
}

#[test]
fn sample_project_sizes_without_errors() {
    let snap = ProjectSnapshot::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/project.toml"))
        .expect("sample project should load");
    let report = engine().size(&snap).expect("sizing");
    assert_eq!(report.edges.len(), snap.edges.len());
    assert!(
        !report.has_errors(),
        "unexpected errors: {:?}",
        report.violations
    );
    // 본관 유량은 모든 지관보다 크거나 같다
    let main = report
        .edges
        .iter()
        .find(|e| e.uid == "main")
        .expect("main edge");
    assert!(report
        .edges
        .iter()
        .all(|e| e.design_flow_ls <= main.design_flow_ls + 1e-12));
    assert_eq!(main.devices.len(), 1);
}

#[test]
fn comparison_keeps_input_order() {
    let snap = ProjectSnapshot::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/project.toml"))
        .expect("sample project should load");
    let standards = vec![
        "bs806".to_string(),
        "as35002018LoadingUnits".to_string(),
        "din1988300Residential".to_string(),
        "doesNotExist".to_string(),
    ];
    let results = engine().size_with_standards(&snap, &standards);
    let order: Vec<&str> = results.iter().map(|(s, _)| s.as_str()).collect();
    assert_eq!(
        order,
        ["bs806", "as35002018LoadingUnits", "din1988300Residential", "doesNotExist"]
    );
    for (uid, result) in &results[..3] {
        let report = result.as_ref().expect("known standard sizes");
        assert_eq!(&report.psd_standard, uid);
    }
    assert!(matches!(results[3].1, Err(SizingError::Catalog(_))));
}

#[test]
fn cancelled_run_returns_no_report() {
    let cancel = Cancellation::new();
    cancel.cancel();
    let err = engine()
        .size_with_cancel(&basin_project(""), &cancel)
        .expect_err("cancelled");
    assert!(matches!(err, SizingError::Cancelled));
}

fn topology_error(body: &str) -> TopologyError {
    match engine().size(&snapshot(&format!("{HEADER}\n{body}"))) {
        Err(SizingError::Topology(e)) => e,
        other => panic!("expected topology error, got {other:?}"),
    }
}

#[test]
fn missing_source_is_rejected() {
    let err = topology_error(
        r#"
[[nodes]]
uid = "a"
kind = "junction"
"#,
    );
    assert!(matches!(err, TopologyError::MissingSource));
}

#[test]
fn multiple_sources_are_rejected() {
    let err = topology_error(
        r#"
[[nodes]]
uid = "a"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "b"
kind = "source"
pressure_kpa = 300.0
"#,
    );
    assert!(matches!(err, TopologyError::MultipleSources(ref s) if s.len() == 2));
}

#[test]
fn cycle_is_rejected() {
    let err = topology_error(
        r#"
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "a"
kind = "junction"

[[nodes]]
uid = "b"
kind = "junction"

[[edges]]
uid = "ab"
from = "a"
to = "b"
length_m = 1.0
material = "copperTypeB"

[[edges]]
uid = "ba"
from = "b"
to = "a"
length_m = 1.0
material = "copperTypeB"
"#,
    );
    assert!(matches!(err, TopologyError::Cycle(_)));
}

#[test]
fn fixture_with_downstream_edge_is_rejected() {
    let err = topology_error(
        r#"
[[nodes]]
uid = "src"
kind = "source"
pressure_kpa = 300.0

[[nodes]]
uid = "basin"
kind = "fixture"
fixture = "basin"

[[nodes]]
uid = "beyond"
kind = "junction"

[[edges]]
uid = "e1"
from = "src"
to = "basin"
length_m = 1.0
material = "copperTypeB"

[[edges]]
uid = "e2"
from = "basin"
to = "beyond"
length_m = 1.0
material = "copperTypeB"
"#,
    );
    assert!(matches!(err, TopologyError::FixtureNotLeaf(ref uid) if uid == "basin"));
}
