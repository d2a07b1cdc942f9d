//! 마찰 손실 계산 회귀 테스트.
use hydraulic_sizing_toolbox::catalog::Catalog;
use hydraulic_sizing_toolbox::hydraulics::{
    self, colebrook_white, darcy_friction_factor, segment_loss, FrictionError, SegmentLossInput,
    SolverSettings,
};
use proptest::prelude::*;

fn assert_close(label: &str, actual: f64, expected: f64, rel_tol: f64) {
    let denom = expected.abs().max(1.0);
    let diff = (actual - expected).abs();
    assert!(
        diff <= rel_tol * denom,
        "{label} expected {expected:.6} got {actual:.6} (diff {diff:.6}, tol {rel_tol})"
    );
}

fn catalog() -> Catalog {
    Catalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.toml"))
        .expect("sample catalog should load")
}

fn basin_input() -> SegmentLossInput {
    SegmentLossInput {
        flow_ls: 0.09,
        internal_diameter_mm: 10.81,
        length_m: 10.0,
        roughness_mm: 0.0015,
        density_kg_m3: 997.0,
        dynamic_viscosity_pa_s: 0.00100005,
        k_total: 0.0,
    }
}

#[test]
fn dn15_copper_basin_branch() {
    let loss = segment_loss(basin_input(), &SolverSettings::default()).expect("loss");
    assert_close("velocity", loss.velocity_m_s, 0.9806, 1e-3);
    assert_close("reynolds", loss.reynolds, 10568.0, 1e-3);
    assert_close("friction factor", loss.friction_factor, 0.030655, 1e-4);
    assert_close("friction loss kPa", loss.friction_loss_kpa, 13.594, 1e-3);
    assert_eq!(loss.fitting_loss_kpa, 0.0);
    assert!(loss.iterations >= 1 && loss.iterations <= 50);
}

#[test]
fn fittings_add_k_times_velocity_head() {
    let settings = SolverSettings::default();
    let bare = segment_loss(basin_input(), &settings).expect("bare");
    let with_k = segment_loss(
        SegmentLossInput {
            k_total: 2.0,
            ..basin_input()
        },
        &settings,
    )
    .expect("with fittings");
    let v = bare.velocity_m_s;
    let expected_kpa = 997.0 * 2.0 * v * v / 2.0 / 1000.0;
    assert_close("fitting loss", with_k.fitting_loss_kpa, expected_kpa, 1e-9);
    assert_close(
        "total",
        with_k.total_loss_kpa,
        bare.friction_loss_kpa + expected_kpa,
        1e-9,
    );
}

#[test]
fn zero_flow_has_no_loss() {
    let loss = segment_loss(
        SegmentLossInput {
            flow_ls: 0.0,
            ..basin_input()
        },
        &SolverSettings::default(),
    )
    .expect("zero flow");
    assert_eq!(loss.total_loss_kpa, 0.0);
    assert_eq!(loss.velocity_m_s, 0.0);
}

#[test]
fn laminar_flow_uses_64_over_re() {
    let f = darcy_friction_factor(0.0001, 1000.0, &SolverSettings::default()).expect("laminar");
    assert_close("64/Re", f.value, 0.064, 1e-12);
    assert_eq!(f.iterations, 0);
}

#[test]
fn invalid_inputs_are_rejected() {
    let settings = SolverSettings::default();
    for input in [
        SegmentLossInput {
            flow_ls: -0.1,
            ..basin_input()
        },
        SegmentLossInput {
            internal_diameter_mm: 0.0,
            ..basin_input()
        },
        SegmentLossInput {
            dynamic_viscosity_pa_s: 0.0,
            ..basin_input()
        },
    ] {
        assert!(matches!(
            segment_loss(input, &settings),
            Err(FrictionError::InvalidInput(_))
        ));
    }
}

#[test]
fn iteration_cap_reports_convergence_failure() {
    let settings = SolverSettings {
        tolerance: 0.0,
        max_iterations: 1,
        ..SolverSettings::default()
    };
    let err = colebrook_white(1e-4, 1e5, &settings).expect_err("must not converge");
    assert!(matches!(err, FrictionError::Convergence { iterations: 1, .. }));
}

#[test]
fn valve_k_uses_containing_range() {
    let cat = catalog();
    let elbow = cat.valve("90Elbow").expect("elbow");
    assert_close("DN25", elbow.k_value(25.0).expect("k"), 0.69, 1e-12);
    assert_close("DN70", elbow.k_value(70.0).expect("k"), 0.54, 1e-12);
    assert!(elbow.k_value(12.0).is_err());
}

#[test]
fn water_viscosity_and_density_near_20c() {
    assert_close(
        "viscosity",
        hydraulics::liquid_water_viscosity(20.0) * 1000.0,
        1.0016,
        0.01,
    );
    let rho = hydraulics::iapws_water_density(20.0, 0.0).expect("density");
    assert_close("density", rho, 998.2, 1e-3);
}

proptest! {
    #[test]
    fn colebrook_converges_over_building_range(
        q in 0.01f64..20.0,
        d in 10.0f64..300.0,
        eps in 0.0015f64..0.3,
    ) {
        let v = hydraulics::velocity_m_s(q, d);
        let re = hydraulics::reynolds_number(998.2, v, d / 1000.0, 0.001);
        let settings = SolverSettings::default();
        let f = darcy_friction_factor(eps / d, re, &settings);
        prop_assert!(f.is_ok(), "Q={q} d={d} eps={eps} Re={re}: {f:?}");
        let f = f.expect("checked above");
        prop_assert!(f.iterations <= settings.max_iterations);
        prop_assert!(f.value > 0.0 && f.value.is_finite());
    }
}
