//! 기준별 설계 유량 회귀 테스트. 값은 data/catalog.toml 의 표를 따른다.
use hydraulic_sizing_toolbox::catalog::{Catalog, FluidRole};
use hydraulic_sizing_toolbox::demand::{self, DemandError, DemandWarning};
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

#[test]
fn as3500_single_loading_unit() {
    let cat = catalog();
    let standard = cat.psd_standard("as35002018LoadingUnits").expect("standard");
    let est = demand::estimate(standard, FluidRole::ColdWater, 1.0, 1.0).expect("estimate");
    assert_close("LU=1", est.flow_ls, 0.09, 1e-9);
    assert!(est.warnings.is_empty());
}

#[test]
fn as3500_between_breakpoints_is_linear() {
    let cat = catalog();
    let standard = cat.psd_standard("as35002018LoadingUnits").expect("standard");
    let est = demand::estimate(standard, FluidRole::ColdWater, 1.5, 1.0).expect("estimate");
    assert_close("LU=1.5", est.flow_ls, 0.105, 1e-9);
}

#[test]
fn as3500_beyond_last_key_extrapolates_with_warning() {
    let cat = catalog();
    let standard = cat.psd_standard("as35002018LoadingUnits").expect("standard");
    let last = *standard_keys(&cat, "as35002018LoadingUnits").last().expect("keys");
    let est = demand::estimate(standard, FluidRole::ColdWater, last + 10.0, 2.0).expect("estimate");
    assert!(matches!(
        est.warnings.as_slice(),
        [DemandWarning::Extrapolated { .. }]
    ));
}

#[test]
fn bs806_selects_sub_table_by_max_single() {
    let cat = catalog();
    let standard = cat.psd_standard("bs806").expect("standard");
    let est = demand::estimate(standard, FluidRole::ColdWater, 10.0, 3.0).expect("estimate");
    assert_close("bs806 max3 total10", est.flow_ls, 0.48, 1e-9);
    // 최대 단일 부하 3.5 는 여전히 3 표를 쓴다
    let est = demand::estimate(standard, FluidRole::ColdWater, 10.0, 3.5).expect("estimate");
    assert_close("bs806 max3.5 total10", est.flow_ls, 0.48, 1e-9);
}

#[test]
fn bs806_above_ceiling_reports_out_of_range() {
    let cat = catalog();
    let standard = cat.psd_standard("bs806").expect("standard");
    let est = demand::estimate(standard, FluidRole::ColdWater, 6000.0, 3.0).expect("estimate");
    match est.warnings.as_slice() {
        [DemandWarning::OutOfRange { nearest, .. }] => {
            assert_close("nearest", *nearest, est.flow_ls, 1e-12)
        }
        other => panic!("unexpected warnings {other:?}"),
    }
}

#[test]
fn din_flow_never_exceeds_sum_of_design_flows() {
    let cat = catalog();
    let hotel = cat.psd_standard("din1988300Hotel").expect("standard");
    // 0.7 * 0.1^0.48 - 0.13 ≈ 0.1018 > 0.1 이므로 합계로 제한된다
    let est = demand::estimate(hotel, FluidRole::ColdWater, 0.1, 0.1).expect("estimate");
    assert_close("hotel capped", est.flow_ls, 0.1, 1e-12);

    let residential = cat.psd_standard("din1988300Residential").expect("standard");
    let est = demand::estimate(residential, FluidRole::ColdWater, 2.0, 0.2).expect("estimate");
    let expected = 1.48 * 2.0_f64.powf(0.19) - 0.94;
    assert_close("residential", est.flow_ls, expected, 1e-9);
}

#[test]
fn din_negative_result_clamps_to_zero() {
    let cat = catalog();
    let residential = cat.psd_standard("din1988300Residential").expect("standard");
    let est = demand::estimate(residential, FluidRole::ColdWater, 0.01, 0.01).expect("estimate");
    assert_eq!(est.flow_ls, 0.0);
}

#[test]
fn frequency_factor_applies_once_per_fixture() {
    let cat = catalog();
    let standard = cat.psd_standard("en12056Intermittent").expect("standard");
    let basin = cat.fixture("basin").expect("basin");
    let du = demand::fixture_units(basin, standard, FluidRole::ColdWater, "generic", "default")
        .expect("units");
    assert_close("basin DU", du, 0.25, 1e-12);
    let est = demand::estimate(standard, FluidRole::ColdWater, 4.0, du).expect("estimate");
    assert_close("sqrt(4)", est.flow_ls, 2.0, 1e-12);
}

#[test]
fn missing_loading_units_for_role_is_an_error() {
    let cat = catalog();
    let standard = cat.psd_standard("as35002018LoadingUnits").expect("standard");
    let sink = cat.fixture("kitchenSink").expect("kitchen sink");
    // 냉수/온수(warm) 값만 있고 급탕 값은 없다
    let err = demand::fixture_units(sink, standard, FluidRole::HotWater, "generic", "default")
        .expect_err("no hot-water loading units");
    assert!(matches!(
        err,
        DemandError::MissingFixtureValue { ref fixture, ref standard, .. }
            if fixture == "kitchenSink" && standard == "as35002018LoadingUnits"
    ));
    let warm = demand::fixture_units(sink, standard, FluidRole::WarmWater, "generic", "default")
        .expect("warm-water value");
    assert_close("warm", warm, 2.0, 1e-12);
}

#[test]
fn loading_units_are_not_borrowed_from_other_standards() {
    let cat = catalog();
    let bs806 = cat.psd_standard("bs806").expect("standard");
    let basin = cat.fixture("basin").expect("basin");
    let units = demand::fixture_units(basin, bs806, FluidRole::ColdWater, "generic", "default")
        .expect("bs806 value");
    assert_close("basin bs806", units, 1.5, 1e-12);
    assert_ne!(Some(units), basin.asnz_fixture_units);
}

#[test]
fn dwelling_equation() {
    let cat = catalog();
    let standard = cat.dwelling_standard("as35002018Dwellings").expect("standard");
    let est = demand::estimate(standard, FluidRole::ColdWater, 4.0, 0.0).expect("estimate");
    assert_close("4 dwellings", est.flow_ls, 0.03 * 4.0 + 0.4554 * 2.0, 1e-12);
}

#[test]
fn dwelling_table_uses_role_column_and_warns_past_last_row() {
    let cat = catalog();
    let standard = cat.dwelling_standard("barriesBookDwellings").expect("standard");
    let cold = demand::estimate(standard, FluidRole::ColdWater, 1.0, 0.0).expect("cold");
    let hot = demand::estimate(standard, FluidRole::HotWater, 1.0, 0.0).expect("hot");
    assert_close("cold", cold.flow_ls, 0.48, 1e-12);
    assert_close("hot", hot.flow_ls, 0.4, 1e-12);

    let beyond = demand::estimate(standard, FluidRole::ColdWater, 101.0, 0.0).expect("beyond");
    let last = demand::estimate(standard, FluidRole::ColdWater, 100.0, 0.0).expect("last");
    assert_eq!(beyond.flow_ls, last.flow_ls);
    assert!(matches!(
        beyond.warnings.as_slice(),
        [DemandWarning::UnsupportedDwellingCount {
            count: 101,
            max: 100,
            ..
        }]
    ));
}

#[test]
fn zero_load_is_zero_flow() {
    let cat = catalog();
    for uid in ["as35002018LoadingUnits", "bs806", "din1988300Residential"] {
        let standard = cat.psd_standard(uid).expect("standard");
        let est = demand::estimate(standard, FluidRole::ColdWater, 0.0, 0.0).expect("estimate");
        assert_eq!(est.flow_ls, 0.0, "{uid}");
    }
}

#[test]
fn table_breakpoints_are_exact() {
    let cat = catalog();
    let standard = cat.psd_standard("barriesBookLoadingUnits").expect("standard");
    let hydraulic_sizing_toolbox::catalog::PsdKind::LoadingUnitTable(table) = &standard.kind
    else {
        panic!("expected a loading unit table");
    };
    for (key, value) in table.keys().iter().zip(table.values()) {
        let est = demand::estimate(standard, FluidRole::ColdWater, *key, 1.0).expect("estimate");
        assert_eq!(est.flow_ls, *value, "key {key}");
    }
}

fn standard_keys(cat: &Catalog, uid: &str) -> Vec<f64> {
    match &cat.psd_standard(uid).expect("standard").kind {
        hydraulic_sizing_toolbox::catalog::PsdKind::LoadingUnitTable(t) => t.keys().to_vec(),
        _ => Vec::new(),
    }
}

proptest! {
    #[test]
    fn loading_unit_tables_are_monotone(a in 0.0f64..4000.0, b in 0.0f64..4000.0) {
        let cat = catalog();
        for uid in ["as35002018LoadingUnits", "barriesBookLoadingUnits"] {
            let standard = cat.psd_standard(uid).expect("standard");
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let q_lo = demand::estimate(standard, FluidRole::ColdWater, lo, 1.0).expect("lo").flow_ls;
            let q_hi = demand::estimate(standard, FluidRole::ColdWater, hi, 1.0).expect("hi").flow_ls;
            prop_assert!(q_lo <= q_hi + 1e-12, "{uid}: Q({lo})={q_lo} > Q({hi})={q_hi}");
        }
    }
}
