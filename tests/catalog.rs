//! 카탈로그 로드와 검증.
use hydraulic_sizing_toolbox::catalog::{
    Catalog, CatalogError, DrainageUnits, FluidRole, PsdKind,
};
use hydraulic_sizing_toolbox::network::PipeRun;

const MINIMAL_FIXTURE: &str = r#"
[fixtures.basin]
name = "Basin"
min_inlet_pressure_kpa = 200.0
max_inlet_pressure_kpa = 500.0
"#;

#[test]
fn sample_catalog_loads() {
    let cat = Catalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.toml"))
        .expect("sample catalog should load");
    assert!(cat.fixtures.contains_key("basin"));
    assert!(cat.pipes.contains_key("copperTypeB"));
    assert!(cat.psd_standards.contains_key("bs806"));
    assert!(matches!(
        cat.psd_standard("bs806").expect("bs806").kind,
        PsdKind::MaxLoadingUnitTable(_)
    ));
    let copper = cat.pipe("copperTypeB").expect("copper");
    let sizes = copper.sizes("generic").expect("generic sizes");
    assert!(sizes
        .windows(2)
        .all(|w| w[0].nominal_mm < w[1].nominal_mm));
    let basin = cat.fixture("basin").expect("basin");
    assert_eq!(
        basin.loading_units("as35002018LoadingUnits", FluidRole::ColdWater),
        Some(1.0)
    );
}

#[test]
fn unknown_entries_are_reported_by_kind() {
    let cat = Catalog::from_toml_str(MINIMAL_FIXTURE).expect("minimal catalog");
    match cat.psd_standard("missing") {
        Err(CatalogError::UnknownEntry { uid, .. }) => assert_eq!(uid, "missing"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        cat.pipe("nope"),
        Err(CatalogError::UnknownEntry { .. })
    ));
}

#[test]
fn overlapping_valve_ranges_are_rejected() {
    let src = r#"
[valves.bad]
name = "Bad"
k_values = { "15-25" = 0.5, "20-32" = 0.4 }
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Table { uid, .. }) if uid == "bad"
    ));
}

#[test]
fn dwelling_table_with_gap_is_rejected() {
    let src = r#"
[dwelling_standards.gappy]
name = "Gappy"
type = "dwelling_hot_cold_table"

[dwelling_standards.gappy.table]
"1" = { cold = 0.4, hot = 0.3 }
"3" = { cold = 0.6, hot = 0.5 }
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Table { .. })
    ));
}

#[test]
fn malformed_equation_is_rejected_at_load() {
    let src = r#"
[psd_standards.broken]
name = "Broken"
type = "equation"
equation = "a*(D"
variables = { a = 1.0 }
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Formula { .. })
    ));
}

#[test]
fn decreasing_loading_unit_table_is_rejected() {
    let src = r#"
[psd_standards.down]
name = "Down"
type = "loading_unit_table"

[psd_standards.down.table]
"1" = 0.2
"2" = 0.1
"#;
    assert!(Catalog::from_toml_str(src).is_err());
}

#[test]
fn fixture_pressure_window_must_be_ordered() {
    let src = r#"
[fixtures.upsideDown]
name = "Upside down"
min_inlet_pressure_kpa = 500.0
max_inlet_pressure_kpa = 200.0
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Malformed { .. })
    ));
}

#[test]
fn missing_required_field_is_a_parse_error() {
    let src = r#"
[fixtures.basin]
name = "Basin"
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Parse(_))
    ));
}

#[test]
fn sample_drainage_system_loads() {
    let cat = Catalog::load(concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.toml"))
        .expect("sample catalog should load");
    let system = cat.drainage_system("asnzSanitary").expect("drainage system");
    assert_eq!(system.units, DrainageUnits::FixtureUnits);
    let horizontal = system.table(PipeRun::Horizontal);
    assert_eq!(horizontal.max_units(), 600.0);
    let size = horizontal.select(4.0).expect("row");
    assert_eq!(size.nominal_mm, 50.0);
    assert_eq!(size.grade_pct, Some(2.5));
    // 범위 사이의 부하는 다음 행
    assert_eq!(
        system.table(PipeRun::Stack).select(10.5).map(|s| s.nominal_mm),
        Some(65.0)
    );
    assert!(system.table(PipeRun::Vent).select(1001.0).is_none());
    assert!(matches!(
        cat.drainage_system("storm"),
        Err(CatalogError::UnknownEntry { kind: "배수 계통", .. })
    ));
}

#[test]
fn overlapping_drainage_rows_are_rejected() {
    let src = r#"
[drainage_systems.bad]
name = "Bad"
stack = [
    { min_units = 0, max_units = 10, size_mm = 50 },
    { min_units = 8, max_units = 30, size_mm = 65 },
]
horizontal = [{ min_units = 0, max_units = 10, size_mm = 50, grade_pct = 2.5 }]
vent = [{ min_units = 0, max_units = 10, size_mm = 40 }]
"#;
    assert!(matches!(
        Catalog::from_toml_str(src),
        Err(CatalogError::Table { uid, .. }) if uid == "bad"
    ));
}

#[test]
fn horizontal_drainage_rows_need_a_grade() {
    let src = r#"
[drainage_systems.flat]
name = "Flat"
stack = [{ min_units = 0, max_units = 10, size_mm = 50 }]
horizontal = [{ min_units = 0, max_units = 10, size_mm = 50 }]
vent = [{ min_units = 0, max_units = 10, size_mm = 40 }]
"#;
    match Catalog::from_toml_str(src) {
        Err(CatalogError::Malformed { uid, message }) => {
            assert_eq!(uid, "flat");
            assert!(message.starts_with("horizontal"), "{message}");
        }
        other => panic!("unexpected {other:?}"),
    }
}
