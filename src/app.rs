use std::fmt::Write as _;
use std::sync::Arc;

use crate::catalog::{Catalog, CatalogError};
use crate::config::{Config, ConfigError, ReportUnits};
use crate::demand::{self, DemandError};
use crate::drainage::{self, DrainageError};
use crate::gas::{self, GasError, GasPipeSizingInput};
use crate::hydraulics::{self, FrictionError, SegmentLossInput};
use crate::i18n::{keys, Translator};
use crate::network::{DrainageProject, ProjectSnapshot, SnapshotError};
use crate::report::{self, OutputFormat, ReportError};
use crate::sizing::{SizingEngine, SizingError, ViolationKind};
use crate::ui_cli::{
    CatalogArgs, Command, DrainageArgs, FrictionArgs, GasArgs, LookupArgs, SizeArgs,
};

/// 애플리케이션 실행 중 발생 가능한 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("입출력 오류: {0}")]
    Io(#[from] std::io::Error),
    #[error("설정 오류: {0}")]
    Config(#[from] ConfigError),
    #[error("카탈로그 오류: {0}")]
    Catalog(#[from] CatalogError),
    #[error("프로젝트 오류: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("사이징 오류: {0}")]
    Sizing(#[from] SizingError),
    #[error("유량 산정 오류: {0}")]
    Demand(#[from] DemandError),
    #[error("손실 계산 오류: {0}")]
    Friction(#[from] FrictionError),
    #[error("배수 사이징 오류: {0}")]
    Drainage(#[from] DrainageError),
    #[error("가스 배관 계산 오류: {0}")]
    Gas(#[from] GasError),
    #[error("보고서 오류: {0}")]
    Report(#[from] ReportError),
    #[error("입력 오류: {0}")]
    Input(String),
}

/// 하위 명령을 실행하고 출력할 문자열을 돌려준다.
pub fn run(command: Command, config: &Config, tr: &Translator) -> Result<String, AppError> {
    match command {
        Command::Size(args) => run_size(args, config, tr),
        Command::LookupPsd(args) => run_lookup(args, tr),
        Command::Friction(args) => run_friction(args, config, tr),
        Command::SizeDrainage(args) => run_drainage(args, config, tr),
        Command::Gas(args) => run_gas(args, tr),
        Command::ValidateCatalog(args) => run_validate(args, tr),
    }
}

fn run_size(args: SizeArgs, config: &Config, tr: &Translator) -> Result<String, AppError> {
    let catalog = Arc::new(Catalog::load(&args.catalog)?);
    let snapshot = ProjectSnapshot::load(&args.project)?;
    let mut settings = config.engine;
    if let Some(spare) = args.spare_capacity {
        settings.default_spare_capacity_pct = spare;
    }
    let engine = SizingEngine::new(catalog, settings);

    if args.compare.is_empty() {
        let report = engine.size(&snapshot)?;
        return Ok(report::render(&report, args.format, tr, &config.units)?);
    }

    compare_standards(
        &engine,
        &snapshot,
        &args.compare,
        args.format,
        tr,
        &config.units,
    )
}

// 기준 하나가 실패해도 나머지 기준의 결과는 출력한다
fn compare_standards(
    engine: &SizingEngine,
    snapshot: &ProjectSnapshot,
    standards: &[String],
    format: OutputFormat,
    tr: &Translator,
    units: &ReportUnits,
) -> Result<String, AppError> {
    let mut out = String::new();
    let _ = writeln!(out, "=== {} ===", tr.t(keys::COMPARE_HEADING));
    for (standard, result) in engine.size_with_standards(snapshot, standards) {
        let report = match result {
            Ok(report) => report,
            Err(err) => {
                tracing::warn!(standard = %standard, error = %err, "비교 기준 계산 실패");
                let _ = writeln!(out, "{standard:<28} {}: {err}", tr.t(keys::ERROR_PREFIX));
                continue;
            }
        };
        let root_flow = report
            .edges
            .iter()
            .map(|e| e.design_flow_ls)
            .fold(0.0_f64, f64::max);
        let _ = writeln!(
            out,
            "{standard:<28} {:.3} L/s, {} {}",
            root_flow,
            report.violations.len(),
            tr.t(keys::REPORT_VIOLATIONS)
        );
        let _ = writeln!(out, "{}", report::render(&report, format, tr, units)?);
    }
    Ok(out)
}

fn run_drainage(args: DrainageArgs, config: &Config, tr: &Translator) -> Result<String, AppError> {
    let catalog = Catalog::load(&args.catalog)?;
    let project = DrainageProject::load(&args.project)?;
    let report = drainage::size_drainage(&catalog, &project)?;
    Ok(report::render_drainage(
        &report,
        args.format,
        tr,
        &config.units,
    )?)
}

fn run_gas(args: GasArgs, tr: &Translator) -> Result<String, AppError> {
    let input = GasPipeSizingInput {
        gas: args.gas,
        input_rate_mj_per_h: args.rate,
        length_m: args.length,
        inlet_pressure_kpa: args.inlet,
        outlet_pressure_kpa: args.outlet,
    };
    let result = gas::required_diameter(&input)?;
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{}: {:.2} mm ({:.1} ft³/h{})",
        tr.t(keys::GAS_RESULT),
        result.required_diameter_mm,
        result.flow_cfh,
        if result.high_pressure { ", high pressure" } else { "" }
    );
    if let (Some(path), Some(material)) = (args.catalog, args.material) {
        let catalog = Catalog::load(&path)?;
        let pipe = catalog.pipe(&material)?;
        let sizes = pipe.sizes(&args.manufacturer).unwrap_or_default();
        match gas::select_gas_pipe(sizes, result.required_diameter_mm) {
            Some((size, false)) => {
                let _ = writeln!(
                    out,
                    "  {material} DN {} (ID {:.2} mm)",
                    size.nominal_mm, size.internal_diameter_mm
                );
            }
            Some((size, true)) => {
                let _ = writeln!(
                    out,
                    "[{}] {material} DN {}: {}",
                    tr.t(keys::SEVERITY_ERROR),
                    size.nominal_mm,
                    tr.t(keys::GAS_UNDERSIZED)
                );
            }
            None => {
                return Err(AppError::Input(format!(
                    "배관 '{material}'에 제조사 '{}' 호칭경이 없습니다",
                    args.manufacturer
                )))
            }
        }
    }
    Ok(out)
}

fn run_lookup(args: LookupArgs, tr: &Translator) -> Result<String, AppError> {
    let catalog = Catalog::load(&args.catalog)?;
    let standard = catalog.psd_standard(&args.standard)?;
    let mut estimate = demand::estimate(standard, args.role, args.units, args.max_single)?;
    if let (Some(count), Some(uid)) = (args.dwellings, args.dwelling_standard.as_deref()) {
        let dwelling = catalog.dwelling_standard(uid)?;
        let extra = demand::estimate(dwelling, args.role, f64::from(count), 0.0)?;
        estimate.flow_ls += extra.flow_ls;
        estimate.warnings.extend(extra.warnings);
    } else if args.dwellings.is_some() {
        return Err(AppError::Input(
            "--dwellings에는 --dwelling-standard가 필요합니다".into(),
        ));
    }

    let mut out = format!(
        "{} ({}, {}): {:.4} L/s\n",
        tr.t(keys::LOOKUP_RESULT),
        standard.uid,
        args.role.as_str(),
        estimate.flow_ls
    );
    for warning in estimate.warnings {
        let kind = ViolationKind::from(warning);
        let _ = writeln!(
            out,
            "[{}] {}",
            tr.t(keys::SEVERITY_WARNING),
            tr.t(&crate::i18n::violation_key(kind.code()))
        );
    }
    Ok(out)
}

fn run_friction(args: FrictionArgs, config: &Config, tr: &Translator) -> Result<String, AppError> {
    let density = hydraulics::iapws_water_density(args.temp, args.pressure).ok_or_else(|| {
        AppError::Input(format!(
            "물 밀도를 구할 수 없습니다 ({} °C, {} kPa)",
            args.temp, args.pressure
        ))
    })?;
    let input = SegmentLossInput {
        flow_ls: args.flow,
        internal_diameter_mm: args.diameter,
        length_m: args.length,
        roughness_mm: args.roughness,
        density_kg_m3: density,
        dynamic_viscosity_pa_s: hydraulics::liquid_water_viscosity(args.temp),
        k_total: args.k,
    };
    let loss = hydraulics::segment_loss(input, &config.engine.solver)?;
    let mut out = String::new();
    let _ = writeln!(out, "{}:", tr.t(keys::FRICTION_RESULT));
    let _ = writeln!(out, "  v = {:.3} m/s, Re = {:.0}", loss.velocity_m_s, loss.reynolds);
    let _ = writeln!(
        out,
        "  f = {:.5} ({} iter)",
        loss.friction_factor, loss.iterations
    );
    let _ = writeln!(
        out,
        "  hf = {:.3} kPa, hk = {:.3} kPa, total = {:.3} kPa",
        loss.friction_loss_kpa, loss.fitting_loss_kpa, loss.total_loss_kpa
    );
    Ok(out)
}

fn run_validate(args: CatalogArgs, tr: &Translator) -> Result<String, AppError> {
    let catalog = Catalog::load(&args.catalog)?;
    Ok(format!(
        "{}: fixtures {}, pipes {}, valves {}, devices {}, standards {}, dwelling standards {}, fluids {}, drainage systems {}\n",
        tr.t(keys::CATALOG_OK),
        catalog.fixtures.len(),
        catalog.pipes.len(),
        catalog.valves.len(),
        catalog.devices.len(),
        catalog.psd_standards.len(),
        catalog.dwelling_standards.len(),
        catalog.fluids.len(),
        catalog.drainage_systems.len(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sizing::SizingSettings;

    const CATALOG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/catalog.toml");
    const PROJECT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/data/project.toml");

    #[test]
    fn comparison_keeps_going_after_a_failing_standard() {
        let catalog = Arc::new(Catalog::load(CATALOG).expect("catalog"));
        let snapshot = ProjectSnapshot::load(PROJECT).expect("project");
        let engine = SizingEngine::new(catalog, SizingSettings::default());
        let standards = vec![
            "noSuchStandard".to_string(),
            "as35002018LoadingUnits".to_string(),
        ];
        let tr = Translator::new("en");
        let out = compare_standards(
            &engine,
            &snapshot,
            &standards,
            OutputFormat::Json,
            &tr,
            &ReportUnits::default(),
        )
        .expect("comparison output");

        let failed = out
            .lines()
            .find(|l| l.starts_with("noSuchStandard"))
            .expect("failing standard listed");
        assert!(failed.contains("Error:"), "{failed}");
        assert!(out
            .lines()
            .any(|l| l.starts_with("as35002018LoadingUnits") && l.contains("L/s")));
    }
}
