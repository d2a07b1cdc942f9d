//! 사이징 결과를 사람이 읽는 표 또는 JSON/TOML로 출력한다.

use std::fmt::Write as _;

use serde::Serialize;

use crate::config::ReportUnits;
use crate::drainage::DrainageReport;
use crate::i18n::{self, keys, Translator};
use crate::sizing::{Severity, SizingReport, Violation, ViolationKind};
use crate::units::{
    convert_flow, convert_length, convert_pressure, convert_velocity, FlowUnit, LengthUnit,
    PressureUnit, VelocityUnit,
};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("JSON 직렬화 오류: {0}")]
    Json(#[from] serde_json::Error),
    #[error("TOML 직렬화 오류: {0}")]
    Toml(#[from] toml::ser::Error),
}

/// 출력 형식.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Toml,
}

pub fn render(
    report: &SizingReport,
    format: OutputFormat,
    tr: &Translator,
    units: &ReportUnits,
) -> Result<String, ReportError> {
    match format {
        OutputFormat::Text => Ok(render_text(report, tr, units)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Toml => render_toml(report),
    }
}

pub fn render_json<T: Serialize>(report: &T) -> Result<String, ReportError> {
    Ok(serde_json::to_string_pretty(report)?)
}

pub fn render_toml<T: Serialize>(report: &T) -> Result<String, ReportError> {
    Ok(toml::to_string_pretty(report)?)
}

pub fn render_drainage(
    report: &DrainageReport,
    format: OutputFormat,
    tr: &Translator,
    units: &ReportUnits,
) -> Result<String, ReportError> {
    match format {
        OutputFormat::Text => Ok(render_drainage_text(report, tr, units)),
        OutputFormat::Json => render_json(report),
        OutputFormat::Toml => render_toml(report),
    }
}

struct Fmt<'a>(&'a ReportUnits);

impl Fmt<'_> {
    fn pressure(&self, kpa: f64) -> String {
        let unit = self.0.pressure;
        format!(
            "{:.1} {}",
            convert_pressure(kpa, PressureUnit::KiloPascal, unit),
            unit.symbol()
        )
    }

    fn flow(&self, ls: f64) -> String {
        let unit = self.0.flow;
        format!(
            "{:.3} {}",
            convert_flow(ls, FlowUnit::LitrePerSecond, unit),
            unit.symbol()
        )
    }

    fn velocity(&self, m_s: f64) -> String {
        let unit = self.0.velocity;
        format!(
            "{:.2} {}",
            convert_velocity(m_s, VelocityUnit::MeterPerSecond, unit),
            unit.symbol()
        )
    }

    fn diameter(&self, mm: f64) -> String {
        let unit = self.0.diameter;
        format!(
            "{:.1} {}",
            convert_length(mm, LengthUnit::Millimeter, unit),
            unit.symbol()
        )
    }
}

/// 표 형태의 텍스트 보고서.
pub fn render_text(report: &SizingReport, tr: &Translator, units: &ReportUnits) -> String {
    let f = Fmt(units);
    let mut out = String::new();
    let _ = writeln!(out, "=== {}: {} ===", tr.t(keys::REPORT_TITLE), report.project);
    let _ = writeln!(out, "{}: {}", tr.t(keys::REPORT_STANDARD), report.psd_standard);

    let _ = writeln!(out, "\n-- {} --", tr.t(keys::REPORT_EDGES));
    let _ = writeln!(
        out,
        "{:<12} {:>14} {:>10} {:>10} {:>12} {:>14}",
        tr.t(keys::COL_EDGE),
        tr.t(keys::COL_FLOW),
        tr.t(keys::COL_NOMINAL),
        tr.t(keys::COL_VELOCITY),
        tr.t(keys::COL_LOSS),
        tr.t(keys::COL_PRESSURE),
    );
    for edge in &report.edges {
        let nominal = edge
            .nominal_mm
            .map(|mm| f.diameter(mm))
            .unwrap_or_else(|| "-".into());
        let pressure = edge
            .downstream_pressure_kpa
            .map(|p| f.pressure(p))
            .unwrap_or_else(|| tr.t(keys::REPORT_UNRESOLVED).to_string());
        let _ = writeln!(
            out,
            "{:<12} {:>14} {:>10} {:>10} {:>12} {:>14}",
            edge.uid,
            f.flow(edge.design_flow_ls),
            nominal,
            f.velocity(edge.velocity_m_s),
            f.pressure(edge.total_loss_kpa),
            pressure,
        );
    }

    if !report.fixtures.is_empty() {
        let _ = writeln!(out, "\n-- {} --", tr.t(keys::REPORT_FIXTURES));
        let _ = writeln!(
            out,
            "{:<12} {:<16} {:>14} {:>14}",
            tr.t(keys::COL_FIXTURE),
            "",
            tr.t(keys::COL_RESIDUAL),
            tr.t(keys::COL_REQUIRED),
        );
        for fixture in &report.fixtures {
            let residual = fixture
                .residual_pressure_kpa
                .map(|p| f.pressure(p))
                .unwrap_or_else(|| tr.t(keys::REPORT_UNRESOLVED).to_string());
            let _ = writeln!(
                out,
                "{:<12} {:<16} {:>14} {:>14}",
                fixture.uid,
                fixture.fixture,
                residual,
                f.pressure(fixture.min_inlet_pressure_kpa),
            );
        }
    }

    let _ = writeln!(out, "\n-- {} --", tr.t(keys::REPORT_VIOLATIONS));
    if report.violations.is_empty() {
        let _ = writeln!(out, "{}", tr.t(keys::REPORT_NO_VIOLATIONS));
    }
    for violation in &report.violations {
        let _ = writeln!(out, "{}", describe(violation, tr, &f));
    }
    out
}

/// 배수 구간 표. 부하는 계통이 합산하는 단위 그대로 적는다.
pub fn render_drainage_text(
    report: &DrainageReport,
    tr: &Translator,
    units: &ReportUnits,
) -> String {
    let f = Fmt(units);
    let mut out = String::new();
    let _ = writeln!(out, "=== {}: {} ===", tr.t(keys::DRAINAGE_TITLE), report.project);
    let _ = writeln!(
        out,
        "{}: {} ({})",
        tr.t(keys::DRAINAGE_SYSTEM),
        report.drainage_system,
        report.units.label()
    );

    let _ = writeln!(out, "\n-- {} --", tr.t(keys::REPORT_EDGES));
    let _ = writeln!(
        out,
        "{:<12} {:<10} {:>8} {:>10} {:>8}",
        tr.t(keys::COL_EDGE),
        tr.t(keys::COL_RUN),
        tr.t(keys::COL_UNITS),
        tr.t(keys::COL_NOMINAL),
        tr.t(keys::COL_GRADE),
    );
    for edge in &report.edges {
        let grade = edge
            .grade_pct
            .map(|g| format!("{g:.2} %"))
            .unwrap_or_else(|| "-".into());
        let _ = writeln!(
            out,
            "{:<12} {:<10} {:>8.1} {:>10} {:>8}",
            edge.uid,
            edge.run.as_str(),
            edge.sizing_units,
            f.diameter(edge.nominal_mm),
            grade,
        );
    }

    let _ = writeln!(out, "\n-- {} --", tr.t(keys::REPORT_VIOLATIONS));
    if report.violations.is_empty() {
        let _ = writeln!(out, "{}", tr.t(keys::REPORT_NO_VIOLATIONS));
    }
    for violation in &report.violations {
        let _ = writeln!(out, "{}", describe(violation, tr, &f));
    }
    out
}

fn describe(violation: &Violation, tr: &Translator, f: &Fmt<'_>) -> String {
    let severity = match violation.severity {
        Severity::Error => tr.t(keys::SEVERITY_ERROR),
        Severity::Warning => tr.t(keys::SEVERITY_WARNING),
    };
    let message = tr.t(&i18n::violation_key(violation.kind.code()));
    let detail = match &violation.kind {
        ViolationKind::NoSuitablePipeSize {
            design_flow_ls,
            velocity_m_s,
            max_velocity_m_s,
        } => format!(
            "{}, {} > {}",
            f.flow(*design_flow_ls),
            f.velocity(*velocity_m_s),
            f.velocity(*max_velocity_m_s)
        ),
        ViolationKind::OverriddenSizeInsufficient {
            nominal_mm,
            velocity_m_s,
            max_velocity_m_s,
        } => format!(
            "DN {}, {} / {}",
            f.diameter(*nominal_mm),
            f.velocity(*velocity_m_s),
            f.velocity(*max_velocity_m_s)
        ),
        ViolationKind::Convergence { iterations } => format!("{iterations}"),
        ViolationKind::Extrapolated { standard, key } => format!("{standard} @ {key}"),
        ViolationKind::OutOfRange {
            standard,
            key,
            nearest,
        } => format!("{standard} @ {key} → {nearest}"),
        ViolationKind::UnsupportedDwellingCount {
            standard,
            count,
            max,
        } => format!("{standard}: {count} > {max}"),
        ViolationKind::PipePressureExceeded {
            pressure_kpa,
            safe_working_pressure_kpa,
        } => format!(
            "{} > {}",
            f.pressure(*pressure_kpa),
            f.pressure(*safe_working_pressure_kpa)
        ),
        ViolationKind::DeviceMaxFlowExceeded {
            device,
            flow_ls,
            max_flow_ls,
        } => format!("{device}: {} > {}", f.flow(*flow_ls), f.flow(*max_flow_ls)),
        ViolationKind::DeviceInletPressureLow {
            device,
            pressure_kpa,
            min_kpa,
        } => format!(
            "{device}: {} < {}",
            f.pressure(*pressure_kpa),
            f.pressure(*min_kpa)
        ),
        ViolationKind::DeviceInletPressureHigh {
            device,
            pressure_kpa,
            max_kpa,
        } => format!(
            "{device}: {} > {}",
            f.pressure(*pressure_kpa),
            f.pressure(*max_kpa)
        ),
        ViolationKind::InsufficientPressure {
            residual_kpa,
            min_kpa,
        } => format!("{} < {}", f.pressure(*residual_kpa), f.pressure(*min_kpa)),
        ViolationKind::FixturePressureExceeded {
            residual_kpa,
            max_kpa,
        } => format!("{} > {}", f.pressure(*residual_kpa), f.pressure(*max_kpa)),
        ViolationKind::UpstreamUnresolved => String::new(),
        ViolationKind::DeviceBelowMinFlow {
            device,
            flow_ls,
            min_flow_ls,
        } => format!("{device}: {} < {}", f.flow(*flow_ls), f.flow(*min_flow_ls)),
        ViolationKind::FluidTemperatureOutOfRange {
            fluid,
            temperature_c,
            used_temperature_c,
        } => format!("{fluid}: {temperature_c} °C → {used_temperature_c} °C"),
        ViolationKind::DrainageLoadExceeded { units, max_units } => {
            format!("{units} > {max_units}")
        }
        ViolationKind::DrainageSizeInsufficient {
            nominal_mm,
            required_mm,
        } => format!("{} < {}", f.diameter(*nominal_mm), f.diameter(*required_mm)),
    };
    if detail.is_empty() {
        format!("[{severity}] {}: {message}", violation.entity_uid)
    } else {
        format!("[{severity}] {}: {message} ({detail})", violation.entity_uid)
    }
}
