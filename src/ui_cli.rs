//! 명령행 인터페이스 정의.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::catalog::FluidRole;
use crate::gas::GasType;
use crate::report::OutputFormat;

#[derive(Debug, Parser)]
#[command(name = "hydraulic_sizing_toolbox", version)]
#[command(about = "급수/급탕/배수 배관망 유량 산정 및 관경 선정")]
pub struct Cli {
    /// 설정 파일 경로
    #[arg(long, global = true, default_value = crate::config::CONFIG_FILE)]
    pub config: PathBuf,

    /// 출력 언어(ko, en, auto)
    #[arg(long, global = true, default_value = "auto")]
    pub lang: String,

    /// debug 수준 로그 출력
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// 프로젝트 배관망을 사이징하고 보고서를 출력한다
    Size(SizeArgs),
    /// 누적 부하로 설계 유량을 구한다
    LookupPsd(LookupArgs),
    /// 단일 구간의 마찰/국부 손실을 계산한다
    Friction(FrictionArgs),
    /// 배수 배관망의 관경과 구배를 고른다
    SizeDrainage(DrainageArgs),
    /// 가스 배관 필요 내경을 계산한다
    Gas(GasArgs),
    /// 카탈로그를 읽고 불변 조건을 검사한다
    ValidateCatalog(CatalogArgs),
}

#[derive(Debug, Args)]
pub struct CatalogArgs {
    #[arg(long)]
    pub catalog: PathBuf,
}

#[derive(Debug, Args)]
pub struct SizeArgs {
    #[arg(long)]
    pub catalog: PathBuf,
    #[arg(long)]
    pub project: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    /// 여러 동시사용 기준으로 비교 계산(쉼표 구분)
    #[arg(long, value_delimiter = ',')]
    pub compare: Vec<String>,
    /// 기본 여유율 덮어쓰기 [%]
    #[arg(long)]
    pub spare_capacity: Option<f64>,
}

#[derive(Debug, Args)]
pub struct DrainageArgs {
    #[arg(long)]
    pub catalog: PathBuf,
    #[arg(long)]
    pub project: PathBuf,
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct GasArgs {
    #[arg(long, value_enum, default_value_t = GasType::NaturalGas)]
    pub gas: GasType,
    /// 기구 열량 입력 합계 [MJ/h]
    #[arg(long)]
    pub rate: f64,
    /// 배관 길이 [m]
    #[arg(long)]
    pub length: f64,
    /// 입구 압력 [kPa]
    #[arg(long)]
    pub inlet: f64,
    /// 허용 최저 출구 압력 [kPa]
    #[arg(long)]
    pub outlet: f64,
    /// 지정하면 --material의 호칭경 중에서 고른다
    #[arg(long, requires = "material")]
    pub catalog: Option<PathBuf>,
    #[arg(long, requires = "catalog")]
    pub material: Option<String>,
    #[arg(long, default_value = "generic")]
    pub manufacturer: String,
}

#[derive(Debug, Args)]
pub struct LookupArgs {
    #[arg(long)]
    pub catalog: PathBuf,
    #[arg(long)]
    pub standard: String,
    /// 누적 부하 단위(또는 DIN 기준이면 합산 설계 유량 L/s)
    #[arg(long)]
    pub units: f64,
    /// 최대 단일 기구 부하
    #[arg(long, default_value_t = 0.0)]
    pub max_single: f64,
    #[arg(long, value_parser = parse_role, default_value = "cold-water")]
    pub role: FluidRole,
    /// 세대 수. --dwelling-standard와 함께 쓴다.
    #[arg(long)]
    pub dwellings: Option<u32>,
    #[arg(long)]
    pub dwelling_standard: Option<String>,
}

#[derive(Debug, Args)]
pub struct FrictionArgs {
    /// 유량 [L/s]
    #[arg(long)]
    pub flow: f64,
    /// 내경 [mm]
    #[arg(long)]
    pub diameter: f64,
    /// 길이 [m]
    #[arg(long)]
    pub length: f64,
    /// 절대 조도 [mm]
    #[arg(long, default_value_t = 0.0015)]
    pub roughness: f64,
    /// 국부 손실계수 합
    #[arg(long, default_value_t = 0.0)]
    pub k: f64,
    /// 물 온도 [°C]
    #[arg(long, default_value_t = 20.0)]
    pub temp: f64,
    /// 게이지 압력 [kPa] (밀도 계산용)
    #[arg(long, default_value_t = 0.0)]
    pub pressure: f64,
}

fn parse_role(s: &str) -> Result<FluidRole, String> {
    match s.trim().to_lowercase().as_str() {
        "cold" | "cold-water" => Ok(FluidRole::ColdWater),
        "hot" | "hot-water" => Ok(FluidRole::HotWater),
        "warm" | "warm-water" => Ok(FluidRole::WarmWater),
        other => Err(format!("알 수 없는 계통: {other} (cold-water, hot-water, warm-water)")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_command_parses_compare_list() {
        let cli = Cli::try_parse_from([
            "hydraulic_sizing_toolbox",
            "size",
            "--catalog",
            "data/catalog.toml",
            "--project",
            "data/project.toml",
            "--format",
            "json",
            "--compare",
            "as35002018LoadingUnits,bs806",
        ])
        .expect("cli should parse");
        match cli.command {
            Command::Size(args) => {
                assert_eq!(args.format, OutputFormat::Json);
                assert_eq!(args.compare.len(), 2);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn gas_command_requires_material_with_catalog() {
        let base = [
            "hydraulic_sizing_toolbox",
            "gas",
            "--gas",
            "lpg",
            "--rate",
            "100",
            "--length",
            "10",
            "--inlet",
            "2.75",
            "--outlet",
            "2.5",
        ];
        let cli = Cli::try_parse_from(base).expect("cli should parse");
        match cli.command {
            Command::Gas(args) => {
                assert_eq!(args.gas, GasType::Lpg);
                assert!(args.catalog.is_none());
                assert_eq!(args.manufacturer, "generic");
            }
            other => panic!("unexpected command {other:?}"),
        }
        let missing = base.iter().copied().chain(["--catalog", "data/catalog.toml"]);
        assert!(Cli::try_parse_from(missing).is_err());
    }

    #[test]
    fn role_aliases() {
        assert_eq!(parse_role("hot"), Ok(FluidRole::HotWater));
        assert!(parse_role("steam").is_err());
    }
}
