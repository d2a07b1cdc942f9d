use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::sizing::SizingSettings;
use crate::units::{FlowUnit, LengthUnit, PressureUnit, VelocityUnit};

/// 기본 설정 파일 이름.
pub const CONFIG_FILE: &str = "config.toml";

/// 보고서에 표시할 단위.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportUnits {
    pub pressure: PressureUnit,
    pub flow: FlowUnit,
    pub velocity: VelocityUnit,
    /// 관경 표기 단위
    pub diameter: LengthUnit,
}

impl Default for ReportUnits {
    fn default() -> Self {
        Self {
            pressure: PressureUnit::KiloPascal,
            flow: FlowUnit::LitrePerSecond,
            velocity: VelocityUnit::MeterPerSecond,
            diameter: LengthUnit::Millimeter,
        }
    }
}

/// 애플리케이션 설정을 표현한다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 보고서 언어(ko/en). 없으면 시스템 로케일을 따른다.
    pub language: Option<String>,
    /// TOML 언어팩 디렉터리
    pub language_pack_dir: Option<String>,
    pub units: ReportUnits,
    pub engine: SizingSettings,
}

/// 설정 로드/저장 시 발생 가능한 오류를 표현한다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("파일 입출력 오류: {0}")]
    Io(#[from] std::io::Error),
    #[error("설정 파싱 오류: {0}")]
    Serde(#[from] toml::de::Error),
    #[error("설정 직렬화 오류: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// 지정한 경로의 설정을 로드한다. 파일이 없으면 기본값으로 새로 만든다.
pub fn load_or_default_at(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        let content = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&content)?;
        tracing::debug!(path = %path.display(), "설정 로드");
        Ok(cfg)
    } else {
        let cfg = Config::default();
        cfg.save_to(path)?;
        tracing::info!(path = %path.display(), "기본 설정 파일 생성");
        Ok(cfg)
    }
}

impl Config {
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let cfg: Config = toml::from_str(
            r#"
language = "en"

[units]
pressure = "bar"

[engine]
default_spare_capacity_pct = 10.0

[engine.solver]
max_iterations = 20
"#,
        )
        .expect("config should parse");
        assert_eq!(cfg.language.as_deref(), Some("en"));
        assert_eq!(cfg.units.pressure, PressureUnit::Bar);
        assert_eq!(cfg.units.flow, FlowUnit::LitrePerSecond);
        assert_eq!(cfg.engine.default_spare_capacity_pct, 10.0);
        assert_eq!(cfg.engine.solver.max_iterations, 20);
        assert_eq!(cfg.engine.solver.tolerance, 1e-6);
    }

    #[test]
    fn default_round_trips_through_toml() {
        let cfg = Config::default();
        let text = toml::to_string_pretty(&cfg).expect("serialize");
        let back: Config = toml::from_str(&text).expect("parse");
        assert_eq!(back, cfg);
    }
}
