use std::collections::HashMap;
use std::fs;
use std::path::Path;
use sys_locale::get_locale;

/// 문자열 키를 모아두는 네임스페이스.
pub mod keys {
    pub const ERROR_PREFIX: &str = "general.error_prefix";

    pub const REPORT_TITLE: &str = "report.title";
    pub const REPORT_STANDARD: &str = "report.standard";
    pub const REPORT_EDGES: &str = "report.edges";
    pub const REPORT_FIXTURES: &str = "report.fixtures";
    pub const REPORT_VIOLATIONS: &str = "report.violations";
    pub const REPORT_NO_VIOLATIONS: &str = "report.no_violations";
    pub const REPORT_UNRESOLVED: &str = "report.unresolved";

    pub const COL_EDGE: &str = "column.edge";
    pub const COL_FLOW: &str = "column.flow";
    pub const COL_NOMINAL: &str = "column.nominal";
    pub const COL_VELOCITY: &str = "column.velocity";
    pub const COL_LOSS: &str = "column.loss";
    pub const COL_PRESSURE: &str = "column.pressure";
    pub const COL_FIXTURE: &str = "column.fixture";
    pub const COL_RESIDUAL: &str = "column.residual";
    pub const COL_REQUIRED: &str = "column.required";

    pub const SEVERITY_ERROR: &str = "severity.error";
    pub const SEVERITY_WARNING: &str = "severity.warning";

    pub const VIOLATION_NO_SUITABLE_PIPE_SIZE: &str = "violation.no_suitable_pipe_size";
    pub const VIOLATION_OVERRIDDEN_SIZE_INSUFFICIENT: &str =
        "violation.overridden_size_insufficient";
    pub const VIOLATION_CONVERGENCE: &str = "violation.convergence";
    pub const VIOLATION_EXTRAPOLATED: &str = "violation.extrapolated";
    pub const VIOLATION_OUT_OF_RANGE: &str = "violation.out_of_range";
    pub const VIOLATION_UNSUPPORTED_DWELLING_COUNT: &str = "violation.unsupported_dwelling_count";
    pub const VIOLATION_PIPE_PRESSURE_EXCEEDED: &str = "violation.pipe_pressure_exceeded";
    pub const VIOLATION_DEVICE_MAX_FLOW_EXCEEDED: &str = "violation.device_max_flow_exceeded";
    pub const VIOLATION_DEVICE_INLET_PRESSURE_LOW: &str = "violation.device_inlet_pressure_low";
    pub const VIOLATION_DEVICE_INLET_PRESSURE_HIGH: &str = "violation.device_inlet_pressure_high";
    pub const VIOLATION_INSUFFICIENT_PRESSURE: &str = "violation.insufficient_pressure";
    pub const VIOLATION_FIXTURE_PRESSURE_EXCEEDED: &str = "violation.fixture_pressure_exceeded";
    pub const VIOLATION_UPSTREAM_UNRESOLVED: &str = "violation.upstream_unresolved";
    pub const VIOLATION_DEVICE_BELOW_MIN_FLOW: &str = "violation.device_below_min_flow";
    pub const VIOLATION_FLUID_TEMPERATURE_OUT_OF_RANGE: &str =
        "violation.fluid_temperature_out_of_range";
    pub const VIOLATION_DRAINAGE_LOAD_EXCEEDED: &str = "violation.drainage_load_exceeded";
    pub const VIOLATION_DRAINAGE_SIZE_INSUFFICIENT: &str = "violation.drainage_size_insufficient";

    pub const DRAINAGE_TITLE: &str = "drainage.title";
    pub const DRAINAGE_SYSTEM: &str = "drainage.system";
    pub const COL_RUN: &str = "column.run";
    pub const COL_UNITS: &str = "column.units";
    pub const COL_GRADE: &str = "column.grade";
    pub const GAS_RESULT: &str = "gas.result";
    pub const GAS_UNDERSIZED: &str = "gas.undersized";

    pub const LOOKUP_RESULT: &str = "lookup.result";
    pub const FRICTION_RESULT: &str = "friction.result";
    pub const CATALOG_OK: &str = "catalog.ok";
    pub const COMPARE_HEADING: &str = "compare.heading";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Ko,
    En,
}

impl Language {
    fn from_code(code: &str) -> Self {
        let c = code.to_lowercase();
        if c.starts_with("en") {
            Language::En
        } else {
            Language::Ko
        }
    }

    pub fn as_code(&self) -> &'static str {
        match self {
            Language::Ko => "ko",
            Language::En => "en",
        }
    }
}

/// 런타임 언어 번들을 제공한다.
#[derive(Debug, Clone)]
pub struct Translator {
    lang: Language,
    overrides: Option<HashMap<String, String>>,
}

impl Translator {
    /// 언어 코드(ko/en)에 따라 번역기를 생성한다. 알 수 없는 코드는 ko로 폴백한다.
    pub fn new(lang_code: &str) -> Self {
        Self {
            lang: Language::from_code(lang_code),
            overrides: None,
        }
    }

    /// 언어 코드 + 언어팩 디렉터리를 받아서 번역기를 생성한다.
    /// 디렉터리가 없거나 파일이 없으면 내장 문자열만 사용한다.
    pub fn new_with_pack(lang_code: &str, pack_dir: Option<&str>) -> Self {
        let overrides = pack_dir.and_then(|dir| load_overrides(dir, lang_code));
        Self {
            lang: Language::from_code(lang_code),
            overrides,
        }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    pub fn language_code(&self) -> &'static str {
        self.lang.as_code()
    }

    /// 키를 조회해 문자열을 반환한다. 언어팩에 없으면 None.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.overrides
            .as_ref()
            .and_then(|m| m.get(key).map(String::as_str))
    }

    /// 번역을 가져온다. 영어 번역이 없으면 한국어 문자열을 폴백한다.
    pub fn t<'a>(&'a self, key: &str) -> &'a str {
        if let Some(v) = self.lookup(key) {
            return v;
        }
        match self.lang {
            Language::En => en(key).unwrap_or_else(|| ko(key)),
            Language::Ko => ko(key),
        }
    }
}

/// 위반 코드에 대응하는 번역 키.
pub fn violation_key(code: &str) -> String {
    format!("violation.{code}")
}

/// CLI 플래그/설정/시스템 순으로 언어 코드를 결정한다.
pub fn resolve_language(cli_arg: &str, config_lang: Option<&str>) -> String {
    normalize_lang(cli_arg)
        .or_else(|| config_lang.and_then(normalize_lang))
        .or_else(detect_system_language)
        .unwrap_or_else(|| "en".to_string())
}

fn normalize_lang(code: &str) -> Option<String> {
    let c = code.trim().to_lowercase();
    match c.as_str() {
        "auto" | "" => None,
        other if other.starts_with("ko") => Some("ko".into()),
        other if other.starts_with("en") => Some("en".into()),
        _ => None,
    }
}

fn normalize_locale_string(loc: &str) -> Option<String> {
    let lang = loc
        .split(['.', '_', '-'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    match lang.as_str() {
        "ko" => Some("ko".into()),
        "en" => Some("en".into()),
        _ => None,
    }
}

/// 시스템 로케일에서 언어를 추정한다.
pub fn detect_system_language() -> Option<String> {
    if let Some(loc) = get_locale() {
        if let Some(lang) = normalize_locale_string(&loc) {
            return Some(lang);
        }
    }
    ["LC_ALL", "LANG"]
        .iter()
        .filter_map(|var| std::env::var(var).ok())
        .find_map(|value| normalize_locale_string(&value))
}

/// TOML 기반 언어팩을 로드한다. 형식: key = "value" 또는 [section] 아래 key = "value".
fn load_overrides(dir: &str, lang: &str) -> Option<HashMap<String, String>> {
    let try_load = |code: &str| -> Option<HashMap<String, String>> {
        let path = Path::new(dir).join(format!("{code}.toml"));
        let content = fs::read_to_string(path).ok()?;
        parse_toml_to_map(&content)
    };

    if let Some(map) = try_load(lang) {
        return Some(map);
    }
    if let Some((base, _)) = lang.split_once(['-', '_']) {
        if let Some(map) = try_load(base) {
            return Some(map);
        }
    }
    tracing::debug!(dir, lang, "언어팩 없음, 내장 문자열 사용");
    None
}

fn parse_toml_to_map(src: &str) -> Option<HashMap<String, String>> {
    let value: toml::Value = toml::from_str(src).ok()?;
    let table = value.as_table()?;
    let mut map = HashMap::new();

    fn walk(prefix: &str, val: &toml::Value, out: &mut HashMap<String, String>) {
        match val {
            toml::Value::String(s) => {
                out.insert(prefix.to_string(), s.to_string());
            }
            toml::Value::Table(t) => {
                for (k, v) in t {
                    let key = if prefix.is_empty() {
                        k.clone()
                    } else {
                        format!("{prefix}.{k}")
                    };
                    walk(&key, v, out);
                }
            }
            _ => {}
        }
    }

    for (k, v) in table {
        walk(k, v, &mut map);
    }

    if map.is_empty() {
        None
    } else {
        Some(map)
    }
}

fn ko(key: &str) -> &'static str {
    use keys::*;
    match key {
        ERROR_PREFIX => "오류",
        REPORT_TITLE => "배관 사이징 결과",
        REPORT_STANDARD => "동시사용 기준",
        REPORT_EDGES => "구간",
        REPORT_FIXTURES => "기구",
        REPORT_VIOLATIONS => "검토 결과",
        REPORT_NO_VIOLATIONS => "위반 사항 없음",
        REPORT_UNRESOLVED => "미해결",
        COL_EDGE => "구간",
        COL_FLOW => "유량",
        COL_NOMINAL => "호칭경",
        COL_VELOCITY => "유속",
        COL_LOSS => "손실",
        COL_PRESSURE => "하류 압력",
        COL_FIXTURE => "기구",
        COL_RESIDUAL => "잔압",
        COL_REQUIRED => "필요 압력",
        SEVERITY_ERROR => "오류",
        SEVERITY_WARNING => "경고",
        VIOLATION_NO_SUITABLE_PIPE_SIZE => "조건을 만족하는 호칭경이 없어 최대 호칭경을 사용함",
        VIOLATION_OVERRIDDEN_SIZE_INSUFFICIENT => "고정 호칭경이 조건을 만족하지 못함",
        VIOLATION_CONVERGENCE => "마찰계수 반복 수렴 실패, 구간 미해결",
        VIOLATION_EXTRAPOLATED => "표 범위를 넘어 외삽함",
        VIOLATION_OUT_OF_RANGE => "표 범위 밖이라 경계값을 사용함",
        VIOLATION_UNSUPPORTED_DWELLING_COUNT => "지원 범위를 넘는 세대 수, 최대 행을 사용함",
        VIOLATION_PIPE_PRESSURE_EXCEEDED => "배관 허용 사용압력 초과",
        VIOLATION_DEVICE_MAX_FLOW_EXCEEDED => "기기 최대 유량 초과",
        VIOLATION_DEVICE_INLET_PRESSURE_LOW => "기기 입구 압력 부족",
        VIOLATION_DEVICE_INLET_PRESSURE_HIGH => "기기 입구 압력 초과",
        VIOLATION_INSUFFICIENT_PRESSURE => "기구 잔압 부족",
        VIOLATION_FIXTURE_PRESSURE_EXCEEDED => "기구 최대 입구 압력 초과",
        VIOLATION_UPSTREAM_UNRESOLVED => "상류 구간 미해결로 압력을 구하지 못함",
        VIOLATION_DEVICE_BELOW_MIN_FLOW => "기기 최소 유량 미달",
        VIOLATION_FLUID_TEMPERATURE_OUT_OF_RANGE => "물성표 범위 밖 온도, 경계 온도의 물성을 사용함",
        VIOLATION_DRAINAGE_LOAD_EXCEEDED => "배수 부하가 관경표를 넘어 최대 관경을 사용함",
        VIOLATION_DRAINAGE_SIZE_INSUFFICIENT => "고정 배수 관경이 필요 관경보다 작음",
        DRAINAGE_TITLE => "배수 배관 사이징 결과",
        DRAINAGE_SYSTEM => "배수 계통",
        COL_RUN => "용도",
        COL_UNITS => "부하",
        COL_GRADE => "구배",
        GAS_RESULT => "가스 배관 필요 내경",
        GAS_UNDERSIZED => "카탈로그 최대 호칭경도 부족함",
        LOOKUP_RESULT => "설계 유량",
        FRICTION_RESULT => "구간 손실",
        CATALOG_OK => "카탈로그 검증 완료",
        COMPARE_HEADING => "기준별 비교",
        _ => "[missing translation]",
    }
}

fn en(key: &str) -> Option<&'static str> {
    use keys::*;
    Some(match key {
        ERROR_PREFIX => "Error",
        REPORT_TITLE => "Pipe sizing report",
        REPORT_STANDARD => "Demand standard",
        REPORT_EDGES => "Segments",
        REPORT_FIXTURES => "Fixtures",
        REPORT_VIOLATIONS => "Review",
        REPORT_NO_VIOLATIONS => "No violations",
        REPORT_UNRESOLVED => "unresolved",
        COL_EDGE => "Segment",
        COL_FLOW => "Flow",
        COL_NOMINAL => "DN",
        COL_VELOCITY => "Velocity",
        COL_LOSS => "Loss",
        COL_PRESSURE => "Outlet pressure",
        COL_FIXTURE => "Fixture",
        COL_RESIDUAL => "Residual",
        COL_REQUIRED => "Required",
        SEVERITY_ERROR => "error",
        SEVERITY_WARNING => "warning",
        VIOLATION_NO_SUITABLE_PIPE_SIZE => "No size satisfies the constraints; largest size used",
        VIOLATION_OVERRIDDEN_SIZE_INSUFFICIENT => "Fixed size does not satisfy the constraints",
        VIOLATION_CONVERGENCE => "Friction factor did not converge; segment unresolved",
        VIOLATION_EXTRAPOLATED => "Table extrapolated beyond its last key",
        VIOLATION_OUT_OF_RANGE => "Outside table range; boundary value used",
        VIOLATION_UNSUPPORTED_DWELLING_COUNT => "Dwelling count beyond table; last row used",
        VIOLATION_PIPE_PRESSURE_EXCEEDED => "Pipe safe working pressure exceeded",
        VIOLATION_DEVICE_MAX_FLOW_EXCEEDED => "Device maximum flow exceeded",
        VIOLATION_DEVICE_INLET_PRESSURE_LOW => "Device inlet pressure too low",
        VIOLATION_DEVICE_INLET_PRESSURE_HIGH => "Device inlet pressure too high",
        VIOLATION_INSUFFICIENT_PRESSURE => "Insufficient residual pressure at fixture",
        VIOLATION_FIXTURE_PRESSURE_EXCEEDED => "Fixture maximum inlet pressure exceeded",
        VIOLATION_UPSTREAM_UNRESOLVED => "Upstream segment unresolved; no pressure",
        VIOLATION_DEVICE_BELOW_MIN_FLOW => "Flow below device minimum",
        VIOLATION_FLUID_TEMPERATURE_OUT_OF_RANGE => {
            "Temperature outside property table; boundary properties used"
        }
        VIOLATION_DRAINAGE_LOAD_EXCEEDED => "Drainage load beyond table; largest size used",
        VIOLATION_DRAINAGE_SIZE_INSUFFICIENT => "Fixed drainage size smaller than required",
        DRAINAGE_TITLE => "Drainage sizing report",
        DRAINAGE_SYSTEM => "Drainage system",
        COL_RUN => "Run",
        COL_UNITS => "Units",
        COL_GRADE => "Grade",
        GAS_RESULT => "Required gas pipe bore",
        GAS_UNDERSIZED => "largest catalog size is still too small",
        LOOKUP_RESULT => "Design flow",
        FRICTION_RESULT => "Segment loss",
        CATALOG_OK => "Catalog is valid",
        COMPARE_HEADING => "Comparison by standard",
        _ => return None,
    })
}
