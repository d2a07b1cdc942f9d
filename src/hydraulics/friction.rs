use serde::{Deserialize, Serialize};

/// 표준 중력가속도 [m/s²]
pub const GRAVITY: f64 = 9.80665;
/// 이 레이놀즈수 미만은 층류(f = 64/Re)로 본다.
pub const LAMINAR_REYNOLDS: f64 = 2300.0;

/// 마찰계수 반복 해법 설정.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    /// 상대 변화 수렴 기준
    pub tolerance: f64,
    pub max_iterations: u32,
    pub gravity_m_s2: f64,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            tolerance: 1e-6,
            max_iterations: 50,
            gravity_m_s2: GRAVITY,
        }
    }
}

/// 구간 손실 계산 오류.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FrictionError {
    #[error("마찰 손실 입력 오류: {0}")]
    InvalidInput(String),
    #[error("Colebrook-White 반복이 {iterations}회 안에 수렴하지 않았습니다 (마지막 상대 변화 {last_change:e})")]
    Convergence { iterations: u32, last_change: f64 },
}

/// 배관 한 구간의 손실 계산 입력.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SegmentLossInput {
    /// 유량 [L/s]
    pub flow_ls: f64,
    /// 내경 [mm]
    pub internal_diameter_mm: f64,
    /// 길이 [m]
    pub length_m: f64,
    /// 절대 조도 [mm]
    pub roughness_mm: f64,
    pub density_kg_m3: f64,
    /// 점성계수 [Pa·s]
    pub dynamic_viscosity_pa_s: f64,
    /// 이음쇠/밸브 손실계수 합계
    pub k_total: f64,
}

/// 구간 손실 결과.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct SegmentLoss {
    pub velocity_m_s: f64,
    pub reynolds: f64,
    pub friction_factor: f64,
    /// 0이면 층류식 또는 무유량으로 반복하지 않음
    pub iterations: u32,
    pub friction_head_m: f64,
    pub fitting_head_m: f64,
    pub friction_loss_kpa: f64,
    pub fitting_loss_kpa: f64,
    pub total_loss_kpa: f64,
}

/// Darcy 마찰계수와 반복 횟수.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrictionFactor {
    pub value: f64,
    pub iterations: u32,
}

/// 평균 유속 [m/s].
pub fn velocity_m_s(flow_ls: f64, internal_diameter_mm: f64) -> f64 {
    let d = internal_diameter_mm / 1000.0;
    let area = std::f64::consts::PI * d * d / 4.0;
    (flow_ls / 1000.0) / area
}

pub fn reynolds_number(
    density_kg_m3: f64,
    velocity_m_s: f64,
    diameter_m: f64,
    viscosity_pa_s: f64,
) -> f64 {
    density_kg_m3 * velocity_m_s * diameter_m / viscosity_pa_s
}

/// Swamee-Jain 명시식. Colebrook-White 반복의 초기값으로 쓴다.
pub fn swamee_jain(relative_roughness: f64, reynolds: f64) -> f64 {
    let term = relative_roughness / 3.7 + 5.74 / reynolds.powf(0.9);
    0.25 / term.log10().powi(2)
}

/// Colebrook-White 식을 고정점 반복으로 푼다.
/// 1/√f = -2 log10(ε/3.7D + 2.51/(Re√f))
pub fn colebrook_white(
    relative_roughness: f64,
    reynolds: f64,
    settings: &SolverSettings,
) -> Result<FrictionFactor, FrictionError> {
    let mut f = swamee_jain(relative_roughness, reynolds);
    let mut last_change = f64::INFINITY;
    for iteration in 1..=settings.max_iterations {
        let x = -2.0 * (relative_roughness / 3.7 + 2.51 / (reynolds * f.sqrt())).log10();
        let next = 1.0 / (x * x);
        if !next.is_finite() || next <= 0.0 {
            return Err(FrictionError::Convergence {
                iterations: iteration,
                last_change,
            });
        }
        last_change = ((next - f) / f).abs();
        f = next;
        if last_change < settings.tolerance {
            return Ok(FrictionFactor {
                value: f,
                iterations: iteration,
            });
        }
    }
    Err(FrictionError::Convergence {
        iterations: settings.max_iterations,
        last_change,
    })
}

/// 층류면 64/Re, 그 외에는 Colebrook-White.
pub fn darcy_friction_factor(
    relative_roughness: f64,
    reynolds: f64,
    settings: &SolverSettings,
) -> Result<FrictionFactor, FrictionError> {
    if reynolds < LAMINAR_REYNOLDS {
        return Ok(FrictionFactor {
            value: 64.0 / reynolds.max(1e-9),
            iterations: 0,
        });
    }
    colebrook_white(relative_roughness, reynolds, settings)
}

/// 수두 [m] → 압력 [kPa]
pub fn head_to_kpa(head_m: f64, density_kg_m3: f64, gravity_m_s2: f64) -> f64 {
    density_kg_m3 * gravity_m_s2 * head_m / 1000.0
}

/// Darcy-Weisbach 마찰 손실과 이음쇠 손실을 합산한다. 유량 0이면 손실도 0이다.
pub fn segment_loss(
    input: SegmentLossInput,
    settings: &SolverSettings,
) -> Result<SegmentLoss, FrictionError> {
    validate(&input)?;
    if input.flow_ls == 0.0 {
        return Ok(SegmentLoss::default());
    }
    let d_m = input.internal_diameter_mm / 1000.0;
    let velocity = velocity_m_s(input.flow_ls, input.internal_diameter_mm);
    let reynolds = reynolds_number(
        input.density_kg_m3,
        velocity,
        d_m,
        input.dynamic_viscosity_pa_s,
    );
    let relative_roughness = input.roughness_mm / input.internal_diameter_mm;
    let factor = darcy_friction_factor(relative_roughness, reynolds, settings)?;

    let g = settings.gravity_m_s2;
    let velocity_head = velocity * velocity / (2.0 * g);
    let friction_head_m = factor.value * (input.length_m / d_m) * velocity_head;
    let fitting_head_m = input.k_total * velocity_head;
    let friction_loss_kpa = head_to_kpa(friction_head_m, input.density_kg_m3, g);
    let fitting_loss_kpa = head_to_kpa(fitting_head_m, input.density_kg_m3, g);

    Ok(SegmentLoss {
        velocity_m_s: velocity,
        reynolds,
        friction_factor: factor.value,
        iterations: factor.iterations,
        friction_head_m,
        fitting_head_m,
        friction_loss_kpa,
        fitting_loss_kpa,
        total_loss_kpa: friction_loss_kpa + fitting_loss_kpa,
    })
}

fn validate(input: &SegmentLossInput) -> Result<(), FrictionError> {
    let checks = [
        ("유량", input.flow_ls, true),
        ("내경", input.internal_diameter_mm, false),
        ("길이", input.length_m, true),
        ("조도", input.roughness_mm, true),
        ("밀도", input.density_kg_m3, false),
        ("점성계수", input.dynamic_viscosity_pa_s, false),
        ("K 합계", input.k_total, true),
    ];
    for (label, value, zero_ok) in checks {
        let ok = value.is_finite() && if zero_ok { value >= 0.0 } else { value > 0.0 };
        if !ok {
            return Err(FrictionError::InvalidInput(format!("{label} 값 {value}")));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_flow_skips_solver() {
        let loss = segment_loss(
            SegmentLossInput {
                flow_ls: 0.0,
                internal_diameter_mm: 10.81,
                length_m: 10.0,
                roughness_mm: 0.003,
                density_kg_m3: 997.0,
                dynamic_viscosity_pa_s: 0.001,
                k_total: 2.0,
            },
            &SolverSettings::default(),
        )
        .unwrap();
        assert_eq!(loss, SegmentLoss::default());
    }

    #[test]
    fn laminar_uses_64_over_re() {
        let f = darcy_friction_factor(0.0, 1000.0, &SolverSettings::default()).unwrap();
        assert_eq!(f.value, 0.064);
        assert_eq!(f.iterations, 0);
    }

    #[test]
    fn iteration_cap_reports_convergence_error() {
        let settings = SolverSettings {
            tolerance: 0.0,
            max_iterations: 3,
            ..SolverSettings::default()
        };
        assert!(matches!(
            colebrook_white(1e-4, 1e5, &settings),
            Err(FrictionError::Convergence { iterations: 3, .. })
        ));
    }
}
