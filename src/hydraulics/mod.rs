//! 구간 마찰 손실(Darcy-Weisbach + Colebrook-White)과 유체 물성.

pub mod fluid;
pub mod friction;

pub use fluid::{
    iapws_water_density, liquid_water_viscosity, properties, FluidError, FluidLookup,
    FluidProperties, IAPWS_LIQUID_RANGE_C,
};
pub use friction::{
    colebrook_white, darcy_friction_factor, head_to_kpa, reynolds_number,
    segment_loss, swamee_jain, velocity_m_s, FrictionError, FrictionFactor, SegmentLoss,
    SegmentLossInput, SolverSettings, GRAVITY, LAMINAR_REYNOLDS,
};
