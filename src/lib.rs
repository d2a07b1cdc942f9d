//! 핵심 계산 로직을 라이브러리로 분리하여 CLI 외의 호출자도 같은 엔진을 쓴다.

pub mod app;
pub mod catalog;
pub mod config;
pub mod demand;
pub mod drainage;
pub mod gas;
pub mod hydraulics;
pub mod i18n;
pub mod interpolation;
pub mod network;
pub mod report;
pub mod sizing;
pub mod ui_cli;
pub mod units;
