// lib.rs - 配置切换核心，供 GUI/CLI 展示层使用

pub mod core;
pub mod data;
pub mod models;
pub mod services;
pub mod utils;

pub use models::*;

pub use services::{
    EventBus, GlobalCache, ProfileOrderStore, ProfileRegistry, ProfileSwitchService, ProxyGate,
    ServiceOptions, SessionState, StatsSnapshot, SwitchExecutor, ToolConfigBackend,
    ToolProfileView,
};

// 重新导出常用类型
pub use anyhow::{Context, Result};

pub use crate::core::{init_logger, update_log_level, AppError, AppResult};
