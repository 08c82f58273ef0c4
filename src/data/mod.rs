//! 统一数据管理模块
//!
//! 负责本 crate 自有的持久化文件（目前是 Profile 排序偏好），工具原生配置文件
//! 由外部配置后端负责，不在此处读写。
//!
//! - `error`: 统一错误类型定义
//! - `managers`: 各格式管理器

pub mod error;
pub mod managers;

pub use error::{DataError, Result};
pub use managers::JsonManager;
