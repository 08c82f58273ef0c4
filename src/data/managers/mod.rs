//! 数据管理器实现
//!
//! - `json`: JSON 文件管理器（整文件读写 + 文件锁）

pub mod json;

pub use json::JsonManager;
