// 全局配置与日志配置结构，在各服务之间共享
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// 进程级全局配置
///
/// 只读共享；修改必须通过保存操作产生一个完整的替换值，不做原地局部修改。
/// 未识别的字段保存在 `extra` 中，保证"读取 → 修改 → 保存"不会丢数据。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub system_token: String,
    /// 永久隐藏透明代理推荐提示
    #[serde(default)]
    pub hide_transparent_proxy_tip: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GlobalConfig {
    pub fn new(user_id: impl Into<String>, system_token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            system_token: system_token.into(),
            ..Default::default()
        }
    }

    /// 用户 ID 与系统令牌是否都已配置（统计数据预加载的前置条件）
    pub fn has_stats_credentials(&self) -> bool {
        !self.user_id.trim().is_empty() && !self.system_token.trim().is_empty()
    }

    /// 生成一个永久隐藏代理提示的替换值
    pub fn with_hidden_proxy_tip(&self) -> Self {
        Self {
            hide_transparent_proxy_tip: true,
            ..self.clone()
        }
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl std::str::FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!("无效的日志级别: {}", s)),
        }
    }
}

/// 日志输出格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 日志输出目标
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Console,
    File,
    Both,
}

/// 日志配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub output: LogOutput,
    /// 文件输出目录，None 时使用配置目录下的 logs
    #[serde(default)]
    pub file_path: Option<PathBuf>,
}
