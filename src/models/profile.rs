//! Profile 相关数据结构：当前生效配置与切换/删除结果

use serde::{Deserialize, Serialize};

/// 未配置时的占位文本
pub const NOT_CONFIGURED: &str = "未配置";

/// 工具当前生效的配置快照
///
/// 每个工具任一时刻恰有一个值（可能是 [`ActiveConfig::none`]），切换成功后整体替换。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveConfig {
    /// 当前生效的 Profile 名称（无法识别时为 None）
    #[serde(default)]
    pub profile_name: Option<String>,
    /// 已脱敏的 API Key
    pub api_key: String,
    pub base_url: String,
    /// 供应商名称（Codex 的 model_provider 等）
    #[serde(default)]
    pub provider: Option<String>,
}

impl ActiveConfig {
    pub fn none() -> Self {
        Self {
            profile_name: None,
            api_key: NOT_CONFIGURED.to_string(),
            base_url: NOT_CONFIGURED.to_string(),
            provider: None,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.api_key != NOT_CONFIGURED || self.base_url != NOT_CONFIGURED
    }
}

impl Default for ActiveConfig {
    fn default() -> Self {
        Self::none()
    }
}

/// API Key 脱敏：保留首尾各 4 个字符
pub fn mask_api_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", prefix, suffix)
}

/// 切换/删除结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultKind {
    Completed,
    BackendFailure,
    /// 该工具已有进行中的切换或删除
    Busy,
    /// 透明代理启用且运行中，切换被禁用
    Gated,
}

/// 切换/删除的最终结果，调用方永远拿到值而不是异常
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
    pub kind: ResultKind,
}

impl OperationResult {
    pub fn completed(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            kind: ResultKind::Completed,
        }
    }

    pub fn backend_failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            kind: ResultKind::BackendFailure,
        }
    }

    pub fn is_busy(&self) -> bool {
        self.kind == ResultKind::Busy
    }

    pub fn is_gated(&self) -> bool {
        self.kind == ResultKind::Gated
    }
}

/// 后端命令返回的原始结果 `{success, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutcome {
    pub success: bool,
    #[serde(default)]
    pub message: String,
}

impl CommandOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}
