//! 核心层错误类型
//!
//! 对应四类失败：Busy / Gated / BackendFailure / PartialLoadFailure。
//! 前两类是调度层的拒绝结果，不代表后端出错。

use crate::data::DataError;
use crate::models::{OperationResult, ResultKind};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    /// 该工具已有进行中的切换或删除
    #[error("{tool_id} 正在执行其他操作，请稍后再试")]
    Busy { tool_id: String },

    /// 透明代理启用且运行中
    #[error("{tool_id} 透明代理已启用，配置切换已禁用")]
    Gated { tool_id: String },

    /// 外部命令失败（网络、I/O、后端校验等）
    #[error("{0}")]
    BackendFailure(String),

    /// 批量加载中单个工具失败，不中断整批
    #[error("加载 {tool_id} 的 {resource} 失败: {message}")]
    PartialLoadFailure {
        tool_id: String,
        resource: &'static str,
        message: String,
    },

    #[error("全局配置尚未加载")]
    MissingGlobalConfig,

    #[error("没有待确认的删除请求")]
    NoPendingDelete,

    #[error(transparent)]
    Data(#[from] DataError),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

impl AppError {
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::BackendFailure(err.to_string())
    }

    pub fn partial_load(
        tool_id: impl Into<String>,
        resource: &'static str,
        err: impl std::fmt::Display,
    ) -> Self {
        Self::PartialLoadFailure {
            tool_id: tool_id.into(),
            resource,
            message: err.to_string(),
        }
    }
}

/// 转换为展示层可直接提示的结果值
impl From<AppError> for OperationResult {
    fn from(err: AppError) -> Self {
        let kind = match &err {
            AppError::Busy { .. } => ResultKind::Busy,
            AppError::Gated { .. } => ResultKind::Gated,
            _ => ResultKind::BackendFailure,
        };
        OperationResult {
            success: false,
            message: err.to_string(),
            kind,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejections_keep_their_kind() {
        let busy: OperationResult = AppError::Busy {
            tool_id: "codex".to_string(),
        }
        .into();
        assert!(busy.is_busy());
        assert!(!busy.success);

        let gated: OperationResult = AppError::Gated {
            tool_id: "codex".to_string(),
        }
        .into();
        assert!(gated.is_gated());
        assert!(gated.message.contains("透明代理"));
    }

    #[test]
    fn backend_failure_carries_message() {
        let result: OperationResult = AppError::backend("config not found").into();
        assert_eq!(result.kind, ResultKind::BackendFailure);
        assert_eq!(result.message, "config not found");
    }

    #[test]
    fn partial_load_display() {
        let err = AppError::partial_load("gemini-cli", "profiles", "io error");
        assert_eq!(err.to_string(), "加载 gemini-cli 的 profiles 失败: io error");
    }
}
