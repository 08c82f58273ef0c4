//! 切换/删除调度器
//!
//! 每个工具一个状态机：`Idle -> Switching -> Idle`、`Idle -> Deleting -> Idle`。
//! 进入前先经过统一的准入检查，结果只有三种：
//! - Accepted：登记进行中并调用后端
//! - Gated：透明代理启用且运行中，不调用后端
//! - Busy：该工具已有切换或删除在进行，不调用后端
//!
//! 后端失败会被转换为结果值，任何情况下都不会向调用方抛出错误。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::backend::ToolConfigBackend;
use super::profile_registry::ProfileRegistry;
use super::proxy_gate::ProxyGate;
use super::session_state::SessionState;
use crate::core::AppError;
use crate::models::{ActiveConfig, OperationResult};
use crate::utils::lock_or_recover;

/// 进行中的操作类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Switching,
    Deleting,
}

/// 准入检查结果
pub enum Admission {
    Accepted(OperationGuard),
    Busy,
    Gated,
}

type BusyTable = Arc<Mutex<HashMap<String, OperationKind>>>;

/// 持有期间该工具处于 Switching/Deleting 状态，drop 时回到 Idle
pub struct OperationGuard {
    table: BusyTable,
    tool_id: String,
}

impl Drop for OperationGuard {
    fn drop(&mut self) {
        lock_or_recover(&self.table).remove(&self.tool_id);
    }
}

pub struct SwitchExecutor {
    backend: Arc<dyn ToolConfigBackend>,
    registry: Arc<ProfileRegistry>,
    gate: Arc<ProxyGate>,
    session: Arc<SessionState>,
    in_flight: BusyTable,
}

impl SwitchExecutor {
    pub fn new(
        backend: Arc<dyn ToolConfigBackend>,
        registry: Arc<ProfileRegistry>,
        gate: Arc<ProxyGate>,
        session: Arc<SessionState>,
    ) -> Self {
        Self {
            backend,
            registry,
            gate,
            session,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// 当前进行中的操作
    pub fn current_operation(&self, tool_id: &str) -> Option<OperationKind> {
        lock_or_recover(&self.in_flight).get(tool_id).copied()
    }

    pub fn is_busy(&self, tool_id: &str) -> bool {
        self.current_operation(tool_id).is_some()
    }

    /// 统一准入：先检查代理门控，再检查并登记进行中状态
    pub async fn admit(&self, tool_id: &str, kind: OperationKind) -> Admission {
        if self.gate.is_gated(tool_id).await {
            return Admission::Gated;
        }

        let mut table = lock_or_recover(&self.in_flight);
        if table.contains_key(tool_id) {
            return Admission::Busy;
        }
        table.insert(tool_id.to_string(), kind);
        Admission::Accepted(OperationGuard {
            table: self.in_flight.clone(),
            tool_id: tool_id.to_string(),
        })
    }

    /// 切换到指定 Profile
    ///
    /// 成功后整体替换该工具的当前配置，并递增刷新令牌；失败时当前配置保持不变。
    pub async fn switch_profile(&self, tool_id: &str, profile: &str) -> OperationResult {
        let _guard = match self.admit(tool_id, OperationKind::Switching).await {
            Admission::Accepted(guard) => guard,
            Admission::Busy => return reject_busy(tool_id),
            Admission::Gated => return reject_gated(tool_id),
        };

        tracing::info!(tool_id = %tool_id, profile = %profile, "切换配置");
        let outcome = match self.backend.switch_profile(tool_id, profile).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(tool_id = %tool_id, profile = %profile, error = ?e, "切换配置失败");
                return AppError::backend(format!("{:#}", e)).into();
            }
        };
        if !outcome.success {
            tracing::warn!(
                tool_id = %tool_id,
                profile = %profile,
                message = %outcome.message,
                "后端拒绝切换配置"
            );
            return OperationResult::backend_failure(outcome.message);
        }

        let active = self.reload_active_config(tool_id, profile).await;
        self.registry.replace_active_config(tool_id, active).await;
        let token = self.session.bump_refresh_token(tool_id);
        tracing::debug!(tool_id = %tool_id, token, "刷新令牌已递增");

        OperationResult::completed(success_message(outcome.message, || {
            format!("已切换到配置 {}", profile)
        }))
    }

    /// 切换成功后重新读取当前配置
    ///
    /// 读取失败或后端未标注 Profile 名称时，以刚切换的名称补全。
    async fn reload_active_config(&self, tool_id: &str, profile: &str) -> ActiveConfig {
        let mut active = match self.registry.fetch_active_config(tool_id).await {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(tool_id = %tool_id, error = %e, "切换后读取当前配置失败");
                self.registry
                    .active_config(tool_id)
                    .await
                    .unwrap_or_default()
            }
        };
        if active.profile_name.is_none() {
            active.profile_name = Some(profile.to_string());
        }
        active
    }

    /// 删除 Profile（调用前应已经过用户确认）
    ///
    /// 成功后从缓存列表移除，排序偏好在下次对齐时自然剔除。
    /// 删除当前生效的 Profile 不会隐式切换，当前配置保持后端报告的值。
    pub async fn delete_profile(&self, tool_id: &str, profile: &str) -> OperationResult {
        let _guard = match self.admit(tool_id, OperationKind::Deleting).await {
            Admission::Accepted(guard) => guard,
            Admission::Busy => return reject_busy(tool_id),
            Admission::Gated => return reject_gated(tool_id),
        };

        tracing::info!(tool_id = %tool_id, profile = %profile, "删除配置");
        let outcome = match self.backend.delete_profile(tool_id, profile).await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(tool_id = %tool_id, profile = %profile, error = ?e, "删除配置失败");
                return AppError::backend(format!("{:#}", e)).into();
            }
        };
        if !outcome.success {
            return OperationResult::backend_failure(outcome.message);
        }

        self.registry.remove_profile(tool_id, profile).await;
        OperationResult::completed(success_message(outcome.message, || {
            format!("已删除配置 {}", profile)
        }))
    }
}

fn reject_busy(tool_id: &str) -> OperationResult {
    tracing::debug!(tool_id = %tool_id, "已有操作进行中，拒绝新请求");
    AppError::Busy {
        tool_id: tool_id.to_string(),
    }
    .into()
}

fn reject_gated(tool_id: &str) -> OperationResult {
    tracing::debug!(tool_id = %tool_id, "透明代理运行中，拒绝切换/删除");
    AppError::Gated {
        tool_id: tool_id.to_string(),
    }
    .into()
}

fn success_message(message: String, fallback: impl FnOnce() -> String) -> String {
    if message.trim().is_empty() {
        fallback()
    } else {
        message
    }
}
