//! Profile 注册表
//!
//! 按工具缓存 Profile 名称列表（已按排序偏好重排）和当前生效配置。
//! 批量加载并行请求所有已安装工具，单个工具失败只记录日志，不中断整批。
//!
//! 并发刷新：每次加载在开始时领取一个递增序号。Profile 列表与当前配置各自记录
//! 最后一次写入的序号，加载完成时只覆盖序号比自己小的部分：切换只使当前配置失效，
//! 删除、排序只使列表失效，更晚开始的加载两者都会覆盖。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;

use super::backend::ToolConfigBackend;
use super::profile_order::{move_item, reconcile_order, ProfileOrderStore};
use crate::core::{AppError, AppResult};
use crate::data::DataError;
use crate::models::{ActiveConfig, ToolStatus};

#[derive(Debug, Default)]
struct RegistryState {
    profiles: HashMap<String, Vec<String>>,
    active_configs: HashMap<String, ActiveConfig>,
    /// tool_id -> Profile 列表最后一次写入的序号
    profile_versions: HashMap<String, u64>,
    /// tool_id -> 当前配置最后一次写入的序号
    active_versions: HashMap<String, u64>,
}

fn version_of(versions: &HashMap<String, u64>, tool_id: &str) -> u64 {
    versions.get(tool_id).copied().unwrap_or(0)
}

impl RegistryState {
    /// 列表尚未缓存，或加载期间没有更新的写入
    fn accepts_profiles(&self, tool_id: &str, seq: u64) -> bool {
        !self.profiles.contains_key(tool_id) || version_of(&self.profile_versions, tool_id) <= seq
    }

    fn accepts_active(&self, tool_id: &str, seq: u64) -> bool {
        version_of(&self.active_versions, tool_id) <= seq
    }
}

/// 单个工具一次加载的结果
struct ToolLoad {
    tool_id: String,
    profiles: Vec<String>,
    active: Option<ActiveConfig>,
}

pub struct ProfileRegistry {
    backend: Arc<dyn ToolConfigBackend>,
    order_store: ProfileOrderStore,
    state: RwLock<RegistryState>,
    seq: AtomicU64,
}

impl ProfileRegistry {
    pub fn new(backend: Arc<dyn ToolConfigBackend>, order_store: ProfileOrderStore) -> Self {
        Self {
            backend,
            order_store,
            state: RwLock::new(RegistryState::default()),
            seq: AtomicU64::new(0),
        }
    }

    fn next_seq(&self) -> u64 {
        self.seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// 从后端读取 Profile 列表并按保存的顺序重排
    pub async fn fetch_profiles(&self, tool_id: &str) -> AppResult<Vec<String>> {
        let live = self
            .backend
            .list_profiles(tool_id)
            .await
            .map_err(|e| AppError::partial_load(tool_id, "profiles", format!("{:#}", e)))?;
        Ok(self.order_store.apply_saved_order(tool_id, &live))
    }

    /// 从后端读取当前生效配置
    pub async fn fetch_active_config(&self, tool_id: &str) -> AppResult<ActiveConfig> {
        self.backend
            .get_active_config(tool_id)
            .await
            .map_err(|e| AppError::partial_load(tool_id, "active config", format!("{:#}", e)))
    }

    async fn load_tool(&self, tool_id: String) -> ToolLoad {
        let (profiles, active) = tokio::join!(
            self.fetch_profiles(&tool_id),
            self.fetch_active_config(&tool_id)
        );

        let profiles = profiles.unwrap_or_else(|e| {
            tracing::warn!(tool_id = %tool_id, error = %e, "加载 Profile 列表失败");
            Vec::new()
        });
        let active = match active {
            Ok(config) => Some(config),
            Err(e) => {
                tracing::warn!(tool_id = %tool_id, error = %e, "加载当前配置失败");
                None
            }
        };

        ToolLoad {
            tool_id,
            profiles,
            active,
        }
    }

    /// 并行加载所有已安装工具的 Profile 与当前配置
    pub async fn load_all_profiles(&self, tools: &[ToolStatus]) {
        let seq = self.next_seq();
        let tool_ids: Vec<String> = tools
            .iter()
            .filter(|t| t.installed)
            .map(|t| t.id.clone())
            .collect();
        if tool_ids.is_empty() {
            return;
        }

        tracing::debug!(seq, tools = ?tool_ids, "开始加载 Profile");
        let results = join_all(tool_ids.into_iter().map(|id| self.load_tool(id))).await;

        let mut state = self.state.write().await;
        for load in results {
            if let Some(active) = load.active {
                if state.accepts_active(&load.tool_id, seq) {
                    state.active_versions.insert(load.tool_id.clone(), seq);
                    state.active_configs.insert(load.tool_id.clone(), active);
                } else {
                    tracing::debug!(tool_id = %load.tool_id, seq, "加载期间当前配置已更新，丢弃过期结果");
                }
            }
            if state.accepts_profiles(&load.tool_id, seq) {
                state.profile_versions.insert(load.tool_id.clone(), seq);
                state.profiles.insert(load.tool_id, load.profiles);
            } else {
                tracing::debug!(tool_id = %load.tool_id, seq, "加载期间 Profile 列表已更新，丢弃过期结果");
            }
        }
    }

    /// 缓存中的 Profile 列表（已排序）
    pub async fn profiles(&self, tool_id: &str) -> Vec<String> {
        self.state
            .read()
            .await
            .profiles
            .get(tool_id)
            .cloned()
            .unwrap_or_default()
    }

    pub async fn all_profiles(&self) -> HashMap<String, Vec<String>> {
        self.state.read().await.profiles.clone()
    }

    pub async fn active_config(&self, tool_id: &str) -> Option<ActiveConfig> {
        self.state.read().await.active_configs.get(tool_id).cloned()
    }

    /// 整体替换当前生效配置
    pub async fn replace_active_config(&self, tool_id: &str, config: ActiveConfig) {
        let mut state = self.state.write().await;
        let seq = self.next_seq();
        state.active_versions.insert(tool_id.to_string(), seq);
        state.active_configs.insert(tool_id.to_string(), config);
    }

    /// 从缓存列表中移除 Profile，返回是否存在
    pub async fn remove_profile(&self, tool_id: &str, profile: &str) -> bool {
        let mut state = self.state.write().await;
        let seq = self.next_seq();
        state.profile_versions.insert(tool_id.to_string(), seq);
        match state.profiles.get_mut(tool_id) {
            Some(list) => {
                let before = list.len();
                list.retain(|p| p != profile);
                list.len() != before
            }
            None => false,
        }
    }

    /// 保存新的顺序并更新缓存
    ///
    /// 缓存始终与当前 Profile 集合对齐：传入顺序中不存在的名称被忽略，遗漏的名称追加到末尾。
    /// 返回是否实际写入了文件。
    pub async fn reorder_profiles(&self, tool_id: &str, order: &[String]) -> AppResult<bool> {
        let store = self.order_store.clone();
        let (tool, order_vec) = (tool_id.to_string(), order.to_vec());
        let written = tokio::task::spawn_blocking(move || store.record_order(&tool, &order_vec))
            .await
            .map_err(|e| DataError::Concurrency(format!("保存 Profile 排序任务异常: {}", e)))??;

        let mut state = self.state.write().await;
        // 列表尚未加载时只保存偏好，加载完成后自然生效
        if let Some(current) = state.profiles.get(tool_id) {
            let reordered = reconcile_order(order, current);
            let seq = self.next_seq();
            state.profile_versions.insert(tool_id.to_string(), seq);
            state.profiles.insert(tool_id.to_string(), reordered);
        }

        Ok(written)
    }

    /// 拖拽结束：把 `active` 移到 `over` 的位置并保存
    ///
    /// 任一名称不在当前列表中时不做任何事，返回 `Ok(false)`。
    pub async fn move_profile(&self, tool_id: &str, active: &str, over: &str) -> AppResult<bool> {
        let current = self.profiles(tool_id).await;
        match move_item(&current, active, over) {
            Some(moved) => self.reorder_profiles(tool_id, &moved).await,
            None => Ok(false),
        }
    }
}
