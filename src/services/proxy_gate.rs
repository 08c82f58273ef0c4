//! 透明代理门控
//!
//! 缓存每个工具的透明代理状态。启用且运行中的工具不允许手动切换或删除配置。

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::join_all;
use tokio::sync::RwLock;

use super::backend::ToolConfigBackend;
use crate::models::{ProxyState, PROXY_GATED_REASON};

pub struct ProxyGate {
    backend: Arc<dyn ToolConfigBackend>,
    states: RwLock<HashMap<String, ProxyState>>,
}

impl ProxyGate {
    pub fn new(backend: Arc<dyn ToolConfigBackend>) -> Self {
        Self {
            backend,
            states: RwLock::new(HashMap::new()),
        }
    }

    /// 并行刷新所有工具的代理状态
    ///
    /// 单个工具失败时按 `enabled=false, running=false` 处理。
    pub async fn load_all_proxy_status<I, S>(&self, tool_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let tool_ids: Vec<String> = tool_ids.into_iter().map(Into::into).collect();
        let futures = tool_ids.iter().map(|id| async move {
            match self.backend.get_proxy_status(id).await {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!(tool_id = %id, error = ?e, "获取透明代理状态失败");
                    ProxyState::default()
                }
            }
        });
        let results = join_all(futures).await;

        let mut states = self.states.write().await;
        for (tool_id, state) in tool_ids.into_iter().zip(results) {
            tracing::debug!(
                tool_id = %tool_id,
                enabled = state.enabled,
                running = state.running,
                "透明代理状态已更新"
            );
            states.insert(tool_id, state);
        }
    }

    /// 单独刷新一个工具
    pub async fn refresh(&self, tool_id: &str) -> ProxyState {
        let state = match self.backend.get_proxy_status(tool_id).await {
            Ok(state) => state,
            Err(e) => {
                tracing::warn!(tool_id = %tool_id, error = ?e, "获取透明代理状态失败");
                ProxyState::default()
            }
        };
        self.states.write().await.insert(tool_id.to_string(), state);
        state
    }

    pub async fn state(&self, tool_id: &str) -> ProxyState {
        self.states
            .read()
            .await
            .get(tool_id)
            .copied()
            .unwrap_or_default()
    }

    pub async fn is_enabled(&self, tool_id: &str) -> bool {
        self.state(tool_id).await.enabled
    }

    pub async fn is_running(&self, tool_id: &str) -> bool {
        self.state(tool_id).await.running
    }

    /// 是否禁止该工具的切换/删除
    pub async fn is_gated(&self, tool_id: &str) -> bool {
        self.state(tool_id).await.blocks_switching()
    }

    /// 被禁用时给出提示原因
    pub async fn gate_reason(&self, tool_id: &str) -> Option<&'static str> {
        self.is_gated(tool_id).await.then_some(PROXY_GATED_REASON)
    }
}
