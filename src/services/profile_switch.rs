//! 配置切换服务
//!
//! 组合全局缓存、Profile 注册表、透明代理门控、会话状态与切换调度器，
//! 向展示层提供一组完整的操作入口。展示层通过 [`ProfileSwitchService::subscribe`]
//! 接收事件，所有操作的失败都以返回值形式给出。

use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::backend::ToolConfigBackend;
use super::events::{EventBus, DEFAULT_EVENT_CAPACITY};
use super::global_cache::{GlobalCache, StatsSnapshot};
use super::profile_order::ProfileOrderStore;
use super::profile_registry::ProfileRegistry;
use super::proxy_gate::ProxyGate;
use super::session_state::{PendingDelete, SessionState};
use super::switch_executor::SwitchExecutor;
use crate::core::{AppError, AppResult};
use crate::models::{
    display_name, ActiveConfig, CoreEvent, GlobalConfig, OperationResult, ToolStatus,
};

/// 服务构造参数
#[derive(Debug, Clone)]
pub struct ServiceOptions {
    /// Profile 排序偏好文件
    pub order_file: PathBuf,
    /// 事件通道缓冲容量
    pub event_capacity: usize,
}

impl ServiceOptions {
    /// 使用配置目录下的默认排序文件
    pub fn from_config_dir() -> anyhow::Result<Self> {
        Ok(Self::with_order_file(
            crate::utils::config::profile_order_path()?,
        ))
    }

    pub fn with_order_file(order_file: impl Into<PathBuf>) -> Self {
        Self {
            order_file: order_file.into(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }
}

/// 单个工具详情视图所需的全部数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolProfileView {
    pub tool_id: String,
    pub tool_name: String,
    /// 已按排序偏好重排
    pub profiles: Vec<String>,
    pub active_config: ActiveConfig,
    /// 当前配置是否有可展示的内容
    pub configured: bool,
    pub proxy_enabled: bool,
    pub proxy_running: bool,
    pub refresh_token: u64,
    /// 切换被禁用时的提示
    pub gate_reason: Option<String>,
    pub busy: bool,
}

pub struct ProfileSwitchService {
    events: EventBus,
    cache: GlobalCache,
    registry: Arc<ProfileRegistry>,
    gate: Arc<ProxyGate>,
    session: Arc<SessionState>,
    executor: SwitchExecutor,
}

impl ProfileSwitchService {
    pub fn new(backend: Arc<dyn ToolConfigBackend>, options: ServiceOptions) -> Self {
        let events = EventBus::new(options.event_capacity);
        let cache = GlobalCache::new(backend.clone(), events.clone());
        let registry = Arc::new(ProfileRegistry::new(
            backend.clone(),
            ProfileOrderStore::with_path(options.order_file),
        ));
        let gate = Arc::new(ProxyGate::new(backend.clone()));
        let session = Arc::new(SessionState::new(events.clone()));
        let executor =
            SwitchExecutor::new(backend, registry.clone(), gate.clone(), session.clone());

        Self {
            events,
            cache,
            registry,
            gate,
            session,
            executor,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.events.subscribe()
    }

    pub fn global_cache(&self) -> &GlobalCache {
        &self.cache
    }

    // ==================== 加载 ====================

    /// 首次进入页面：加载工具列表与全局配置，然后加载各工具的 Profile 和代理状态
    pub async fn initialize(&self) {
        tracing::info!("初始化配置切换服务");
        tokio::join!(
            self.cache.ensure_tools_loaded(),
            self.cache.ensure_global_config_loaded()
        );
        self.on_tools_changed().await;
    }

    /// 重新检测工具安装状态（例如安装完成后）
    pub async fn refresh_tools(&self) {
        self.cache.refresh_tools().await;
        self.on_tools_changed().await;
    }

    /// 工具列表变化后：设置默认 Tab，重新加载 Profile 与代理状态
    pub async fn on_tools_changed(&self) {
        let tools = self.cache.tools().await;
        self.session.apply_default_tab(&tools);

        let tool_ids: Vec<String> = tools.iter().map(|t| t.id.clone()).collect();
        tokio::join!(
            self.registry.load_all_profiles(&tools),
            self.gate.load_all_proxy_status(tool_ids)
        );
    }

    /// 仅重新加载所有已安装工具的 Profile
    pub async fn reload_profiles(&self) {
        let tools = self.cache.tools().await;
        self.registry.load_all_profiles(&tools).await;
    }

    /// 仅刷新透明代理状态（从代理页面返回时）
    pub async fn refresh_proxy_status(&self) {
        let tools = self.cache.tools().await;
        self.gate
            .load_all_proxy_status(tools.into_iter().map(|t| t.id))
            .await;
    }

    pub async fn installed_tools(&self) -> Vec<ToolStatus> {
        crate::models::installed_tools(&self.cache.tools().await)
    }

    pub async fn global_config(&self) -> Option<GlobalConfig> {
        self.cache.global_config().await
    }

    pub async fn stats(&self) -> Option<StatsSnapshot> {
        self.cache.stats().await
    }

    // ==================== Tab 选择 ====================

    pub fn select_tab(&self, tool_id: &str) {
        self.session.select_tab(tool_id);
    }

    pub fn selected_tab(&self) -> Option<String> {
        self.session.selected_tab()
    }

    pub fn refresh_token(&self, tool_id: &str) -> u64 {
        self.session.refresh_token(tool_id)
    }

    // ==================== 切换 / 删除 ====================

    pub async fn switch_profile(&self, tool_id: &str, profile: &str) -> OperationResult {
        self.executor.switch_profile(tool_id, profile).await
    }

    /// 请求删除，等待展示层弹出确认对话框
    pub fn request_delete(&self, tool_id: &str, profile: &str) {
        self.session.request_delete(tool_id, profile);
    }

    pub fn pending_delete(&self) -> Option<PendingDelete> {
        self.session.pending_delete()
    }

    /// 用户确认删除
    pub async fn confirm_delete(&self) -> AppResult<OperationResult> {
        let pending = self
            .session
            .take_pending_delete()
            .ok_or(AppError::NoPendingDelete)?;
        Ok(self
            .executor
            .delete_profile(&pending.tool_id, &pending.profile)
            .await)
    }

    /// 用户取消删除，返回是否存在待确认的请求
    pub fn cancel_delete(&self) -> bool {
        self.session.take_pending_delete().is_some()
    }

    // ==================== 排序 ====================

    pub async fn reorder_profiles(&self, tool_id: &str, order: &[String]) -> AppResult<bool> {
        self.registry.reorder_profiles(tool_id, order).await
    }

    /// 拖拽结束
    pub async fn move_profile(&self, tool_id: &str, active: &str, over: &str) -> AppResult<bool> {
        self.registry.move_profile(tool_id, active, over).await
    }

    // ==================== 透明代理提示 ====================

    /// 关闭代理推荐提示
    ///
    /// `permanent` 为 true 时写入全局配置，否则只在本次会话内隐藏。
    pub async fn dismiss_proxy_tip(&self, permanent: bool) -> AppResult<()> {
        if !permanent {
            self.session.hide_proxy_tip();
            return Ok(());
        }

        let config = self
            .cache
            .global_config()
            .await
            .ok_or(AppError::MissingGlobalConfig)?;
        self.cache
            .save_global_config(config.with_hidden_proxy_tip())
            .await?;
        self.events
            .emit(CoreEvent::ProxyTipDismissed { permanent: true });
        Ok(())
    }

    pub async fn proxy_tip_visible(&self) -> bool {
        if self.session.proxy_tip_hidden() {
            return false;
        }
        !self
            .cache
            .global_config()
            .await
            .is_some_and(|c| c.hide_transparent_proxy_tip)
    }

    /// 切换后提示重启工具；透明代理运行中切换不生效，不提示
    pub async fn restart_hint_visible(&self, tool_id: &str) -> bool {
        !self.gate.is_gated(tool_id).await
    }

    pub fn navigate_to_install(&self) {
        self.session.navigate_to_install();
    }

    pub fn navigate_to_proxy(&self, tool_id: &str) {
        self.session.navigate_to_proxy(tool_id);
    }

    // ==================== 视图 ====================

    pub async fn tool_view(&self, tool_id: &str) -> ToolProfileView {
        let proxy = self.gate.state(tool_id).await;
        let tools = self.cache.tools().await;
        let active_config = self
            .registry
            .active_config(tool_id)
            .await
            .unwrap_or_default();
        ToolProfileView {
            tool_id: tool_id.to_string(),
            tool_name: display_name(&tools, tool_id).to_string(),
            profiles: self.registry.profiles(tool_id).await,
            configured: active_config.is_configured(),
            active_config,
            proxy_enabled: proxy.enabled,
            proxy_running: proxy.running,
            refresh_token: self.session.refresh_token(tool_id),
            gate_reason: self
                .gate
                .gate_reason(tool_id)
                .await
                .map(str::to_string),
            busy: self.executor.is_busy(tool_id),
        }
    }
}
