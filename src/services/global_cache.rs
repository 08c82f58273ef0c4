//! 全局缓存协调器
//!
//! 缓存工具安装状态、全局配置、额度/用量统计三类资源。
//! 每类资源同一时刻至多一个加载任务，重复调用会等待进行中的那一个，而不是再发起一次。
//! 加载失败只记录日志并保留原有缓存值，不向调用方传播。
//!
//! 统计数据的加载依赖全局配置：用户 ID 与系统令牌都存在时才会请求，
//! 否则 `ensure_stats_loaded` 是空操作；全局配置每次变化后会自动重新检查。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::future::{try_join, BoxFuture, FutureExt, Shared};
use tokio::sync::RwLock;

use super::backend::ToolConfigBackend;
use super::events::EventBus;
use crate::core::{AppError, AppResult};
use crate::models::{CoreEvent, GlobalConfig, ToolStatus, UsageStats, UserQuota};
use crate::utils::lock_or_recover;

type LoadFuture = Shared<BoxFuture<'static, ()>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resource {
    Tools,
    GlobalConfig,
    Stats,
}

/// 进行中的加载任务槽位
#[derive(Default)]
struct InflightSlot {
    current: Mutex<Option<LoadFuture>>,
}

impl InflightSlot {
    fn is_loading(&self) -> bool {
        lock_or_recover(&self.current).is_some()
    }

    /// 已有任务时返回它的句柄，否则登记并返回新任务
    fn join_or_start(&self, start: impl FnOnce() -> BoxFuture<'static, ()>) -> LoadFuture {
        let mut current = lock_or_recover(&self.current);
        if let Some(load) = current.as_ref() {
            return load.clone();
        }
        let load = start().shared();
        *current = Some(load.clone());
        load
    }

    fn clear(&self) {
        lock_or_recover(&self.current).take();
    }
}

/// 额度与用量快照（两者总是一起替换）
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    pub quota: UserQuota,
    pub usage: UsageStats,
}

#[derive(Debug, Default)]
struct CachedConfig {
    loaded: bool,
    value: Option<GlobalConfig>,
}

struct Inner {
    backend: Arc<dyn ToolConfigBackend>,
    events: EventBus,
    tools: RwLock<Option<Vec<ToolStatus>>>,
    global_config: RwLock<CachedConfig>,
    /// 每次保存递增；读取开始后发生过保存时丢弃读取结果
    config_generation: AtomicU64,
    stats: RwLock<Option<StatsSnapshot>>,
    tools_load: InflightSlot,
    config_load: InflightSlot,
    stats_load: InflightSlot,
}

impl Inner {
    fn slot(&self, resource: Resource) -> &InflightSlot {
        match resource {
            Resource::Tools => &self.tools_load,
            Resource::GlobalConfig => &self.config_load,
            Resource::Stats => &self.stats_load,
        }
    }

    async fn fetch(&self, resource: Resource) {
        match resource {
            Resource::Tools => self.fetch_tools().await,
            Resource::GlobalConfig => self.fetch_global_config().await,
            Resource::Stats => self.fetch_stats().await,
        }
    }

    async fn fetch_tools(&self) {
        match self.backend.check_installations().await {
            Ok(tools) => {
                tracing::debug!(count = tools.len(), "工具安装状态已更新");
                *self.tools.write().await = Some(tools);
                self.events.emit(CoreEvent::ToolsUpdated);
            }
            Err(e) => tracing::error!(error = ?e, "检测工具安装状态失败"),
        }
    }

    async fn fetch_global_config(&self) {
        let generation = self.config_generation.load(Ordering::SeqCst);
        match self.backend.get_global_config().await {
            Ok(value) => {
                let changed = {
                    let mut cached = self.global_config.write().await;
                    if self.config_generation.load(Ordering::SeqCst) != generation {
                        tracing::debug!("读取期间全局配置已保存，丢弃读取结果");
                        return;
                    }
                    let changed = !cached.loaded || cached.value != value;
                    *cached = CachedConfig {
                        loaded: true,
                        value,
                    };
                    changed
                };
                tracing::debug!(changed, "全局配置已加载");
                if changed {
                    self.events.emit(CoreEvent::GlobalConfigChanged);
                }
            }
            Err(e) => tracing::error!(error = ?e, "读取全局配置失败"),
        }
    }

    async fn fetch_stats(&self) {
        let result = try_join(self.backend.get_user_quota(), self.backend.get_usage_stats()).await;
        match result {
            Ok((quota, usage)) => {
                tracing::debug!(
                    remaining = quota.remaining_quota,
                    records = usage.data.len(),
                    "用量统计已更新"
                );
                *self.stats.write().await = Some(StatsSnapshot { quota, usage });
            }
            Err(e) => tracing::error!(error = ?e, "加载额度/用量统计失败"),
        }
    }

    async fn has_stats_credentials(&self) -> bool {
        self.global_config
            .read()
            .await
            .value
            .as_ref()
            .is_some_and(GlobalConfig::has_stats_credentials)
    }
}

/// 进程级共享缓存，克隆后指向同一份数据
#[derive(Clone)]
pub struct GlobalCache {
    inner: Arc<Inner>,
}

impl GlobalCache {
    pub fn new(backend: Arc<dyn ToolConfigBackend>, events: EventBus) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                events,
                tools: RwLock::new(None),
                global_config: RwLock::new(CachedConfig::default()),
                config_generation: AtomicU64::new(0),
                stats: RwLock::new(None),
                tools_load: InflightSlot::default(),
                config_load: InflightSlot::default(),
                stats_load: InflightSlot::default(),
            }),
        }
    }

    /// 发起或加入某类资源的加载
    async fn load(&self, resource: Resource) {
        let inner = self.inner.clone();
        let load = self.inner.slot(resource).join_or_start(move || {
            async move {
                inner.fetch(resource).await;
                inner.slot(resource).clear();
            }
            .boxed()
        });
        load.await;
    }

    // ==================== 工具安装状态 ====================

    /// 尚未缓存时加载工具列表
    pub async fn ensure_tools_loaded(&self) {
        if self.inner.tools.read().await.is_some() {
            return;
        }
        self.load(Resource::Tools).await;
    }

    /// 强制重新检测（与进行中的检测合并）
    pub async fn refresh_tools(&self) {
        self.load(Resource::Tools).await;
    }

    pub async fn tools(&self) -> Vec<ToolStatus> {
        self.inner.tools.read().await.clone().unwrap_or_default()
    }

    pub async fn tools_loaded(&self) -> bool {
        self.inner.tools.read().await.is_some()
    }

    pub fn is_loading_tools(&self) -> bool {
        self.inner.tools_load.is_loading()
    }

    // ==================== 全局配置 ====================

    /// 尚未加载时读取全局配置，随后检查统计数据的前置条件
    pub async fn ensure_global_config_loaded(&self) {
        if !self.inner.global_config.read().await.loaded {
            self.load(Resource::GlobalConfig).await;
        }
        self.ensure_stats_loaded().await;
    }

    /// 强制重新读取全局配置
    pub async fn reload_global_config(&self) {
        self.load(Resource::GlobalConfig).await;
        self.ensure_stats_loaded().await;
    }

    /// 保存全局配置并整体替换缓存值
    ///
    /// 保存失败时缓存保持不变，错误交给调用方提示。
    pub async fn save_global_config(&self, config: GlobalConfig) -> AppResult<()> {
        if let Err(e) = self.inner.backend.save_global_config(config.clone()).await {
            tracing::error!(error = ?e, "保存全局配置失败");
            return Err(AppError::backend(format!("{:#}", e)));
        }

        {
            let mut cached = self.inner.global_config.write().await;
            self.inner.config_generation.fetch_add(1, Ordering::SeqCst);
            *cached = CachedConfig {
                loaded: true,
                value: Some(config),
            };
        }
        tracing::info!("全局配置已保存");
        self.inner.events.emit(CoreEvent::GlobalConfigChanged);

        self.ensure_stats_loaded().await;
        Ok(())
    }

    pub async fn global_config(&self) -> Option<GlobalConfig> {
        self.inner.global_config.read().await.value.clone()
    }

    pub async fn global_config_loaded(&self) -> bool {
        self.inner.global_config.read().await.loaded
    }

    pub fn is_loading_global_config(&self) -> bool {
        self.inner.config_load.is_loading()
    }

    // ==================== 额度/用量统计 ====================

    /// 统计数据尚未缓存且凭据齐全时加载，否则为空操作
    pub async fn ensure_stats_loaded(&self) {
        if self.inner.stats.read().await.is_some() {
            return;
        }
        if !self.inner.has_stats_credentials().await {
            tracing::debug!("缺少用户 ID 或系统令牌，跳过统计数据加载");
            return;
        }
        self.load(Resource::Stats).await;
    }

    /// 强制刷新统计数据（仍要求凭据齐全）
    pub async fn refresh_stats(&self) {
        if !self.inner.has_stats_credentials().await {
            tracing::debug!("缺少用户 ID 或系统令牌，跳过统计数据刷新");
            return;
        }
        self.load(Resource::Stats).await;
    }

    pub async fn stats(&self) -> Option<StatsSnapshot> {
        self.inner.stats.read().await.clone()
    }

    pub async fn quota(&self) -> Option<UserQuota> {
        self.inner.stats.read().await.as_ref().map(|s| s.quota.clone())
    }

    pub async fn usage(&self) -> Option<UsageStats> {
        self.inner.stats.read().await.as_ref().map(|s| s.usage.clone())
    }

    pub fn is_loading_stats(&self) -> bool {
        self.inner.stats_load.is_loading()
    }
}
