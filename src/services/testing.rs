//! 测试用内存后端
//!
//! 每次调用按 `方法名[:tool_id]` 计数；调用开始时读取数据快照，
//! 之后让出若干次调度，模拟真实后端的挂起点。

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::backend::ToolConfigBackend;
use crate::models::{
    mask_api_key, ActiveConfig, CommandOutcome, GlobalConfig, ProxyState, ToolStatus, UsageData,
    UsageStats, UserQuota,
};
use crate::utils::lock_or_recover;

const DEFAULT_DELAY_YIELDS: u32 = 3;

pub(crate) fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub(crate) fn sample_usage() -> UsageStats {
    UsageStats {
        data: vec![UsageData {
            id: 1,
            user_id: 42,
            username: "duck".to_string(),
            model_name: "claude-sonnet".to_string(),
            created_at: 1_700_000_000,
            token_used: 1_200,
            count: 3,
            quota: 6_000,
        }],
    }
}

struct MockState {
    delay_yields: u32,
    calls: HashMap<String, usize>,
    failing: HashSet<String>,
    rejections: HashMap<String, String>,
    tools: Vec<ToolStatus>,
    global_config: Option<GlobalConfig>,
    quota: UserQuota,
    usage: UsageStats,
    profiles: HashMap<String, Vec<String>>,
    active: HashMap<String, Option<String>>,
    proxy: HashMap<String, ProxyState>,
}

pub(crate) struct MockBackend {
    state: Mutex<MockState>,
}

impl MockBackend {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(MockState {
                delay_yields: DEFAULT_DELAY_YIELDS,
                calls: HashMap::new(),
                failing: HashSet::new(),
                rejections: HashMap::new(),
                tools: Vec::new(),
                global_config: None,
                quota: UserQuota::from_raw(5_000_000, 1_000_000, 12),
                usage: sample_usage(),
                profiles: HashMap::new(),
                active: HashMap::new(),
                proxy: HashMap::new(),
            }),
        }
    }

    pub(crate) fn set_delay_yields(&self, yields: u32) {
        lock_or_recover(&self.state).delay_yields = yields;
    }

    /// 之后对 `key` 的调用返回错误
    pub(crate) fn fail(&self, key: &str) {
        lock_or_recover(&self.state).failing.insert(key.to_string());
    }

    pub(crate) fn recover(&self, key: &str) {
        lock_or_recover(&self.state).failing.remove(key);
    }

    /// 之后对 `key` 的切换/删除返回 `success: false`
    pub(crate) fn reject(&self, key: &str, message: &str) {
        lock_or_recover(&self.state)
            .rejections
            .insert(key.to_string(), message.to_string());
    }

    pub(crate) fn calls(&self, key: &str) -> usize {
        lock_or_recover(&self.state)
            .calls
            .get(key)
            .copied()
            .unwrap_or(0)
    }

    pub(crate) fn set_tools(&self, tools: Vec<ToolStatus>) {
        lock_or_recover(&self.state).tools = tools;
    }

    pub(crate) fn set_global_config(&self, config: Option<GlobalConfig>) {
        lock_or_recover(&self.state).global_config = config;
    }

    pub(crate) fn set_quota(&self, quota: UserQuota) {
        lock_or_recover(&self.state).quota = quota;
    }

    pub(crate) fn set_profiles(&self, tool_id: &str, profiles: &[&str]) {
        lock_or_recover(&self.state)
            .profiles
            .insert(tool_id.to_string(), names(profiles));
    }

    pub(crate) fn set_active(&self, tool_id: &str, profile: Option<&str>) {
        lock_or_recover(&self.state)
            .active
            .insert(tool_id.to_string(), profile.map(str::to_string));
    }

    pub(crate) fn set_proxy(&self, tool_id: &str, enabled: bool, running: bool) {
        lock_or_recover(&self.state)
            .proxy
            .insert(tool_id.to_string(), ProxyState::new(enabled, running));
    }

    /// 登记调用并返回 (让出次数, 是否失败)
    fn begin(&self, key: &str) -> (u32, bool) {
        let mut state = lock_or_recover(&self.state);
        *state.calls.entry(key.to_string()).or_insert(0) += 1;
        (state.delay_yields, state.failing.contains(key))
    }

    fn snapshot<T>(&self, f: impl FnOnce(&MockState) -> T) -> T {
        f(&lock_or_recover(&self.state))
    }

    async fn finish(key: &str, yields: u32, failing: bool) -> Result<()> {
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }
        if failing {
            return Err(anyhow!("模拟后端失败: {}", key));
        }
        Ok(())
    }
}

fn active_config_for(tool_id: &str, profile: Option<&String>) -> ActiveConfig {
    match profile {
        Some(name) => ActiveConfig {
            profile_name: Some(name.clone()),
            api_key: mask_api_key(&format!("sk-{}-{}-0000", tool_id, name)),
            base_url: format!("https://{}.example.com", name),
            provider: None,
        },
        None => ActiveConfig::none(),
    }
}

#[async_trait]
impl ToolConfigBackend for MockBackend {
    async fn check_installations(&self) -> Result<Vec<ToolStatus>> {
        let key = "check_installations";
        let (yields, failing) = self.begin(key);
        let tools = self.snapshot(|s| s.tools.clone());
        Self::finish(key, yields, failing).await?;
        Ok(tools)
    }

    async fn get_global_config(&self) -> Result<Option<GlobalConfig>> {
        let key = "get_global_config";
        let (yields, failing) = self.begin(key);
        let config = self.snapshot(|s| s.global_config.clone());
        Self::finish(key, yields, failing).await?;
        Ok(config)
    }

    async fn save_global_config(&self, config: GlobalConfig) -> Result<()> {
        let key = "save_global_config";
        let (yields, failing) = self.begin(key);
        Self::finish(key, yields, failing).await?;
        lock_or_recover(&self.state).global_config = Some(config);
        Ok(())
    }

    async fn get_user_quota(&self) -> Result<UserQuota> {
        let key = "get_user_quota";
        let (yields, failing) = self.begin(key);
        let quota = self.snapshot(|s| s.quota.clone());
        Self::finish(key, yields, failing).await?;
        Ok(quota)
    }

    async fn get_usage_stats(&self) -> Result<UsageStats> {
        let key = "get_usage_stats";
        let (yields, failing) = self.begin(key);
        let usage = self.snapshot(|s| s.usage.clone());
        Self::finish(key, yields, failing).await?;
        Ok(usage)
    }

    async fn list_profiles(&self, tool_id: &str) -> Result<Vec<String>> {
        let key = format!("list_profiles:{}", tool_id);
        let (yields, failing) = self.begin(&key);
        let profiles = self.snapshot(|s| s.profiles.get(tool_id).cloned().unwrap_or_default());
        Self::finish(&key, yields, failing).await?;
        Ok(profiles)
    }

    async fn get_active_config(&self, tool_id: &str) -> Result<ActiveConfig> {
        let key = format!("get_active_config:{}", tool_id);
        let (yields, failing) = self.begin(&key);
        let config = self.snapshot(|s| {
            active_config_for(tool_id, s.active.get(tool_id).and_then(Option::as_ref))
        });
        Self::finish(&key, yields, failing).await?;
        Ok(config)
    }

    async fn switch_profile(&self, tool_id: &str, profile: &str) -> Result<CommandOutcome> {
        let key = format!("switch_profile:{}", tool_id);
        let (yields, failing) = self.begin(&key);
        Self::finish(&key, yields, failing).await?;

        let mut state = lock_or_recover(&self.state);
        if let Some(message) = state.rejections.get(&key) {
            return Ok(CommandOutcome::failed(message.clone()));
        }
        let exists = state
            .profiles
            .get(tool_id)
            .is_some_and(|list| list.iter().any(|p| p == profile));
        if !exists {
            return Ok(CommandOutcome::failed(format!("配置 {} 不存在", profile)));
        }
        state
            .active
            .insert(tool_id.to_string(), Some(profile.to_string()));
        Ok(CommandOutcome::ok(""))
    }

    async fn delete_profile(&self, tool_id: &str, profile: &str) -> Result<CommandOutcome> {
        let key = format!("delete_profile:{}", tool_id);
        let (yields, failing) = self.begin(&key);
        Self::finish(&key, yields, failing).await?;

        let mut state = lock_or_recover(&self.state);
        if let Some(message) = state.rejections.get(&key) {
            return Ok(CommandOutcome::failed(message.clone()));
        }
        if let Some(list) = state.profiles.get_mut(tool_id) {
            list.retain(|p| p != profile);
        }
        Ok(CommandOutcome::ok(""))
    }

    async fn get_proxy_status(&self, tool_id: &str) -> Result<ProxyState> {
        let key = format!("get_proxy_status:{}", tool_id);
        let (yields, failing) = self.begin(&key);
        let state = self.snapshot(|s| s.proxy.get(tool_id).copied().unwrap_or_default());
        Self::finish(&key, yields, failing).await?;
        Ok(state)
    }
}
