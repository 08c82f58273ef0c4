//! 外部配置后端接口
//!
//! 工具安装检测、工具原生配置文件读写、额度/用量接口都由外部实现，
//! 这里只约定调用边界。每个方法都是一个挂起点。

use crate::models::{
    ActiveConfig, CommandOutcome, GlobalConfig, ProxyState, ToolStatus, UsageStats, UserQuota,
};
use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait ToolConfigBackend: Send + Sync {
    /// 检测所有工具的安装状态
    async fn check_installations(&self) -> Result<Vec<ToolStatus>>;

    /// 读取全局配置，从未保存过时返回 `Ok(None)`
    async fn get_global_config(&self) -> Result<Option<GlobalConfig>>;

    async fn save_global_config(&self, config: GlobalConfig) -> Result<()>;

    async fn get_user_quota(&self) -> Result<UserQuota>;

    async fn get_usage_stats(&self) -> Result<UsageStats>;

    /// 列出工具的 Profile 名称（后端原始顺序）
    async fn list_profiles(&self, tool_id: &str) -> Result<Vec<String>>;

    async fn get_active_config(&self, tool_id: &str) -> Result<ActiveConfig>;

    async fn switch_profile(&self, tool_id: &str, profile: &str) -> Result<CommandOutcome>;

    async fn delete_profile(&self, tool_id: &str, profile: &str) -> Result<CommandOutcome>;

    async fn get_proxy_status(&self, tool_id: &str) -> Result<ProxyState>;
}
