//! 透明代理状态

use serde::{Deserialize, Serialize};

/// 配置切换被透明代理禁用时的提示
pub const PROXY_GATED_REASON: &str = "透明代理已启用，配置切换已禁用";

/// 单个工具的透明代理状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyState {
    pub enabled: bool,
    pub running: bool,
}

impl ProxyState {
    pub fn new(enabled: bool, running: bool) -> Self {
        Self { enabled, running }
    }

    /// 启用且运行中时，手动切换被接管
    pub fn blocks_switching(&self) -> bool {
        self.enabled && self.running
    }
}
