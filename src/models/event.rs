//! 核心层发往展示层的事件

use serde::{Deserialize, Serialize};

/// 事件名与展示层约定一致（kebab-case）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum CoreEvent {
    TabSelected {
        tool_id: String,
    },
    RefreshTokenBumped {
        tool_id: String,
        token: u64,
    },
    ToolsUpdated,
    GlobalConfigChanged,
    ProxyTipDismissed {
        permanent: bool,
    },
    DeleteConfirmationRequested {
        tool_id: String,
        profile: String,
    },
    #[serde(rename = "navigate-to-install")]
    NavigateToInstall,
    #[serde(rename = "navigate-to-transparent-proxy")]
    NavigateToProxy {
        tool_id: String,
    },
}
