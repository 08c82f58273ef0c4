//! 选择/会话状态
//!
//! - 当前选中的工具 Tab（工具列表首次非空时默认选中第一个已安装工具，仅一次）
//! - 每个工具的刷新令牌：切换成功后严格递增，详情视图以令牌值作为重新加载的依据
//! - 临时隐藏的代理提示、待确认的删除请求
//!
//! 所有状态变化通过 [`EventBus`] 通知展示层。

use std::collections::HashMap;
use std::sync::Mutex;

use super::events::EventBus;
use crate::models::{CoreEvent, ToolStatus};
use crate::utils::lock_or_recover;

/// 等待用户确认的删除请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelete {
    pub tool_id: String,
    pub profile: String,
}

#[derive(Debug, Default)]
struct SessionInner {
    selected_tab: Option<String>,
    default_applied: bool,
    refresh_tokens: HashMap<String, u64>,
    proxy_tip_hidden: bool,
    pending_delete: Option<PendingDelete>,
}

pub struct SessionState {
    events: EventBus,
    inner: Mutex<SessionInner>,
}

impl SessionState {
    pub fn new(events: EventBus) -> Self {
        Self {
            events,
            inner: Mutex::new(SessionInner::default()),
        }
    }

    /// 用户手动选择 Tab
    pub fn select_tab(&self, tool_id: &str) {
        {
            let mut inner = lock_or_recover(&self.inner);
            inner.default_applied = true;
            if inner.selected_tab.as_deref() == Some(tool_id) {
                return;
            }
            inner.selected_tab = Some(tool_id.to_string());
        }
        self.events.emit(CoreEvent::TabSelected {
            tool_id: tool_id.to_string(),
        });
    }

    /// 工具列表更新时调用：列表首次出现已安装工具且尚无选择时，选中第一个
    ///
    /// 返回本次设置的默认 Tab。
    pub fn apply_default_tab(&self, tools: &[ToolStatus]) -> Option<String> {
        let first = tools.iter().find(|t| t.installed)?;
        {
            let mut inner = lock_or_recover(&self.inner);
            if inner.default_applied {
                return None;
            }
            inner.default_applied = true;
            if inner.selected_tab.is_some() {
                return None;
            }
            inner.selected_tab = Some(first.id.clone());
        }
        tracing::debug!(tool_id = %first.id, "默认选中第一个已安装工具");
        self.events.emit(CoreEvent::TabSelected {
            tool_id: first.id.clone(),
        });
        Some(first.id.clone())
    }

    pub fn selected_tab(&self) -> Option<String> {
        lock_or_recover(&self.inner).selected_tab.clone()
    }

    /// 递增工具的刷新令牌并返回新值
    pub fn bump_refresh_token(&self, tool_id: &str) -> u64 {
        let token = {
            let mut inner = lock_or_recover(&self.inner);
            let entry = inner.refresh_tokens.entry(tool_id.to_string()).or_insert(0);
            *entry += 1;
            *entry
        };
        self.events.emit(CoreEvent::RefreshTokenBumped {
            tool_id: tool_id.to_string(),
            token,
        });
        token
    }

    /// 当前刷新令牌，未设置时为 0
    pub fn refresh_token(&self, tool_id: &str) -> u64 {
        lock_or_recover(&self.inner)
            .refresh_tokens
            .get(tool_id)
            .copied()
            .unwrap_or(0)
    }

    /// 本次会话内临时隐藏代理推荐提示
    pub fn hide_proxy_tip(&self) {
        lock_or_recover(&self.inner).proxy_tip_hidden = true;
        self.events
            .emit(CoreEvent::ProxyTipDismissed { permanent: false });
    }

    pub fn proxy_tip_hidden(&self) -> bool {
        lock_or_recover(&self.inner).proxy_tip_hidden
    }

    /// 记录删除请求，等待外部确认对话框的结果
    pub fn request_delete(&self, tool_id: &str, profile: &str) {
        lock_or_recover(&self.inner).pending_delete = Some(PendingDelete {
            tool_id: tool_id.to_string(),
            profile: profile.to_string(),
        });
        self.events.emit(CoreEvent::DeleteConfirmationRequested {
            tool_id: tool_id.to_string(),
            profile: profile.to_string(),
        });
    }

    pub fn pending_delete(&self) -> Option<PendingDelete> {
        lock_or_recover(&self.inner).pending_delete.clone()
    }

    /// 取出待确认的删除请求（确认或取消都会清空）
    pub fn take_pending_delete(&self) -> Option<PendingDelete> {
        lock_or_recover(&self.inner).pending_delete.take()
    }

    pub fn navigate_to_install(&self) {
        self.events.emit(CoreEvent::NavigateToInstall);
    }

    pub fn navigate_to_proxy(&self, tool_id: &str) {
        self.events.emit(CoreEvent::NavigateToProxy {
            tool_id: tool_id.to_string(),
        });
    }
}
