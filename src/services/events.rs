//! 核心层到展示层的单向事件通道

use crate::models::CoreEvent;
use tokio::sync::broadcast;

/// 默认事件缓冲容量
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// 事件总线（广播，发送即忘，无需确认）
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<CoreEvent> {
        self.tx.subscribe()
    }

    pub fn emit(&self, event: CoreEvent) {
        tracing::trace!(event = ?event, "发送核心事件");
        // 没有订阅者时发送失败，直接忽略
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAPACITY)
    }
}
