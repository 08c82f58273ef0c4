// 服务层模块
//
// - backend: 外部配置后端接口
// - events: 核心层到展示层的事件通道
// - profile_order / profile_registry: Profile 排序与缓存
// - proxy_gate: 透明代理门控
// - switch_executor: 切换/删除调度
// - global_cache: 工具列表、全局配置、统计数据缓存
// - session_state: Tab 选择与刷新令牌
// - profile_switch: 组合以上组件的服务入口

pub mod backend;
pub mod events;
pub mod global_cache;
pub mod profile_order;
pub mod profile_registry;
pub mod profile_switch;
pub mod proxy_gate;
pub mod session_state;
pub mod switch_executor;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::ToolConfigBackend;
pub use events::{EventBus, DEFAULT_EVENT_CAPACITY};
pub use global_cache::{GlobalCache, StatsSnapshot};
pub use profile_order::{move_item, reconcile_order, ProfileOrderFile, ProfileOrderStore};
pub use profile_registry::ProfileRegistry;
pub use profile_switch::{ProfileSwitchService, ServiceOptions, ToolProfileView};
pub use proxy_gate::ProxyGate;
pub use session_state::{PendingDelete, SessionState};
pub use switch_executor::{Admission, OperationGuard, OperationKind, SwitchExecutor};
