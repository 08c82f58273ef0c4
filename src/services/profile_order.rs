//! Profile 排序偏好存储
//!
//! 每个工具保存一份用户拖拽后的 Profile 顺序，独立于 Profile 本身持久化。
//! 读取时与实时 Profile 列表对齐：保留仍存在的条目（按保存顺序），
//! 新出现的条目按原顺序追加到末尾，已消失的条目被忽略。

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::data::{JsonManager, Result};

const ORDER_FILE_VERSION: &str = "1";

/// profile_order.json 顶层结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileOrderFile {
    pub version: String,
    /// tool_id -> 排序后的 Profile 名称
    #[serde(default)]
    pub orders: BTreeMap<String, Vec<String>>,
    pub updated_at: DateTime<Utc>,
}

impl Default for ProfileOrderFile {
    fn default() -> Self {
        Self {
            version: ORDER_FILE_VERSION.to_string(),
            orders: BTreeMap::new(),
            updated_at: Utc::now(),
        }
    }
}

/// 将保存的顺序与实时列表对齐
///
/// 结果是 `live` 的一个排列：`saved ∩ live` 按 `saved` 顺序在前，
/// `live \ saved` 按 `live` 原顺序在后。Profile 名称在工具内唯一，重复项只保留第一次出现。
pub fn reconcile_order(saved: &[String], live: &[String]) -> Vec<String> {
    let live_set: HashSet<&str> = live.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::with_capacity(live.len());
    let mut ordered = Vec::with_capacity(live.len());

    for name in saved {
        if live_set.contains(name.as_str()) && seen.insert(name.as_str()) {
            ordered.push(name.clone());
        }
    }
    for name in live {
        if seen.insert(name.as_str()) {
            ordered.push(name.clone());
        }
    }
    ordered
}

/// 拖拽结束：把 `active` 移动到 `over` 所在位置
///
/// 任一名称不在列表中，或二者相同，返回 None。
pub fn move_item(list: &[String], active: &str, over: &str) -> Option<Vec<String>> {
    if active == over {
        return None;
    }
    let from = list.iter().position(|p| p == active)?;
    let to = list.iter().position(|p| p == over)?;

    let mut moved = list.to_vec();
    let item = moved.remove(from);
    moved.insert(to, item);
    Some(moved)
}

/// 基于 JSON 文件的排序偏好存储
#[derive(Debug, Clone)]
pub struct ProfileOrderStore {
    path: PathBuf,
    json: JsonManager,
}

impl ProfileOrderStore {
    /// 使用默认位置（配置目录下的 profile_order.json）
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::with_path(crate::utils::config::profile_order_path()?))
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            json: JsonManager::new(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&self) -> Result<ProfileOrderFile> {
        self.json.with_shared_lock(&self.path, |json| {
            Ok(json
                .read_typed::<ProfileOrderFile>(&self.path)?
                .unwrap_or_default())
        })
    }

    /// 读取工具保存的顺序，没有时返回空列表
    pub fn load_order(&self, tool_id: &str) -> Result<Vec<String>> {
        Ok(self
            .load_file()?
            .orders
            .remove(tool_id)
            .unwrap_or_default())
    }

    /// 按保存的顺序重排实时列表
    ///
    /// 读取失败（文件损坏等）只记录日志并按实时顺序返回，不影响调用方。
    pub fn apply_saved_order(&self, tool_id: &str, live: &[String]) -> Vec<String> {
        match self.load_order(tool_id) {
            Ok(saved) => reconcile_order(&saved, live),
            Err(e) => {
                tracing::warn!(
                    tool_id = %tool_id,
                    path = ?self.path,
                    error = ?e,
                    "读取 Profile 排序失败，使用原始顺序"
                );
                reconcile_order(&[], live)
            }
        }
    }

    /// 保存工具的 Profile 顺序，覆盖旧值
    ///
    /// 与已保存的顺序完全一致时不写文件，返回 `Ok(false)`。
    pub fn record_order(&self, tool_id: &str, order: &[String]) -> Result<bool> {
        self.json.with_lock(&self.path, |json| {
            let mut file = match json.read_typed::<ProfileOrderFile>(&self.path) {
                Ok(file) => file.unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(path = ?self.path, error = ?e, "排序文件损坏，将重建");
                    ProfileOrderFile::default()
                }
            };

            if file.orders.get(tool_id).map(Vec::as_slice) == Some(order) {
                tracing::debug!(tool_id = %tool_id, "Profile 顺序未变化，跳过写入");
                return Ok(false);
            }

            file.orders.insert(tool_id.to_string(), order.to_vec());
            file.updated_at = Utc::now();
            json.write_typed(&self.path, &file)?;

            tracing::debug!(tool_id = %tool_id, count = order.len(), "已保存 Profile 顺序");
            Ok(true)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn names(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn store(temp: &TempDir) -> ProfileOrderStore {
        ProfileOrderStore::with_path(temp.path().join("profile_order.json"))
    }

    #[test]
    fn reconcile_without_saved_order_keeps_live_order() {
        let live = names(&["work", "personal"]);
        assert_eq!(reconcile_order(&[], &live), live);
    }

    #[test]
    fn reconcile_puts_saved_first_and_appends_new() {
        let saved = names(&["c", "gone", "a"]);
        let live = names(&["a", "b", "c", "d"]);
        assert_eq!(reconcile_order(&saved, &live), names(&["c", "a", "b", "d"]));
    }

    #[test]
    fn reconcile_is_a_permutation_of_live() {
        let saved = names(&["x", "b", "b", "a", "y"]);
        let live = names(&["a", "b", "c"]);
        let mut result = reconcile_order(&saved, &live);
        assert_eq!(result, names(&["b", "a", "c"]));
        result.sort();
        assert_eq!(result, live);
    }

    #[test]
    fn move_item_follows_drag_semantics() {
        let list = names(&["a", "b", "c", "d"]);
        assert_eq!(move_item(&list, "a", "c"), Some(names(&["b", "c", "a", "d"])));
        assert_eq!(move_item(&list, "d", "b"), Some(names(&["a", "d", "b", "c"])));
        assert_eq!(move_item(&list, "a", "a"), None);
        assert_eq!(move_item(&list, "a", "zzz"), None);
    }

    #[test]
    fn missing_file_means_empty_order() {
        let temp = TempDir::new().unwrap();
        assert!(store(&temp).load_order("codex").unwrap().is_empty());
    }

    #[test]
    fn record_then_apply_scenario() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);

        let live = names(&["work", "personal"]);
        assert_eq!(store.apply_saved_order("claude-code", &live), live);

        assert!(store
            .record_order("claude-code", &names(&["personal", "work"]))
            .unwrap());
        assert_eq!(
            store.apply_saved_order("claude-code", &live),
            names(&["personal", "work"])
        );

        // personal 被外部删除
        assert_eq!(
            store.apply_saved_order("claude-code", &names(&["work"])),
            names(&["work"])
        );
    }

    #[test]
    fn record_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        let live = names(&["a", "b", "c"]);

        assert!(store.record_order("codex", &names(&["b", "a"])).unwrap());
        let applied = store.apply_saved_order("codex", &live);
        assert!(store.record_order("codex", &applied).unwrap());
        assert!(!store.record_order("codex", &applied).unwrap());
        assert_eq!(store.apply_saved_order("codex", &live), applied);
    }

    #[test]
    fn orders_are_kept_per_tool() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        store.record_order("codex", &names(&["x", "y"])).unwrap();
        store.record_order("gemini-cli", &names(&["q"])).unwrap();

        assert_eq!(store.load_order("codex").unwrap(), names(&["x", "y"]));
        assert_eq!(store.load_order("gemini-cli").unwrap(), names(&["q"]));
    }

    #[test]
    fn corrupt_file_falls_back_and_is_rebuilt() {
        let temp = TempDir::new().unwrap();
        let store = store(&temp);
        fs::write(store.path(), "{ not json").unwrap();

        let live = names(&["a", "b"]);
        assert_eq!(store.apply_saved_order("codex", &live), live);
        assert!(store.load_order("codex").is_err());

        assert!(store.record_order("codex", &names(&["b", "a"])).unwrap());
        assert_eq!(store.load_order("codex").unwrap(), names(&["b", "a"]));
    }
}
