//! JSON 文件管理器
//!
//! 提供 JSON 文件的整文件读写：
//! - 自动创建父目录
//! - 格式化输出
//! - Unix 权限设置（0o600）
//! - 先写同目录临时文件再 rename，读取方不会看到写了一半的内容
//! - 基于同目录 `.lock` 文件的排他锁/共享锁，保护"读取 → 修改 → 写回"

use crate::data::{DataError, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::fs::{self, File, OpenOptions};
use std::path::Path;

/// JSON 文件管理器（无缓存，每次读取都直接访问文件）
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonManager;

impl JsonManager {
    pub fn new() -> Self {
        Self
    }

    /// 读取整个 JSON 文件
    pub fn read(&self, path: &Path) -> Result<Value> {
        let content = fs::read_to_string(path).map_err(|e| DataError::io(path, e))?;
        Ok(serde_json::from_str(&content)?)
    }

    /// 读取并反序列化；文件不存在时返回 `Ok(None)`
    pub fn read_typed<T: DeserializeOwned>(&self, path: &Path) -> Result<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let value = self.read(path)?;
        Ok(Some(serde_json::from_value(value)?))
    }

    /// 写入整个 JSON 文件
    pub fn write(&self, path: &Path, value: &Value) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
        }

        let content = serde_json::to_string_pretty(value)?;
        let tmp_path = path.with_extension("tmp");
        fs::write(&tmp_path, content).map_err(|e| DataError::io(&tmp_path, e))?;
        set_permissions(&tmp_path)?;
        fs::rename(&tmp_path, path).map_err(|e| DataError::io(path, e))
    }

    pub fn write_typed<T: Serialize>(&self, path: &Path, value: &T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.write(path, &value)
    }

    /// 在排他文件锁保护下执行闭包
    ///
    /// 锁文件与目标文件同目录（`xxx.lock`），锁在闭包返回后随文件句柄释放。
    pub fn with_lock<T>(&self, path: &Path, f: impl FnOnce(&Self) -> Result<T>) -> Result<T> {
        let lock_file = open_lock_file(path)?;
        lock_file
            .lock_exclusive()
            .map_err(|e| DataError::Concurrency(format!("获取文件锁失败: {}", e)))?;

        f(self)
    }

    /// 在共享文件锁保护下执行闭包（只读场景）
    pub fn with_shared_lock<T>(
        &self,
        path: &Path,
        f: impl FnOnce(&Self) -> Result<T>,
    ) -> Result<T> {
        let lock_file = open_lock_file(path)?;
        FileExt::lock_shared(&lock_file)
            .map_err(|e| DataError::Concurrency(format!("获取共享文件锁失败: {}", e)))?;

        f(self)
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| DataError::io(parent, e))?;
    }
    let lock_path = path.with_extension("lock");
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(&lock_path)
        .map_err(|e| DataError::io(&lock_path, e))
}

#[cfg(unix)]
fn set_permissions(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let metadata = fs::metadata(path).map_err(|e| DataError::io(path, e))?;
    let mut perms = metadata.permissions();
    perms.set_mode(0o600);
    fs::set_permissions(path, perms).map_err(|e| DataError::io(path, e))
}

#[cfg(not(unix))]
fn set_permissions(_path: &Path) -> Result<()> {
    Ok(())
}
