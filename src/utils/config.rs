use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

/// 覆盖配置目录的环境变量（测试与便携部署使用）
pub const CONFIG_DIR_ENV: &str = "DUCKCODING_CONFIG_DIR";

const PROFILE_ORDER_FILE: &str = "profile_order.json";

/// DuckCoding 配置目录（默认 ~/.duckcoding），若不存在则创建
pub fn config_dir() -> Result<PathBuf> {
    let dir = match std::env::var_os(CONFIG_DIR_ENV) {
        Some(custom) if !custom.is_empty() => PathBuf::from(custom),
        _ => dirs::home_dir()
            .ok_or_else(|| anyhow!("无法获取用户主目录"))?
            .join(".duckcoding"),
    };
    if !dir.exists() {
        fs::create_dir_all(&dir).with_context(|| format!("创建配置目录失败: {:?}", dir))?;
    }
    Ok(dir)
}

/// Profile 排序偏好文件路径
pub fn profile_order_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(PROFILE_ORDER_FILE))
}
