//! 用量统计与额度数据

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 额度原始单位换算比例（500000 = 1 元）
pub const QUOTA_UNIT: f64 = 500_000.0;

const SECONDS_PER_DAY: i64 = 86_400;
const BEIJING_OFFSET: i64 = 8 * 3_600;
const USAGE_WINDOW_DAYS: i64 = 30;

/// 用户额度
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserQuota {
    pub total_quota: f64,
    pub used_quota: f64,
    pub remaining_quota: f64,
    pub request_count: i64,
}

impl UserQuota {
    /// 由接口原始整数额度换算
    pub fn from_raw(quota: i64, used_quota: i64, request_count: i64) -> Self {
        let total = quota as f64 / QUOTA_UNIT;
        let used = used_quota as f64 / QUOTA_UNIT;
        Self {
            total_quota: total,
            used_quota: used,
            remaining_quota: total - used,
            request_count,
        }
    }
}

/// 单条用量记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageData {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub model_name: String,
    pub created_at: i64,
    pub token_used: i64,
    pub count: i64,
    pub quota: i64,
}

/// 近 30 天用量统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    #[serde(default)]
    pub data: Vec<UsageData>,
}

/// 用量查询时间窗口 `(start, end)`，单位秒
///
/// `end` 为北京时间次日零点，`start` 为其前 30 天。
pub fn usage_query_window(now: DateTime<Utc>) -> (i64, i64) {
    let now = now.timestamp();
    let today_end = (now + BEIJING_OFFSET).div_euclid(SECONDS_PER_DAY) * SECONDS_PER_DAY
        + SECONDS_PER_DAY
        - BEIJING_OFFSET;
    (today_end - USAGE_WINDOW_DAYS * SECONDS_PER_DAY, today_end)
}
