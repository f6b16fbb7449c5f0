// ==========================================
// 车间生产完整性子系统 - 配置管理
// ==========================================
// 职责: 配置加载、查询、默认值管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

/// 自动审批阈值配置键
pub const KEY_AUTO_APPROVE_THRESHOLD: &str = "reconciliation/auto_approve_threshold_percent";

/// 默认目标周期时间配置键
pub const KEY_DEFAULT_TARGET_CYCLE_TIME: &str = "oee/default_target_cycle_time_secs";

// ==========================================
// IntegrityConfig - 子系统配置快照
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct IntegrityConfig {
    /// 对账差异百分比在此幅度内自动审批 (含边界)
    pub auto_approve_threshold_percent: f64,
    /// 机台未配置目标周期时间时的兜底值 (秒/件)
    pub default_target_cycle_time_secs: f64,
}

impl Default for IntegrityConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold_percent: 2.0,
            default_target_cycle_time_secs: 30.0,
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 从 config_kv 表读取配置值 (scope_id='global')
    ///
    /// # 返回
    /// - `Ok(Some(String))`: 配置值
    /// - `Ok(None)`: 配置不存在
    fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 写入配置值 (scope_id='global', 覆写)
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))?;

        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
            ON CONFLICT (scope_id, key) DO UPDATE SET value = ?2
            "#,
            params![key, value],
        )?;

        Ok(())
    }

    /// 读取浮点配置, 缺失或不可解析时取默认值
    fn get_f64_or_default(&self, key: &str, default: f64) -> RepositoryResult<f64> {
        Ok(self
            .get_config_value(key)?
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(default))
    }

    /// 加载子系统配置快照
    pub fn load_integrity_config(&self) -> RepositoryResult<IntegrityConfig> {
        let defaults = IntegrityConfig::default();
        Ok(IntegrityConfig {
            auto_approve_threshold_percent: self.get_f64_or_default(
                KEY_AUTO_APPROVE_THRESHOLD,
                defaults.auto_approve_threshold_percent,
            )?,
            default_target_cycle_time_secs: self.get_f64_or_default(
                KEY_DEFAULT_TARGET_CYCLE_TIME,
                defaults.default_target_cycle_time_secs,
            )?,
        })
    }
}
