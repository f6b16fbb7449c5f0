use crate::db::TS_STORAGE_FORMAT;
use crate::domain::audit::AuditEntry;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// AuditLogRepository - 审计账本仓储
// ==========================================
// 红线: Repository 不做业务逻辑, 只做数据映射
// 红线: 账本仅追加, 本仓储不暴露任何修改/删除已写条目的方法
pub struct AuditLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AuditLogRepository {
    /// 创建新的审计账本仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加审计条目
    ///
    /// # 参数
    /// - `entry`: 审计条目实体
    ///
    /// # 返回
    /// - `Ok(audit_id)`: 成功追加, 返回 audit_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, entry: &AuditEntry) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO audit_log (
                audit_id, entity_type, entity_id, action, ts,
                actor_id, actor_name, actor_role,
                before_json, after_json, reason,
                ip_address, device_info, metadata_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                entry.audit_id,
                entry.entity_type,
                entry.entity_id,
                entry.action.as_str(),
                entry.ts.format(TS_STORAGE_FORMAT).to_string(),
                entry.actor_id,
                entry.actor_name,
                entry.actor_role.as_str(),
                entry.before_json.as_ref().map(|v| v.to_string()),
                entry.after_json.as_ref().map(|v| v.to_string()),
                entry.reason,
                entry.ip_address,
                entry.device_info,
                entry.metadata_json.as_ref().map(|v| v.to_string()),
            ],
        )?;

        Ok(entry.audit_id.clone())
    }
}
