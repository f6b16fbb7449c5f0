use super::core::AuditLogRepository;
use crate::db::TS_STORAGE_FORMAT;
use crate::domain::audit::AuditEntry;
use crate::domain::types::{AuditAction, UserRole};
use crate::repository::error::RepositoryResult;
use chrono::NaiveDateTime;
use rusqlite::{params, Result as SqliteResult, Row};

/// 导出查询过滤条件 (全部可选, 不设即全量)
#[derive(Debug, Clone, Default)]
pub struct AuditExportFilter {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub entity_type: Option<String>,
    pub action: Option<AuditAction>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT audit_id, entity_type, entity_id, action, ts,
           actor_id, actor_name, actor_role,
           before_json, after_json, reason,
           ip_address, device_info, metadata_json
    FROM audit_log
"#;

impl AuditLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================
    // 约定: 所有查询按 ts 降序返回, audit_id 做确定性平局裁决;
    //       limit 在排序之后截断 (SQLite LIMIT 语义),
    //       limit 为 None 时传 -1 (SQLite: 负数 = 不限)。
    // ==========================================

    /// 查询指定实体的全部审计条目
    pub fn find_by_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE entity_type = ? AND entity_id = ? ORDER BY ts DESC, audit_id DESC"
        ))?;

        let entries = stmt
            .query_map(params![entity_type, entity_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 查询指定操作人的审计条目
    pub fn find_by_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE actor_id = ? ORDER BY ts DESC, audit_id DESC LIMIT ?"
        ))?;

        let entries = stmt
            .query_map(params![user_id, limit.unwrap_or(-1)], |row| {
                Self::map_row(row)
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 查询指定动作类型的审计条目
    pub fn find_by_action(
        &self,
        action: AuditAction,
        limit: Option<i64>,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE action = ? ORDER BY ts DESC, audit_id DESC LIMIT ?"
        ))?;

        let entries = stmt
            .query_map(params![action.as_str(), limit.unwrap_or(-1)], |row| {
                Self::map_row(row)
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 查询指定时间范围的审计条目 (闭区间)
    pub fn find_by_time_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} WHERE ts BETWEEN ? AND ? ORDER BY ts DESC, audit_id DESC"
        ))?;

        let entries = stmt
            .query_map(
                params![
                    start.format(TS_STORAGE_FORMAT).to_string(),
                    end.format(TS_STORAGE_FORMAT).to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 查询人工覆写条目 (action = OVERRIDE)
    pub fn find_overrides(&self, limit: Option<i64>) -> RepositoryResult<Vec<AuditEntry>> {
        self.find_by_action(AuditAction::Override, limit)
    }

    /// 查询最近的 N 条审计条目
    pub fn find_recent(&self, limit: i64) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{SELECT_COLUMNS} ORDER BY ts DESC, audit_id DESC LIMIT ?"
        ))?;

        let entries = stmt
            .query_map(params![limit], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 按过滤条件查询 (导出用, 条件全部可选)
    pub fn find_filtered(&self, filter: &AuditExportFilter) -> RepositoryResult<Vec<AuditEntry>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{SELECT_COLUMNS}
            WHERE (?1 IS NULL OR ts >= ?1)
              AND (?2 IS NULL OR ts <= ?2)
              AND (?3 IS NULL OR entity_type = ?3)
              AND (?4 IS NULL OR action = ?4)
            ORDER BY ts DESC, audit_id DESC
            "#
        ))?;

        let entries = stmt
            .query_map(
                params![
                    filter.start.map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                    filter.end.map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                    filter.entity_type,
                    filter.action.map(|a| a.as_str()),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(entries)
    }

    /// 统计指定操作人的条目总数
    pub fn count_by_user(&self, user_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM audit_log WHERE actor_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 将数据库行映射为 AuditEntry 实体
    fn map_row(row: &Row) -> SqliteResult<AuditEntry> {
        let audit_id: String = row.get(0)?;
        let entity_type: String = row.get(1)?;
        let entity_id: String = row.get(2)?;
        let action_str: String = row.get(3)?;
        let ts_str: String = row.get(4)?;
        let actor_id: String = row.get(5)?;
        let actor_name: String = row.get(6)?;
        let actor_role_str: String = row.get(7)?;

        let before_json_str: Option<String> = row.get(8)?;
        let after_json_str: Option<String> = row.get(9)?;
        let reason: Option<String> = row.get(10)?;
        let ip_address: Option<String> = row.get(11)?;
        let device_info: Option<String> = row.get(12)?;
        let metadata_json_str: Option<String> = row.get(13)?;

        // 解析动作类型
        let action = AuditAction::parse(&action_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                format!("未知审计动作: {action_str}").into(),
            )
        })?;

        // 解析时间戳
        let ts = NaiveDateTime::parse_from_str(&ts_str, TS_STORAGE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

        // 未知角色回退到最低权限, 不让历史数据阻断查询
        let actor_role = UserRole::parse(&actor_role_str).unwrap_or(UserRole::Operator);

        // 解析 JSON 字段
        let before_json = before_json_str.and_then(|s| serde_json::from_str(&s).ok());
        let after_json = after_json_str.and_then(|s| serde_json::from_str(&s).ok());
        let metadata_json = metadata_json_str.and_then(|s| serde_json::from_str(&s).ok());

        Ok(AuditEntry {
            audit_id,
            entity_type,
            entity_id,
            action,
            ts,
            actor_id,
            actor_name,
            actor_role,
            before_json,
            after_json,
            reason,
            ip_address,
            device_info,
            metadata_json,
        })
    }
}
