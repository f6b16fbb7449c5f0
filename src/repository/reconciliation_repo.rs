// ==========================================
// 车间生产完整性子系统 - 对账记录数据仓储
// ==========================================
// 对齐: reconciliation_record 表
// 红线: Repository 不做业务逻辑, 只做数据映射
// 并发: 决议采用 CAS (WHERE status='PENDING'), 并发决议只有一方成功
// ==========================================

use crate::db::TS_STORAGE_FORMAT;
use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::types::ReconciliationStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// ReconciliationRepository - 对账记录仓储
// ==========================================
pub struct ReconciliationRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ReconciliationRepository {
    /// 创建新的对账记录仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入对账记录
    pub fn insert(&self, record: &ReconciliationRecord) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO reconciliation_record (
                recon_id, machine_id, job_id,
                system_counter, physical_counter, variance, variance_percent,
                reason, status, reconciled_by_id, reconciled_by_name, ts,
                resolved_by_id, resolved_by_name, resolved_at, rejection_reason
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.recon_id,
                record.machine_id,
                record.job_id,
                record.system_counter,
                record.physical_counter,
                record.variance,
                record.variance_percent,
                record.reason,
                record.status.as_str(),
                record.reconciled_by_id,
                record.reconciled_by_name,
                record.ts.format(TS_STORAGE_FORMAT).to_string(),
                record.resolved_by_id,
                record.resolved_by_name,
                record
                    .resolved_at
                    .map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                record.rejection_reason,
            ],
        )?;

        Ok(record.recon_id.clone())
    }

    /// 决议待审批记录 (CAS)
    ///
    /// 仅当记录仍处于 PENDING 时生效; 并发决议的后到方更新 0 行。
    ///
    /// # 返回
    /// - `Ok(true)`: 转换成功
    /// - `Ok(false)`: 记录不存在或已不在 PENDING (由调用方区分)
    pub fn resolve(
        &self,
        recon_id: &str,
        new_status: ReconciliationStatus,
        resolver_id: &str,
        resolver_name: &str,
        resolved_at: NaiveDateTime,
        rejection_reason: Option<&str>,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"
            UPDATE reconciliation_record
            SET status = ?1,
                resolved_by_id = ?2,
                resolved_by_name = ?3,
                resolved_at = ?4,
                rejection_reason = ?5
            WHERE recon_id = ?6
              AND status = 'PENDING'
            "#,
            params![
                new_status.as_str(),
                resolver_id,
                resolver_name,
                resolved_at.format(TS_STORAGE_FORMAT).to_string(),
                rejection_reason,
                recon_id,
            ],
        )?;

        Ok(rows == 1)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 recon_id 查询单条记录
    pub fn find_by_id(&self, recon_id: &str) -> RepositoryResult<Option<ReconciliationRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE recon_id = ?",
            Self::SELECT_COLUMNS
        ))?;

        match stmt.query_row(params![recon_id], |row| Self::map_row(row)) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询待审批队列 (最新在前)
    pub fn find_pending(&self) -> RepositoryResult<Vec<ReconciliationRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE status = 'PENDING' ORDER BY ts DESC, recon_id DESC",
            Self::SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 查询指定机台的对账记录 (最新在前)
    pub fn find_by_machine(&self, machine_id: &str) -> RepositoryResult<Vec<ReconciliationRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE machine_id = ? ORDER BY ts DESC, recon_id DESC",
            Self::SELECT_COLUMNS
        ))?;

        let records = stmt
            .query_map(params![machine_id], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    const SELECT_COLUMNS: &'static str = r#"
        SELECT recon_id, machine_id, job_id,
               system_counter, physical_counter, variance, variance_percent,
               reason, status, reconciled_by_id, reconciled_by_name, ts,
               resolved_by_id, resolved_by_name, resolved_at, rejection_reason
        FROM reconciliation_record
    "#;

    /// 将数据库行映射为 ReconciliationRecord 实体
    fn map_row(row: &Row) -> SqliteResult<ReconciliationRecord> {
        let status_str: String = row.get(8)?;
        let status = ReconciliationStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                8,
                rusqlite::types::Type::Text,
                format!("未知对账状态: {status_str}").into(),
            )
        })?;

        let ts_str: String = row.get(11)?;
        let ts = NaiveDateTime::parse_from_str(&ts_str, TS_STORAGE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(11, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let resolved_at_str: Option<String> = row.get(14)?;
        let resolved_at = resolved_at_str
            .and_then(|s| NaiveDateTime::parse_from_str(&s, TS_STORAGE_FORMAT).ok());

        Ok(ReconciliationRecord {
            recon_id: row.get(0)?,
            machine_id: row.get(1)?,
            job_id: row.get(2)?,
            system_counter: row.get(3)?,
            physical_counter: row.get(4)?,
            variance: row.get(5)?,
            variance_percent: row.get(6)?,
            reason: row.get(7)?,
            status,
            reconciled_by_id: row.get(9)?,
            reconciled_by_name: row.get(10)?,
            ts,
            resolved_by_id: row.get(12)?,
            resolved_by_name: row.get(13)?,
            resolved_at,
            rejection_reason: row.get(15)?,
        })
    }
}
