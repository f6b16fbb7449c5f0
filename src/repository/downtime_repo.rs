// ==========================================
// 车间生产完整性子系统 - 停机事件数据仓储
// ==========================================
// 对齐: downtime_event 表 (永不删除)
// 并发: 关闭采用 CAS (WHERE end_time IS NULL), 并发关闭只有一方成功
// ==========================================

use crate::db::TS_STORAGE_FORMAT;
use crate::domain::runtime::DowntimeEvent;
use crate::domain::types::DowntimeCategory;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// DowntimeEventRepository - 停机事件仓储
// ==========================================
pub struct DowntimeEventRepository {
    conn: Arc<Mutex<Connection>>,
}

impl DowntimeEventRepository {
    /// 创建新的停机事件仓储
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

    /// 插入停机事件 (开放态)
    pub fn insert(&self, event: &DowntimeEvent) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO downtime_event (
                event_id, machine_id, category, reason,
                start_time, end_time, duration_minutes,
                reported_by, resolved_by, is_planned
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                event.event_id,
                event.machine_id,
                event.category.as_str(),
                event.reason,
                event.start_time.format(TS_STORAGE_FORMAT).to_string(),
                event
                    .end_time
                    .map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                event.duration_minutes,
                event.reported_by,
                event.resolved_by,
                event.is_planned as i64,
            ],
        )?;

        Ok(event.event_id.clone())
    }

    /// 关闭停机事件 (CAS)
    ///
    /// 仅当事件仍开放 (end_time IS NULL) 时生效; duration 由调用方按截断分钟计算,
    /// 关闭后固定不变。
    ///
    /// # 返回
    /// - `Ok(true)`: 关闭成功
    /// - `Ok(false)`: 事件不存在或已关闭 (由调用方区分)
    pub fn close(
        &self,
        event_id: &str,
        end_time: NaiveDateTime,
        duration_minutes: i64,
        resolved_by: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;

        let rows = conn.execute(
            r#"
            UPDATE downtime_event
            SET end_time = ?1,
                duration_minutes = ?2,
                resolved_by = ?3
            WHERE event_id = ?4
              AND end_time IS NULL
            "#,
            params![
                end_time.format(TS_STORAGE_FORMAT).to_string(),
                duration_minutes,
                resolved_by,
                event_id,
            ],
        )?;

        Ok(rows == 1)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 event_id 查询单个事件
    pub fn find_by_id(&self, event_id: &str) -> RepositoryResult<Option<DowntimeEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!("{} WHERE event_id = ?", Self::SELECT_COLUMNS))?;

        match stmt.query_row(params![event_id], |row| Self::map_row(row)) {
            Ok(event) => Ok(Some(event)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询所有进行中的停机事件 (最新在前)
    pub fn find_active(&self) -> RepositoryResult<Vec<DowntimeEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            "{} WHERE end_time IS NULL ORDER BY start_time DESC, event_id DESC",
            Self::SELECT_COLUMNS
        ))?;

        let events = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(events)
    }

    /// 查询指定机台的停机事件 (可选起始时间下界, 最新在前)
    pub fn find_by_machine(
        &self,
        machine_id: &str,
        since: Option<NaiveDateTime>,
    ) -> RepositoryResult<Vec<DowntimeEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE machine_id = ?1
              AND (?2 IS NULL OR start_time >= ?2)
            ORDER BY start_time DESC, event_id DESC
            "#,
            Self::SELECT_COLUMNS
        ))?;

        let events = stmt
            .query_map(
                params![
                    machine_id,
                    since.map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(events)
    }

    /// 多条件过滤查询 (全部可选, 最新在前)
    pub fn find_filtered(
        &self,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
        machine_id: Option<&str>,
        category: Option<DowntimeCategory>,
    ) -> RepositoryResult<Vec<DowntimeEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE (?1 IS NULL OR start_time >= ?1)
              AND (?2 IS NULL OR start_time <= ?2)
              AND (?3 IS NULL OR machine_id = ?3)
              AND (?4 IS NULL OR category = ?4)
            ORDER BY start_time DESC, event_id DESC
            "#,
            Self::SELECT_COLUMNS
        ))?;

        let events = stmt
            .query_map(
                params![
                    since.map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                    until.map(|t| t.format(TS_STORAGE_FORMAT).to_string()),
                    machine_id,
                    category.map(|c| c.as_str()),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(events)
    }

    /// 查询可能与窗口重叠的停机事件 (OEE 计算用)
    ///
    /// 条件: start_time < window_end 且 (仍开放 或 end_time > window_start)。
    /// 包含在窗口开始前就已开始的事件, 裁剪交由计算方处理。
    pub fn find_overlapping_window(
        &self,
        machine_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> RepositoryResult<Vec<DowntimeEvent>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(&format!(
            r#"{}
            WHERE machine_id = ?1
              AND start_time < ?2
              AND (end_time IS NULL OR end_time > ?3)
            ORDER BY start_time ASC, event_id ASC
            "#,
            Self::SELECT_COLUMNS
        ))?;

        let events = stmt
            .query_map(
                params![
                    machine_id,
                    window_end.format(TS_STORAGE_FORMAT).to_string(),
                    window_start.format(TS_STORAGE_FORMAT).to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(events)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    const SELECT_COLUMNS: &'static str = r#"
        SELECT event_id, machine_id, category, reason,
               start_time, end_time, duration_minutes,
               reported_by, resolved_by, is_planned
        FROM downtime_event
    "#;

    /// 将数据库行映射为 DowntimeEvent 实体
    fn map_row(row: &Row) -> SqliteResult<DowntimeEvent> {
        let category_str: String = row.get(2)?;
        let category = DowntimeCategory::parse(&category_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知停机类别: {category_str}").into(),
            )
        })?;

        let start_time_str: String = row.get(4)?;
        let start_time =
            NaiveDateTime::parse_from_str(&start_time_str, TS_STORAGE_FORMAT).map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    4,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        let end_time_str: Option<String> = row.get(5)?;
        let end_time =
            end_time_str.and_then(|s| NaiveDateTime::parse_from_str(&s, TS_STORAGE_FORMAT).ok());

        let is_planned: i64 = row.get(9)?;

        Ok(DowntimeEvent {
            event_id: row.get(0)?,
            machine_id: row.get(1)?,
            category,
            reason: row.get(3)?,
            start_time,
            end_time,
            duration_minutes: row.get(6)?,
            reported_by: row.get(7)?,
            resolved_by: row.get(8)?,
            is_planned: is_planned != 0,
        })
    }
}
