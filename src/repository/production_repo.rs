// ==========================================
// 车间生产完整性子系统 - 生产计数数据仓储
// ==========================================
// 对齐: production_record 表
// 说明: 生产日志归属外部协作方 (工单/生产日志存储),
//       本仓储以同一 PersistentStore 契约建模: 追加 + 窗口汇总
// ==========================================

use crate::db::TS_STORAGE_FORMAT;
use crate::domain::production::ProductionRecord;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

/// 窗口内产量汇总
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProductionTotals {
    pub good_parts: i64,  // 良品合计
    pub scrap_parts: i64, // 废品合计
}

// ==========================================
// ProductionRecordRepository - 生产计数仓储
// ==========================================
pub struct ProductionRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRecordRepository {
    /// 创建新的生产计数仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 追加生产计数记录
    pub fn insert(&self, record: &ProductionRecord) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO production_record (
                record_id, machine_id, job_id, ts,
                good_parts, scrap_parts, cycle_time_secs
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                record.record_id,
                record.machine_id,
                record.job_id,
                record.ts.format(TS_STORAGE_FORMAT).to_string(),
                record.good_parts,
                record.scrap_parts,
                record.cycle_time_secs,
            ],
        )?;

        Ok(record.record_id.clone())
    }

    /// 汇总窗口 [start, end) 内指定机台的良品/废品数
    pub fn sum_window(
        &self,
        machine_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> RepositoryResult<ProductionTotals> {
        let conn = self.get_conn()?;

        let totals = conn.query_row(
            r#"
            SELECT COALESCE(SUM(good_parts), 0), COALESCE(SUM(scrap_parts), 0)
            FROM production_record
            WHERE machine_id = ?1
              AND ts >= ?2
              AND ts < ?3
            "#,
            params![
                machine_id,
                window_start.format(TS_STORAGE_FORMAT).to_string(),
                window_end.format(TS_STORAGE_FORMAT).to_string(),
            ],
            |row| {
                Ok(ProductionTotals {
                    good_parts: row.get(0)?,
                    scrap_parts: row.get(1)?,
                })
            },
        )?;

        Ok(totals)
    }

    /// 查询窗口 [start, end) 内指定机台的生产记录 (时间升序)
    pub fn find_window(
        &self,
        machine_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
    ) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT record_id, machine_id, job_id, ts,
                   good_parts, scrap_parts, cycle_time_secs
            FROM production_record
            WHERE machine_id = ?1
              AND ts >= ?2
              AND ts < ?3
            ORDER BY ts ASC, record_id ASC
            "#,
        )?;

        let records = stmt
            .query_map(
                params![
                    machine_id,
                    window_start.format(TS_STORAGE_FORMAT).to_string(),
                    window_end.format(TS_STORAGE_FORMAT).to_string(),
                ],
                |row| Self::map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(records)
    }

    /// 将数据库行映射为 ProductionRecord 实体
    fn map_row(row: &Row) -> SqliteResult<ProductionRecord> {
        let ts_str: String = row.get(3)?;
        let ts = NaiveDateTime::parse_from_str(&ts_str, TS_STORAGE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

        Ok(ProductionRecord {
            record_id: row.get(0)?,
            machine_id: row.get(1)?,
            job_id: row.get(2)?,
            ts,
            good_parts: row.get(4)?,
            scrap_parts: row.get(5)?,
            cycle_time_secs: row.get(6)?,
        })
    }
}

// ==========================================
// 测试
// ==========================================
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn setup_test_db() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn ts(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_sum_window_half_open() {
        let repo = ProductionRecordRepository::new(setup_test_db());

        repo.insert(&ProductionRecord::new("M01", Some("J1"), ts(8, 0), 10, 1, Some(24.0)))
            .unwrap();
        repo.insert(&ProductionRecord::new("M01", Some("J1"), ts(9, 0), 20, 2, Some(24.0)))
            .unwrap();
        // 窗口终点处的记录不计入 ([start, end) 半开区间)
        repo.insert(&ProductionRecord::new("M01", Some("J1"), ts(10, 0), 99, 9, None))
            .unwrap();
        // 其他机台不计入
        repo.insert(&ProductionRecord::new("M02", None, ts(9, 0), 50, 5, None))
            .unwrap();

        let totals = repo.sum_window("M01", ts(8, 0), ts(10, 0)).unwrap();
        assert_eq!(totals.good_parts, 30);
        assert_eq!(totals.scrap_parts, 3);
    }

    #[test]
    fn test_sum_empty_window_is_zero() {
        let repo = ProductionRecordRepository::new(setup_test_db());
        let totals = repo.sum_window("M01", ts(8, 0), ts(10, 0)).unwrap();
        assert_eq!(totals, ProductionTotals::default());
    }

    #[test]
    fn test_find_window_sorted_asc() {
        let repo = ProductionRecordRepository::new(setup_test_db());

        let later = ProductionRecord::new("M01", None, ts(9, 0), 5, 0, None);
        let earlier = ProductionRecord::new("M01", None, ts(8, 0), 5, 0, None);
        repo.insert(&later).unwrap();
        repo.insert(&earlier).unwrap();

        let records = repo.find_window("M01", ts(0, 0), ts(23, 0)).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_id, earlier.record_id);
    }
}
