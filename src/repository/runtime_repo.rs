// ==========================================
// 车间生产完整性子系统 - 机台运行时投影仓储
// ==========================================
// 对齐: machine_runtime 表 (machine_id 主键, 整行覆写)
// 红线: Repository 不做业务逻辑, 只做数据映射
// ==========================================

use crate::db::TS_STORAGE_FORMAT;
use crate::domain::runtime::MachineRuntime;
use crate::domain::types::MachineStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// MachineRuntimeRepository - 机台状态投影仓储
// ==========================================
pub struct MachineRuntimeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MachineRuntimeRepository {
    /// 创建新的机台状态投影仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 整行覆写投影 (不存在则插入)
    ///
    /// 投影是"当前状态", 按机台主键原地覆写, 永不删除。
    pub fn upsert(&self, runtime: &MachineRuntime) -> RepositoryResult<()> {
        let conn = self.get_conn()?;

        conn.execute(
            r#"
            INSERT INTO machine_runtime (
                machine_id, machine_name, status, status_since,
                current_job_id, current_mould_id,
                cycle_count, last_cycle_time_secs, target_cycle_time_secs
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT (machine_id) DO UPDATE SET
                machine_name = ?2,
                status = ?3,
                status_since = ?4,
                current_job_id = ?5,
                current_mould_id = ?6,
                cycle_count = ?7,
                last_cycle_time_secs = ?8,
                target_cycle_time_secs = ?9
            "#,
            params![
                runtime.machine_id,
                runtime.machine_name,
                runtime.status.as_str(),
                runtime.status_since.format(TS_STORAGE_FORMAT).to_string(),
                runtime.current_job_id,
                runtime.current_mould_id,
                runtime.cycle_count,
                runtime.last_cycle_time_secs,
                runtime.target_cycle_time_secs,
            ],
        )?;

        Ok(())
    }

    /// 按机台ID查询投影
    pub fn find_by_machine(&self, machine_id: &str) -> RepositoryResult<Option<MachineRuntime>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT machine_id, machine_name, status, status_since,
                   current_job_id, current_mould_id,
                   cycle_count, last_cycle_time_secs, target_cycle_time_secs
            FROM machine_runtime
            WHERE machine_id = ?
            "#,
        )?;

        match stmt.query_row(params![machine_id], |row| Self::map_row(row)) {
            Ok(runtime) => Ok(Some(runtime)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询全部机台投影 (看板用)
    pub fn find_all(&self) -> RepositoryResult<Vec<MachineRuntime>> {
        let conn = self.get_conn()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT machine_id, machine_name, status, status_since,
                   current_job_id, current_mould_id,
                   cycle_count, last_cycle_time_secs, target_cycle_time_secs
            FROM machine_runtime
            ORDER BY machine_id
            "#,
        )?;

        let runtimes = stmt
            .query_map([], |row| Self::map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(runtimes)
    }

    /// 将数据库行映射为 MachineRuntime 实体
    fn map_row(row: &Row) -> SqliteResult<MachineRuntime> {
        let status_str: String = row.get(2)?;
        let status = MachineStatus::parse(&status_str).ok_or_else(|| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                format!("未知机台状态: {status_str}").into(),
            )
        })?;

        let status_since_str: String = row.get(3)?;
        let status_since = NaiveDateTime::parse_from_str(&status_since_str, TS_STORAGE_FORMAT)
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    3,
                    rusqlite::types::Type::Text,
                    Box::new(e),
                )
            })?;

        Ok(MachineRuntime {
            machine_id: row.get(0)?,
            machine_name: row.get(1)?,
            status,
            status_since,
            current_job_id: row.get(4)?,
            current_mould_id: row.get(5)?,
            cycle_count: row.get(6)?,
            last_cycle_time_secs: row.get(7)?,
            target_cycle_time_secs: row.get(8)?,
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

    fn ts(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 3, 1)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_upsert_overwrites_whole_row() {
        let repo = MachineRuntimeRepository::new(setup_test_db());

        let mut runtime = MachineRuntime::initial("M01", MachineStatus::Idle, ts(8));
        repo.upsert(&runtime).unwrap();

        runtime.status = MachineStatus::Running;
        runtime.status_since = ts(9);
        runtime.current_job_id = Some("J100".to_string());
        runtime.cycle_count = 42;
        runtime.last_cycle_time_secs = Some(24.5);
        repo.upsert(&runtime).unwrap();

        let found = repo.find_by_machine("M01").unwrap().unwrap();
        assert_eq!(found, runtime);
    }

    #[test]
    fn test_find_missing_machine_returns_none() {
        let repo = MachineRuntimeRepository::new(setup_test_db());
        assert!(repo.find_by_machine("nope").unwrap().is_none());
    }

    #[test]
    fn test_find_all() {
        let repo = MachineRuntimeRepository::new(setup_test_db());

        repo.upsert(&MachineRuntime::initial("M02", MachineStatus::Down, ts(8)))
            .unwrap();
        repo.upsert(&MachineRuntime::initial("M01", MachineStatus::Idle, ts(8)))
            .unwrap();

        let all = repo.find_all().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].machine_id, "M01");
        assert_eq!(all[1].machine_id, "M02");
    }
}
