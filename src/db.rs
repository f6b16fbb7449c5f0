// ==========================================
// 车间生产完整性子系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout, 减少并发写入时的偶发 busy 错误
// - 统一时间戳存储格式 (定宽毫秒精度, 字典序=时间序)
// ==========================================

use rusqlite::Connection;
use std::time::Duration;

/// 默认 busy_timeout (毫秒)
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 时间戳存储格式 (定宽, 毫秒)
///
/// 定宽零填充保证 SQLite 的 TEXT ORDER BY 与时间序一致,
/// 账本查询的全序要求依赖此格式。
pub const TS_STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// 时间戳导出格式 (定宽 ISO-8601, UTC)
pub const TS_ISO_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明:
/// - foreign_keys 需要"每个连接"单独开启
/// - busy_timeout 需要"每个连接"单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 初始化子系统全部表结构 (幂等)
///
/// 键值式文档存储契约 (PersistentStore): 每张表以实体ID为主键,
/// 支持 put/get/全表扫描。
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS audit_log (
            audit_id        TEXT PRIMARY KEY,
            entity_type     TEXT NOT NULL,
            entity_id       TEXT NOT NULL,
            action          TEXT NOT NULL,
            ts              TEXT NOT NULL,
            actor_id        TEXT NOT NULL,
            actor_name      TEXT NOT NULL,
            actor_role      TEXT NOT NULL,
            before_json     TEXT,
            after_json      TEXT,
            reason          TEXT,
            ip_address      TEXT,
            device_info     TEXT,
            metadata_json   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_audit_log_entity ON audit_log (entity_type, entity_id);
        CREATE INDEX IF NOT EXISTS idx_audit_log_ts ON audit_log (ts);

        CREATE TABLE IF NOT EXISTS reconciliation_record (
            recon_id           TEXT PRIMARY KEY,
            machine_id         TEXT NOT NULL,
            job_id             TEXT NOT NULL,
            system_counter     INTEGER NOT NULL,
            physical_counter   INTEGER NOT NULL,
            variance           INTEGER NOT NULL,
            variance_percent   REAL NOT NULL,
            reason             TEXT NOT NULL,
            status             TEXT NOT NULL,
            reconciled_by_id   TEXT NOT NULL,
            reconciled_by_name TEXT NOT NULL,
            ts                 TEXT NOT NULL,
            resolved_by_id     TEXT,
            resolved_by_name   TEXT,
            resolved_at        TEXT,
            rejection_reason   TEXT
        );
        CREATE INDEX IF NOT EXISTS idx_recon_status ON reconciliation_record (status);

        CREATE TABLE IF NOT EXISTS machine_runtime (
            machine_id             TEXT PRIMARY KEY,
            machine_name           TEXT NOT NULL,
            status                 TEXT NOT NULL,
            status_since           TEXT NOT NULL,
            current_job_id         TEXT,
            current_mould_id       TEXT,
            cycle_count            INTEGER NOT NULL DEFAULT 0,
            last_cycle_time_secs   REAL,
            target_cycle_time_secs REAL
        );

        CREATE TABLE IF NOT EXISTS downtime_event (
            event_id         TEXT PRIMARY KEY,
            machine_id       TEXT NOT NULL,
            category         TEXT NOT NULL,
            reason           TEXT NOT NULL,
            start_time       TEXT NOT NULL,
            end_time         TEXT,
            duration_minutes INTEGER,
            reported_by      TEXT NOT NULL,
            resolved_by      TEXT,
            is_planned       INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_downtime_machine ON downtime_event (machine_id, start_time);

        CREATE TABLE IF NOT EXISTS production_record (
            record_id       TEXT PRIMARY KEY,
            machine_id      TEXT NOT NULL,
            job_id          TEXT,
            ts              TEXT NOT NULL,
            good_parts      INTEGER NOT NULL,
            scrap_parts     INTEGER NOT NULL,
            cycle_time_secs REAL
        );
        CREATE INDEX IF NOT EXISTS idx_production_machine_ts ON production_record (machine_id, ts);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key      TEXT NOT NULL,
            value    TEXT NOT NULL,
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    Ok(())
}
