use super::{AuditExportFilter, AuditLogRepository};
use crate::domain::audit::{Actor, AuditEntry};
use crate::domain::types::{AuditAction, UserRole};
use chrono::NaiveDateTime;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

fn setup_test_db() -> Arc<Mutex<Connection>> {
    let conn = Connection::open_in_memory().unwrap();
    crate::db::configure_sqlite_connection(&conn).unwrap();
    crate::db::init_schema(&conn).unwrap();
    Arc::new(Mutex::new(conn))
}

fn ts(s: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
}

fn make_entry(entity_id: &str, action: AuditAction, at: &str) -> AuditEntry {
    let actor = Actor::new("u1", "张三", UserRole::Setter);
    AuditEntry::new("machine", entity_id, action, &actor, ts(at))
}

#[test]
fn test_insert_and_find_by_entity() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    let entry = make_entry("M01", AuditAction::StatusChange, "2026-03-01 08:00:00")
        .with_before(&serde_json::json!({"status": "IDLE"}))
        .with_after(&serde_json::json!({"status": "RUNNING"}));
    let id = repo.insert(&entry).unwrap();
    assert_eq!(id, entry.audit_id);

    let found = repo.find_by_entity("machine", "M01").unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0], entry);
}

#[test]
fn test_find_by_entity_sorted_desc() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    let early = make_entry("M01", AuditAction::Create, "2026-03-01 08:00:00");
    let late = make_entry("M01", AuditAction::Update, "2026-03-01 09:00:00");
    repo.insert(&early).unwrap();
    repo.insert(&late).unwrap();

    let found = repo.find_by_entity("machine", "M01").unwrap();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].audit_id, late.audit_id);
    assert_eq!(found[1].audit_id, early.audit_id);
}

#[test]
fn test_find_by_user_with_limit_truncates_after_sort() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    for i in 1..=5 {
        let entry = make_entry("M01", AuditAction::Update, &format!("2026-03-01 0{i}:00:00"));
        repo.insert(&entry).unwrap();
    }

    let all = repo.find_by_user("u1", None).unwrap();
    assert_eq!(all.len(), 5);

    let limited = repo.find_by_user("u1", Some(2)).unwrap();
    assert_eq!(limited.len(), 2);
    // limit 在排序之后截断, 留下的是最新两条
    assert_eq!(limited[0].ts, ts("2026-03-01 05:00:00"));
    assert_eq!(limited[1].ts, ts("2026-03-01 04:00:00"));
}

#[test]
fn test_find_by_action_and_overrides() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    let e1 = make_entry("J01", AuditAction::Override, "2026-03-01 08:00:00")
        .with_reason("计数器漂移人工修正");
    let e2 = make_entry("J01", AuditAction::Update, "2026-03-01 08:30:00");
    repo.insert(&e1).unwrap();
    repo.insert(&e2).unwrap();

    let overrides = repo.find_overrides(None).unwrap();
    assert_eq!(overrides.len(), 1);
    assert_eq!(overrides[0].audit_id, e1.audit_id);

    let updates = repo.find_by_action(AuditAction::Update, Some(10)).unwrap();
    assert_eq!(updates.len(), 1);
}

#[test]
fn test_find_by_time_range() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    repo.insert(&make_entry("M01", AuditAction::Update, "2026-03-01 07:00:00"))
        .unwrap();
    repo.insert(&make_entry("M01", AuditAction::Update, "2026-03-01 08:30:00"))
        .unwrap();
    repo.insert(&make_entry("M01", AuditAction::Update, "2026-03-01 10:00:00"))
        .unwrap();

    let found = repo
        .find_by_time_range(ts("2026-03-01 08:00:00"), ts("2026-03-01 09:00:00"))
        .unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].ts, ts("2026-03-01 08:30:00"));
}

#[test]
fn test_find_recent_is_idempotent() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    for i in 1..=4 {
        repo.insert(&make_entry("M01", AuditAction::Update, &format!("2026-03-01 0{i}:00:00")))
            .unwrap();
    }

    let first = repo.find_recent(3).unwrap();
    let second = repo.find_recent(3).unwrap();
    assert_eq!(first.len(), 3);
    // 无写入间隔的重复查询必须返回完全一致的有序结果
    assert_eq!(first, second);
}

#[test]
fn test_same_timestamp_tie_break_is_deterministic() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    // 同一毫秒写入的两条, 以 audit_id 平局裁决
    let e1 = make_entry("M01", AuditAction::Update, "2026-03-01 08:00:00");
    let e2 = make_entry("M01", AuditAction::Update, "2026-03-01 08:00:00");
    repo.insert(&e1).unwrap();
    repo.insert(&e2).unwrap();

    let first = repo.find_recent(10).unwrap();
    let second = repo.find_recent(10).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_find_filtered() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    let actor = Actor::new("u2", "李四", UserRole::Manager);
    let machine_entry = AuditEntry::new(
        "machine",
        "M01",
        AuditAction::StatusChange,
        &actor,
        ts("2026-03-01 08:00:00"),
    );
    let recon_entry = AuditEntry::new(
        "reconciliation",
        "R01",
        AuditAction::Reconciliation,
        &actor,
        ts("2026-03-01 09:00:00"),
    );
    repo.insert(&machine_entry).unwrap();
    repo.insert(&recon_entry).unwrap();

    // 按实体类型过滤
    let filter = AuditExportFilter {
        entity_type: Some("reconciliation".to_string()),
        ..Default::default()
    };
    let found = repo.find_filtered(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].audit_id, recon_entry.audit_id);

    // 按时间过滤
    let filter = AuditExportFilter {
        end: Some(ts("2026-03-01 08:30:00")),
        ..Default::default()
    };
    let found = repo.find_filtered(&filter).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].audit_id, machine_entry.audit_id);

    // 空过滤 = 全量
    let found = repo.find_filtered(&AuditExportFilter::default()).unwrap();
    assert_eq!(found.len(), 2);
}

#[test]
fn test_entry_round_trip_preserves_all_fields() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    let entry = make_entry("J07", AuditAction::Override, "2026-03-01 08:00:00")
        .with_before(&serde_json::json!({"count": 980}))
        .with_after(&serde_json::json!({"count": 1000}))
        .with_reason("物理盘点修正")
        .with_context(Some("10.2.0.15".to_string()), Some("HMI-3".to_string()))
        .with_metadata(&serde_json::json!({"shift": "night"}));

    repo.insert(&entry).unwrap();
    let found = repo.find_by_entity("machine", "J07").unwrap();
    assert_eq!(found.len(), 1);
    // 全字段逐一相等 (含快照与上下文)
    assert_eq!(found[0], entry);
}

#[test]
fn test_count_by_user() {
    let conn = setup_test_db();
    let repo = AuditLogRepository::new(conn);

    repo.insert(&make_entry("M01", AuditAction::Update, "2026-03-01 08:00:00"))
        .unwrap();
    repo.insert(&make_entry("M01", AuditAction::Update, "2026-03-01 09:00:00"))
        .unwrap();

    assert_eq!(repo.count_by_user("u1").unwrap(), 2);
    assert_eq!(repo.count_by_user("nobody").unwrap(), 0);
}
