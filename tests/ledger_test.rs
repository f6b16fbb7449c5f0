// ==========================================
// Ledger 集成测试
// ==========================================
// 测试范围:
// 1. OVERRIDE 原因红线: 空原因拒绝且不产生条目
// 2. 操作主体回退: None → 系统合成身份
// 3. 持久化结果: Recorded / is_locally_durable
// 4. 查询幂等性与导出全序
// 5. 条目序列化往返
// ==========================================

mod helpers;

use helpers::integrity_test_helper::*;

use shopfloor_integrity::domain::audit::AuditEntry;
use shopfloor_integrity::domain::types::AuditAction;
use shopfloor_integrity::engine::ledger::{AppendOutcome, AppendRequest};
use shopfloor_integrity::repository::audit_repo::AuditExportFilter;
use shopfloor_integrity::repository::error::RepositoryError;

#[test]
fn test_override_空原因被拒绝且无条目() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    for reason in [None, Some(""), Some("   ")] {
        let mut request = AppendRequest::new("job", "J100", AuditAction::Override);
        if let Some(r) = reason {
            request = request.with_reason(r);
        }
        let result = env.ledger.append(Some(&operator()), request);
        assert!(matches!(result, Err(RepositoryError::ValidationError(_))));
    }

    // 未发生任何写入
    assert!(env.ledger.recent_entries(10).expect("查询失败").is_empty());
}

#[test]
fn test_override_带原因成功记录() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    let appended = env
        .ledger
        .append(
            Some(&manager()),
            AppendRequest::new("job", "J100", AuditAction::Override)
                .with_reason("产量人工修正: 计数器漂移"),
        )
        .expect("追加失败");
    assert_eq!(appended.outcome, AppendOutcome::Recorded);
    assert!(appended.is_locally_durable());

    let overrides = env.ledger.override_entries(None).expect("查询失败");
    assert_eq!(overrides.len(), 1);
    assert_eq!(
        overrides[0].reason.as_deref(),
        Some("产量人工修正: 计数器漂移")
    );
}

#[test]
fn test_无操作主体回退到系统身份() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    let appended = env
        .ledger
        .append(None, AppendRequest::new("job", "J1", AuditAction::Update))
        .expect("追加失败");
    assert_eq!(appended.entry.actor_id, "system");

    let entries = env.ledger.entries_by_user("system", None).expect("查询失败");
    assert_eq!(entries.len(), 1);
}

#[test]
fn test_recent_查询幂等() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    for i in 0..5 {
        env.clock.advance_minutes(1);
        env.ledger
            .append(
                Some(&operator()),
                AppendRequest::new("job", &format!("J{i}"), AuditAction::Create),
            )
            .expect("追加失败");
    }

    let first = env.ledger.recent_entries(3).expect("查询失败");
    let second = env.ledger.recent_entries(3).expect("查询失败");
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);
    // 降序: 最新写入在前
    assert_eq!(first[0].entity_id, "J4");
}

#[test]
fn test_导出按时间升序() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    for i in 0..4 {
        env.clock.advance_minutes(7);
        env.ledger
            .append(
                Some(&operator()),
                AppendRequest::new("machine_runtime", &format!("M0{i}"), AuditAction::StatusChange),
            )
            .expect("追加失败");
    }
    env.ledger
        .append(
            Some(&operator()),
            AppendRequest::new("job", "J1", AuditAction::Create),
        )
        .expect("追加失败");

    let filter = AuditExportFilter {
        entity_type: Some("machine_runtime".to_string()),
        ..Default::default()
    };
    let exported = env.ledger.export(&filter).expect("导出失败");
    assert_eq!(exported.len(), 4);
    for pair in exported.windows(2) {
        assert!(pair[0].ts <= pair[1].ts);
    }
    assert_eq!(exported[0].entity_id, "M00");
}

#[test]
fn test_条目序列化往返字段相等() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    env.ledger
        .append(
            Some(&manager()),
            AppendRequest::new("reconciliation", "R1", AuditAction::Approval)
                .with_before(serde_json::json!({ "status": "PENDING" }))
                .with_after(serde_json::json!({ "status": "APPROVED" }))
                .with_reason("例行审批")
                .with_metadata(serde_json::json!({ "shift": "早班" })),
        )
        .expect("追加失败");

    let stored = env
        .ledger
        .entries_for_entity("reconciliation", "R1")
        .expect("查询失败");
    assert_eq!(stored.len(), 1);

    let json = serde_json::to_string(&stored[0]).expect("序列化失败");
    let decoded: AuditEntry = serde_json::from_str(&json).expect("反序列化失败");
    assert_eq!(decoded, stored[0]);
    assert_eq!(
        decoded.before_json,
        Some(serde_json::json!({ "status": "PENDING" }))
    );
    assert_eq!(
        decoded.after_json,
        Some(serde_json::json!({ "status": "APPROVED" }))
    );
}
