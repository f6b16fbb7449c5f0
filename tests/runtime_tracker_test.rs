// ==========================================
// RuntimeTracker 集成测试
// ==========================================
// 测试范围:
// 1. 停机全生命周期: 开启→DOWN, 解决→IDLE, 时长截断分钟
// 2. 状态变更审计轨迹 (无约束转换, 每次变更一条 STATUS_CHANGE)
// 3. 周期记录与生产日志联动
// 4. 看板查询联动
// ==========================================

mod helpers;

use helpers::integrity_test_helper::*;

use shopfloor_integrity::domain::types::{AuditAction, DowntimeCategory, MachineStatus};
use shopfloor_integrity::engine::Clock;
use shopfloor_integrity::repository::error::RepositoryError;

#[test]
fn test_停机全生命周期联动机台状态() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    env.tracker
        .update_status("M01", MachineStatus::Running, Some("J100"), Some("MLD-7"), &operator())
        .expect("更新失败");

    env.clock.set(test_ts(1, 9, 0));
    let event = env
        .tracker
        .start_downtime("M01", DowntimeCategory::Mechanical, "合模单元卡滞", &operator(), false)
        .expect("开启失败");

    // 开启后: 机台 DOWN, 事件进行中, 看板可见
    let runtime = env
        .dashboard_api
        .machine_runtime("M01")
        .expect("查询失败")
        .expect("投影缺失");
    assert_eq!(runtime.status, MachineStatus::Down);
    assert_eq!(runtime.current_job_id.as_deref(), Some("J100"));
    assert_eq!(env.dashboard_api.active_downtimes().expect("查询失败").len(), 1);

    // 72.8 分钟后解决 → 时长截断为 72
    env.clock.set(test_ts(1, 10, 12) + chrono::Duration::seconds(48));
    let resolved = env
        .tracker
        .end_downtime(&event.event_id, &manager())
        .expect("解决失败");
    assert_eq!(resolved.duration_minutes, Some(72));
    assert_eq!(resolved.end_time, Some(env.clock.now()));
    assert_eq!(resolved.resolved_by.as_deref(), Some("mgr-001"));

    // 解决后一律 IDLE
    let runtime = env
        .tracker
        .machine_runtime("M01")
        .expect("查询失败")
        .expect("投影缺失");
    assert_eq!(runtime.status, MachineStatus::Idle);
    assert!(env.dashboard_api.active_downtimes().expect("查询失败").is_empty());

    // 历史查询包含已关闭事件
    let history = env
        .tracker
        .machine_downtimes("M01", None)
        .expect("查询失败");
    assert_eq!(history.len(), 1);
    assert!(!history[0].is_active());
}

#[test]
fn test_状态变更审计轨迹() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    let sequence = [
        MachineStatus::Setup,
        MachineStatus::Running,
        MachineStatus::Down,
        MachineStatus::Down, // 无约束: down→down 也接受
        MachineStatus::Running,
    ];
    for status in sequence {
        env.clock.advance_minutes(10);
        env.tracker
            .update_status("M01", status, Some("J100"), None, &operator())
            .expect("更新失败");
    }

    let trail = env
        .ledger
        .entries_for_entity("machine_runtime", "M01")
        .expect("查询失败");
    assert_eq!(trail.len(), 5);
    assert!(trail.iter().all(|e| e.action == AuditAction::StatusChange));

    // 降序: 最后一次转换在前, before/after 衔接
    assert_eq!(
        trail[0].after_json,
        Some(serde_json::json!({
            "status": "RUNNING",
            "job_id": "J100",
            "mould_id": null,
        }))
    );
    assert_eq!(
        trail[0].before_json,
        Some(serde_json::json!({ "status": "DOWN" }))
    );
}

#[test]
fn test_周期记录写入生产日志() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    // 无投影 → 静默忽略
    assert!(env
        .tracker
        .record_cycle("ghost", Some(24.0), 1, 0)
        .expect("记录失败")
        .is_none());

    env.tracker
        .update_status("M01", MachineStatus::Running, Some("J100"), None, &operator())
        .expect("更新失败");
    for _ in 0..3 {
        env.clock.advance_minutes(1);
        env.tracker
            .record_cycle("M01", Some(24.0), 1, 0)
            .expect("记录失败");
    }

    let runtime = env
        .tracker
        .machine_runtime("M01")
        .expect("查询失败")
        .expect("投影缺失");
    assert_eq!(runtime.cycle_count, 3);
    assert_eq!(runtime.last_cycle_time_secs, Some(24.0));

    let totals = env
        .production_repo
        .sum_window("M01", test_ts(1, 8, 0), test_ts(1, 9, 0))
        .expect("汇总失败");
    assert_eq!(totals.good_parts, 3);
    assert_eq!(totals.scrap_parts, 0);
}

#[test]
fn test_计划停机置为maintenance并可按类别过滤() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    env.tracker
        .start_downtime("M01", DowntimeCategory::Planned, "周保养", &operator(), true)
        .expect("开启失败");
    env.tracker
        .start_downtime("M02", DowntimeCategory::Electrical, "驱动报警", &operator(), false)
        .expect("开启失败");

    let m01 = env
        .tracker
        .machine_runtime("M01")
        .expect("查询失败")
        .expect("投影缺失");
    assert_eq!(m01.status, MachineStatus::Maintenance);

    let planned = env
        .dashboard_api
        .downtime_events(None, None, None, Some(DowntimeCategory::Planned))
        .expect("查询失败");
    assert_eq!(planned.len(), 1);
    assert_eq!(planned[0].machine_id, "M01");
    assert!(planned[0].is_planned);
}

#[test]
fn test_解决未知或已关闭事件报错() {
    let env = IntegrityTestEnv::new().expect("无法创建测试环境");

    assert!(matches!(
        env.tracker.end_downtime("no-such-event", &operator()),
        Err(RepositoryError::NotFound { .. })
    ));

    let event = env
        .tracker
        .start_downtime("M01", DowntimeCategory::Quality, "批次检验不合格", &operator(), false)
        .expect("开启失败");
    env.clock.advance_minutes(30);
    env.tracker
        .end_downtime(&event.event_id, &operator())
        .expect("解决失败");

    assert!(matches!(
        env.tracker.end_downtime(&event.event_id, &operator()),
        Err(RepositoryError::InvalidStateTransition { .. })
    ));
}
