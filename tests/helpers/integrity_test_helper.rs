// ==========================================
// 完整性子系统集成测试辅助工具
// ==========================================
// 职责: 构建文件库 + 全套引擎/API 的测试环境, 时钟可注入
// ==========================================

use std::sync::{Arc, Mutex};

use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::Connection;
use tempfile::NamedTempFile;

use shopfloor_integrity::api::DashboardApi;
use shopfloor_integrity::config::IntegrityConfig;
use shopfloor_integrity::domain::audit::Actor;
use shopfloor_integrity::domain::types::UserRole;
use shopfloor_integrity::engine::clock::{Clock, FixedClock};
use shopfloor_integrity::engine::ledger::Ledger;
use shopfloor_integrity::engine::oee::OeeCalculator;
use shopfloor_integrity::engine::reconciliation::ReconciliationWorkflow;
use shopfloor_integrity::engine::runtime_tracker::RuntimeTracker;
use shopfloor_integrity::repository::audit_repo::AuditLogRepository;
use shopfloor_integrity::repository::downtime_repo::DowntimeEventRepository;
use shopfloor_integrity::repository::production_repo::ProductionRecordRepository;
use shopfloor_integrity::repository::reconciliation_repo::ReconciliationRepository;
use shopfloor_integrity::repository::runtime_repo::MachineRuntimeRepository;
use shopfloor_integrity::sync::NoOpRemoteSync;

// ==========================================
// IntegrityTestEnv - 集成测试环境
// ==========================================

/// 集成测试环境
///
/// 文件库保证跨连接可见性; 时钟为 FixedClock, 由测试自行拨动。
pub struct IntegrityTestEnv {
    pub ledger: Arc<Ledger>,
    pub workflow: Arc<ReconciliationWorkflow>,
    pub tracker: Arc<RuntimeTracker>,
    pub oee: Arc<OeeCalculator>,
    pub dashboard_api: Arc<DashboardApi>,

    // Repository层（用于测试数据准备）
    pub audit_repo: Arc<AuditLogRepository>,
    pub downtime_repo: Arc<DowntimeEventRepository>,
    pub production_repo: Arc<ProductionRecordRepository>,
    pub runtime_repo: Arc<MachineRuntimeRepository>,
    pub reconciliation_repo: Arc<ReconciliationRepository>,

    pub clock: Arc<FixedClock>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl IntegrityTestEnv {
    /// 创建测试环境, 时钟停在 2026-03-01 08:00:00
    pub fn new() -> anyhow::Result<Self> {
        Self::new_at(test_ts(1, 8, 0))
    }

    /// 创建测试环境并指定时钟起点
    pub fn new_at(now: NaiveDateTime) -> anyhow::Result<Self> {
        let temp_file = NamedTempFile::new()?;
        let db_path = temp_file.path().to_string_lossy().to_string();

        let conn = shopfloor_integrity::db::open_sqlite_connection(&db_path)?;
        shopfloor_integrity::db::init_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let clock = Arc::new(FixedClock::new(now));
        let config = IntegrityConfig::default();

        let audit_repo = Arc::new(AuditLogRepository::new(Arc::clone(&conn)));
        let downtime_repo = Arc::new(DowntimeEventRepository::new(Arc::clone(&conn)));
        let production_repo = Arc::new(ProductionRecordRepository::new(Arc::clone(&conn)));
        let runtime_repo = Arc::new(MachineRuntimeRepository::new(Arc::clone(&conn)));
        let reconciliation_repo = Arc::new(ReconciliationRepository::new(Arc::clone(&conn)));

        let ledger = Arc::new(Ledger::new(
            Arc::clone(&audit_repo),
            Arc::new(NoOpRemoteSync),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let workflow = Arc::new(ReconciliationWorkflow::new(
            Arc::clone(&reconciliation_repo),
            Arc::clone(&ledger),
            Arc::clone(&clock) as Arc<dyn Clock>,
            config.clone(),
        ));
        let tracker = Arc::new(RuntimeTracker::new(
            Arc::clone(&runtime_repo),
            Arc::clone(&downtime_repo),
            Arc::clone(&production_repo),
            Arc::clone(&ledger),
            Arc::clone(&clock) as Arc<dyn Clock>,
        ));
        let oee = Arc::new(OeeCalculator::new(
            Arc::clone(&downtime_repo),
            Arc::clone(&production_repo),
            Arc::clone(&runtime_repo),
            Arc::clone(&clock) as Arc<dyn Clock>,
            config,
        ));
        let dashboard_api = Arc::new(DashboardApi::new(
            Arc::clone(&ledger),
            Arc::clone(&workflow),
            Arc::clone(&tracker),
            Arc::clone(&oee),
        ));

        Ok(Self {
            ledger,
            workflow,
            tracker,
            oee,
            dashboard_api,
            audit_repo,
            downtime_repo,
            production_repo,
            runtime_repo,
            reconciliation_repo,
            clock,
            _temp_file: temp_file,
        })
    }
}

// ==========================================
// 测试数据辅助
// ==========================================

/// 2026 年 3 月 d 日 h:m:0
pub fn test_ts(d: u32, h: u32, m: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2026, 3, d)
        .expect("固定测试日期")
        .and_hms_opt(h, m, 0)
        .expect("固定测试时间")
}

/// 操作工测试账号
pub fn operator() -> Actor {
    Actor::new("op-001", "张三", UserRole::Operator)
}

/// 经理测试账号
pub fn manager() -> Actor {
    Actor::new("mgr-001", "王经理", UserRole::Manager)
}
