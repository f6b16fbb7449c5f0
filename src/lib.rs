// ==========================================
// 车间生产完整性子系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 生产数据完整性内核 (审计账本 / 计数对账 / 运行时跟踪 / OEE)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 业务规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 远端同步协作方
pub mod sync;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{
    AuditAction, DowntimeCategory, MachineStatus, ReconciliationStatus, UserRole,
};

// 领域实体
pub use domain::{
    Actor, AuditEntry, DowntimeEvent, MachineRuntime, OeeResult, ProductionRecord,
    ReconciliationRecord,
};

// 引擎
pub use engine::{
    AppendOutcome, AppendRequest, Clock, FixedClock, Ledger, LedgerAppend, OeeCalculator,
    ReconciliationWorkflow, RuntimeTracker, SystemClock,
};

// 协作方
pub use sync::{NoOpRemoteSync, RemoteSync};

// 配置
pub use config::{ConfigManager, IntegrityConfig};

// API
pub use api::{ApiError, ApiResult, DashboardApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "车间生产完整性子系统";

// 数据库版本
pub const DB_VERSION: &str = "v0.1";

// ==========================================
// 预编译检查
// ==========================================

// 确保编译时所有模块可见
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
