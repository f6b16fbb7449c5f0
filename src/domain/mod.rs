// ==========================================
// 车间生产完整性子系统 - 领域层
// ==========================================
// 职责: 领域实体与类型定义, 不含持久化与业务编排
// ==========================================

pub mod audit;
pub mod oee;
pub mod production;
pub mod reconciliation;
pub mod runtime;
pub mod types;

// 重导出核心实体
pub use audit::{Actor, AuditEntry};
pub use oee::OeeResult;
pub use production::ProductionRecord;
pub use reconciliation::ReconciliationRecord;
pub use runtime::{DowntimeEvent, MachineRuntime};
pub use types::{
    AuditAction, DowntimeCategory, MachineStatus, ReconciliationStatus, UserRole,
};
