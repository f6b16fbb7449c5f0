// ==========================================
// 车间生产完整性子系统 - 引擎层
// ==========================================
// 审计账本 / 对账工作流 / 运行时跟踪 / OEE 计算
// 引擎持有仓储与协作方 (Clock, RemoteSync), 状态变更先记账再返回
// ==========================================

pub mod clock;
pub mod ledger;
pub mod oee;
pub mod reconciliation;
pub mod runtime_tracker;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ledger::{AppendOutcome, AppendRequest, Ledger, LedgerAppend};
pub use oee::OeeCalculator;
pub use reconciliation::ReconciliationWorkflow;
pub use runtime_tracker::RuntimeTracker;
