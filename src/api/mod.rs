// ==========================================
// 车间生产完整性子系统 - API 层
// ==========================================
// 职责: 提供面向 UI/看板的只读查询接口
// ==========================================

pub mod error;
pub mod dashboard_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use dashboard_api::DashboardApi;
