// ==========================================
// 车间生产完整性子系统 - 审计账本数据仓储
// ==========================================
// 对齐: audit_log 表
// 红线: 仅追加, 不提供 UPDATE/DELETE 路径
// ==========================================


mod core;
mod queries;

#[cfg(test)]
mod tests;

pub use core::AuditLogRepository;
pub use queries::AuditExportFilter;
