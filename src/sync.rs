// ==========================================
// 车间生产完整性子系统 - 远端同步协作方
// ==========================================
// 职责: 定义审计条目远端复制的发布 trait, 实现依赖倒置
// 说明: fire-and-forget 语义 —— 失败不得阻断本地写路径,
//       重试/观测由同步层在本核心之外负责
// ==========================================

use crate::domain::audit::AuditEntry;
use std::error::Error;

// ==========================================
// RemoteSync trait
// ==========================================
pub trait RemoteSync: Send + Sync {
    /// 将已写入的审计条目推送到远端副本
    ///
    /// 失败由调用方 (Ledger) 捕获并记录, 不上抛给业务调用方。
    fn enqueue(&self, entry: &AuditEntry) -> Result<(), Box<dyn Error + Send + Sync>>;
}

// ==========================================
// NoOpRemoteSync - 空实现
// ==========================================
// 单机部署或测试环境下的默认实现
#[derive(Debug, Default)]
pub struct NoOpRemoteSync;

impl RemoteSync for NoOpRemoteSync {
    fn enqueue(&self, _entry: &AuditEntry) -> Result<(), Box<dyn Error + Send + Sync>> {
        Ok(())
    }
}
