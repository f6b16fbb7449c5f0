// ==========================================
// 车间生产完整性子系统 - 计数对账领域模型
// ==========================================
// 红线: 状态只允许 PENDING → APPROVED / PENDING → REJECTED
// 红线: |variance_percent| ≤ 阈值 的记录在创建时直接 APPROVED
// ==========================================

use crate::domain::types::ReconciliationStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ReconciliationRecord - 对账记录
// ==========================================
// 对齐: reconciliation_record 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationRecord {
    // ===== 主键 =====
    pub recon_id: String,  // 记录ID (UUID)
    pub machine_id: String, // 机台ID
    pub job_id: String,     // 工单ID

    // ===== 计数 =====
    pub system_counter: i64,   // 系统记录计数 (≥0)
    pub physical_counter: i64, // 物理计数器读数 (≥0)
    pub variance: i64,         // 差异 = physical - system
    pub variance_percent: f64, // 差异百分比 (system=0 时定义为 0)

    // ===== 审批 =====
    pub reason: String,                  // 上报原因
    pub status: ReconciliationStatus,    // 状态
    pub reconciled_by_id: String,        // 上报人ID
    pub reconciled_by_name: String,      // 上报人姓名
    pub ts: NaiveDateTime,               // 上报时间戳

    // ===== 决议 (仅已决议记录) =====
    pub resolved_by_id: Option<String>,   // 决议人ID
    pub resolved_by_name: Option<String>, // 决议人姓名
    pub resolved_at: Option<NaiveDateTime>, // 决议时间
    pub rejection_reason: Option<String>, // 驳回原因 (仅 REJECTED)
}

impl ReconciliationRecord {
    /// 计算差异百分比
    ///
    /// system_counter = 0 时定义为 0, 避免除零。
    pub fn compute_variance_percent(system_counter: i64, variance: i64) -> f64 {
        if system_counter == 0 {
            0.0
        } else {
            variance as f64 / system_counter as f64 * 100.0
        }
    }

    /// 创建新的对账记录 (状态由工作流根据阈值判定)
    pub fn new(
        machine_id: &str,
        job_id: &str,
        system_counter: i64,
        physical_counter: i64,
        reason: &str,
        reporter_id: &str,
        reporter_name: &str,
        ts: NaiveDateTime,
        status: ReconciliationStatus,
    ) -> Self {
        let variance = physical_counter - system_counter;
        Self {
            recon_id: Uuid::new_v4().to_string(),
            machine_id: machine_id.to_string(),
            job_id: job_id.to_string(),
            system_counter,
            physical_counter,
            variance,
            variance_percent: Self::compute_variance_percent(system_counter, variance),
            reason: reason.to_string(),
            status,
            reconciled_by_id: reporter_id.to_string(),
            reconciled_by_name: reporter_name.to_string(),
            ts,
            resolved_by_id: None,
            resolved_by_name: None,
            resolved_at: None,
            rejection_reason: None,
        }
    }
}
