// ==========================================
// 车间生产完整性子系统 - 看板 API
// ==========================================
// 职责: 面向 UI/看板的只读查询门面, 聚合引擎层查询并做入参校验
// 架构: API 层 → 引擎层 → 仓储层
// 写路径 (状态变更/对账决议) 不经此门面, 由调用方直接持有对应引擎
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::domain::audit::AuditEntry;
use crate::domain::oee::OeeResult;
use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::runtime::{DowntimeEvent, MachineRuntime};
use crate::domain::types::DowntimeCategory;
use crate::engine::ledger::Ledger;
use crate::engine::oee::OeeCalculator;
use crate::engine::reconciliation::ReconciliationWorkflow;
use crate::engine::runtime_tracker::RuntimeTracker;
use crate::repository::audit_repo::AuditExportFilter;
use chrono::NaiveDateTime;
use std::sync::Arc;

// ==========================================
// DashboardApi - 看板 API
// ==========================================
pub struct DashboardApi {
    ledger: Arc<Ledger>,
    reconciliation: Arc<ReconciliationWorkflow>,
    tracker: Arc<RuntimeTracker>,
    oee: Arc<OeeCalculator>,
}

impl DashboardApi {
    /// 创建新的DashboardApi实例
    pub fn new(
        ledger: Arc<Ledger>,
        reconciliation: Arc<ReconciliationWorkflow>,
        tracker: Arc<RuntimeTracker>,
        oee: Arc<OeeCalculator>,
    ) -> Self {
        Self {
            ledger,
            reconciliation,
            tracker,
            oee,
        }
    }

    // ==========================================
    // 机台状态
    // ==========================================

    /// 全部机台状态总览
    pub fn machine_overview(&self) -> ApiResult<Vec<MachineRuntime>> {
        Ok(self.tracker.all_runtimes()?)
    }

    /// 单台机当前状态
    ///
    /// # 返回
    /// - `Ok(None)`: 机台尚无状态投影 (从未上报)
    pub fn machine_runtime(&self, machine_id: &str) -> ApiResult<Option<MachineRuntime>> {
        Self::require_non_blank(machine_id, "机台ID")?;
        Ok(self.tracker.machine_runtime(machine_id)?)
    }

    // ==========================================
    // 停机
    // ==========================================

    /// 进行中的停机事件
    pub fn active_downtimes(&self) -> ApiResult<Vec<DowntimeEvent>> {
        Ok(self.tracker.active_downtimes()?)
    }

    /// 停机事件多条件查询
    pub fn downtime_events(
        &self,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
        machine_id: Option<&str>,
        category: Option<DowntimeCategory>,
    ) -> ApiResult<Vec<DowntimeEvent>> {
        if let (Some(s), Some(u)) = (since, until) {
            if u < s {
                return Err(ApiError::InvalidInput(format!(
                    "时间范围非法: since={s} > until={u}"
                )));
            }
        }
        Ok(self.tracker.downtime_events(since, until, machine_id, category)?)
    }

    // ==========================================
    // 对账
    // ==========================================

    /// 待审批对账队列
    pub fn pending_reconciliations(&self) -> ApiResult<Vec<ReconciliationRecord>> {
        Ok(self.reconciliation.pending_queue()?)
    }

    /// 指定机台的对账历史
    pub fn machine_reconciliations(&self, machine_id: &str) -> ApiResult<Vec<ReconciliationRecord>> {
        Self::require_non_blank(machine_id, "机台ID")?;
        Ok(self.reconciliation.records_for_machine(machine_id)?)
    }

    // ==========================================
    // 审计
    // ==========================================

    /// 最近的审计条目
    pub fn recent_audit_entries(&self, limit: i64) -> ApiResult<Vec<AuditEntry>> {
        if limit <= 0 {
            return Err(ApiError::InvalidInput(format!("limit 必须为正: {limit}")));
        }
        Ok(self.ledger.recent_entries(limit)?)
    }

    /// 单实体的完整审计轨迹
    pub fn entity_audit_trail(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> ApiResult<Vec<AuditEntry>> {
        Self::require_non_blank(entity_type, "实体类型")?;
        Self::require_non_blank(entity_id, "实体ID")?;
        Ok(self.ledger.entries_for_entity(entity_type, entity_id)?)
    }

    /// 审计导出 (时间升序)
    pub fn export_audit(&self, filter: &AuditExportFilter) -> ApiResult<Vec<AuditEntry>> {
        Ok(self.ledger.export(filter)?)
    }

    // ==========================================
    // OEE
    // ==========================================

    /// 指定窗口的 OEE 分解
    pub fn machine_oee(
        &self,
        machine_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        target_cycle_time_override: Option<f64>,
    ) -> ApiResult<OeeResult> {
        Self::require_non_blank(machine_id, "机台ID")?;
        if window_end <= window_start {
            return Err(ApiError::InvalidInput(format!(
                "窗口非法: start={window_start} end={window_end}"
            )));
        }
        Ok(self
            .oee
            .calculate(machine_id, window_start, window_end, target_cycle_time_override)?)
    }

    /// 当前班次至今的 OEE
    pub fn current_shift_oee(&self, machine_id: &str) -> ApiResult<OeeResult> {
        Self::require_non_blank(machine_id, "机台ID")?;
        Ok(self.oee.calculate_for_current_shift(machine_id)?)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    fn require_non_blank(value: &str, field: &str) -> ApiResult<()> {
        if value.trim().is_empty() {
            return Err(ApiError::InvalidInput(format!("{field}不能为空")));
        }
        Ok(())
    }
}
