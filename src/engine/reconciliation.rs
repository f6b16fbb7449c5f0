// ==========================================
// 车间生产完整性子系统 - 计数对账工作流引擎
// ==========================================
// 状态机: PENDING → {APPROVED, REJECTED}; 已决议状态不再转换
// 自动审批: |variance_percent| ≤ 阈值 的记录创建即 APPROVED
// 红线: 每次创建与决议都经由账本记录后才返回
// 授权: 审批/驳回的经理级权限由调用方 RBAC 校验, 本引擎信任传入的操作主体
// ==========================================

use crate::config::IntegrityConfig;
use crate::domain::audit::Actor;
use crate::domain::reconciliation::ReconciliationRecord;
use crate::domain::types::{AuditAction, ReconciliationStatus};
use crate::engine::clock::Clock;
use crate::engine::ledger::{AppendRequest, Ledger};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::reconciliation_repo::ReconciliationRepository;
use serde_json::json;
use std::sync::Arc;

/// 审计条目中对账记录的实体类型
const ENTITY_TYPE: &str = "reconciliation";

// ==========================================
// ReconciliationWorkflow - 对账工作流引擎
// ==========================================
pub struct ReconciliationWorkflow {
    recon_repo: Arc<ReconciliationRepository>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
    config: IntegrityConfig,
}

impl ReconciliationWorkflow {
    /// 创建新的对账工作流引擎
    ///
    /// # 参数
    /// - `recon_repo`: 对账记录仓储
    /// - `ledger`: 审计账本引擎
    /// - `clock`: 时钟协作方
    /// - `config`: 子系统配置 (自动审批阈值)
    pub fn new(
        recon_repo: Arc<ReconciliationRepository>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
        config: IntegrityConfig,
    ) -> Self {
        Self {
            recon_repo,
            ledger,
            clock,
            config,
        }
    }

    // ==========================================
    // 核心操作
    // ==========================================

    /// 创建对账请求
    ///
    /// # 参数
    /// - `machine_id` / `job_id`: 机台与工单
    /// - `system_counter`: 系统记录计数 (≥0)
    /// - `physical_counter`: 物理计数器读数 (≥0)
    /// - `reason`: 上报原因
    /// - `reporter`: 上报人 (操作工/调机员)
    ///
    /// # 返回
    /// - 差异幅度在阈值内 → 直接 APPROVED (自动审批, 不入待审队列)
    /// - 超出阈值 → PENDING, 待经理决议
    ///
    /// 两个分支都写入一条 RECONCILIATION 审计条目。
    pub fn create(
        &self,
        machine_id: &str,
        job_id: &str,
        system_counter: i64,
        physical_counter: i64,
        reason: &str,
        reporter: &Actor,
    ) -> RepositoryResult<ReconciliationRecord> {
        if system_counter < 0 || physical_counter < 0 {
            return Err(RepositoryError::ValidationError(format!(
                "计数不允许为负: system={system_counter}, physical={physical_counter}"
            )));
        }

        // 1. 计算差异并判定分支 (system=0 时百分比定义为 0)
        let variance = physical_counter - system_counter;
        let variance_percent =
            ReconciliationRecord::compute_variance_percent(system_counter, variance);
        let status = if variance_percent.abs() > self.config.auto_approve_threshold_percent {
            ReconciliationStatus::Pending
        } else {
            ReconciliationStatus::Approved
        };

        // 2. 落库
        let record = ReconciliationRecord::new(
            machine_id,
            job_id,
            system_counter,
            physical_counter,
            reason,
            &reporter.user_id,
            &reporter.user_name,
            self.clock.now(),
            status,
        );
        self.recon_repo.insert(&record)?;

        // 3. 记账后返回
        self.ledger.append(
            Some(reporter),
            AppendRequest::new(ENTITY_TYPE, &record.recon_id, AuditAction::Reconciliation)
                .with_before(json!({ "system_counter": system_counter }))
                .with_after(json!({
                    "physical_counter": physical_counter,
                    "variance": variance,
                    "variance_percent": variance_percent,
                    "status": status,
                }))
                .with_reason(reason),
        )?;

        tracing::info!(
            recon_id = %record.recon_id,
            machine_id,
            variance,
            variance_percent,
            status = %status,
            "对账请求已创建"
        );

        Ok(record)
    }

    /// 审批通过
    ///
    /// # 错误
    /// - `NotFound`: recon_id 不存在
    /// - `InvalidStateTransition`: 记录不在 PENDING (含并发决议落败)
    pub fn approve(&self, recon_id: &str, reviewer: &Actor) -> RepositoryResult<ReconciliationRecord> {
        self.resolve(recon_id, reviewer, ReconciliationStatus::Approved, None)
    }

    /// 审批驳回
    ///
    /// # 错误
    /// - `ValidationError`: 驳回原因为空 (记录保持 PENDING)
    /// - `NotFound` / `InvalidStateTransition`: 同 approve
    pub fn reject(
        &self,
        recon_id: &str,
        reviewer: &Actor,
        rejection_reason: &str,
    ) -> RepositoryResult<ReconciliationRecord> {
        if rejection_reason.trim().is_empty() {
            return Err(RepositoryError::ValidationError(
                "驳回必须附带非空原因".to_string(),
            ));
        }
        self.resolve(
            recon_id,
            reviewer,
            ReconciliationStatus::Rejected,
            Some(rejection_reason),
        )
    }

    /// 查询待审批队列 (最新在前)
    pub fn pending_queue(&self) -> RepositoryResult<Vec<ReconciliationRecord>> {
        self.recon_repo.find_pending()
    }

    /// 查询指定机台的对账历史 (最新在前)
    pub fn records_for_machine(&self, machine_id: &str) -> RepositoryResult<Vec<ReconciliationRecord>> {
        self.recon_repo.find_by_machine(machine_id)
    }

    /// 按ID查询单条记录
    pub fn find(&self, recon_id: &str) -> RepositoryResult<Option<ReconciliationRecord>> {
        self.recon_repo.find_by_id(recon_id)
    }

    // ==========================================
    // 内部方法
    // ==========================================

    /// 决议 PENDING 记录 (CAS, 并发决议只有一方成功)
    fn resolve(
        &self,
        recon_id: &str,
        reviewer: &Actor,
        new_status: ReconciliationStatus,
        rejection_reason: Option<&str>,
    ) -> RepositoryResult<ReconciliationRecord> {
        // 1. 预检: 未知ID与非 PENDING 状态分别报错
        let record = self
            .recon_repo
            .find_by_id(recon_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "ReconciliationRecord".to_string(),
                id: recon_id.to_string(),
            })?;
        if record.status != ReconciliationStatus::Pending {
            return Err(RepositoryError::InvalidStateTransition {
                from: record.status.to_string(),
                to: new_status.to_string(),
            });
        }

        // 2. CAS 转换; 0 行意味着并发决议抢先, 同样按非法状态转换上报
        let resolved_at = self.clock.now();
        let swapped = self.recon_repo.resolve(
            recon_id,
            new_status,
            &reviewer.user_id,
            &reviewer.user_name,
            resolved_at,
            rejection_reason,
        )?;
        if !swapped {
            return Err(RepositoryError::InvalidStateTransition {
                from: "RESOLVED".to_string(),
                to: new_status.to_string(),
            });
        }

        // 3. 记账后返回
        let action = match new_status {
            ReconciliationStatus::Approved => AuditAction::Approval,
            _ => AuditAction::Rejection,
        };
        let mut request = AppendRequest::new(ENTITY_TYPE, recon_id, action)
            .with_before(json!({ "status": ReconciliationStatus::Pending }))
            .with_after(json!({
                "status": new_status,
                "rejection_reason": rejection_reason,
            }));
        if let Some(reason) = rejection_reason {
            request = request.with_reason(reason);
        }
        self.ledger.append(Some(reviewer), request)?;

        let mut resolved = record;
        resolved.status = new_status;
        resolved.resolved_by_id = Some(reviewer.user_id.clone());
        resolved.resolved_by_name = Some(reviewer.user_name.clone());
        resolved.resolved_at = Some(resolved_at);
        resolved.rejection_reason = rejection_reason.map(|r| r.to_string());
        Ok(resolved)
    }
}
