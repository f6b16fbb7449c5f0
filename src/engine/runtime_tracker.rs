// ==========================================
// 车间生产完整性子系统 - 机台运行时跟踪引擎
// ==========================================
// 职责: 维护每台机的"当前状态"投影与停机事件生命周期
// 红线: 每次状态变更先经账本 (STATUS_CHANGE) 再返回
// 状态转换: 不设约束 —— 任意状态可跟任意状态, 异常留给账本事后分析
// 并发: 停机关闭走仓储 CAS; 投影覆写未加键级锁, 与上游单写者约定一致
// ==========================================

use crate::domain::audit::Actor;
use crate::domain::production::ProductionRecord;
use crate::domain::runtime::{DowntimeEvent, MachineRuntime};
use crate::domain::types::{AuditAction, DowntimeCategory, MachineStatus};
use crate::engine::clock::Clock;
use crate::engine::ledger::{AppendRequest, Ledger};
use crate::repository::downtime_repo::DowntimeEventRepository;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::production_repo::ProductionRecordRepository;
use crate::repository::runtime_repo::MachineRuntimeRepository;
use chrono::NaiveDateTime;
use serde_json::json;
use std::sync::Arc;

/// 审计条目中机台投影的实体类型
const ENTITY_TYPE: &str = "machine_runtime";

// ==========================================
// RuntimeTracker - 机台运行时跟踪引擎
// ==========================================
pub struct RuntimeTracker {
    runtime_repo: Arc<MachineRuntimeRepository>,
    downtime_repo: Arc<DowntimeEventRepository>,
    production_repo: Arc<ProductionRecordRepository>,
    ledger: Arc<Ledger>,
    clock: Arc<dyn Clock>,
}

impl RuntimeTracker {
    /// 创建新的机台运行时跟踪引擎
    pub fn new(
        runtime_repo: Arc<MachineRuntimeRepository>,
        downtime_repo: Arc<DowntimeEventRepository>,
        production_repo: Arc<ProductionRecordRepository>,
        ledger: Arc<Ledger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            runtime_repo,
            downtime_repo,
            production_repo,
            ledger,
            clock,
        }
    }

    // ==========================================
    // 状态投影
    // ==========================================

    /// 更新机台状态 (整行覆写)
    ///
    /// # 参数
    /// - `new_status`: 目标状态, 不做转换校验 (down→down 也接受, 仅刷新起始时间)
    /// - `job_id` / `mould_id`: 当前工单/模具, 按传入值覆写 (None 即清空)
    /// - `actor`: 操作主体
    ///
    /// 机台首次出现时懒创建投影; 周期计数等累计字段跨状态变更保留。
    pub fn update_status(
        &self,
        machine_id: &str,
        new_status: MachineStatus,
        job_id: Option<&str>,
        mould_id: Option<&str>,
        actor: &Actor,
    ) -> RepositoryResult<MachineRuntime> {
        let now = self.clock.now();
        let previous = self.runtime_repo.find_by_machine(machine_id)?;
        let previous_status = previous
            .as_ref()
            .map(|r| r.status)
            .unwrap_or(MachineStatus::Unknown);

        let mut runtime = previous
            .unwrap_or_else(|| MachineRuntime::initial(machine_id, new_status, now));
        runtime.status = new_status;
        runtime.status_since = now;
        runtime.current_job_id = job_id.map(|s| s.to_string());
        runtime.current_mould_id = mould_id.map(|s| s.to_string());
        self.runtime_repo.upsert(&runtime)?;

        self.ledger.append(
            Some(actor),
            AppendRequest::new(ENTITY_TYPE, machine_id, AuditAction::StatusChange)
                .with_before(json!({ "status": previous_status }))
                .with_after(json!({
                    "status": new_status,
                    "job_id": job_id,
                    "mould_id": mould_id,
                })),
        )?;

        tracing::debug!(
            machine_id,
            from = %previous_status,
            to = %new_status,
            "机台状态已更新"
        );

        Ok(runtime)
    }

    /// 记录一次生产周期
    ///
    /// 投影尚不存在时静默忽略 (返回 `Ok(None)`, 不写账本, 不报错);
    /// 否则累加周期计数、刷新最近周期时间, 并向生产日志追加一条计数记录。
    pub fn record_cycle(
        &self,
        machine_id: &str,
        cycle_time_secs: Option<f64>,
        good_parts: i64,
        scrap_parts: i64,
    ) -> RepositoryResult<Option<MachineRuntime>> {
        let Some(mut runtime) = self.runtime_repo.find_by_machine(machine_id)? else {
            return Ok(None);
        };

        runtime.cycle_count += 1;
        if cycle_time_secs.is_some() {
            runtime.last_cycle_time_secs = cycle_time_secs;
        }
        self.runtime_repo.upsert(&runtime)?;

        let record = ProductionRecord::new(
            machine_id,
            runtime.current_job_id.as_deref(),
            self.clock.now(),
            good_parts,
            scrap_parts,
            cycle_time_secs,
        );
        self.production_repo.insert(&record)?;

        Ok(Some(runtime))
    }

    // ==========================================
    // 停机生命周期
    // ==========================================

    /// 上报停机开始
    ///
    /// 创建开放事件后将机台置为 DOWN (计划停机为 MAINTENANCE)。
    /// 不检查同机台是否已有开放事件: 重复上报产生并存的开放事件,
    /// 由调用方按 `active_downtimes` 自行治理。
    pub fn start_downtime(
        &self,
        machine_id: &str,
        category: DowntimeCategory,
        reason: &str,
        reporter: &Actor,
        is_planned: bool,
    ) -> RepositoryResult<DowntimeEvent> {
        let event = DowntimeEvent::open(
            machine_id,
            category,
            reason,
            &reporter.user_id,
            is_planned,
            self.clock.now(),
        );
        self.downtime_repo.insert(&event)?;

        let status = if is_planned {
            MachineStatus::Maintenance
        } else {
            MachineStatus::Down
        };
        let current = self.runtime_repo.find_by_machine(machine_id)?;
        self.update_status(
            machine_id,
            status,
            current.as_ref().and_then(|r| r.current_job_id.as_deref()),
            current.as_ref().and_then(|r| r.current_mould_id.as_deref()),
            reporter,
        )?;

        tracing::info!(
            event_id = %event.event_id,
            machine_id,
            category = %category,
            is_planned,
            "停机事件已开启"
        );

        Ok(event)
    }

    /// 解决停机事件
    ///
    /// 时长按截断分钟固定; 关闭后机台一律回到 IDLE (是否复产由后续
    /// `update_status` 决定, 本引擎不猜测)。
    ///
    /// # 错误
    /// - `NotFound`: event_id 不存在
    /// - `InvalidStateTransition`: 事件已关闭 (含并发关闭落败)
    pub fn end_downtime(
        &self,
        event_id: &str,
        resolver: &Actor,
    ) -> RepositoryResult<DowntimeEvent> {
        let event = self
            .downtime_repo
            .find_by_id(event_id)?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "DowntimeEvent".to_string(),
                id: event_id.to_string(),
            })?;
        if !event.is_active() {
            return Err(RepositoryError::InvalidStateTransition {
                from: "CLOSED".to_string(),
                to: "CLOSED".to_string(),
            });
        }

        let now = self.clock.now();
        let duration_minutes = (now - event.start_time).num_minutes();
        let closed = self
            .downtime_repo
            .close(event_id, now, duration_minutes, &resolver.user_id)?;
        if !closed {
            // CAS 落败: 并发解决抢先
            return Err(RepositoryError::InvalidStateTransition {
                from: "CLOSED".to_string(),
                to: "CLOSED".to_string(),
            });
        }

        let current = self.runtime_repo.find_by_machine(&event.machine_id)?;
        self.update_status(
            &event.machine_id,
            MachineStatus::Idle,
            current.as_ref().and_then(|r| r.current_job_id.as_deref()),
            current.as_ref().and_then(|r| r.current_mould_id.as_deref()),
            resolver,
        )?;

        tracing::info!(
            event_id,
            machine_id = %event.machine_id,
            duration_minutes,
            "停机事件已解决"
        );

        let mut resolved = event;
        resolved.end_time = Some(now);
        resolved.duration_minutes = Some(duration_minutes);
        resolved.resolved_by = Some(resolver.user_id.clone());
        Ok(resolved)
    }

    // ==========================================
    // 查询操作
    // ==========================================

    /// 查询单台机投影
    pub fn machine_runtime(&self, machine_id: &str) -> RepositoryResult<Option<MachineRuntime>> {
        self.runtime_repo.find_by_machine(machine_id)
    }

    /// 查询全部机台投影 (看板用)
    pub fn all_runtimes(&self) -> RepositoryResult<Vec<MachineRuntime>> {
        self.runtime_repo.find_all()
    }

    /// 查询所有进行中的停机事件
    pub fn active_downtimes(&self) -> RepositoryResult<Vec<DowntimeEvent>> {
        self.downtime_repo.find_active()
    }

    /// 查询指定机台的停机历史
    pub fn machine_downtimes(
        &self,
        machine_id: &str,
        since: Option<NaiveDateTime>,
    ) -> RepositoryResult<Vec<DowntimeEvent>> {
        self.downtime_repo.find_by_machine(machine_id, since)
    }

    /// 多条件停机事件查询
    pub fn downtime_events(
        &self,
        since: Option<NaiveDateTime>,
        until: Option<NaiveDateTime>,
        machine_id: Option<&str>,
        category: Option<DowntimeCategory>,
    ) -> RepositoryResult<Vec<DowntimeEvent>> {
        self.downtime_repo.find_filtered(since, until, machine_id, category)
    }
}
