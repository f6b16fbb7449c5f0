// ==========================================
// 车间生产完整性子系统 - 审计账本引擎
// ==========================================
// 红线: OVERRIDE 动作必须附带非空原因, 校验先于任何写入
// 红线: 持久化失败不得阻断业务写路径 —— 捕获并记录,
//       以 AppendOutcome 区分持久化程度, 不以 Err 上抛
// ==========================================
// 职责: 审计条目的追加与查询
// 输入: 操作主体 + 追加请求
// 输出: 审计条目 + 持久化结果
// ==========================================

use crate::domain::audit::{Actor, AuditEntry};
use crate::domain::types::AuditAction;
use crate::engine::clock::Clock;
use crate::repository::audit_repo::{AuditExportFilter, AuditLogRepository};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::sync::RemoteSync;
use chrono::NaiveDateTime;
use serde_json::Value as JsonValue;
use std::sync::Arc;

// ==========================================
// AppendRequest - 追加请求
// ==========================================
#[derive(Debug, Clone)]
pub struct AppendRequest {
    pub entity_type: String,
    pub entity_id: String,
    pub action: AuditAction,
    pub before: Option<JsonValue>,
    pub after: Option<JsonValue>,
    pub reason: Option<String>,
    pub ip_address: Option<String>,
    pub device_info: Option<String>,
    pub metadata: Option<JsonValue>,
}

impl AppendRequest {
    pub fn new(entity_type: &str, entity_id: &str, action: AuditAction) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action,
            before: None,
            after: None,
            reason: None,
            ip_address: None,
            device_info: None,
            metadata: None,
        }
    }

    /// 设置变更前快照
    pub fn with_before(mut self, before: JsonValue) -> Self {
        self.before = Some(before);
        self
    }

    /// 设置变更后快照
    pub fn with_after(mut self, after: JsonValue) -> Self {
        self.after = Some(after);
        self
    }

    /// 设置原因
    pub fn with_reason(mut self, reason: &str) -> Self {
        self.reason = Some(reason.to_string());
        self
    }

    /// 设置来源上下文
    pub fn with_context(mut self, ip_address: Option<String>, device_info: Option<String>) -> Self {
        self.ip_address = ip_address;
        self.device_info = device_info;
        self
    }

    /// 设置自由标注
    pub fn with_metadata(mut self, metadata: JsonValue) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

// ==========================================
// AppendOutcome - 持久化结果
// ==========================================
// 可用性优先于持久性: 三种结果都返回条目本身,
// 需要断言持久性的调用方/测试检查此枚举
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendOutcome {
    /// 本地写入与远端入队均成功
    Recorded,
    /// 本地写入成功, 远端入队失败 (待同步层重试)
    RecordedLocallyOnly { sync_error: String },
    /// 本地写入失败, 条目未持久化
    Failed { error: String },
}

/// 追加结果: 条目 + 持久化程度
#[derive(Debug, Clone)]
pub struct LedgerAppend {
    pub entry: AuditEntry,
    pub outcome: AppendOutcome,
}

impl LedgerAppend {
    /// 条目是否至少在本地持久化
    pub fn is_locally_durable(&self) -> bool {
        !matches!(self.outcome, AppendOutcome::Failed { .. })
    }
}

// ==========================================
// Ledger - 审计账本引擎
// ==========================================
pub struct Ledger {
    audit_repo: Arc<AuditLogRepository>,
    remote_sync: Arc<dyn RemoteSync>,
    clock: Arc<dyn Clock>,
}

impl Ledger {
    /// 创建新的账本引擎
    ///
    /// # 参数
    /// - `audit_repo`: 审计账本仓储
    /// - `remote_sync`: 远端同步协作方 (fire-and-forget)
    /// - `clock`: 时钟协作方
    pub fn new(
        audit_repo: Arc<AuditLogRepository>,
        remote_sync: Arc<dyn RemoteSync>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            audit_repo,
            remote_sync,
            clock,
        }
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 追加审计条目
    ///
    /// # 参数
    /// - `actor`: 操作主体; None 回退到系统合成身份 (后台写入方不失败)
    /// - `request`: 追加请求
    ///
    /// # 返回
    /// - `Ok(LedgerAppend)`: 条目 + 持久化结果 (本地/远端失败不上抛)
    /// - `Err(ValidationError)`: OVERRIDE 动作原因为空, 未发生任何写入
    pub fn append(
        &self,
        actor: Option<&Actor>,
        request: AppendRequest,
    ) -> RepositoryResult<LedgerAppend> {
        // 1. OVERRIDE 原因校验, 先于任何写入
        if request.action == AuditAction::Override {
            let blank = request
                .reason
                .as_deref()
                .map(|r| r.trim().is_empty())
                .unwrap_or(true);
            if blank {
                return Err(RepositoryError::ValidationError(
                    "OVERRIDE 动作必须附带非空原因".to_string(),
                ));
            }
        }

        // 2. 操作主体回退
        let system_actor;
        let actor = match actor {
            Some(a) => a,
            None => {
                system_actor = Actor::system();
                &system_actor
            }
        };

        // 3. 构造条目 (ID + 时间戳在此生成)
        let mut entry = AuditEntry::new(
            &request.entity_type,
            &request.entity_id,
            request.action,
            actor,
            self.clock.now(),
        );
        entry.before_json = request.before;
        entry.after_json = request.after;
        entry.reason = request.reason;
        entry.ip_address = request.ip_address;
        entry.device_info = request.device_info;
        entry.metadata_json = request.metadata;

        // 4. 本地写入, 失败捕获并记录
        if let Err(e) = self.audit_repo.insert(&entry) {
            tracing::error!(
                audit_id = %entry.audit_id,
                entity_type = %entry.entity_type,
                entity_id = %entry.entity_id,
                action = %entry.action,
                error = %e,
                "审计条目本地写入失败, 条目未持久化"
            );
            return Ok(LedgerAppend {
                entry,
                outcome: AppendOutcome::Failed {
                    error: e.to_string(),
                },
            });
        }

        // 5. 远端入队, 失败捕获并记录
        let outcome = match self.remote_sync.enqueue(&entry) {
            Ok(()) => AppendOutcome::Recorded,
            Err(e) => {
                tracing::warn!(
                    audit_id = %entry.audit_id,
                    error = %e,
                    "审计条目远端入队失败, 仅本地持久化"
                );
                AppendOutcome::RecordedLocallyOnly {
                    sync_error: e.to_string(),
                }
            }
        };

        Ok(LedgerAppend { entry, outcome })
    }

    // ==========================================
    // 查询操作 (均按时间戳降序)
    // ==========================================

    /// 查询指定实体的全部条目
    pub fn entries_for_entity(
        &self,
        entity_type: &str,
        entity_id: &str,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_by_entity(entity_type, entity_id)
    }

    /// 查询指定操作人的条目
    pub fn entries_by_user(
        &self,
        user_id: &str,
        limit: Option<i64>,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_by_user(user_id, limit)
    }

    /// 查询指定动作类型的条目
    pub fn entries_by_action(
        &self,
        action: AuditAction,
        limit: Option<i64>,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_by_action(action, limit)
    }

    /// 查询指定时间范围的条目
    pub fn entries_in_range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_by_time_range(start, end)
    }

    /// 查询人工覆写条目
    pub fn override_entries(&self, limit: Option<i64>) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_overrides(limit)
    }

    /// 查询最近的 N 条条目
    pub fn recent_entries(&self, limit: i64) -> RepositoryResult<Vec<AuditEntry>> {
        self.audit_repo.find_recent(limit)
    }

    /// 导出查询
    ///
    /// 结果按时间戳的定宽 ISO-8601 字符串升序重排;
    /// 定宽零填充格式下字典序与时间序等价 (见 db::TS_ISO_FORMAT)。
    pub fn export(&self, filter: &AuditExportFilter) -> RepositoryResult<Vec<AuditEntry>> {
        let mut entries = self.audit_repo.find_filtered(filter)?;
        entries.sort_by(|a, b| {
            (a.timestamp_iso(), &a.audit_id).cmp(&(b.timestamp_iso(), &b.audit_id))
        });
        Ok(entries)
    }
}
