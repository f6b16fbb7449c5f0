// ==========================================
// 车间生产完整性子系统 - 审计账本领域模型
// ==========================================
// 红线: 审计条目一经写入永不修改, 纠错以新条目表达
// 红线: OVERRIDE 动作必须附带非空原因
// ==========================================

use crate::domain::types::{AuditAction, UserRole};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use uuid::Uuid;

// ==========================================
// Actor - 操作主体
// ==========================================
// 显式随每次写入传递, 不依赖进程级"当前用户"可变状态
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: String,   // 用户ID
    pub user_name: String, // 用户姓名
    pub role: UserRole,    // 角色
}

impl Actor {
    pub fn new(user_id: &str, user_name: &str, role: UserRole) -> Self {
        Self {
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            role,
        }
    }

    /// 系统合成身份 (后台/自动化写入方的默认操作主体)
    ///
    /// 无认证上下文时审计写入不允许失败, 回退到最低权限的系统身份。
    pub fn system() -> Self {
        Self {
            user_id: "system".to_string(),
            user_name: "系统".to_string(),
            role: UserRole::Operator,
        }
    }
}

// ==========================================
// AuditEntry - 审计条目
// ==========================================
// 对齐: audit_log 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    // ===== 主键 =====
    pub audit_id: String,      // 条目ID (UUID)
    pub entity_type: String,   // 实体类型
    pub entity_id: String,     // 实体ID
    pub action: AuditAction,   // 动作类型
    pub ts: NaiveDateTime,     // 写入时间戳 (UTC)

    // ===== 操作主体 =====
    pub actor_id: String,      // 操作人ID
    pub actor_name: String,    // 操作人姓名
    pub actor_role: UserRole,  // 操作人角色

    // ===== 变更快照 =====
    pub before_json: Option<JsonValue>, // 变更前快照
    pub after_json: Option<JsonValue>,  // 变更后快照

    // ===== 上下文 =====
    pub reason: Option<String>,        // 原因 (OVERRIDE 必填)
    pub ip_address: Option<String>,    // 来源IP
    pub device_info: Option<String>,   // 设备信息
    pub metadata_json: Option<JsonValue>, // 自由标注
}

impl AuditEntry {
    /// 创建新的审计条目
    ///
    /// # 参数
    /// - `entity_type`: 实体类型
    /// - `entity_id`: 实体ID
    /// - `action`: 动作类型
    /// - `actor`: 操作主体
    /// - `ts`: 写入时间戳 (由 Ledger 经 Clock 注入, 保证可测)
    pub fn new(
        entity_type: &str,
        entity_id: &str,
        action: AuditAction,
        actor: &Actor,
        ts: NaiveDateTime,
    ) -> Self {
        Self {
            audit_id: Uuid::new_v4().to_string(),
            entity_type: entity_type.to_string(),
            entity_id: entity_id.to_string(),
            action,
            ts,
            actor_id: actor.user_id.clone(),
            actor_name: actor.user_name.clone(),
            actor_role: actor.role,
            before_json: None,
            after_json: None,
            reason: None,
            ip_address: None,
            device_info: None,
            metadata_json: None,
        }
    }

    /// 设置变更前快照 (转换为JSON)
    pub fn with_before<T: Serialize>(mut self, before: &T) -> Self {
        self.before_json = serde_json::to_value(before).ok();
        self
    }

    /// 设置变更后快照 (转换为JSON)
    pub fn with_after<T: Serialize>(mut self, after: &T) -> Self {
        self.after_json = serde_json::to_value(after).ok();
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
    pub fn with_metadata<T: Serialize>(mut self, metadata: &T) -> Self {
        self.metadata_json = serde_json::to_value(metadata).ok();
        self
    }

    /// 时间戳的定宽 ISO-8601 序列化 (UTC, 毫秒, 零填充)
    ///
    /// 定宽格式保证字典序等价于时间序, 导出排序依赖此性质。
    pub fn timestamp_iso(&self) -> String {
        self.ts.format(crate::db::TS_ISO_FORMAT).to_string()
    }
}
