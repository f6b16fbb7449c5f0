// ==========================================
// 车间生产完整性子系统 - 领域类型定义
// ==========================================
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 审计动作类型 (Audit Action)
// ==========================================
// 红线: 所有写路径必须记录审计动作
// 红线: OVERRIDE 动作必须附带非空原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditAction {
    Create,         // 新建实体
    Update,         // 更新实体
    Delete,         // 删除实体
    Override,       // 人工覆写 (必须有原因)
    StatusChange,   // 状态变更
    Assignment,     // 任务指派
    Reconciliation, // 计数对账
    Login,          // 登录
    Logout,         // 登出
    Escalation,     // 升级上报
    Approval,       // 审批通过
    Rejection,      // 审批驳回
}

impl AuditAction {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Create => "CREATE",
            AuditAction::Update => "UPDATE",
            AuditAction::Delete => "DELETE",
            AuditAction::Override => "OVERRIDE",
            AuditAction::StatusChange => "STATUS_CHANGE",
            AuditAction::Assignment => "ASSIGNMENT",
            AuditAction::Reconciliation => "RECONCILIATION",
            AuditAction::Login => "LOGIN",
            AuditAction::Logout => "LOGOUT",
            AuditAction::Escalation => "ESCALATION",
            AuditAction::Approval => "APPROVAL",
            AuditAction::Rejection => "REJECTION",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CREATE" => Some(AuditAction::Create),
            "UPDATE" => Some(AuditAction::Update),
            "DELETE" => Some(AuditAction::Delete),
            "OVERRIDE" => Some(AuditAction::Override),
            "STATUS_CHANGE" => Some(AuditAction::StatusChange),
            "ASSIGNMENT" => Some(AuditAction::Assignment),
            "RECONCILIATION" => Some(AuditAction::Reconciliation),
            "LOGIN" => Some(AuditAction::Login),
            "LOGOUT" => Some(AuditAction::Logout),
            "ESCALATION" => Some(AuditAction::Escalation),
            "APPROVAL" => Some(AuditAction::Approval),
            "REJECTION" => Some(AuditAction::Rejection),
            _ => None,
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 用户角色 (User Role)
// ==========================================
// 等级制: 声明顺序即权限顺序 (Operator 最低)
// 审批/驳回要求 Manager 及以上, 由调用方 RBAC 校验
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    Operator,   // 操作工
    Setter,     // 调机员
    Supervisor, // 班长
    Manager,    // 车间经理
    Admin,      // 系统管理员
}

impl UserRole {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Operator => "OPERATOR",
            UserRole::Setter => "SETTER",
            UserRole::Supervisor => "SUPERVISOR",
            UserRole::Manager => "MANAGER",
            UserRole::Admin => "ADMIN",
        }
    }

    /// 从字符串解析
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPERATOR" => Some(UserRole::Operator),
            "SETTER" => Some(UserRole::Setter),
            "SUPERVISOR" => Some(UserRole::Supervisor),
            "MANAGER" => Some(UserRole::Manager),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }

    /// 是否具备经理级权限
    pub fn is_manager_or_above(&self) -> bool {
        *self >= UserRole::Manager
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 对账状态 (Reconciliation Status)
// ==========================================
// 状态机: PENDING → {APPROVED, REJECTED}
// 自动审批在创建时直接落在 APPROVED, 不经过 PENDING
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationStatus {
    Pending,  // 待审批
    Approved, // 已通过
    Rejected, // 已驳回
}

impl ReconciliationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReconciliationStatus::Pending => "PENDING",
            ReconciliationStatus::Approved => "APPROVED",
            ReconciliationStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ReconciliationStatus::Pending),
            "APPROVED" => Some(ReconciliationStatus::Approved),
            "REJECTED" => Some(ReconciliationStatus::Rejected),
            _ => None,
        }
    }
}

impl fmt::Display for ReconciliationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 机台运行状态 (Machine Status)
// ==========================================
// 红线: 状态转换不设门禁, 任意状态可跳转 (操作工纠错优先)
// 每次转换的前后状态写入审计账本, 供事后异常分析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MachineStatus {
    Running,     // 生产中
    Idle,        // 待机
    Down,        // 故障停机
    Maintenance, // 计划维护
    Setup,       // 调机/换模
    Unknown,     // 未知 (初始)
}

impl MachineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MachineStatus::Running => "RUNNING",
            MachineStatus::Idle => "IDLE",
            MachineStatus::Down => "DOWN",
            MachineStatus::Maintenance => "MAINTENANCE",
            MachineStatus::Setup => "SETUP",
            MachineStatus::Unknown => "UNKNOWN",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "RUNNING" => Some(MachineStatus::Running),
            "IDLE" => Some(MachineStatus::Idle),
            "DOWN" => Some(MachineStatus::Down),
            "MAINTENANCE" => Some(MachineStatus::Maintenance),
            "SETUP" => Some(MachineStatus::Setup),
            "UNKNOWN" => Some(MachineStatus::Unknown),
            _ => None,
        }
    }
}

impl fmt::Display for MachineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ==========================================
// 停机类别 (Downtime Category)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DowntimeCategory {
    Mechanical,  // 机械故障
    Electrical,  // 电气故障
    Material,    // 缺料/物料异常
    MouldChange, // 换模
    Setup,       // 调机
    Quality,     // 质量停机
    Planned,     // 计划停机
    Other,       // 其他
}

impl DowntimeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            DowntimeCategory::Mechanical => "MECHANICAL",
            DowntimeCategory::Electrical => "ELECTRICAL",
            DowntimeCategory::Material => "MATERIAL",
            DowntimeCategory::MouldChange => "MOULD_CHANGE",
            DowntimeCategory::Setup => "SETUP",
            DowntimeCategory::Quality => "QUALITY",
            DowntimeCategory::Planned => "PLANNED",
            DowntimeCategory::Other => "OTHER",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "MECHANICAL" => Some(DowntimeCategory::Mechanical),
            "ELECTRICAL" => Some(DowntimeCategory::Electrical),
            "MATERIAL" => Some(DowntimeCategory::Material),
            "MOULD_CHANGE" => Some(DowntimeCategory::MouldChange),
            "SETUP" => Some(DowntimeCategory::Setup),
            "QUALITY" => Some(DowntimeCategory::Quality),
            "PLANNED" => Some(DowntimeCategory::Planned),
            "OTHER" => Some(DowntimeCategory::Other),
            _ => None,
        }
    }
}

impl fmt::Display for DowntimeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
