// ==========================================
// 车间生产完整性子系统 - 机台运行时领域模型
// ==========================================
// MachineRuntime: 每台机一行的"当前状态"投影, 原地覆写
// DowntimeEvent: 停机事件, end_time 为空即"进行中"
// ==========================================

use crate::domain::types::{DowntimeCategory, MachineStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// MachineRuntime - 机台当前状态投影
// ==========================================
// 对齐: machine_runtime 表 (machine_id 主键, 永不删除)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MachineRuntime {
    pub machine_id: String,         // 机台ID (主键)
    pub machine_name: String,       // 机台名称
    pub status: MachineStatus,      // 当前状态
    pub status_since: NaiveDateTime, // 当前状态起始时间
    pub current_job_id: Option<String>,   // 当前工单
    pub current_mould_id: Option<String>, // 当前模具
    pub cycle_count: i64,                 // 累计周期数
    pub last_cycle_time_secs: Option<f64>, // 最近一次周期时间 (秒)
    pub target_cycle_time_secs: Option<f64>, // 目标周期时间 (秒)
}

impl MachineRuntime {
    /// 首次状态更新时的懒创建
    pub fn initial(machine_id: &str, status: MachineStatus, status_since: NaiveDateTime) -> Self {
        Self {
            machine_id: machine_id.to_string(),
            machine_name: machine_id.to_string(),
            status,
            status_since,
            current_job_id: None,
            current_mould_id: None,
            cycle_count: 0,
            last_cycle_time_secs: None,
            target_cycle_time_secs: None,
        }
    }
}

// ==========================================
// DowntimeEvent - 停机事件
// ==========================================
// 不变式: end_time 为空(进行中) 与 duration_minutes 已固定(已关闭) 二者恰居其一
// 对齐: downtime_event 表 (永不删除)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeEvent {
    pub event_id: String,            // 事件ID (UUID)
    pub machine_id: String,          // 机台ID
    pub category: DowntimeCategory,  // 停机类别
    pub reason: String,              // 停机原因
    pub start_time: NaiveDateTime,   // 开始时间
    pub end_time: Option<NaiveDateTime>, // 结束时间 (空=进行中)
    pub duration_minutes: Option<i64>,   // 时长 (分钟, 关闭时按截断固定)
    pub reported_by: String,         // 上报人ID
    pub resolved_by: Option<String>, // 解决人ID
    pub is_planned: bool,            // 是否计划停机
}

impl DowntimeEvent {
    /// 创建新的开放停机事件
    pub fn open(
        machine_id: &str,
        category: DowntimeCategory,
        reason: &str,
        reported_by: &str,
        is_planned: bool,
        start_time: NaiveDateTime,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            machine_id: machine_id.to_string(),
            category,
            reason: reason.to_string(),
            start_time,
            end_time: None,
            duration_minutes: None,
            reported_by: reported_by.to_string(),
            resolved_by: None,
            is_planned,
        }
    }

    /// 事件是否进行中
    pub fn is_active(&self) -> bool {
        self.end_time.is_none()
    }
}
