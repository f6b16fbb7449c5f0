// ==========================================
// 车间生产完整性子系统 - OEE 结果模型
// ==========================================
// OEE = Availability × Performance × Quality, 三项均钳制在 [0,1]
// 计算产物, 不落库
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// OeeResult - OEE 计算结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OeeResult {
    pub machine_id: String,          // 机台ID
    pub window_start: NaiveDateTime, // 窗口起点
    pub window_end: NaiveDateTime,   // 窗口终点

    // ===== 三项指标 =====
    pub availability: f64, // 可用率 ∈ [0,1]
    pub performance: f64,  // 表现率 ∈ [0,1]
    pub quality: f64,      // 良品率 ∈ [0,1]
    pub oee: f64,          // 三项乘积, 钳制 [0,1]

    // ===== 原始输入 =====
    pub planned_minutes: i64,    // 计划时间 (分钟)
    pub actual_run_minutes: i64, // 实际运行时间 (分钟)
    pub downtime_minutes: i64,   // 停机时间 (分钟, 窗口内裁剪并合并后)
    pub total_parts: i64,        // 总产出
    pub good_parts: i64,         // 良品数
    pub scrap_parts: i64,        // 废品数
    pub target_cycle_time_secs: f64, // 目标周期时间 (秒/件)
    pub actual_cycle_time_secs: f64, // 实际周期时间 (秒/件, 无产出时为 0)
}
