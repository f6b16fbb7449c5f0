// ==========================================
// 车间生产完整性子系统 - 生产计数记录
// ==========================================
// 归属: 工单/生产日志存储 (外部协作方), 本子系统只读汇总 + 周期回写
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==========================================
// ProductionRecord - 生产计数记录
// ==========================================
// 对齐: production_record 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub record_id: String,        // 记录ID (UUID)
    pub machine_id: String,       // 机台ID
    pub job_id: Option<String>,   // 工单ID
    pub ts: NaiveDateTime,        // 记录时间戳
    pub good_parts: i64,          // 良品数
    pub scrap_parts: i64,         // 废品数
    pub cycle_time_secs: Option<f64>, // 周期时间 (秒)
}

impl ProductionRecord {
    pub fn new(
        machine_id: &str,
        job_id: Option<&str>,
        ts: NaiveDateTime,
        good_parts: i64,
        scrap_parts: i64,
        cycle_time_secs: Option<f64>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4().to_string(),
            machine_id: machine_id.to_string(),
            job_id: job_id.map(|s| s.to_string()),
            ts,
            good_parts,
            scrap_parts,
            cycle_time_secs,
        }
    }
}
