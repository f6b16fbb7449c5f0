// ==========================================
// 车间生产完整性子系统 - OEE 计算引擎
// ==========================================
// OEE = Availability × Performance × Quality, 全部钳制 [0,1]
// 停机口径: 事件裁剪到窗口后做区间并集, 每个壁钟分钟只计一次
// 班次: 三班八小时制 (06:00 / 14:00 / 22:00), 夜班跨零点回溯到昨日 22:00
// 只读引擎, 无自有可变状态
// ==========================================

use crate::config::IntegrityConfig;
use crate::domain::oee::OeeResult;
use crate::engine::clock::Clock;
use crate::repository::downtime_repo::DowntimeEventRepository;
use crate::repository::error::RepositoryResult;
use crate::repository::production_repo::ProductionRecordRepository;
use crate::repository::runtime_repo::MachineRuntimeRepository;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::sync::Arc;

// ==========================================
// OeeCalculator - OEE 计算引擎
// ==========================================
pub struct OeeCalculator {
    downtime_repo: Arc<DowntimeEventRepository>,
    production_repo: Arc<ProductionRecordRepository>,
    runtime_repo: Arc<MachineRuntimeRepository>,
    clock: Arc<dyn Clock>,
    config: IntegrityConfig,
}

impl OeeCalculator {
    /// 创建新的 OEE 计算引擎
    pub fn new(
        downtime_repo: Arc<DowntimeEventRepository>,
        production_repo: Arc<ProductionRecordRepository>,
        runtime_repo: Arc<MachineRuntimeRepository>,
        clock: Arc<dyn Clock>,
        config: IntegrityConfig,
    ) -> Self {
        Self {
            downtime_repo,
            production_repo,
            runtime_repo,
            clock,
            config,
        }
    }

    // ==========================================
    // 核心计算
    // ==========================================

    /// 计算指定机台在窗口 [window_start, window_end) 内的 OEE 分解
    ///
    /// # 参数
    /// - `target_cycle_time_override`: 目标周期时间覆写 (秒/件);
    ///   缺省时取机台配置值, 再缺省取全局兜底值
    ///
    /// # 口径
    /// - 计划时间 = 窗口长度 (截断分钟)
    /// - 停机时间 = 窗口内裁剪后的停机区间并集长度 (开放事件视为持续到窗口终点)
    /// - 实际运行 = clamp(计划 − 停机, 0, 计划)
    /// - 产量 = [window_start, window_end) 半开区间内的生产记录汇总
    pub fn calculate(
        &self,
        machine_id: &str,
        window_start: NaiveDateTime,
        window_end: NaiveDateTime,
        target_cycle_time_override: Option<f64>,
    ) -> RepositoryResult<OeeResult> {
        // 1. 计划时间
        let planned_minutes = (window_end - window_start).num_minutes().max(0);

        // 2. 停机时间: 裁剪到窗口 + 区间并集
        let events =
            self.downtime_repo
                .find_overlapping_window(machine_id, window_start, window_end)?;
        let clipped: Vec<(NaiveDateTime, NaiveDateTime)> = events
            .iter()
            .map(|e| {
                let start = e.start_time.max(window_start);
                let end = e.end_time.unwrap_or(window_end).min(window_end);
                (start, end)
            })
            .filter(|(start, end)| end > start)
            .collect();
        let downtime_minutes = Self::merged_minutes(clipped).min(planned_minutes);

        // 3. 实际运行时间
        let actual_run_minutes = (planned_minutes - downtime_minutes).clamp(0, planned_minutes);

        // 4. 窗口产量
        let totals = self
            .production_repo
            .sum_window(machine_id, window_start, window_end)?;
        let total_parts = totals.good_parts + totals.scrap_parts;

        // 5. 可用率
        let availability = if planned_minutes > 0 {
            actual_run_minutes as f64 / planned_minutes as f64
        } else {
            0.0
        };

        // 6. 目标周期时间: 覆写 > 机台配置 > 全局兜底
        let target_cycle_time_secs = match target_cycle_time_override {
            Some(t) => t,
            None => self
                .runtime_repo
                .find_by_machine(machine_id)?
                .and_then(|r| r.target_cycle_time_secs)
                .unwrap_or(self.config.default_target_cycle_time_secs),
        };

        // 7-8. 表现率 (理论产出为 0 时定义为 0)
        let ideal_output = if actual_run_minutes > 0 && target_cycle_time_secs > 0.0 {
            actual_run_minutes as f64 * 60.0 / target_cycle_time_secs
        } else {
            0.0
        };
        let performance = if ideal_output > 0.0 {
            (total_parts as f64 / ideal_output).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // 9. 良品率
        let quality = if total_parts > 0 {
            totals.good_parts as f64 / total_parts as f64
        } else {
            0.0
        };

        // 10. OEE
        let oee = (availability * performance * quality).clamp(0.0, 1.0);

        // 11. 实际周期时间
        let actual_cycle_time_secs = if total_parts > 0 {
            actual_run_minutes as f64 * 60.0 / total_parts as f64
        } else {
            0.0
        };

        Ok(OeeResult {
            machine_id: machine_id.to_string(),
            window_start,
            window_end,
            availability,
            performance,
            quality,
            oee,
            planned_minutes,
            actual_run_minutes,
            downtime_minutes,
            total_parts,
            good_parts: totals.good_parts,
            scrap_parts: totals.scrap_parts,
            target_cycle_time_secs,
            actual_cycle_time_secs,
        })
    }

    /// 计算当前班次至今的 OEE
    ///
    /// 窗口为 [班次起点, now), 目标周期时间取机台配置。
    pub fn calculate_for_current_shift(&self, machine_id: &str) -> RepositoryResult<OeeResult> {
        let now = self.clock.now();
        let shift_start = Self::current_shift_start(now);
        self.calculate(machine_id, shift_start, now, None)
    }

    /// 解析当前八小时班次的起点
    ///
    /// 班次起点: 06:00 / 14:00 / 22:00。
    /// 小时 ∈ [22,24) → 今日 22:00; 小时 ∈ [0,6) → 昨日 22:00 (夜班跨零点回溯);
    /// 其余取 {06:00, 14:00} 中不晚于 now 的最大值。
    pub fn current_shift_start(now: NaiveDateTime) -> NaiveDateTime {
        let hour = now.hour();
        if hour >= 22 {
            Self::shift_anchor(now.date(), 22)
        } else if hour < 6 {
            Self::shift_anchor(now.date() - Duration::days(1), 22)
        } else if hour >= 14 {
            Self::shift_anchor(now.date(), 14)
        } else {
            Self::shift_anchor(now.date(), 6)
        }
    }

    // ==========================================
    // 内部方法
    // ==========================================

    fn shift_anchor(date: NaiveDate, hour: u32) -> NaiveDateTime {
        date.and_hms_opt(hour, 0, 0)
            .unwrap_or_else(|| date.and_time(NaiveTime::MIN))
    }

    /// 区间并集总长度 (分钟, 截断)
    ///
    /// 输入为已裁剪到窗口的半开区间; 重叠/邻接区间合并后求和,
    /// 同一壁钟分钟不因多个并发事件而重复计入。
    fn merged_minutes(mut intervals: Vec<(NaiveDateTime, NaiveDateTime)>) -> i64 {
        if intervals.is_empty() {
            return 0;
        }
        intervals.sort();

        let mut total = 0i64;
        let (mut cur_start, mut cur_end) = intervals[0];
        for (start, end) in intervals.into_iter().skip(1) {
            if start <= cur_end {
                cur_end = cur_end.max(end);
            } else {
                total += (cur_end - cur_start).num_minutes();
                cur_start = start;
                cur_end = end;
            }
        }
        total += (cur_end - cur_start).num_minutes();
        total
    }
}
