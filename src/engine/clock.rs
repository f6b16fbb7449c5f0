// ==========================================
// 车间生产完整性子系统 - 时钟协作方
// ==========================================
// 职责: 引擎层所有时间读取经由可注入的 Clock trait,
//       班次边界与时长逻辑由此获得确定性测试能力
// ==========================================

use chrono::{NaiveDateTime, Utc};
use std::sync::Mutex;

// ==========================================
// Clock trait
// ==========================================
pub trait Clock: Send + Sync {
    /// 当前时刻 (UTC naive)
    fn now(&self) -> NaiveDateTime;
}

// ==========================================
// SystemClock - 系统时钟
// ==========================================
#[derive(Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().naive_utc()
    }
}

// ==========================================
// FixedClock - 可设定时钟 (测试用)
// ==========================================
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self { now: Mutex::new(now) }
    }

    /// 拨动时钟
    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }

    /// 前进指定分钟
    pub fn advance_minutes(&self, minutes: i64) {
        let mut guard = self.now.lock().unwrap();
        *guard += chrono::Duration::minutes(minutes);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}
