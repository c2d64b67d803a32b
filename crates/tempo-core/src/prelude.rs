//! 常用类型一揽子导入入口。
//!
//! # 使用方式（How）
//! - `use tempo_core::prelude::*;` 即可获得时钟能力、预算治理与取消适配的全部常用
//!   类型；集成测试与示例推荐统一走该入口，避免在各处罗列零散导入。

pub use crate::error::{ClockError, TimeBudgetExceeded, codes};
pub use crate::time::{
    BudgetEntry, BudgetEntryHub, BudgetEntryObserver, BudgetEntrySubscription, CancellationSignal,
    Clock, ClockRegistry, ScheduleKey, ScheduledBody, Sleep, SystemClock, TimeBudget, VirtualClock,
    VirtualClockGuard, cancel_if_exceeds, cancel_if_exceeds_or,
};
