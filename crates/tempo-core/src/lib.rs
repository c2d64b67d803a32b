#![deny(unsafe_code)]
#![doc = "tempo-core: 可注入时钟、虚拟时间调度与时间预算治理的核心契约。"]
#![doc = ""]
#![doc = "== 能力总览 =="]
#![doc = "1. 时钟能力 (`time::Clock`)：业务代码依赖抽象时钟而非宿主时钟，生产环境走 `SystemClock`，测试走 `VirtualClock`。"]
#![doc = "2. 虚拟调度引擎 (`time::virtual_clock`)：单泵“推进至边界”排水算法，支持再入等待与真实异步工作的完整驱动。"]
#![doc = "3. 时间预算 (`time::budget`)：锚定起点的额度、检查点台账与到期即触发的取消信号。"]
#![doc = ""]
#![doc = "== 兼容性与版本治理 =="]
#![doc = "本 Crate 遵守语义化版本 2.0 (SemVer)。错误码（`error::codes`）与固定错误文案一经发布不得变更含义，"]
#![doc = "破坏性变更仅允许在 MAJOR 版本中引入。"]
#![doc = ""]
#![doc = "== 运行环境 =="]
#![doc = "时钟能力依赖 `std::time::Instant`、线程与 `std::sync` 原语，本 Crate 仅面向 `std` 环境构建；"]
#![doc = "虚拟模式为单逻辑线程协作调度，不依赖任何特定异步运行时。"]

pub mod error;
pub mod prelude;
pub mod time;

pub use error::{ClockError, TimeBudgetExceeded, codes};
pub use time::{
    AdvanceDrive, BudgetEntry, BudgetEntryHub, BudgetEntryObserver, BudgetEntrySubscription,
    CancelIfExceeds, CancelIfExceedsOr, CancellationSignal, Clock, ClockRegistry, ScheduleKey,
    ScheduledBody, Sleep, SystemClock, TimeBudget, Triggered, VirtualClock, VirtualClockGuard,
    VirtualSleep, cancel_if_exceeds, cancel_if_exceeds_or,
};
