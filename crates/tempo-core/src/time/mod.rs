//! 时间抽象模块：可注入时钟、虚拟时间调度引擎与时间预算治理。
//!
//! # 模块定位（Why）
//! - 把所有依赖时间源的能力集中到统一入口，业务代码只依赖 [`Clock`] trait 即可在
//!   真实时间与虚拟时间之间平滑切换；
//! - 虚拟时钟让延迟、超时与预算逻辑在测试中瞬时、确定地复现。
//!
//! # 结构概览（What）
//! - [`clock`]：核心能力 trait 与真实时钟实现；
//! - [`virtual_clock`]：虚拟时间调度引擎（单泵排水算法）；
//! - [`ambient`]：显式注入的环境时钟注册表与作用域凭据；
//! - [`budget`]：时间预算、检查点台账与观察者登记表；
//! - [`cancel`]：取消信号与“超支即放弃”竞速适配器。
//!
//! # 使用指引（How）
//! - 业务代码通过 `Arc<dyn Clock>` 或 [`ClockRegistry`] 注入时间源；
//! - 测试用 [`ClockRegistry::start_virtual`] 安装虚拟时钟并手动推进。

pub mod ambient;
pub mod budget;
pub mod cancel;
pub mod clock;
pub mod virtual_clock;

pub use ambient::{ClockRegistry, VirtualClockGuard};
pub use budget::{
    BudgetEntry, BudgetEntryHub, BudgetEntryObserver, BudgetEntrySubscription, TimeBudget,
};
pub use cancel::{
    CancelIfExceeds, CancelIfExceedsOr, CancellationSignal, Triggered, cancel_if_exceeds,
    cancel_if_exceeds_or,
};
pub use clock::{Clock, ScheduleKey, ScheduledBody, Sleep, SystemClock};
pub use virtual_clock::{AdvanceDrive, VirtualClock, VirtualSleep};
