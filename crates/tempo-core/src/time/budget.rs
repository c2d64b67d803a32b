//! 时间预算：锚定时钟起点的时长额度、检查点台账与到期取消信号。
//!
//! # 模块定位（Why）
//! - 重试、限流与分阶段任务需要回答“这一步花了多久、额度还剩多少、是否已经超支”，
//!   并在超支瞬间获得可等待的取消信号；
//! - 预算引用时钟能力而非真实时间，因此同一套断言在虚拟时钟下可以瞬时、确定地复现。
//!
//! # 结构概览（What）
//! - [`TimeBudget`]：额度本体，持有不可变起点、额度上限与追加式台账；
//! - [`BudgetEntry`]：具名检查点，记录自起点的耗时与是否超支，可序列化导出；
//! - [`BudgetEntryHub`] / [`BudgetEntrySubscription`]：检查点记录事件的发布/订阅
//!   登记表，由所属时钟实例持有，订阅凭据析构时只摘除自身一条登记。
//!
//! # 使用指引（How）
//! - 生产环境把 [`crate::time::SystemClock`] 注入预算；测试改用
//!   [`crate::time::VirtualClock`] 并通过推进时间驱动到期；
//! - 需要“超支即失败”的调用链使用
//!   [`record_entry_checked`](TimeBudget::record_entry_checked)，错误自带完整台账。

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::error::{ClockError, TimeBudgetExceeded};
use crate::time::cancel::CancellationSignal;
use crate::time::clock::Clock;

/// 具名预算检查点。
///
/// # 契约说明（What）
/// - `elapsed` 为记录瞬间自预算起点的耗时；
/// - `exceeded = elapsed > 预算上限`，在记录时一次性算定，之后永不改写；
/// - 无界预算的检查点恒为未超支。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetEntry {
    pub(crate) name: String,
    pub(crate) elapsed: Duration,
    pub(crate) exceeded: bool,
}

impl BudgetEntry {
    /// 检查点名称。
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 记录瞬间自预算起点的耗时。
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// 记录瞬间是否已超出预算。
    pub fn exceeded(&self) -> bool {
        self.exceeded
    }
}

/// 预算检查点观察者：依次接收所属时钟、预算本体与新记录的检查点。
pub type BudgetEntryObserver =
    Arc<dyn Fn(&dyn Clock, &TimeBudget, &BudgetEntry) + Send + Sync + 'static>;

/// 检查点记录事件的发布/订阅登记表，每个时钟实例持有一份。
///
/// # 契约说明（What）
/// - 通知严格按订阅顺序同步派发；
/// - 订阅返回 [`BudgetEntrySubscription`]，析构时只摘除自身对应的一条登记；
/// - 通知期间登记表不持锁，观察者可以安全地再次记录检查点或追加订阅。
pub struct BudgetEntryHub {
    shared: Arc<HubShared>,
}

#[derive(Default)]
struct HubShared {
    observers: Mutex<Vec<RegisteredObserver>>,
    next_id: AtomicU64,
}

struct RegisteredObserver {
    id: u64,
    callback: BudgetEntryObserver,
}

impl BudgetEntryHub {
    /// 创建空登记表。
    pub fn new() -> Self {
        Self {
            shared: Arc::new(HubShared::default()),
        }
    }

    /// 追加一名观察者，返回作用域化的订阅凭据。
    pub fn subscribe(&self, observer: BudgetEntryObserver) -> BudgetEntrySubscription {
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        self.shared
            .observers
            .lock()
            .expect("budget observer registry lock poisoned")
            .push(RegisteredObserver {
                id,
                callback: observer,
            });
        BudgetEntrySubscription {
            shared: Arc::clone(&self.shared),
            id,
        }
    }

    /// 当前在册观察者数量，供诊断使用。
    pub fn observer_count(&self) -> usize {
        self.shared
            .observers
            .lock()
            .expect("budget observer registry lock poisoned")
            .len()
    }

    /// 按订阅顺序同步通知全部观察者。先快照再派发，避免观察者回调与登记表互锁。
    pub(crate) fn notify(&self, clock: &dyn Clock, budget: &TimeBudget, entry: &BudgetEntry) {
        let snapshot: Vec<BudgetEntryObserver> = self
            .shared
            .observers
            .lock()
            .expect("budget observer registry lock poisoned")
            .iter()
            .map(|registered| Arc::clone(&registered.callback))
            .collect();
        for callback in snapshot {
            callback(clock, budget, entry);
        }
    }
}

impl Default for BudgetEntryHub {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BudgetEntryHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetEntryHub")
            .field("observers", &self.observer_count())
            .finish()
    }
}

/// 订阅凭据：析构时精确摘除自身对应的观察者登记，不影响其他订阅。
pub struct BudgetEntrySubscription {
    shared: Arc<HubShared>,
    id: u64,
}

impl Drop for BudgetEntrySubscription {
    fn drop(&mut self) {
        self.shared
            .observers
            .lock()
            .expect("budget observer registry lock poisoned")
            .retain(|registered| registered.id != self.id);
    }
}

impl fmt::Debug for BudgetEntrySubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BudgetEntrySubscription")
            .field("id", &self.id)
            .finish()
    }
}

/// 锚定时钟起点的时间预算。
///
/// # 设计背景（Why）
/// - 额度以“起点 + 时长”表达而非截止时刻，起点在构造时一次性捕获且永不改变，
///   后续推进只影响 `elapsed`/`remaining` 的读数；
/// - 到期取消通过在所属时钟上登记到期动作实现：信号在时钟排水**真正抵达**
///   `起点 + 上限` 的瞬间触发，而不是因为时间在逻辑上已经越过该点——这正是虚拟
///   时钟下“到期即取消”能做到分毫不差的原因。
///
/// # 契约说明（What）
/// - 有界构造要求上限大于零；[`unlimited`](Self::unlimited) 构造的预算永不到期，
///   耗时读数仅作信息参考；
/// - [`cancel`](Self::cancel) 立即且不可逆地触发信号并强制 `is_exceeded` 为真；
/// - 台账为追加式序列，检查点一经记录永不改写。
pub struct TimeBudget {
    clock: Arc<dyn Clock>,
    start: Instant,
    limit: Option<Duration>,
    entries: Mutex<Vec<BudgetEntry>>,
    signal: CancellationSignal,
    forced: AtomicBool,
}

impl TimeBudget {
    /// 以给定上限创建有界预算，并在所属时钟上登记到期动作。
    ///
    /// # 错误（What）
    /// - 上限为零时返回 `clock.invalid_argument`。
    pub fn new(clock: Arc<dyn Clock>, limit: Duration) -> Result<Self, ClockError> {
        if limit.is_zero() {
            return Err(ClockError::invalid_argument(
                "time budget duration must be greater than zero",
            ));
        }
        let start = clock.now();
        let signal = CancellationSignal::new();
        let expiry = signal.clone();
        clock.schedule(
            Box::new(move |_clock| {
                Box::pin(async move {
                    expiry.trigger();
                })
            }),
            Some(limit),
        );
        Ok(Self {
            clock,
            start,
            limit: Some(limit),
            entries: Mutex::new(Vec::new()),
            signal,
            forced: AtomicBool::new(false),
        })
    }

    /// 创建永不到期的无界预算，耗时读数仅作信息参考。
    pub fn unlimited(clock: Arc<dyn Clock>) -> Self {
        let start = clock.now();
        Self {
            clock,
            start,
            limit: None,
            entries: Mutex::new(Vec::new()),
            signal: CancellationSignal::new(),
            forced: AtomicBool::new(false),
        }
    }

    /// 预算起点，构造时一次性捕获，之后永不改变。
    pub fn start_time(&self) -> Instant {
        self.start
    }

    /// 额度上限；无界预算为 `None`。
    pub fn limit(&self) -> Option<Duration> {
        self.limit
    }

    /// 是否为无界预算。
    pub fn is_unlimited(&self) -> bool {
        self.limit.is_none()
    }

    /// 自起点以来的已消耗时长。
    pub fn elapsed(&self) -> Duration {
        self.clock.now().saturating_duration_since(self.start)
    }

    /// 剩余额度，下限为零；无界预算报告 [`Duration::MAX`]。
    pub fn remaining(&self) -> Duration {
        match self.limit {
            Some(limit) => limit.saturating_sub(self.elapsed()),
            None => Duration::MAX,
        }
    }

    /// 是否已超出预算：耗时严格大于上限，或已被显式取消。无界且未取消时恒为假。
    pub fn is_exceeded(&self) -> bool {
        self.forced.load(Ordering::Acquire)
            || self.limit.is_some_and(|limit| self.elapsed() > limit)
    }

    /// 到期取消信号。
    pub fn cancellation_signal(&self) -> &CancellationSignal {
        &self.signal
    }

    /// 立即触发取消信号并强制 `is_exceeded` 为真；操作不可逆，与剩余额度无关。
    pub fn cancel(&self) {
        self.forced.store(true, Ordering::Release);
        self.signal.trigger();
    }

    /// 记录一个具名检查点并同步通知所属时钟上的全部观察者。
    ///
    /// # 契约说明（What）
    /// - 检查点按记录顺序追加进台账；
    /// - 观察者按订阅顺序依次收到（时钟，预算，检查点）三元组。
    pub fn record_entry(&self, name: impl Into<String>) -> BudgetEntry {
        let elapsed = self.elapsed();
        let entry = BudgetEntry {
            name: name.into(),
            elapsed,
            exceeded: self.limit.is_some_and(|limit| elapsed > limit),
        };
        self.entries
            .lock()
            .expect("budget ledger lock poisoned")
            .push(entry.clone());
        self.clock
            .budget_entry_hub()
            .notify(self.clock.as_ref(), self, &entry);
        entry
    }

    /// 记录检查点；若该检查点已超支，返回携带完整台账的 [`TimeBudgetExceeded`]。
    pub fn record_entry_checked(
        &self,
        name: impl Into<String>,
    ) -> Result<BudgetEntry, TimeBudgetExceeded> {
        let entry = self.record_entry(name);
        match (entry.exceeded, self.limit) {
            (true, Some(limit)) => Err(TimeBudgetExceeded::new(
                limit,
                entry.elapsed,
                self.entries(),
            )),
            _ => Ok(entry),
        }
    }

    /// 台账快照，按记录顺序排列；渲染结果可由快照幂等复现。
    pub fn entries(&self) -> Vec<BudgetEntry> {
        self.entries
            .lock()
            .expect("budget ledger lock poisoned")
            .clone()
    }
}

impl fmt::Debug for TimeBudget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimeBudget")
            .field("limit", &self.limit)
            .field("elapsed", &self.elapsed())
            .field("exceeded", &self.is_exceeded())
            .field("entries", &self.entries().len())
            .finish()
    }
}

/// 把时长渲染为排障友好的英文量词：整分钟/整小时用大单位，其余落到秒或毫秒。
pub(crate) fn format_duration(duration: Duration) -> String {
    const SECS_PER_MINUTE: u64 = 60;
    const SECS_PER_HOUR: u64 = 3_600;

    if duration.is_zero() {
        return "0 seconds".to_string();
    }
    let secs = duration.as_secs();
    if secs == 0 {
        let millis = duration.as_millis();
        if millis == 0 {
            return pluralize(duration.as_micros() as u64, "microsecond");
        }
        return pluralize(millis as u64, "millisecond");
    }
    if duration.subsec_nanos() == 0 {
        if secs % SECS_PER_HOUR == 0 {
            return pluralize(secs / SECS_PER_HOUR, "hour");
        }
        if secs % SECS_PER_MINUTE == 0 {
            return pluralize(secs / SECS_PER_MINUTE, "minute");
        }
        return pluralize(secs, "second");
    }
    let mut text = format!("{:.3}", duration.as_secs_f64());
    while text.ends_with('0') {
        text.pop();
    }
    if text.ends_with('.') {
        text.pop();
    }
    format!("{text} seconds")
}

fn pluralize(value: u64, unit: &str) -> String {
    if value == 1 {
        format!("1 {unit}")
    } else {
        format!("{value} {unit}s")
    }
}

/// 渲染单条台账行：预算内为 `✔`，超支为 `❌` 并标注超出量。
pub(crate) fn render_entry_line(entry: &BudgetEntry, limit: Duration) -> String {
    if entry.exceeded {
        format!(
            "❌ {} @ {} (budget exceeded by {})",
            entry.name,
            format_duration(entry.elapsed),
            format_duration(entry.elapsed.saturating_sub(limit))
        )
    } else {
        format!("✔ {} @ {}", entry.name, format_duration(entry.elapsed))
    }
}
