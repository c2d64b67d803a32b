//! 时钟能力契约与真实时钟实现。
//!
//! # 模块定位（Why）
//! - 延迟、超时与预算逻辑若直接读取宿主时钟，将无法在 CI 中复现；[`Clock`] trait 把
//!   “读取当前时间 / 登记动作 / 等待时长”统一为可注入能力，生产环境与测试环境共享
//!   同一套调用面；
//! - 真实实现 [`SystemClock`] 刻意保持零配置：`std` 构建默认可用，不绑定任何异步运行时。
//!
//! # 结构概览（What）
//! - [`Sleep`]：统一的延迟 Future 形态；
//! - [`ScheduledBody`] / [`ScheduleKey`]：被登记动作的载体与关联键；
//! - [`Clock`]：核心能力 trait；
//! - [`SystemClock`]：基于辅助线程的真实时钟。
//!
//! # 使用指引（How）
//! - 业务代码通过 `Arc<dyn Clock>` 注入时间源；
//! - 测试场景改用 [`crate::time::VirtualClock`] 并手动推进时间。

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Wake, Waker};
use std::thread;
use std::time::{Duration, Instant};

use crate::time::budget::BudgetEntryHub;

/// `Sleep` 为时钟接口返回的统一延迟 Future 类型。
///
/// # 设计意图（Why）
/// - 以 `Pin<Box<dyn Future>>` 表达异步等待原语，避免将具体运行时渗透进框架 API；
/// - 统一 Future 形态便于在测试中替换实现，同时满足对象安全需求。
///
/// # 契约说明（What）
/// - Future 完成即表示指定时长已经过去（真实或虚拟）；
/// - 实现必须遵守标准 Future 契约：返回 `Poll::Pending` 后在状态变化时唤醒登记的 waker。
pub type Sleep = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// 被登记动作的函数体：接收所属时钟，返回引擎需要完整驱动的 Future。
///
/// # 契约说明（What）
/// - 函数体通过入参时钟可以再次调用 `now`/`schedule`/`sleep`，支撑嵌套调度；
/// - 同步动作以立即就绪的 Future 包裹（`Box::pin(async move { .. })`）。
pub type ScheduledBody = Box<dyn FnOnce(Arc<dyn Clock>) -> Sleep + Send + 'static>;

/// 登记动作时返回的关联键。
///
/// # 契约说明（What）
/// - 键值在所属时钟实例内单调递增且唯一，可作为日志与诊断的关联标识；
/// - 键不提供撤销能力：已登记的动作必然在其到期时刻被消费一次。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduleKey(u64);

impl ScheduleKey {
    pub(crate) fn new(value: u64) -> Self {
        Self(value)
    }

    /// 原始键值。
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// 抽象可注入的时钟能力。
///
/// # 设计背景（Why）
/// - 预算、超时与取消均依赖可靠的时间来源；通过 trait 注入后，生产环境使用真实时间，
///   测试使用可控的虚拟时间，业务代码无需分支。
///
/// # 接口约束（What）
/// - `now`：返回当前时间点，实现必须保证单调不回退；
/// - `sleep`：返回一个在给定时长后完成的 Future；
/// - `schedule`：登记一个在 `due_offset` 之后到期的动作；`None` 表示“在当前时刻到期”，
///   即时钟下一次推进任意正量时触发——缺省到期语义由调用点的 `Option` 显式表达，
///   而非从参数缺失推断；
/// - `time_until_next_due`：距离最近一个未触发动作的剩余时长，无待触发动作时为 `None`；
/// - `budget_entry_hub`：预算检查点观察者的登记入口（见 [`crate::time::TimeBudget`]）。
///
/// # 使用指引（How）
/// - 推荐通过 `Arc<dyn Clock>` 传递给需要时间能力的组件；
/// - 动作函数体内的嵌套调用以入参时钟为准，不得缓存外部时钟引用。
pub trait Clock: Send + Sync + 'static {
    /// 返回当前时间点。
    fn now(&self) -> Instant;

    /// 返回一个在指定时长后完成的等待 Future。
    fn sleep(&self, duration: Duration) -> Sleep;

    /// 登记一个到期动作，返回关联键。
    fn schedule(&self, body: ScheduledBody, due_offset: Option<Duration>) -> ScheduleKey;

    /// 距离最近一个未触发动作的剩余时长。
    fn time_until_next_due(&self) -> Option<Duration>;

    /// 预算检查点观察者的登记入口。
    fn budget_entry_hub(&self) -> &BudgetEntryHub;
}

/// 基于标准库线程实现的真实时钟。
///
/// # 设计动机（Why）
/// - 避免强依赖特定异步运行时，让 `std` 构建默认即可使用；
/// - 通过辅助线程实现异步等待与到期动作，在不引入额外运行时的情况下满足
///   “等待后唤醒”的契约。
///
/// # 契约说明（What）
/// - `now` 直接返回 [`Instant::now`]；
/// - `sleep` 与 `schedule` 各自启动一个辅助线程执行阻塞睡眠；高频场景应注入自定义
///   [`Clock`] 以减少线程创建开销；
/// - `time_until_next_due` 恒为 `None`：真实时钟不持有可检视的待触发队列，该能力仅由
///   虚拟调度引擎提供。
#[derive(Clone, Debug, Default)]
pub struct SystemClock {
    inner: Arc<SystemClockInner>,
}

#[derive(Debug, Default)]
struct SystemClockInner {
    hub: BudgetEntryHub,
    next_key: AtomicU64,
}

impl SystemClock {
    /// 创建新的真实时钟句柄。克隆句柄共享同一观察者登记表。
    pub fn new() -> Self {
        Self::default()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(HostSleep::spawn(duration))
    }

    fn schedule(&self, body: ScheduledBody, due_offset: Option<Duration>) -> ScheduleKey {
        let key = ScheduleKey::new(self.inner.next_key.fetch_add(1, Ordering::Relaxed));
        let clock: Arc<dyn Clock> = Arc::new(self.clone());
        thread::spawn(move || {
            if let Some(delay) = due_offset
                && !delay.is_zero()
            {
                thread::sleep(delay);
            }
            block_on_parked(body(clock));
        });
        key
    }

    fn time_until_next_due(&self) -> Option<Duration> {
        None
    }

    fn budget_entry_hub(&self) -> &BudgetEntryHub {
        &self.inner.hub
    }
}

/// 线程驱动的等待 Future，提供最小可行的“等待后唤醒”实现。
///
/// # 执行逻辑（How）
/// - 构造时启动一个后台线程执行阻塞睡眠；线程醒来后标记完成位并唤醒登记的 waker；
/// - `poll` 在未完成时记录最新 waker 并返回 `Poll::Pending`，登记后复查完成位以封堵
///   “登记与完成交错”的竞态窗口。
///
/// # 风险提示（Trade-offs）
/// - 每次等待占用一个辅助线程，换来零运行时依赖；若 Future 提前被丢弃，后台线程
///   最终自行退出，不会唤醒已释放的 waker。
struct HostSleep {
    shared: Arc<HostSleepShared>,
}

#[derive(Debug, Default)]
struct HostSleepShared {
    done: AtomicBool,
    waker: Mutex<Option<Waker>>,
}

impl HostSleep {
    fn spawn(duration: Duration) -> Self {
        let shared = Arc::new(HostSleepShared::default());
        let worker = Arc::clone(&shared);
        thread::spawn(move || {
            thread::sleep(duration);
            worker.done.store(true, Ordering::Release);
            let waker = worker
                .waker
                .lock()
                .expect("host-sleep waker lock poisoned")
                .take();
            if let Some(waker) = waker {
                waker.wake();
            }
        });
        Self { shared }
    }
}

impl Future for HostSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared.done.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        {
            let mut slot = self
                .shared
                .waker
                .lock()
                .expect("host-sleep waker lock poisoned");
            if !slot
                .as_ref()
                .is_some_and(|existing| existing.will_wake(cx.waker()))
            {
                *slot = Some(cx.waker().clone());
            }
        }
        if self.shared.done.load(Ordering::Acquire) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// 在辅助线程上将动作 Future 驱动至完成的最小执行器。
///
/// # 执行逻辑（How）
/// - 以当前线程的 `unpark` 作为唤醒信号（[`std::task::Wake`] 免去手写 vtable）；
/// - `Pending` 时 `park` 等待，被唤醒后继续轮询，直至 `Ready`。
fn block_on_parked(mut fut: Sleep) {
    struct ThreadUnparker {
        thread: thread::Thread,
    }

    impl Wake for ThreadUnparker {
        fn wake(self: Arc<Self>) {
            self.thread.unpark();
        }

        fn wake_by_ref(self: &Arc<Self>) {
            self.thread.unpark();
        }
    }

    let waker = Waker::from(Arc::new(ThreadUnparker {
        thread: thread::current(),
    }));
    let mut cx = Context::from_waker(&waker);
    loop {
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(()) => return,
            Poll::Pending => thread::park(),
        }
    }
}
