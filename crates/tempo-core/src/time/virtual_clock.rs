//! 虚拟时间调度引擎：单泵“推进至边界”的确定性排水算法。
//!
//! # 模块定位（Why）
//! - 测试中需要把“三个各自等待的逻辑参与者”按到期时间与登记顺序确定性地交织执行，
//!   且不依赖真实线程与真实时间；
//! - 引擎对每个 [`VirtualClock`] 实例只允许同时存在一个排水泵（pump）：嵌套的推进请求
//!   绝不会启动第二条排水循环，从根上杜绝同一动作被重复触发。
//!
//! # 核心算法（How）
//! - 待触发条目按 `(到期时刻, 登记序号)` 排序，形成稳定 FIFO 的最小堆；
//! - 推进请求要么成为泵（边界 = 请求目标），要么挂起等待：从动作体内部发起的再入
//!   请求把边界抬升到 `max(当前边界, 请求目标)`，外部任务的并发请求则登记为等待方，
//!   在进度覆盖自身目标时被唤醒，或在泵终结后接管剩余排水；
//! - 泵循环弹出边界内最早到期的条目，先把 `elapsed` 设为该条目的到期时刻（动作体
//!   观察到的是自己的到期时间，而非最终边界），再完整驱动动作体；
//! - 动作体因**虚拟条件**（嵌套 `sleep`/`advance`）挂起时，由泵按恢复条件寄存并继续
//!   排水，条件满足的瞬间恢复轮询；动作体因**真实异步工作**挂起时，泵原样上抛
//!   `Pending`，由宿主执行器驱动完成后再继续排水；
//! - 边界内再无条目且无可恢复的挂起体时，`elapsed` 精确落到边界值，唤醒全部等待方。
//!
//! # 并发契约（What）
//! - 虚拟模式为单逻辑线程协作调度：任意时刻只有一个动作体在执行；
//! - `now` 永不回退；相同到期时刻的动作严格按登记顺序触发；
//! - 引擎状态由 `Mutex` 保护，但锁绝不跨动作体轮询持有；句柄可跨线程克隆，
//!   单个实例不为多真实线程并发突变设计。

use std::collections::{BinaryHeap, HashMap};
use std::fmt;
use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard};
use std::task::{Context, Poll, Waker};
use std::time::{Duration, Instant};

use crate::error::ClockError;
use crate::time::budget::BudgetEntryHub;
use crate::time::clock::{Clock, ScheduleKey, ScheduledBody, Sleep};

/// 虚拟时钟：通过手动推进时间，在测试中复现确定性的触发序列。
///
/// # 设计动机（Why）
/// - 延迟、超时与预算逻辑需要在 CI 中保证 100% 可重复；
/// - 虚拟时钟允许测试显式控制时间推进，所有动作在推进请求的驱动下同步触发。
///
/// # 契约说明（What）
/// - `now = 起始时刻 + 已推进偏移`，起始时刻在构造时固定；
/// - [`schedule`](Self::schedule) 仅登记动作，绝不触发执行；
/// - [`advance_to`](Self::advance_to) / [`advance_by`](Self::advance_by) /
///   [`sleep`](Self::sleep) 共享同一套推进协议，允许从正在执行的动作体内部再入调用；
/// - 句柄克隆共享同一引擎状态。
#[derive(Clone)]
pub struct VirtualClock {
    inner: Arc<VirtualClockInner>,
}

struct VirtualClockInner {
    state: Mutex<EngineState>,
    hub: BudgetEntryHub,
}

struct EngineState {
    origin: Instant,
    elapsed: Duration,
    queue: BinaryHeap<QueueSlot>,
    next_seq: u64,
    next_wait: u64,
    waits: HashMap<u64, WaitCell>,
    pump: Option<PumpState>,
    /// 泵正处于某个动作体的轮询之中；此窗口内发起的推进请求属于再入调用。
    in_body_poll: bool,
    /// 动作体轮询期间登记的虚拟挂起条件，由泵在轮询返回后取走。
    suspension: Option<Suspension>,
}

/// 待触发条目：`(due, seq)` 反序比较使 `BinaryHeap` 表现为稳定 FIFO 的最小堆。
struct QueueSlot {
    due: Duration,
    seq: u64,
    entry: QueueEntry,
}

enum QueueEntry {
    /// 用户登记的动作体。
    Action(ScheduledBody),
    /// `sleep` 登记的完成标记：触发即宣告对应等待到期。
    WaitResume(u64),
}

impl PartialEq for QueueSlot {
    fn eq(&self, other: &Self) -> bool {
        self.due == other.due && self.seq == other.seq
    }
}

impl Eq for QueueSlot {}

impl PartialOrd for QueueSlot {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueueSlot {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (other.due, other.seq).cmp(&(self.due, self.seq))
    }
}

/// `sleep` 完成标记的登记单元；标记弹出时置位，等待 Future 以此判定完成。
#[derive(Debug, Default)]
struct WaitCell {
    fired: bool,
}

struct PumpState {
    frontier: Duration,
    waiters: Vec<AdvanceWaiter>,
    next_waiter: u64,
}

impl PumpState {
    fn new(frontier: Duration) -> Self {
        Self {
            frontier,
            waiters: Vec::new(),
            next_waiter: 0,
        }
    }
}

/// 泵激活期间从外部任务发起的推进请求：进度覆盖 `target` 时唤醒。
struct AdvanceWaiter {
    id: u64,
    target: Duration,
    waker: Waker,
}

/// 动作体在泵内挂起的恢复条件。
#[derive(Clone, Copy, Debug)]
enum Suspension {
    /// 等待指定的完成标记被弹出（嵌套 `sleep`）。
    UntilWait(u64),
    /// 等待泵进度覆盖目标时刻（嵌套 `advance_to`/`advance_by`）。
    UntilProgress(Duration),
}

impl VirtualClock {
    /// 创建起始时刻为当前系统时间的虚拟时钟。
    pub fn new() -> Self {
        Self::with_start(Instant::now())
    }

    /// 以指定起始时刻构造虚拟时钟，便于在测试中固定初始基准。
    pub fn with_start(origin: Instant) -> Self {
        Self {
            inner: Arc::new(VirtualClockInner {
                state: Mutex::new(EngineState {
                    origin,
                    elapsed: Duration::ZERO,
                    queue: BinaryHeap::new(),
                    next_seq: 0,
                    next_wait: 0,
                    waits: HashMap::new(),
                    pump: None,
                    in_body_poll: false,
                    suspension: None,
                }),
                hub: BudgetEntryHub::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.inner
            .state
            .lock()
            .expect("virtual-clock state lock poisoned")
    }

    /// 当前虚拟时间点。
    pub fn now(&self) -> Instant {
        let state = self.lock();
        state.origin + state.elapsed
    }

    /// 自起始时刻以来累计推进的虚拟时长。
    pub fn elapsed(&self) -> Duration {
        self.lock().elapsed
    }

    /// 未触发条目总数（含 `sleep` 完成标记与预算到期动作），供诊断使用。
    pub fn pending_actions(&self) -> usize {
        self.lock().queue.len()
    }

    /// 登记一个到期动作。
    ///
    /// # 契约说明（What）
    /// - 到期时刻 = 登记瞬间的 `now` + `due_offset`（`None` 视为零偏移，即“时钟下一次
    ///   推进任意正量时触发”）；
    /// - 仅入队，不触发执行；相同到期时刻按登记顺序稳定排序。
    pub fn schedule(&self, body: ScheduledBody, due_offset: Option<Duration>) -> ScheduleKey {
        let mut state = self.lock();
        let due = state.elapsed.saturating_add(due_offset.unwrap_or_default());
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(QueueSlot {
            due,
            seq,
            entry: QueueEntry::Action(body),
        });
        ScheduleKey::new(seq)
    }

    /// 请求把虚拟时间推进到绝对时刻 `target`。
    ///
    /// # 契约说明（What）
    /// - `target` 早于当前时间时立即失败，`now` 保持不变；`target == now` 合法且
    ///   立即完成（到期时刻等于当前时间的条目在下一次正量推进时触发）；
    /// - 返回的 Future 完成时，`now >= target` 且边界内全部条目已触发。
    ///
    /// # 再入语义（How）
    /// - 从动作体内部调用时不会启动第二个泵，而是抬升当前泵的边界并挂起调用方，
    ///   直至进度覆盖 `target`；边界的再入式增长没有上限。
    pub fn advance_to(&self, target: Instant) -> Result<AdvanceDrive, ClockError> {
        let state = self.lock();
        let now = state.origin + state.elapsed;
        let Some(delta) = target.checked_duration_since(now) else {
            return Err(ClockError::backward_advance());
        };
        Ok(AdvanceDrive {
            inner: Arc::clone(&self.inner),
            target: state.elapsed.saturating_add(delta),
            stage: DriveStage::Idle,
        })
    }

    /// 请求把虚拟时间推进 `delta`，等价于 `advance_to(now + delta)`。
    ///
    /// 负的推进量在类型层面不可表达（[`Duration`] 无符号），因此本方法不会失败。
    pub fn advance_by(&self, delta: Duration) -> AdvanceDrive {
        let state = self.lock();
        AdvanceDrive {
            inner: Arc::clone(&self.inner),
            target: state.elapsed.saturating_add(delta),
            stage: DriveStage::Idle,
        }
    }

    /// 登记一个 `duration` 之后到期的完成标记并返回等待 Future。
    ///
    /// # 契约说明（What）
    /// - 标记在调用瞬间入队（到期时刻 = 此刻 `now` + `duration`），与其他条目共享
    ///   FIFO 排序；等待 Future 在标记被弹出时完成；
    /// - 首次轮询时执行与 [`advance_by`](Self::advance_by) 相同的推进协议；支持从动作
    ///   体内部再入调用。
    pub fn sleep(&self, duration: Duration) -> VirtualSleep {
        let mut state = self.lock();
        let target = state.elapsed.saturating_add(duration);
        let wait_id = state.next_wait;
        state.next_wait += 1;
        state.waits.insert(wait_id, WaitCell::default());
        let seq = state.next_seq;
        state.next_seq += 1;
        state.queue.push(QueueSlot {
            due: target,
            seq,
            entry: QueueEntry::WaitResume(wait_id),
        });
        VirtualSleep {
            inner: Arc::clone(&self.inner),
            wait_id,
            target,
            stage: SleepStage::Armed,
        }
    }

    /// 距离最近一个未触发条目的剩余时长；队列为空时为 `None`。
    ///
    /// 已触发的条目被永久移出统计，无论其到期时刻相对后续推进位于过去还是未来。
    pub fn time_until_next_due(&self) -> Option<Duration> {
        let state = self.lock();
        state
            .queue
            .peek()
            .map(|slot| slot.due.saturating_sub(state.elapsed))
    }
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for VirtualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.lock();
        f.debug_struct("VirtualClock")
            .field("elapsed", &state.elapsed)
            .field("pending", &state.queue.len())
            .field("pump_active", &state.pump.is_some())
            .finish()
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> Instant {
        VirtualClock::now(self)
    }

    fn sleep(&self, duration: Duration) -> Sleep {
        Box::pin(VirtualClock::sleep(self, duration))
    }

    fn schedule(&self, body: ScheduledBody, due_offset: Option<Duration>) -> ScheduleKey {
        VirtualClock::schedule(self, body, due_offset)
    }

    fn time_until_next_due(&self) -> Option<Duration> {
        VirtualClock::time_until_next_due(self)
    }

    fn budget_entry_hub(&self) -> &BudgetEntryHub {
        &self.inner.hub
    }
}

/// 推进请求对应的 Future。
///
/// # 生命周期（What）
/// - 首次轮询时要么接管泵，要么登记为等待方；
/// - 完成时保证 `elapsed >= target`；
/// - 推进中途被丢弃时释放泵所有权并唤醒全部等待方，由其中之一接管剩余排水。
pub struct AdvanceDrive {
    inner: Arc<VirtualClockInner>,
    target: Duration,
    stage: DriveStage,
}

enum DriveStage {
    Idle,
    Pumping(Pump),
    /// 已登记为等待方；`Some(id)` 指向泵内等待表中的登记项，`None` 表示再入挂起。
    Waiting(Option<u64>),
    Done,
}

impl Future for AdvanceDrive {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.stage {
                DriveStage::Idle | DriveStage::Waiting(_) => {
                    let waiter_id = match &this.stage {
                        DriveStage::Waiting(id) => *id,
                        _ => None,
                    };
                    let mut state = lock_state(&this.inner);
                    if state.elapsed >= this.target {
                        this.stage = DriveStage::Done;
                        return Poll::Ready(());
                    }
                    if state.pump.is_some() {
                        if state.in_body_poll {
                            raise_frontier(&mut state, this.target);
                            state.suspension = Some(Suspension::UntilProgress(this.target));
                            this.stage = DriveStage::Waiting(None);
                        } else {
                            let id = register_waiter(&mut state, waiter_id, this.target, cx);
                            this.stage = DriveStage::Waiting(Some(id));
                        }
                        return Poll::Pending;
                    }
                    state.pump = Some(PumpState::new(this.target));
                    drop(state);
                    this.stage = DriveStage::Pumping(Pump::new(Arc::clone(&this.inner)));
                }
                DriveStage::Pumping(pump) => match pump.poll_drain(cx) {
                    Poll::Ready(()) => {
                        this.stage = DriveStage::Done;
                        return Poll::Ready(());
                    }
                    Poll::Pending => return Poll::Pending,
                },
                DriveStage::Done => return Poll::Ready(()),
            }
        }
    }
}

impl fmt::Debug for AdvanceDrive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            DriveStage::Idle => "idle",
            DriveStage::Pumping(_) => "pumping",
            DriveStage::Waiting(_) => "waiting",
            DriveStage::Done => "done",
        };
        f.debug_struct("AdvanceDrive")
            .field("target", &self.target)
            .field("stage", &stage)
            .finish()
    }
}

/// `sleep` 返回的等待 Future；完成标记在构造时已入队。
pub struct VirtualSleep {
    inner: Arc<VirtualClockInner>,
    wait_id: u64,
    target: Duration,
    stage: SleepStage,
}

enum SleepStage {
    Armed,
    Pumping(Pump),
    /// 已登记等待；`Some(id)` 指向泵内等待表中的登记项，`None` 表示再入挂起。
    Registered(Option<u64>),
    Done,
}

impl Future for VirtualSleep {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        loop {
            match &mut this.stage {
                SleepStage::Armed | SleepStage::Registered(_) => {
                    let waiter_id = match &this.stage {
                        SleepStage::Registered(id) => *id,
                        _ => None,
                    };
                    let mut state = lock_state(&this.inner);
                    let fired = state
                        .waits
                        .get(&this.wait_id)
                        .is_none_or(|cell| cell.fired);
                    if fired {
                        state.waits.remove(&this.wait_id);
                        this.stage = SleepStage::Done;
                        return Poll::Ready(());
                    }
                    if state.pump.is_some() {
                        if state.in_body_poll {
                            raise_frontier(&mut state, this.target);
                            state.suspension = Some(Suspension::UntilWait(this.wait_id));
                            this.stage = SleepStage::Registered(None);
                        } else {
                            let id = register_waiter(&mut state, waiter_id, this.target, cx);
                            this.stage = SleepStage::Registered(Some(id));
                        }
                        return Poll::Pending;
                    }
                    state.pump = Some(PumpState::new(this.target));
                    drop(state);
                    this.stage = SleepStage::Pumping(Pump::new(Arc::clone(&this.inner)));
                }
                SleepStage::Pumping(pump) => match pump.poll_drain(cx) {
                    Poll::Ready(()) => {
                        // 自驱排水结束即意味着自身标记已触发（边界必然覆盖到期时刻）。
                        lock_state(&this.inner).waits.remove(&this.wait_id);
                        this.stage = SleepStage::Done;
                        return Poll::Ready(());
                    }
                    Poll::Pending => return Poll::Pending,
                },
                SleepStage::Done => return Poll::Ready(()),
            }
        }
    }
}

impl fmt::Debug for VirtualSleep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self.stage {
            SleepStage::Armed => "armed",
            SleepStage::Pumping(_) => "pumping",
            SleepStage::Registered(_) => "registered",
            SleepStage::Done => "done",
        };
        f.debug_struct("VirtualSleep")
            .field("wait_id", &self.wait_id)
            .field("target", &self.target)
            .field("stage", &stage)
            .finish()
    }
}

impl Drop for VirtualSleep {
    fn drop(&mut self) {
        if !matches!(self.stage, SleepStage::Done) {
            // 提前放弃的等待：摘除登记单元，队列中的标记触发时自然落空。
            let mut state = lock_state(&self.inner);
            state.waits.remove(&self.wait_id);
        }
    }
}

fn lock_state(inner: &VirtualClockInner) -> MutexGuard<'_, EngineState> {
    inner
        .state
        .lock()
        .expect("virtual-clock state lock poisoned")
}

fn raise_frontier(state: &mut EngineState, target: Duration) {
    let pump = state.pump.as_mut().expect("pump state missing");
    pump.frontier = pump.frontier.max(target);
}

/// 登记（或刷新）一名外部等待方，返回其在等待表中的标识。
fn register_waiter(
    state: &mut EngineState,
    existing: Option<u64>,
    target: Duration,
    cx: &Context<'_>,
) -> u64 {
    let pump = state.pump.as_mut().expect("pump state missing");
    if let Some(id) = existing
        && let Some(waiter) = pump.waiters.iter_mut().find(|waiter| waiter.id == id)
    {
        if !waiter.waker.will_wake(cx.waker()) {
            waiter.waker = cx.waker().clone();
        }
        return id;
    }
    let id = pump.next_waiter;
    pump.next_waiter += 1;
    pump.waiters.push(AdvanceWaiter {
        id,
        target,
        waker: cx.waker().clone(),
    });
    id
}

/// 摘除进度已覆盖其目标的等待方，返回待唤醒的 waker 列表。
fn drain_satisfied_waiters(state: &mut EngineState) -> Vec<Waker> {
    let elapsed = state.elapsed;
    let Some(pump) = state.pump.as_mut() else {
        return Vec::new();
    };
    let (ready, keep): (Vec<_>, Vec<_>) = mem::take(&mut pump.waiters)
        .into_iter()
        .partition(|waiter| waiter.target <= elapsed);
    pump.waiters = keep;
    ready.into_iter().map(|waiter| waiter.waker).collect()
}

/// 泵：唯一的排水循环，寄存在首个接管推进的 Future 内部。
///
/// # 状态说明（What）
/// - `in_flight`：正在驱动的动作体；
/// - `parked_waits`：因嵌套 `sleep` 挂起的动作体，按完成标记恢复；
/// - `parked_progress`：因嵌套推进请求挂起的动作体，按 `(恢复时刻, 挂起顺序)` 恢复；
/// - 恢复时刻与队列条目到期时刻相同时，条目优先——与顶层推进“先触发边界内条目、
///   再返回”的语义保持一致。
struct Pump {
    inner: Arc<VirtualClockInner>,
    in_flight: Option<Sleep>,
    parked_waits: HashMap<u64, Sleep>,
    parked_progress: Vec<ParkedBody>,
    park_seq: u64,
    finished: bool,
}

struct ParkedBody {
    resume_at: Duration,
    order: u64,
    fut: Sleep,
}

impl Pump {
    fn new(inner: Arc<VirtualClockInner>) -> Self {
        Self {
            inner,
            in_flight: None,
            parked_waits: HashMap::new(),
            parked_progress: Vec::new(),
            park_seq: 0,
            finished: false,
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        lock_state(&self.inner)
    }

    /// 执行排水循环，直至边界内再无可触发条目与可恢复挂起体。
    ///
    /// # 执行步骤（How）
    /// 1. 驱动在执行中的动作体：完成则继续；因虚拟条件挂起则寄存；因真实异步工作
    ///    挂起则原样返回 `Pending`，让宿主执行器先把该工作驱动完；
    /// 2. 比较“边界内最早到期条目”与“最早可恢复挂起体”，较早者先处理（相同时刻
    ///    条目优先）；
    /// 3. 两者皆无时把 `elapsed` 精确落到边界、唤醒全部等待方并终结泵。
    fn poll_drain(&mut self, cx: &mut Context<'_>) -> Poll<()> {
        loop {
            if let Some(mut fut) = self.in_flight.take() {
                {
                    let mut state = self.lock();
                    state.in_body_poll = true;
                    state.suspension = None;
                }
                let polled = fut.as_mut().poll(cx);
                let suspension = {
                    let mut state = self.lock();
                    state.in_body_poll = false;
                    state.suspension.take()
                };
                match polled {
                    Poll::Ready(()) => {}
                    Poll::Pending => match suspension {
                        Some(Suspension::UntilWait(id)) => {
                            self.parked_waits.insert(id, fut);
                        }
                        Some(Suspension::UntilProgress(resume_at)) => {
                            let order = self.park_seq;
                            self.park_seq += 1;
                            self.parked_progress.push(ParkedBody {
                                resume_at,
                                order,
                                fut,
                            });
                        }
                        None => {
                            self.in_flight = Some(fut);
                            return Poll::Pending;
                        }
                    },
                }
                continue;
            }

            let mut state = self.lock();
            let frontier = state.pump.as_ref().expect("pump state missing").frontier;
            let next_due = state
                .queue
                .peek()
                .and_then(|slot| (slot.due <= frontier).then_some(slot.due));
            let next_resume = self
                .parked_progress
                .iter()
                .map(|parked| parked.resume_at)
                .min();
            debug_assert!(
                next_resume.is_none_or(|resume| resume <= frontier),
                "parked body beyond frontier"
            );

            match (next_due, next_resume) {
                (Some(due), resume) if resume.is_none_or(|resume| due <= resume) => {
                    let slot = state.queue.pop().expect("peeked queue entry vanished");
                    state.elapsed = state.elapsed.max(slot.due);
                    let wakers = drain_satisfied_waiters(&mut state);
                    match slot.entry {
                        QueueEntry::Action(body) => {
                            drop(state);
                            wake_all(wakers);
                            let clock: Arc<dyn Clock> = Arc::new(VirtualClock {
                                inner: Arc::clone(&self.inner),
                            });
                            self.in_flight = Some(body(clock));
                        }
                        QueueEntry::WaitResume(id) => {
                            // 等待方可能已提前放弃该标记，登记单元随之消失。
                            if let Some(cell) = state.waits.get_mut(&id) {
                                cell.fired = true;
                            }
                            drop(state);
                            wake_all(wakers);
                            if let Some(fut) = self.parked_waits.remove(&id) {
                                self.in_flight = Some(fut);
                            }
                        }
                    }
                }
                (_, Some(resume)) => {
                    state.elapsed = state.elapsed.max(resume);
                    let wakers = drain_satisfied_waiters(&mut state);
                    drop(state);
                    wake_all(wakers);
                    let index = self
                        .parked_progress
                        .iter()
                        .enumerate()
                        .min_by_key(|(_, parked)| (parked.resume_at, parked.order))
                        .map(|(index, _)| index)
                        .expect("parked body vanished");
                    let parked = self.parked_progress.remove(index);
                    self.in_flight = Some(parked.fut);
                }
                (None, None) => {
                    state.elapsed = state.elapsed.max(frontier);
                    let pump = state.pump.take().expect("pump state missing");
                    drop(state);
                    for waiter in pump.waiters {
                        waiter.waker.wake();
                    }
                    self.finished = true;
                    return Poll::Ready(());
                }
            }
        }
    }
}

impl Drop for Pump {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // 推进中途被放弃：释放泵所有权并唤醒全部等待方，由其中之一接管剩余排水。
        let waiters = {
            let mut state = self.lock();
            state
                .pump
                .take()
                .map(|pump| pump.waiters)
                .unwrap_or_default()
        };
        for waiter in waiters {
            waiter.waker.wake();
        }
    }
}

fn wake_all(wakers: Vec<Waker>) {
    for waker in wakers {
        waker.wake();
    }
}
