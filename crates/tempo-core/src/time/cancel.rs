//! 到期取消信号与“超支即放弃”竞速适配器。
//!
//! # 模块定位（Why）
//! - 预算的到期不能靠调用方轮询：信号必须在所属时钟抵达到期瞬间主动触发，并唤醒
//!   所有等待方；
//! - [`cancel_if_exceeds`] 把“一段在途异步工作”与“预算的取消信号”放进同一次竞速，
//!   工作先完成则原样返回其结果，信号先触发则按是否提供兜底分别取值或报错——
//!   二者有且仅有其一，绝不越过到期时刻继续悬挂。
//!
//! # 并发契约（What）
//! - 信号触发不可逆；触发与 waker 登记之间的竞态窗口由“登记后复查”封堵；
//! - 竞速不会强行终止在途工作：信号先触发时工作被放弃（随 Future 一起析构），
//!   而非被抢占。

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll, Waker};
use std::time::Duration;

use crate::error::ClockError;
use crate::time::budget::TimeBudget;

/// 不可逆的取消信号。
///
/// # 契约说明（What）
/// - [`trigger`](Self::trigger) 首次调用生效并唤醒全部登记的等待方，后续调用为空操作；
/// - 克隆句柄共享同一触发状态；
/// - [`triggered`](Self::triggered) 返回可多次创建的等待 Future。
#[derive(Clone, Debug, Default)]
pub struct CancellationSignal {
    shared: Arc<SignalShared>,
}

#[derive(Debug, Default)]
struct SignalShared {
    triggered: AtomicBool,
    wakers: Mutex<Vec<Waker>>,
}

impl CancellationSignal {
    /// 创建未触发的信号。
    pub fn new() -> Self {
        Self::default()
    }

    /// 信号是否已触发。
    pub fn is_triggered(&self) -> bool {
        self.shared.triggered.load(Ordering::Acquire)
    }

    /// 触发信号并唤醒全部等待方；幂等，首次调用之后即为空操作。
    pub fn trigger(&self) {
        if !self.shared.triggered.swap(true, Ordering::AcqRel) {
            let wakers = mem::take(
                &mut *self
                    .shared
                    .wakers
                    .lock()
                    .expect("cancellation waker registry lock poisoned"),
            );
            for waker in wakers {
                waker.wake();
            }
        }
    }

    /// 返回在信号触发时完成的等待 Future。
    pub fn triggered(&self) -> Triggered {
        Triggered {
            shared: Arc::clone(&self.shared),
        }
    }
}

/// [`CancellationSignal::triggered`] 返回的等待 Future。
#[derive(Debug)]
pub struct Triggered {
    shared: Arc<SignalShared>,
}

impl Future for Triggered {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.shared.triggered.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        {
            let mut wakers = self
                .shared
                .wakers
                .lock()
                .expect("cancellation waker registry lock poisoned");
            if !wakers.iter().any(|existing| existing.will_wake(cx.waker())) {
                wakers.push(cx.waker().clone());
            }
        }
        // 登记后复查，封堵“检查与登记交错于触发”的竞态窗口。
        if self.shared.triggered.load(Ordering::Acquire) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

/// 让在途工作与预算取消信号竞速；信号先触发时以 `budget.exceeded` 报错。
///
/// # 契约说明（What）
/// - 每次轮询先问工作、后问信号：工作与信号同时就绪时工作胜出，结果二选一；
/// - 信号先触发时在途工作被放弃（随返回的 Future 析构），不会被强行终止。
pub fn cancel_if_exceeds<F>(budget: &TimeBudget, work: F) -> CancelIfExceeds<F>
where
    F: Future,
{
    CancelIfExceeds {
        work: Box::pin(work),
        expiry: budget.cancellation_signal().triggered(),
        limit: budget.limit(),
    }
}

/// [`cancel_if_exceeds`] 返回的竞速 Future。
pub struct CancelIfExceeds<F: Future> {
    work: Pin<Box<F>>,
    expiry: Triggered,
    limit: Option<Duration>,
}

impl<F: Future> Future for CancelIfExceeds<F> {
    type Output = Result<F::Output, ClockError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Poll::Ready(output) = this.work.as_mut().poll(cx) {
            return Poll::Ready(Ok(output));
        }
        if Pin::new(&mut this.expiry).poll(cx).is_ready() {
            return Poll::Ready(Err(ClockError::budget_exceeded(this.limit)));
        }
        Poll::Pending
    }
}

/// 带兜底的竞速变体：信号先触发时改为采纳兜底生产者的结果。
///
/// # 契约说明（What）
/// - 兜底生产者与在途工作返回同一类型；
/// - 工作先完成则兜底从不被调用；信号先触发则工作被放弃、兜底恰好执行一次。
pub fn cancel_if_exceeds_or<F>(
    budget: &TimeBudget,
    work: F,
    fallback: impl FnOnce() -> F::Output + Send + 'static,
) -> CancelIfExceedsOr<F>
where
    F: Future,
{
    CancelIfExceedsOr {
        work: Box::pin(work),
        expiry: budget.cancellation_signal().triggered(),
        fallback: Some(Box::new(fallback)),
    }
}

/// [`cancel_if_exceeds_or`] 返回的竞速 Future。
pub struct CancelIfExceedsOr<F: Future> {
    work: Pin<Box<F>>,
    expiry: Triggered,
    fallback: Option<Box<dyn FnOnce() -> F::Output + Send + 'static>>,
}

impl<F: Future> Future for CancelIfExceedsOr<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        if let Poll::Ready(output) = this.work.as_mut().poll(cx) {
            return Poll::Ready(output);
        }
        if Pin::new(&mut this.expiry).poll(cx).is_ready() {
            let fallback = this.fallback.take().expect("fallback already consumed");
            return Poll::Ready(fallback());
        }
        Poll::Pending
    }
}
