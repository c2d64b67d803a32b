//! 环境时钟注册表：显式注入的单槽时钟覆盖。
//!
//! # 模块定位（Why）
//! - “环境时钟”若落地为进程级静态量，将把隐式全局状态散播到所有调用点；本模块改用
//!   显式构造、按需注入的 [`ClockRegistry`]：每个注册表持有一个活动时钟槽位，默认指向
//!   真实时钟；
//! - “同一上下文中至多一个活动虚拟时钟”的约束由带锁的显式状态迁移保证，而非静态
//!   变量的隐式互斥。
//!
//! # 结构概览（What）
//! - [`ClockRegistry`]：可克隆句柄，读路径经 `arc-swap` 无锁取得当前时钟快照；
//! - [`VirtualClockGuard`]：`start_virtual` 返回的作用域凭据，析构时（任何退出路径）
//!   卸载覆盖并恢复真实时钟；不支持多层虚拟时钟堆叠。
//!
//! # 使用指引（How）
//! - 应用装配处创建注册表并注入需要时间能力的组件；
//! - 测试在用例开头 `start_virtual`，借助凭据上的 [`VirtualClock`] 推进时间，用例结束
//!   时凭据析构自动还原。

use std::fmt;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;

use crate::error::ClockError;
use crate::time::clock::{Clock, ScheduleKey, ScheduledBody, Sleep, SystemClock};
use crate::time::virtual_clock::VirtualClock;

/// 时钟注册表：持有当前生效的时钟覆盖，默认指向真实时钟。
///
/// # 契约说明（What）
/// - [`current`](Self::current) / [`now`](Self::now) 始终反映此刻生效的时钟，全部读者
///   观察到同一实例；
/// - [`start_virtual`](Self::start_virtual) 在已有虚拟时钟激活时失败；
/// - 克隆句柄共享同一槽位。
#[derive(Clone)]
pub struct ClockRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    real: Arc<dyn Clock>,
    slot: ArcSwap<ActiveSlot>,
    /// 显式状态迁移锁：`true` 表示虚拟时钟覆盖正在生效。
    transition: Mutex<bool>,
}

struct ActiveSlot {
    clock: Arc<dyn Clock>,
}

impl ClockRegistry {
    /// 创建以 [`SystemClock`] 为默认时钟的注册表。
    pub fn new() -> Self {
        Self::with_real_clock(Arc::new(SystemClock::new()))
    }

    /// 以自定义真实时钟创建注册表，便于上层注入带观测包装的实现。
    pub fn with_real_clock(real: Arc<dyn Clock>) -> Self {
        let initial = Arc::clone(&real);
        Self {
            inner: Arc::new(RegistryInner {
                real,
                slot: ArcSwap::from_pointee(ActiveSlot { clock: initial }),
                transition: Mutex::new(false),
            }),
        }
    }

    /// 此刻生效的时钟快照。
    pub fn current(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.inner.slot.load_full().clock)
    }

    /// 委托当前时钟读取时间。
    pub fn now(&self) -> Instant {
        self.current().now()
    }

    /// 委托当前时钟创建等待 Future。
    pub fn sleep(&self, duration: Duration) -> Sleep {
        self.current().sleep(duration)
    }

    /// 委托当前时钟登记到期动作。
    pub fn schedule(&self, body: ScheduledBody, due_offset: Option<Duration>) -> ScheduleKey {
        self.current().schedule(body, due_offset)
    }

    /// 委托当前时钟查询最近到期动作的剩余时长。
    pub fn time_until_next_due(&self) -> Option<Duration> {
        self.current().time_until_next_due()
    }

    /// 安装一个新的虚拟时钟作为活动覆盖，返回作用域凭据。
    ///
    /// # 契约说明（What）
    /// - `initial` 指定虚拟时钟的起始时刻，缺省为当前系统时间；
    /// - 已有虚拟时钟激活时返回 `clock.reentrant_start`，固定文案提示先释放旧凭据；
    /// - 凭据析构时恢复真实时钟，任何退出路径（含 panic 展开）都会执行。
    pub fn start_virtual(
        &self,
        initial: Option<Instant>,
    ) -> Result<VirtualClockGuard, ClockError> {
        let mut active = self
            .inner
            .transition
            .lock()
            .expect("clock registry transition lock poisoned");
        if *active {
            return Err(ClockError::reentrant_start());
        }
        *active = true;
        let clock = match initial {
            Some(origin) => VirtualClock::with_start(origin),
            None => VirtualClock::new(),
        };
        let shared: Arc<dyn Clock> = Arc::new(clock.clone());
        self.inner.slot.store(Arc::new(ActiveSlot { clock: shared }));
        Ok(VirtualClockGuard {
            inner: Arc::clone(&self.inner),
            clock,
        })
    }
}

impl Default for ClockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ClockRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let overridden = *self
            .inner
            .transition
            .lock()
            .expect("clock registry transition lock poisoned");
        f.debug_struct("ClockRegistry")
            .field("virtual_active", &overridden)
            .finish()
    }
}

/// 虚拟时钟覆盖的作用域凭据。
///
/// # 契约说明（What）
/// - 凭据存活期间，注册表的当前时钟即为 [`clock`](Self::clock) 返回的虚拟时钟；
/// - 析构时卸载覆盖、恢复真实时钟，并允许再次 `start_virtual`。
pub struct VirtualClockGuard {
    inner: Arc<RegistryInner>,
    clock: VirtualClock,
}

impl VirtualClockGuard {
    /// 凭据所安装的虚拟时钟。
    pub fn clock(&self) -> &VirtualClock {
        &self.clock
    }
}

impl Drop for VirtualClockGuard {
    fn drop(&mut self) {
        self.inner.slot.store(Arc::new(ActiveSlot {
            clock: Arc::clone(&self.inner.real),
        }));
        *self
            .inner
            .transition
            .lock()
            .expect("clock registry transition lock poisoned") = false;
    }
}

impl fmt::Debug for VirtualClockGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualClockGuard")
            .field("clock", &self.clock)
            .finish()
    }
}
