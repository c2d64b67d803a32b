//! 时间框架的稳定错误域。
//!
//! # 模块定位（Why）
//! - 时钟安装、虚拟时间推进与预算治理产生的错误需要合流为稳定的错误码，便于日志、
//!   指标与自动化治理对失败原因做精确分类；
//! - 错误码采用 `<域>.<语义>` 的命名约定（见 [`codes`]），保证跨版本 round-trip 稳定。
//!
//! # 结构概览（What）
//! - [`ClockError`]：框架级通用错误，承载错误码、人类可读消息与可选的底层原因；
//! - [`TimeBudgetExceeded`]：预算检查点专用错误，携带完整的预算台账并在 `Display`
//!   中渲染逐条检查记录，供排障人员直接阅读；
//! - [`codes`]：稳定错误码常量表。
//!
//! # 传播策略（How）
//! - 所有错误通过 `Result` + `?` 原样上抛给直接调用方；引擎内部不做任何重试；
//! - 重试/退避策略属于使用预算与取消原语的调用方，不属于本 crate。

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

use crate::time::budget::{BudgetEntry, format_duration, render_entry_line};

/// 稳定错误码常量表。
///
/// # 契约说明（What）
/// - 常量值一经发布不得变更含义；新增错误场景必须新增常量而非复用旧码；
/// - 调用方可依据码值驱动自动化策略（例如遇到 `clock.reentrant_start` 时先释放旧的
///   虚拟时钟再重试安装）。
pub mod codes {
    /// 在虚拟时钟仍处于激活状态时再次尝试启动虚拟时钟。
    pub const CLOCK_REENTRANT_START: &str = "clock.reentrant_start";
    /// `advance_to` 的目标时间早于当前虚拟时间。
    pub const CLOCK_BACKWARD_ADVANCE: &str = "clock.backward_advance";
    /// 其余非法时间参数，例如零时长的有界预算。
    pub const CLOCK_INVALID_ARGUMENT: &str = "clock.invalid_argument";
    /// 预算在受护工作完成之前耗尽或被取消。
    pub const BUDGET_EXCEEDED: &str = "budget.exceeded";
}

/// `ClockError` 是本 crate 跨模块共享的通用错误形态。
///
/// # 设计背景（Why）
/// - 时钟注册表、虚拟调度引擎与取消适配器的失败形态各异，统一为“错误码 + 消息 +
///   底层原因”三元组后，调用方只需一种错误类型即可覆盖全部 API；
/// - 错误码为 `'static` 字符串，承载稳定语义；消息面向排障人员，允许携带动态内容。
///
/// # 契约说明（What）
/// - **前置条件**：`code` 必须取自 [`codes`] 模块或遵循 `<域>.<语义>` 约定；
/// - **后置条件**：构造出的错误拥有独立所有权，`Send + Sync + 'static`，可跨线程传递；
/// - 除非显式调用 [`with_cause`](Self::with_cause)，错误不含底层原因。
///
/// # 风险提示（Trade-offs）
/// - 消息使用 `Cow` 保存：静态文案零分配，动态文案付出一次堆分配换取灵活性。
#[derive(Debug)]
pub struct ClockError {
    code: &'static str,
    message: Cow<'static, str>,
    cause: Option<Box<dyn StdError + Send + Sync>>,
}

impl ClockError {
    /// 构造通用错误。
    ///
    /// # 执行逻辑（How）
    /// 1. 按值存储 `code` 与 `message`，必要时触发一次堆分配；
    /// 2. 底层原因初始化为空，可稍后通过 [`with_cause`](Self::with_cause) 填充。
    pub fn new(code: &'static str, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// 附带底层原因并返回新的错误。
    pub fn with_cause(mut self, cause: impl StdError + Send + Sync + 'static) -> Self {
        self.cause = Some(Box::new(cause));
        self
    }

    /// 稳定错误码。
    pub fn code(&self) -> &'static str {
        self.code
    }

    /// 面向排障人员的描述文本。
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 底层原因（若有）。
    pub fn cause(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.cause {
            Some(cause) => Some(&**cause),
            None => None,
        }
    }

    /// 虚拟时钟重入安装错误，消息为跨语言对齐的固定文案。
    pub(crate) fn reentrant_start() -> Self {
        Self::new(
            codes::CLOCK_REENTRANT_START,
            "A virtual clock cannot be started while another is still active in the current context.",
        )
    }

    /// 时间回拨错误，消息为跨语言对齐的固定文案。
    pub(crate) fn backward_advance() -> Self {
        Self::new(
            codes::CLOCK_BACKWARD_ADVANCE,
            "The clock cannot be moved backward in time.",
        )
    }

    /// 非法时间参数错误。
    pub(crate) fn invalid_argument(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(codes::CLOCK_INVALID_ARGUMENT, message)
    }

    /// 受护工作在预算耗尽前未完成。
    ///
    /// # 契约说明（What）
    /// - `limit` 为 `None` 表示无界预算被显式取消，消息据此切换措辞。
    pub(crate) fn budget_exceeded(limit: Option<Duration>) -> Self {
        let message = match limit {
            Some(limit) => Cow::Owned(format!(
                "time budget of {} elapsed before the guarded work completed",
                format_duration(limit)
            )),
            None => Cow::Borrowed("time budget was cancelled before the guarded work completed"),
        };
        Self::new(codes::BUDGET_EXCEEDED, message)
    }
}

impl fmt::Display for ClockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

impl StdError for ClockError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause()
    }
}

/// 预算检查点失败错误，携带完整的预算台账。
///
/// # 设计背景（Why）
/// - `TimeBudget::record_entry_checked` 失败时，排障人员最需要的是“预算内外各发生了
///   什么”，因此错误自身携带全部已记录条目，渲染结果可脱离原始预算对象复现；
/// - 台账为记录时刻的快照，后续新增条目不会回溯修改既有错误。
///
/// # 渲染契约（What）
/// - 首行：`Time budget of {duration} exceeded at {elapsed}`；
/// - 其后逐条渲染：预算内条目为 `✔ {name} @ {elapsed}`，超出条目为
///   `❌ {name} @ {elapsed} (budget exceeded by {overrun})`；
/// - 渲染由存储的条目幂等推导，重复 `to_string` 结果一致。
#[derive(Clone, Debug)]
pub struct TimeBudgetExceeded {
    limit: Duration,
    exceeded_at: Duration,
    entries: Vec<BudgetEntry>,
}

impl TimeBudgetExceeded {
    pub(crate) fn new(limit: Duration, exceeded_at: Duration, entries: Vec<BudgetEntry>) -> Self {
        Self {
            limit,
            exceeded_at,
            entries,
        }
    }

    /// 预算上限。
    pub fn limit(&self) -> Duration {
        self.limit
    }

    /// 触发失败时自预算起点的已消耗时长。
    pub fn exceeded_at(&self) -> Duration {
        self.exceeded_at
    }

    /// 失败时刻的台账快照，按记录顺序排列。
    pub fn entries(&self) -> &[BudgetEntry] {
        &self.entries
    }
}

impl fmt::Display for TimeBudgetExceeded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Time budget of {} exceeded at {}",
            format_duration(self.limit),
            format_duration(self.exceeded_at)
        )?;
        for entry in &self.entries {
            write!(f, "\n{}", render_entry_line(entry, self.limit))?;
        }
        Ok(())
    }
}

impl StdError for TimeBudgetExceeded {}

impl From<TimeBudgetExceeded> for ClockError {
    /// 折叠为通用错误形态，便于与其余 API 共用同一错误通道；台账保留在 `source` 链上。
    fn from(value: TimeBudgetExceeded) -> Self {
        ClockError::budget_exceeded(Some(value.limit())).with_cause(value)
    }
}
