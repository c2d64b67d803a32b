pub mod budget_ledger {
    //! 时间预算契约测试：验证额度读数、台账渲染与观察者登记在虚拟时钟下完全确定。
    //!
    //! # 测试目标（Why）
    //! - 预算起点一经捕获永不改变，`elapsed`/`remaining`/`is_exceeded` 只随时钟推进变化；
    //! - 台账条目在记录瞬间一次性算定，渲染结果可由快照幂等复现；
    //! - 观察者按订阅顺序同步收到通知，订阅凭据析构只摘除自身一条登记。

    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use futures::executor::block_on;
    use tempo_core::prelude::*;

    fn bounded_budget(clock: &VirtualClock, secs: u64) -> TimeBudget {
        TimeBudget::new(Arc::new(clock.clone()), Duration::from_secs(secs))
            .expect("bounded budget construction")
    }

    #[test]
    fn remaining_and_exceeded_track_virtual_advances() {
        let origin = Instant::now();
        let clock = VirtualClock::with_start(origin);
        let budget = bounded_budget(&clock, 5);

        assert_eq!(budget.start_time(), origin);
        assert_eq!(budget.remaining(), Duration::from_secs(5));
        assert!(!budget.is_exceeded());

        block_on(clock.advance_by(Duration::from_secs(3)));
        assert_eq!(budget.elapsed(), Duration::from_secs(3));
        assert_eq!(budget.remaining(), Duration::from_secs(2), "5 秒额度推进 3 秒后剩余 2 秒");
        assert!(!budget.is_exceeded());

        block_on(clock.advance_by(Duration::from_secs(3)));
        assert!(budget.is_exceeded(), "累计推进超过 5 秒后必须判定超支");
        assert_eq!(budget.remaining(), Duration::ZERO);
        assert_eq!(budget.start_time(), origin, "起点不随推进改变");
    }

    #[test]
    fn zero_duration_budget_is_rejected() {
        let clock = VirtualClock::new();
        let err = TimeBudget::new(Arc::new(clock), Duration::ZERO)
            .expect_err("zero duration must be rejected");
        assert_eq!(err.code(), codes::CLOCK_INVALID_ARGUMENT);
    }

    #[test]
    fn ledger_renders_exact_entry_lines_in_order() {
        let clock = VirtualClock::new();
        let budget = bounded_budget(&clock, 15);

        block_on(clock.advance_by(Duration::from_secs(5)));
        budget.record_entry("one");
        block_on(clock.advance_by(Duration::from_secs(8)));
        budget.record_entry("two");
        block_on(clock.advance_by(Duration::from_secs(13)));

        let err = budget
            .record_entry_checked("three")
            .expect_err("entry at 26s must exceed the 15s budget");

        assert_eq!(
            err.to_string(),
            "Time budget of 15 seconds exceeded at 26 seconds\n\
             ✔ one @ 5 seconds\n\
             ✔ two @ 13 seconds\n\
             ❌ three @ 26 seconds (budget exceeded by 11 seconds)"
        );
        assert_eq!(err.to_string(), err.to_string(), "渲染必须可幂等复现");

        let entries = budget.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name(), "one");
        assert_eq!(entries[0].elapsed(), Duration::from_secs(5));
        assert!(!entries[0].exceeded());
        assert_eq!(entries[2].name(), "three");
        assert_eq!(entries[2].elapsed(), Duration::from_secs(26));
        assert!(entries[2].exceeded(), "超支判定在记录瞬间一次性算定");
    }

    #[test]
    fn recorded_entries_are_never_revised_by_later_advances() {
        let clock = VirtualClock::new();
        let budget = bounded_budget(&clock, 10);

        block_on(clock.advance_by(Duration::from_secs(4)));
        let entry = budget.record_entry("early");
        block_on(clock.advance_by(Duration::from_secs(60)));

        assert_eq!(entry.elapsed(), Duration::from_secs(4));
        assert!(!entry.exceeded());
        let stored = budget.entries();
        assert!(!stored[0].exceeded(), "后续推进不得回溯改写已记录条目");
    }

    #[test]
    fn observers_are_notified_in_subscription_order() {
        let clock = VirtualClock::new();
        let budget = bounded_budget(&clock, 30);
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let hub = clock.budget_entry_hub();
        let first_events = Arc::clone(&events);
        let _first = hub.subscribe(Arc::new(move |_clock: &dyn Clock, _budget: &TimeBudget, entry: &BudgetEntry| {
            first_events
                .lock()
                .expect("events lock")
                .push(format!("first:{}", entry.name()));
        }));
        let second_events = Arc::clone(&events);
        let _second = hub.subscribe(Arc::new(move |_clock: &dyn Clock, _budget: &TimeBudget, entry: &BudgetEntry| {
            second_events
                .lock()
                .expect("events lock")
                .push(format!("second:{}", entry.name()));
        }));

        budget.record_entry("checkpoint");

        assert_eq!(
            events.lock().expect("events lock").as_slice(),
            ["first:checkpoint", "second:checkpoint"],
            "通知必须按订阅顺序同步派发"
        );
    }

    #[test]
    fn dropping_a_subscription_removes_exactly_that_observer() {
        let clock = VirtualClock::new();
        let budget = bounded_budget(&clock, 30);
        let events: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let hub = clock.budget_entry_hub();
        let first_events = Arc::clone(&events);
        let first = hub.subscribe(Arc::new(move |_clock: &dyn Clock, _budget: &TimeBudget, entry: &BudgetEntry| {
            first_events
                .lock()
                .expect("events lock")
                .push(format!("first:{}", entry.name()));
        }));
        let second_events = Arc::clone(&events);
        let _second = hub.subscribe(Arc::new(move |_clock: &dyn Clock, _budget: &TimeBudget, entry: &BudgetEntry| {
            second_events
                .lock()
                .expect("events lock")
                .push(format!("second:{}", entry.name()));
        }));
        assert_eq!(hub.observer_count(), 2);

        drop(first);
        assert_eq!(hub.observer_count(), 1, "析构凭据只摘除自身对应的登记");

        budget.record_entry("after-drop");
        assert_eq!(
            events.lock().expect("events lock").as_slice(),
            ["second:after-drop"]
        );
    }

    #[test]
    fn expiry_signal_fires_when_the_drain_reaches_the_deadline() {
        let clock = VirtualClock::new();
        let budget = bounded_budget(&clock, 5);
        let signal = budget.cancellation_signal().clone();

        assert!(!signal.is_triggered());

        block_on(clock.advance_by(Duration::from_secs(4)));
        assert!(!signal.is_triggered(), "未抵达到期时刻前信号不得触发");

        block_on(clock.advance_by(Duration::from_secs(1)));
        assert!(signal.is_triggered(), "排水抵达 start + 5s 的瞬间触发信号");
        assert!(!budget.is_exceeded(), "恰好等于上限时尚未超支（严格大于判定）");

        block_on(clock.advance_by(Duration::from_secs(1)));
        assert!(budget.is_exceeded());
    }

    #[test]
    fn cancel_is_immediate_and_irreversible() {
        let clock = VirtualClock::new();
        let bounded = bounded_budget(&clock, 3_600);
        bounded.cancel();
        assert!(bounded.is_exceeded(), "显式取消立即强制超支判定");
        assert!(bounded.cancellation_signal().is_triggered());

        let unlimited = TimeBudget::unlimited(Arc::new(clock.clone()));
        assert!(!unlimited.is_exceeded());
        unlimited.cancel();
        assert!(unlimited.is_exceeded());
        assert!(unlimited.cancellation_signal().is_triggered());
    }

    #[test]
    fn unlimited_budget_never_expires() {
        let clock = VirtualClock::new();
        let budget = TimeBudget::unlimited(Arc::new(clock.clone()));

        block_on(clock.advance_by(Duration::from_secs(86_400)));

        assert!(!budget.is_exceeded());
        assert_eq!(budget.remaining(), Duration::MAX);
        assert_eq!(budget.elapsed(), Duration::from_secs(86_400), "耗时读数仅作信息参考");
        let entry = budget
            .record_entry_checked("informational")
            .expect("unlimited budget entries never fail");
        assert!(!entry.exceeded());
    }
}
