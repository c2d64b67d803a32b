pub mod ambient_registry {
    //! 环境时钟注册表契约测试：默认真实时钟、作用域化安装与重入拒绝。
    //!
    //! # 测试目标（Why）
    //! - 注册表默认委托真实时钟，安装虚拟时钟后全部读者立即观察到同一覆盖实例；
    //! - 同一注册表内至多一个活动虚拟时钟，重入安装以固定文案失败；
    //! - 凭据析构在任何退出路径恢复真实时钟，并允许再次安装。

    use std::time::{Duration, Instant};

    use futures::executor::block_on;
    use tempo_core::prelude::*;

    #[test]
    fn default_registry_delegates_to_the_real_clock() {
        let registry = ClockRegistry::new();

        let before = Instant::now();
        let observed = registry.now();
        assert!(observed >= before, "默认读数来自真实时钟，必须单调");
        assert_eq!(
            registry.time_until_next_due(),
            None,
            "真实时钟不持有可检视的待触发队列"
        );
    }

    #[test]
    fn start_virtual_installs_the_override_for_every_reader() {
        let origin = Instant::now();
        let registry = ClockRegistry::new();
        let reader = registry.clone();

        let guard = registry
            .start_virtual(Some(origin))
            .expect("first install must succeed");

        assert_eq!(registry.now(), origin, "安装后读数来自虚拟时钟");
        assert_eq!(reader.now(), origin, "克隆句柄观察到同一覆盖实例");

        block_on(guard.clock().advance_by(Duration::from_secs(5)));
        assert_eq!(registry.now(), origin + Duration::from_secs(5));
    }

    #[test]
    fn second_start_fails_with_the_fixed_reentrancy_message() {
        let registry = ClockRegistry::new();
        let guard = registry.start_virtual(None).expect("first install");

        let err = registry
            .start_virtual(None)
            .expect_err("second install must be rejected");

        assert_eq!(err.code(), codes::CLOCK_REENTRANT_START);
        assert_eq!(
            err.message(),
            "A virtual clock cannot be started while another is still active in the current context."
        );

        // 失败的安装不得影响既有覆盖。
        block_on(guard.clock().advance_by(Duration::from_secs(1)));
        assert_eq!(guard.clock().elapsed(), Duration::from_secs(1));
    }

    #[test]
    fn dropping_the_guard_restores_the_real_clock_and_allows_restart() {
        let origin = Instant::now();
        let registry = ClockRegistry::new();

        {
            let guard = registry.start_virtual(Some(origin)).expect("first install");
            guard.clock().schedule(
                Box::new(|_clock| Box::pin(async {})),
                Some(Duration::from_secs(30)),
            );
            assert_eq!(
                registry.time_until_next_due(),
                Some(Duration::from_secs(30)),
                "凭据存活期间注册表委托虚拟时钟"
            );
        }

        assert_eq!(
            registry.time_until_next_due(),
            None,
            "凭据析构后恢复真实时钟"
        );

        let again = registry
            .start_virtual(None)
            .expect("release must allow a fresh install");
        drop(again);
    }

    #[test]
    fn scheduling_through_the_registry_lands_on_the_active_clock() {
        let origin = Instant::now();
        let registry = ClockRegistry::new();
        let guard = registry.start_virtual(Some(origin)).expect("install");

        registry.schedule(
            Box::new(|_clock| Box::pin(async {})),
            Some(Duration::from_secs(7)),
        );

        assert_eq!(
            guard.clock().time_until_next_due(),
            Some(Duration::from_secs(7)),
            "经注册表登记的动作必须落到当前生效的虚拟时钟"
        );
    }
}
