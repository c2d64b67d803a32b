//! 时间契约集成测试入口，确保时钟能力、虚拟调度与预算治理在确定性驱动下行为一致。
//!
//! # 模块目的（Why）
//! - 汇集所有与时间源注入相关的集成测试，便于统一运行与过滤；
//! - 对齐验收命令 `cargo test -p tempo-core --test time` 的过滤路径 `tests::time::*`。
//!
//! # 结构概览（What）
//! - [`tests::time::virtual_scheduling`]：虚拟调度引擎的触发顺序、再入推进与边界语义；
//! - [`tests::time::budget_ledger`]：时间预算的读数、台账渲染与观察者登记；
//! - [`tests::time::cancel_if_exceeds`]：预算取消信号与竞速适配器；
//! - [`tests::time::ambient_registry`]：环境时钟注册表的安装/释放生命周期。
//!
//! # 维护提示（How）
//! - 新增时间相关集成测试时，请在此处追加相应的 `include!` 子模块注册；
//! - 所有用例仅依赖虚拟时钟或毫秒级真实等待，不得引入网络或磁盘 I/O。

pub mod tests {
    //! 集成测试命名空间：将时间相关测试归档在 `tests::time` 之下，便于过滤。
    pub mod time {
        //! 时间契约相关的集成测试集合。
        include!("virtual_scheduling.rs");
        include!("budget_ledger.rs");
        include!("cancel_if_exceeds.rs");
        include!("ambient_registry.rs");
    }
}
