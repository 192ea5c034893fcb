//! # 内核同步原语模块（sync）
//!
//! ## Overview
//! 本模块是内核中 **所有基础同步原语的统一入口**，
//! 对外以 `pub use` 的形式导出可供调度、系统调用等子系统
//! 使用的同步设施。
//!
//! 模块内部按功能拆分为多个子模块：
//! - `semaphore`：计数型信号量，等待队列按优先级排序
//! - `mutex`：单一持有者、不可重入的阻塞型互斥锁
//! - `condvar`：Mesa 风格条件变量
//! - `up`：单处理器环境下的内部可变性与中断屏蔽封装
//!
//! ## Assumptions
//! - 系统运行在单处理器环境，仅可能被中断或调度切换打断
//! - 所有同步原语都依赖关中断提供的临界区互斥语义
//! - 宿主内核已注册 `hal` 与 `task` 的具体实现
//!
//! ## Invariants
//! - 所有同步原语的内部状态仅能通过受控接口访问
//! - 在阻塞当前任务前，内部状态必然已经更新
//! - 被加入等待队列的任务一定处于不可运行状态，
//!   直到匹配的 `up` / `signal` / `broadcast` 将其唤醒；
//!   没有超时或取消机制

mod condvar;
mod mutex;
mod semaphore;
mod up;

/// 条件变量
pub use condvar::Condvar;

/// 互斥锁
pub use mutex::Mutex;

/// 计数型信号量
pub use semaphore::Semaphore;

/// 单处理器内部可变性与中断屏蔽工具
pub use up::{UPIntrFreeCell, UPIntrRefMut, UPSafeCellRaw};
