//! # 信号量（Semaphore）同步原语模块
//!
//! ## Overview
//! 本模块实现了内核中的 **计数型信号量（Counting Semaphore）**，
//! 用于管理对有限数量共享资源的并发访问。
//!
//! 信号量通过一个非负计数器与一个按优先级排序的等待队列配合工作，
//! 支持典型的 `P / V`（或 `down / up`）操作语义。
//!
//! ## Assumptions
//! - 系统运行在单处理器环境下
//! - 临界区互斥完全依赖关中断；被阻塞的任务在显式唤醒前不会再次运行，
//!   因此屏蔽窗口内不存在 `value` / `waiters` 的并发修改者
//! - `block_current_and_run_next` 在关中断状态下调用，调度器负责在
//!   任务切出期间恢复中断
//!
//! ## Safety
//! - 内部状态由 `UPSafeCellRaw` 保护，仅在关中断临界区内访问
//! - 每次循环迭代重新借用内部状态，借用绝不跨越阻塞点
//!
//! ## Invariants
//! - `value >= 0`，且只在关中断临界区内以 ±1 变化
//! - `waiters` 非空当且仅当存在被阻塞在本信号量上的任务
//! - 等待队列在入队时按优先级比较器排序，同优先级保持到达顺序
//!
//! ## Behavior
//! - `down`：资源不足时按优先级入队并阻塞当前任务，
//!   被唤醒后重新检查条件（循环而非单次等待）
//! - `try_down`：非阻塞尝试，可在中断上下文中调用
//! - `up`：若有等待任务则唤醒队首（最高优先级）任务，计数恒加一，
//!   可在中断上下文中调用

use crate::hal::{in_interrupt_context, IntrMaskGuard};
use crate::list::{Arena, List};
use crate::sync::UPSafeCellRaw;
use crate::task::{
    block_current_and_run_next, current_task, task_precedes, wakeup_task, TaskRef,
};

/// 计数型信号量
///
/// ## Overview
/// 对 `SemaphoreInner` 的安全封装，对外提供 `down / up` 接口
pub struct Semaphore {
    /// 内部状态，仅在关中断临界区内访问
    inner: UPSafeCellRaw<SemaphoreInner>,
}

/// 信号量的内部状态
///
/// ## Fields
/// - `value`：当前可用资源计数，恒非负
/// - `arena`：等待队列节点的存放仓库
/// - `waiters`：阻塞在本信号量上的任务队列，按优先级排序
struct SemaphoreInner {
    value: usize,
    arena: Arena<TaskRef>,
    waiters: List<TaskRef>,
}

impl Semaphore {
    /// 创建一个新的信号量
    ///
    /// ## Invariants
    /// - 初始状态下 `value == res_count`，等待队列为空
    pub fn new(res_count: usize) -> Self {
        let mut arena = Arena::new();
        let waiters = List::new(&mut arena);
        Self {
            inner: unsafe {
                UPSafeCellRaw::new(SemaphoreInner {
                    value: res_count,
                    arena,
                    waiters,
                })
            },
        }
    }

    /// 执行 P 操作（down）
    ///
    /// ## Behavior
    /// - 在关中断临界区内循环：只要 `value == 0`，就把当前任务按
    ///   优先级插入等待队列并阻塞；被唤醒后重新检查条件。
    ///   每次被唤醒都重新入队再判定，防止“已出队但资源又被抢走”
    ///   的窗口期出错
    /// - 条件满足后将计数减一
    ///
    /// ## Panics
    /// - 在中断上下文中调用（中断处理流程没有可供挂起的任务）
    pub fn down(&self) {
        assert!(
            !in_interrupt_context(),
            "Semaphore::down called from interrupt context"
        );
        let _mask = IntrMaskGuard::new();
        loop {
            let inner = self.inner.get_mut();
            if inner.value > 0 {
                inner.value -= 1;
                break;
            }
            let task = current_task();
            log::trace!("task {} blocks on semaphore", task.id());
            let node = inner.arena.alloc(task);
            inner
                .waiters
                .insert_ordered(&mut inner.arena, node, |a, b| task_precedes(a, b));
            // 对 inner 的借用到此结束；阻塞返回时中断仍处于屏蔽状态
            block_current_and_run_next();
        }
    }

    /// 非阻塞地尝试执行 P 操作
    ///
    /// ## Returns
    /// - `true`：`value > 0`，已减一
    /// - `false`：资源不足，计数不变
    ///
    /// 不会阻塞，可在中断上下文中调用。
    pub fn try_down(&self) -> bool {
        let _mask = IntrMaskGuard::new();
        let inner = self.inner.get_mut();
        if inner.value > 0 {
            inner.value -= 1;
            true
        } else {
            false
        }
    }

    /// 执行 V 操作（up）
    ///
    /// ## Behavior
    /// - 若存在等待任务，唤醒队首（最高优先级）任务
    /// - 计数恒加一
    ///
    /// 不会阻塞，可在中断上下文中调用。
    pub fn up(&self) {
        let _mask = IntrMaskGuard::new();
        let inner = self.inner.get_mut();
        if !inner.waiters.is_empty(&inner.arena) {
            let node = inner.waiters.pop_front(&mut inner.arena);
            let task = inner.arena.dealloc(node);
            wakeup_task(task);
        }
        inner.value += 1;
    }

    /// 读取当前计数，供检查与测试使用
    pub fn value(&self) -> usize {
        let _mask = IntrMaskGuard::new();
        self.inner.get_mut().value
    }
}
