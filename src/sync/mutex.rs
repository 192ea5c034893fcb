//! # 互斥锁（Mutex）同步原语模块
//!
//! ## Overview
//! 本模块实现了内核中的 **阻塞型互斥锁**：一个初值为 1 的二元
//! 信号量，外加一个持有者字段，提供单一持有者、不可重入的互斥语义。
//!
//! 互斥锁与信号量的区别有二：其一，信号量的计数可以大于 1，
//! 互斥锁任意时刻至多被一个任务持有；其二，信号量没有持有者概念，
//! 一个任务 `down`、另一个任务 `up` 是合法用法，而互斥锁必须由
//! 持有者本人释放。当这些限制成为负担时，应当直接使用信号量。
//!
//! ## Assumptions
//! - 系统运行在单处理器环境下
//! - 底层信号量保证阻塞 / 唤醒路径的正确性
//!
//! ## Invariants
//! - `holder` 非空当且仅当底层信号量计数为 0 且恰有一个任务
//!   完成了 `lock`
//! - 只有 `holder` 可以调用 `unlock`；释放时先清空 `holder`
//!   再执行 `up`，被唤醒的任务绝不会观察到旧的持有者
//!
//! ## Behavior
//! - `lock`：持有者重入直接 panic（不支持递归加锁）；否则经由
//!   信号量阻塞等待
//! - `try_lock`：非阻塞尝试，失败返回 `false`
//! - `unlock`：非持有者调用直接 panic

use crate::hal::in_interrupt_context;
use crate::sync::{Semaphore, UPIntrFreeCell};
use crate::task::{current_task, same_task, TaskRef};

/// 阻塞型互斥锁
///
/// ## Fields
/// - `holder`：当前持有者；短临界区访问，由 `UPIntrFreeCell` 保护
/// - `semaphore`：初值为 1 的二元信号量，承载阻塞与唤醒
pub struct Mutex {
    holder: UPIntrFreeCell<Option<TaskRef>>,
    semaphore: Semaphore,
}

impl Mutex {
    /// 创建一个新的互斥锁，初始无人持有
    pub fn new() -> Self {
        Self {
            holder: unsafe { UPIntrFreeCell::new(None) },
            semaphore: Semaphore::new(1),
        }
    }

    /// 获取互斥锁，必要时阻塞
    ///
    /// ## Panics
    /// - 在中断上下文中调用
    /// - 当前任务已经持有本锁（不支持递归加锁）
    pub fn lock(&self) {
        assert!(
            !in_interrupt_context(),
            "Mutex::lock called from interrupt context"
        );
        assert!(
            !self.is_held_by_current_task(),
            "Mutex::lock by the task already holding it"
        );
        self.semaphore.down();
        let task = current_task();
        self.holder.exclusive_session(|holder| *holder = Some(task));
    }

    /// 非阻塞地尝试获取互斥锁
    ///
    /// ## Returns
    /// - `true`：获取成功，持有者已更新
    /// - `false`：锁被其他任务占用
    ///
    /// ## Panics
    /// - 当前任务已经持有本锁
    pub fn try_lock(&self) -> bool {
        assert!(
            !self.is_held_by_current_task(),
            "Mutex::try_lock by the task already holding it"
        );
        if self.semaphore.try_down() {
            let task = current_task();
            self.holder.exclusive_session(|holder| *holder = Some(task));
            true
        } else {
            false
        }
    }

    /// 释放互斥锁
    ///
    /// 先清空持有者再 `up`，保证被唤醒的任务不会看到旧持有者。
    ///
    /// ## Panics
    /// - 调用者不是当前持有者
    pub fn unlock(&self) {
        assert!(
            self.is_held_by_current_task(),
            "Mutex::unlock by a task not holding it"
        );
        self.holder.exclusive_session(|holder| *holder = None);
        self.semaphore.up();
    }

    /// 当前任务是否持有本锁
    ///
    /// 只能查询调用者自己的持有状态，查询其他任务是否持锁本身
    /// 就是竞态的。
    pub fn is_held_by_current_task(&self) -> bool {
        let current = current_task();
        self.holder.exclusive_session(|holder| match holder {
            Some(task) => same_task(task, &current),
            None => false,
        })
    }

    /// 锁当前是否被占用，供检查与测试使用
    pub fn is_locked(&self) -> bool {
        self.semaphore.value() == 0
    }
}

impl Default for Mutex {
    fn default() -> Self {
        Self::new()
    }
}
