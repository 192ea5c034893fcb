//! # 条件变量（Condvar）同步原语模块
//!
//! ## Overview
//! 本模块实现了内核中的 **条件变量（Condition Variable）**，
//! 用于配合互斥锁实现“条件等待 / 条件通知”的同步模式。
//!
//! 条件变量本身 **不保存条件状态**，只维护一个等待者队列；
//! 每个等待者携带一把私有的二元信号量（初值 0），`signal` 通过
//! `up` 该私有信号量精确唤醒一个任务。
//!
//! 这里实现的是 **Mesa 风格** 监视器语义：`signal` 与被唤醒者
//! 重新拿到互斥锁不是一个原子动作，因此调用者必须在 `wait`
//! 返回后重新检查条件，通常写成循环：
//!
//! ```text
//! mutex.lock();
//! while !condition {
//!     condvar.wait(&mutex);
//! }
//! mutex.unlock();
//! ```
//!
//! ## Assumptions
//! - 系统运行在单处理器环境下
//! - 条件变量总是与某个互斥锁配合使用，且调用 `wait` / `signal` /
//!   `broadcast` 时必须持有该锁
//!
//! ## Safety
//! - 等待队列由 `UPIntrFreeCell` 保护，入队操作不跨越阻塞点；
//!   真正的阻塞发生在私有信号量的 `down` 中，此时队列借用已释放
//!
//! ## Invariants
//! - 队列中的每个等待者对应一个尚未返回的 `wait` 调用
//! - 等待者按任务优先级排序，同优先级保持到达顺序
//! - 等待者节点在 `signal` 弹出后、`wait` 返回前即离开队列

use crate::hal::in_interrupt_context;
use crate::list::{Arena, List};
use crate::sync::{Mutex, Semaphore, UPIntrFreeCell};
use crate::task::{current_task, task_precedes, TaskRef};
use alloc::sync::Arc;

/// 等待者：等待中的任务与它的私有唤醒信号量
struct SemaphoreElem {
    task: TaskRef,
    semaphore: Arc<Semaphore>,
}

/// 条件变量
///
/// ## Overview
/// 对 `CondvarInner` 的安全封装，提供条件等待与唤醒接口
pub struct Condvar {
    /// 内部状态，由 UPIntrFreeCell 保护
    inner: UPIntrFreeCell<CondvarInner>,
}

/// 条件变量的内部状态
///
/// ## Fields
/// - `arena`：等待者节点的存放仓库
/// - `waiters`：等待本条件变量的队列，按任务优先级排序
struct CondvarInner {
    arena: Arena<SemaphoreElem>,
    waiters: List<SemaphoreElem>,
}

impl Condvar {
    /// 创建一个新的条件变量
    ///
    /// ## Invariants
    /// - 初始状态下等待队列为空
    pub fn new() -> Self {
        let mut arena = Arena::new();
        let waiters = List::new(&mut arena);
        Self {
            inner: unsafe { UPIntrFreeCell::new(CondvarInner { arena, waiters }) },
        }
    }

    /// 在条件变量上等待，并配合互斥锁使用
    ///
    /// ## Behavior
    /// 1. 创建私有信号量（初值 0）并按优先级加入等待队列
    /// 2. 释放互斥锁，让其他任务得以改变条件
    /// 3. 在私有信号量上阻塞，等待 `signal` / `broadcast`
    /// 4. 被唤醒后重新获取互斥锁再返回
    ///
    /// 等待者节点只在本次调用期间存在于队列中。
    ///
    /// ## Panics
    /// - 在中断上下文中调用
    /// - 调用者未持有 `mutex`
    pub fn wait(&self, mutex: &Mutex) {
        assert!(
            !in_interrupt_context(),
            "Condvar::wait called from interrupt context"
        );
        assert!(
            mutex.is_held_by_current_task(),
            "Condvar::wait without holding the mutex"
        );
        let waiter = Arc::new(Semaphore::new(0));
        let task = current_task();
        log::trace!("task {} waits on condvar", task.id());
        self.inner.exclusive_session(|inner| {
            let node = inner.arena.alloc(SemaphoreElem {
                task,
                semaphore: Arc::clone(&waiter),
            });
            inner
                .waiters
                .insert_ordered(&mut inner.arena, node, |a, b| {
                    task_precedes(&a.task, &b.task)
                });
        });
        mutex.unlock();
        waiter.down();
        mutex.lock();
    }

    /// 唤醒一个等待者（若有），唤醒的是队首（最高优先级）任务
    ///
    /// ## Panics
    /// - 在中断上下文中调用
    /// - 调用者未持有 `mutex`
    pub fn signal(&self, mutex: &Mutex) {
        assert!(
            !in_interrupt_context(),
            "Condvar::signal called from interrupt context"
        );
        assert!(
            mutex.is_held_by_current_task(),
            "Condvar::signal without holding the mutex"
        );
        let waiter = self.inner.exclusive_session(|inner| {
            if inner.waiters.is_empty(&inner.arena) {
                None
            } else {
                let node = inner.waiters.pop_front(&mut inner.arena);
                Some(inner.arena.dealloc(node))
            }
        });
        if let Some(elem) = waiter {
            elem.semaphore.up();
        }
    }

    /// 唤醒所有当前的等待者，顺序与逐次 `signal` 相同
    ///
    /// ## Panics
    /// - 调用者未持有 `mutex`
    pub fn broadcast(&self, mutex: &Mutex) {
        while !self
            .inner
            .exclusive_session(|inner| inner.waiters.is_empty(&inner.arena))
        {
            self.signal(mutex);
        }
    }
}

impl Default for Condvar {
    fn default() -> Self {
        Self::new()
    }
}
