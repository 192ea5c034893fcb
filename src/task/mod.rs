//! # 调度器接口模块（task）
//!
//! ## Overview
//! 本模块定义了并发核心对 **调度器** 的全部需求：获取当前任务、
//! 阻塞当前任务、唤醒指定任务，以及等待队列使用的优先级比较器。
//!
//! 并发核心只持有任务的不透明引用（`TaskRef`），不关心任务控制块
//! 的具体内容；任务身份通过 `Arc` 指针相等判定。
//!
//! ## Assumptions
//! - `block_current_and_run_next` 在中断被屏蔽的前提下调用；
//!   调度器在任务切出期间可以重新打开中断，但必须在该任务
//!   恢复执行前还原其屏蔽状态
//! - `wakeup_task` 可以在中断上下文中调用
//!
//! ## Invariants
//! - `block_current_and_run_next` 只有在对应任务被 `wakeup_task`
//!   唤醒之后才会返回
//! - 优先级比较器在任务入队瞬间求值一次；已入队任务的优先级变化
//!   不会触发队列重排

use alloc::sync::Arc;
use spin::Once;

/// 并发核心眼中的任务：只需要一个用于日志与调试的编号。
pub trait Task: Send + Sync {
    fn id(&self) -> usize;
}

/// 任务的不透明引用，身份即 `Arc` 指针相等。
pub type TaskRef = Arc<dyn Task>;

/// 调度器接口，由宿主内核实现并注册。
///
/// ## Behavior
/// - `current_task`：返回当前正在执行的任务
/// - `block_current`：挂起当前任务，直到被 `wakeup` 唤醒才返回
/// - `wakeup`：使一个被阻塞的任务重新可运行
/// - `precedes`：等待队列的优先级比较器，
///   `precedes(a, b) == true` 表示 a 应当先于 b 被服务
pub trait Scheduler: Sync {
    fn current_task(&self) -> TaskRef;
    fn block_current(&self);
    fn wakeup(&self, task: TaskRef);
    fn precedes(&self, a: &TaskRef, b: &TaskRef) -> bool;
}

static SCHEDULER: Once<&'static dyn Scheduler> = Once::new();

/// 注册调度器实现，内核初始化时调用一次。
pub fn register_scheduler(sched: &'static dyn Scheduler) {
    SCHEDULER.call_once(|| sched);
    log::debug!("scheduler registered");
}

fn scheduler() -> &'static dyn Scheduler {
    *SCHEDULER.get().expect("scheduler not registered")
}

/// 获取当前任务的引用。
pub fn current_task() -> TaskRef {
    scheduler().current_task()
}

/// 阻塞当前任务并切换到下一个可运行任务。
///
/// 必须在中断被屏蔽时调用，返回时屏蔽状态与调用前一致。
pub fn block_current_and_run_next() {
    scheduler().block_current();
}

/// 唤醒一个被阻塞的任务。
pub fn wakeup_task(task: TaskRef) {
    log::trace!("wakeup task {}", task.id());
    scheduler().wakeup(task);
}

/// 等待队列使用的优先级比较器。
pub fn task_precedes(a: &TaskRef, b: &TaskRef) -> bool {
    scheduler().precedes(a, b)
}

/// 判断两个引用是否指向同一个任务。
pub fn same_task(a: &TaskRef, b: &TaskRef) -> bool {
    Arc::ptr_eq(a, b)
}
