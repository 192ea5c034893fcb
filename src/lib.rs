//! # 内核并发核心库（ksync）
//!
//! ## Overview
//! 本库是教学内核的 **并发核心**：一个基于 arena 的侵入式双向链表引擎，
//! 以及建立在其上的三种同步原语（计数信号量、互斥锁、条件变量）。
//!
//! 库本身不实现任务调度与中断控制，只消费它们：
//! - `hal`：中断屏蔽 / 恢复 / 中断上下文查询接口（由内核注册实现）
//! - `task`：当前任务、阻塞、唤醒与优先级比较接口（由调度器注册实现）
//!
//! ## Assumptions
//! - 系统运行在单处理器环境，内核代码不存在真正的并行执行
//! - 所有临界区通过关中断互斥，阻塞期间由调度器负责恢复中断状态
//! - 宿主内核在调用任何同步原语前已完成 `hal` 与 `task` 的注册
//!
//! ## Behavior
//! - 等待队列按注册的优先级比较器在入队时排序，队首优先被唤醒
//! - 同优先级按到达顺序（FIFO）服务
//! - 所有使用契约违规（递归加锁、中断上下文中阻塞等）直接 panic

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod hal;
pub mod list;
pub mod sync;
pub mod task;
