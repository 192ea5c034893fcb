//! # 中断控制接口模块（hal）
//!
//! ## Overview
//! 本模块定义了并发核心对 **中断控制器** 的全部需求：
//! 屏蔽中断、按之前的层级恢复中断、查询当前是否处于中断上下文。
//!
//! 库本身不包含任何体系结构代码，宿主内核在初始化阶段通过
//! `register_intr_control` 注册具体实现（RISC-V 下对应 sstatus.SIE
//! 的保存与清除，LoongArch 下对应 CRMD.IE）。
//!
//! ## Assumptions
//! - 单处理器环境：关中断即可保证临界区互斥
//! - `mask` / `restore` 可嵌套，`mask` 返回的层级令牌与 `restore` 成对使用
//!
//! ## Invariants
//! - `IntrMaskGuard` 存活期间中断必然被屏蔽
//! - guard 被 drop 时中断层级一定恢复到创建 guard 之前的状态

use spin::Once;

/// 中断控制器接口，由宿主内核实现并注册。
///
/// ## Behavior
/// - `mask`：屏蔽中断，返回之前的层级令牌
/// - `restore`：将中断层级恢复为 `mask` 返回的令牌
/// - `is_interrupt_context`：当前是否运行在中断处理流程中
pub trait IntrControl: Sync {
    fn mask(&self) -> usize;
    fn restore(&self, level: usize);
    fn is_interrupt_context(&self) -> bool;
}

static INTR_CONTROL: Once<&'static dyn IntrControl> = Once::new();

/// 注册中断控制器实现，内核初始化时调用一次。
///
/// 重复注册只有第一次生效。
pub fn register_intr_control(ctrl: &'static dyn IntrControl) {
    INTR_CONTROL.call_once(|| ctrl);
    log::debug!("interrupt control registered");
}

fn intr_control() -> &'static dyn IntrControl {
    *INTR_CONTROL
        .get()
        .expect("interrupt control not registered")
}

/// 查询当前是否处于中断上下文。
///
/// 可能阻塞的同步原语（`down` / `lock` / `wait`）以此检查前置条件。
pub fn in_interrupt_context() -> bool {
    intr_control().is_interrupt_context()
}

/// 关中断临界区的 RAII 守卫。
///
/// ## Behavior
/// - 创建时屏蔽中断并记录之前的层级
/// - drop 时恢复到记录的层级，支持嵌套
///
/// ## Invariants
/// - 守卫存活期间，本 CPU 上不会有其他内核代码抢占执行
pub struct IntrMaskGuard {
    prev: usize,
}

impl IntrMaskGuard {
    pub fn new() -> Self {
        Self {
            prev: intr_control().mask(),
        }
    }
}

impl Default for IntrMaskGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrMaskGuard {
    fn drop(&mut self) {
        intr_control().restore(self.prev);
    }
}
