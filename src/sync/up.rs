//! # 单处理器安全内部可变性封装模块
//!
//! ## Overview
//! 本模块提供了 **单处理器（Uniprocessor, UP）环境** 下的
//! 内部可变性封装工具，是同步原语保护自身状态的基础：
//! - `UPSafeCellRaw`：基于 `UnsafeCell` 的最底层封装，完全由使用者保证安全，
//!   用于需要在关中断期间跨阻塞点重新借用的状态（信号量）
//! - `UPIntrFreeCell`：在访问期间自动关中断，防止中断打断导致的数据竞争
//! - `UPIntrRefMut`：配合 `UPIntrFreeCell` 使用的 RAII 可变借用守卫
//!
//! ## Assumptions
//! - 系统运行在单核处理器环境中
//! - 不存在真正的并行执行，仅可能被中断打断
//! - 中断屏蔽（`hal::IntrMaskGuard`）可以提供足够的互斥保证
//!
//! ## Safety
//! - `unsafe impl Sync` 的正确性完全依赖“单处理器 + 中断屏蔽”这一前提
//! - `UPSafeCellRaw` 不做任何借用或并发检查，误用将直接导致未定义行为；
//!   使用者必须保证 `get_mut` 的借用在任何可能阻塞的调用之前结束
//! - `UPIntrFreeCell` 通过中断屏蔽 + `RefCell` 动态借用检查，提供更强安全性，
//!   但持有借用期间绝不能阻塞
//!
//! ## Invariants
//! - 若某个 `UPIntrFreeCell` 处于可变借用状态，则中断必然被屏蔽
//! - 当 `UPIntrRefMut` 被 drop 时，中断层级一定恢复到借用之前的状态

use crate::hal::IntrMaskGuard;
use core::cell::{RefCell, RefMut, UnsafeCell};
use core::ops::{Deref, DerefMut};

/// 基于 `UnsafeCell` 的最底层 UP 内部可变性封装
///
/// ## Safety
/// - 使用者必须保证：
///   - 仅在中断被屏蔽的临界区内访问
///   - 任何一次 `get_mut` 借用都不跨越可能阻塞的调用
pub struct UPSafeCellRaw<T> {
    inner: UnsafeCell<T>,
}

/// 在 UP + 中断屏蔽前提下由使用者保证线程安全
unsafe impl<T> Sync for UPSafeCellRaw<T> {}

impl<T> UPSafeCellRaw<T> {
    /// 创建一个新的 `UPSafeCellRaw`
    ///
    /// ## Safety
    /// - 调用者必须保证后续访问满足 UP + 关中断假设
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: UnsafeCell::new(value),
        }
    }

    /// 获取内部数据的可变引用，不进行任何借用或并发检查
    #[allow(clippy::mut_from_ref)]
    pub fn get_mut(&self) -> &mut T {
        unsafe { &mut (*self.inner.get()) }
    }
}

/// 在访问期间自动关中断的 UP 内部可变性封装
///
/// ## Overview
/// 使用 `RefCell` 提供动态借用检查，并在进入临界区时屏蔽中断，
/// 防止中断导致的数据竞争。适用于临界区短、不会在持有借用期间
/// 阻塞的状态。
pub struct UPIntrFreeCell<T> {
    inner: RefCell<T>,
}

/// 声明其在 UP + 中断屏蔽前提下是安全的
unsafe impl<T> Sync for UPIntrFreeCell<T> {}
unsafe impl<T> Send for UPIntrFreeCell<T> {}

/// `UPIntrFreeCell` 的可变借用守卫
///
/// ## Invariants
/// - 生命周期内中断始终被屏蔽；字段按声明顺序 drop，
///   先释放 `RefCell` 借用，再恢复中断
pub struct UPIntrRefMut<'a, T> {
    inner: RefMut<'a, T>,
    _mask: IntrMaskGuard,
}

impl<T> UPIntrFreeCell<T> {
    /// 创建一个新的 `UPIntrFreeCell`
    ///
    /// ## Safety
    /// - 使用者需保证仅在 UP 环境下使用
    pub unsafe fn new(value: T) -> Self {
        Self {
            inner: RefCell::new(value),
        }
    }

    /// 获取内部数据的独占访问权
    ///
    /// ## Behavior
    /// - 先屏蔽中断，再获取 `RefCell` 的可变借用
    /// - 借用冲突说明存在重入，直接 panic
    pub fn exclusive_access(&self) -> UPIntrRefMut<'_, T> {
        let mask = IntrMaskGuard::new();
        UPIntrRefMut {
            inner: self.inner.borrow_mut(),
            _mask: mask,
        }
    }

    /// 在独占访问会话中执行闭包，自动管理中断屏蔽与恢复
    pub fn exclusive_session<F, V>(&self, f: F) -> V
    where
        F: FnOnce(&mut T) -> V,
    {
        let mut inner = self.exclusive_access();
        f(inner.deref_mut())
    }
}

impl<'a, T> Deref for UPIntrRefMut<'a, T> {
    type Target = T;
    fn deref(&self) -> &Self::Target {
        self.inner.deref()
    }
}

impl<'a, T> DerefMut for UPIntrRefMut<'a, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.inner.deref_mut()
    }
}
