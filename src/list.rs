//! # 侵入式双向链表引擎（list）
//!
//! 链表节点不单独分配：所有节点都存放在一个 `Arena` 中，
//! 链表只持有指向哨兵节点的句柄。`head.prev` 与 `tail.next`
//! 恒为 `None`，其余可达节点的两个链接都非空，因此任意节点
//! 恰好属于 head / interior / tail 三类之一。
//!
//! 同一个 arena 上可以建立多条链表，节点可以在它们之间以 O(1)
//! 的代价整段搬移（`splice`）。排序采用自然归并：每趟扫描识别
//! 已经非降序的 run，相邻 run 原地归并，直到一趟只剩一个 run。
//!
//! 所有前置条件违规（空表取队首、对 tail 取后继、移除非内部
//! 节点等）都是使用者的 bug，直接 panic。

use alloc::vec::Vec;
use core::marker::PhantomData;

/// 节点句柄：arena 槽位的下标，节点存活期间保持稳定。
///
/// 句柄只在分配它的 arena 内有意义。节点被 `dealloc` 之后
/// 槽位会被复用，旧句柄不得继续使用。
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct NodeRef(usize);

struct Slot<T> {
    prev: Option<NodeRef>,
    next: Option<NodeRef>,
    /// 哨兵槽位与已回收槽位没有值
    value: Option<T>,
}

/// 节点仓库。
///
/// 分配策略与页帧分配器相同：
/// - 顺序分配未使用槽位
/// - 回收的槽位放入 recycled 栈中复用
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    recycled: Vec<usize>,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            recycled: Vec::new(),
        }
    }

    fn alloc_slot(&mut self, value: Option<T>) -> NodeRef {
        let slot = Slot {
            prev: None,
            next: None,
            value,
        };
        if let Some(idx) = self.recycled.pop() {
            self.slots[idx] = slot;
            NodeRef(idx)
        } else {
            self.slots.push(slot);
            NodeRef(self.slots.len() - 1)
        }
    }

    /// 分配一个未链入任何链表的新节点。
    pub fn alloc(&mut self, value: T) -> NodeRef {
        self.alloc_slot(Some(value))
    }

    /// 回收一个节点并取回其中的值。
    ///
    /// 节点必须已经从链表上移除。重复回收或回收哨兵直接 panic。
    pub fn dealloc(&mut self, node: NodeRef) -> T {
        let slot = &mut self.slots[node.0];
        let value = slot
            .value
            .take()
            .expect("dealloc of a sentinel or an already recycled node");
        slot.prev = None;
        slot.next = None;
        self.recycled.push(node.0);
        value
    }

    /// 借用节点中的值。哨兵与已回收节点没有值，访问即 panic。
    pub fn get(&self, node: NodeRef) -> &T {
        self.slots[node.0]
            .value
            .as_ref()
            .expect("get of a sentinel or an already recycled node")
    }

    /// 可变借用节点中的值。
    pub fn get_mut(&mut self, node: NodeRef) -> &mut T {
        self.slots[node.0]
            .value
            .as_mut()
            .expect("get_mut of a sentinel or an already recycled node")
    }

    fn slot(&self, node: NodeRef) -> &Slot<T> {
        &self.slots[node.0]
    }

    fn slot_mut(&mut self, node: NodeRef) -> &mut Slot<T> {
        &mut self.slots[node.0]
    }

    fn is_head(&self, node: NodeRef) -> bool {
        let slot = self.slot(node);
        slot.prev.is_none() && slot.next.is_some()
    }

    fn is_interior(&self, node: NodeRef) -> bool {
        let slot = self.slot(node);
        slot.prev.is_some() && slot.next.is_some()
    }

    fn is_tail(&self, node: NodeRef) -> bool {
        let slot = self.slot(node);
        slot.prev.is_some() && slot.next.is_none()
    }

    /// 节点的后继。只对 head 或 interior 节点有定义。
    pub fn next(&self, node: NodeRef) -> NodeRef {
        assert!(
            self.is_head(node) || self.is_interior(node),
            "next of a tail or unlinked node"
        );
        self.slot(node).next.unwrap()
    }

    /// 节点的前驱。只对 interior 或 tail 节点有定义。
    pub fn prev(&self, node: NodeRef) -> NodeRef {
        assert!(
            self.is_interior(node) || self.is_tail(node),
            "prev of a head or unlinked node"
        );
        self.slot(node).prev.unwrap()
    }

    /// 把 `elem` 拼接到 `before` 的紧前方。
    ///
    /// `before` 必须是 interior 或 tail 节点；四次链接写入，O(1)。
    pub fn insert_before(&mut self, before: NodeRef, elem: NodeRef) {
        assert!(
            self.is_interior(before) || self.is_tail(before),
            "insert position must be interior or tail"
        );
        let prev = self.slot(before).prev.unwrap();
        {
            let slot = self.slot_mut(elem);
            slot.prev = Some(prev);
            slot.next = Some(before);
        }
        self.slot_mut(prev).next = Some(elem);
        self.slot_mut(before).prev = Some(elem);
    }

    /// 摘除一个 interior 节点，返回其原后继。
    ///
    /// 摘除后节点自身的链接保持陈旧状态，调用者不得再对它
    /// 调用 `next` / `prev`。
    pub fn remove(&mut self, elem: NodeRef) -> NodeRef {
        assert!(self.is_interior(elem), "remove of a non-interior node");
        let prev = self.slot(elem).prev.unwrap();
        let next = self.slot(elem).next.unwrap();
        self.slot_mut(prev).next = Some(next);
        self.slot_mut(next).prev = Some(prev);
        next
    }

    /// 把半开区间 `[first, last)` 整段搬到 `before` 的紧前方。
    ///
    /// 区间可以来自同一 arena 上的另一条链表；无论区间多长都
    /// 只改写常数个链接。`first == last` 时不做任何事。
    pub fn splice(&mut self, before: NodeRef, first: NodeRef, last: NodeRef) {
        assert!(
            self.is_interior(before) || self.is_tail(before),
            "splice position must be interior or tail"
        );
        if first == last {
            return;
        }
        let last = self.prev(last);
        assert!(self.is_interior(first), "splice range must be interior");
        assert!(self.is_interior(last), "splice range must be interior");

        // 把 first..=last 从原链上干净地摘下
        let first_prev = self.slot(first).prev.unwrap();
        let last_next = self.slot(last).next.unwrap();
        self.slot_mut(first_prev).next = Some(last_next);
        self.slot_mut(last_next).prev = Some(first_prev);

        // 接到 before 之前
        let before_prev = self.slot(before).prev.unwrap();
        self.slot_mut(first).prev = Some(before_prev);
        self.slot_mut(last).next = Some(before);
        self.slot_mut(before_prev).next = Some(first);
        self.slot_mut(before).prev = Some(last);
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// 侵入式双向链表：一对永久存在的哨兵句柄。
///
/// 链表只初始化一次，节点来去不影响链表结构体本身。所有操作
/// 都显式接收节点所在的 arena。
#[derive(Debug)]
pub struct List<T> {
    head: NodeRef,
    tail: NodeRef,
    _marker: PhantomData<fn() -> T>,
}

impl<T> List<T> {
    /// 在 arena 中分配两个哨兵并把它们直接相连，O(1)。
    pub fn new(arena: &mut Arena<T>) -> Self {
        let head = arena.alloc_slot(None);
        let tail = arena.alloc_slot(None);
        arena.slot_mut(head).next = Some(tail);
        arena.slot_mut(tail).prev = Some(head);
        Self {
            head,
            tail,
            _marker: PhantomData,
        }
    }

    /// 第一个真实节点；空表时与 `end()` 相等。
    pub fn begin(&self, arena: &Arena<T>) -> NodeRef {
        arena.slot(self.head).next.unwrap()
    }

    /// 尾哨兵，正向遍历的终止条件，空表时依然有效。
    pub fn end(&self) -> NodeRef {
        self.tail
    }

    /// 最后一个真实节点；空表时与 `rend()` 相等。
    pub fn rbegin(&self, arena: &Arena<T>) -> NodeRef {
        arena.slot(self.tail).prev.unwrap()
    }

    /// 头哨兵，反向遍历的终止条件。
    pub fn rend(&self) -> NodeRef {
        self.head
    }

    pub fn is_empty(&self, arena: &Arena<T>) -> bool {
        self.begin(arena) == self.end()
    }

    /// 队首节点。空表 panic。
    pub fn front(&self, arena: &Arena<T>) -> NodeRef {
        assert!(!self.is_empty(arena), "front of an empty list");
        self.begin(arena)
    }

    /// 队尾节点。空表 panic。
    pub fn back(&self, arena: &Arena<T>) -> NodeRef {
        assert!(!self.is_empty(arena), "back of an empty list");
        self.rbegin(arena)
    }

    pub fn push_front(&self, arena: &mut Arena<T>, elem: NodeRef) {
        arena.insert_before(self.begin(arena), elem);
    }

    pub fn push_back(&self, arena: &mut Arena<T>, elem: NodeRef) {
        arena.insert_before(self.end(), elem);
    }

    /// 摘下并返回队首节点。空表 panic。
    pub fn pop_front(&self, arena: &mut Arena<T>) -> NodeRef {
        let front = self.front(arena);
        arena.remove(front);
        front
    }

    /// 摘下并返回队尾节点。空表 panic。
    pub fn pop_back(&self, arena: &mut Arena<T>) -> NodeRef {
        let back = self.back(arena);
        arena.remove(back);
        back
    }

    /// 节点个数。没有缓存计数，每次调用都全表遍历，O(n)。
    pub fn size(&self, arena: &Arena<T>) -> usize {
        self.iter(arena).count()
    }

    /// 从前到后依次产出节点句柄。
    pub fn iter<'a>(&self, arena: &'a Arena<T>) -> Iter<'a, T> {
        Iter {
            arena,
            cur: self.begin(arena),
            end: self.end(),
        }
    }

    /// 原地翻转整条链表，包括哨兵的朝向，O(n) 时间、O(1) 空间。
    pub fn reverse(&self, arena: &mut Arena<T>) {
        if self.is_empty(arena) {
            return;
        }
        // 逐节点交换 prev/next；交换后旧的 next 存放在 prev 中
        let mut e = self.begin(arena);
        while e != self.end() {
            let slot = arena.slot_mut(e);
            core::mem::swap(&mut slot.prev, &mut slot.next);
            e = slot.prev.unwrap();
        }
        // 调换哨兵的朝向并修补新的首尾节点
        let first = arena.slot(self.head).next.unwrap();
        let last = arena.slot(self.tail).prev.unwrap();
        arena.slot_mut(self.head).next = Some(last);
        arena.slot_mut(self.tail).prev = Some(first);
        arena.slot_mut(last).prev = Some(self.head);
        arena.slot_mut(first).next = Some(self.tail);
    }

    /// 自然迭代归并排序，稳定，O(n log n) 时间、O(1) 额外空间。
    ///
    /// 每趟从左到右识别相邻的非降序 run 并两两原地归并，
    /// 直到一趟只产出一个 run。相等元素保持原有相对顺序。
    pub fn sort<F>(&self, arena: &mut Arena<T>, less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        loop {
            // 本趟产出的 run 数
            let mut output_run_cnt = 0usize;
            let mut a0 = self.begin(arena);
            while a0 != self.end() {
                output_run_cnt += 1;
                // 定位相邻的两个 run：[a0, a1b0) 与 [a1b0, b1)
                let a1b0 = Self::find_end_of_run(arena, a0, self.end(), &less);
                if a1b0 == self.end() {
                    break;
                }
                let b1 = Self::find_end_of_run(arena, a1b0, self.end(), &less);
                Self::inplace_merge(arena, a0, a1b0, b1, &less);
                a0 = b1;
            }
            if output_run_cnt <= 1 {
                break;
            }
        }
    }

    /// 从 `first` 开始沿非降序前进，返回 run 的开区间终点。
    /// `[first, last)` 必须非空。
    fn find_end_of_run<F>(arena: &Arena<T>, mut first: NodeRef, last: NodeRef, less: &F) -> NodeRef
    where
        F: Fn(&T, &T) -> bool,
    {
        assert!(first != last, "run must be non-empty");
        loop {
            first = arena.next(first);
            if first == last {
                break;
            }
            let prev = arena.prev(first);
            if less(arena.get(first), arena.get(prev)) {
                break;
            }
        }
        first
    }

    /// 把两个相邻的有序区间 `[a0, a1b0)` 与 `[a1b0, b1)` 原地归并。
    ///
    /// 只要第二个区间的队首不小于第一个区间的当前元素就推进
    /// 第一个区间，否则把第二个区间的队首拼接到当前位置之前；
    /// 比较取非严格方向，保证排序稳定。
    fn inplace_merge<F>(
        arena: &mut Arena<T>,
        mut a0: NodeRef,
        mut a1b0: NodeRef,
        b1: NodeRef,
        less: &F,
    ) where
        F: Fn(&T, &T) -> bool,
    {
        while a0 != a1b0 && a1b0 != b1 {
            if !less(arena.get(a1b0), arena.get(a0)) {
                a0 = arena.next(a0);
            } else {
                a1b0 = arena.next(a1b0);
                let moved = arena.prev(a1b0);
                arena.splice(a0, moved, a1b0);
            }
        }
    }

    /// 把 `elem` 插入已按同一比较器排序的链表中的正确位置，O(n)。
    ///
    /// 扫描到第一个使 `less(elem, e)` 成立的节点即插入其前，
    /// 因此同序元素按到达顺序排列（FIFO）。
    pub fn insert_ordered<F>(&self, arena: &mut Arena<T>, elem: NodeRef, less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        let mut e = self.begin(arena);
        while e != self.end() {
            if less(arena.get(elem), arena.get(e)) {
                break;
            }
            e = arena.next(e);
        }
        arena.insert_before(e, elem);
    }

    /// 在已排序链表上去除相邻的相等元素（互不 less 即视为相等），
    /// 每个等价类保留最先出现的一个。
    ///
    /// 给定 `duplicates` 时，被移除的节点按遇到的顺序追加到那条
    /// 链表上（必须共用同一个 arena）。
    pub fn unique<F>(&self, arena: &mut Arena<T>, duplicates: Option<&List<T>>, less: F)
    where
        F: Fn(&T, &T) -> bool,
    {
        if self.is_empty(arena) {
            return;
        }
        let mut elem = self.begin(arena);
        loop {
            let next = arena.next(elem);
            if next == self.end() {
                break;
            }
            if !less(arena.get(elem), arena.get(next)) && !less(arena.get(next), arena.get(elem)) {
                arena.remove(next);
                if let Some(dups) = duplicates {
                    dups.push_back(arena, next);
                }
            } else {
                elem = next;
            }
        }
    }

    /// 最大元素；多个并列时返回最先出现的那个。空表返回 `None`。
    pub fn max<F>(&self, arena: &Arena<T>, less: F) -> Option<NodeRef>
    where
        F: Fn(&T, &T) -> bool,
    {
        let mut max = self.begin(arena);
        if max == self.end() {
            return None;
        }
        let mut e = arena.next(max);
        while e != self.end() {
            if less(arena.get(max), arena.get(e)) {
                max = e;
            }
            e = arena.next(e);
        }
        Some(max)
    }

    /// 最小元素；多个并列时返回最先出现的那个。空表返回 `None`。
    pub fn min<F>(&self, arena: &Arena<T>, less: F) -> Option<NodeRef>
    where
        F: Fn(&T, &T) -> bool,
    {
        let mut min = self.begin(arena);
        if min == self.end() {
            return None;
        }
        let mut e = arena.next(min);
        while e != self.end() {
            if less(arena.get(e), arena.get(min)) {
                min = e;
            }
            e = arena.next(e);
        }
        Some(min)
    }
}

/// 正向遍历迭代器，产出节点句柄。
pub struct Iter<'a, T> {
    arena: &'a Arena<T>,
    cur: NodeRef,
    end: NodeRef,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = NodeRef;

    fn next(&mut self) -> Option<NodeRef> {
        if self.cur == self.end {
            None
        } else {
            let cur = self.cur;
            self.cur = self.arena.next(cur);
            Some(cur)
        }
    }
}
