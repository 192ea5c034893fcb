//! 宿主测试用的假内核：用 std 线程模拟“单处理器 + 关中断”模型。
//!
//! 一把全局巨锁扮演中断屏蔽——持有巨锁即“中断被屏蔽”，可按层级
//! 嵌套；`block_current` 完整释放巨锁（模拟调度器在任务切出期间
//! 重新打开中断），被唤醒后按原深度重新持有。唤醒令牌保证
//! `wakeup` 先于阻塞到达时不会丢失。

use lazy_static::lazy_static;
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, Once};
use std::thread::{self, JoinHandle, ThreadId};

use ksync::hal::IntrControl;
use ksync::task::{Scheduler, Task, TaskRef};

struct FakeTask {
    tid: usize,
}

impl Task for FakeTask {
    fn id(&self) -> usize {
        self.tid
    }
}

struct Giant {
    owner: Option<ThreadId>,
    depth: usize,
}

struct ParkState {
    priority: usize,
    runnable: Mutex<bool>,
    cv: Condvar,
}

pub struct FakeKernel {
    giant: Mutex<Giant>,
    released: Condvar,
    tasks: Mutex<HashMap<usize, Arc<ParkState>>>,
}

thread_local! {
    static CURRENT: RefCell<Option<TaskRef>> = const { RefCell::new(None) };
    static IN_INTERRUPT: Cell<bool> = const { Cell::new(false) };
}

impl FakeKernel {
    fn new() -> Self {
        Self {
            giant: Mutex::new(Giant {
                owner: None,
                depth: 0,
            }),
            released: Condvar::new(),
            tasks: Mutex::new(HashMap::new()),
        }
    }

    fn park_state(&self, tid: usize) -> Arc<ParkState> {
        self.tasks
            .lock()
            .unwrap()
            .get(&tid)
            .expect("task not registered with the fake kernel")
            .clone()
    }
}

impl IntrControl for FakeKernel {
    fn mask(&self) -> usize {
        let me = thread::current().id();
        let mut giant = self.giant.lock().unwrap();
        loop {
            match giant.owner {
                Some(owner) if owner == me => {
                    let prev = giant.depth;
                    giant.depth += 1;
                    return prev;
                }
                None => {
                    giant.owner = Some(me);
                    giant.depth = 1;
                    return 0;
                }
                Some(_) => giant = self.released.wait(giant).unwrap(),
            }
        }
    }

    fn restore(&self, level: usize) {
        let me = thread::current().id();
        let mut giant = self.giant.lock().unwrap();
        assert_eq!(giant.owner, Some(me), "restore by a non-masking thread");
        giant.depth = level;
        if level == 0 {
            giant.owner = None;
            drop(giant);
            self.released.notify_all();
        }
    }

    fn is_interrupt_context(&self) -> bool {
        IN_INTERRUPT.with(|flag| flag.get())
    }
}

impl Scheduler for FakeKernel {
    fn current_task(&self) -> TaskRef {
        CURRENT.with(|current| current.borrow().clone()).expect("no current task on this thread")
    }

    fn block_current(&self) {
        let task = Scheduler::current_task(self);
        let park = self.park_state(task.id());
        let me = thread::current().id();

        // 完整释放巨锁，模拟调度器在任务切出期间重新打开中断
        let saved_depth = {
            let mut giant = self.giant.lock().unwrap();
            assert_eq!(
                giant.owner,
                Some(me),
                "block_current without interrupts masked"
            );
            let depth = giant.depth;
            giant.owner = None;
            giant.depth = 0;
            depth
        };
        self.released.notify_all();

        // 等待唤醒令牌；令牌使先到的 wakeup 不会丢失
        {
            let mut runnable = park.runnable.lock().unwrap();
            while !*runnable {
                runnable = park.cv.wait(runnable).unwrap();
            }
            *runnable = false;
        }

        // 按原深度重新持有巨锁，恢复调用者的屏蔽状态
        let mut giant = self.giant.lock().unwrap();
        while giant.owner.is_some() {
            giant = self.released.wait(giant).unwrap();
        }
        giant.owner = Some(me);
        giant.depth = saved_depth;
    }

    fn wakeup(&self, task: TaskRef) {
        let park = self.park_state(task.id());
        let mut runnable = park.runnable.lock().unwrap();
        *runnable = true;
        park.cv.notify_one();
    }

    fn precedes(&self, a: &TaskRef, b: &TaskRef) -> bool {
        let tasks = self.tasks.lock().unwrap();
        let pa = tasks.get(&a.id()).expect("unknown task").priority;
        let pb = tasks.get(&b.id()).expect("unknown task").priority;
        pa > pb
    }
}

lazy_static! {
    static ref KERNEL: FakeKernel = FakeKernel::new();
}

static REGISTER: Once = Once::new();
static NEXT_TID: AtomicUsize = AtomicUsize::new(1);

/// 注册假内核，整个测试进程只注册一次。
pub fn setup_kernel() {
    REGISTER.call_once(|| {
        ksync::hal::register_intr_control(&*KERNEL);
        ksync::task::register_scheduler(&*KERNEL);
    });
}

/// 把调用线程变成一个具有给定优先级的任务。
pub fn become_task(priority: usize) {
    setup_kernel();
    let tid = NEXT_TID.fetch_add(1, Ordering::Relaxed);
    KERNEL.tasks.lock().unwrap().insert(
        tid,
        Arc::new(ParkState {
            priority,
            runnable: Mutex::new(false),
            cv: Condvar::new(),
        }),
    );
    let task: TaskRef = Arc::new(FakeTask { tid });
    CURRENT.with(|current| *current.borrow_mut() = Some(task));
}

/// 以给定优先级启动一个任务线程。
pub fn spawn_task<F>(priority: usize, f: F) -> JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    setup_kernel();
    thread::spawn(move || {
        become_task(priority);
        f();
    })
}

/// 把调用线程标记为处于中断上下文，用于契约检查测试。
#[allow(dead_code)]
pub fn enter_interrupt_context() {
    IN_INTERRUPT.with(|flag| flag.set(true));
}
