//! 同步原语的宿主集成测试，运行在 `common` 的假内核之上。

mod common;

use common::{become_task, enter_interrupt_context, setup_kernel, spawn_task};
use ksync::sync::{Condvar, Mutex, Semaphore};
use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::sleep;
use std::time::Duration;

const SETTLE: Duration = Duration::from_millis(100);
const LONG: Duration = Duration::from_secs(5);

#[test]
fn semaphore_blocks_until_up() {
    become_task(0);
    let sem = Arc::new(Semaphore::new(0));
    let (tx, rx) = mpsc::channel();
    let handle = {
        let sem = Arc::clone(&sem);
        spawn_task(1, move || {
            sem.down();
            tx.send(()).unwrap();
        })
    };
    sleep(SETTLE);
    // down 尚未返回
    assert!(rx.try_recv().is_err());
    assert_eq!(sem.value(), 0);

    sem.up();
    rx.recv_timeout(LONG).unwrap();
    handle.join().unwrap();
    // X 的 down 消耗了这次 up
    assert_eq!(sem.value(), 0);
}

#[test]
fn semaphore_try_down() {
    become_task(0);
    let sem = Semaphore::new(1);
    assert!(sem.try_down());
    assert!(!sem.try_down());
    sem.up();
    assert!(sem.try_down());
}

#[test]
fn semaphore_ping_pong() {
    become_task(0);
    let ping = Arc::new(Semaphore::new(0));
    let pong = Arc::new(Semaphore::new(0));
    let handle = {
        let (ping, pong) = (Arc::clone(&ping), Arc::clone(&pong));
        spawn_task(1, move || {
            for _ in 0..10 {
                ping.down();
                pong.up();
            }
        })
    };
    for _ in 0..10 {
        ping.up();
        pong.down();
    }
    handle.join().unwrap();
    assert_eq!(ping.value(), 0);
    assert_eq!(pong.value(), 0);
}

#[test]
fn semaphore_wakes_highest_priority_first() {
    become_task(0);
    let sem = Arc::new(Semaphore::new(0));
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    // 到达顺序 1, 5, 3
    for prio in [1usize, 5, 3] {
        let sem = Arc::clone(&sem);
        let order = Arc::clone(&order);
        handles.push(spawn_task(prio, move || {
            sem.down();
            order.lock().unwrap().push(prio);
        }));
        sleep(SETTLE);
    }
    for _ in 0..3 {
        sem.up();
        sleep(SETTLE);
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![5, 3, 1]);
}

#[test]
fn mutex_contention_and_handoff() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    mutex.lock();
    assert!(mutex.is_locked());
    assert!(mutex.is_held_by_current_task());

    let (tx, rx) = mpsc::channel();
    let handle = {
        let mutex = Arc::clone(&mutex);
        spawn_task(1, move || {
            // 持有者未释放时 try_lock 失败
            assert!(!mutex.try_lock());
            assert!(!mutex.is_held_by_current_task());
            tx.send(()).unwrap();
            mutex.lock();
            assert!(mutex.is_held_by_current_task());
            mutex.unlock();
        })
    };
    rx.recv_timeout(LONG).unwrap();
    mutex.unlock();
    assert!(!mutex.is_held_by_current_task());
    handle.join().unwrap();
    assert!(!mutex.is_locked());
}

struct RacyCounter(UnsafeCell<usize>);
unsafe impl Sync for RacyCounter {}

#[test]
fn mutex_guards_shared_counter() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    let counter = Arc::new(RacyCounter(UnsafeCell::new(0)));
    let mut handles = Vec::new();
    for _ in 0..4 {
        let mutex = Arc::clone(&mutex);
        let counter = Arc::clone(&counter);
        handles.push(spawn_task(1, move || {
            for _ in 0..100 {
                mutex.lock();
                unsafe {
                    let v = *counter.0.get();
                    std::thread::yield_now();
                    *counter.0.get() = v + 1;
                }
                mutex.unlock();
            }
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }
    mutex.lock();
    assert_eq!(unsafe { *counter.0.get() }, 400);
    mutex.unlock();
}

#[test]
fn condvar_signal_wakes_by_priority() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    let cond = Arc::new(Condvar::new());
    let order = Arc::new(std::sync::Mutex::new(Vec::new()));
    let mut handles = Vec::new();
    // 到达顺序 1, 5, 3
    for prio in [1usize, 5, 3] {
        let mutex = Arc::clone(&mutex);
        let cond = Arc::clone(&cond);
        let order = Arc::clone(&order);
        handles.push(spawn_task(prio, move || {
            mutex.lock();
            cond.wait(&mutex);
            order.lock().unwrap().push(prio);
            mutex.unlock();
        }));
        sleep(SETTLE);
    }
    for _ in 0..3 {
        mutex.lock();
        cond.signal(&mutex);
        mutex.unlock();
        sleep(SETTLE);
    }
    for handle in handles {
        handle.join().unwrap();
    }
    assert_eq!(*order.lock().unwrap(), vec![5, 3, 1]);
}

#[test]
fn condvar_broadcast_wakes_all() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    let cond = Arc::new(Condvar::new());
    let mut handles = Vec::new();
    for prio in [1usize, 2, 3] {
        let mutex = Arc::clone(&mutex);
        let cond = Arc::clone(&cond);
        handles.push(spawn_task(prio, move || {
            mutex.lock();
            cond.wait(&mutex);
            mutex.unlock();
        }));
    }
    sleep(SETTLE * 3);
    mutex.lock();
    cond.broadcast(&mutex);
    mutex.unlock();
    for handle in handles {
        handle.join().unwrap();
    }
}

#[test]
fn condvar_mesa_recheck() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    let cond = Arc::new(Condvar::new());
    let ready = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel();
    let handle = {
        let mutex = Arc::clone(&mutex);
        let cond = Arc::clone(&cond);
        let ready = Arc::clone(&ready);
        spawn_task(1, move || {
            mutex.lock();
            // Mesa 语义：被唤醒后必须重新检查条件
            while !ready.load(Ordering::Relaxed) {
                cond.wait(&mutex);
            }
            mutex.unlock();
            tx.send(()).unwrap();
        })
    };
    sleep(SETTLE);
    mutex.lock();
    ready.store(true, Ordering::Relaxed);
    cond.signal(&mutex);
    mutex.unlock();
    rx.recv_timeout(LONG).unwrap();
    handle.join().unwrap();
}

#[test]
#[should_panic(expected = "already holding")]
fn recursive_lock_is_fatal() {
    become_task(0);
    let mutex = Mutex::new();
    mutex.lock();
    mutex.lock();
}

#[test]
#[should_panic(expected = "already holding")]
fn recursive_try_lock_is_fatal() {
    become_task(0);
    let mutex = Mutex::new();
    mutex.lock();
    mutex.try_lock();
}

#[test]
fn unlock_by_non_holder_is_fatal() {
    become_task(0);
    let mutex = Arc::new(Mutex::new());
    mutex.lock();
    let handle = {
        let mutex = Arc::clone(&mutex);
        spawn_task(1, move || {
            mutex.unlock();
        })
    };
    // 非持有者的 unlock 在其线程内 panic
    assert!(handle.join().is_err());
    mutex.unlock();
}

#[test]
#[should_panic(expected = "without holding the mutex")]
fn wait_without_mutex_is_fatal() {
    become_task(0);
    let mutex = Mutex::new();
    let cond = Condvar::new();
    cond.wait(&mutex);
}

#[test]
#[should_panic(expected = "interrupt context")]
fn down_in_interrupt_context_is_fatal() {
    become_task(0);
    enter_interrupt_context();
    let sem = Semaphore::new(0);
    sem.down();
}

#[test]
fn up_and_try_down_allowed_in_interrupt_context() {
    setup_kernel();
    become_task(0);
    enter_interrupt_context();
    let sem = Semaphore::new(0);
    sem.up();
    assert!(sem.try_down());
    assert!(!sem.try_down());
}
