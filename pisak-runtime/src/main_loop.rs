//! # MainLoop 模块
//!
//! 单线程协作式主循环。
//!
//! ## 设计说明
//!
//! - 所有回调都在调用 `run` 的线程上执行，拿到 `&mut C` 上下文，因此不需要锁
//! - 空闲任务（idle）按提交顺序执行一次
//! - 定时任务（timeout）按固定间隔重复触发，回调返回 `Continue::Stop` 后移除
//! - 其他线程（例如开关设备读取线程）通过 `LoopSender` 投递任务并唤醒循环
//! - 唯一的取消手段是退出请求：`QuitHandle::quit` 之后 `run` 在当前回调结束后返回
//! - 由外部事件循环（例如原生窗口工具包）驱动时，用 `dispatch_pending` 逐轮执行，
//!   并通过 `set_waker` 让跨线程投递唤醒外部循环
//!
//! 退出请求一旦发出就不会被清除，之后再调用 `run` 会立即返回。

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 定时回调的返回值
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Continue {
    /// 保留，等待下一次触发
    Keep,
    /// 移除
    Stop,
}

/// 事件源 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

type IdleTask<C> = Box<dyn FnOnce(&mut C)>;
type ExternalTask<C> = Box<dyn FnOnce(&mut C) + Send>;
type Waker = Box<dyn Fn() + Send + Sync>;

struct Timeout<C> {
    id: SourceId,
    interval: Duration,
    deadline: Instant,
    callback: Box<dyn FnMut(&mut C) -> Continue>,
}

struct Sources<C> {
    idle: RefCell<VecDeque<IdleTask<C>>>,
    timeouts: RefCell<Vec<Timeout<C>>>,
    next_id: Cell<u64>,
}

/// 退出句柄
///
/// 只携带退出标志，可以放进销毁回调里。
#[derive(Debug, Clone, Default)]
pub struct QuitHandle(Rc<Cell<bool>>);

impl QuitHandle {
    pub fn quit(&self) {
        if !self.0.get() {
            debug!("请求退出主循环");
        }
        self.0.set(true);
    }

    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

/// 主循环句柄，用于在循环线程上注册事件源
pub struct LoopHandle<C> {
    sources: Rc<Sources<C>>,
    quit: QuitHandle,
}

impl<C> Clone for LoopHandle<C> {
    fn clone(&self) -> Self {
        Self {
            sources: self.sources.clone(),
            quit: self.quit.clone(),
        }
    }
}

impl<C: 'static> LoopHandle<C> {
    /// 提交一次性空闲任务
    pub fn idle_add(&self, task: impl FnOnce(&mut C) + 'static) {
        self.sources.idle.borrow_mut().push_back(Box::new(task));
    }

    /// 注册定时任务，首次触发在 `interval` 之后
    pub fn timeout_add(
        &self,
        interval: Duration,
        callback: impl FnMut(&mut C) -> Continue + 'static,
    ) -> SourceId {
        let id = SourceId(self.sources.next_id.get());
        self.sources.next_id.set(id.0 + 1);
        self.sources.timeouts.borrow_mut().push(Timeout {
            id,
            interval,
            deadline: Instant::now() + interval,
            callback: Box::new(callback),
        });
        trace!(?id, ?interval, "注册定时任务");
        id
    }

    /// 移除定时任务，返回是否存在
    pub fn source_remove(&self, id: SourceId) -> bool {
        let mut timeouts = self.sources.timeouts.borrow_mut();
        let before = timeouts.len();
        timeouts.retain(|t| t.id != id);
        timeouts.len() != before
    }

    /// 当前注册的定时任务数量
    pub fn pending_timeouts(&self) -> usize {
        self.sources.timeouts.borrow().len()
    }

    pub fn quit(&self) {
        self.quit.quit();
    }

    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }
}

/// 跨线程投递任务的发送端
pub struct LoopSender<C> {
    sender: Sender<ExternalTask<C>>,
    waker: Arc<OnceLock<Waker>>,
}

impl<C> Clone for LoopSender<C> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }
}

impl<C> LoopSender<C> {
    /// 投递任务，主循环已被丢弃时返回 `false`
    pub fn send(&self, task: impl FnOnce(&mut C) + Send + 'static) -> bool {
        if self.sender.send(Box::new(task)).is_err() {
            return false;
        }
        if let Some(wake) = self.waker.get() {
            wake();
        }
        true
    }
}

/// 主循环
pub struct MainLoop<C> {
    sources: Rc<Sources<C>>,
    quit: QuitHandle,
    sender: Sender<ExternalTask<C>>,
    receiver: Receiver<ExternalTask<C>>,
    waker: Arc<OnceLock<Waker>>,
}

impl<C: 'static> Default for MainLoop<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> std::fmt::Debug for MainLoop<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MainLoop")
            .field("idle", &self.sources.idle.borrow().len())
            .field("timeouts", &self.sources.timeouts.borrow().len())
            .field("quit_requested", &self.quit.is_requested())
            .finish()
    }
}

impl<C: 'static> MainLoop<C> {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sources: Rc::new(Sources {
                idle: RefCell::new(VecDeque::new()),
                timeouts: RefCell::new(Vec::new()),
                next_id: Cell::new(1),
            }),
            quit: QuitHandle::default(),
            sender,
            receiver,
            waker: Arc::new(OnceLock::new()),
        }
    }

    pub fn handle(&self) -> LoopHandle<C> {
        LoopHandle {
            sources: self.sources.clone(),
            quit: self.quit.clone(),
        }
    }

    pub fn sender(&self) -> LoopSender<C> {
        LoopSender {
            sender: self.sender.clone(),
            waker: self.waker.clone(),
        }
    }

    /// 设置唤醒回调，每次跨线程投递后在发送线程上调用
    ///
    /// 只能设置一次，重复设置返回 `false`。
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) -> bool {
        self.waker.set(Box::new(waker)).is_ok()
    }

    pub fn quit_handle(&self) -> QuitHandle {
        self.quit.clone()
    }

    pub fn quit(&self) {
        self.quit.quit();
    }

    /// 运行主循环，直到收到退出请求
    ///
    /// 没有待处理任务时阻塞等待下一个定时任务或外部投递。
    pub fn run(&self, ctx: &mut C) {
        while !self.quit.is_requested() {
            let next = self.dispatch_pending(ctx);
            if self.quit.is_requested() {
                break;
            }

            // 发送端由循环自身持有，通道不会断开
            let task = match next {
                Some(deadline) => {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match self.receiver.recv_timeout(wait) {
                        Ok(task) => Some(task),
                        Err(RecvTimeoutError::Timeout) => None,
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match self.receiver.recv() {
                    Ok(task) => Some(task),
                    Err(_) => break,
                },
            };
            if let Some(task) = task {
                task(ctx);
            }
        }
    }

    /// 不阻塞地执行一轮：外部投递、空闲任务、到期的定时任务
    ///
    /// 返回下一次需要执行的时间：仍有空闲任务时为现在，否则为最近的定时任务，
    /// 没有任何事件源时为 `None`。已请求退出时什么都不执行。
    pub fn dispatch_pending(&self, ctx: &mut C) -> Option<Instant> {
        while !self.quit.is_requested() {
            let Ok(task) = self.receiver.try_recv() else {
                break;
            };
            task(ctx);
        }
        if self.quit.is_requested() {
            return None;
        }

        self.dispatch_idle(ctx);
        if self.quit.is_requested() {
            return None;
        }

        self.dispatch_timeouts(ctx);
        if self.quit.is_requested() {
            return None;
        }

        if !self.sources.idle.borrow().is_empty() {
            return Some(Instant::now());
        }
        self.next_deadline()
    }

    fn dispatch_idle(&self, ctx: &mut C) {
        loop {
            // 任务执行期间可能继续提交任务，不能持有借用
            let task = self.sources.idle.borrow_mut().pop_front();
            let Some(task) = task else {
                break;
            };
            task(ctx);
            if self.quit.is_requested() {
                break;
            }
        }
    }

    fn dispatch_timeouts(&self, ctx: &mut C) {
        let now = Instant::now();
        let due: Vec<SourceId> = self
            .sources
            .timeouts
            .borrow()
            .iter()
            .filter(|t| t.deadline <= now)
            .map(|t| t.id)
            .collect();

        for id in due {
            let mut timeout = {
                let mut timeouts = self.sources.timeouts.borrow_mut();
                match timeouts.iter().position(|t| t.id == id) {
                    Some(pos) => timeouts.remove(pos),
                    None => continue,
                }
            };

            if (timeout.callback)(ctx) == Continue::Keep {
                timeout.deadline = Instant::now() + timeout.interval;
                self.sources.timeouts.borrow_mut().push(timeout);
            } else {
                trace!(?id, "定时任务结束");
            }

            if self.quit.is_requested() {
                break;
            }
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        self.sources
            .timeouts
            .borrow()
            .iter()
            .map(|t| t.deadline)
            .min()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Counter {
        ticks: u32,
        log: Vec<&'static str>,
    }

    #[test]
    fn test_quit_before_run_returns_immediately() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        main_loop.quit();
        let mut ctx = Counter::default();
        main_loop.run(&mut ctx);
        assert_eq!(ctx.ticks, 0);
    }

    #[test]
    fn test_idle_tasks_run_in_order() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        let handle = main_loop.handle();
        handle.idle_add(|c| c.log.push("first"));
        handle.idle_add(|c| c.log.push("second"));
        let quit = handle.clone();
        handle.idle_add(move |_| quit.quit());

        let mut ctx = Counter::default();
        main_loop.run(&mut ctx);
        assert_eq!(ctx.log, vec!["first", "second"]);
    }

    #[test]
    fn test_timeout_repeats_until_stop() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        let handle = main_loop.handle();
        let quit = handle.clone();
        handle.timeout_add(Duration::from_millis(1), move |c| {
            c.ticks += 1;
            if c.ticks == 3 {
                quit.quit();
                Continue::Stop
            } else {
                Continue::Keep
            }
        });

        let mut ctx = Counter::default();
        main_loop.run(&mut ctx);
        assert_eq!(ctx.ticks, 3);
        assert_eq!(handle.pending_timeouts(), 0);
    }

    #[test]
    fn test_source_remove() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        let handle = main_loop.handle();
        let id = handle.timeout_add(Duration::from_secs(60), |_| Continue::Keep);
        assert!(handle.source_remove(id));
        assert!(!handle.source_remove(id));
    }

    #[test]
    fn test_dispatch_pending_reports_next_deadline() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        let handle = main_loop.handle();
        let mut ctx = Counter::default();
        assert_eq!(main_loop.dispatch_pending(&mut ctx), None);

        handle.idle_add(|c| c.log.push("idle"));
        handle.timeout_add(Duration::from_secs(60), |c| {
            c.ticks += 1;
            Continue::Keep
        });
        let before = Instant::now();
        let next = main_loop.dispatch_pending(&mut ctx).unwrap();
        assert_eq!(ctx.log, vec!["idle"]);
        assert_eq!(ctx.ticks, 0);
        assert!(next > before + Duration::from_secs(30));

        main_loop.quit();
        handle.idle_add(|c| c.log.push("late"));
        assert_eq!(main_loop.dispatch_pending(&mut ctx), None);
        assert_eq!(ctx.log, vec!["idle"]);
    }

    #[test]
    fn test_waker_called_after_send() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let main_loop: MainLoop<Counter> = MainLoop::new();
        let sender = main_loop.sender();
        let wakes = Arc::new(AtomicUsize::new(0));
        let counter = wakes.clone();
        assert!(main_loop.set_waker(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        assert!(!main_loop.set_waker(|| {}));

        std::thread::spawn(move || sender.send(|c: &mut Counter| c.log.push("external")))
            .join()
            .unwrap();
        assert_eq!(wakes.load(Ordering::SeqCst), 1);

        let mut ctx = Counter::default();
        main_loop.dispatch_pending(&mut ctx);
        assert_eq!(ctx.log, vec!["external"]);
    }

    #[test]
    fn test_sender_wakes_blocked_loop() {
        let main_loop: MainLoop<Counter> = MainLoop::new();
        let sender = main_loop.sender();

        let thread = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(10));
            sender.send(|c: &mut Counter| c.log.push("external"));
        });

        // 外部任务执行后由空闲任务退出
        let handle = main_loop.handle();
        let mut ctx = Counter::default();
        let quit = handle.quit_handle();
        handle.timeout_add(Duration::from_millis(5), move |c| {
            if c.log.contains(&"external") {
                quit.quit();
                Continue::Stop
            } else {
                Continue::Keep
            }
        });
        main_loop.run(&mut ctx);
        thread.join().unwrap();
        assert_eq!(ctx.log, vec!["external"]);
    }
}
