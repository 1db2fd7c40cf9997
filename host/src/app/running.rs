//! 主循环运行标志

use std::cell::Cell;
use std::rc::Rc;
use tracing::debug;

/// 主循环是否正在运行
///
/// 只在 [`run_main_loop`] 期间为真。置位与循环真正启动之间、
/// 循环结束与复位之间总有一段时间差，只能作为粗略状态使用。
#[derive(Debug, Clone, Default)]
pub struct RunningFlag(Rc<Cell<bool>>);

impl RunningFlag {
    pub fn is_running(&self) -> bool {
        self.0.get()
    }

    /// 置位，返回的守卫析构时复位（包括 panic 展开）
    pub fn acquire(&self) -> RunningGuard {
        self.0.set(true);
        RunningGuard(self.0.clone())
    }
}

/// 运行标志守卫
#[derive(Debug)]
pub struct RunningGuard(Rc<Cell<bool>>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

/// 运行主循环，期间维护运行标志
///
/// 所有后端的 `main` 都通过这里启动循环。
pub fn run_main_loop(message: &str, running: &RunningFlag, main_loop: impl FnOnce()) {
    debug!("{message}");
    let _guard = running.acquire();
    main_loop();
}
