//! 日志系统初始化
//!
//! 环境变量 `RUST_LOG` 优先；未设置时普通模式为 `info`，调试模式为 `debug`。
//!
//! ```bash
//! RUST_LOG=pisak_runtime=trace pisak --debug
//! ```

use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

/// 默认日志级别
pub fn default_directive(debug: bool) -> &'static str {
    if debug { "debug" } else { "info" }
}

/// 初始化全局日志系统
///
/// 返回是否安装了新的订阅者；已有订阅者时保留它，并通过它记录一条调试日志。
pub fn init_logging(debug: bool) -> bool {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let installed = fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_ansi(true)
        .try_init()
        .is_ok();
    if !installed {
        let debug_mode = debug;
        debug!(debug = debug_mode, "日志订阅者已安装，保留现有配置");
    }
    installed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(true), "debug");
        assert_eq!(default_directive(false), "info");
    }

    #[test]
    fn test_second_init_keeps_existing_subscriber() {
        init_logging(false);
        assert!(!init_logging(true));
    }
}
