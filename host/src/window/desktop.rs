//! 桌面后端
//!
//! 在任一内存后端外面包一层 winit：打开真实的原生窗口，
//! 用主显示器的几何信息定位窗口，并由 winit 事件循环驱动 [`MainLoop`]。
//!
//! - 配置中的 `monitor` 只作为覆盖，未设置时使用探测到的主显示器
//! - 关闭原生窗口即销毁应用窗口，销毁回调结束主循环，随后事件循环退出
//! - 跨线程投递（设备事件）通过 `EventLoopProxy` 唤醒事件循环
//! - 空格、回车视为一次激活，Esc 请求退出

use super::{BackendError, Geometry, Window, WindowBackend};
use crate::app::{AppArgs, RunningFlag, run_main_loop};
use crate::config::{AppConfig, MonitorConfig};
use crate::input::DeviceCommand;
use pisak_runtime::{Descriptor, MainLoop, QuitHandle};
use std::sync::Mutex;
use std::time::Instant;
use tracing::{debug, error, info, trace, warn};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalPosition, LogicalSize, PhysicalPosition, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, ControlFlow, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    monitor::MonitorHandle,
    window::{Fullscreen, WindowAttributes, WindowId},
};

/// 唤醒事件循环的用户事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Wake;

/// 桌面后端
pub struct DesktopBackend<B: WindowBackend> {
    inner: B,
    event_loop: Option<EventLoop<Wake>>,
    debug: bool,
    monitor_override: Option<MonitorConfig>,
    title: String,
}

impl<B: WindowBackend + std::fmt::Debug> std::fmt::Debug for DesktopBackend<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DesktopBackend")
            .field("inner", &self.inner)
            .field("event_loop_pending", &self.event_loop.is_some())
            .field("debug", &self.debug)
            .field("monitor_override", &self.monitor_override)
            .finish()
    }
}

impl<B: WindowBackend> WindowBackend for DesktopBackend<B> {
    const NAME: &'static str = "desktop";

    fn init(args: &AppArgs) -> Result<Self, BackendError> {
        let inner = B::init(args)?;
        let event_loop = EventLoop::<Wake>::with_user_event()
            .build()
            .map_err(|e| BackendError::Toolkit(e.to_string()))?;

        let proxy = Mutex::new(event_loop.create_proxy());
        let installed = inner.main_loop().set_waker(move || {
            if let Ok(proxy) = proxy.lock()
                && proxy.send_event(Wake).is_err()
            {
                trace!("事件循环已关闭，忽略唤醒");
            }
        });
        if !installed {
            warn!(backend = B::NAME, "主循环已设置唤醒回调");
        }

        info!(inner = B::NAME, "初始化 winit 事件循环");
        Ok(Self {
            inner,
            event_loop: Some(event_loop),
            debug: args.debug,
            monitor_override: None,
            title: String::new(),
        })
    }

    fn create_window(
        &mut self,
        args: &AppArgs,
        descriptor: &Descriptor,
        config: &AppConfig,
    ) -> Window {
        self.debug = args.debug;
        self.monitor_override = config.monitor;
        self.title = config.title.clone();
        self.inner.create_window(args, descriptor, config)
    }

    fn main_loop(&self) -> &MainLoop<Window> {
        self.inner.main_loop()
    }

    fn main(&mut self, window: &mut Window, running: &RunningFlag) {
        let Some(event_loop) = self.event_loop.take() else {
            warn!("winit 事件循环已运行过，不能再次启动");
            return;
        };
        window.show_all();

        let main_loop = self.inner.main_loop();
        let mut handler = DesktopHandler {
            window,
            main_loop,
            quit: main_loop.quit_handle(),
            debug: self.debug,
            monitor_override: self.monitor_override,
            title: &self.title,
            surface: None,
        };
        run_main_loop("winit 主循环", running, || {
            if handler.quit.is_requested() {
                return;
            }
            if let Err(e) = event_loop.run_app(&mut handler) {
                error!(error = %e, "winit 事件循环异常退出");
            }
        });
    }

    fn main_quit(&mut self, window: &mut Window) {
        self.inner.main_quit(window);
    }
}

/// 事件循环回调
struct DesktopHandler<'a> {
    window: &'a mut Window,
    main_loop: &'a MainLoop<Window>,
    quit: QuitHandle,
    debug: bool,
    monitor_override: Option<MonitorConfig>,
    title: &'a str,
    surface: Option<winit::window::Window>,
}

impl DesktopHandler<'_> {
    fn open_surface(&mut self, event_loop: &ActiveEventLoop) {
        let primary = event_loop
            .primary_monitor()
            .or_else(|| event_loop.available_monitors().next());
        let detected = primary.as_ref().map(monitor_config);
        let geometry = resolve_geometry(self.monitor_override, detected, self.debug);
        self.window.apply_geometry(&geometry, self.title);

        let attributes = surface_attributes(&geometry, self.title, primary);
        match event_loop.create_window(attributes) {
            Ok(surface) => {
                info!(
                    width = geometry.width,
                    height = geometry.height,
                    fullscreen = geometry.fullscreen,
                    detected = detected.is_some(),
                    "打开原生窗口"
                );
                self.surface = Some(surface);
            }
            Err(e) => {
                error!(error = %e, "无法创建原生窗口");
                self.window.destroy();
            }
        }
    }

    /// 执行主循环中到期的任务，并据此设置事件循环的等待方式
    fn pump(&mut self, event_loop: &ActiveEventLoop) {
        let next = self.main_loop.dispatch_pending(&mut *self.window);
        if self.quit.is_requested() {
            if self.surface.take().is_some() {
                debug!("关闭原生窗口");
            }
            event_loop.exit();
            return;
        }
        event_loop.set_control_flow(control_flow(next));
    }
}

impl ApplicationHandler<Wake> for DesktopHandler<'_> {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.surface.is_none() && !self.window.is_destroyed() {
            self.open_surface(event_loop);
        }
        self.pump(event_loop);
    }

    fn user_event(&mut self, event_loop: &ActiveEventLoop, _event: Wake) {
        self.pump(event_loop);
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested | WindowEvent::Destroyed => {
                info!("原生窗口关闭");
                self.window.destroy();
            }
            WindowEvent::Resized(size) => {
                let scale = self.surface.as_ref().map_or(1.0, |s| s.scale_factor());
                let size: LogicalSize<f32> = size.to_logical(scale);
                self.window.stage.set_size(size.width, size.height);
            }
            WindowEvent::KeyboardInput { event, .. }
                if event.state == ElementState::Pressed && !event.repeat =>
            {
                let command = match event.physical_key {
                    PhysicalKey::Code(code) => key_command(code),
                    PhysicalKey::Unidentified(_) => None,
                };
                if let Some(command) = command
                    && let Err(e) = command.apply(&mut *self.window)
                {
                    warn!(error = %e, ?command, "按键处理失败");
                }
            }
            _ => {}
        }
        self.pump(event_loop);
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        self.pump(event_loop);
    }
}

/// 键盘按键对应的设备命令
pub fn key_command(code: KeyCode) -> Option<DeviceCommand> {
    match code {
        KeyCode::Space | KeyCode::Enter | KeyCode::NumpadEnter => Some(DeviceCommand::Activate),
        KeyCode::Escape => Some(DeviceCommand::Quit),
        _ => None,
    }
}

/// 窗口几何：配置覆盖优先，其次是探测到的显示器，最后是内置默认值
pub fn resolve_geometry(
    monitor_override: Option<MonitorConfig>,
    detected: Option<MonitorConfig>,
    debug: bool,
) -> Geometry {
    Geometry::new(monitor_override.or(detected).unwrap_or_default(), debug)
}

/// 物理像素的显示器区域换算为逻辑坐标
pub fn logical_monitor(
    position: PhysicalPosition<i32>,
    size: PhysicalSize<u32>,
    scale_factor: f64,
) -> MonitorConfig {
    let position: LogicalPosition<f32> = position.to_logical(scale_factor);
    let size: LogicalSize<f32> = size.to_logical(scale_factor);
    MonitorConfig {
        x: position.x,
        y: position.y,
        width: size.width,
        height: size.height,
    }
}

fn monitor_config(monitor: &MonitorHandle) -> MonitorConfig {
    logical_monitor(monitor.position(), monitor.size(), monitor.scale_factor())
}

/// 没有待执行的任务时一直等待事件
pub fn control_flow(next: Option<Instant>) -> ControlFlow {
    match next {
        Some(deadline) => ControlFlow::WaitUntil(deadline),
        None => ControlFlow::Wait,
    }
}

fn surface_attributes(
    geometry: &Geometry,
    title: &str,
    monitor: Option<MonitorHandle>,
) -> WindowAttributes {
    let attributes = winit::window::Window::default_attributes()
        .with_title(title)
        .with_position(LogicalPosition::new(
            f64::from(geometry.x),
            f64::from(geometry.y),
        ))
        .with_inner_size(LogicalSize::new(
            f64::from(geometry.width),
            f64::from(geometry.height),
        ))
        .with_resizable(geometry.resizable);
    if geometry.fullscreen {
        attributes.with_fullscreen(Some(Fullscreen::Borderless(monitor)))
    } else {
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::DEBUG_SIZE_FACTOR;
    use std::time::Duration;

    #[test]
    fn test_keys_map_to_commands() {
        assert_eq!(key_command(KeyCode::Space), Some(DeviceCommand::Activate));
        assert_eq!(key_command(KeyCode::Enter), Some(DeviceCommand::Activate));
        assert_eq!(key_command(KeyCode::NumpadEnter), Some(DeviceCommand::Activate));
        assert_eq!(key_command(KeyCode::Escape), Some(DeviceCommand::Quit));
        assert_eq!(key_command(KeyCode::KeyA), None);
    }

    #[test]
    fn test_override_beats_detected_monitor() {
        let detected = MonitorConfig {
            x: 0.0,
            y: 0.0,
            width: 2560.0,
            height: 1440.0,
        };
        let forced = MonitorConfig {
            x: 2560.0,
            y: 0.0,
            width: 1280.0,
            height: 1024.0,
        };

        let geometry = resolve_geometry(None, Some(detected), false);
        assert_eq!((geometry.width, geometry.height), (2560.0, 1440.0));
        assert!(geometry.fullscreen);

        let geometry = resolve_geometry(Some(forced), Some(detected), false);
        assert_eq!((geometry.x, geometry.width), (2560.0, 1280.0));

        let geometry = resolve_geometry(None, None, true);
        assert!((geometry.width - 1920.0 * DEBUG_SIZE_FACTOR).abs() < 1e-3);
        assert!(geometry.resizable);
    }

    #[test]
    fn test_monitor_converted_to_logical() {
        let monitor = logical_monitor(
            PhysicalPosition::new(3840, 0),
            PhysicalSize::new(3840, 2160),
            2.0,
        );
        assert_eq!(
            monitor,
            MonitorConfig {
                x: 1920.0,
                y: 0.0,
                width: 1920.0,
                height: 1080.0,
            }
        );
    }

    #[test]
    fn test_control_flow_follows_deadline() {
        assert_eq!(control_flow(None), ControlFlow::Wait);
        let deadline = Instant::now() + Duration::from_secs(1);
        assert_eq!(control_flow(Some(deadline)), ControlFlow::WaitUntil(deadline));
    }

    #[test]
    fn test_surface_attributes_follow_geometry() {
        let geometry = Geometry::new(MonitorConfig::default(), true);
        let attributes = surface_attributes(&geometry, "PISAK", None);
        assert_eq!(attributes.title, "PISAK");
        assert!(attributes.resizable);
        assert!(attributes.fullscreen.is_none());

        let geometry = Geometry::new(MonitorConfig::default(), false);
        let attributes = surface_attributes(&geometry, "PISAK", None);
        assert!(!attributes.resizable);
        assert!(matches!(
            attributes.fullscreen,
            Some(Fullscreen::Borderless(None))
        ));
    }
}
