//! # Scene 模块
//!
//! 无头场景图：保存舞台（Stage）与演员（Actor）的结构状态。
//!
//! 渲染不在本层范围内，这里只维护输入中间件与各组件需要读写的结构信息：
//! - 父子关系与子节点顺序
//! - 可响应状态（reactive）与键盘焦点
//! - 信号连接与分发，输入捕获层
//!
//! 舞台销毁后演员不能再被修改，相关操作返回 `SceneError::StageDestroyed`。
//! - 舞台的窗口属性（标题、位置、尺寸、全屏）与销毁回调

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// 演员 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u32);

/// 信号处理器 ID（全局递增，不会复用）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// 场景图错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SceneError {
    /// 演员不存在
    #[error("演员不存在: {0:?}")]
    UnknownActor(ActorId),

    /// 演员已经挂在其他父节点下
    #[error("演员 {child:?} 已有父节点 {parent:?}")]
    AlreadyParented { child: ActorId, parent: ActorId },

    /// 演员不是给定父节点的子节点
    #[error("演员 {child:?} 不是 {parent:?} 的子节点")]
    NotAChild { parent: ActorId, child: ActorId },

    /// 不能把演员挂到自身或其后代之下
    #[error("不能把演员 {0:?} 挂到自身或其后代之下")]
    Cycle(ActorId),

    /// 信号处理器不存在
    #[error("演员 {actor:?} 上不存在信号处理器 {handler:?}")]
    UnknownHandler { actor: ActorId, handler: HandlerId },

    /// 舞台已销毁
    #[error("舞台已销毁")]
    StageDestroyed,
}

#[derive(Debug, Clone, Default)]
struct Actor {
    name: String,
    parent: Option<ActorId>,
    children: Vec<ActorId>,
    reactive: bool,
    /// 挂在舞台根上时遮挡其下所有演员的输入
    captures_input: bool,
    x_expand: bool,
    y_expand: bool,
    size: Option<(f32, f32)>,
    style_class: Option<String>,
    label: Option<String>,
    image: Option<PathBuf>,
    handlers: Vec<(HandlerId, String)>,
}

/// 舞台
///
/// 场景图的根绘制表面。舞台本身也是一个演员（`root()`），
/// 其余演员通过 `create_actor` 创建后挂到树上。
pub struct Stage {
    actors: HashMap<ActorId, Actor>,
    root: ActorId,
    next_actor: u32,
    next_handler: u64,
    key_focus: Option<ActorId>,
    title: String,
    position: (f32, f32),
    size: (f32, f32),
    user_resizable: bool,
    fullscreen: bool,
    visible: bool,
    destroyed: bool,
    destroy_callbacks: Vec<Box<dyn FnMut()>>,
}

impl std::fmt::Debug for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("actors", &self.actors.len())
            .field("title", &self.title)
            .field("size", &self.size)
            .field("fullscreen", &self.fullscreen)
            .field("destroyed", &self.destroyed)
            .finish()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

impl Stage {
    /// 创建空舞台
    pub fn new() -> Self {
        let root = ActorId(0);
        let mut actors = HashMap::new();
        actors.insert(
            root,
            Actor {
                name: "stage".to_string(),
                reactive: true,
                ..Actor::default()
            },
        );

        Self {
            actors,
            root,
            next_actor: 1,
            next_handler: 1,
            key_focus: None,
            title: String::new(),
            position: (0.0, 0.0),
            size: (0.0, 0.0),
            user_resizable: false,
            fullscreen: false,
            visible: false,
            destroyed: false,
            destroy_callbacks: Vec::new(),
        }
    }

    /// 舞台根演员
    pub fn root(&self) -> ActorId {
        self.root
    }

    /// 创建一个未挂载的演员
    pub fn create_actor(&mut self, name: impl Into<String>) -> ActorId {
        let id = ActorId(self.next_actor);
        self.next_actor += 1;
        self.actors.insert(
            id,
            Actor {
                name: name.into(),
                ..Actor::default()
            },
        );
        id
    }

    /// 创建输入捕获层
    ///
    /// 捕获层挂在舞台根上时，只有它子树内的演员能收到设备输入。
    pub fn create_capture_layer(&mut self, name: impl Into<String>) -> ActorId {
        let id = self.create_actor(name);
        if let Some(actor) = self.actors.get_mut(&id) {
            actor.reactive = true;
            actor.captures_input = true;
        }
        id
    }

    pub fn contains(&self, actor: ActorId) -> bool {
        self.actors.contains_key(&actor)
    }

    fn actor(&self, id: ActorId) -> Result<&Actor, SceneError> {
        self.actors.get(&id).ok_or(SceneError::UnknownActor(id))
    }

    fn actor_mut(&mut self, id: ActorId) -> Result<&mut Actor, SceneError> {
        if self.destroyed {
            return Err(SceneError::StageDestroyed);
        }
        self.actors.get_mut(&id).ok_or(SceneError::UnknownActor(id))
    }

    /// 演员名称
    pub fn name(&self, actor: ActorId) -> Option<&str> {
        self.actors.get(&actor).map(|a| a.name.as_str())
    }

    /// 按名称查找演员，同名时返回最早创建的那个
    pub fn find(&self, name: &str) -> Option<ActorId> {
        self.actors
            .iter()
            .filter(|(_, a)| a.name == name)
            .map(|(id, _)| *id)
            .min()
    }

    /// 父节点
    pub fn parent(&self, actor: ActorId) -> Option<ActorId> {
        self.actors.get(&actor).and_then(|a| a.parent)
    }

    /// 子节点列表（按绘制顺序）
    pub fn children(&self, actor: ActorId) -> &[ActorId] {
        self.actors
            .get(&actor)
            .map(|a| a.children.as_slice())
            .unwrap_or(&[])
    }

    /// 演员在父节点子列表中的下标
    pub fn index_of(&self, actor: ActorId) -> Option<usize> {
        let parent = self.parent(actor)?;
        self.children(parent).iter().position(|c| *c == actor)
    }

    /// `ancestor` 是否为 `actor` 自身或其祖先
    pub fn is_ancestor_or_self(&self, ancestor: ActorId, actor: ActorId) -> bool {
        let mut current = Some(actor);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// 把演员追加为父节点的最后一个子节点
    pub fn add_child(&mut self, parent: ActorId, child: ActorId) -> Result<(), SceneError> {
        let index = self.actor(parent)?.children.len();
        self.insert_child_at_index(parent, child, index)
    }

    /// 在指定下标插入子节点
    ///
    /// 下标超出范围时追加到末尾。
    pub fn insert_child_at_index(
        &mut self,
        parent: ActorId,
        child: ActorId,
        index: usize,
    ) -> Result<(), SceneError> {
        self.actor(parent)?;
        if let Some(current) = self.actor(child)?.parent {
            return Err(SceneError::AlreadyParented {
                child,
                parent: current,
            });
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(SceneError::Cycle(child));
        }

        let children = &mut self.actor_mut(parent)?.children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.actor_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// 从父节点移除子节点
    ///
    /// 若键盘焦点位于被移除的子树内，焦点被清除。
    pub fn remove_child(&mut self, parent: ActorId, child: ActorId) -> Result<(), SceneError> {
        let children = &mut self.actor_mut(parent)?.children;
        let Some(pos) = children.iter().position(|c| *c == child) else {
            return Err(SceneError::NotAChild { parent, child });
        };
        children.remove(pos);
        self.actor_mut(child)?.parent = None;

        if let Some(focus) = self.key_focus
            && self.is_ancestor_or_self(child, focus)
        {
            debug!(?focus, "焦点演员离开舞台，清除键盘焦点");
            self.key_focus = None;
        }
        Ok(())
    }

    pub fn set_reactive(&mut self, actor: ActorId, reactive: bool) -> Result<(), SceneError> {
        self.actor_mut(actor)?.reactive = reactive;
        Ok(())
    }

    pub fn is_reactive(&self, actor: ActorId) -> bool {
        self.actors.get(&actor).is_some_and(|a| a.reactive)
    }

    /// 设置横向/纵向扩展（填满父节点）
    pub fn set_expand(&mut self, actor: ActorId, x: bool, y: bool) -> Result<(), SceneError> {
        let a = self.actor_mut(actor)?;
        a.x_expand = x;
        a.y_expand = y;
        Ok(())
    }

    pub fn expand(&self, actor: ActorId) -> (bool, bool) {
        self.actors
            .get(&actor)
            .map(|a| (a.x_expand, a.y_expand))
            .unwrap_or((false, false))
    }

    pub fn set_actor_size(
        &mut self,
        actor: ActorId,
        width: f32,
        height: f32,
    ) -> Result<(), SceneError> {
        self.actor_mut(actor)?.size = Some((width, height));
        Ok(())
    }

    pub fn actor_size(&self, actor: ActorId) -> Option<(f32, f32)> {
        self.actors.get(&actor).and_then(|a| a.size)
    }

    pub fn set_style_class(
        &mut self,
        actor: ActorId,
        class: impl Into<String>,
    ) -> Result<(), SceneError> {
        self.actor_mut(actor)?.style_class = Some(class.into());
        Ok(())
    }

    pub fn style_class(&self, actor: ActorId) -> Option<&str> {
        self.actors.get(&actor).and_then(|a| a.style_class.as_deref())
    }

    pub fn set_label(&mut self, actor: ActorId, label: impl Into<String>) -> Result<(), SceneError> {
        self.actor_mut(actor)?.label = Some(label.into());
        Ok(())
    }

    pub fn label(&self, actor: ActorId) -> Option<&str> {
        self.actors.get(&actor).and_then(|a| a.label.as_deref())
    }

    /// 设置演员显示的图片
    pub fn set_image(&mut self, actor: ActorId, path: impl Into<PathBuf>) -> Result<(), SceneError> {
        self.actor_mut(actor)?.image = Some(path.into());
        Ok(())
    }

    pub fn image(&self, actor: ActorId) -> Option<&Path> {
        self.actors.get(&actor).and_then(|a| a.image.as_deref())
    }

    // ===== 键盘焦点 =====

    pub fn key_focus(&self) -> Option<ActorId> {
        self.key_focus
    }

    pub fn set_key_focus(&mut self, actor: Option<ActorId>) -> Result<(), SceneError> {
        if self.destroyed {
            return Err(SceneError::StageDestroyed);
        }
        if let Some(id) = actor {
            self.actor(id)?;
        }
        self.key_focus = actor;
        Ok(())
    }

    // ===== 信号 =====

    /// 连接信号处理器
    pub fn connect(
        &mut self,
        actor: ActorId,
        signal: impl Into<String>,
    ) -> Result<HandlerId, SceneError> {
        let handler = HandlerId(self.next_handler);
        self.next_handler += 1;
        self.actor_mut(actor)?.handlers.push((handler, signal.into()));
        Ok(handler)
    }

    /// 断开信号处理器
    pub fn disconnect(&mut self, actor: ActorId, handler: HandlerId) -> Result<(), SceneError> {
        let handlers = &mut self.actor_mut(actor)?.handlers;
        let Some(pos) = handlers.iter().position(|(h, _)| *h == handler) else {
            return Err(SceneError::UnknownHandler { actor, handler });
        };
        handlers.remove(pos);
        Ok(())
    }

    /// 演员上某个信号已连接的处理器（按连接顺序）
    pub fn handlers(&self, actor: ActorId, signal: &str) -> Vec<HandlerId> {
        self.actors
            .get(&actor)
            .map(|a| {
                a.handlers
                    .iter()
                    .filter(|(_, s)| s == signal)
                    .map(|(h, _)| *h)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 以代码方式发射信号，返回应被调用的处理器
    pub fn emit(&self, actor: ActorId, signal: &str) -> Vec<HandlerId> {
        self.handlers(actor, signal)
    }

    /// 当前生效的输入捕获层：舞台根上最靠上的那个
    pub fn input_grab(&self) -> Option<ActorId> {
        self.children(self.root)
            .iter()
            .rev()
            .copied()
            .find(|id| self.actors.get(id).is_some_and(|a| a.captures_input))
    }

    /// 投递来自输入设备的信号
    ///
    /// 与 `emit` 不同，不可响应的演员以及被捕获层遮住的演员收不到输入信号。
    pub fn deliver_input(&self, actor: ActorId, signal: &str) -> Vec<HandlerId> {
        if self.destroyed || !self.is_reactive(actor) {
            return Vec::new();
        }
        if let Some(grab) = self.input_grab()
            && !self.is_ancestor_or_self(grab, actor)
        {
            debug!(?actor, ?grab, signal, "输入被捕获层遮挡");
            return Vec::new();
        }
        self.handlers(actor, signal)
    }

    // ===== 窗口属性 =====

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_position(&mut self, x: f32, y: f32) {
        self.position = (x, y);
    }

    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn set_size(&mut self, width: f32, height: f32) {
        self.size = (width, height);
    }

    pub fn size(&self) -> (f32, f32) {
        self.size
    }

    pub fn set_user_resizable(&mut self, resizable: bool) {
        self.user_resizable = resizable;
    }

    pub fn is_user_resizable(&self) -> bool {
        self.user_resizable
    }

    pub fn set_fullscreen(&mut self, fullscreen: bool) {
        self.fullscreen = fullscreen;
    }

    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    pub fn show_all(&mut self) {
        self.visible = true;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    // ===== 销毁 =====

    /// 注册销毁回调
    pub fn connect_destroy(&mut self, callback: impl FnMut() + 'static) {
        self.destroy_callbacks.push(Box::new(callback));
    }

    /// 销毁舞台
    ///
    /// 回调只会执行一次，重复销毁不产生任何效果。
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.visible = false;
        debug!(title = %self.title, "舞台已销毁");
        for mut callback in std::mem::take(&mut self.destroy_callbacks) {
            callback();
        }
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

/// 能够提供舞台的上下文
///
/// 主循环回调通过它访问场景图。
pub trait StageAccess {
    fn stage_mut(&mut self) -> &mut Stage;
}

impl StageAccess for Stage {
    fn stage_mut(&mut self) -> &mut Stage {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[test]
    fn test_insert_and_index() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.create_actor("a");
        let b = stage.create_actor("b");
        let c = stage.create_actor("c");

        stage.add_child(root, a).unwrap();
        stage.add_child(root, c).unwrap();
        stage.insert_child_at_index(root, b, 1).unwrap();

        assert_eq!(stage.children(root), &[a, b, c]);
        assert_eq!(stage.index_of(b), Some(1));
        assert_eq!(stage.parent(c), Some(root));
    }

    #[test]
    fn test_find_by_name() {
        let mut stage = Stage::new();
        let first = stage.create_actor("button");
        stage.create_actor("button");
        assert_eq!(stage.find("button"), Some(first));
        assert_eq!(stage.find("stage"), Some(stage.root()));
        assert_eq!(stage.find("missing"), None);
    }

    #[test]
    fn test_insert_index_clamped() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.create_actor("a");
        stage.insert_child_at_index(root, a, 42).unwrap();
        assert_eq!(stage.index_of(a), Some(0));
    }

    #[test]
    fn test_reparent_requires_detach() {
        let mut stage = Stage::new();
        let root = stage.root();
        let box_ = stage.create_actor("box");
        let a = stage.create_actor("a");
        stage.add_child(root, box_).unwrap();
        stage.add_child(box_, a).unwrap();

        assert_eq!(
            stage.add_child(root, a),
            Err(SceneError::AlreadyParented {
                child: a,
                parent: box_
            })
        );

        stage.remove_child(box_, a).unwrap();
        stage.add_child(root, a).unwrap();
        assert_eq!(stage.parent(a), Some(root));
    }

    #[test]
    fn test_cycle_rejected() {
        let mut stage = Stage::new();
        let outer = stage.create_actor("outer");
        let inner = stage.create_actor("inner");
        stage.add_child(outer, inner).unwrap();
        assert_eq!(stage.add_child(inner, outer), Err(SceneError::Cycle(outer)));
    }

    #[test]
    fn test_remove_non_child() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.create_actor("a");
        assert_eq!(
            stage.remove_child(root, a),
            Err(SceneError::NotAChild {
                parent: root,
                child: a
            })
        );
    }

    #[test]
    fn test_removing_focused_subtree_clears_focus() {
        let mut stage = Stage::new();
        let root = stage.root();
        let panel = stage.create_actor("panel");
        let button = stage.create_actor("button");
        stage.add_child(root, panel).unwrap();
        stage.add_child(panel, button).unwrap();
        stage.set_key_focus(Some(button)).unwrap();

        stage.remove_child(root, panel).unwrap();
        assert_eq!(stage.key_focus(), None);
    }

    #[test]
    fn test_signals() {
        let mut stage = Stage::new();
        let button = stage.create_actor("button");
        let h1 = stage.connect(button, "clicked").unwrap();
        let h2 = stage.connect(button, "clicked").unwrap();
        stage.connect(button, "activate").unwrap();

        assert_eq!(stage.emit(button, "clicked"), vec![h1, h2]);
        // 不可响应时收不到输入信号
        assert!(stage.deliver_input(button, "clicked").is_empty());
        stage.set_reactive(button, true).unwrap();
        assert_eq!(stage.deliver_input(button, "clicked"), vec![h1, h2]);

        stage.disconnect(button, h1).unwrap();
        assert_eq!(stage.emit(button, "clicked"), vec![h2]);
        assert!(stage.disconnect(button, h1).is_err());
    }

    #[test]
    fn test_capture_layer_blocks_input_below() {
        let mut stage = Stage::new();
        let root = stage.root();
        let button = stage.create_actor("button");
        stage.add_child(root, button).unwrap();
        stage.set_reactive(button, true).unwrap();
        let clicked = stage.connect(button, "clicked").unwrap();

        let layer = stage.create_capture_layer("layer");
        let exit = stage.create_actor("exit");
        stage.add_child(layer, exit).unwrap();
        stage.set_reactive(exit, true).unwrap();
        let exit_clicked = stage.connect(exit, "clicked").unwrap();

        // 未挂到舞台上的捕获层不生效
        assert_eq!(stage.input_grab(), None);
        assert_eq!(stage.deliver_input(button, "clicked"), vec![clicked]);

        stage.add_child(root, layer).unwrap();
        assert_eq!(stage.input_grab(), Some(layer));
        assert!(stage.deliver_input(button, "clicked").is_empty());
        assert_eq!(stage.deliver_input(exit, "clicked"), vec![exit_clicked]);
        // 代码发射不受捕获层影响
        assert_eq!(stage.emit(button, "clicked"), vec![clicked]);

        stage.remove_child(root, layer).unwrap();
        assert_eq!(stage.deliver_input(button, "clicked"), vec![clicked]);
    }

    #[test]
    fn test_destroyed_stage_rejects_mutation() {
        let mut stage = Stage::new();
        let root = stage.root();
        let a = stage.create_actor("a");
        stage.add_child(root, a).unwrap();
        stage.set_reactive(a, true).unwrap();
        stage.connect(a, "clicked").unwrap();
        stage.destroy();

        let b = stage.create_actor("b");
        assert_eq!(stage.add_child(root, b), Err(SceneError::StageDestroyed));
        assert_eq!(stage.remove_child(root, a), Err(SceneError::StageDestroyed));
        assert_eq!(stage.set_label(a, "x"), Err(SceneError::StageDestroyed));
        assert_eq!(stage.set_key_focus(Some(a)), Err(SceneError::StageDestroyed));
        assert!(stage.deliver_input(a, "clicked").is_empty());
        assert_eq!(stage.parent(a), Some(root));
    }

    #[test]
    fn test_destroy_runs_callbacks_once() {
        let mut stage = Stage::new();
        let count = Rc::new(Cell::new(0));
        let counter = count.clone();
        stage.connect_destroy(move || counter.set(counter.get() + 1));

        stage.destroy();
        stage.destroy();
        assert_eq!(count.get(), 1);
        assert!(stage.is_destroyed());
    }
}
