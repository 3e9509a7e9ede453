pub mod display_config;
pub mod headless;
pub mod resources;
pub mod scene;
#[cfg(feature = "render-winit")]
pub mod window;

pub use display_config::{
    ConfigPrompt, DisplayConfig, DisplayConfigStore, ScriptedPrompt, TerminalPrompt,
};
pub use headless::{HeadlessBackend, HeadlessEvents, HeadlessJournal, RootCall};
pub use resources::{RenderServices, ResourceError, ResourceGroupRegistry, TextureManager};
pub use scene::SceneGraph;
#[cfg(feature = "render-winit")]
pub use window::WinitBackend;

use crate::config::PluginManifest;
use crate::input::KeyCode;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Colour {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Colour {
    pub const BLACK: Colour = Colour::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Colour = Colour::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn grey(level: f32) -> Self {
        Self::rgb(level, level, level)
    }
}

impl Default for Colour {
    fn default() -> Self {
        Colour::BLACK
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTransform {
    pub position: [f32; 3],
    pub orientation: [f32; 4],
    pub scale: [f32; 3],
}

impl Default for NodeTransform {
    fn default() -> Self {
        Self {
            position: [0.0; 3],
            orientation: [1.0, 0.0, 0.0, 0.0],
            scale: [1.0; 3],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSettings {
    pub fov_y_degrees: f32,
    pub near_clip: f32,
    pub far_clip: f32,
    pub aspect_ratio: Option<f32>,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near_clip: 5.0,
            far_clip: 10_000.0,
            aspect_ratio: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Directional,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSettings {
    pub kind: LightKind,
    pub diffuse: Colour,
    pub specular: Colour,
    pub range: f32,
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            diffuse: Colour::WHITE,
            specular: Colour::WHITE,
            range: 100_000.0,
        }
    }
}

/// Renderable object attached by name to a scene node.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Camera(CameraSettings),
    Light(LightSettings),
    Mesh { mesh: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkyPlane {
    pub material: String,
    pub distance: f32,
    pub scale: f32,
    pub tiling: f32,
}

impl Default for SkyPlane {
    fn default() -> Self {
        Self {
            material: "background/blue".to_string(),
            distance: 1000.0,
            scale: 1.0,
            tiling: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Viewport {
    pub z_order: i32,
    pub camera: String,
    pub background: Colour,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WindowEvent {
    CloseRequested(WindowId),
    Resized {
        window: WindowId,
        width: u32,
        height: u32,
    },
    FocusChanged {
        window: WindowId,
        focused: bool,
    },
    Key {
        window: WindowId,
        key: KeyCode,
        pressed: bool,
    },
}

impl WindowEvent {
    pub fn window(&self) -> WindowId {
        match self {
            WindowEvent::CloseRequested(window) => *window,
            WindowEvent::Resized { window, .. }
            | WindowEvent::FocusChanged { window, .. }
            | WindowEvent::Key { window, .. } => *window,
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no render system selected; restore or choose a display configuration first")]
    NoRenderSystem,
    #[error("display root has been released")]
    Released,
    #[error("window creation failed: {0}")]
    WindowCreation(String),
    #[error("unknown scene manager type `{0}`")]
    UnknownSceneManager(String),
    #[error("scene node {0:?} does not exist")]
    NoSuchNode(NodeId),
    #[error("the scene root node cannot be destroyed")]
    RootNode,
    #[error("window {0:?} has been destroyed")]
    WindowDestroyed(WindowId),
    #[error("display configuration error: {0}")]
    DisplayConfig(String),
    #[error("backend failure: {0}")]
    Backend(String),
}

pub type RenderResult<T> = Result<T, RenderError>;

pub trait RenderWindow {
    fn id(&self) -> WindowId;
    fn title(&self) -> &str;
    fn size(&self) -> (u32, u32);
    /// Platform window handle, the value published under the `WINDOW` attribute.
    fn native_handle(&self) -> Option<usize>;
    /// Adds a viewport at `z_order`, replacing the one already there.
    fn add_viewport(&mut self, viewport: Viewport) -> RenderResult<()>;
    fn remove_viewport(&mut self, z_order: i32) -> bool;
    fn viewports(&self) -> Vec<Viewport>;
    fn is_closed(&self) -> bool;
    fn destroy(&mut self);
}

pub trait SceneManager {
    fn kind(&self) -> &str;
    fn ambient_light(&self) -> Colour;
    fn set_ambient_light(&mut self, colour: Colour);
    fn root_node(&self) -> NodeId;
    fn create_child_node(&mut self, parent: NodeId) -> RenderResult<NodeId>;
    /// Destroys the node, its descendants and every object attached to them.
    fn destroy_node(&mut self, node: NodeId) -> RenderResult<()>;
    fn set_transform(&mut self, node: NodeId, transform: NodeTransform) -> RenderResult<()>;
    fn transform(&self, node: NodeId) -> Option<NodeTransform>;
    /// Attaches `object` under `name`, replacing any object already using the name.
    fn attach_object(&mut self, name: &str, node: NodeId, object: SceneObject)
    -> RenderResult<()>;
    fn detach_object(&mut self, name: &str) -> Option<SceneObject>;
    fn object(&self, name: &str) -> Option<&SceneObject>;
    fn set_sky_plane(&mut self, sky: Option<SkyPlane>);
    fn sky_plane(&self) -> Option<&SkyPlane>;
    fn node_count(&self) -> usize;
    fn clear(&mut self);
}

pub trait DisplayRoot {
    fn label(&self) -> &'static str;
    /// Loads a previously saved display configuration.
    fn restore_config(&mut self) -> bool;
    /// Asks the user for a display configuration. `false` means they declined.
    fn show_config_dialog(&mut self) -> bool;
    fn initialise(&mut self, title: &str) -> RenderResult<SharedWindow>;
    fn create_scene_manager(&mut self, kind: &str) -> RenderResult<SharedScene>;
    /// Drains pending platform events without blocking.
    fn pump_messages(&mut self) -> Vec<WindowEvent>;
    fn render_one_frame(&mut self) -> RenderResult<()>;
    /// Tears down every scene manager and window created by this root.
    fn release(&mut self);
}

pub trait DisplayBackend {
    fn label(&self) -> &'static str;
    fn create_root(&mut self, plugins: &PluginManifest) -> RenderResult<Box<dyn DisplayRoot>>;
}

pub type SharedRoot = Rc<RefCell<Box<dyn DisplayRoot>>>;
pub type SharedWindow = Rc<RefCell<dyn RenderWindow>>;
pub type SharedScene = Rc<RefCell<dyn SceneManager>>;

pub type WeakRoot = Weak<RefCell<Box<dyn DisplayRoot>>>;
pub type WeakWindow = Weak<RefCell<dyn RenderWindow>>;
pub type WeakScene = Weak<RefCell<dyn SceneManager>>;
