//! Animated water rendered with a projected grid, on OpenGL.
//!
//! Instead of tessellating the ocean in world space, a fixed-size grid is laid out in the screen
//! space of an auxiliary "projector" camera and cast onto the water plane every frame. Vertices
//! end up dense near the viewer and sparse at the horizon, and the mesh never extends past what
//! the camera can see.
//!
//! The quickest way in:
//!
//! ```no_run
//! let (mut event_loop, mut water) = mini_gl_water::gotta_go_fast("Hello water!", 800.0, 600.0)
//!     .unwrap();
//! water.persist(&mut event_loop).unwrap();
//! ```
//!
//! `persist` flies the camera with WASD and the mouse until Escape is pressed. Use [`get_fancy`]
//! to tune the window and the water, and [`MiniGlWater::glutin_breakout`] to run your own loop.
//!
//! The geometry pipeline does not need a window at all. [`WaterSurface::build_frame`] turns a
//! camera into a [`WaterMesh`] you can feed to any renderer:
//!
//! ```
//! use mini_gl_water::{Camera, FrameContext, WaterConfig, WaterSurface};
//!
//! let config = WaterConfig { grid_size: 16, ..Default::default() };
//! let lens = config.lens();
//! let mut surface = WaterSurface::new(config).unwrap();
//!
//! let frame = FrameContext::from_camera(&Camera::default(), &lens, 4.0 / 3.0);
//! let mesh = surface.build_frame(&frame).unwrap().expect("the default camera sees the sea");
//! assert_eq!(mesh.vertex_count(), 16 * 16);
//! ```

#[macro_use]
extern crate rustic_gl;
#[macro_use]
extern crate derive_builder;

/// The `glutin` version this crate is built against, so you can construct event loops and match
/// events without adding your own dependency.
pub use glutin;

pub mod breakout;
pub mod camera;
pub mod config;
pub mod core;
pub mod error;
pub mod frustum;
pub mod geometry;
pub mod grid;
pub mod heightfield;
pub mod projector;
pub mod surface;

pub use crate::breakout::{BasicInput, GlutinBreakout};
pub use crate::camera::{Camera, CameraMovement, Lens};
pub use crate::config::{WaterConfig, WaterConfigBuilder, WindowConfig, WindowConfigBuilder};
pub use crate::core::SurfaceRenderer;
pub use crate::error::{RenderError, RenderResult, WaterError, WaterResult};
pub use crate::geometry::Plane;
pub use crate::grid::WaterMesh;
pub use crate::surface::{FrameContext, WaterSurface};

use crate::core::Internal;

use glutin::event_loop::EventLoop;

/// Creates a water window with default water settings and its own event loop.
pub fn gotta_go_fast<S: ToString>(
    window_title: S,
    window_width: f64,
    window_height: f64,
) -> RenderResult<(EventLoop<()>, MiniGlWater)> {
    let event_loop = EventLoop::new();
    let config = WindowConfig {
        window_title: window_title.to_string(),
        window_size: (window_width, window_height),
        ..Default::default()
    };
    let water = get_fancy(config, WaterConfig::default(), &event_loop)?;
    Ok((event_loop, water))
}

/// Creates a window and water surface from explicit configs, on your event loop.
///
/// The water config is validated before any window is opened.
pub fn get_fancy<ET: 'static>(
    window: WindowConfig,
    water: WaterConfig,
    event_loop: &EventLoop<ET>,
) -> RenderResult<MiniGlWater> {
    let surface = WaterSurface::new(water)?;
    let context = crate::core::init_glutin_context(&window, event_loop)?;
    let size = context.window().inner_size();
    let renderer = crate::core::init_surface_renderer(size.width, size.height)?;

    Ok(MiniGlWater {
        internal: Internal::new(context, renderer, surface, window),
    })
}

/// Main wrapper for a water window.
///
/// The methods here cover the usual single-window program. For anything else,
/// [`glutin_breakout`][MiniGlWater::glutin_breakout] hands you the parts.
pub struct MiniGlWater {
    pub internal: Internal,
}

impl MiniGlWater {
    /// Runs the built-in fly-through until the window is closed or Escape is pressed.
    ///
    /// WASD or the arrow keys move, the mouse looks around.
    pub fn persist<ET: 'static>(&mut self, event_loop: &mut EventLoop<ET>) -> RenderResult<()> {
        self.internal.persist(event_loop)
    }

    /// Calls `handler` once per frame interval with the input gathered since the last call.
    ///
    /// Return `Ok(false)` to stop. Call [`Internal::render_frame`] from the handler to draw; the
    /// camera is yours to move.
    ///
    /// ```no_run
    /// use mini_gl_water::glutin::event::VirtualKeyCode;
    ///
    /// let (mut event_loop, mut water) = mini_gl_water::gotta_go_fast("Orbit", 600.0, 600.0).unwrap();
    /// let mut angle = 0.0f32;
    /// water.glutin_handle_basic_input(&mut event_loop, |internal, input| {
    ///     angle += 0.01;
    ///     internal.camera.forward = mini_gl_water::camera::direction_from_angles(angle, -0.2);
    ///     internal.render_frame()?;
    ///     Ok(!input.key_pressed(VirtualKeyCode::Escape))
    /// }).unwrap();
    /// ```
    pub fn glutin_handle_basic_input<ET: 'static, F>(
        &mut self,
        event_loop: &mut EventLoop<ET>,
        handler: F,
    ) -> RenderResult<()>
    where
        F: FnMut(&mut Internal, &BasicInput) -> RenderResult<bool>,
    {
        self.internal.glutin_handle_basic_input(event_loop, handler)
    }

    /// Builds, draws and presents one frame for the current camera.
    pub fn render_frame(&mut self) -> RenderResult<()> {
        self.internal.render_frame()
    }

    pub fn camera(&self) -> &Camera {
        &self.internal.camera
    }

    pub fn camera_mut(&mut self) -> &mut Camera {
        &mut self.internal.camera
    }

    pub fn surface(&self) -> &WaterSurface {
        &self.internal.surface
    }

    /// Replaces the water fragment shader.
    ///
    /// The shader receives `in vec3 v_world`, `in vec3 v_normal` and `in vec2 v_uv`, may read
    /// `uniform vec3 u_camera_position`, and writes `out vec4 r_frag_color`. On a compile or
    /// link error the previous shader stays in use.
    pub fn use_fragment_shader(&mut self, source: &str) -> RenderResult<()> {
        self.internal.renderer.use_fragment_shader(source)
    }

    /// Replaces the water vertex shader. Attributes 0, 1 and 2 are position, normal and texture
    /// coordinate; `uniform mat4 u_view_projection` is set every frame.
    pub fn use_vertex_shader(&mut self, source: &str) -> RenderResult<()> {
        self.internal.renderer.use_vertex_shader(source)
    }

    /// Colour behind the water.
    pub fn set_clear_color(&mut self, color: [f32; 4]) {
        self.internal.renderer.clear_color = color;
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.internal.set_resizable(resizable)
    }

    /// Gives up the high-level API and returns the context, renderer, surface and camera.
    pub fn glutin_breakout(self) -> GlutinBreakout {
        self.internal.glutin_breakout()
    }
}
