use crate::breakout::{BasicInput, GlutinBreakout};
use crate::camera::Camera;
use crate::config::WindowConfig;
use crate::error::{RenderError, RenderResult};
use crate::grid::WaterMesh;
use crate::surface::{FrameContext, WaterSurface};

use glutin::dpi::{LogicalSize, PhysicalSize};
use glutin::event::{DeviceEvent, ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use glutin::event_loop::{ControlFlow, EventLoop};
use glutin::platform::run_return::EventLoopExtRunReturn;
use glutin::window::WindowBuilder;
use glutin::{Api, ContextBuilder, GlProfile, GlRequest, PossiblyCurrent, WindowedContext};

use gl::types::*;

use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use std::ptr::null;
use std::time::Instant;

/// Create a context using glutin given a configuration.
///
/// Asks for an OpenGL 3.3 core context with a depth buffer, makes it current and loads the GL
/// function pointers.
pub fn init_glutin_context<ET: 'static>(
    config: &WindowConfig,
    event_loop: &EventLoop<ET>,
) -> RenderResult<WindowedContext<PossiblyCurrent>> {
    let window_size = LogicalSize::new(config.window_size.0, config.window_size.1);

    let window = WindowBuilder::new()
        .with_title(config.window_title.clone())
        .with_inner_size(window_size)
        .with_resizable(config.resizable);

    let context = ContextBuilder::new()
        .with_gl(GlRequest::Specific(Api::OpenGl, (3, 3)))
        .with_gl_profile(GlProfile::Core)
        .with_depth_buffer(24)
        .with_vsync(config.vsync)
        .build_windowed(window, event_loop)?;

    let context = unsafe { context.make_current().map_err(|(_, err)| err)? };
    gl::load_with(|symbol| context.get_proc_address(symbol) as *const _);

    let size = context.window().inner_size();
    log::info!(
        "created OpenGL context for {:?} ({}x{} physical)",
        config.window_title,
        size.width,
        size.height
    );

    Ok(context)
}

/// One interleaved vertex as the water shaders read it.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Pod, Zeroable)]
pub struct WaterVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

type VertexFormat = buffer_layout!([f32; 3], [f32; 3], [f32; 2]);

/// Packs the separate attribute arrays of `mesh` into one vertex buffer.
pub fn interleave(mesh: &WaterMesh) -> Vec<WaterVertex> {
    mesh.positions
        .iter()
        .zip(&mesh.normals)
        .zip(&mesh.tex_coords)
        .map(|((&position, &normal), &uv)| WaterVertex {
            position,
            normal,
            uv,
        })
        .collect()
}

/// Create the OpenGL resources needed for drawing the water surface.
pub fn init_surface_renderer(viewport_width: u32, viewport_height: u32) -> RenderResult<SurfaceRenderer> {
    let vp_width = viewport_width as i32;
    let vp_height = viewport_height as i32;

    let mut vertex_shader = None;
    rebuild_shader(
        &mut vertex_shader,
        gl::VERTEX_SHADER,
        include_str!("./water_vertex_shader.glsl"),
    )?;
    let mut fragment_shader = None;
    rebuild_shader(
        &mut fragment_shader,
        gl::FRAGMENT_SHADER,
        include_str!("./water_fragment_shader.glsl"),
    )?;

    let program = unsafe { build_program(&[vertex_shader, fragment_shader])? };

    let vao = rustic_gl::raw::create_vao().map_err(|_| RenderError::Resource("vertex array"))?;
    let vbo = rustic_gl::raw::create_buffer().map_err(|_| RenderError::Resource("vertex buffer"))?;
    let ebo = rustic_gl::raw::create_buffer().map_err(|_| RenderError::Resource("index buffer"))?;

    unsafe {
        gl::BindVertexArray(vao);
        gl::BindBuffer(gl::ARRAY_BUFFER, vbo);
        VertexFormat::declare(0);
        // the element buffer binding is part of the vertex array state
        gl::BindBuffer(gl::ELEMENT_ARRAY_BUFFER, ebo);
        gl::BindVertexArray(0);
        gl::BindBuffer(gl::ARRAY_BUFFER, 0);
    }

    let mut renderer = SurfaceRenderer {
        vp_width,
        vp_height,
        program,
        view_projection_location: -1,
        camera_position_location: -1,
        vertex_shader,
        fragment_shader,
        vao,
        vbo,
        ebo,
        index_count: 0,
        clear_color: [0.55, 0.72, 0.88, 1.0],
        did_draw: false,
    };
    renderer.locate_uniforms();

    Ok(renderer)
}

/// Hides away the guts of the library.
///
/// When `MiniGlWater` wraps a method from `Internal`, the documentation is provided there.
pub struct Internal {
    pub context: WindowedContext<PossiblyCurrent>,
    pub renderer: SurfaceRenderer,
    pub surface: WaterSurface,
    pub camera: Camera,
    pub config: WindowConfig,
}

impl Internal {
    pub fn new(
        context: WindowedContext<PossiblyCurrent>,
        renderer: SurfaceRenderer,
        surface: WaterSurface,
        config: WindowConfig,
    ) -> Self {
        Internal {
            context,
            renderer,
            surface,
            camera: Camera::default(),
            config,
        }
    }

    pub fn set_resizable(&mut self, resizable: bool) {
        self.context.window().set_resizable(resizable);
    }

    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.context.resize(PhysicalSize::new(width, height));
        self.renderer.resize_viewport(width, height);
    }

    /// Hides the cursor and keeps it inside the window, or releases it again.
    pub fn grab_cursor(&mut self, grab: bool) {
        let window = self.context.window();
        if let Err(err) = window.set_cursor_grab(grab) {
            log::warn!("could not change cursor grab: {}", err);
        }
        window.set_cursor_visible(!grab);
    }

    /// Camera state the surface is built from this frame.
    pub fn frame_context(&self) -> FrameContext {
        FrameContext::from_camera(&self.camera, &self.surface.config().lens(), self.renderer.aspect())
    }

    /// Rebuilds the water mesh for the current camera, draws it and swaps buffers.
    ///
    /// A frame in which the surface cannot be built is drawn without water.
    pub fn render_frame(&mut self) -> RenderResult<()> {
        if self.renderer.vp_width <= 0 || self.renderer.vp_height <= 0 {
            return Ok(());
        }

        let frame = self.frame_context();
        match self.surface.build_frame(&frame) {
            Ok(Some(mesh)) => self.renderer.upload_mesh(&mesh),
            Ok(None) => self.renderer.clear_mesh(),
            Err(err) => {
                log::warn!("skipping water surface for this frame: {}", err);
                self.renderer.clear_mesh();
            }
        }

        self.renderer.draw(&frame.view_projection, frame.camera_position);
        self.swap_buffers()
    }

    fn swap_buffers(&mut self) -> RenderResult<()> {
        if self.renderer.did_draw {
            self.context.swap_buffers()?;
            self.renderer.did_draw = false;
        }
        Ok(())
    }

    /// Flies the camera with WASD (or the arrow keys) and the mouse, and redraws every
    /// `frame_interval` until the window is closed or Escape is pressed.
    pub fn persist<ET: 'static>(&mut self, event_loop: &mut EventLoop<ET>) -> RenderResult<()> {
        self.glutin_handle_basic_input(event_loop, |internal, input| {
            if input.key_is_down(VirtualKeyCode::Escape) {
                return Ok(false);
            }

            internal.camera.apply_movement(input.camera_movement());

            let width = internal.renderer.vp_width as f32;
            let height = internal.renderer.vp_height as f32;
            if width > 0.0 && height > 0.0 {
                if internal.config.grab_cursor {
                    let (dx, dy) = input.mouse_delta;
                    if dx != 0.0 || dy != 0.0 {
                        internal.camera.on_mouse_motion(dx as f32, dy as f32, width, height);
                    }
                } else if input.mouse_moved {
                    let (x, y) = input.mouse_pos;
                    internal.camera.on_cursor_moved(x as f32, y as f32, width, height);
                }
            }

            internal.render_frame()?;
            Ok(true)
        })
    }

    /// Runs `handler` once per `frame_interval` with the input gathered since the previous
    /// call, until it returns `Ok(false)`, fails, or the window is closed.
    pub fn glutin_handle_basic_input<ET: 'static, F>(
        &mut self,
        event_loop: &mut EventLoop<ET>,
        mut handler: F,
    ) -> RenderResult<()>
    where
        F: FnMut(&mut Internal, &BasicInput) -> RenderResult<bool>,
    {
        let mut input = BasicInput::default();
        let mut outcome = Ok(());
        let mut next_frame = Instant::now();
        let window_id = self.context.window().id();

        if self.config.grab_cursor {
            self.grab_cursor(true);
        }

        event_loop.run_return(|event, _, flow| {
            match event {
                Event::WindowEvent { window_id: id, event } if id == window_id => match event {
                    WindowEvent::CloseRequested => *flow = ControlFlow::Exit,
                    WindowEvent::KeyboardInput {
                        input: KeyboardInput {
                            virtual_keycode: Some(vk),
                            state,
                            ..
                        },
                        ..
                    } => {
                        let key = input.keys.entry(vk).or_insert((false, false));
                        key.1 = state == ElementState::Pressed;
                    }
                    WindowEvent::CursorMoved { position, .. } => {
                        input.mouse_pos = (position.x, position.y);
                        input.mouse_moved = true;
                    }
                    WindowEvent::MouseInput { state, button, .. } => {
                        let button = input.mouse.entry(button).or_insert((false, false));
                        button.1 = state == ElementState::Pressed;
                    }
                    WindowEvent::Focused(focused) => {
                        input.focused = focused;
                    }
                    WindowEvent::Resized(size) => {
                        self.resize_viewport(size.width, size.height);
                        input.resized = true;
                    }
                    _ => {}
                },
                Event::DeviceEvent {
                    event: DeviceEvent::MouseMotion { delta },
                    ..
                } if input.focused => {
                    input.mouse_delta.0 += delta.0;
                    input.mouse_delta.1 += delta.1;
                }
                Event::MainEventsCleared => {
                    let now = Instant::now();
                    if *flow != ControlFlow::Exit && now >= next_frame {
                        match handler(self, &input) {
                            Ok(true) => {}
                            Ok(false) => *flow = ControlFlow::Exit,
                            Err(err) => {
                                outcome = Err(err);
                                *flow = ControlFlow::Exit;
                            }
                        }
                        input.end_frame();
                        next_frame = now + self.config.frame_interval;
                    }
                    if *flow != ControlFlow::Exit {
                        *flow = ControlFlow::WaitUntil(next_frame);
                    }
                }
                _ => {}
            }
        });

        if self.config.grab_cursor {
            self.grab_cursor(false);
        }

        outcome
    }

    pub fn glutin_breakout(self) -> GlutinBreakout {
        GlutinBreakout {
            context: self.context,
            renderer: self.renderer,
            surface: self.surface,
            camera: self.camera,
        }
    }
}

/// Owns the GPU side of the water surface: the shader program and the streamed mesh buffers.
///
/// The fields are public so you can dig in if you need something the methods do not expose.
/// They may change.
#[derive(Debug)]
pub struct SurfaceRenderer {
    pub vp_width: i32,
    pub vp_height: i32,
    pub program: GLuint,
    pub view_projection_location: GLint,
    pub camera_position_location: GLint,
    pub vertex_shader: Option<GLuint>,
    pub fragment_shader: Option<GLuint>,
    pub vao: GLuint,
    pub vbo: GLuint,
    pub ebo: GLuint,
    /// Number of indices in the uploaded mesh. Zero means nothing is drawn.
    pub index_count: GLsizei,
    pub clear_color: [f32; 4],
    pub did_draw: bool,
}

impl SurfaceRenderer {
    /// Replaces the buffer contents with `mesh`.
    pub fn upload_mesh(&mut self, mesh: &WaterMesh) {
        let vertices = interleave(mesh);
        let vertex_bytes: &[u8] = bytemuck::cast_slice(&vertices);
        let index_bytes: &[u8] = bytemuck::cast_slice(&mesh.indices);

        unsafe {
            gl::BindVertexArray(self.vao);
            gl::BindBuffer(gl::ARRAY_BUFFER, self.vbo);
            gl::BufferData(
                gl::ARRAY_BUFFER,
                vertex_bytes.len() as GLsizeiptr,
                vertex_bytes.as_ptr() as *const _,
                gl::STREAM_DRAW,
            );
            gl::BufferData(
                gl::ELEMENT_ARRAY_BUFFER,
                index_bytes.len() as GLsizeiptr,
                index_bytes.as_ptr() as *const _,
                gl::STREAM_DRAW,
            );
            gl::BindVertexArray(0);
            gl::BindBuffer(gl::ARRAY_BUFFER, 0);
        }

        self.index_count = mesh.indices.len() as GLsizei;
        log::trace!(
            "uploaded water mesh: {} vertices, {} triangles",
            mesh.vertex_count(),
            mesh.triangle_count()
        );
    }

    /// Stops drawing the surface until the next upload.
    pub fn clear_mesh(&mut self) {
        self.index_count = 0;
    }

    /// Clears the frame and draws the uploaded mesh, if any.
    pub fn draw(&mut self, view_projection: &Mat4, camera_position: Vec3) {
        let [r, g, b, a] = self.clear_color;
        unsafe {
            gl::Viewport(0, 0, self.vp_width, self.vp_height);
            gl::ClearColor(r, g, b, a);
            gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT);

            if self.index_count > 0 {
                gl::Enable(gl::DEPTH_TEST);
                gl::UseProgram(self.program);
                gl::UniformMatrix4fv(
                    self.view_projection_location,
                    1,
                    gl::FALSE,
                    view_projection.to_cols_array().as_ptr(),
                );
                gl::Uniform3f(
                    self.camera_position_location,
                    camera_position.x,
                    camera_position.y,
                    camera_position.z,
                );
                gl::BindVertexArray(self.vao);
                gl::DrawElements(gl::TRIANGLES, self.index_count, gl::UNSIGNED_INT, null());
                gl::BindVertexArray(0);
                gl::UseProgram(0);
            }
        }
        self.did_draw = true;
    }

    /// Swaps in a new vertex shader. It must declare the same attributes and uniforms as the
    /// built-in one.
    pub fn use_vertex_shader(&mut self, source: &str) -> RenderResult<()> {
        rebuild_shader(&mut self.vertex_shader, gl::VERTEX_SHADER, source)?;
        self.relink_program()
    }

    /// Swaps in a new fragment shader. It receives `v_world`, `v_normal` and `v_uv`, and may
    /// use the `u_camera_position` uniform.
    pub fn use_fragment_shader(&mut self, source: &str) -> RenderResult<()> {
        rebuild_shader(&mut self.fragment_shader, gl::FRAGMENT_SHADER, source)?;
        self.relink_program()
    }

    pub fn resize_viewport(&mut self, width: u32, height: u32) {
        self.vp_width = width as _;
        self.vp_height = height as _;
    }

    /// Viewport width over height.
    pub fn aspect(&self) -> f32 {
        self.vp_width as f32 / self.vp_height.max(1) as f32
    }

    /// Links the current shaders into a new program. The old program is kept if linking fails.
    pub fn relink_program(&mut self) -> RenderResult<()> {
        let program = unsafe { build_program(&[self.vertex_shader, self.fragment_shader])? };
        unsafe {
            gl::DeleteProgram(self.program);
        }
        self.program = program;
        self.locate_uniforms();
        Ok(())
    }

    fn locate_uniforms(&mut self) {
        unsafe {
            self.view_projection_location =
                gl::GetUniformLocation(self.program, b"u_view_projection\0".as_ptr() as *const _);
            self.camera_position_location =
                gl::GetUniformLocation(self.program, b"u_camera_position\0".as_ptr() as *const _);
        }
        if self.view_projection_location < 0 {
            log::warn!("shader program has no u_view_projection uniform");
        }
    }
}

fn rebuild_shader(shader: &mut Option<GLuint>, kind: GLenum, source: &str) -> RenderResult<()> {
    let gl_id = match rustic_gl::raw::create_shader(kind, source) {
        Ok(gl_id) => gl_id,
        Err(rustic_gl::error::GlError::ShaderCompilation(info)) => {
            return Err(RenderError::ShaderCompilation(
                info.unwrap_or_else(|| "no information available".to_string()),
            ));
        }
        Err(err) => return Err(RenderError::ShaderCompilation(err.to_string())),
    };
    if let Some(old) = shader.replace(gl_id) {
        unsafe {
            gl::DeleteShader(old);
        }
    }
    Ok(())
}

unsafe fn build_program(shaders: &[Option<GLuint>]) -> RenderResult<GLuint> {
    let program = rustic_gl::raw::create_program()
        .map_err(|_| RenderError::Resource("shader program"))?;
    for shader in shaders.iter().flatten() {
        gl::AttachShader(program, *shader);
    }
    gl::LinkProgram(program);
    let status = rustic_gl::raw::get_link_status(program);
    for shader in shaders.iter().flatten() {
        gl::DetachShader(program, *shader);
    }
    if let Err(err) = status {
        gl::DeleteProgram(program);
        return Err(RenderError::ProgramLink(err.to_string()));
    }
    log::info!("linked water shader program {}", program);
    Ok(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interleave_keeps_attribute_order() {
        let mesh = WaterMesh {
            positions: vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]],
            normals: vec![[0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            tex_coords: vec![[0.1, 0.2], [0.3, 0.4]],
            indices: vec![],
        };
        let vertices = interleave(&mesh);
        assert_eq!(vertices.len(), 2);
        assert_eq!(
            vertices[1],
            WaterVertex {
                position: [4.0, 5.0, 6.0],
                normal: [0.0, 0.0, 1.0],
                uv: [0.3, 0.4],
            }
        );
    }

    #[test]
    fn test_vertex_is_tightly_packed() {
        assert_eq!(std::mem::size_of::<WaterVertex>(), 8 * 4);
        let vertices = [WaterVertex::zeroed(); 3];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 3 * 32);
    }
}
