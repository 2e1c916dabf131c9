//! Contains the [`GlutinBreakout`] struct, which is a way to "break out" the Glutin context and
//! the water pipeline and drive them from your own event loop.

use glutin::{ContextError, PossiblyCurrent, WindowedContext};

use crate::camera::{Camera, CameraMovement};
use crate::core::SurfaceRenderer;
use crate::surface::WaterSurface;

use glutin::event::{MouseButton, VirtualKeyCode};
use std::collections::HashMap;

/// `GlutinBreakout` is useful when you are growing out of [`MiniGlWater::persist`] and want to
/// own the event loop, steer the camera yourself, or share the thread with other windows. You can
/// obtain it by calling [`MiniGlWater::glutin_breakout()`][crate::MiniGlWater::glutin_breakout].
///
/// A frame is then the same three steps the built-in loop does:
///
/// ```no_run
/// use mini_gl_water::glutin::event::{Event, WindowEvent};
/// use mini_gl_water::glutin::event_loop::{ControlFlow, EventLoop};
/// use mini_gl_water::{get_fancy, FrameContext, WaterConfig, WindowConfig};
///
/// let event_loop = EventLoop::new();
/// let mut breakout = get_fancy(WindowConfig::default(), WaterConfig::default(), &event_loop)
///     .unwrap()
///     .glutin_breakout();
///
/// event_loop.run(move |event, _, flow| {
///     *flow = ControlFlow::Poll;
///     match event {
///         Event::WindowEvent { event: WindowEvent::CloseRequested, .. } => {
///             *flow = ControlFlow::Exit
///         }
///         Event::MainEventsCleared => {
///             unsafe { breakout.make_current().unwrap(); }
///             let lens = breakout.surface.config().lens();
///             let frame = FrameContext::from_camera(&breakout.camera, &lens, breakout.renderer.aspect());
///             match breakout.surface.build_frame(&frame) {
///                 Ok(Some(mesh)) => breakout.renderer.upload_mesh(&mesh),
///                 _ => breakout.renderer.clear_mesh(),
///             }
///             breakout.renderer.draw(&frame.view_projection, frame.camera_position);
///             breakout.context.swap_buffers().unwrap();
///         }
///         _ => {}
///     }
/// })
/// ```
///
/// [`MiniGlWater::persist`]: crate::MiniGlWater::persist
#[derive(Debug)]
pub struct GlutinBreakout {
    /// Contains the OpenGL context and its associated window. This is a
    /// [`glutin`](https://docs.rs/glutin/0.26.0/glutin/) struct; go see their documentation on
    /// [`WindowedContext`] for more information.
    pub context: WindowedContext<PossiblyCurrent>,
    pub renderer: SurfaceRenderer,
    pub surface: WaterSurface,
    pub camera: Camera,
}

impl GlutinBreakout {
    /// Sets the current thread's OpenGL context to the one contained in this breakout.
    ///
    /// Glutin's [`make_current`][glutin::ContextWrapper<PossiblyCurrent, glutin::window::Window>::make_current]
    /// takes `self` and hands back a new `WindowedContext`, which you cannot do to a field. This
    /// does the same thing in place, so switching between several windows is one line.
    ///
    /// # Safety
    ///
    /// Same contract as glutin's `make_current`.
    pub unsafe fn make_current(&mut self) -> Result<(), ContextError> {
        let context_ptr: *mut _ = &mut self.context;
        let context = std::ptr::read(context_ptr);

        match context.make_current() {
            Ok(context) => {
                std::ptr::write(context_ptr, context);
                Ok(())
            }
            Err((context, err)) => {
                std::ptr::write(context_ptr, context);
                Err(err)
            }
        }
    }
}

/// Used for [`MiniGlWater::glutin_handle_basic_input`][crate::MiniGlWater::glutin_handle_basic_input].
/// Contains the current state of the window in a polling-like fashion.
#[non_exhaustive]
#[derive(Clone, PartialEq, Debug)]
pub struct BasicInput {
    /// The cursor position in physical window pixels, origin at the top left.
    pub mouse_pos: (f64, f64),
    /// Whether the cursor moved since the last frame.
    pub mouse_moved: bool,
    /// Raw mouse travel since the last frame. Keeps counting while the cursor is grabbed.
    pub mouse_delta: (f64, f64),
    /// Stores whether a mouse button was down and is down, in that order.
    ///
    /// If a button has not been pressed yet it will not be in the map.
    pub mouse: HashMap<MouseButton, (bool, bool)>,
    /// Stores the previous and current "key down" states, in that order.
    ///
    /// If a key has not been pressed yet it will not be in the map.
    pub keys: HashMap<VirtualKeyCode, (bool, bool)>,
    pub focused: bool,
    /// This is set to `true` when the window was resized since the last frame.
    pub resized: bool,
}

impl Default for BasicInput {
    fn default() -> Self {
        BasicInput {
            mouse_pos: (0.0, 0.0),
            mouse_moved: false,
            mouse_delta: (0.0, 0.0),
            mouse: HashMap::new(),
            keys: HashMap::new(),
            focused: true,
            resized: false,
        }
    }
}

impl BasicInput {
    /// If the mouse was pressed this last frame.
    pub fn mouse_pressed(&self, button: MouseButton) -> bool {
        &(false, true) == self.mouse.get(&button).unwrap_or(&(false, false))
    }

    /// If the mouse is currently down.
    pub fn mouse_is_down(&self, button: MouseButton) -> bool {
        matches!(self.mouse.get(&button), Some(&(_, true)))
    }

    /// If the mouse was released this last frame.
    pub fn mouse_released(&self, button: MouseButton) -> bool {
        &(true, false) == self.mouse.get(&button).unwrap_or(&(false, false))
    }

    /// If the key was pressed this last frame.
    pub fn key_pressed(&self, button: VirtualKeyCode) -> bool {
        &(false, true) == self.keys.get(&button).unwrap_or(&(false, false))
    }

    /// If the key is currently down.
    pub fn key_is_down(&self, button: VirtualKeyCode) -> bool {
        matches!(self.keys.get(&button), Some(&(_, true)))
    }

    /// If the key was released this last frame.
    pub fn key_released(&self, button: VirtualKeyCode) -> bool {
        &(true, false) == self.keys.get(&button).unwrap_or(&(false, false))
    }

    /// Movement keys held this frame. WASD and the arrow keys both work.
    pub fn camera_movement(&self) -> CameraMovement {
        CameraMovement {
            forward: self.key_is_down(VirtualKeyCode::W) || self.key_is_down(VirtualKeyCode::Up),
            back: self.key_is_down(VirtualKeyCode::S) || self.key_is_down(VirtualKeyCode::Down),
            left: self.key_is_down(VirtualKeyCode::A) || self.key_is_down(VirtualKeyCode::Left),
            right: self.key_is_down(VirtualKeyCode::D) || self.key_is_down(VirtualKeyCode::Right),
        }
    }

    /// Rolls the current key and button states into the previous ones and resets the
    /// per-frame fields.
    pub fn end_frame(&mut self) {
        for val in self.keys.values_mut() {
            val.0 = val.1;
        }
        for val in self.mouse.values_mut() {
            val.0 = val.1;
        }
        self.mouse_moved = false;
        self.mouse_delta = (0.0, 0.0);
        self.resized = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(input: &mut BasicInput, key: VirtualKeyCode) {
        input.keys.entry(key).or_insert((false, false)).1 = true;
    }

    #[test]
    fn test_key_press_lasts_one_frame() {
        let mut input = BasicInput::default();
        press(&mut input, VirtualKeyCode::Escape);
        assert!(input.key_pressed(VirtualKeyCode::Escape));
        assert!(input.key_is_down(VirtualKeyCode::Escape));

        input.end_frame();
        assert!(!input.key_pressed(VirtualKeyCode::Escape));
        assert!(input.key_is_down(VirtualKeyCode::Escape));

        input.keys.insert(VirtualKeyCode::Escape, (true, false));
        assert!(input.key_released(VirtualKeyCode::Escape));
    }

    #[test]
    fn test_unknown_keys_are_up() {
        let input = BasicInput::default();
        assert!(!input.key_is_down(VirtualKeyCode::Q));
        assert!(!input.mouse_is_down(MouseButton::Left));
    }

    #[test]
    fn test_wasd_and_arrows_map_to_movement() {
        let mut input = BasicInput::default();
        press(&mut input, VirtualKeyCode::W);
        press(&mut input, VirtualKeyCode::Left);
        assert_eq!(
            input.camera_movement(),
            CameraMovement {
                forward: true,
                left: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_end_frame_resets_mouse_travel() {
        let mut input = BasicInput::default();
        input.mouse_delta = (4.0, -2.0);
        input.mouse_moved = true;
        input.resized = true;
        input.end_frame();
        assert_eq!(input.mouse_delta, (0.0, 0.0));
        assert!(!input.mouse_moved && !input.resized);
    }
}
