//! Drives the water from a hand-written event loop: the camera circles slowly and bobs up and
//! down through the surface, so the underwater path gets exercised too.

use mini_gl_water::camera::direction_from_angles;
use mini_gl_water::glutin::event::{ElementState, Event, KeyboardInput, VirtualKeyCode, WindowEvent};
use mini_gl_water::glutin::event_loop::{ControlFlow, EventLoop};
use mini_gl_water::glutin::platform::run_return::EventLoopExtRunReturn;
use mini_gl_water::{get_fancy, FrameContext, GlutinBreakout, WaterConfig, WindowConfig};

use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    let mut event_loop = EventLoop::new();
    let window = WindowConfig {
        window_title: "Custom loop".to_string(),
        window_size: (800.0, 600.0),
        grab_cursor: false,
        ..Default::default()
    };
    let water = WaterConfig {
        grid_size: 96,
        ..Default::default()
    };

    let GlutinBreakout {
        context,
        mut renderer,
        mut surface,
        mut camera,
    } = get_fancy(window, water, &event_loop)
        .expect("window")
        .glutin_breakout();

    let lens = surface.config().lens();
    let start = Instant::now();
    let mut next_frame = start;

    event_loop.run_return(|event, _, flow| {
        match event {
            Event::WindowEvent { event, .. } => match event {
                WindowEvent::CloseRequested
                | WindowEvent::KeyboardInput {
                    input:
                        KeyboardInput {
                            virtual_keycode: Some(VirtualKeyCode::Escape),
                            state: ElementState::Released,
                            ..
                        },
                    ..
                } => *flow = ControlFlow::Exit,
                WindowEvent::Resized(size) => {
                    context.resize(size);
                    renderer.resize_viewport(size.width, size.height);
                }
                _ => {}
            },
            Event::MainEventsCleared => {
                let now = Instant::now();
                if now >= next_frame {
                    let t = (now - start).as_secs_f32();
                    camera.position.x = 20.0 * (t * 0.05).sin();
                    camera.position.z = 20.0 * (t * 0.05).cos();
                    camera.position.y = -10.0 + 12.0 * (t * 0.2).sin();
                    camera.forward = direction_from_angles(t * 0.05, -0.15);

                    let frame = FrameContext::from_camera(&camera, &lens, renderer.aspect());
                    match surface.build_frame(&frame) {
                        Ok(Some(mesh)) => renderer.upload_mesh(&mesh),
                        Ok(None) => renderer.clear_mesh(),
                        Err(err) => {
                            log::warn!("{}", err);
                            renderer.clear_mesh();
                        }
                    }
                    renderer.draw(&frame.view_projection, frame.camera_position);
                    if let Err(err) = context.swap_buffers() {
                        eprintln!("swap failed: {}", err);
                        *flow = ControlFlow::Exit;
                        return;
                    }
                    next_frame = now + Duration::from_millis(20);
                }
                *flow = ControlFlow::WaitUntil(next_frame);
            }
            _ => {}
        }
    });
}
