use mini_gl_water::glutin::event_loop::EventLoop;
use mini_gl_water::{get_fancy, WaterConfigBuilder, WindowConfigBuilder};

fn main() {
    env_logger::init();

    let mut event_loop = EventLoop::new();

    let window = WindowConfigBuilder::default()
        .window_title("Projected water (WASD + mouse, Esc quits)")
        .build();
    let water = WaterConfigBuilder::default()
        .grid_size(160usize)
        .build()
        .expect("water config");

    let mut fancy = match get_fancy(window, water, &event_loop) {
        Ok(fancy) => fancy,
        Err(err) => {
            eprintln!("could not start: {}", err);
            std::process::exit(1);
        }
    };

    if let Err(err) = fancy.persist(&mut event_loop) {
        eprintln!("render loop stopped: {}", err);
        std::process::exit(1);
    }
}
