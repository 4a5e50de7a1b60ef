//! Hello Triangle
//!
//! Opens a window, brings up a Vulkan device and presentation chain, and keeps
//! the chain matched to the framebuffer until the window is closed.

use glfw::{Action, Key, WindowEvent};
use vkinit::foundation::logging;
use vkinit::prelude::*;

const CONFIG_PATH: &str = "hello_triangle.toml";

fn main() {
    let config = match BootstrapConfig::load_or_default(CONFIG_PATH) {
        Ok(config) => config,
        Err(e) => {
            logging::init("info");
            log::error!("Could not load {}: {}", CONFIG_PATH, e);
            std::process::exit(1);
        }
    };
    logging::init(&config.log_level);

    log::info!("Starting {}", config.application_name);
    if let Err(e) = run(&config) {
        log::error!("Application error: {}", e);
        std::process::exit(1);
    }
}

fn run(config: &BootstrapConfig) -> Result<(), Box<dyn std::error::Error>> {
    let mut window = Window::with_config(&config.window)?;
    let driver = AshDriver::load()?;
    // Declared after the window so the surface goes before the window does
    let mut context = DeviceContext::bootstrap(driver, &mut window, config)?;

    let mut resized = false;
    while !window.should_close() {
        window.poll_events();

        let events: Vec<WindowEvent> = window.flush_events().map(|(_, event)| event).collect();
        for event in events {
            match event {
                WindowEvent::Key(Key::Escape, _, Action::Press, _) => window.set_should_close(true),
                WindowEvent::FramebufferSize(..) => resized = true,
                _ => {}
            }
        }

        if resized {
            let (width, height) = window.framebuffer_size();
            if width == 0 || height == 0 {
                // Minimized
                window.wait_events();
                continue;
            }
            let chain = context.recreate_presentation_chain((width, height))?;
            log::info!("Resized to {}x{}", chain.extent().width, chain.extent().height);
            resized = false;
        }
    }

    context.wait_idle()?;
    log::info!("Shutting down");
    Ok(())
}
