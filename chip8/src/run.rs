use std::error::Error;
use std::path::Path;
use std::time::{Duration, Instant};

use sdl2::event::Event;
use sdl2::keyboard::Keycode;

use emu8::{Chip8, Config};

use crate::display::Display;
use crate::keymap::keymap;

/// Host-side settings that don't affect emulation
pub struct Settings {
    pub scale: u32,
    /// Milliseconds between cycles
    pub delay: u64,
}

pub fn run(rom: &Path, config: Config, settings: Settings) -> Result<(), Box<dyn Error>> {
    let mut chip8 = Chip8::with_config(config);
    let bytes = chip8.load_rom_file(rom)?;
    tracing::info!(
        rom = %rom.display(),
        bytes,
        key_wait = %chip8.config().key_wait,
        timer_divider = chip8.config().cycles_per_timer_tick,
        "starting"
    );

    // Get SDL2 context
    let sdl = sdl2::init()?;
    let mut display = Display::new(&sdl, settings.scale)?;
    let mut events = sdl.event_pump()?;

    // Set initial timing
    let cycle_time = Duration::from_millis(settings.delay);
    let mut last_cycle = Instant::now();

    // Whether or not the configured delay should be respected
    let mut fast_forward = false;

    'event: loop {
        // Handle input
        for event in events.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    keycode: Some(Keycode::Escape),
                    ..
                } => break 'event,
                Event::KeyDown {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_press(kc),
                    (Keycode::Space, _) => fast_forward = true,
                    _ => continue,
                },
                Event::KeyUp {
                    keycode: Some(key), ..
                } => match (key, keymap(key)) {
                    (_, Some(kc)) => chip8.key_release(kc),
                    (Keycode::Space, _) => fast_forward = false,
                    _ => continue,
                },
                _ => continue,
            };
        }

        // Update state
        chip8.cycle()?;

        // Only redraw when the frame buffer has changed
        if let Some(frame) = chip8.take_frame() {
            display.render(frame)?;
        }

        // Handle timing
        let elapsed_cycle_time = last_cycle.elapsed();
        if !fast_forward && cycle_time > elapsed_cycle_time {
            std::thread::sleep(cycle_time - elapsed_cycle_time);
        }
        last_cycle = Instant::now();
    }

    Ok(())
}
