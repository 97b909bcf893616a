use std::error::Error;

use sdl2::pixels::PixelFormatEnum;

use emu8::constants::{DISPLAY_HEIGHT, DISPLAY_WIDTH};
use emu8::FrameBuffer;

/// # Display
/// The Chip-8 display is composed of 64x32 pixels black/white pixels.
/// The on/off state of these pixels is encoded as 1/0 respectively in a 2d array.
/// The display only gets a call to `render` when the Chip-8 FrameBuffer is updated.
pub struct Display {
    canvas: sdl2::render::WindowCanvas,
}

impl Display {
    /// Creates a new display object bound to an sdl2 context.
    ///
    /// # Arguments
    /// * `sdl` an sdl2 context with which to draw
    /// * `scale` the size multiplier for each pixel
    pub fn new(sdl: &sdl2::Sdl, scale: u32) -> Result<Self, Box<dyn Error>> {
        let video_subsystem = sdl.video()?;
        let window = video_subsystem
            .window(
                "Emu-8",
                DISPLAY_WIDTH as u32 * scale,
                DISPLAY_HEIGHT as u32 * scale,
            )
            .position_centered()
            .opengl()
            .build()?;
        let canvas = window.into_canvas().build()?;

        Ok(Display { canvas })
    }

    /// Formats a Chip-8 FrameBuffer for rendering as an SDL2 texture.
    ///
    /// An SDL2 texture is a 1D array of ints that represent concatenated rows of RGB pixels.
    ///
    /// This creates a black and white rendering by:
    /// - Flattening the 2D frame buffer into a 1D array by concatenating its rows
    /// - Triplicating each element of that 1D array to represent the RGB values of each pixel
    /// - Multiplying each value by 255 to convert from a binary state to 0-255 intensity
    fn frame_to_sdl_texture(frame: &FrameBuffer) -> Vec<u8> {
        frame
            .iter()
            .flat_map(|row| row.iter())
            .flat_map(|pixel| std::iter::repeat(pixel).take(3))
            .map(|pixel| pixel * 255)
            .collect()
    }

    /// Formats the Chip-8 FrameBuffer as an SDL2 RGB24 texture and renders it.
    pub fn render(&mut self, frame: &FrameBuffer) -> Result<(), Box<dyn Error>> {
        let texture_creator = self.canvas.texture_creator();
        let mut texture = texture_creator.create_texture_streaming(
            PixelFormatEnum::RGB24,
            DISPLAY_WIDTH as u32,
            DISPLAY_HEIGHT as u32,
        )?;

        let pixels = Display::frame_to_sdl_texture(frame);
        texture.with_lock(None, |buffer: &mut [u8], _pitch: usize| {
            buffer.copy_from_slice(&pixels);
        })?;

        self.canvas.copy(&texture, None, None)?;
        self.canvas.present();
        Ok(())
    }
}
