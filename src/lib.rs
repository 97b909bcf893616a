//! A Chip-8 interpreter core.
//!
//! The host loads a ROM, calls [`Chip8::cycle`] at its chosen clock rate, writes the keypad
//! between cycles and renders [`Chip8::video`] (or [`Chip8::take_frame`] when it changes).

pub use chip8::Chip8;
pub use config::{Config, KeyWait};
pub use error::{Chip8Error, Result};
pub use opcode::Opcode;
pub use state::{FrameBuffer, Keypad, State};

mod chip8;
mod config;
pub mod constants;
mod error;
mod instruction;
mod opcode;
mod operations;
pub mod state;
