use std::path::PathBuf;

/// Errors that can occur while loading or running a program
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("unable to read ROM: {0}")]
    Io(#[from] std::io::Error),

    #[error("ROM is empty")]
    EmptyRom,

    #[error("ROM {path:?} does not have a .ch8 extension")]
    InvalidExtension { path: PathBuf },

    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("stack overflow: call at {pc:#06X} exceeds the call stack")]
    StackOverflow { pc: u16 },

    #[error("stack underflow: return at {pc:#06X} with an empty call stack")]
    StackUnderflow { pc: u16 },

    #[error("memory access out of bounds: {len} byte(s) at {address:#06X}")]
    MemoryOutOfBounds { address: usize, len: usize },
}

pub type Result<T> = std::result::Result<T, Chip8Error>;
