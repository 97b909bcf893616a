/// Total addressable memory in bytes
pub const MEMORY_SIZE: usize = 4096;

/// Programs are loaded at, and execution starts from, this address
pub const START_ADDRESS: u16 = 0x200;

/// Largest ROM that fits between `START_ADDRESS` and the end of memory
pub const MAX_ROM_SIZE: usize = MEMORY_SIZE - START_ADDRESS as usize;

pub const DISPLAY_WIDTH: usize = 64;
pub const DISPLAY_HEIGHT: usize = 32;

pub const NUM_REGISTERS: usize = 16;
pub const NUM_KEYS: usize = 16;

/// Maximum number of nested subroutine calls
pub const STACK_SIZE: usize = 16;

/// VF doubles as the carry, borrow and collision flag
pub const FLAG: usize = 0xF;

/// Each font glyph is 5 rows of 8 pixels
pub const FONT_SIZE: u16 = 5;

pub const FONTSET_START_ADDRESS: u16 = 0x050;

/// # Font
/// Sprites for the hexadecimal digits 0..F.
///
/// Each glyph is 4 pixels wide, so only the high nibble of each row is used.
/// ```text
/// 0xF0  ####
/// 0x90  #  #
/// 0x90  #  #
/// 0x90  #  #
/// 0xF0  ####
/// ```
pub const FONTSET: [u8; 80] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];
