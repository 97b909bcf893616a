use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FONTSET, FONTSET_START_ADDRESS, MEMORY_SIZE, NUM_KEYS,
    NUM_REGISTERS, STACK_SIZE, START_ADDRESS,
};
use crate::error::{Chip8Error, Result};

/// The FrameBuffer is indexed as [y][x]; a pixel is either 0 (off) or 1 (on)
pub type FrameBuffer = [[u8; DISPLAY_WIDTH]; DISPLAY_HEIGHT];

/// The pressed status of keys 0..F
pub type Keypad = [bool; NUM_KEYS];

/// The Chip8 internal state
///
/// ## CPU
/// Registers
/// - (v) 16 primary 8-bit registers (V0..VF)
///     - the first 15 (V0..VE) are general purpose registers
///     - the 16th (VF) is the carry/borrow/collision flag
/// - (i) a 16-bit memory address register
///
/// Counter
/// - (pc) a 16-bit program counter, always the address of the next instruction to fetch
///
/// Pointer
/// - (sp) an 8-bit stack pointer, one past the most recent return address
///
/// Timers
/// - 2 8-bit timers (delay & sound) that count down to 0
///
/// ## Memory
/// - 16 entry stack of return addresses
/// - 4096 bytes of addressable memory
///     - 0x050..0x0A0 holds the hexadecimal font
///     - programs are loaded from 0x200
/// - 32x64 frame buffer
///
/// ## Input
/// - 16 entry keypad written by the host between cycles
/// - `waiting_for_key` is the register that a latched `Fx0A` will store the next key in
pub struct State {
    pub v: [u8; NUM_REGISTERS],
    pub i: u16,
    pub pc: u16,
    pub sp: u8,
    pub delay_timer: u8,
    pub sound_timer: u8,
    pub stack: [u16; STACK_SIZE],
    pub memory: [u8; MEMORY_SIZE],
    pub frame_buffer: FrameBuffer,
    pub draw_flag: bool,
    pub keypad: Keypad,
    pub waiting_for_key: Option<usize>,
    pub rng: StdRng,
}

impl State {
    pub fn new() -> Self {
        State::with_rng(StdRng::from_entropy())
    }

    /// A state whose `Cxkk` results are reproducible.
    pub fn seeded(seed: u64) -> Self {
        State::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut memory = [0; MEMORY_SIZE];
        let font = FONTSET_START_ADDRESS as usize;
        memory[font..font + FONTSET.len()].copy_from_slice(&FONTSET);

        State {
            v: [0; NUM_REGISTERS],
            i: 0,
            pc: START_ADDRESS,
            sp: 0,
            delay_timer: 0,
            sound_timer: 0,
            stack: [0; STACK_SIZE],
            memory,
            frame_buffer: [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT],
            draw_flag: false,
            keypad: [false; NUM_KEYS],
            waiting_for_key: None,
            rng,
        }
    }

    /// The address of the instruction being executed.
    /// Only meaningful inside a handler, after the cycle driver has bumped the pc.
    pub fn current_pc(&self) -> u16 {
        self.pc.wrapping_sub(2)
    }

    /// Skips the next instruction if `condition` holds.
    pub fn skip_if(&mut self, condition: bool) {
        if condition {
            self.pc = self.pc.wrapping_add(2);
        }
    }

    /// The lowest numbered key that is currently pressed.
    pub fn first_pressed_key(&self) -> Option<u8> {
        self.keypad.iter().position(|&pressed| pressed).map(|key| key as u8)
    }

    /// Borrows `len` bytes of memory starting at `address`.
    pub fn memory_at(&self, address: usize, len: usize) -> Result<&[u8]> {
        let end = State::checked_end(address, len)?;
        Ok(&self.memory[address..end])
    }

    /// Mutably borrows `len` bytes of memory starting at `address`.
    pub fn memory_at_mut(&mut self, address: usize, len: usize) -> Result<&mut [u8]> {
        let end = State::checked_end(address, len)?;
        Ok(&mut self.memory[address..end])
    }

    fn checked_end(address: usize, len: usize) -> Result<usize> {
        match address.checked_add(len) {
            Some(end) if end <= MEMORY_SIZE => Ok(end),
            _ => Err(Chip8Error::MemoryOutOfBounds { address, len }),
        }
    }
}

impl Default for State {
    fn default() -> Self {
        Self::new()
    }
}
