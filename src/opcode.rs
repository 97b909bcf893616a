use std::fmt;

/// # Opcodes
///
/// Chip-8 opcodes are 16 bits each, stored big-endian. Their behavior is cased on some combination of:
/// - `(n, _, _, _)` the family; selects a row of the main dispatch table
/// - `(_, _, _, n)` the operation within family `8`
/// - `(_, _, n, n)` the operation within families `0`, `E` and `F`
///
/// Nibbles not used to determine the operation often (but not always) carry important data.
/// - `(_, n, n, n)` a 12-bit address
/// - `(_, _, n, n)` a byte that is assigned to and/or compared with Vx
/// - `(_, n, _, _)` either the register Vx or the upper bound of a range V0..=Vx
/// - `(_, _, n, _)` the register Vy
/// - `(_, _, _, n)` the height of a sprite
///
/// Decoding never fails; bit patterns with no meaning are resolved by the dispatch tables.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Combines two subsequent bytes of memory into an opcode.
    pub fn from_bytes(high: u8, low: u8) -> Self {
        Opcode(u16::from(high) << 8 | u16::from(low))
    }

    /// The Opcode's most significant nibble.
    /// `[f___]`
    pub fn family(self) -> u8 {
        ((self.0 & 0xF000) >> 12) as u8
    }

    /// The Opcode's second nibble, as a register index.
    /// `[_x__]`
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    /// The Opcode's third nibble, as a register index.
    /// `[__y_]`
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    /// The Opcode's fourth nibble.
    /// `[___n]`
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// The Opcode's least significant byte.
    /// `[__kk]`
    pub fn kk(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// The Opcode without its most significant nibble.
    /// `[_adr]`
    pub fn addr(self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}
