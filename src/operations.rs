use rand::Rng;

use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, FLAG, FONTSET_START_ADDRESS, FONT_SIZE, MEMORY_SIZE,
    NUM_REGISTERS, STACK_SIZE,
};
use crate::error::{Chip8Error, Result};
use crate::opcode::Opcode;
use crate::state::State;

/// Every handler runs after the cycle driver has moved the pc past the current instruction.
/// Handlers that fail leave `state` untouched.
pub type Handler = fn(state: &mut State, op: Opcode) -> Result<()>;

/// no-op for instructions that don't decode
pub fn null(_state: &mut State, op: Opcode) -> Result<()> {
    tracing::debug!(%op, "ignoring undecodable instruction");
    Ok(())
}

/// clear
pub fn clr(state: &mut State, _op: Opcode) -> Result<()> {
    state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
    state.draw_flag = true;
    Ok(())
}

/// PC = STACK.pop()
pub fn rts(state: &mut State, _op: Opcode) -> Result<()> {
    if state.sp == 0 {
        return Err(Chip8Error::StackUnderflow {
            pc: state.current_pc(),
        });
    }
    state.sp -= 1;
    state.pc = state.stack[state.sp as usize];
    Ok(())
}

/// PC = addr
pub fn jump(state: &mut State, op: Opcode) -> Result<()> {
    state.pc = op.addr();
    Ok(())
}

/// STACK.push(PC); PC = addr
pub fn call(state: &mut State, op: Opcode) -> Result<()> {
    let sp = state.sp as usize;
    if sp >= STACK_SIZE {
        return Err(Chip8Error::StackOverflow {
            pc: state.current_pc(),
        });
    }
    state.stack[sp] = state.pc;
    state.sp += 1;
    state.pc = op.addr();
    Ok(())
}

/// if Vx == kk then pc += 2
pub fn ske(state: &mut State, op: Opcode) -> Result<()> {
    state.skip_if(state.v[op.x()] == op.kk());
    Ok(())
}

/// if Vx != kk then pc += 2
pub fn skne(state: &mut State, op: Opcode) -> Result<()> {
    state.skip_if(state.v[op.x()] != op.kk());
    Ok(())
}

/// if Vx == Vy then pc += 2
pub fn skre(state: &mut State, op: Opcode) -> Result<()> {
    state.skip_if(state.v[op.x()] == state.v[op.y()]);
    Ok(())
}

/// Vx = kk
pub fn load(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] = op.kk();
    Ok(())
}

/// Vx += kk
/// Overflow wraps and VF is left alone
pub fn add(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] = state.v[op.x()].wrapping_add(op.kk());
    Ok(())
}

/// Vx = Vy
pub fn mv(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] = state.v[op.y()];
    Ok(())
}

/// Vx |= Vy
pub fn or(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] |= state.v[op.y()];
    Ok(())
}

/// Vx &= Vy
pub fn and(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] &= state.v[op.y()];
    Ok(())
}

/// Vx ^= Vy
pub fn xor(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] ^= state.v[op.y()];
    Ok(())
}

// The flag is written after the result so VF holds the flag even when x is F.

/// Vx += Vy; VF = overflow
pub fn addr(state: &mut State, op: Opcode) -> Result<()> {
    let (res, over) = state.v[op.x()].overflowing_add(state.v[op.y()]);
    state.v[op.x()] = res;
    state.v[FLAG] = over as u8;
    Ok(())
}

/// Vx -= Vy; VF = Vx >= Vy
pub fn sub(state: &mut State, op: Opcode) -> Result<()> {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    state.v[op.x()] = vx.wrapping_sub(vy);
    state.v[FLAG] = (vx >= vy) as u8;
    Ok(())
}

/// Vx >>= 1; VF = the bit shifted out
pub fn shr(state: &mut State, op: Opcode) -> Result<()> {
    let vx = state.v[op.x()];
    state.v[op.x()] = vx >> 1;
    state.v[FLAG] = vx & 0x1;
    Ok(())
}

/// Vx = Vy - Vx; VF = Vy >= Vx
pub fn subn(state: &mut State, op: Opcode) -> Result<()> {
    let (vx, vy) = (state.v[op.x()], state.v[op.y()]);
    state.v[op.x()] = vy.wrapping_sub(vx);
    state.v[FLAG] = (vy >= vx) as u8;
    Ok(())
}

/// Vx <<= 1; VF = the bit shifted out
pub fn shl(state: &mut State, op: Opcode) -> Result<()> {
    let vx = state.v[op.x()];
    state.v[op.x()] = vx << 1;
    state.v[FLAG] = vx >> 7;
    Ok(())
}

/// if Vx != Vy then pc += 2
pub fn skrne(state: &mut State, op: Opcode) -> Result<()> {
    state.skip_if(state.v[op.x()] != state.v[op.y()]);
    Ok(())
}

/// I = addr
pub fn loadi(state: &mut State, op: Opcode) -> Result<()> {
    state.i = op.addr();
    Ok(())
}

/// PC = V0 + addr
pub fn jumpi(state: &mut State, op: Opcode) -> Result<()> {
    state.pc = u16::from(state.v[0x0]) + op.addr();
    Ok(())
}

/// Vx = rand_byte & kk
pub fn rnd(state: &mut State, op: Opcode) -> Result<()> {
    let rand_byte: u8 = state.rng.gen();
    state.v[op.x()] = rand_byte & op.kk();
    Ok(())
}

/// draw_sprite(x=Vx y=Vy size=n)
/// XORs the sprite at mem[I..I+n] onto the FrameBuffer.
/// The origin wraps around the display but the sprite itself is clipped at the edges.
/// Sets VF if any pixel is erased
pub fn draw(state: &mut State, op: Opcode) -> Result<()> {
    let height = op.n() as usize;
    let mut sprite = [0u8; 0xF];
    sprite[..height].copy_from_slice(state.memory_at(state.i as usize, height)?);

    let origin_x = state.v[op.x()] as usize % DISPLAY_WIDTH;
    let origin_y = state.v[op.y()] as usize % DISPLAY_HEIGHT;
    let mut collision = 0;

    for (row, byte) in sprite[..height].iter().enumerate() {
        let y = origin_y + row;
        if y >= DISPLAY_HEIGHT {
            break;
        }
        for bit in 0..8 {
            let x = origin_x + bit;
            if x >= DISPLAY_WIDTH {
                break;
            }
            let pixel = (byte >> (7 - bit)) & 1;
            collision |= pixel & state.frame_buffer[y][x];
            state.frame_buffer[y][x] ^= pixel;
        }
    }

    state.v[FLAG] = collision;
    state.draw_flag = true;
    Ok(())
}

/// if Vx.pressed then pc += 2
pub fn skpr(state: &mut State, op: Opcode) -> Result<()> {
    let key = (state.v[op.x()] & 0xF) as usize;
    state.skip_if(state.keypad[key]);
    Ok(())
}

/// if !Vx.pressed then pc += 2
pub fn skup(state: &mut State, op: Opcode) -> Result<()> {
    let key = (state.v[op.x()] & 0xF) as usize;
    state.skip_if(!state.keypad[key]);
    Ok(())
}

/// Vx = DT
pub fn rddt(state: &mut State, op: Opcode) -> Result<()> {
    state.v[op.x()] = state.delay_timer;
    Ok(())
}

/// await keypress for Vx
/// Rewinds the pc while no key is pressed so this instruction runs again next cycle
pub fn keyd(state: &mut State, op: Opcode) -> Result<()> {
    match state.first_pressed_key() {
        Some(key) => state.v[op.x()] = key,
        None => state.pc = state.current_pc(),
    }
    Ok(())
}

/// await keypress for Vx
/// Parks the pc on this instruction and hands the wait over to the cycle driver,
/// which polls the keypad without fetching until a key is pressed
pub fn keyd_latched(state: &mut State, op: Opcode) -> Result<()> {
    match state.first_pressed_key() {
        Some(key) => state.v[op.x()] = key,
        None => {
            state.pc = state.current_pc();
            state.waiting_for_key = Some(op.x());
            tracing::debug!(register = op.x(), "waiting for key");
        }
    }
    Ok(())
}

/// DT = Vx
pub fn lddt(state: &mut State, op: Opcode) -> Result<()> {
    state.delay_timer = state.v[op.x()];
    Ok(())
}

/// ST = Vx
pub fn ldst(state: &mut State, op: Opcode) -> Result<()> {
    state.sound_timer = state.v[op.x()];
    Ok(())
}

/// I += Vx
pub fn addi(state: &mut State, op: Opcode) -> Result<()> {
    let i = state.i as usize + state.v[op.x()] as usize;
    if i >= MEMORY_SIZE {
        return Err(Chip8Error::MemoryOutOfBounds {
            address: i,
            len: 1,
        });
    }
    state.i = i as u16;
    Ok(())
}

/// I = address of the font sprite for the low nibble of Vx
pub fn ldspr(state: &mut State, op: Opcode) -> Result<()> {
    let digit = u16::from(state.v[op.x()] & 0xF);
    state.i = FONTSET_START_ADDRESS + FONT_SIZE * digit;
    Ok(())
}

/// mem[I..I+3] = bcd(Vx)
/// Store the hundreds, tens and ones of Vx starting at address I
pub fn bcd(state: &mut State, op: Opcode) -> Result<()> {
    let vx = state.v[op.x()];
    let digits = [vx / 100, vx / 10 % 10, vx % 10];
    state
        .memory_at_mut(state.i as usize, digits.len())?
        .copy_from_slice(&digits);
    Ok(())
}

/// mem[I..=I+x] = V0..=Vx
pub fn stor(state: &mut State, op: Opcode) -> Result<()> {
    let count = op.x() + 1;
    let v = state.v;
    state
        .memory_at_mut(state.i as usize, count)?
        .copy_from_slice(&v[..count]);
    Ok(())
}

/// V0..=Vx = mem[I..=I+x]
pub fn read(state: &mut State, op: Opcode) -> Result<()> {
    let count = op.x() + 1;
    let mut loaded = [0u8; NUM_REGISTERS];
    loaded[..count].copy_from_slice(state.memory_at(state.i as usize, count)?);
    state.v[..count].copy_from_slice(&loaded[..count]);
    Ok(())
}
