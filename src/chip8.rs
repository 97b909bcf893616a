use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use crate::config::Config;
use crate::constants::{
    DISPLAY_HEIGHT, DISPLAY_WIDTH, MAX_ROM_SIZE, NUM_KEYS, NUM_REGISTERS, STACK_SIZE,
    START_ADDRESS,
};
use crate::error::{Chip8Error, Result};
use crate::instruction::Dispatch;
use crate::opcode::Opcode;
use crate::state::{FrameBuffer, Keypad, State};

/// # Chip-8
/// Chip-8 is a virtual machine and corresponding interpreted language.
///
/// Tracks:
///  - current `state`
///  - the `dispatch` tables built for its `config`
///  - the most recently fetched `opcode`
///
/// Supplies interfaces for:
/// - loading roms
/// - pressing and releasing keys
/// - advancing the machine one cycle at a time
/// - inspecting its frame buffer for rendering by some display
pub struct Chip8 {
    state: State,
    dispatch: Dispatch,
    config: Config,
    opcode: Opcode,
    timer_counter: u8,
}

impl Chip8 {
    pub fn new() -> Self {
        Chip8::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let state = match config.seed {
            Some(seed) => State::seeded(seed),
            None => State::new(),
        };
        Chip8 {
            state,
            dispatch: Dispatch::new(config.key_wait),
            config,
            opcode: Opcode::default(),
            timer_counter: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Load a rom from a source file
    ///
    /// The file must have a `.ch8` extension.
    pub fn load_rom_file<P: AsRef<Path>>(&mut self, path: P) -> Result<usize> {
        let path = path.as_ref();
        let is_ch8 = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("ch8"));
        if !is_ch8 {
            return Err(Chip8Error::InvalidExtension {
                path: path.to_path_buf(),
            });
        }
        let file = File::open(path)?;
        self.load_rom(&mut BufReader::new(file))
    }

    /// Load a rom from a reader
    ///
    /// Reads at most one byte past the largest ROM, so an oversized stream is rejected
    /// with a `size` of `MAX_ROM_SIZE + 1` without being drained.
    ///
    /// # Arguments
    /// * `reader` a reader that yields the raw ROM image
    pub fn load_rom(&mut self, reader: &mut dyn Read) -> Result<usize> {
        let mut rom = Vec::with_capacity(MAX_ROM_SIZE + 1);
        Read::take(&mut *reader, MAX_ROM_SIZE as u64 + 1).read_to_end(&mut rom)?;
        self.load_rom_bytes(&rom)
    }

    /// Copies `rom` into memory at 0x200 and returns its length.
    /// Memory is left untouched if the ROM is empty or doesn't fit.
    ///
    /// A successful load restarts execution: registers, stack, timers, display and any
    /// pending key wait are cleared and the pc is set to 0x200. The keypad is kept.
    pub fn load_rom_bytes(&mut self, rom: &[u8]) -> Result<usize> {
        if rom.is_empty() {
            return Err(Chip8Error::EmptyRom);
        }
        if rom.len() > MAX_ROM_SIZE {
            return Err(Chip8Error::RomTooLarge {
                size: rom.len(),
                max_size: MAX_ROM_SIZE,
            });
        }

        let program = &mut self.state.memory[START_ADDRESS as usize..];
        for byte in program.iter_mut() {
            *byte = 0;
        }
        program[..rom.len()].copy_from_slice(rom);
        self.restart();
        tracing::info!(bytes = rom.len(), "loaded ROM");
        Ok(rom.len())
    }

    fn restart(&mut self) {
        let state = &mut self.state;
        state.v = [0; NUM_REGISTERS];
        state.i = 0;
        state.pc = START_ADDRESS;
        state.sp = 0;
        state.stack = [0; STACK_SIZE];
        state.delay_timer = 0;
        state.sound_timer = 0;
        state.frame_buffer = [[0; DISPLAY_WIDTH]; DISPLAY_HEIGHT];
        state.draw_flag = false;
        state.waiting_for_key = None;
        self.opcode = Opcode::default();
        self.timer_counter = 0;
    }

    /// The frame buffer, whether or not it changed since it was last taken
    pub fn video(&self) -> &FrameBuffer {
        &self.state.frame_buffer
    }

    /// Returns the FrameBuffer if the display should be redrawn and clears the draw flag
    pub fn take_frame(&mut self) -> Option<&FrameBuffer> {
        if self.state.draw_flag {
            self.state.draw_flag = false;
            Some(&self.state.frame_buffer)
        } else {
            None
        }
    }

    pub fn keypad(&self) -> &Keypad {
        &self.state.keypad
    }

    /// The keypad for the host to update from its input source between cycles
    pub fn keypad_mut(&mut self) -> &mut Keypad {
        &mut self.state.keypad
    }

    /// Set the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was pressed
    pub fn key_press(&mut self, key: u8) {
        self.state.keypad[key as usize % NUM_KEYS] = true;
    }

    /// Unset the pressed status of key
    ///
    /// # Arguments
    /// * `key` the 4-bit representation of the key that was released
    pub fn key_release(&mut self, key: u8) {
        self.state.keypad[key as usize % NUM_KEYS] = false;
    }

    /// Whether the host should be sounding its tone
    pub fn sound_active(&self) -> bool {
        self.state.sound_timer > 0
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The instruction fetched by the most recent cycle
    pub fn opcode(&self) -> Opcode {
        self.opcode
    }

    /// Advances the machine by a single cycle
    /// - polls the keypad instead of fetching if a latched `Fx0A` is waiting
    /// - otherwise fetches, decodes and executes the next instruction
    /// - decrements the timers
    ///
    /// An instruction that faults leaves the machine exactly as it was, with the pc on
    /// the faulting instruction, and the timers are not advanced.
    pub fn cycle(&mut self) -> Result<()> {
        match self.state.waiting_for_key {
            Some(register) => self.poll_key(register),
            None => self.step()?,
        }
        self.advance_timers();
        Ok(())
    }

    fn step(&mut self) -> Result<()> {
        let pc = self.state.pc;
        let op = self.fetch().map_err(|err| {
            tracing::warn!(pc, error = %err, "unable to fetch instruction");
            err
        })?;
        self.opcode = op;
        tracing::trace!(
            "{} v{:02X?} i{:04X} pc{:04X}",
            op,
            self.state.v,
            self.state.i,
            pc
        );

        // Bumped before dispatch; jumps, calls and skips work relative to the next instruction
        self.state.pc = pc + 0x2;
        if let Err(err) = self.dispatch.execute(&mut self.state, op) {
            self.state.pc = pc;
            tracing::warn!(%op, pc, error = %err, "instruction faulted");
            return Err(err);
        }
        Ok(())
    }

    /// Gets the opcode currently pointed at by the pc.
    /// Memory is stored as bytes, but opcodes are 16 bits so we combine two subsequent bytes.
    fn fetch(&self) -> Result<Opcode> {
        let bytes = self.state.memory_at(self.state.pc as usize, 2)?;
        Ok(Opcode::from_bytes(bytes[0], bytes[1]))
    }

    /// Completes a latched `Fx0A` once any key is down
    fn poll_key(&mut self, register: usize) {
        if let Some(key) = self.state.first_pressed_key() {
            self.state.v[register] = key;
            self.state.waiting_for_key = None;
            self.state.pc += 0x2;
            tracing::debug!(key, register, "key wait satisfied");
        }
    }

    /// Decrements nonzero timers once every `cycles_per_timer_tick` cycles
    fn advance_timers(&mut self) {
        self.timer_counter += 1;
        if self.timer_counter < self.config.cycles_per_timer_tick {
            return;
        }
        self.timer_counter = 0;

        if self.state.delay_timer > 0 {
            self.state.delay_timer -= 1;
        }
        if self.state.sound_timer > 0 {
            self.state.sound_timer -= 1;
        }
    }
}

impl Default for Chip8 {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KeyWait;
    use crate::constants::MEMORY_SIZE;

    // 0001 resolves to null
    const NOPS: [u8; 8] = [0x00, 0x01, 0x00, 0x01, 0x00, 0x01, 0x00, 0x01];

    fn with_program(config: Config, program: &[u8]) -> Chip8 {
        let mut chip8 = Chip8::with_config(config);
        chip8.load_rom_bytes(program).expect("program should load");
        chip8
    }

    #[test]
    fn test_chip8_fetches_big_endian() {
        let mut chip8 = Chip8::new();
        chip8.state.memory[0x200..0x202].copy_from_slice(&[0xAA, 0xBB]);
        assert_eq!(chip8.fetch().ok(), Some(Opcode(0xAABB)));
    }

    #[test]
    fn test_cycle_advances_pc() {
        let mut chip8 = with_program(Config::default(), &[0x00, 0xE0, 0x6A, 0x3C]);
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.opcode(), Opcode(0x00E0));
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.pc, 0x204);
        assert_eq!(chip8.state.v[0xA], 0x3C);
    }

    #[test]
    fn test_cycle_decrements_timers_to_zero() {
        let mut chip8 = with_program(Config::default(), &NOPS);
        chip8.state.delay_timer = 3;
        chip8.state.sound_timer = 2;
        for (delay, sound) in [(2, 1), (1, 0), (0, 0), (0, 0)].iter() {
            chip8.cycle().expect("cycle failed");
            assert_eq!(chip8.state.delay_timer, *delay);
            assert_eq!(chip8.state.sound_timer, *sound);
        }
    }

    #[test]
    fn test_timer_divider_slows_timers() {
        let config = Config::default().with_cycles_per_timer_tick(3);
        let mut chip8 = with_program(config, &NOPS);
        chip8.state.delay_timer = 5;
        chip8.cycle().expect("cycle failed");
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.delay_timer, 5);
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.delay_timer, 4);
    }

    #[test]
    fn test_sound_active_follows_sound_timer() {
        let mut chip8 = with_program(Config::default(), &[0x00, 0x01]);
        assert!(!chip8.sound_active());
        chip8.state.sound_timer = 1;
        assert!(chip8.sound_active());
        chip8.cycle().expect("cycle failed");
        assert!(!chip8.sound_active());
    }

    #[test]
    fn test_take_frame_clears_draw_flag() {
        let mut chip8 = with_program(Config::default(), &[0x00, 0xE0]);
        assert!(chip8.take_frame().is_none());
        chip8.cycle().expect("cycle failed");
        assert!(chip8.take_frame().is_some());
        assert!(chip8.take_frame().is_none());
    }

    fn key_wait_is_observably_identical(key_wait: KeyWait) {
        // F50A; 6101
        let mut chip8 = with_program(
            Config::default().with_key_wait(key_wait),
            &[0xF5, 0x0A, 0x61, 0x01],
        );
        chip8.state.delay_timer = 10;
        for _ in 0..3 {
            chip8.cycle().expect("cycle failed");
            assert_eq!(chip8.state.pc, 0x200);
        }
        // Timers keep running while waiting
        assert_eq!(chip8.state.delay_timer, 7);

        chip8.key_press(0xB);
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.v[0x5], 0xB);

        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.pc, 0x204);
        assert_eq!(chip8.state.v[0x1], 0x1);
    }

    #[test]
    fn test_reexecute_key_wait() {
        key_wait_is_observably_identical(KeyWait::Reexecute);
    }

    #[test]
    fn test_latched_key_wait() {
        key_wait_is_observably_identical(KeyWait::Latched);
    }

    #[test]
    fn test_latched_key_wait_doesnt_fetch() {
        let config = Config::default().with_key_wait(KeyWait::Latched);
        let mut chip8 = with_program(config, &[0xF5, 0x0A]);
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.waiting_for_key, Some(0x5));
        // Clobber the instruction; a latched wait must not look at it again
        chip8.state.memory[0x200..0x202].copy_from_slice(&[0x12, 0x00]);
        chip8.keypad_mut()[0x2] = true;
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.waiting_for_key, None);
        assert_eq!(chip8.state.v[0x5], 0x2);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_key_press_and_release() {
        let mut chip8 = Chip8::new();
        chip8.key_press(0x3);
        assert!(chip8.keypad()[0x3]);
        chip8.key_release(0x3);
        assert!(!chip8.keypad()[0x3]);
        chip8.key_press(0x13);
        assert!(chip8.keypad()[0x3]);
    }

    #[test]
    fn test_faulting_cycle_rewinds() {
        // 00EE with nothing on the stack
        let mut chip8 = with_program(Config::default(), &[0x00, 0xEE]);
        chip8.state.delay_timer = 4;
        let err = chip8.cycle().expect_err("return should underflow");
        assert!(matches!(err, Chip8Error::StackUnderflow { pc: 0x200 }));
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.delay_timer, 4);
    }

    #[test]
    fn test_fetch_past_memory_faults() {
        let mut chip8 = Chip8::new();
        chip8.state.pc = (MEMORY_SIZE - 1) as u16;
        assert!(matches!(
            chip8.cycle(),
            Err(Chip8Error::MemoryOutOfBounds { address: 0xFFF, len: 2 })
        ));
    }

    #[test]
    fn test_call_then_return() {
        // 2206; 0000; 0000; 00EE
        let program = [0x22, 0x06, 0x00, 0x00, 0x00, 0x00, 0x00, 0xEE];
        let mut chip8 = with_program(Config::default(), &program);
        chip8.cycle().expect("call failed");
        assert_eq!(chip8.state.pc, 0x206);
        assert_eq!(chip8.state.sp, 1);
        chip8.cycle().expect("return failed");
        assert_eq!(chip8.state.pc, 0x202);
        assert_eq!(chip8.state.sp, 0);
    }

    #[test]
    fn test_load_rom_from_reader() {
        let mut chip8 = Chip8::new();
        let mut rom: &[u8] = &[0x00, 0xE0, 0x12, 0x00];
        assert_eq!(chip8.load_rom(&mut rom).ok(), Some(4));
        assert_eq!(chip8.state.memory[0x200..0x204], [0x00, 0xE0, 0x12, 0x00]);
    }

    /// Serves an endless stream of 0xAA, counting what it hands out
    struct EndlessRom {
        served: usize,
    }

    impl Read for EndlessRom {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            for byte in buf.iter_mut() {
                *byte = 0xAA;
            }
            self.served += buf.len();
            Ok(buf.len())
        }
    }

    #[test]
    fn test_load_rom_stops_reading_past_max_size() {
        let mut chip8 = with_program(Config::default(), &[0x12, 0x34]);
        let mut reader = EndlessRom { served: 0 };
        assert!(matches!(
            chip8.load_rom(&mut reader),
            Err(Chip8Error::RomTooLarge {
                size: 3585,
                max_size: 3584
            })
        ));
        assert!(reader.served <= MAX_ROM_SIZE + 1);
        assert_eq!(chip8.state.memory[0x200..0x203], [0x12, 0x34, 0x00]);
    }

    #[test]
    fn test_load_rom_restarts_execution() {
        let config = Config::default().with_key_wait(KeyWait::Latched);
        // V1 = 7; call 206; 206: wait for key
        let mut chip8 = with_program(config, &[0x61, 0x07, 0x22, 0x06, 0x00, 0x00, 0xF5, 0x0A]);
        for _ in 0..3 {
            chip8.cycle().expect("cycle failed");
        }
        chip8.state.delay_timer = 9;
        chip8.state.frame_buffer[0][0] = 1;
        assert_eq!(chip8.state.waiting_for_key, Some(0x5));
        chip8.key_press(0x2);

        chip8.load_rom_bytes(&[0x6A, 0x3C]).expect("reload failed");
        assert_eq!(chip8.state.pc, 0x200);
        assert_eq!(chip8.state.sp, 0);
        assert_eq!(chip8.state.v, [0; 16]);
        assert_eq!(chip8.state.delay_timer, 0);
        assert_eq!(chip8.state.waiting_for_key, None);
        assert!(chip8.video().iter().flatten().all(|&p| p == 0));
        assert!(chip8.keypad()[0x2]);

        // The new program runs from its first instruction rather than finishing the old wait
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.v[0xA], 0x3C);
        assert_eq!(chip8.state.v[0x5], 0x0);
        assert_eq!(chip8.state.pc, 0x202);
    }

    #[test]
    fn test_load_rom_clears_previous_program() {
        let mut chip8 = with_program(Config::default(), &[0xAA; 8]);
        chip8.load_rom_bytes(&[0x00, 0xE0]).expect("reload failed");
        assert_eq!(chip8.state.memory[0x200..0x204], [0x00, 0xE0, 0x00, 0x00]);
    }

    #[test]
    fn test_load_rom_fills_memory() {
        let mut chip8 = Chip8::new();
        let rom = vec![0x11; MAX_ROM_SIZE];
        assert_eq!(chip8.load_rom_bytes(&rom).ok(), Some(MAX_ROM_SIZE));
        assert_eq!(chip8.state.memory[MEMORY_SIZE - 1], 0x11);
    }

    #[test]
    fn test_load_rom_too_large_leaves_memory() {
        let mut chip8 = with_program(Config::default(), &[0x12, 0x34]);
        let rom = vec![0xFF; MAX_ROM_SIZE + 1];
        assert!(matches!(
            chip8.load_rom_bytes(&rom),
            Err(Chip8Error::RomTooLarge {
                size: 3585,
                max_size: 3584
            })
        ));
        assert_eq!(chip8.state.memory[0x200..0x203], [0x12, 0x34, 0x00]);
    }

    #[test]
    fn test_load_empty_rom() {
        let mut chip8 = Chip8::new();
        assert!(matches!(
            chip8.load_rom_bytes(&[]),
            Err(Chip8Error::EmptyRom)
        ));
    }

    #[test]
    fn test_load_rom_file_checks_extension() {
        let mut chip8 = Chip8::new();
        assert!(matches!(
            chip8.load_rom_file("roms/pong.txt"),
            Err(Chip8Error::InvalidExtension { .. })
        ));
        assert!(matches!(
            chip8.load_rom_file(""),
            Err(Chip8Error::InvalidExtension { .. })
        ));
    }

    #[test]
    fn test_load_missing_rom_file() {
        let mut chip8 = Chip8::new();
        assert!(matches!(
            chip8.load_rom_file("just/a/file.ch8"),
            Err(Chip8Error::Io(_))
        ));
    }

    #[test]
    fn test_load_rom_file() {
        let path = std::env::temp_dir().join(format!("emu8-{}.ch8", std::process::id()));
        std::fs::write(&path, [0x6Au8, 0x3C]).expect("unable to write ROM");
        let mut chip8 = Chip8::new();
        let loaded = chip8.load_rom_file(&path);
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.ok(), Some(2));
        chip8.cycle().expect("cycle failed");
        assert_eq!(chip8.state.v[0xA], 0x3C);
    }
}
