use std::fmt;
use std::str::FromStr;

/// How `Fx0A` blocks until a key is pressed.
///
/// Both policies leave the program counter on the `Fx0A` instruction while waiting
/// and move it past the instruction once a key is seen.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum KeyWait {
    /// Rewind the program counter so the instruction is fetched and executed again next cycle.
    Reexecute,
    /// Record the waiting register and poll the keypad once per cycle without fetching.
    Latched,
}

impl Default for KeyWait {
    fn default() -> Self {
        KeyWait::Reexecute
    }
}

impl FromStr for KeyWait {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "reexecute" => Ok(KeyWait::Reexecute),
            "latched" => Ok(KeyWait::Latched),
            other => Err(format!(
                "unknown key wait policy {:?}, expected \"reexecute\" or \"latched\"",
                other
            )),
        }
    }
}

impl fmt::Display for KeyWait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyWait::Reexecute => write!(f, "reexecute"),
            KeyWait::Latched => write!(f, "latched"),
        }
    }
}

/// # Config
/// Interpreter behavior that is fixed for the lifetime of a `Chip8`.
///
/// - `key_wait` the `Fx0A` policy installed in the dispatch tables
/// - `cycles_per_timer_tick` how many cycles pass between timer decrements
/// - `seed` seeds the random source used by `Cxkk`; `None` seeds from the OS
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Config {
    pub key_wait: KeyWait,
    pub cycles_per_timer_tick: u8,
    pub seed: Option<u64>,
}

impl Config {
    pub fn with_key_wait(mut self, key_wait: KeyWait) -> Self {
        self.key_wait = key_wait;
        self
    }

    /// A value of 0 is treated as 1.
    pub fn with_cycles_per_timer_tick(mut self, cycles: u8) -> Self {
        self.cycles_per_timer_tick = cycles.max(1);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            key_wait: KeyWait::default(),
            cycles_per_timer_tick: 1,
            seed: None,
        }
    }
}
