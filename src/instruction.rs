use crate::config::KeyWait;
use crate::error::Result;
use crate::opcode::Opcode;
use crate::operations::*;
use crate::state::State;

/// # Dispatch
/// Selects the handler for an Opcode in two constant-time lookups.
///
/// The main table is indexed by the Opcode's family. Families with a single meaning point
/// straight at their handler; families `0`, `8`, `E` and `F` are resolved again by a sub-table:
/// ```text
/// 0 -> table_0[kk]    00E0 00EE
/// 8 -> table_8[n]     8xy0..8xy7 8xyE
/// E -> table_e[kk]    Ex9E ExA1
/// F -> table_f[kk]    Fx07 Fx0A Fx15 Fx18 Fx1E Fx29 Fx33 Fx55 Fx65
/// ```
/// Every slot without a defined operation holds `null`.
pub struct Dispatch {
    main: [Entry; 16],
    table_0: [Handler; 256],
    table_8: [Handler; 16],
    table_e: [Handler; 256],
    table_f: [Handler; 256],
}

/// A slot of the main table: either a handler or the sub-table that resolves the family.
#[derive(Copy, Clone)]
enum Entry {
    Op(Handler),
    Table0,
    Table8,
    TableE,
    TableF,
}

impl Dispatch {
    /// Builds the tables, installing the `Fx0A` handler for the given key wait policy.
    pub fn new(key_wait: KeyWait) -> Self {
        let main = [
            Entry::Table0,
            Entry::Op(jump),
            Entry::Op(call),
            Entry::Op(ske),
            Entry::Op(skne),
            Entry::Op(skre),
            Entry::Op(load),
            Entry::Op(add),
            Entry::Table8,
            Entry::Op(skrne),
            Entry::Op(loadi),
            Entry::Op(jumpi),
            Entry::Op(rnd),
            Entry::Op(draw),
            Entry::TableE,
            Entry::TableF,
        ];

        let mut table_0: [Handler; 256] = [null; 256];
        table_0[0xE0] = clr;
        table_0[0xEE] = rts;

        let mut table_8: [Handler; 16] = [null; 16];
        table_8[0x0] = mv;
        table_8[0x1] = or;
        table_8[0x2] = and;
        table_8[0x3] = xor;
        table_8[0x4] = addr;
        table_8[0x5] = sub;
        table_8[0x6] = shr;
        table_8[0x7] = subn;
        table_8[0xE] = shl;

        let mut table_e: [Handler; 256] = [null; 256];
        table_e[0x9E] = skpr;
        table_e[0xA1] = skup;

        let mut table_f: [Handler; 256] = [null; 256];
        table_f[0x07] = rddt;
        table_f[0x0A] = match key_wait {
            KeyWait::Reexecute => keyd,
            KeyWait::Latched => keyd_latched,
        };
        table_f[0x15] = lddt;
        table_f[0x18] = ldst;
        table_f[0x1E] = addi;
        table_f[0x29] = ldspr;
        table_f[0x33] = bcd;
        table_f[0x55] = stor;
        table_f[0x65] = read;

        Dispatch {
            main,
            table_0,
            table_8,
            table_e,
            table_f,
        }
    }

    /// Selects the correct handler for a given Opcode
    pub fn handler(&self, op: Opcode) -> Handler {
        match self.main[op.family() as usize] {
            Entry::Op(handler) => handler,
            Entry::Table0 => self.table_0[op.kk() as usize],
            Entry::Table8 => self.table_8[op.n() as usize],
            Entry::TableE => self.table_e[op.kk() as usize],
            Entry::TableF => self.table_f[op.kk() as usize],
        }
    }

    /// Looks up and runs the handler for `op`
    pub fn execute(&self, state: &mut State, op: Opcode) -> Result<()> {
        self.handler(op)(state, op)
    }
}

impl Default for Dispatch {
    fn default() -> Self {
        Dispatch::new(KeyWait::default())
    }
}
