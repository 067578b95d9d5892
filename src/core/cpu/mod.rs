// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 psyx developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! CPU (MIPS R3000A) emulation
//!
//! A cycle-stepped interpreter. Each cycle prefetches the word at `npc`,
//! advances the program counter pair, executes the previously prefetched
//! instruction, then rotates the prefetch register:
//!
//! ```text
//! next_ins <- bus[npc]
//! pc <- npc; npc <- npc + 4
//! execute(ins)                 // may redirect npc (branch)
//! ins <- next_ins
//! ```
//!
//! Because a taken branch only writes `npc`, the already-prefetched word
//! still executes before control transfers: the branch delay slot falls
//! out of the pipeline shape. During execution `pc` points at the delay
//! slot, which is also the base hardware uses for branch displacements.
//!
//! Loads honour the R3000 load delay: the value is queued and committed
//! at the top of the following cycle.
//!
//! Exceptions never unwind the host: they push the cop0 mode stack and
//! redirect `npc` to the vector selected by `SR.BEV`.

use crate::core::bus::DataBus;
use crate::core::error::{EmulatorError, Result};
use crate::core::interrupt::IrqLine;

mod cop0;
mod decode;
mod disassembler;
mod instructions;

pub use cop0::{cause_bits, sr_bits, Cop0, ExceptionCause};
pub use decode::Instruction;
pub use disassembler::Disassembler;

/// A load waiting for its commit cycle
#[derive(Debug, Clone, Copy)]
struct LoadDelay {
    reg: u8,
    value: u32,
}

/// The MIPS R3000A core
pub struct Cpu {
    /// Cycle counter, advanced once per executed instruction
    clock: u64,

    /// General purpose registers; r0 reads as zero
    regs: [u32; 32],

    /// Multiplier/divider outputs
    hi: u32,
    lo: u32,

    /// Address of the *delay slot* of the executing instruction
    pc: u32,
    /// Address the next prefetch reads from
    npc: u32,

    /// The instruction executing this cycle
    ins: Instruction,
    /// The prefetched instruction
    next_ins: Instruction,

    /// Pending load, committed at the top of the next cycle
    load_delay: Option<LoadDelay>,

    /// Coprocessor 0
    cop0: Cop0,
}

impl Cpu {
    /// Execution starts at the first ROM word
    pub const RESET_VECTOR: u32 = 0x1FC0_0000;

    /// General exception vector (SR.BEV = 0)
    pub const EXC_VECTOR: u32 = 0x8000_0080;

    /// Boot-time exception vector in ROM (SR.BEV = 1)
    pub const ROM_EXC_VECTOR: u32 = 0xBFC0_0180;

    /// Size in bytes of the serialized CPU block in a board dump
    pub const DUMP_SIZE: usize = 8 + 4 * 4 + 32 * 4 + 2 * 4 + 32 * 4;

    pub fn new(line: IrqLine) -> Self {
        let mut cpu = Self {
            clock: 0,
            regs: [0u32; 32],
            hi: 0,
            lo: 0,
            pc: 0,
            npc: 0,
            ins: Instruction::NOP,
            next_ins: Instruction::NOP,
            load_delay: None,
            cop0: Cop0::new(line),
        };
        cpu.reset();
        cpu
    }

    /// Return to the power-on state
    ///
    /// The pipeline is primed with NOPs and `pc` trails the reset vector
    /// by one slot, so the first prefetched word is `bus[RESET_VECTOR]`.
    pub fn reset(&mut self) {
        self.clock = 0;
        self.regs = [0u32; 32];
        self.hi = 0;
        self.lo = 0;
        self.ins = Instruction::NOP;
        self.next_ins = Instruction::NOP;
        self.pc = Self::RESET_VECTOR.wrapping_sub(4);
        self.npc = Self::RESET_VECTOR;
        self.load_delay = None;
        self.cop0.reset();
    }

    /// Read a general purpose register; r0 is hardwired to zero
    #[inline(always)]
    pub fn reg(&self, index: u8) -> u32 {
        if index == 0 {
            0
        } else {
            self.regs[index as usize]
        }
    }

    /// Write a general purpose register; writes to r0 are discarded
    #[inline(always)]
    pub fn set_reg(&mut self, index: u8, value: u32) {
        if index != 0 {
            self.regs[index as usize] = value;
        }
    }

    /// Queue a register write behind the load delay slot
    ///
    /// A pending load is committed first, then the new one takes the
    /// slot. The commit for a lone load happens at the top of the next
    /// cycle.
    fn set_reg_delayed(&mut self, index: u8, value: u32) {
        if let Some(delay) = self.load_delay.take() {
            self.set_reg(delay.reg, delay.value);
        }
        if index != 0 {
            self.load_delay = Some(LoadDelay { reg: index, value });
        }
    }

    pub fn ticks(&self) -> u64 {
        self.clock
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn npc(&self) -> u32 {
        self.npc
    }

    pub fn hi(&self) -> u32 {
        self.hi
    }

    pub fn lo(&self) -> u32 {
        self.lo
    }

    pub fn cop0(&self) -> &Cop0 {
        &self.cop0
    }

    pub fn cop0_mut(&mut self) -> &mut Cop0 {
        &mut self.cop0
    }

    /// Address of the instruction executing this cycle
    fn current_pc(&self) -> u32 {
        self.pc.wrapping_sub(4)
    }

    /// Run until `clock >= until`
    ///
    /// # Errors
    ///
    /// [`EmulatorError::UnimplementedCop`] for coprocessor control
    /// commands outside the implemented set; everything else is modelled
    /// inside the machine and never unwinds.
    pub fn run(&mut self, bus: &mut DataBus, until: u64) -> Result<()> {
        while self.clock < until {
            self.clock += 1;

            if self.pending_interrupt() {
                self.dispatch_interrupt();
            }

            // commit the load delay scheduled by the previous instruction
            if let Some(delay) = self.load_delay.take() {
                self.set_reg(delay.reg, delay.value);
            }

            // prefetch the next instruction
            self.next_ins = Instruction(bus.read32(self.npc));

            // pc now points at the delay slot, npc past it
            self.pc = self.npc;
            self.npc = self.npc.wrapping_add(4);

            if log::log_enabled!(log::Level::Trace) {
                log::trace!(
                    "{:08x}@{}: {}",
                    self.current_pc(),
                    self.clock,
                    Disassembler::disassemble(self.ins, self.current_pc())
                );
            }

            self.execute_instruction(bus)?;

            self.ins = self.next_ins;
        }
        Ok(())
    }

    /// Raise a synchronous exception for the executing instruction
    ///
    /// EPC receives the offending instruction's address and `npc` is
    /// redirected to the active vector; the already-prefetched delay
    /// slot still runs before the handler, as on hardware.
    pub fn trap(&mut self, code: ExceptionCause) {
        self.cop0.set_epc(self.current_pc());
        self.cop0.enter_exception(code);
        self.npc = if self.cop0.bev() {
            Self::ROM_EXC_VECTOR
        } else {
            Self::EXC_VECTOR
        };
    }

    /// Mirror the interrupt line into Cause.IP2 and apply the SR gates
    fn pending_interrupt(&mut self) -> bool {
        let asserted = self.cop0.irq_asserted();
        self.cop0.set_cause_ip2(asserted);

        let sr = self.cop0.sr();
        if !sr_bits::IEC.test(sr) {
            return false;
        }
        let pending = cause_bits::IP.get(self.cop0.cause());
        let mask = sr_bits::IM.get(sr);
        pending & mask != 0
    }

    /// Take an external interrupt
    ///
    /// The instruction about to execute is squashed and its address
    /// written to EPC, so it re-runs once the handler returns.
    fn dispatch_interrupt(&mut self) {
        log::debug!("[CPU] interrupt dispatch at pc={:08x}", self.pc);
        self.cop0.set_epc(self.pc);
        self.cop0.enter_exception(ExceptionCause::Interrupt);
        self.ins = Instruction::NOP;
        self.npc = if self.cop0.bev() {
            Self::ROM_EXC_VECTOR
        } else {
            Self::EXC_VECTOR
        };
    }

    /// Aligned load; a misaligned address traps AdEL and yields nothing
    fn load(&mut self, bus: &DataBus, addr: u32, size: u32) -> Option<u32> {
        let mask = size - 1;
        if addr & mask != 0 {
            log::error!("[CPU] unaligned read of {} bytes at {:08x}", size, addr);
            self.cop0.set_bad_vaddr(addr);
            self.trap(ExceptionCause::AddressErrorLoad);
            return None;
        }
        Some(match size {
            1 => bus.read8(addr) as u32,
            2 => bus.read16(addr) as u32,
            _ => bus.read32(addr),
        })
    }

    /// Aligned store; misalignment traps AdES, cache isolation swallows
    fn store(&mut self, bus: &mut DataBus, addr: u32, size: u32, value: u32) {
        let mask = size - 1;
        if addr & mask != 0 {
            log::error!("[CPU] unaligned write of {} bytes at {:08x}", size, addr);
            self.cop0.set_bad_vaddr(addr);
            self.trap(ExceptionCause::AddressErrorStore);
            return;
        }

        if self.cop0.cache_isolated() {
            // the data cache is scratch-pad while isolated; drop the write
            if value != 0 {
                log::warn!(
                    "[CPU] non-zero write on an isolated cache, addr={:08x} val={:08x}",
                    addr,
                    value
                );
            }
            return;
        }

        match size {
            1 => bus.write8(addr, value as u8),
            2 => bus.write16(addr, value as u16),
            _ => bus.write32(addr, value),
        }
    }

    /// Serialize the CPU block of a board dump (little-endian)
    pub fn dump(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.clock.to_le_bytes());
        out.extend_from_slice(&self.ins.0.to_le_bytes());
        out.extend_from_slice(&self.pc.to_le_bytes());
        out.extend_from_slice(&self.next_ins.0.to_le_bytes());
        out.extend_from_slice(&self.npc.to_le_bytes());
        for reg in &self.regs {
            out.extend_from_slice(&reg.to_le_bytes());
        }
        out.extend_from_slice(&self.lo.to_le_bytes());
        out.extend_from_slice(&self.hi.to_le_bytes());
        for reg in &self.cop0.regs {
            out.extend_from_slice(&reg.to_le_bytes());
        }
    }

    /// Restore the CPU block of a board dump
    pub fn restore(&mut self, bytes: &[u8]) -> Result<()> {
        if bytes.len() < Self::DUMP_SIZE {
            return Err(EmulatorError::TruncatedDump("cpu state"));
        }

        fn next_u32(bytes: &[u8], at: &mut usize) -> u32 {
            let v = u32::from_le_bytes(bytes[*at..*at + 4].try_into().unwrap());
            *at += 4;
            v
        }

        self.clock = u64::from_le_bytes(bytes[0..8].try_into().unwrap());
        let mut at = 8usize;
        self.ins = Instruction(next_u32(bytes, &mut at));
        self.pc = next_u32(bytes, &mut at);
        self.next_ins = Instruction(next_u32(bytes, &mut at));
        self.npc = next_u32(bytes, &mut at);
        for ix in 0..32 {
            self.regs[ix] = next_u32(bytes, &mut at);
        }
        self.lo = next_u32(bytes, &mut at);
        self.hi = next_u32(bytes, &mut at);
        for ix in 0..32 {
            self.cop0.regs[ix] = next_u32(bytes, &mut at);
        }
        self.load_delay = None;
        Ok(())
    }
}
