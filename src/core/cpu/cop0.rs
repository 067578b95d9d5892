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

//! Coprocessor 0 (system control)
//!
//! Cop0 provides the exception machinery: the status register with its
//! three-deep {interrupt-enable, kernel/user} mode stack, the cause and
//! EPC registers, and the external interrupt line shared with the
//! interrupt controller.
//!
//! SR layout used by the core:
//!
//! ```text
//! 0      IEc   current interrupts enabled
//! 1      KUc   current kernel (1) / user (0)
//! 2-5    IEp,KUp,IEo,KUo   previous and old mode pairs
//! 8-15   IM    interrupt mask
//! 16     IsC   data cache isolated
//! 22     BEV   boot exception vectors in ROM
//! ```

use crate::core::bitmask::BitMask;
use crate::core::interrupt::IrqLine;

/// Fields of the status register
pub mod sr_bits {
    use super::BitMask;

    pub const IEC: BitMask<u32> = BitMask::<u32>::of(0x0000_0001);
    pub const KUC: BitMask<u32> = BitMask::<u32>::of(0x0000_0002);

    /// The three {IE, KU} pairs forming the mode stack
    pub const MODE_STACK: BitMask<u32> = BitMask::<u32>::of(0x0000_003F);

    pub const IM: BitMask<u32> = BitMask::<u32>::of(0x0000_FF00);
    pub const ISC: BitMask<u32> = BitMask::<u32>::of(0x0001_0000);
    pub const BEV: BitMask<u32> = BitMask::<u32>::of(0x0040_0000);
}

/// Fields of the cause register
pub mod cause_bits {
    use super::BitMask;

    pub const EXC_CODE: BitMask<u32> = BitMask::<u32>::of(0x0000_007C);
    pub const IP: BitMask<u32> = BitMask::<u32>::of(0x0000_FF00);

    /// The hardware interrupt line driven by the interrupt controller
    pub const IP2: BitMask<u32> = BitMask::<u32>::of(0x0000_0400);
}

/// Exception cause codes written to `Cause.ExcCode`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ExceptionCause {
    /// External interrupt
    Interrupt = 0,
    /// TLB modification (unused on the PSX, kept for completeness)
    TlbModification = 1,
    /// TLB load miss
    TlbLoad = 2,
    /// TLB store miss
    TlbStore = 3,
    /// Address error on load or instruction fetch
    AddressErrorLoad = 4,
    /// Address error on store
    AddressErrorStore = 5,
    /// Bus error on instruction fetch
    BusErrorInstruction = 6,
    /// Bus error on data access
    BusErrorData = 7,
    /// SYSCALL instruction
    Syscall = 8,
    /// BREAK instruction
    Breakpoint = 9,
    /// Reserved or unknown instruction
    ReservedInstruction = 10,
    /// Instruction for a missing coprocessor
    CoprocessorUnusable = 11,
    /// Two's-complement overflow on a signed add
    Overflow = 12,
}

/// Cop0 register file and exception state machine
pub struct Cop0 {
    /// The 32 control registers
    pub(super) regs: [u32; 32],

    /// External interrupt line, driven by the interrupt controller
    line: IrqLine,
}

impl Cop0 {
    /// Bad Virtual Address
    pub const BAD_VADDR: usize = 8;
    /// Status Register
    pub const SR: usize = 12;
    /// Cause Register
    pub const CAUSE: usize = 13;
    /// Exception PC
    pub const EPC: usize = 14;
    /// Processor ID
    pub const PRID: usize = 15;

    /// R3000A processor identifier
    const PRID_RESET: u32 = 0x0000_0002;

    pub fn new(line: IrqLine) -> Self {
        let mut cop0 = Self {
            regs: [0u32; 32],
            line,
        };
        cop0.reset();
        cop0
    }

    /// Reset to power-on state: registers cleared, boot vectors in ROM
    pub fn reset(&mut self) {
        self.regs = [0u32; 32];
        sr_bits::BEV.set(&mut self.regs[Self::SR], 1);
        self.regs[Self::PRID] = Self::PRID_RESET;
    }

    pub fn read_reg(&self, index: u8) -> u32 {
        self.regs[index as usize]
    }

    pub fn write_reg(&mut self, index: u8, value: u32) {
        self.regs[index as usize] = value;
    }

    pub fn sr(&self) -> u32 {
        self.regs[Self::SR]
    }

    pub fn cause(&self) -> u32 {
        self.regs[Self::CAUSE]
    }

    pub fn epc(&self) -> u32 {
        self.regs[Self::EPC]
    }

    pub fn set_epc(&mut self, epc: u32) {
        self.regs[Self::EPC] = epc;
    }

    pub fn bad_vaddr(&self) -> u32 {
        self.regs[Self::BAD_VADDR]
    }

    pub fn set_bad_vaddr(&mut self, addr: u32) {
        self.regs[Self::BAD_VADDR] = addr;
    }

    /// Boot exception vectors in ROM?
    pub fn bev(&self) -> bool {
        sr_bits::BEV.test(self.sr())
    }

    /// Data cache isolated?
    pub fn cache_isolated(&self) -> bool {
        sr_bits::ISC.test(self.sr())
    }

    /// Enter an exception: push the mode stack and record the cause
    ///
    /// SR bits 0..5 shift left by two, the current mode becomes
    /// {kernel, interrupts disabled}, and `code` lands in Cause.ExcCode.
    /// The caller has already written EPC.
    pub fn enter_exception(&mut self, code: ExceptionCause) {
        let sr = &mut self.regs[Self::SR];
        sr_bits::MODE_STACK.shl(sr, 2);
        sr_bits::KUC.set(sr, 1);
        sr_bits::IEC.set(sr, 0);

        cause_bits::EXC_CODE.set(&mut self.regs[Self::CAUSE], code as u32);
    }

    /// RFE: pop the mode stack
    ///
    /// SR bits 0..5 shift right by two into positions 0..3; the old pair
    /// in bits 4..5 stays in place.
    pub fn restore_from_exception(&mut self) {
        let sr = &mut self.regs[Self::SR];
        let stack = sr_bits::MODE_STACK.get(*sr);
        let popped = (stack >> 2) | (stack & 0x30);
        sr_bits::MODE_STACK.set(sr, popped);
    }

    /// Sample the external interrupt line
    pub fn irq_asserted(&self) -> bool {
        self.line.asserted()
    }

    /// Mirror the interrupt line into Cause.IP2
    pub fn set_cause_ip2(&mut self, asserted: bool) {
        cause_bits::IP2.set(&mut self.regs[Self::CAUSE], asserted as u32);
    }
}
