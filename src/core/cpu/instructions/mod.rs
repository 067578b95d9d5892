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

//! Instruction dispatch and the per-family implementations
//!
//! The primary opcode selects the family; opcode 0x00 dispatches again on
//! `funct`, opcode 0x01 on the `rt` field (the REGIMM branches).
//! Unknown encodings raise the Ri (reserved instruction) exception.

mod arithmetic;
mod branch;
mod cop;
mod exception;
mod jump;
mod logical;
mod memory;
mod multiply;
mod shift;

use super::{Cpu, ExceptionCause, Instruction};
use crate::core::bus::DataBus;
use crate::core::error::Result;

impl Cpu {
    /// Execute the current instruction
    pub(super) fn execute_instruction(&mut self, bus: &mut DataBus) -> Result<()> {
        let ins = self.ins;
        match ins.opcode() {
            0x00 => return self.execute_special(ins),
            0x01 => self.execute_regimm(ins),

            0x02 => self.op_j(ins),
            0x03 => self.op_jal(ins),

            0x04 => self.op_beq(ins),
            0x05 => self.op_bne(ins),
            0x06 => self.op_blez(ins),
            0x07 => self.op_bgtz(ins),

            0x08 => self.op_addi(ins),
            0x09 => self.op_addiu(ins),
            0x0A => self.op_slti(ins),
            0x0B => self.op_sltiu(ins),
            0x0C => self.op_andi(ins),
            0x0D => self.op_ori(ins),
            0x0F => self.op_lui(ins),

            0x10 => return self.op_cop0(ins),
            0x12 => self.op_cop2(ins),
            0x11 | 0x13 => {
                log::warn!(
                    "[CPU] instruction for unavailable coprocessor {}",
                    ins.cop_n()
                );
            }

            0x20 => self.op_lb(bus, ins),
            0x21 => self.op_lh(bus, ins),
            0x23 => self.op_lw(bus, ins),
            0x24 => self.op_lbu(bus, ins),
            0x25 => self.op_lhu(bus, ins),

            0x28 => self.op_sb(bus, ins),
            0x29 => self.op_sh(bus, ins),
            0x2B => self.op_sw(bus, ins),

            _ => self.unknown_instruction(ins),
        }
        Ok(())
    }

    /// Opcode 0x00: dispatch on `funct`
    fn execute_special(&mut self, ins: Instruction) -> Result<()> {
        match ins.funct() {
            0x00 => self.op_sll(ins),
            0x02 => self.op_srl(ins),
            0x03 => self.op_sra(ins),
            0x04 => self.op_sllv(ins),
            0x07 => self.op_srav(ins),

            0x08 => self.op_jr(ins),
            0x09 => self.op_jalr(ins),

            0x0C => self.op_syscall(ins),

            0x10 => self.op_mfhi(ins),
            0x11 => self.op_mthi(ins),
            0x12 => self.op_mflo(ins),
            0x13 => self.op_mtlo(ins),

            0x18 => self.op_mult(ins),
            0x19 => self.op_multu(ins),
            0x1A => self.op_div(ins),
            0x1B => self.op_divu(ins),

            0x20 => self.op_add(ins),
            0x21 => self.op_addu(ins),
            0x23 => self.op_subu(ins),
            0x24 => self.op_and(ins),
            0x25 => self.op_or(ins),
            0x27 => self.op_nor(ins),
            0x2A => self.op_slt(ins),
            0x2B => self.op_sltu(ins),

            _ => self.unknown_instruction(ins),
        }
        Ok(())
    }

    /// Opcode 0x01: the REGIMM branches, selected by the `rt` field
    fn execute_regimm(&mut self, ins: Instruction) {
        match ins.rt() {
            0x00 => self.op_bltz(ins),
            0x01 => self.op_bgez(ins),
            0x10 => self.op_bltzal(ins),
            0x11 => self.op_bgezal(ins),
            _ => self.unknown_instruction(ins),
        }
    }

    /// Unknown encoding: the hardware-faithful Ri exception
    fn unknown_instruction(&mut self, ins: Instruction) {
        log::warn!(
            "[CPU] reserved instruction pc={:08x} clock={} opcode={:#04x} funct={:#04x}",
            self.current_pc(),
            self.ticks(),
            ins.opcode(),
            ins.funct()
        );
        self.trap(ExceptionCause::ReservedInstruction);
    }
}
