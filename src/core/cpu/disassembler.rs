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

//! MIPS instruction disassembler
//!
//! Renders instruction words as assembly mnemonics for the execution
//! trace and for post-mortem logging. Covers the integer subset the
//! interpreter implements; anything else prints as a raw word.

use super::decode::Instruction;

/// Instruction-to-text renderer
///
/// # Example
///
/// ```
/// use psyx::core::cpu::{Disassembler, Instruction};
///
/// let text = Disassembler::disassemble(Instruction(0x3C01_1F80), 0xBFC0_0000);
/// assert_eq!(text, "lui r1, 0x1f80");
/// ```
pub struct Disassembler;

impl Disassembler {
    /// Disassemble one instruction
    ///
    /// `pc` is the address of the instruction itself, used to resolve
    /// jump targets.
    pub fn disassemble(ins: Instruction, pc: u32) -> String {
        match ins.opcode() {
            0x00 => Self::special(ins),
            0x01 => Self::regimm(ins),
            0x02 => format!("j 0x{:08x}", Self::jump_target(ins, pc)),
            0x03 => format!("jal 0x{:08x}", Self::jump_target(ins, pc)),
            0x04 => format!("beq r{}, r{}, {}", ins.rs(), ins.rt(), ins.imm()),
            0x05 => format!("bne r{}, r{}, {}", ins.rs(), ins.rt(), ins.imm()),
            0x06 => format!("blez r{}, {}", ins.rs(), ins.imm()),
            0x07 => format!("bgtz r{}, {}", ins.rs(), ins.imm()),
            0x08 => format!("addi r{}, r{}, {}", ins.rt(), ins.rs(), ins.imm()),
            0x09 => format!("addiu r{}, r{}, {}", ins.rt(), ins.rs(), ins.imm()),
            0x0A => format!("slti r{}, r{}, {}", ins.rt(), ins.rs(), ins.imm()),
            0x0B => format!("sltiu r{}, r{}, {}", ins.rt(), ins.rs(), ins.imm()),
            0x0C => format!("andi r{}, r{}, 0x{:x}", ins.rt(), ins.rs(), ins.uimm()),
            0x0D => format!("ori r{}, r{}, 0x{:x}", ins.rt(), ins.rs(), ins.uimm()),
            0x0F => format!("lui r{}, 0x{:x}", ins.rt(), ins.uimm()),
            0x10 => Self::cop0(ins),
            0x11 | 0x12 | 0x13 => format!("cop{} 0x{:07x}", ins.cop_n(), ins.cop_fn()),
            0x20 => Self::mem("lb", ins),
            0x21 => Self::mem("lh", ins),
            0x23 => Self::mem("lw", ins),
            0x24 => Self::mem("lbu", ins),
            0x25 => Self::mem("lhu", ins),
            0x28 => Self::mem("sb", ins),
            0x29 => Self::mem("sh", ins),
            0x2B => Self::mem("sw", ins),
            _ => format!(".word 0x{:08x}", ins.0),
        }
    }

    fn jump_target(ins: Instruction, pc: u32) -> u32 {
        (pc & 0xF000_0000) | (ins.target() << 2)
    }

    fn mem(mnemonic: &str, ins: Instruction) -> String {
        format!(
            "{} r{}, {}(r{})",
            mnemonic,
            ins.rt(),
            ins.imm(),
            ins.rs()
        )
    }

    fn special(ins: Instruction) -> String {
        match ins.funct() {
            0x00 if ins.0 == 0 => "nop".to_string(),
            0x00 => format!("sll r{}, r{}, {}", ins.rd(), ins.rt(), ins.shamt()),
            0x02 => format!("srl r{}, r{}, {}", ins.rd(), ins.rt(), ins.shamt()),
            0x03 => format!("sra r{}, r{}, {}", ins.rd(), ins.rt(), ins.shamt()),
            0x04 => format!("sllv r{}, r{}, r{}", ins.rd(), ins.rt(), ins.rs()),
            0x07 => format!("srav r{}, r{}, r{}", ins.rd(), ins.rt(), ins.rs()),
            0x08 => format!("jr r{}", ins.rs()),
            0x09 => format!("jalr r{}, r{}", ins.rd(), ins.rs()),
            0x0C => "syscall".to_string(),
            0x10 => format!("mfhi r{}", ins.rd()),
            0x11 => format!("mthi r{}", ins.rs()),
            0x12 => format!("mflo r{}", ins.rd()),
            0x13 => format!("mtlo r{}", ins.rs()),
            0x18 => format!("mult r{}, r{}", ins.rs(), ins.rt()),
            0x19 => format!("multu r{}, r{}", ins.rs(), ins.rt()),
            0x1A => format!("div r{}, r{}", ins.rs(), ins.rt()),
            0x1B => format!("divu r{}, r{}", ins.rs(), ins.rt()),
            0x20 => format!("add r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x21 => format!("addu r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x23 => format!("subu r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x24 => format!("and r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x25 => format!("or r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x27 => format!("nor r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x2A => format!("slt r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            0x2B => format!("sltu r{}, r{}, r{}", ins.rd(), ins.rs(), ins.rt()),
            _ => format!(".word 0x{:08x}", ins.0),
        }
    }

    fn regimm(ins: Instruction) -> String {
        let mnemonic = match ins.rt() {
            0x00 => "bltz",
            0x01 => "bgez",
            0x10 => "bltzal",
            0x11 => "bgezal",
            _ => return format!(".word 0x{:08x}", ins.0),
        };
        format!("{} r{}, {}", mnemonic, ins.rs(), ins.imm())
    }

    fn cop0(ins: Instruction) -> String {
        if ins.is_cop_fn() {
            return match ins.cop_fn() {
                0x10 => "rfe".to_string(),
                fun => format!("cop0 0x{:07x}", fun),
            };
        }
        match ins.cop_subop() {
            0x00 => format!("mfc0 r{}, cop0r{}", ins.rt(), ins.rd()),
            0x04 => format!("mtc0 r{}, cop0r{}", ins.rt(), ins.rd()),
            _ => format!("cop0 0x{:07x}", ins.cop_fn()),
        }
    }
}
