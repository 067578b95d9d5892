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

//! Add, subtract and compare instructions
//!
//! The signed adds (ADD, ADDI) trap with the Ov exception on
//! two's-complement overflow and leave the destination untouched; the
//! unsigned forms wrap. Despite its name, ADDIU sign-extends its
//! immediate like ADDI does.

use super::super::{Cpu, ExceptionCause, Instruction};

impl Cpu {
    /// ADD: add word, trapping on signed overflow
    ///
    /// Operation: rd = rs + rt
    pub(crate) fn op_add(&mut self, ins: Instruction) {
        let a = self.reg(ins.rs()) as i32;
        let b = self.reg(ins.rt()) as i32;
        match a.checked_add(b) {
            Some(result) => self.set_reg(ins.rd(), result as u32),
            None => self.trap(ExceptionCause::Overflow),
        }
    }

    /// ADDU: add word, wrapping
    ///
    /// Operation: rd = rs + rt
    pub(crate) fn op_addu(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()).wrapping_add(self.reg(ins.rt()));
        self.set_reg(ins.rd(), result);
    }

    /// SUBU: subtract word, wrapping
    ///
    /// Operation: rd = rs - rt
    pub(crate) fn op_subu(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()).wrapping_sub(self.reg(ins.rt()));
        self.set_reg(ins.rd(), result);
    }

    /// ADDI: add sign-extended immediate, trapping on signed overflow
    ///
    /// Operation: rt = rs + imm
    pub(crate) fn op_addi(&mut self, ins: Instruction) {
        let a = self.reg(ins.rs()) as i32;
        match a.checked_add(ins.imm()) {
            Some(result) => self.set_reg(ins.rt(), result as u32),
            None => self.trap(ExceptionCause::Overflow),
        }
    }

    /// ADDIU: add sign-extended immediate, wrapping
    pub(crate) fn op_addiu(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()).wrapping_add(ins.imm() as u32);
        self.set_reg(ins.rt(), result);
    }

    /// SLT: set on less than (signed)
    pub(crate) fn op_slt(&mut self, ins: Instruction) {
        let less = (self.reg(ins.rs()) as i32) < (self.reg(ins.rt()) as i32);
        self.set_reg(ins.rd(), less as u32);
    }

    /// SLTU: set on less than (unsigned)
    pub(crate) fn op_sltu(&mut self, ins: Instruction) {
        let less = self.reg(ins.rs()) < self.reg(ins.rt());
        self.set_reg(ins.rd(), less as u32);
    }

    /// SLTI: set on less than sign-extended immediate (signed compare)
    pub(crate) fn op_slti(&mut self, ins: Instruction) {
        let less = (self.reg(ins.rs()) as i32) < ins.imm();
        self.set_reg(ins.rt(), less as u32);
    }

    /// SLTIU: set on less than sign-extended immediate (unsigned compare)
    pub(crate) fn op_sltiu(&mut self, ins: Instruction) {
        let less = self.reg(ins.rs()) < ins.imm() as u32;
        self.set_reg(ins.rt(), less as u32);
    }
}
