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

//! Shift instructions
//!
//! The variable forms use only the low 5 bits of rs as the shift count.

use super::super::{Cpu, Instruction};

impl Cpu {
    /// SLL: rd = rt << shamt
    pub(crate) fn op_sll(&mut self, ins: Instruction) {
        let result = self.reg(ins.rt()) << ins.shamt();
        self.set_reg(ins.rd(), result);
    }

    /// SRL: rd = rt >> shamt, zero filling
    pub(crate) fn op_srl(&mut self, ins: Instruction) {
        let result = self.reg(ins.rt()) >> ins.shamt();
        self.set_reg(ins.rd(), result);
    }

    /// SRA: rd = rt >> shamt, sign filling
    pub(crate) fn op_sra(&mut self, ins: Instruction) {
        let result = (self.reg(ins.rt()) as i32) >> ins.shamt();
        self.set_reg(ins.rd(), result as u32);
    }

    /// SLLV: rd = rt << (rs & 0x1F)
    pub(crate) fn op_sllv(&mut self, ins: Instruction) {
        let result = self.reg(ins.rt()) << (self.reg(ins.rs()) & 0x1F);
        self.set_reg(ins.rd(), result);
    }

    /// SRAV: rd = rt >> (rs & 0x1F), sign filling
    pub(crate) fn op_srav(&mut self, ins: Instruction) {
        let result = (self.reg(ins.rt()) as i32) >> (self.reg(ins.rs()) & 0x1F);
        self.set_reg(ins.rd(), result as u32);
    }
}
