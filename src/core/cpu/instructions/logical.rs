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

//! Bitwise instructions
//!
//! The immediate forms zero-extend their operand; LUI fills the upper
//! halfword and clears the lower one.

use super::super::{Cpu, Instruction};

impl Cpu {
    /// AND: rd = rs & rt
    pub(crate) fn op_and(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()) & self.reg(ins.rt());
        self.set_reg(ins.rd(), result);
    }

    /// OR: rd = rs | rt
    pub(crate) fn op_or(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()) | self.reg(ins.rt());
        self.set_reg(ins.rd(), result);
    }

    /// NOR: rd = !(rs | rt)
    pub(crate) fn op_nor(&mut self, ins: Instruction) {
        let result = !(self.reg(ins.rs()) | self.reg(ins.rt()));
        self.set_reg(ins.rd(), result);
    }

    /// ANDI: rt = rs & zero-extended immediate
    pub(crate) fn op_andi(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()) & ins.uimm();
        self.set_reg(ins.rt(), result);
    }

    /// ORI: rt = rs | zero-extended immediate
    pub(crate) fn op_ori(&mut self, ins: Instruction) {
        let result = self.reg(ins.rs()) | ins.uimm();
        self.set_reg(ins.rt(), result);
    }

    /// LUI: rt = immediate << 16
    pub(crate) fn op_lui(&mut self, ins: Instruction) {
        self.set_reg(ins.rt(), ins.uimm() << 16);
    }
}
