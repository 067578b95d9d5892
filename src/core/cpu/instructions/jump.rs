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

//! Jumps
//!
//! J-type targets replace the low 28 bits of `pc`, keeping the upper 4.
//! The link registers receive `npc`, the address after the delay slot.

use super::super::{Cpu, Instruction};

impl Cpu {
    /// J: jump within the current 256 MiB window
    pub(crate) fn op_j(&mut self, ins: Instruction) {
        self.npc = (self.pc & 0xF000_0000) | (ins.target() << 2);
    }

    /// JAL: jump and link through r31
    pub(crate) fn op_jal(&mut self, ins: Instruction) {
        self.set_reg(31, self.npc);
        self.op_j(ins);
    }

    /// JR: jump to the address in rs
    pub(crate) fn op_jr(&mut self, ins: Instruction) {
        self.npc = self.reg(ins.rs());
    }

    /// JALR: jump to rs, linking through rd
    ///
    /// The target is read before the link lands, so `jalr r, r` jumps to
    /// the old register value.
    pub(crate) fn op_jalr(&mut self, ins: Instruction) {
        let target = self.reg(ins.rs());
        self.set_reg(ins.rd(), self.npc);
        self.npc = target;
    }
}
