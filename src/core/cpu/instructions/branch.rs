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

//! Conditional branches
//!
//! The displacement is the sign-extended immediate scaled by 4, added to
//! the address of the delay slot (which is what `pc` holds during
//! execution). A taken branch only writes `npc`, so the delay slot runs
//! before control transfers.
//!
//! The REGIMM link variants write r31 unconditionally, before the branch
//! test resolves; the condition itself is evaluated on the pre-link
//! register values.

use super::super::{Cpu, Instruction};

impl Cpu {
    /// Redirect `npc` to the branch target
    fn take_branch(&mut self, ins: Instruction) {
        self.npc = self.pc.wrapping_add((ins.imm() << 2) as u32);
    }

    /// BEQ: branch when rs == rt
    pub(crate) fn op_beq(&mut self, ins: Instruction) {
        if self.reg(ins.rs()) == self.reg(ins.rt()) {
            self.take_branch(ins);
        }
    }

    /// BNE: branch when rs != rt
    pub(crate) fn op_bne(&mut self, ins: Instruction) {
        if self.reg(ins.rs()) != self.reg(ins.rt()) {
            self.take_branch(ins);
        }
    }

    /// BLEZ: branch when rs <= 0 (signed)
    pub(crate) fn op_blez(&mut self, ins: Instruction) {
        if self.reg(ins.rs()) as i32 <= 0 {
            self.take_branch(ins);
        }
    }

    /// BGTZ: branch when rs > 0 (signed)
    pub(crate) fn op_bgtz(&mut self, ins: Instruction) {
        if self.reg(ins.rs()) as i32 > 0 {
            self.take_branch(ins);
        }
    }

    /// BLTZ: branch when rs < 0 (signed)
    pub(crate) fn op_bltz(&mut self, ins: Instruction) {
        if (self.reg(ins.rs()) as i32) < 0 {
            self.take_branch(ins);
        }
    }

    /// BGEZ: branch when rs >= 0 (signed)
    pub(crate) fn op_bgez(&mut self, ins: Instruction) {
        if self.reg(ins.rs()) as i32 >= 0 {
            self.take_branch(ins);
        }
    }

    /// BLTZAL: link unconditionally, branch when rs < 0
    pub(crate) fn op_bltzal(&mut self, ins: Instruction) {
        let taken = (self.reg(ins.rs()) as i32) < 0;
        self.set_reg(31, self.npc);
        if taken {
            self.take_branch(ins);
        }
    }

    /// BGEZAL: link unconditionally, branch when rs >= 0
    pub(crate) fn op_bgezal(&mut self, ins: Instruction) {
        let taken = self.reg(ins.rs()) as i32 >= 0;
        self.set_reg(31, self.npc);
        if taken {
            self.take_branch(ins);
        }
    }
}
