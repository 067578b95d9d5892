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

//! Multiply, divide and HI/LO moves
//!
//! The multiplier unit spreads its 64-bit product over HI:LO. Division
//! never traps: divide-by-zero and `i32::MIN / -1` produce the
//! architecturally defined results instead.

use super::super::{Cpu, Instruction};

impl Cpu {
    /// MULT: HI:LO = rs * rt (signed)
    pub(crate) fn op_mult(&mut self, ins: Instruction) {
        let a = self.reg(ins.rs()) as i32 as i64;
        let b = self.reg(ins.rt()) as i32 as i64;
        let product = (a * b) as u64;
        self.lo = product as u32;
        self.hi = (product >> 32) as u32;
    }

    /// MULTU: HI:LO = rs * rt (unsigned)
    pub(crate) fn op_multu(&mut self, ins: Instruction) {
        let product = self.reg(ins.rs()) as u64 * self.reg(ins.rt()) as u64;
        self.lo = product as u32;
        self.hi = (product >> 32) as u32;
    }

    /// DIV: LO = rs / rt, HI = rs % rt (signed)
    pub(crate) fn op_div(&mut self, ins: Instruction) {
        let n = self.reg(ins.rs()) as i32;
        let d = self.reg(ins.rt()) as i32;

        if d == 0 {
            // defined results: the remainder keeps the dividend
            self.hi = n as u32;
            self.lo = if n >= 0 { 0xFFFF_FFFF } else { 1 };
        } else if n == i32::MIN && d == -1 {
            // the one quotient that does not fit
            self.hi = 0;
            self.lo = i32::MIN as u32;
        } else {
            self.lo = (n / d) as u32;
            self.hi = (n % d) as u32;
        }
    }

    /// DIVU: LO = rs / rt, HI = rs % rt (unsigned)
    pub(crate) fn op_divu(&mut self, ins: Instruction) {
        let n = self.reg(ins.rs());
        let d = self.reg(ins.rt());

        if d == 0 {
            self.hi = n;
            self.lo = 0xFFFF_FFFF;
        } else {
            self.lo = n / d;
            self.hi = n % d;
        }
    }

    /// MFHI: rd = HI
    pub(crate) fn op_mfhi(&mut self, ins: Instruction) {
        self.set_reg(ins.rd(), self.hi);
    }

    /// MTHI: HI = rs
    pub(crate) fn op_mthi(&mut self, ins: Instruction) {
        self.hi = self.reg(ins.rs());
    }

    /// MFLO: rd = LO
    pub(crate) fn op_mflo(&mut self, ins: Instruction) {
        self.set_reg(ins.rd(), self.lo);
    }

    /// MTLO: LO = rs
    pub(crate) fn op_mtlo(&mut self, ins: Instruction) {
        self.lo = self.reg(ins.rs());
    }
}
