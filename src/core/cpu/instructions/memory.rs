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

//! Loads and stores
//!
//! The effective address is rs plus the sign-extended immediate. Natural
//! alignment is enforced by the access helpers, which raise AdEL/AdES on
//! violation; loads land in the load delay slot and become visible at
//! the top of the next cycle.

use super::super::{Cpu, Instruction};
use crate::core::bus::DataBus;

impl Cpu {
    /// Effective address of a load or store
    #[inline(always)]
    fn ea(&self, ins: Instruction) -> u32 {
        self.reg(ins.rs()).wrapping_add(ins.imm() as u32)
    }

    /// LB: load byte, sign-extended
    pub(crate) fn op_lb(&mut self, bus: &DataBus, ins: Instruction) {
        if let Some(value) = self.load(bus, self.ea(ins), 1) {
            self.set_reg_delayed(ins.rt(), value as u8 as i8 as i32 as u32);
        }
    }

    /// LBU: load byte, zero-extended
    pub(crate) fn op_lbu(&mut self, bus: &DataBus, ins: Instruction) {
        if let Some(value) = self.load(bus, self.ea(ins), 1) {
            self.set_reg_delayed(ins.rt(), value);
        }
    }

    /// LH: load halfword, sign-extended
    pub(crate) fn op_lh(&mut self, bus: &DataBus, ins: Instruction) {
        if let Some(value) = self.load(bus, self.ea(ins), 2) {
            self.set_reg_delayed(ins.rt(), value as u16 as i16 as i32 as u32);
        }
    }

    /// LHU: load halfword, zero-extended
    pub(crate) fn op_lhu(&mut self, bus: &DataBus, ins: Instruction) {
        if let Some(value) = self.load(bus, self.ea(ins), 2) {
            self.set_reg_delayed(ins.rt(), value);
        }
    }

    /// LW: load word
    pub(crate) fn op_lw(&mut self, bus: &DataBus, ins: Instruction) {
        if let Some(value) = self.load(bus, self.ea(ins), 4) {
            self.set_reg_delayed(ins.rt(), value);
        }
    }

    /// SB: store byte
    pub(crate) fn op_sb(&mut self, bus: &mut DataBus, ins: Instruction) {
        let value = self.reg(ins.rt());
        self.store(bus, self.ea(ins), 1, value & 0xFF);
    }

    /// SH: store halfword
    pub(crate) fn op_sh(&mut self, bus: &mut DataBus, ins: Instruction) {
        let value = self.reg(ins.rt());
        self.store(bus, self.ea(ins), 2, value & 0xFFFF);
    }

    /// SW: store word
    pub(crate) fn op_sw(&mut self, bus: &mut DataBus, ins: Instruction) {
        let value = self.reg(ins.rt());
        self.store(bus, self.ea(ins), 4, value);
    }
}
