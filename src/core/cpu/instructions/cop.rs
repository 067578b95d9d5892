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

//! Coprocessor instructions
//!
//! Cop0 implements MFC/MTC register moves and the RFE control command.
//! Cop2 is the GTE, a diagnostic-only stub here; cop1 and cop3 do not
//! exist on the PSX and their instructions are ignored with a warning.
//! A cop0 control command other than RFE is the one condition that
//! escapes the machine as a host error.

use super::super::{Cpu, Instruction};
use crate::core::error::{EmulatorError, Result};

impl Cpu {
    /// Opcode 0x10: system control coprocessor
    pub(crate) fn op_cop0(&mut self, ins: Instruction) -> Result<()> {
        if ins.is_cop_fn() {
            return match ins.cop_fn() {
                // RFE: restore from exception
                0x10 => {
                    self.cop0.restore_from_exception();
                    Ok(())
                }
                command => {
                    log::error!("[CPU][COP] unimplemented cop command {:#x}", command);
                    Err(EmulatorError::UnimplementedCop {
                        command,
                        pc: self.current_pc(),
                    })
                }
            };
        }

        match ins.cop_subop() {
            // MFC0: rt = cop0[rd]
            0x00 => {
                let value = self.cop0.read_reg(ins.rd());
                self.set_reg(ins.rt(), value);
                Ok(())
            }
            // MTC0: cop0[rd] = rt
            0x04 => {
                let value = self.reg(ins.rt());
                log::trace!(
                    "[CPU][COP] pc={:08x}@{} cop0 reg{} = {:08x}",
                    self.current_pc(),
                    self.ticks(),
                    ins.rd(),
                    value
                );
                self.cop0.write_reg(ins.rd(), value);
                Ok(())
            }
            subop => {
                log::error!("[CPU][COP] unimplemented cop0 sub-op {:#x}", subop);
                Err(EmulatorError::UnimplementedCop {
                    command: subop as u32,
                    pc: self.current_pc(),
                })
            }
        }
    }

    /// Opcode 0x12: the GTE, not modelled by this core
    pub(crate) fn op_cop2(&mut self, ins: Instruction) {
        log::warn!(
            "[CPU] unimplemented instruction for coprocessor 2 (GTE), word={:08x}",
            ins.0
        );
    }
}
