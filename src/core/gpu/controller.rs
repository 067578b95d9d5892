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

//! GPU controller device
//!
//! Eight bytes at 0x1F801810 with distinct read and write halves:
//!
//! ```text
//!        write half            read half
//! +0x0   GP0 (commands)        GPUREAD (command responses)
//! +0x4   GP1 (display ctrl)    GPUSTAT (status)
//! ```

use super::disassembler::{gp0_mnemonic, gp1_mnemonic};
use super::{CommandQueue, GPUSTAT_RESET};
use crate::core::bus::{BusDevice, DataPort};
use std::cell::RefCell;
use std::rc::Rc;

/// Port index of GP0
const GP0: usize = 0;
/// Port index of GP1
const GP1: usize = 1;

/// The bus-facing half of the GPU
pub struct Controller {
    read_memory: [u8; 8],
    write_memory: [u8; 8],
    queue: Rc<RefCell<CommandQueue>>,
}

impl Controller {
    const PORTS: [DataPort; 2] = [DataPort::new(0, 4), DataPort::new(4, 4)];

    pub(super) fn new(queue: Rc<RefCell<CommandQueue>>) -> Self {
        debug_assert!(DataPort::check_layout(&Self::PORTS, 8).is_ok());
        let mut controller = Self {
            read_memory: [0u8; 8],
            write_memory: [0u8; 8],
            queue,
        };
        controller.set_status(GPUSTAT_RESET);
        controller
    }

    /// GPUSTAT, the readable status word at +0x4
    pub fn status(&self) -> u32 {
        u32::from_le_bytes(self.read_memory[4..8].try_into().unwrap())
    }

    pub(super) fn set_status(&mut self, status: u32) {
        self.read_memory[4..8].copy_from_slice(&status.to_le_bytes());
    }

    /// GPUREAD, the readable response word at +0x0
    pub fn response(&self) -> u32 {
        u32::from_le_bytes(self.read_memory[0..4].try_into().unwrap())
    }

    /// Raw halves for dump/restore
    pub fn halves(&self) -> (&[u8; 8], &[u8; 8]) {
        (&self.read_memory, &self.write_memory)
    }

    pub fn halves_mut(&mut self) -> (&mut [u8; 8], &mut [u8; 8]) {
        (&mut self.read_memory, &mut self.write_memory)
    }

    fn push_gp0(&mut self, word: u32) {
        log::trace!("[GPU] GP0 command {:08x} ({})", word, gp0_mnemonic(word));
        if self.queue.borrow_mut().gp0.push(word).is_err() {
            log::error!(
                "[GPU] GP0 queue full, dropping command {:08x} ({})",
                word,
                gp0_mnemonic(word)
            );
        }
    }

    fn handle_gp1(&mut self, word: u32) {
        match word >> 24 {
            // GP1(00h) Reset GPU: flush the queue, restore the status
            0x00 => {
                self.queue.borrow_mut().gp0.clear();
                self.set_status(GPUSTAT_RESET);
                log::debug!("[GPU] reset via GP1");
            }
            _ => {
                log::info!(
                    "[GPU] GP1 command {:08x} ignored ({})",
                    word,
                    gp1_mnemonic(word)
                );
            }
        }
    }
}

impl BusDevice for Controller {
    fn name(&self) -> &'static str {
        "GPU controller"
    }

    fn readable_memory(&self) -> &[u8] {
        &self.read_memory
    }

    fn writable_memory(&mut self) -> &mut [u8] {
        &mut self.write_memory
    }

    fn ports(&self) -> &[DataPort] {
        &Self::PORTS
    }

    fn post_write(&mut self, port: usize, new_value: u32, _old_value: u32) {
        match port {
            GP0 => self.push_gp0(new_value),
            GP1 => self.handle_gp1(new_value),
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::Gpu;
    use super::*;
    use crate::core::bus::{AddressRange, DataBus};

    const GPU_ADDR: u32 = 0x1F80_1810;

    #[test]
    fn test_gp0_is_write_only_gpuread_is_read_only() {
        let gpu = Gpu::new();
        let mut bus = DataBus::new();
        bus.connect(AddressRange::with_len(GPU_ADDR, 8), gpu.controller());

        // the written command never shows up in the read half
        bus.write32(GPU_ADDR, 0xA0BB_CCDD);
        assert_eq!(bus.read32(GPU_ADDR), 0x0000_0000);
        assert_eq!(gpu.controller().borrow().response(), 0);
    }

    #[test]
    fn test_status_survives_gp1_writes_to_the_write_half() {
        let gpu = Gpu::new();
        let mut bus = DataBus::new();
        bus.connect(AddressRange::with_len(GPU_ADDR, 8), gpu.controller());

        // an ignored GP1 command leaves GPUSTAT untouched
        bus.write32(GPU_ADDR + 4, 0x0800_0001);
        assert_eq!(bus.read32(GPU_ADDR + 4), GPUSTAT_RESET);
    }
}
