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

//! SPU register front-end
//!
//! The 512-byte register window at 0x1F801C00: 24 voices × 16 bytes,
//! then the control block. Sound synthesis is outside this core; the
//! window behaves as plain storage so BIOS register sweeps read back what
//! they wrote, with one modelled side effect: the low 6 bits of SPUCNT
//! (the SPU mode field) are mirrored into SPUSTAT on every control write,
//! which is what the boot code polls for.

use crate::core::bus::{BusDevice, DataPort};

/// Byte offset of the SPU Control Register (SPUCNT, 0x1F801DAA)
const SPUCNT_OFFSET: usize = 0x1AA;
/// Byte offset of the SPU Status Register (SPUSTAT, 0x1F801DAE)
const SPUSTAT_OFFSET: usize = 0x1AE;

/// SPUSTAT bits 0..5 follow SPUCNT
const SPUSTAT_MODE_MASK: u16 = 0x003F;

/// Port index of SPUCNT
const SPUCNT: usize = 0;
/// Port index of SPUSTAT
const SPUSTAT: usize = 1;

/// The SPU register window
pub struct Spu {
    memory: Vec<u8>,
}

impl Spu {
    pub const SIZE: usize = 512;

    const PORTS: [DataPort; 2] = [
        DataPort::new(SPUCNT_OFFSET, 2),
        DataPort::new(SPUSTAT_OFFSET, 2),
    ];

    pub fn new() -> Self {
        debug_assert!(DataPort::check_layout(&Self::PORTS, Self::SIZE).is_ok());
        Self {
            memory: vec![0u8; Self::SIZE],
        }
    }

    pub fn spucnt(&self) -> u16 {
        u16::from_le_bytes(
            self.memory[SPUCNT_OFFSET..SPUCNT_OFFSET + 2]
                .try_into()
                .unwrap(),
        )
    }

    pub fn spustat(&self) -> u16 {
        u16::from_le_bytes(
            self.memory[SPUSTAT_OFFSET..SPUSTAT_OFFSET + 2]
                .try_into()
                .unwrap(),
        )
    }

    fn set_spustat(&mut self, value: u16) {
        self.memory[SPUSTAT_OFFSET..SPUSTAT_OFFSET + 2].copy_from_slice(&value.to_le_bytes());
    }
}

impl BusDevice for Spu {
    fn name(&self) -> &'static str {
        "SPU"
    }

    fn readable_memory(&self) -> &[u8] {
        &self.memory
    }

    fn writable_memory(&mut self) -> &mut [u8] {
        &mut self.memory
    }

    fn ports(&self) -> &[DataPort] {
        &Self::PORTS
    }

    fn post_write(&mut self, port: usize, new_value: u32, old_value: u32) {
        match port {
            SPUCNT => {
                let stat =
                    (self.spustat() & !SPUSTAT_MODE_MASK) | (new_value as u16 & SPUSTAT_MODE_MASK);
                self.set_spustat(stat);
            }
            SPUSTAT => {
                log::warn!(
                    "[SPU] SPUSTAT should be R/O (write {:04x} over {:04x})",
                    new_value,
                    old_value
                );
            }
            _ => unreachable!(),
        }
    }
}

impl Default for Spu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::{AddressRange, DataBus};
    use std::cell::RefCell;
    use std::rc::Rc;

    const SPU_ADDR: u32 = 0x1F80_1C00;
    const SPUCNT_ADDR: u32 = SPU_ADDR + 0x1AA;
    const SPUSTAT_ADDR: u32 = SPU_ADDR + 0x1AE;

    fn board() -> (Rc<RefCell<Spu>>, DataBus) {
        let spu = Rc::new(RefCell::new(Spu::new()));
        let mut bus = DataBus::new();
        bus.connect(AddressRange::with_len(SPU_ADDR, Spu::SIZE as u32), spu.clone());
        (spu, bus)
    }

    #[test]
    fn test_registers_behave_as_plain_storage() {
        let (_spu, mut bus) = board();

        // voice 0 volume
        bus.write16(SPU_ADDR, 0x3FFF);
        assert_eq!(bus.read16(SPU_ADDR), 0x3FFF);

        // main volume
        bus.write16(SPU_ADDR + 0x180, 0x1234);
        assert_eq!(bus.read16(SPU_ADDR + 0x180), 0x1234);
    }

    #[test]
    fn test_spucnt_mode_bits_mirror_into_spustat() {
        let (spu, mut bus) = board();

        bus.write16(SPUCNT_ADDR, 0xC03F);
        assert_eq!(spu.borrow().spucnt(), 0xC03F);
        assert_eq!(spu.borrow().spustat(), 0x003F);
        assert_eq!(bus.read16(SPUSTAT_ADDR), 0x003F);
    }

    #[test]
    fn test_spustat_mirror_only_touches_the_mode_field() {
        let (spu, mut bus) = board();

        // bits above the 6-bit mode field are left alone
        spu.borrow_mut().set_spustat(0x0780);
        bus.write16(SPUCNT_ADDR, 0x0015);
        assert_eq!(spu.borrow().spustat(), 0x0795);

        bus.write16(SPUCNT_ADDR, 0x0000);
        assert_eq!(spu.borrow().spustat(), 0x0780);
    }
}
