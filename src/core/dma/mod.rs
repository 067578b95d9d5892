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

//! DMA controller front-end
//!
//! The register shell of the DMA controller: the global control register
//! (DPCR, 0x1F8010F0) and the interrupt register (DICR, 0x1F8010F4).
//! The per-channel transfer engines are outside this core; a finished
//! channel reports through [`Dma::channel_done`].
//!
//! DICR layout:
//!
//! ```text
//! 15     force IRQ (raises the master flag unconditionally)
//! 16-22  per-channel IRQ enable
//! 23     master IRQ enable
//! 24-30  per-channel IRQ flags, acknowledged by writing 1
//! 31     master flag (read-only); on its 0-to-1 transition the DMA
//!        interrupt (IRQ3) is requested from the interrupt controller
//! ```

use crate::core::bitmask::BitMask;
use crate::core::bus::{BusDevice, DataPort};
use crate::core::interrupt::{interrupts, InterruptController};
use std::cell::RefCell;
use std::rc::Rc;

mod dicr_bits {
    use super::BitMask;

    /// When set an interrupt is raised regardless of every other condition
    pub const FORCE_IRQ: BitMask<u32> = BitMask::<u32>::of(0x0000_8000);

    /// IRQ enable, one bit per channel
    pub const ENABLED_CHANNELS: BitMask<u32> = BitMask::<u32>::of(0x007F_0000);

    /// The master switch gating the per-channel interrupts
    pub const MASTER_ENABLE: BitMask<u32> = BitMask::<u32>::of(0x0080_0000);

    /// Set on DMA completion, acknowledged by writing "1"
    pub const FLAGGED_CHANNELS: BitMask<u32> = BitMask::<u32>::of(0x7F00_0000);

    /// Read-only summary: b15 OR (b23 AND (b16-22 AND b24-30) > 0)
    pub const MASTER_FLAG: BitMask<u32> = BitMask::<u32>::of(0x8000_0000);
}

/// Port index of DPCR
const DPCR: usize = 0;
/// Port index of DICR
const DICR: usize = 1;

/// DPCR reset value (channel priorities after power-on)
const DPCR_RESET: u32 = 0x0765_4321;

/// The DMA register device (DPCR + DICR)
pub struct Dma {
    memory: [u8; 8],
    interrupt_control: Rc<RefCell<InterruptController>>,
}

impl Dma {
    const PORTS: [DataPort; 2] = [DataPort::new(0, 4), DataPort::new(4, 4)];

    pub fn new(interrupt_control: Rc<RefCell<InterruptController>>) -> Self {
        let mut dma = Self {
            memory: [0u8; 8],
            interrupt_control,
        };
        dma.memory[0..4].copy_from_slice(&DPCR_RESET.to_le_bytes());
        dma
    }

    /// DMA control register value
    pub fn dpcr(&self) -> u32 {
        u32::from_le_bytes(self.memory[0..4].try_into().unwrap())
    }

    /// DMA interrupt register value
    pub fn dicr(&self) -> u32 {
        u32::from_le_bytes(self.memory[4..8].try_into().unwrap())
    }

    fn set_dicr(&mut self, value: u32) {
        self.memory[4..8].copy_from_slice(&value.to_le_bytes());
    }

    /// Report a finished transfer on `channel` (0..=6)
    ///
    /// The channel flag is latched only while its enable bit is set, as
    /// the DICR contract requires.
    pub fn channel_done(&mut self, channel: u8) {
        assert!(channel < 7);
        let mut dicr = self.dicr();
        if dicr_bits::ENABLED_CHANNELS.get(dicr) & (1 << channel) != 0 {
            let flags = dicr_bits::FLAGGED_CHANNELS.get(dicr) | (1 << channel);
            dicr_bits::FLAGGED_CHANNELS.set(&mut dicr, flags);
        }
        self.refresh_master_flag(dicr);
    }

    /// Recompute the master flag and raise IRQ3 on its 0-to-1 transition
    fn refresh_master_flag(&mut self, mut dicr: u32) {
        let was_raised = dicr_bits::MASTER_FLAG.test(self.dicr());

        let request = dicr_bits::FORCE_IRQ.test(dicr)
            || (dicr_bits::MASTER_ENABLE.test(dicr)
                && dicr_bits::ENABLED_CHANNELS.get(dicr) & dicr_bits::FLAGGED_CHANNELS.get(dicr)
                    != 0);

        dicr_bits::MASTER_FLAG.set(&mut dicr, request as u32);
        self.set_dicr(dicr);

        if request && !was_raised {
            self.interrupt_control.borrow_mut().request(interrupts::DMA);
        }
    }
}

impl BusDevice for Dma {
    fn name(&self) -> &'static str {
        "DMA"
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
            // channel priorities, plain storage
            DPCR => {}
            DICR => {
                let mut dicr = new_value;

                // acknowledge the flagged channels: a write of "1" clears
                let ack = dicr_bits::FLAGGED_CHANNELS.get(new_value);
                let flags = dicr_bits::FLAGGED_CHANNELS.get(old_value) & !ack;
                dicr_bits::FLAGGED_CHANNELS.set(&mut dicr, flags);

                // restore the read-only master flag before recomputing
                dicr_bits::MASTER_FLAG.set(
                    &mut dicr,
                    dicr_bits::MASTER_FLAG.get(old_value),
                );
                self.set_dicr(dicr);
                self.refresh_master_flag(dicr);
            }
            _ => unreachable!(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::{AddressRange, DataBus};
    use crate::core::interrupt::IrqLine;

    const DMA_ADDR: u32 = 0x1F80_10F0;
    const IC_ADDR: u32 = 0x1F80_1070;

    fn board() -> (Rc<RefCell<Dma>>, Rc<RefCell<InterruptController>>, DataBus) {
        let ic = Rc::new(RefCell::new(InterruptController::new(IrqLine::new())));
        let dma = Rc::new(RefCell::new(Dma::new(ic.clone())));
        let mut bus = DataBus::new();
        bus.connect(AddressRange::with_len(DMA_ADDR, 8), dma.clone());
        bus.connect(AddressRange::with_len(IC_ADDR, 8), ic.clone());
        (dma, ic, bus)
    }

    #[test]
    fn test_dpcr_reset_value() {
        let (dma, _ic, bus) = board();
        assert_eq!(dma.borrow().dpcr(), 0x0765_4321);
        assert_eq!(bus.read32(DMA_ADDR), 0x0765_4321);
    }

    #[test]
    fn test_dpcr_is_plain_storage() {
        let (dma, ic, mut bus) = board();
        bus.write32(DMA_ADDR, 0x0123_4567);
        assert_eq!(dma.borrow().dpcr(), 0x0123_4567);
        assert_eq!(ic.borrow().status(), 0);
    }

    #[test]
    fn test_master_flag_follows_force_irq() {
        let (dma, ic, mut bus) = board();

        bus.write32(DMA_ADDR + 4, dicr_bits::FORCE_IRQ.mask());
        assert!(dicr_bits::MASTER_FLAG.test(dma.borrow().dicr()));
        assert_eq!(ic.borrow().status(), interrupts::DMA as u32);
    }

    #[test]
    fn test_finished_channel_raises_irq_once() {
        let (dma, ic, mut bus) = board();

        // enable channel 2 and the master switch
        let mut dicr = 0u32;
        dicr_bits::ENABLED_CHANNELS.set(&mut dicr, 1 << 2);
        dicr_bits::MASTER_ENABLE.set(&mut dicr, 1);
        bus.write32(DMA_ADDR + 4, dicr);
        assert_eq!(ic.borrow().status(), 0);

        dma.borrow_mut().channel_done(2);
        let dicr = dma.borrow().dicr();
        assert_eq!(dicr_bits::FLAGGED_CHANNELS.get(dicr), 1 << 2);
        assert!(dicr_bits::MASTER_FLAG.test(dicr));
        assert_eq!(ic.borrow().status(), interrupts::DMA as u32);

        // still raised: no second edge, no new request
        bus.write32(IC_ADDR, 0); // acknowledge I_STAT completely
        dma.borrow_mut().channel_done(2);
        assert_eq!(ic.borrow().status(), 0);
    }

    #[test]
    fn test_disabled_channels_do_not_latch_flags() {
        let (dma, _ic, _bus) = board();
        dma.borrow_mut().channel_done(4);
        assert_eq!(dicr_bits::FLAGGED_CHANNELS.get(dma.borrow().dicr()), 0);
    }

    #[test]
    fn test_writing_one_acknowledges_a_flag() {
        let (dma, ic, mut bus) = board();

        let mut dicr = 0u32;
        dicr_bits::ENABLED_CHANNELS.set(&mut dicr, 1 << 1);
        dicr_bits::MASTER_ENABLE.set(&mut dicr, 1);
        bus.write32(DMA_ADDR + 4, dicr);
        dma.borrow_mut().channel_done(1);
        assert!(dicr_bits::MASTER_FLAG.test(dma.borrow().dicr()));

        // ack channel 1: same configuration plus a 1 in its flag bit
        let mut ack = dicr;
        dicr_bits::FLAGGED_CHANNELS.set(&mut ack, 1 << 1);
        bus.write32(DMA_ADDR + 4, ack);

        let dicr = dma.borrow().dicr();
        assert_eq!(dicr_bits::FLAGGED_CHANNELS.get(dicr), 0);
        assert!(!dicr_bits::MASTER_FLAG.test(dicr));
        let _ = ic;
    }
}
