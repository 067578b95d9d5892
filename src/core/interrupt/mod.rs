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

//! Interrupt controller
//!
//! Two memory-mapped registers at 0x1F801070/0x1F801074:
//!
//! - **I_STAT**: pending interrupt flags. Peripherals set bits through
//!   [`InterruptController::request`]; the CPU acknowledges by writing 0
//!   to the bits it wants cleared (writing 1 leaves a bit unchanged).
//! - **I_MASK**: which pending interrupts reach the CPU.
//!
//! The controller drives a single level-triggered [`IrqLine`] shared with
//! cop0: the line is asserted exactly while `I_STAT & I_MASK` is
//! non-zero. The CPU mirrors the line into `Cause.IP2` and dispatches an
//! interrupt exception when `SR.IEc` and the matching `SR.IM` bit allow.
//!
//! ## Interrupt Sources (bit positions)
//!
//! ```text
//! 0 VBLANK   1 GPU      2 CDROM    3 DMA      4 TIMER0   5 TIMER1
//! 6 TIMER2   7 CONTROLLER  8 SIO   9 SPU     10 LIGHTPEN
//! ```

use crate::core::bus::{BusDevice, DataPort};
use std::cell::Cell;
use std::rc::Rc;

/// Interrupt source bit flags for I_STAT and I_MASK
pub mod interrupts {
    pub const VBLANK: u16 = 1 << 0;
    pub const GPU: u16 = 1 << 1;
    pub const CDROM: u16 = 1 << 2;
    pub const DMA: u16 = 1 << 3;
    pub const TIMER0: u16 = 1 << 4;
    pub const TIMER1: u16 = 1 << 5;
    pub const TIMER2: u16 = 1 << 6;
    pub const CONTROLLER: u16 = 1 << 7;
    pub const SIO: u16 = 1 << 8;
    pub const SPU: u16 = 1 << 9;
    pub const LIGHTPEN: u16 = 1 << 10;
}

/// The external interrupt line between the controller and cop0
///
/// A shared level: the controller drives it, the CPU samples it once per
/// cycle. Cloning yields another handle to the same line.
#[derive(Debug, Clone)]
pub struct IrqLine(Rc<Cell<bool>>);

impl IrqLine {
    pub fn new() -> Self {
        Self(Rc::new(Cell::new(false)))
    }

    /// Drive the line level
    pub fn set(&self, asserted: bool) {
        self.0.set(asserted);
    }

    /// Sample the line level
    pub fn asserted(&self) -> bool {
        self.0.get()
    }
}

impl Default for IrqLine {
    fn default() -> Self {
        Self::new()
    }
}

/// Port index of I_STAT
const I_STAT: usize = 0;
/// Port index of I_MASK
const I_MASK: usize = 1;

/// The interrupt control device (I_STAT + I_MASK)
pub struct InterruptController {
    memory: [u8; 8],
    line: IrqLine,
}

impl InterruptController {
    const PORTS: [DataPort; 2] = [DataPort::new(0, 4), DataPort::new(4, 4)];

    pub fn new(line: IrqLine) -> Self {
        debug_assert!(DataPort::check_layout(&Self::PORTS, 8).is_ok());
        Self {
            memory: [0u8; 8],
            line,
        }
    }

    /// Pending interrupt flags (I_STAT)
    pub fn status(&self) -> u32 {
        u32::from_le_bytes(self.memory[0..4].try_into().unwrap())
    }

    /// Interrupt mask (I_MASK)
    pub fn mask(&self) -> u32 {
        u32::from_le_bytes(self.memory[4..8].try_into().unwrap())
    }

    /// Raise an interrupt request from a peripheral
    ///
    /// Sets the source bit in I_STAT and re-drives the line. The flag
    /// stays pending until the CPU acknowledges it.
    pub fn request(&mut self, source: u16) {
        let status = self.status() | source as u32;
        self.memory[0..4].copy_from_slice(&status.to_le_bytes());
        log::trace!("[IRQ] requested 0x{:04x}, I_STAT=0x{:04x}", source, status);
        self.update_line();
    }

    fn set_status(&mut self, status: u32) {
        self.memory[0..4].copy_from_slice(&status.to_le_bytes());
    }

    /// Re-derive the line level from I_STAT and I_MASK
    ///
    /// Called after every state change, and by the board after a restore
    /// rewrites the register memory wholesale.
    pub(crate) fn update_line(&self) {
        self.line.set(self.status() & self.mask() != 0);
    }
}

impl BusDevice for InterruptController {
    fn name(&self) -> &'static str {
        "Interrupt Control"
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
            I_STAT => {
                // writing 0 acknowledges, writing 1 leaves the flag alone
                self.set_status(old_value & new_value);
            }
            I_MASK => {}
            _ => unreachable!(),
        }
        self.update_line();
    }
}
