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

//! GPU command front-end
//!
//! The GPU splits in two:
//!
//! - a bus-facing [`Controller`] with the two 4-byte ports GP0 and GP1,
//!   backed by distinct read/write memory halves so GPUREAD and GPUSTAT
//!   are readable at the offsets where commands are written;
//! - the command engine [`Gpu`], which owns the clock and drains the
//!   GP0 queue when the scheduler runs it.
//!
//! GP0 words are buffered in a 16-deep FIFO; an overflowing command is
//! dropped with a critical log. GP1 words act immediately on the
//! controller (display control is synchronous): reset restores the
//! status register and clears the queue, everything else is logged and
//! ignored. The rasterizer is outside this core — of the rendering
//! command set only *Draw Mode Setting* (0xE1) has semantics here,
//! because its fields are architectural state mirrored into GPUSTAT.

mod controller;
mod disassembler;

pub use controller::Controller;
pub use disassembler::{gp0_mnemonic, gp1_mnemonic};

use crate::core::fifo::FixedFifo;
use std::cell::RefCell;
use std::rc::Rc;

/// GPUSTAT value after reset
pub const GPUSTAT_RESET: u32 = 0x1480_2000;

/// Depth of the GP0 command FIFO
pub const GP0_QUEUE_DEPTH: usize = 16;

/// The GP0 word buffer shared between the controller and the engine
pub struct CommandQueue {
    pub gp0: FixedFifo<u32, GP0_QUEUE_DEPTH>,
}

impl CommandQueue {
    fn new() -> Self {
        Self {
            gp0: FixedFifo::new(),
        }
    }
}

/// Fields of the GP0(E1h) Draw Mode Setting command
///
/// The low bits are mirrored verbatim into GPUSTAT, which is how the
/// rest of the machine observes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawMode {
    /// Texture page X base, in 64-halfword steps (bits 0-3)
    pub texture_page_x: u8,
    /// Texture page Y base, 0 or 256 lines (bit 4)
    pub texture_page_y: u8,
    /// Semi-transparency mode (bits 5-6)
    pub semi_transparency: u8,
    /// Texture page color depth: 0=4bit, 1=8bit, 2=15bit (bits 7-8)
    pub texture_depth: u8,
    /// Dither 24-bit to 15-bit (bit 9)
    pub dithering: bool,
    /// Drawing to the display area allowed (bit 10)
    pub draw_to_display: bool,
    /// Texture disable (bit 11)
    pub texture_disable: bool,
}

impl DrawMode {
    pub fn from_word(word: u32) -> Self {
        Self {
            texture_page_x: (word & 0xF) as u8,
            texture_page_y: ((word >> 4) & 0x1) as u8,
            semi_transparency: ((word >> 5) & 0x3) as u8,
            texture_depth: ((word >> 7) & 0x3) as u8,
            dithering: word & (1 << 9) != 0,
            draw_to_display: word & (1 << 10) != 0,
            texture_disable: word & (1 << 11) != 0,
        }
    }

    /// The GPUSTAT image of this draw mode: bits 0..10 verbatim, the
    /// texture-disable flag at bit 15
    pub fn status_bits(word: u32) -> u32 {
        (word & 0x7FF) | ((word >> 11) & 1) << 15
    }
}

/// The GPU command engine
///
/// Owns the GPU clock. [`Gpu::run`] consumes one queued GP0 word per
/// tick until it reaches the target; it never blocks.
pub struct Gpu {
    clock: u64,
    queue: Rc<RefCell<CommandQueue>>,
    controller: Rc<RefCell<Controller>>,
    draw_mode: DrawMode,
}

impl Gpu {
    pub fn new() -> Self {
        let queue = Rc::new(RefCell::new(CommandQueue::new()));
        let controller = Rc::new(RefCell::new(Controller::new(queue.clone())));
        Self {
            clock: 0,
            queue,
            controller,
            draw_mode: DrawMode::from_word(0),
        }
    }

    /// The bus-facing controller device
    pub fn controller(&self) -> Rc<RefCell<Controller>> {
        self.controller.clone()
    }

    pub fn ticks(&self) -> u64 {
        self.clock
    }

    /// Active draw mode, as last set by GP0(E1h)
    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    /// Advance the GPU clock to `until`, draining queued GP0 commands
    pub fn run(&mut self, until: u64) {
        while self.clock < until {
            self.clock += 1;
            let command = self.queue.borrow_mut().gp0.pop();
            match command {
                Ok(word) => self.execute_gp0(word),
                Err(_) => {
                    // nothing queued, the rest of the quantum is idle
                    self.clock = until;
                }
            }
        }
    }

    fn execute_gp0(&mut self, word: u32) {
        let opcode = word >> 24;
        match opcode {
            // NOP
            0x00 => {}
            0xE1 => self.set_draw_mode(word),
            _ => {
                log::debug!(
                    "[GPU] unimplemented GP0 command {:08x} ({})",
                    word,
                    gp0_mnemonic(word)
                );
            }
        }
    }

    /// GP0(E1h): latch the draw mode and mirror it into GPUSTAT
    fn set_draw_mode(&mut self, word: u32) {
        self.draw_mode = DrawMode::from_word(word);

        let mut controller = self.controller.borrow_mut();
        let status = (controller.status() & !0x0000_87FF) | DrawMode::status_bits(word);
        controller.set_status(status);

        log::trace!("[GPU] draw mode {:08x} -> GPUSTAT {:08x}", word, status);
    }
}

impl Default for Gpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::bus::{AddressRange, DataBus};

    const GPU_ADDR: u32 = 0x1F80_1810;
    const GP0_ADDR: u32 = GPU_ADDR;
    const GP1_ADDR: u32 = GPU_ADDR + 4;

    fn board() -> (Gpu, DataBus) {
        let gpu = Gpu::new();
        let mut bus = DataBus::new();
        bus.connect(AddressRange::with_len(GPU_ADDR, 8), gpu.controller());
        (gpu, bus)
    }

    #[test]
    fn test_gpustat_reads_the_reset_value() {
        let (_gpu, bus) = board();
        assert_eq!(bus.read32(GP1_ADDR), GPUSTAT_RESET);
    }

    #[test]
    fn test_gp0_writes_queue_until_the_engine_runs() {
        let (mut gpu, mut bus) = board();

        bus.write32(GP0_ADDR, 0xE100_0308);
        assert_eq!(gpu.queue.borrow().gp0.len(), 1);

        gpu.run(gpu.ticks() + 16);
        assert!(gpu.queue.borrow().gp0.is_empty());
    }

    #[test]
    fn test_draw_mode_setting_mirrors_into_gpustat() {
        let (mut gpu, mut bus) = board();

        // texpage (3,1), semi-transparency 2, 8-bit clut, dithered,
        // drawing to display enabled, texture disabled
        let cmd = 0xE100_0000 | 0x3 | (1 << 4) | (2 << 5) | (1 << 7) | (1 << 9) | (1 << 10) | (1 << 11);
        bus.write32(GP0_ADDR, cmd);
        gpu.run(gpu.ticks() + 1);

        let stat = bus.read32(GP1_ADDR);
        assert_eq!(stat & 0x7FF, cmd & 0x7FF);
        assert_ne!(stat & (1 << 15), 0);
        // the untouched status bits keep their reset value
        assert_eq!(stat & !0x0000_87FF, GPUSTAT_RESET & !0x0000_87FF);

        let mode = gpu.draw_mode();
        assert_eq!(mode.texture_page_x, 3);
        assert_eq!(mode.texture_page_y, 1);
        assert_eq!(mode.semi_transparency, 2);
        assert_eq!(mode.texture_depth, 1);
        assert!(mode.dithering);
        assert!(mode.draw_to_display);
        assert!(mode.texture_disable);
    }

    #[test]
    fn test_queue_overflow_drops_the_command() {
        let (mut gpu, mut bus) = board();

        for n in 0..(GP0_QUEUE_DEPTH as u32 + 4) {
            bus.write32(GP0_ADDR, 0x0100_0000 + n);
        }
        assert_eq!(gpu.queue.borrow().gp0.len(), GP0_QUEUE_DEPTH);

        // the first queued word survived, the overflow was dropped
        assert_eq!(gpu.queue.borrow_mut().gp0.pop().unwrap(), 0x0100_0000);
        gpu.run(gpu.ticks() + 64);
        assert!(gpu.queue.borrow().gp0.is_empty());
    }

    #[test]
    fn test_gp1_reset_restores_status_and_clears_the_queue() {
        let (mut gpu, mut bus) = board();

        bus.write32(GP0_ADDR, 0xE100_03FF);
        gpu.run(gpu.ticks() + 1);
        assert_ne!(bus.read32(GP1_ADDR), GPUSTAT_RESET);

        bus.write32(GP0_ADDR, 0x0200_0000);
        bus.write32(GP1_ADDR, 0x0000_0000); // GP1(00h) Reset GPU
        assert_eq!(bus.read32(GP1_ADDR), GPUSTAT_RESET);
        assert!(gpu.queue.borrow().gp0.is_empty());
    }

    #[test]
    fn test_engine_clock_reaches_the_target() {
        let (mut gpu, _bus) = board();
        gpu.run(3406);
        assert!(gpu.ticks() >= 3406);
        gpu.run(2 * 3406);
        assert_eq!(gpu.ticks(), 2 * 3406);
    }

    #[test]
    fn test_one_command_drains_per_tick() {
        let (mut gpu, mut bus) = board();
        bus.write32(GP0_ADDR, 0xE100_0001);
        bus.write32(GP0_ADDR, 0xE100_0002);

        gpu.run(gpu.ticks() + 1);
        assert_eq!(gpu.queue.borrow().gp0.len(), 1);
        assert_eq!(gpu.draw_mode().texture_page_x, 1);

        gpu.run(gpu.ticks() + 1);
        assert!(gpu.queue.borrow().gp0.is_empty());
        assert_eq!(gpu.draw_mode().texture_page_x, 2);
    }
}
