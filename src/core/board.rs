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

//! Board integration
//!
//! Builds the machine: the device set, the bus with its mirror windows,
//! the CPU and the GPU engine, and the scheduler driving them. Also owns
//! the dump/restore format.
//!
//! # Memory map
//!
//! ```text
//!   KUSEG       KSEG0       KSEG1
//!   00000000h   80000000h   A0000000h   2048K  Main RAM
//!   1F801070h   9F801070h   BF801070h   8      Interrupt control
//!   1F8010F0h   9F8010F0h   BF8010F0h   8      DMA (control + irq)
//!   1F801100h   9F801100h   BF801100h   3x12   Timers 0/1/2
//!   1F801810h   9F801810h   BF801810h   8      GPU controller
//!   1F801C00h   9F801C00h   BF801C00h   512    SPU front-end
//!   1FC00000h   9FC00000h   BFC00000h   512K   BIOS ROM
//! ```
//!
//! Every window of a device routes to the same memory, so accesses
//! through KUSEG, KSEG0 and KSEG1 are observationally equivalent.

use crate::core::bus::{AddressRange, BusDevice, DataBus};
use crate::core::cpu::Cpu;
use crate::core::dma::Dma;
use crate::core::error::{EmulatorError, Result};
use crate::core::gpu::Gpu;
use crate::core::interrupt::{InterruptController, IrqLine};
use crate::core::loader;
use crate::core::memory::{Ram, Rom};
use crate::core::scheduler::{Scheduler, VideoStandard};
use crate::core::spu::Spu;
use crate::core::timer::{Timer, TimerId};
use std::cell::RefCell;
use std::io::{Read, Write};
use std::rc::Rc;

/// The three segment windows mirroring the physical address space
const WINDOWS: [u32; 3] = [0x0000_0000, 0x8000_0000, 0xA000_0000];

/// Physical base addresses
const RAM_BASE: u32 = 0x0000_0000;
const IRQ_BASE: u32 = 0x1F80_1070;
const DMA_BASE: u32 = 0x1F80_10F0;
const TIMER_BASE: u32 = 0x1F80_1100;
const GPU_BASE: u32 = 0x1F80_1810;
const SPU_BASE: u32 = 0x1F80_1C00;
const ROM_BASE: u32 = 0x1FC0_0000;

/// The whole machine
pub struct Board {
    cpu: Cpu,
    bus: DataBus,
    gpu: Gpu,
    scheduler: Scheduler,

    ram: Rc<RefCell<Ram>>,
    rom: Rc<RefCell<Rom>>,
    interrupt_control: Rc<RefCell<InterruptController>>,
    dma: Rc<RefCell<Dma>>,
    spu: Rc<RefCell<Spu>>,
    timers: [Rc<RefCell<Timer>>; 3],
}

impl Board {
    /// Board revision, the version tag of the dump format
    pub const REVISION: u16 = 0x2;

    pub fn new() -> Self {
        Self::with_standard(VideoStandard::Pal)
    }

    pub fn with_standard(standard: VideoStandard) -> Self {
        let line = IrqLine::new();
        let cpu = Cpu::new(line.clone());

        let ram = Rc::new(RefCell::new(Ram::new()));
        let rom = Rc::new(RefCell::new(Rom::new()));
        let interrupt_control = Rc::new(RefCell::new(InterruptController::new(line)));
        let dma = Rc::new(RefCell::new(Dma::new(interrupt_control.clone())));
        let spu = Rc::new(RefCell::new(Spu::new()));
        let timers = [
            Rc::new(RefCell::new(Timer::new(
                TimerId::Timer0,
                interrupt_control.clone(),
            ))),
            Rc::new(RefCell::new(Timer::new(
                TimerId::Timer1,
                interrupt_control.clone(),
            ))),
            Rc::new(RefCell::new(Timer::new(
                TimerId::Timer2,
                interrupt_control.clone(),
            ))),
        ];
        let gpu = Gpu::new();

        let mut bus = DataBus::new();
        for window in WINDOWS {
            bus.connect(
                AddressRange::with_len(window + RAM_BASE, Ram::SIZE as u32),
                ram.clone(),
            );
            bus.connect(
                AddressRange::with_len(window + ROM_BASE, Rom::SIZE as u32),
                rom.clone(),
            );
            bus.connect(
                AddressRange::with_len(window + IRQ_BASE, 8),
                interrupt_control.clone(),
            );
            bus.connect(AddressRange::with_len(window + DMA_BASE, 8), dma.clone());
            for (n, timer) in timers.iter().enumerate() {
                bus.connect(
                    AddressRange::with_len(window + TIMER_BASE + n as u32 * 0x10, 12),
                    timer.clone(),
                );
            }
            bus.connect(AddressRange::with_len(window + GPU_BASE, 8), gpu.controller());
            bus.connect(
                AddressRange::with_len(window + SPU_BASE, Spu::SIZE as u32),
                spu.clone(),
            );
        }

        Self {
            cpu,
            bus,
            gpu,
            scheduler: Scheduler::new(standard),
            ram,
            rom,
            interrupt_control,
            dma,
            spu,
            timers,
        }
    }

    pub fn cpu(&self) -> &Cpu {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut Cpu {
        &mut self.cpu
    }

    pub fn bus(&self) -> &DataBus {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut DataBus {
        &mut self.bus
    }

    pub fn gpu(&self) -> &Gpu {
        &self.gpu
    }

    pub fn ram(&self) -> Rc<RefCell<Ram>> {
        self.ram.clone()
    }

    pub fn rom(&self) -> Rc<RefCell<Rom>> {
        self.rom.clone()
    }

    pub fn interrupt_control(&self) -> Rc<RefCell<InterruptController>> {
        self.interrupt_control.clone()
    }

    pub fn dma(&self) -> Rc<RefCell<Dma>> {
        self.dma.clone()
    }

    /// Load a BIOS image into ROM
    pub fn load_bios(&mut self, data: &[u8]) -> Result<()> {
        loader::load_bios(data, &mut self.rom.borrow_mut())
    }

    /// Load a PSX-EXE into RAM, with the boot stub in ROM
    pub fn load_exe(&mut self, data: &[u8]) -> Result<loader::ExeInfo> {
        loader::load_exe(data, &mut self.ram.borrow_mut(), &mut self.rom.borrow_mut())
    }

    /// Run the machine until the CPU clock reaches `ticks`
    pub fn run(&mut self, ticks: u64) -> Result<()> {
        self.scheduler.run(
            &mut self.cpu,
            &mut self.bus,
            &mut self.gpu,
            &self.timers,
            &self.interrupt_control,
            ticks,
        )
    }

    /// Serialize the board: revision, CPU block, device memory
    ///
    /// Device memory follows in the canonical layout order: RAM, ROM,
    /// interrupt control, DMA, SPU, timers 0-2, GPU controller (read
    /// half, then write half). Everything is little-endian.
    pub fn dump(&self, out: &mut dyn Write) -> Result<()> {
        out.write_all(&Self::REVISION.to_le_bytes())?;

        let mut cpu_block = Vec::with_capacity(Cpu::DUMP_SIZE);
        self.cpu.dump(&mut cpu_block);
        out.write_all(&cpu_block)?;

        out.write_all(self.ram.borrow().bytes())?;
        out.write_all(self.rom.borrow().bytes())?;
        out.write_all(self.interrupt_control.borrow().readable_memory())?;
        out.write_all(self.dma.borrow().readable_memory())?;
        out.write_all(self.spu.borrow().readable_memory())?;
        for timer in &self.timers {
            out.write_all(timer.borrow().readable_memory())?;
        }
        let controller = self.gpu.controller();
        let controller = controller.borrow();
        let (read_half, write_half) = controller.halves();
        out.write_all(read_half)?;
        out.write_all(write_half)?;
        Ok(())
    }

    /// Restore a board dump written by [`Board::dump`]
    ///
    /// # Errors
    ///
    /// [`EmulatorError::UnsupportedRevision`] when the dump was written
    /// by a different board revision; I/O and truncation errors
    /// otherwise. Port hooks do not run during a restore; derived state
    /// (the interrupt line) is refreshed afterwards.
    pub fn restore(&mut self, input: &mut dyn Read) -> Result<()> {
        let mut revision = [0u8; 2];
        input.read_exact(&mut revision)?;
        let revision = u16::from_le_bytes(revision);
        if revision != Self::REVISION {
            return Err(EmulatorError::UnsupportedRevision {
                found: revision,
                expected: Self::REVISION,
            });
        }

        let mut cpu_block = vec![0u8; Cpu::DUMP_SIZE];
        input.read_exact(&mut cpu_block)?;
        self.cpu.restore(&cpu_block)?;

        input.read_exact(self.ram.borrow_mut().bytes_mut())?;
        input.read_exact(self.rom.borrow_mut().bytes_mut())?;
        input.read_exact(self.interrupt_control.borrow_mut().writable_memory())?;
        input.read_exact(self.dma.borrow_mut().writable_memory())?;
        input.read_exact(self.spu.borrow_mut().writable_memory())?;
        for timer in &self.timers {
            input.read_exact(timer.borrow_mut().writable_memory())?;
        }
        let controller = self.gpu.controller();
        let mut controller = controller.borrow_mut();
        let (read_half, write_half) = controller.halves_mut();
        input.read_exact(read_half)?;
        input.read_exact(write_half)?;
        drop(controller);

        self.interrupt_control.borrow().update_line();
        Ok(())
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn load_words(board: &mut Board, words: &[u32]) {
        let rom = board.rom();
        let mut rom = rom.borrow_mut();
        for (ix, word) in words.iter().enumerate() {
            rom.bytes_mut()[ix * 4..ix * 4 + 4].copy_from_slice(&word.to_le_bytes());
        }
    }

    #[test]
    fn test_every_window_reaches_the_devices() {
        let mut board = Board::new();

        board.bus_mut().write32(0x0000_0100, 0xDEAD_BEEF);
        assert_eq!(board.bus().read32(0x8000_0100), 0xDEAD_BEEF);
        assert_eq!(board.bus().read32(0xA000_0100), 0xDEAD_BEEF);

        // the I/O windows mirror too
        board.bus_mut().write32(0xBF80_1074, 0x0000_0004);
        assert_eq!(board.bus().read32(0x1F80_1074), 0x0000_0004);
        assert_eq!(board.bus().read32(0x9F80_1074), 0x0000_0004);
    }

    #[test]
    fn test_rom_is_visible_at_the_reset_vector() {
        let mut board = Board::new();
        load_words(&mut board, &[0x3C01_1F80]);
        assert_eq!(board.bus().read32(0x1FC0_0000), 0x3C01_1F80);
        assert_eq!(board.bus().read32(0xBFC0_0000), 0x3C01_1F80);
    }

    #[test]
    fn test_board_runs_a_program() {
        let mut board = Board::new();
        load_words(
            &mut board,
            &[
                0x3C01_1F80, // lui r1, 0x1f80
                0x3421_1070, // ori r1, r1, 0x1070
            ],
        );

        board.run(10).unwrap();
        assert_eq!(board.cpu().reg(1), 0x1F80_1070);
    }

    #[test]
    fn test_dump_restore_roundtrip() {
        let mut board = Board::new();
        load_words(
            &mut board,
            &[
                0x3C01_1F80, // lui r1, 0x1f80
                0x3421_1070, // ori r1, r1, 0x1070
                0x3C02_DEAD, // lui r2, 0xdead
                0x3442_BEEF, // ori r2, r2, 0xbeef
                0xAC22_0000, // sw r2, 0(r1) -> I_STAT write
                0xAC02_0080, // sw r2, 0x80(r0)
            ],
        );
        board.run(20).unwrap();

        let mut dump = Vec::new();
        board.dump(&mut dump).unwrap();

        let mut restored = Board::new();
        restored.restore(&mut dump.as_slice()).unwrap();

        assert_eq!(restored.cpu().ticks(), board.cpu().ticks());
        assert_eq!(restored.cpu().reg(2), 0xDEAD_BEEF);
        assert_eq!(restored.bus().read32(0x0000_0080), 0xDEAD_BEEF);

        // the two boards stay in lockstep afterwards
        board.run(100).unwrap();
        restored.run(100).unwrap();
        let mut a = Vec::new();
        let mut b = Vec::new();
        board.dump(&mut a).unwrap();
        restored.dump(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_dump_survives_a_file_roundtrip() {
        use std::io::{Seek, SeekFrom};

        let mut board = Board::new();
        load_words(&mut board, &[0x3C01_1F80, 0x3421_1070]);
        board.run(10).unwrap();

        let mut file = tempfile::tempfile().unwrap();
        board.dump(&mut file).unwrap();
        file.seek(SeekFrom::Start(0)).unwrap();

        let mut restored = Board::new();
        restored.restore(&mut file).unwrap();
        assert_eq!(restored.cpu().ticks(), board.cpu().ticks());
        assert_eq!(restored.cpu().reg(1), 0x1F80_1070);
    }

    #[test]
    fn test_restore_rejects_a_foreign_revision() {
        let board = Board::new();
        let mut dump = Vec::new();
        board.dump(&mut dump).unwrap();

        dump[0] = 0x7F;
        let mut fresh = Board::new();
        assert!(matches!(
            fresh.restore(&mut dump.as_slice()),
            Err(EmulatorError::UnsupportedRevision { found: 0x007F, .. })
        ));
    }

    #[test]
    fn test_restore_rejects_truncation() {
        let board = Board::new();
        let mut dump = Vec::new();
        board.dump(&mut dump).unwrap();

        let mut fresh = Board::new();
        let truncated = &dump[..dump.len() / 2];
        assert!(fresh.restore(&mut &truncated[..]).is_err());
    }

    #[test]
    fn test_unmapped_io_reads_open_bus() {
        let board = Board::new();
        // the cache control register is outside the modelled map
        assert_eq!(board.bus().read32(0xFFFE_0130), 0xFFFF_FFFF);
    }
}
