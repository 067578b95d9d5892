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

//! CPU/GPU interleaving at a scanline quantum
//!
//! Per scanline the GPU advances by one scanline worth of video cycles
//! (3406 PAL, 3413 NTSC) and the CPU by 7/11 of that, the ratio of the
//! 33.8688 MHz CPU clock to the video dot clock. Neither `run` blocks;
//! each returns once its clock reaches the target.
//!
//! The scheduler is also the component that knows where scanlines and
//! frames begin, so it feeds the timers (system clock quantum, hblank
//! edges, vblank sync) and raises the VBLANK interrupt at the top of the
//! blanking interval.

use crate::core::bus::DataBus;
use crate::core::cpu::Cpu;
use crate::core::error::Result;
use crate::core::gpu::Gpu;
use crate::core::interrupt::{interrupts, InterruptController};
use crate::core::timer::{BlankEvent, Timer, TimerInput};
use std::cell::RefCell;
use std::rc::Rc;

/// Video timing standard
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoStandard {
    Pal,
    Ntsc,
}

impl VideoStandard {
    /// GPU cycles in one scanline
    pub fn cycles_per_scanline(self) -> u64 {
        match self {
            VideoStandard::Pal => 3406,
            VideoStandard::Ntsc => 3413,
        }
    }

    /// Total scanlines in one frame
    pub fn scanlines_per_frame(self) -> u64 {
        match self {
            VideoStandard::Pal => 314,
            VideoStandard::Ntsc => 263,
        }
    }

    /// First scanline of the vertical blanking interval
    pub fn vblank_start(self) -> u64 {
        240
    }
}

/// Fixed-quantum CPU/GPU interleaver
pub struct Scheduler {
    standard: VideoStandard,
    scanline: u64,
}

impl Scheduler {
    pub fn new(standard: VideoStandard) -> Self {
        Self {
            standard,
            scanline: 0,
        }
    }

    pub fn standard(&self) -> VideoStandard {
        self.standard
    }

    /// Interleave CPU and GPU until the CPU clock reaches `until`
    ///
    /// Targets are (re)based on the current clocks at entry, so a
    /// restored board resumes cleanly.
    #[allow(clippy::too_many_arguments)]
    pub fn run(
        &mut self,
        cpu: &mut Cpu,
        bus: &mut DataBus,
        gpu: &mut Gpu,
        timers: &[Rc<RefCell<Timer>>; 3],
        interrupt_control: &Rc<RefCell<InterruptController>>,
        until: u64,
    ) -> Result<()> {
        let gpu_cycles = self.standard.cycles_per_scanline();
        let cpu_cycles = gpu_cycles * 7 / 11;

        let mut gpu_target = gpu.ticks();
        let mut cpu_target = cpu.ticks();

        while cpu.ticks() < until {
            gpu_target += gpu_cycles;
            gpu.run(gpu_target);

            cpu_target += cpu_cycles;
            cpu.run(bus, cpu_target)?;

            self.end_of_scanline(cpu_cycles as u32, timers, interrupt_control);
        }
        Ok(())
    }

    /// Feed the timers and frame bookkeeping for one finished scanline
    fn end_of_scanline(
        &mut self,
        cpu_cycles: u32,
        timers: &[Rc<RefCell<Timer>>; 3],
        interrupt_control: &Rc<RefCell<InterruptController>>,
    ) {
        for timer in timers {
            timer
                .borrow_mut()
                .input(TimerInput::SystemClock, cpu_cycles);
        }
        timers[1].borrow_mut().input(TimerInput::Hblank, 1);

        // the horizontal blank is instantaneous at this resolution
        timers[0].borrow_mut().sync(BlankEvent::Enter);
        timers[0].borrow_mut().sync(BlankEvent::Exit);

        self.scanline += 1;
        if self.scanline == self.standard.vblank_start() {
            timers[1].borrow_mut().sync(BlankEvent::Enter);
            interrupt_control.borrow_mut().request(interrupts::VBLANK);
        } else if self.scanline >= self.standard.scanlines_per_frame() {
            self.scanline = 0;
            timers[1].borrow_mut().sync(BlankEvent::Exit);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::board::Board;

    #[test]
    fn test_cpu_and_gpu_advance_in_the_documented_ratio() {
        let mut board = Board::new();
        board.run(2167).unwrap();

        // one PAL scanline: 2167 CPU cycles against 3406 GPU cycles
        assert_eq!(board.cpu().ticks(), 2167);
        assert_eq!(board.gpu().ticks(), 3406);
        assert_eq!(3406 * 7 / 11, 2167);
    }

    #[test]
    fn test_run_overshoots_by_less_than_a_scanline() {
        let mut board = Board::new();
        board.run(10_000).unwrap();

        let ticks = board.cpu().ticks();
        assert!(ticks >= 10_000);
        assert!(ticks < 10_000 + 2167);
    }

    #[test]
    fn test_vblank_raises_the_interrupt() {
        let mut board = Board::new();
        // 240 scanlines to the blanking interval
        board.run(240 * 2167).unwrap();

        assert_ne!(
            board.interrupt_control().borrow().status() & interrupts::VBLANK as u32,
            0
        );
    }

    #[test]
    fn test_ntsc_quantum() {
        assert_eq!(VideoStandard::Ntsc.cycles_per_scanline(), 3413);
        assert_eq!(VideoStandard::Pal.cycles_per_scanline(), 3406);
    }
}
