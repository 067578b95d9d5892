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

//! Timer channels (root counters)
//!
//! Three independent 16-bit counters, each a 12-byte device:
//!
//! ```text
//! +0x0  counter value  (R/W)
//! +0x4  counter mode   (R/W; writing zeroes the counter)
//! +0x8  counter target (R/W)
//! ```
//!
//! Mapped at `0x1F801100 + n*0x10`. Each timer counts one of two inputs:
//!
//! - **Timer 0**: system clock or dot clock
//! - **Timer 1**: system clock or horizontal blank
//! - **Timer 2**: system clock or system clock / 8
//!
//! Reaching the target or wrapping past 0xFFFF sets sticky mode flags and
//! can request the timer's interrupt. Timers 0 and 1 can additionally
//! synchronise with the blanking intervals (pause or reset), which the
//! scheduler reports through [`Timer::sync`].

use crate::core::bitmask::BitMask;
use crate::core::bus::{BusDevice, DataPort};
use crate::core::interrupt::{interrupts, InterruptController};
use std::cell::RefCell;
use std::rc::Rc;

mod mode_bits {
    use super::BitMask;

    pub const SYNC_ENABLE: BitMask<u16> = BitMask::<u16>::of(0x0001);
    pub const SYNC_MODE: BitMask<u16> = BitMask::<u16>::of(0x0006);

    /// Counter reset: 0 at 0xFFFF, 1 at the target value
    pub const RESET_ON_TARGET: BitMask<u16> = BitMask::<u16>::of(0x0008);

    pub const IRQ_ON_TARGET: BitMask<u16> = BitMask::<u16>::of(0x0010);
    pub const IRQ_ON_END: BitMask<u16> = BitMask::<u16>::of(0x0020);

    /// 0 = one shot, 1 = repeatedly
    pub const IRQ_REPEAT: BitMask<u16> = BitMask::<u16>::of(0x0040);

    /// 0 = pulse, 1 = toggle (unmodelled; kept for register fidelity)
    #[allow(dead_code)]
    pub const IRQ_MODE: BitMask<u16> = BitMask::<u16>::of(0x0080);

    pub const SOURCE: BitMask<u16> = BitMask::<u16>::of(0x0300);

    pub const IRQ_REQUESTED: BitMask<u16> = BitMask::<u16>::of(0x0400);
    pub const TARGET_REACHED: BitMask<u16> = BitMask::<u16>::of(0x0800);
    pub const END_REACHED: BitMask<u16> = BitMask::<u16>::of(0x1000);
}

/// Which of the three channels a [`Timer`] instance is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerId {
    Timer0,
    Timer1,
    Timer2,
}

impl TimerId {
    fn device_name(self) -> &'static str {
        match self {
            TimerId::Timer0 => "Timer 0 (SYS + DOT)",
            TimerId::Timer1 => "Timer 1 (SYS + HBLANK)",
            TimerId::Timer2 => "Timer 2 (SYS + SYS/8)",
        }
    }

    fn irq_source(self) -> u16 {
        match self {
            TimerId::Timer0 => interrupts::TIMER0,
            TimerId::Timer1 => interrupts::TIMER1,
            TimerId::Timer2 => interrupts::TIMER2,
        }
    }
}

/// Clock inputs a timer can count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerInput {
    SystemClock,
    DotClock,
    Hblank,
}

/// Blanking events reported by the scheduler to synchronised timers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankEvent {
    Enter,
    Exit,
}

/// Port index of the counter value
const VALUE: usize = 0;
/// Port index of the counter mode
const MODE: usize = 1;
/// Port index of the counter target
const TARGET: usize = 2;

/// One timer channel
pub struct Timer {
    id: TimerId,
    memory: [u8; 12],
    interrupt_control: Rc<RefCell<InterruptController>>,

    /// Leftover system ticks when timer 2 counts the /8 source
    prescaler: u32,

    /// Inside the blanking interval (sync modes pause/reset on it)
    blanked: bool,
}

impl Timer {
    const PORTS: [DataPort; 3] = [
        DataPort::new(0, 4),
        DataPort::new(4, 4),
        DataPort::new(8, 4),
    ];

    pub fn new(id: TimerId, interrupt_control: Rc<RefCell<InterruptController>>) -> Self {
        debug_assert!(DataPort::check_layout(&Self::PORTS, 12).is_ok());
        Self {
            id,
            memory: [0u8; 12],
            interrupt_control,
            prescaler: 0,
            blanked: false,
        }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Current counter value
    pub fn value(&self) -> u16 {
        u16::from_le_bytes(self.memory[0..2].try_into().unwrap())
    }

    pub fn mode(&self) -> u16 {
        u16::from_le_bytes(self.memory[4..6].try_into().unwrap())
    }

    pub fn target(&self) -> u16 {
        u16::from_le_bytes(self.memory[8..10].try_into().unwrap())
    }

    fn set_value(&mut self, value: u16) {
        self.memory[0..4].copy_from_slice(&(value as u32).to_le_bytes());
    }

    fn set_mode(&mut self, mode: u16) {
        self.memory[4..8].copy_from_slice(&(mode as u32).to_le_bytes());
    }

    /// Feed `ticks` pulses of `input` to the channel
    ///
    /// Only the source selected in the mode register advances the
    /// counter; the other input is ignored.
    pub fn input(&mut self, input: TimerInput, ticks: u32) {
        let source = mode_bits::SOURCE.get(self.mode());
        let selected = match (self.id, input) {
            (TimerId::Timer0, TimerInput::SystemClock) => source & 0x1 == 0,
            (TimerId::Timer0, TimerInput::DotClock) => source & 0x1 == 1,
            (TimerId::Timer1, TimerInput::SystemClock) => source & 0x1 == 0,
            (TimerId::Timer1, TimerInput::Hblank) => source & 0x1 == 1,
            (TimerId::Timer2, TimerInput::SystemClock) => true,
            _ => false,
        };
        if !selected {
            return;
        }

        let mut ticks = ticks;
        if self.id == TimerId::Timer2 && source & 0x2 != 0 {
            // /8 prescaler, remainder carried to the next quantum
            let total = self.prescaler + ticks;
            ticks = total / 8;
            self.prescaler = total % 8;
        }

        if self.paused() {
            return;
        }
        if ticks > 0 {
            self.increment(ticks);
        }
    }

    /// True while a sync mode keeps the counter frozen
    fn paused(&self) -> bool {
        let mode = self.mode();
        if !mode_bits::SYNC_ENABLE.test(mode) || self.id == TimerId::Timer2 {
            return false;
        }
        match mode_bits::SYNC_MODE.get(mode) {
            0 => self.blanked,  // pause during the blank
            1 => false,         // reset at the blank
            2 => !self.blanked, // reset at the blank, pause outside it
            _ => true,          // pause until the first blank
        }
    }

    /// Report a blanking edge (hblank for timer 0, vblank for timer 1)
    pub fn sync(&mut self, event: BlankEvent) {
        if self.id == TimerId::Timer2 {
            return;
        }
        let mode = self.mode();
        if !mode_bits::SYNC_ENABLE.test(mode) {
            return;
        }

        match event {
            BlankEvent::Enter => {
                self.blanked = true;
                match mode_bits::SYNC_MODE.get(mode) {
                    1 | 2 => self.set_value(0),
                    3 => {
                        // waited for the blank; free run from here on
                        let mut mode = mode;
                        mode_bits::SYNC_ENABLE.clear(&mut mode);
                        self.set_mode(mode);
                    }
                    _ => {}
                }
            }
            BlankEvent::Exit => self.blanked = false,
        }
    }

    /// Advance the counter by `q`, latching flags and raising the IRQ
    fn increment(&mut self, q: u32) {
        let mut mode = self.mode();
        let target = self.target() as u32;
        let sum = self.value() as u32 + q;

        let target_hit = target <= sum;
        let end_hit = sum > 0xFFFF;

        let next = if mode_bits::RESET_ON_TARGET.test(mode) && target_hit {
            sum - target
        } else {
            sum
        };
        self.set_value(next as u16);

        let mut irq = (target_hit && mode_bits::IRQ_ON_TARGET.test(mode))
            || (end_hit && mode_bits::IRQ_ON_END.test(mode));

        // one-shot mode latches a single request until the mode is rewritten
        if irq && !mode_bits::IRQ_REPEAT.test(mode) && mode_bits::IRQ_REQUESTED.test(mode) {
            irq = false;
        }

        if target_hit {
            mode_bits::TARGET_REACHED.set(&mut mode, 1);
        }
        if end_hit {
            mode_bits::END_REACHED.set(&mut mode, 1);
        }
        if irq {
            mode_bits::IRQ_REQUESTED.set(&mut mode, 1);
        }
        self.set_mode(mode);

        if irq {
            self.interrupt_control
                .borrow_mut()
                .request(self.id.irq_source());
        }
    }
}

impl BusDevice for Timer {
    fn name(&self) -> &'static str {
        self.id.device_name()
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

    fn post_write(&mut self, port: usize, new_value: u32, _old_value: u32) {
        match port {
            VALUE | TARGET => {}
            MODE => {
                // a mode write zeroes the counter and clears the sticky flags
                let mut mode = new_value as u16;
                mode_bits::IRQ_REQUESTED.clear(&mut mode);
                mode_bits::TARGET_REACHED.clear(&mut mode);
                mode_bits::END_REACHED.clear(&mut mode);
                self.set_mode(mode);
                self.set_value(0);
                self.prescaler = 0;
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

    const TIMER0_ADDR: u32 = 0x1F80_1100;
    const IC_ADDR: u32 = 0x1F80_1070;

    struct TestBench {
        timer: Rc<RefCell<Timer>>,
        ic: Rc<RefCell<InterruptController>>,
        bus: DataBus,
    }

    impl TestBench {
        fn new() -> Self {
            let ic = Rc::new(RefCell::new(InterruptController::new(IrqLine::new())));
            let timer = Rc::new(RefCell::new(Timer::new(TimerId::Timer0, ic.clone())));
            let mut bus = DataBus::new();
            bus.connect(AddressRange::with_len(TIMER0_ADDR, 12), timer.clone());
            bus.connect(AddressRange::with_len(IC_ADDR, 8), ic.clone());
            Self { timer, ic, bus }
        }

        fn set_mode(&mut self, mode: u16) {
            self.bus.write32(TIMER0_ADDR + 4, mode as u32);
        }

        fn set_target(&mut self, target: u16) {
            self.bus.write32(TIMER0_ADDR + 8, target as u32);
        }

        fn input(&self, input: TimerInput, ticks: u32) {
            self.timer.borrow_mut().input(input, ticks);
        }

        fn value(&self) -> u16 {
            self.timer.borrow().value()
        }

        fn mode(&self) -> u16 {
            self.timer.borrow().mode()
        }
    }

    #[test]
    fn test_only_the_selected_input_counts() {
        let bench = TestBench::new();

        bench.input(TimerInput::SystemClock, 1);
        assert_eq!(bench.value(), 1);

        bench.input(TimerInput::DotClock, 1);
        assert_eq!(bench.value(), 1);
    }

    #[test]
    fn test_source_bit_selects_the_dot_clock() {
        let mut bench = TestBench::new();
        let mut mode = 0u16;
        mode_bits::SOURCE.set(&mut mode, 1);
        bench.set_mode(mode);

        bench.input(TimerInput::SystemClock, 5);
        assert_eq!(bench.value(), 0);
        bench.input(TimerInput::DotClock, 5);
        assert_eq!(bench.value(), 5);
    }

    #[test]
    fn test_counter_wraps_past_the_end() {
        let bench = TestBench::new();
        bench.input(TimerInput::SystemClock, 65535);
        assert_eq!(bench.value(), 65535);
        assert!(!mode_bits::END_REACHED.test(bench.mode()));

        bench.input(TimerInput::SystemClock, 1);
        assert_eq!(bench.value(), 0);

        // the signalling bit is sticky
        assert!(mode_bits::END_REACHED.test(bench.mode()));
        bench.input(TimerInput::SystemClock, 1);
        assert!(mode_bits::END_REACHED.test(bench.mode()));
    }

    #[test]
    fn test_reaching_the_target_sets_the_sticky_flag() {
        let mut bench = TestBench::new();
        bench.set_target(10);
        bench.input(TimerInput::SystemClock, 10);

        assert_eq!(bench.value(), 10);
        assert!(mode_bits::TARGET_REACHED.test(bench.mode()));

        // reaching the target does not stop the timer
        bench.input(TimerInput::SystemClock, 1);
        assert_eq!(bench.value(), 11);
    }

    #[test]
    fn test_reset_on_target_restarts_from_zero() {
        let mut bench = TestBench::new();
        let mut mode = 0u16;
        mode_bits::RESET_ON_TARGET.set(&mut mode, 1);
        bench.set_mode(mode);
        bench.set_target(12);

        bench.input(TimerInput::SystemClock, 11);
        assert_eq!(bench.value(), 11);

        bench.input(TimerInput::SystemClock, 1);
        assert_eq!(bench.value(), 0);
    }

    #[test]
    fn test_target_irq_reaches_the_interrupt_controller() {
        let mut bench = TestBench::new();
        let mut mode = 0u16;
        mode_bits::IRQ_ON_TARGET.set(&mut mode, 1);
        mode_bits::IRQ_REPEAT.set(&mut mode, 1);
        bench.set_mode(mode);
        bench.set_target(4);

        bench.input(TimerInput::SystemClock, 4);
        assert!(mode_bits::IRQ_REQUESTED.test(bench.mode()));
        assert_eq!(bench.ic.borrow().status(), interrupts::TIMER0 as u32);
    }

    #[test]
    fn test_one_shot_irq_fires_once() {
        let mut bench = TestBench::new();
        let mut mode = 0u16;
        mode_bits::IRQ_ON_TARGET.set(&mut mode, 1);
        mode_bits::RESET_ON_TARGET.set(&mut mode, 1);
        bench.set_mode(mode);
        bench.set_target(2);

        bench.input(TimerInput::SystemClock, 2);
        assert_eq!(bench.ic.borrow().status(), interrupts::TIMER0 as u32);

        // acknowledge, then reach the target again: one-shot stays quiet
        bench.bus.write32(IC_ADDR, 0);
        bench.input(TimerInput::SystemClock, 2);
        assert_eq!(bench.ic.borrow().status(), 0);
    }

    #[test]
    fn test_mode_write_zeroes_the_counter_and_flags() {
        let mut bench = TestBench::new();
        bench.set_target(3);
        bench.input(TimerInput::SystemClock, 5);
        assert!(mode_bits::TARGET_REACHED.test(bench.mode()));

        bench.set_mode(0);
        assert_eq!(bench.value(), 0);
        assert!(!mode_bits::TARGET_REACHED.test(bench.mode()));
        assert!(!mode_bits::IRQ_REQUESTED.test(bench.mode()));
    }

    #[test]
    fn test_sync_mode_one_resets_at_the_blank() {
        let bench = TestBench::new();
        {
            let mut timer = bench.timer.borrow_mut();
            let mut mode = 0u16;
            mode_bits::SYNC_ENABLE.set(&mut mode, 1);
            mode_bits::SYNC_MODE.set(&mut mode, 1);
            timer.set_mode(mode);
        }

        bench.input(TimerInput::SystemClock, 7);
        assert_eq!(bench.value(), 7);

        bench.timer.borrow_mut().sync(BlankEvent::Enter);
        assert_eq!(bench.value(), 0);
    }

    #[test]
    fn test_sync_mode_zero_pauses_during_the_blank() {
        let bench = TestBench::new();
        {
            let mut timer = bench.timer.borrow_mut();
            let mut mode = 0u16;
            mode_bits::SYNC_ENABLE.set(&mut mode, 1);
            timer.set_mode(mode);
        }

        bench.timer.borrow_mut().sync(BlankEvent::Enter);
        bench.input(TimerInput::SystemClock, 3);
        assert_eq!(bench.value(), 0);

        bench.timer.borrow_mut().sync(BlankEvent::Exit);
        bench.input(TimerInput::SystemClock, 3);
        assert_eq!(bench.value(), 3);
    }

    #[test]
    fn test_timer2_prescaler_divides_by_eight() {
        let ic = Rc::new(RefCell::new(InterruptController::new(IrqLine::new())));
        let mut timer = Timer::new(TimerId::Timer2, ic);
        let mut mode = 0u16;
        mode_bits::SOURCE.set(&mut mode, 2);
        timer.set_mode(mode);

        timer.input(TimerInput::SystemClock, 7);
        assert_eq!(timer.value(), 0);
        timer.input(TimerInput::SystemClock, 1);
        assert_eq!(timer.value(), 1);
        timer.input(TimerInput::SystemClock, 17);
        assert_eq!(timer.value(), 3); // 25 ticks total = 3 counts + 1 left
    }
}
