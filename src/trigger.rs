//! Boot-time check for a configuration-mode request.
//!
//! The operator holds (or releases) a button during a short window after
//! reset. Any sampled level different from the first one counts as a request.
//! Samples are not debounced.

use std::time::Duration;

/// A digital input sampled by [`EntryTrigger`].
pub trait TriggerInput {
    fn is_high(&mut self) -> bool;
}

/// An output toggled as an "alive" indicator.
pub trait Heartbeat {
    fn toggle(&mut self);
}

/// For boards without an indicator LED.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHeartbeat;

impl Heartbeat for NoHeartbeat {
    fn toggle(&mut self) {}
}

impl<T: TriggerInput + ?Sized> TriggerInput for &mut T {
    fn is_high(&mut self) -> bool {
        T::is_high(self)
    }
}

impl<T: Heartbeat + ?Sized> Heartbeat for &mut T {
    fn toggle(&mut self) {
        T::toggle(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Requested,
    NoRequest,
}

#[derive(Debug, Clone)]
pub struct EntryTrigger {
    interval: Duration,
    window_ticks: u32,
    elapsed: u32,
    initial: bool,
}

impl EntryTrigger {
    pub fn new(window: Duration, interval: Duration) -> Self {
        let interval = interval.max(Duration::from_millis(1));
        let window_ticks = window.as_millis().div_ceil(interval.as_millis());
        Self {
            interval,
            window_ticks: u32::try_from(window_ticks).unwrap_or(u32::MAX),
            elapsed: 0,
            initial: false,
        }
    }

    pub fn window_ticks(&self) -> u32 {
        self.window_ticks
    }

    pub fn elapsed_ticks(&self) -> u32 {
        self.elapsed
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Records the reference level and restarts the window.
    pub fn begin(&mut self, level: bool) {
        self.initial = level;
        self.elapsed = 0;
    }

    /// Feeds one sample. `None` means keep polling.
    pub fn sample(&mut self, level: bool) -> Option<TriggerOutcome> {
        self.elapsed = self.elapsed.saturating_add(1);
        if level != self.initial {
            Some(TriggerOutcome::Requested)
        } else if self.elapsed >= self.window_ticks {
            Some(TriggerOutcome::NoRequest)
        } else {
            None
        }
    }

    /// Polls `input` until its level changes or the window runs out, toggling
    /// `heartbeat` once per tick.
    pub fn wait<I, H, F>(&mut self, mut input: I, mut heartbeat: H, mut sleep: F) -> TriggerOutcome
    where
        I: TriggerInput,
        H: Heartbeat,
        F: FnMut(Duration),
    {
        let initial = input.is_high();
        self.begin(initial);
        log::info!(
            "waiting {} ticks for a configuration request (input {})",
            self.window_ticks,
            if initial { "high" } else { "low" }
        );
        if self.window_ticks == 0 {
            return TriggerOutcome::NoRequest;
        }

        let outcome = loop {
            heartbeat.toggle();
            if let Some(outcome) = self.sample(input.is_high()) {
                break outcome;
            }
            sleep(self.interval);
        };
        log::info!(
            "configuration mode: {} after {} ticks",
            match outcome {
                TriggerOutcome::Requested => "requested",
                TriggerOutcome::NoRequest => "no request",
            },
            self.elapsed
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::*;

    /// Replays a fixed sequence of levels, repeating the last one forever.
    struct Script {
        levels: VecDeque<bool>,
        reads: usize,
    }

    impl Script {
        fn new(levels: &[bool]) -> Self {
            Self {
                levels: levels.iter().copied().collect(),
                reads: 0,
            }
        }
    }

    impl TriggerInput for Script {
        fn is_high(&mut self) -> bool {
            self.reads += 1;
            if self.levels.len() > 1 {
                self.levels.pop_front().unwrap()
            } else {
                self.levels[0]
            }
        }
    }

    #[derive(Default)]
    struct Blinks(u32);

    impl Heartbeat for Blinks {
        fn toggle(&mut self) {
            self.0 += 1;
        }
    }

    const POLL: Duration = Duration::from_millis(50);

    #[test]
    fn window_is_rounded_up_to_whole_ticks() {
        assert_eq!(EntryTrigger::new(Duration::from_millis(1000), POLL).window_ticks(), 20);
        assert_eq!(EntryTrigger::new(Duration::from_millis(1001), POLL).window_ticks(), 21);
        assert_eq!(EntryTrigger::new(Duration::ZERO, POLL).window_ticks(), 0);
    }

    #[test]
    fn steady_input_means_no_request() {
        let mut trigger = EntryTrigger::new(Duration::from_millis(500), POLL);
        let mut input = Script::new(&[true]);
        let mut blinks = Blinks::default();
        let mut slept = Duration::ZERO;

        let outcome = trigger.wait(&mut input, &mut blinks, |d| slept += d);

        assert_eq!(outcome, TriggerOutcome::NoRequest);
        assert_eq!(trigger.elapsed_ticks(), 10);
        assert_eq!(blinks.0, 10);
        // One initial read plus one per tick.
        assert_eq!(input.reads, 11);
        assert_eq!(slept, POLL * 9);
    }

    #[test]
    fn a_change_on_any_tick_is_a_request() {
        for tick in 1..=10usize {
            let mut levels = vec![false; tick];
            levels.push(true);
            let mut trigger = EntryTrigger::new(Duration::from_millis(500), POLL);
            let outcome = trigger.wait(Script::new(&levels), NoHeartbeat, |_| {});
            assert_eq!(outcome, TriggerOutcome::Requested, "change at tick {tick}");
            assert_eq!(trigger.elapsed_ticks() as usize, tick);
        }
    }

    #[test]
    fn a_single_glitch_is_enough() {
        let mut trigger = EntryTrigger::new(Duration::from_millis(500), POLL);
        let outcome = trigger.wait(Script::new(&[true, true, false, true]), NoHeartbeat, |_| {});
        assert_eq!(outcome, TriggerOutcome::Requested);
        assert_eq!(trigger.elapsed_ticks(), 2);
    }

    #[test]
    fn changes_after_the_window_are_missed() {
        let mut levels = vec![false; 11];
        levels.push(true);
        let mut trigger = EntryTrigger::new(Duration::from_millis(500), POLL);
        let outcome = trigger.wait(Script::new(&levels), NoHeartbeat, |_| {});
        assert_eq!(outcome, TriggerOutcome::NoRequest);
    }

    #[test]
    fn zero_window_never_polls() {
        let mut trigger = EntryTrigger::new(Duration::ZERO, POLL);
        let mut blinks = Blinks::default();
        let outcome = trigger.wait(Script::new(&[false, true]), &mut blinks, |_| {});
        assert_eq!(outcome, TriggerOutcome::NoRequest);
        assert_eq!(blinks.0, 0);
    }

    #[test]
    fn sample_drives_the_window_step_by_step() {
        let mut trigger = EntryTrigger::new(Duration::from_millis(150), POLL);
        trigger.begin(false);
        assert_eq!(trigger.sample(false), None);
        assert_eq!(trigger.sample(false), None);
        assert_eq!(trigger.sample(false), Some(TriggerOutcome::NoRequest));

        trigger.begin(false);
        assert_eq!(trigger.sample(false), None);
        assert_eq!(trigger.sample(true), Some(TriggerOutcome::Requested));
    }
}
