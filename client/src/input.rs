//! Input sources feeding the relay loop.
//!
//! The session polls its source once per send tick for a control sample
//! and an aim point, then relays both on the best-effort lane. Real
//! frontends implement [`InputSource`] over their input device; the
//! bundled sources cover headless runs and scripted sessions.

use std::collections::VecDeque;

use shared::{InputSample, Vec2};

/// Where the local player's controls come from.
///
/// Sources are polled at the send rate, so one poll equals one relayed
/// sample. A source that needs time tracks it by counting polls.
pub trait InputSource: Send {
    /// Controls for the next relay.
    fn sample(&mut self) -> InputSample;

    /// World-space aim point for the next relay.
    fn aim(&mut self) -> Vec2;
}

/// A player standing still. Useful for spectating and soak testing.
pub struct IdleInput;

impl InputSource for IdleInput {
    fn sample(&mut self) -> InputSample {
        InputSample::idle()
    }

    fn aim(&mut self) -> Vec2 {
        Vec2::ZERO
    }
}

struct ScriptStep {
    input: InputSample,
    aim: Vec2,
    polls: u32,
}

/// A fixed sequence of control phases, each held for a number of send
/// ticks. The script idles with the last aim point once it runs out.
pub struct ScriptedInput {
    steps: VecDeque<ScriptStep>,
    current_aim: Vec2,
}

impl ScriptedInput {
    pub fn new() -> Self {
        ScriptedInput {
            steps: VecDeque::new(),
            current_aim: Vec2::ZERO,
        }
    }

    /// Appends a phase holding `input` and `aim` for `polls` send ticks.
    /// A zero count is promoted to one so every phase is observable.
    pub fn hold(mut self, input: InputSample, aim: Vec2, polls: u32) -> Self {
        self.steps.push_back(ScriptStep {
            input,
            aim,
            polls: polls.max(1),
        });
        self
    }

    pub fn is_finished(&self) -> bool {
        self.steps.is_empty()
    }
}

impl Default for ScriptedInput {
    fn default() -> Self {
        Self::new()
    }
}

impl InputSource for ScriptedInput {
    fn sample(&mut self) -> InputSample {
        match self.steps.front_mut() {
            Some(step) => {
                let input = step.input;
                self.current_aim = step.aim;
                step.polls -= 1;
                if step.polls == 0 {
                    self.steps.pop_front();
                }
                input
            }
            None => InputSample::idle(),
        }
    }

    fn aim(&mut self) -> Vec2 {
        self.current_aim
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn running_right() -> InputSample {
        InputSample {
            axis_x: 1.0,
            ..InputSample::idle()
        }
    }

    #[test]
    fn test_idle_source_never_moves() {
        let mut source = IdleInput;
        for _ in 0..5 {
            assert_eq!(source.sample(), InputSample::idle());
        }
        assert_eq!(source.aim(), Vec2::ZERO);
    }

    #[test]
    fn test_script_advances_through_phases() {
        let mut source = ScriptedInput::new()
            .hold(running_right(), Vec2::new(900.0, 300.0), 2)
            .hold(InputSample::idle(), Vec2::new(100.0, 100.0), 1);

        assert_eq!(source.sample().axis_x, 1.0);
        assert_eq!(source.aim(), Vec2::new(900.0, 300.0));
        assert_eq!(source.sample().axis_x, 1.0);

        assert_eq!(source.sample(), InputSample::idle());
        assert_eq!(source.aim(), Vec2::new(100.0, 100.0));
        assert!(source.is_finished());
    }

    #[test]
    fn test_exhausted_script_idles_with_last_aim() {
        let mut source = ScriptedInput::new().hold(running_right(), Vec2::new(800.0, 300.0), 1);

        source.sample();
        assert_eq!(source.sample(), InputSample::idle());
        assert_eq!(source.aim(), Vec2::new(800.0, 300.0));
    }

    #[test]
    fn test_zero_poll_phase_still_runs_once() {
        let mut source = ScriptedInput::new().hold(running_right(), Vec2::ZERO, 0);

        assert_eq!(source.sample().axis_x, 1.0);
        assert!(source.is_finished());
    }
}
