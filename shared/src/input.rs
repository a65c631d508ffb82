use serde::{Deserialize, Serialize};

/// One snapshot of a player's controls, sampled by the owning peer once
/// per step and relayed to the host. Edge-triggered buttons (jump, dash)
/// carry the just-pressed flag from the sampler; the host consumes
/// whatever sample is current each step, so a sample that is never
/// superseded keeps applying.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSample {
    pub axis_x: f32,
    pub axis_y: f32,
    pub jump: bool,
    pub dash: bool,
    pub attack: bool,
}

impl InputSample {
    pub fn idle() -> Self {
        Self::default()
    }

    /// Structural cleanup applied on receipt: axes clamped into [-1, 1],
    /// non-finite values zeroed. No gameplay validation happens here.
    pub fn sanitized(self) -> Self {
        fn clean(v: f32) -> f32 {
            if v.is_finite() {
                v.clamp(-1.0, 1.0)
            } else {
                0.0
            }
        }

        InputSample {
            axis_x: clean(self.axis_x),
            axis_y: clean(self.axis_y),
            ..self
        }
    }
}
