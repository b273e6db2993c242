use codex_engine::Player;

/// Media element stand-in driven by a simulated clock.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedPlayer {
    position: f64,
    duration: Option<f64>,
    playing: bool,
}

impl SimulatedPlayer {
    pub fn new(duration: Option<f64>) -> Self {
        Self {
            position: 0.0,
            duration,
            playing: false,
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Moves the playhead forward by `seconds` while playing. Playback stops
    /// at the end of the media.
    pub fn advance(&mut self, seconds: f64) {
        if !self.playing || seconds <= 0.0 {
            return;
        }
        self.position += seconds;
        if let Some(duration) = self.duration {
            if self.position >= duration {
                self.position = duration;
                self.playing = false;
            }
        }
    }
}

impl Player for SimulatedPlayer {
    fn position(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        self.duration
    }

    fn seek(&mut self, seconds: f64) {
        let upper = self
            .duration
            .filter(|duration| duration.is_finite() && *duration > 0.0)
            .unwrap_or(f64::INFINITY);
        if seconds.is_nan() {
            return;
        }
        self.position = seconds.clamp(0.0, upper);
    }

    fn play(&mut self) {
        self.playing = true;
    }
}
