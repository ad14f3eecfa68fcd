/// A sequence of sprite-frame names shown with a fixed delay per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    frames: Vec<String>,
    delay_per_frame: f32,
}

impl Animation {
    pub fn new(frames: Vec<String>, delay_per_frame: f32) -> Self {
        let delay_per_frame = if delay_per_frame.is_finite() && delay_per_frame > 0.0 {
            delay_per_frame
        } else {
            0.0
        };
        Self {
            frames,
            delay_per_frame,
        }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn delay_per_frame(&self) -> f32 {
        self.delay_per_frame
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn duration(&self) -> f32 {
        self.frames.len() as f32 * self.delay_per_frame
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnimationPlayback {
    animation: Animation,
    looping: bool,
    elapsed: f32,
    frame_index: usize,
    finished: bool,
}

impl AnimationPlayback {
    pub fn new(animation: Animation, looping: bool) -> Self {
        let finished = animation.is_empty();
        Self {
            animation,
            looping,
            elapsed: 0.0,
            frame_index: 0,
            finished,
        }
    }

    pub fn animation(&self) -> &Animation {
        &self.animation
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    pub fn current_frame(&self) -> Option<&str> {
        self.animation
            .frames
            .get(self.frame_index)
            .map(String::as_str)
    }

    /// Advances playback and returns the frame to display when it changed.
    pub fn advance(&mut self, dt_seconds: f32) -> Option<&str> {
        if self.finished || !dt_seconds.is_finite() || dt_seconds <= 0.0 {
            return None;
        }
        let frame_count = self.animation.frames.len();
        let delay = self.animation.delay_per_frame;
        if delay <= 0.0 {
            // Zero delay: jump straight to the end of a one-shot, hold for loops.
            if !self.looping {
                self.frame_index = frame_count - 1;
                self.finished = true;
                return self.current_frame();
            }
            return None;
        }

        let before = self.frame_index;
        self.elapsed += dt_seconds;
        while self.elapsed >= delay {
            self.elapsed -= delay;
            if self.frame_index + 1 < frame_count {
                self.frame_index += 1;
            } else if self.looping {
                self.frame_index = 0;
            } else {
                self.finished = true;
                self.elapsed = 0.0;
                break;
            }
        }

        if self.frame_index != before {
            self.current_frame()
        } else {
            None
        }
    }
}
