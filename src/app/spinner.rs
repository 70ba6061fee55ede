use std::time::Duration;

/// Frame set and cadence of a loading indicator.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SpinnerStyle {
    pub frames: &'static [&'static str],
    pub interval: Duration,
}

impl SpinnerStyle {
    pub const DOT: Self = Self {
        frames: &["⣾ ", "⣽ ", "⣻ ", "⢿ ", "⡿ ", "⣟ ", "⣯ ", "⣷ "],
        interval: Duration::from_millis(100),
    };

    pub const LINE: Self = Self {
        frames: &["|", "/", "-", "\\"],
        interval: Duration::from_millis(100),
    };
}

#[derive(Clone, Debug)]
pub struct Spinner {
    pub style: SpinnerStyle,
    frame: usize,
}

impl Spinner {
    pub fn new(style: SpinnerStyle) -> Self {
        Self { style, frame: 0 }
    }

    pub fn advance(&mut self) {
        self.frame = (self.frame + 1) % self.style.frames.len().max(1);
    }

    pub fn reset(&mut self) {
        self.frame = 0;
    }

    pub fn frame(&self) -> &'static str {
        self.style.frames.get(self.frame).copied().unwrap_or("")
    }
}
