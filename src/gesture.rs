use tracing::trace;

/// Minimum horizontal travel before a drag counts as a swipe.
pub const SWIPE_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Previous,
    Next,
    None,
}

/// Tracks a single drag from pointer-down to pointer-up.
#[derive(Debug, Clone)]
pub struct GestureSession {
    start_x: Option<f64>,
    offset_x: f64,
    threshold: f64,
}

impl Default for GestureSession {
    fn default() -> Self {
        Self::with_threshold(SWIPE_THRESHOLD)
    }
}

impl GestureSession {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            start_x: None,
            offset_x: 0.0,
            threshold,
        }
    }

    pub fn on_start(&mut self, x: f64) {
        self.start_x = Some(x);
        self.offset_x = 0.0;
    }

    pub fn on_move(&mut self, x: f64) {
        if let Some(start) = self.start_x {
            self.offset_x = x - start;
        }
    }

    /// Finish the drag. The session is cleared whether or not a swipe fired.
    pub fn on_end(&mut self) -> Intent {
        let intent = match self.start_x {
            None => Intent::None,
            Some(_) if self.offset_x.abs() > self.threshold => {
                // Dragging right reveals the previous card
                if self.offset_x > 0.0 {
                    Intent::Previous
                } else {
                    Intent::Next
                }
            }
            Some(_) => Intent::None,
        };
        trace!("Gesture ended: offset {} => {intent:?}", self.offset_x);
        self.start_x = None;
        self.offset_x = 0.0;
        intent
    }

    /// Live drag offset, for shifting the card while the pointer is down.
    pub fn offset(&self) -> f64 {
        self.offset_x
    }

    pub fn is_active(&self) -> bool {
        self.start_x.is_some()
    }
}
