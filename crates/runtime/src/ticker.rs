use crate::frame::Frame;

/// Handle for one run of a [`Ticker`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TickerHandle(pub u64);

/// Cancelable repeating schedule driven by display-refresh frames.
///
/// While stopped the ticker asks for no frames at all; the host consults
/// [`Ticker::is_active`] before requesting the next refresh callback.
#[derive(Debug, Default)]
pub struct Ticker {
    next_handle: u64,
    active: Option<TickerHandle>,
    last_frame: Option<u64>,
    ticks: u64,
}

impl Ticker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking. Starting an active ticker returns the existing handle.
    pub fn start(&mut self) -> TickerHandle {
        if let Some(handle) = self.active {
            return handle;
        }
        let handle = TickerHandle(self.next_handle);
        self.next_handle = self.next_handle.wrapping_add(1);
        self.active = Some(handle);
        handle
    }

    /// Releases the active handle. Returns `false` if already stopped.
    pub fn stop(&mut self) -> bool {
        self.active.take().is_some()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn handle(&self) -> Option<TickerHandle> {
        self.active
    }

    /// Returns `true` if `frame` is a tick: the ticker is active and the
    /// frame has not been seen before.
    pub fn on_frame(&mut self, frame: Frame) -> bool {
        if self.active.is_none() || self.last_frame == Some(frame.index) {
            return false;
        }
        self.last_frame = Some(frame.index);
        self.ticks += 1;
        true
    }

    /// Total ticks delivered across all runs.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::Ticker;
    use crate::frame::Frame;
    use foundation::time::Time;

    #[test]
    fn ticks_only_while_active() {
        let mut t = Ticker::new();
        let f0 = Frame::first(Time(0));
        assert!(!t.on_frame(f0));

        let h = t.start();
        assert_eq!(t.start(), h);
        let f1 = f0.next(Time(16));
        assert!(t.on_frame(f1));
        assert!(!t.on_frame(f1));

        assert!(t.stop());
        assert!(!t.stop());
        assert!(!t.on_frame(f1.next(Time(32))));
        assert_eq!(t.ticks(), 1);
    }

    #[test]
    fn restart_issues_fresh_handle() {
        let mut t = Ticker::new();
        let a = t.start();
        t.stop();
        let b = t.start();
        assert_ne!(a, b);
    }
}
