use foundation::time::Time;

/// One display-refresh callback from the host.
///
/// Frames are the only point where batched surface mutations are flushed, so
/// everything queued between two frames lands in a single visual update.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Frame {
    /// 0-based frame index.
    pub index: u64,
    /// Host time at the start of the frame.
    pub time: Time,
}

impl Frame {
    pub fn new(index: u64, time: Time) -> Self {
        Self { index, time }
    }

    pub fn first(time: Time) -> Self {
        Self::new(0, time)
    }

    /// The following frame, stamped with the host's next refresh time.
    pub fn next(self, time: Time) -> Self {
        Self::new(self.index + 1, time.max(self.time))
    }
}

#[cfg(test)]
mod tests {
    use super::Frame;
    use foundation::time::Time;

    #[test]
    fn next_advances_index_and_time() {
        let f0 = Frame::first(Time(0));
        let f1 = f0.next(Time(16));
        assert_eq!(f1.index, 1);
        assert_eq!(f1.time, Time(16));
    }

    #[test]
    fn next_never_goes_back_in_time() {
        let f = Frame::new(3, Time(100)).next(Time(90));
        assert_eq!(f.time, Time(100));
    }
}
