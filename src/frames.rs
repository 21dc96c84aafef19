use crate::evdev::{decode, DeviceInfo, SynChunkSource, TouchInput};
use crate::report::{Frame, Reporter};
use crate::tracker::ContactTracker;
use evdev_rs::InputEvent;

pub struct FrameSource {
    chunks: SynChunkSource,
    tracker: ContactTracker,
    reporter: Reporter,
}

impl FrameSource {
    pub fn new(
        events: impl Iterator<Item = InputEvent> + 'static,
        info: DeviceInfo,
        reporter: Reporter,
    ) -> FrameSource {
        FrameSource {
            chunks: SynChunkSource::new(events),
            tracker: ContactTracker::new(info),
            reporter,
        }
    }
}

impl Iterator for FrameSource {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            let chunk = self.chunks.next()?;
            for event in &chunk {
                self.tracker.feed(decode(event));
            }
            let contacts = self.tracker.feed(TouchInput::Report);
            if !contacts.is_empty() {
                return Some(self.reporter.touch_frame(&contacts));
            }
        }
    }
}
