use crate::evdev::{DeviceInfo, InputEventSource};
use crate::frames::FrameSource;
use crate::report::{Frame, Reporter};
use crate::ErrorString;
use evdev_rs::InputEvent;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use std::thread::JoinHandle;

// One worker per device. The evdev handle lives on the worker thread, frames
// cross over the channel. Dropping the worker (or its receiver side going
// away) shuts the thread down.
pub struct TrackerWorker {
    thread: Option<JoinHandle<()>>,
    receiver: Receiver<Frame>,
    stop: Arc<AtomicBool>,
}

impl TrackerWorker {
    pub fn open(path: String, grab: bool, info: DeviceInfo, reporter: Reporter) -> TrackerWorker {
        TrackerWorker::spawn(move |stop| match InputEventSource::new(&path, grab, stop) {
            Ok(source) => Some(FrameSource::new(source, info, reporter)),
            Err(ErrorString(message)) => {
                log::error!("cannot start touch tracking: {}", message);
                None
            }
        })
    }

    pub fn from_events<I>(events: I, info: DeviceInfo, reporter: Reporter) -> TrackerWorker
    where
        I: Iterator<Item = InputEvent> + Send + 'static,
    {
        TrackerWorker::spawn(move |_stop| Some(FrameSource::new(events, info, reporter)))
    }

    fn spawn<F>(make_frame_source: F) -> TrackerWorker
    where
        F: FnOnce(Arc<AtomicBool>) -> Option<FrameSource> + Send + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let (sender, receiver) = channel();
        let stop_for_thread = stop.clone();
        let thread = std::thread::spawn(move || {
            if let Some(frames) = make_frame_source(stop_for_thread) {
                for frame in frames {
                    if sender.send(frame).is_err() {
                        break;
                    }
                }
            }
            log::debug!("touch tracking worker exiting");
        });
        TrackerWorker {
            thread: Some(thread),
            receiver,
            stop,
        }
    }

    pub fn frames(&self) -> impl Iterator<Item = Frame> + '_ {
        self.receiver.iter()
    }

    pub fn stop(&self) {
        self.stop.store(true, Ordering::Relaxed);
    }
}

impl Drop for TrackerWorker {
    fn drop(&mut self) {
        self.stop();
        if let Some(thread) = self.thread.take() {
            if let Err(error) = thread.join() {
                log::error!("touch tracking worker panicked: {:?}", error);
            }
        }
    }
}
