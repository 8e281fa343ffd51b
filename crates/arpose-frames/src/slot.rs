//! Hand-off of sensor samples from service callback threads to the render loop.
//!
//! A slot holds at most one value. The producer overwrites whatever is pending
//! (last-write-wins), the consumer takes the pending value at most once. Only plain
//! `Copy` data crosses the slot, so the critical section is a single move.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::frame::FramePair;
use crate::pose::{PoseSample, RawPose};

#[derive(Debug)]
struct Shared<T> {
    pending: Mutex<Option<T>>,
    published: AtomicU64,
    overwritten: AtomicU64,
}

impl<T> Shared<T> {
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // the slot only ever holds a complete value, so a poisoned lock is still usable
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Producer half of a slot. Owned by the callback thread.
#[derive(Debug)]
pub struct SlotWriter<T> {
    shared: Arc<Shared<T>>,
}

/// Consumer half of a slot. Owned by the render loop.
#[derive(Debug)]
pub struct SlotReader<T> {
    shared: Arc<Shared<T>>,
}

/// Create a connected writer/reader pair.
pub fn pose_slot<T>() -> (SlotWriter<T>, SlotReader<T>) {
    let shared = Arc::new(Shared {
        pending: Mutex::new(None),
        published: AtomicU64::new(0),
        overwritten: AtomicU64::new(0),
    });
    (
        SlotWriter {
            shared: shared.clone(),
        },
        SlotReader { shared },
    )
}

impl<T> SlotWriter<T> {
    /// Store `value`, replacing any value the reader has not taken yet.
    ///
    /// Returns `true` when an unconsumed value was overwritten.
    pub fn publish(&self, value: T) -> bool {
        let replaced = self.shared.lock().replace(value).is_some();
        self.shared.published.fetch_add(1, Ordering::Relaxed);
        if replaced {
            self.shared.overwritten.fetch_add(1, Ordering::Relaxed);
        }
        replaced
    }

    /// Whether the reader half is still alive.
    pub fn is_connected(&self) -> bool {
        Arc::strong_count(&self.shared) > 1
    }
}

impl<T> SlotReader<T> {
    /// Take the pending value, if any. Each published value is returned at most once.
    pub fn take(&self) -> Option<T> {
        self.shared.lock().take()
    }

    /// Whether a value is waiting to be taken.
    pub fn has_pending(&self) -> bool {
        self.shared.lock().is_some()
    }

    /// Total number of values published so far.
    pub fn published(&self) -> u64 {
        self.shared.published.load(Ordering::Relaxed)
    }

    /// Number of values replaced before the reader took them.
    pub fn overwritten(&self) -> u64 {
        self.shared.overwritten.load(Ordering::Relaxed)
    }
}

#[derive(Debug)]
struct Route {
    writer: SlotWriter<PoseSample>,
    last_timestamp: Option<f64>,
}

/// Routes pose callbacks to one slot per subscribed frame pair.
///
/// The listener is moved into the service's callback; it converts each [`RawPose`] and
/// publishes it to the matching slot without touching any render state.
#[derive(Debug, Default)]
pub struct PoseListener {
    routes: HashMap<FramePair, Route>,
}

impl PoseListener {
    /// A listener with no subscriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `pair`. A previous subscription for the same pair is replaced.
    pub fn subscribe(&mut self, pair: FramePair) -> SlotReader<PoseSample> {
        let (writer, reader) = pose_slot();
        self.routes.insert(
            pair,
            Route {
                writer,
                last_timestamp: None,
            },
        );
        reader
    }

    /// Frame pairs with a live subscription.
    pub fn subscriptions(&self) -> impl Iterator<Item = &FramePair> {
        self.routes.keys()
    }

    /// Callback entry point. Returns `true` when the pose was published.
    ///
    /// Poses for unsubscribed pairs, malformed poses and poses older than the last one
    /// published for the same pair are dropped.
    pub fn on_pose_available(&mut self, raw: RawPose) -> bool {
        let Some(route) = self.routes.get_mut(&raw.frame_pair) else {
            log::trace!("no subscriber for {}", raw.frame_pair);
            return false;
        };

        let sample = match PoseSample::try_from(raw) {
            Ok(sample) => sample,
            Err(err) => {
                log::warn!("dropping pose: {err}");
                return false;
            }
        };

        if let Some(last) = route.last_timestamp {
            if sample.timestamp < last {
                log::warn!(
                    "dropping out-of-order pose for {}: {} < {}",
                    sample.frame_pair,
                    sample.timestamp,
                    last
                );
                return false;
            }
        }

        route.last_timestamp = Some(sample.timestamp);
        if route.writer.publish(sample) {
            log::trace!("pose for {} overwritten before consumption", sample.frame_pair);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::CoordinateFrame;
    use crate::pose::PoseStatus;

    fn raw(pair: FramePair, timestamp: f64, x: f64) -> RawPose {
        RawPose {
            timestamp,
            position: [x, 0.0, 0.0],
            orientation: [0.0, 0.0, 0.0, 1.0],
            status_code: 1,
            frame_pair: pair,
        }
    }

    #[test]
    fn test_take_at_most_once() {
        let (writer, reader) = pose_slot::<u32>();
        assert_eq!(reader.take(), None);
        assert!(!writer.publish(7));
        assert!(reader.has_pending());
        assert_eq!(reader.take(), Some(7));
        assert_eq!(reader.take(), None);
    }

    #[test]
    fn test_last_write_wins() {
        let (writer, reader) = pose_slot::<u32>();
        writer.publish(1);
        assert!(writer.publish(2));
        assert!(writer.publish(3));
        assert_eq!(reader.take(), Some(3));
        assert_eq!(reader.published(), 3);
        assert_eq!(reader.overwritten(), 2);
    }

    #[test]
    fn test_writer_sees_dropped_reader() {
        let (writer, reader) = pose_slot::<u32>();
        assert!(writer.is_connected());
        drop(reader);
        assert!(!writer.is_connected());
    }

    #[test]
    fn test_cross_thread() {
        let (writer, reader) = pose_slot::<u64>();
        let producer = std::thread::spawn(move || {
            for i in 1..=1000 {
                writer.publish(i);
            }
        });
        let mut seen = Vec::new();
        while !producer.is_finished() {
            if let Some(v) = reader.take() {
                seen.push(v);
            }
        }
        assert!(producer.join().is_ok());
        if let Some(v) = reader.take() {
            seen.push(v);
        }

        // consumed values are strictly increasing and the final one is never lost
        assert!(seen.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(seen.last(), Some(&1000));
    }

    #[test]
    fn test_listener_routes_by_pair() {
        let mut listener = PoseListener::new();
        let sos = listener.subscribe(FramePair::START_OF_SERVICE_T_DEVICE);
        let adf = listener.subscribe(FramePair::AREA_DESCRIPTION_T_DEVICE);
        assert_eq!(listener.subscriptions().count(), 2);

        assert!(listener.on_pose_available(raw(FramePair::START_OF_SERVICE_T_DEVICE, 1.0, 1.0)));
        assert!(listener.on_pose_available(raw(FramePair::AREA_DESCRIPTION_T_DEVICE, 0.5, 2.0)));
        assert!(!listener.on_pose_available(raw(
            FramePair::new(CoordinateFrame::Imu, CoordinateFrame::Device),
            1.0,
            0.0
        )));

        assert_eq!(sos.take().map(|s| s.transform.t.x), Some(1.0));
        assert_eq!(adf.take().map(|s| s.transform.t.x), Some(2.0));
    }

    #[test]
    fn test_listener_drops_out_of_order_and_malformed() {
        let mut listener = PoseListener::new();
        let pair = FramePair::START_OF_SERVICE_T_DEVICE;
        let reader = listener.subscribe(pair);

        assert!(listener.on_pose_available(raw(pair, 2.0, 1.0)));
        assert!(!listener.on_pose_available(raw(pair, 1.0, 5.0)));
        assert!(listener.on_pose_available(raw(pair, 2.0, 3.0)));

        let mut broken = raw(pair, 3.0, 0.0);
        broken.orientation = [0.0; 4];
        assert!(!listener.on_pose_available(broken));

        assert_eq!(reader.take().map(|s| s.transform.t.x), Some(3.0));
    }

    #[test]
    fn test_listener_nan_timestamp_keeps_ordering() {
        let mut listener = PoseListener::new();
        let pair = FramePair::START_OF_SERVICE_T_DEVICE;
        let reader = listener.subscribe(pair);

        assert!(listener.on_pose_available(raw(pair, 5.0, 1.0)));

        let mut lost = raw(pair, f64::NAN, 0.0);
        lost.status_code = 2;
        assert!(!listener.on_pose_available(lost));

        // still older than the last accepted pose
        assert!(!listener.on_pose_available(raw(pair, 1.0, 2.0)));
        assert!(listener.on_pose_available(raw(pair, 6.0, 3.0)));

        assert_eq!(reader.take().map(|s| s.transform.t.x), Some(3.0));
        assert_eq!(reader.published(), 2);
    }

    #[test]
    fn test_listener_forwards_unusable_samples() {
        let mut listener = PoseListener::new();
        let pair = FramePair::START_OF_SERVICE_T_DEVICE;
        let reader = listener.subscribe(pair);

        let mut lost = raw(pair, 1.0, 0.0);
        lost.status_code = 2;
        lost.orientation = [0.0; 4];
        assert!(listener.on_pose_available(lost));
        assert_eq!(reader.take().map(|s| s.status), Some(PoseStatus::Invalid));
    }
}
