//! Bounded multi-channel sample window with synchronized FIFO eviction.
//!
//! The buffer is the only state shared between the ingestion thread (sole
//! writer) and the render loop (snapshot reader). Both [`SampleBuffer::append`]
//! and [`SampleBuffer::snapshot`] take the same mutex, so a reader never sees
//! a channel with more or fewer entries than the timestamp sequence.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::sample::{TelemetrySample, Timestamp};

/// Largest window a configuration may ask for.
pub const MAX_CAPACITY: usize = 1_000_000;

/// Entries reserved up front per sequence; larger windows grow on demand.
const INITIAL_RESERVE: usize = 1024;

/// Thread-safe bounded window of recent samples.
pub struct SampleBuffer {
    capacity: usize,
    dimension: usize,
    window: Mutex<Window>,
}

struct Window {
    timestamps: VecDeque<Timestamp>,
    channels: Vec<VecDeque<f64>>,
}

impl SampleBuffer {
    /// Create an empty buffer holding at most `capacity` samples of
    /// `dimension` channels each.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` or `dimension` is zero.
    pub fn new(capacity: usize, dimension: usize) -> Self {
        assert!(capacity > 0, "sample buffer capacity must be at least 1");
        assert!(dimension > 0, "sample buffer needs at least one channel");
        let reserve = capacity.min(INITIAL_RESERVE);
        Self {
            capacity,
            dimension,
            window: Mutex::new(Window {
                timestamps: VecDeque::with_capacity(reserve),
                channels: (0..dimension)
                    .map(|_| VecDeque::with_capacity(reserve))
                    .collect(),
            }),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.window.lock().unwrap().timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append one reading, evicting the oldest entry from every sequence when
    /// the buffer is full.
    ///
    /// Timestamps are kept non-decreasing: a reading stamped earlier than the
    /// newest stored one (wall clock stepped back) is stored with the newest
    /// timestamp.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the buffer dimension. The decoder
    /// guarantees the arity before anything reaches the buffer, so a mismatch
    /// is a wiring bug rather than bad input.
    pub fn append(&self, timestamp: Timestamp, values: &[f64]) {
        assert_eq!(
            values.len(),
            self.dimension,
            "sample dimension does not match buffer dimension"
        );

        let mut w = self.window.lock().unwrap();
        let timestamp = match w.timestamps.back() {
            Some(&newest) if timestamp < newest => newest,
            _ => timestamp,
        };
        if w.timestamps.len() == self.capacity {
            w.timestamps.pop_front();
            for channel in &mut w.channels {
                channel.pop_front();
            }
        }
        w.timestamps.push_back(timestamp);
        for (channel, &value) in w.channels.iter_mut().zip(values) {
            channel.push_back(value);
        }
    }

    /// Append a whole sample. See [`SampleBuffer::append`].
    pub fn push(&self, sample: &TelemetrySample) {
        self.append(sample.timestamp(), sample.values());
    }

    /// Independent copy of the whole window, taken at a single instant.
    pub fn snapshot(&self) -> Snapshot {
        let w = self.window.lock().unwrap();
        Snapshot {
            timestamps: w.timestamps.iter().copied().collect(),
            channels: w
                .channels
                .iter()
                .map(|c| c.iter().copied().collect())
                .collect(),
        }
    }
}

/// Point-in-time copy of a [`SampleBuffer`].
///
/// `channels[i][j]` is the value of channel `i` at `timestamps[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub timestamps: Vec<Timestamp>,
    pub channels: Vec<Vec<f64>>,
}

impl Snapshot {
    pub fn len(&self) -> usize {
        self.timestamps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.timestamps.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.channels.len()
    }

    /// Values of channel `index`, oldest first.
    pub fn channel(&self, index: usize) -> Option<&[f64]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Oldest and newest timestamp in the window.
    pub fn time_span(&self) -> Option<(Timestamp, Timestamp)> {
        Some((*self.timestamps.first()?, *self.timestamps.last()?))
    }

    /// Reassemble the `index`-th sample across all channels.
    pub fn sample(&self, index: usize) -> Option<TelemetrySample> {
        let timestamp = *self.timestamps.get(index)?;
        let values = self
            .channels
            .iter()
            .map(|c| c.get(index).copied())
            .collect::<Option<Vec<f64>>>()?;
        Some(TelemetrySample::new(timestamp, values))
    }

    /// Every sample in arrival order.
    pub fn samples(&self) -> Vec<TelemetrySample> {
        (0..self.len()).filter_map(|i| self.sample(i)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Local, TimeZone};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    fn t(secs: i64) -> Timestamp {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + Duration::seconds(secs)
    }

    fn assert_synchronized(snap: &Snapshot) {
        for (i, channel) in snap.channels.iter().enumerate() {
            assert_eq!(
                channel.len(),
                snap.timestamps.len(),
                "channel {i} out of step with timestamps"
            );
        }
    }

    #[test]
    fn new_buffer_is_empty() {
        let buf = SampleBuffer::new(10, 3);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 10);
        assert_eq!(buf.dimension(), 3);
        let snap = buf.snapshot();
        assert!(snap.is_empty());
        assert_eq!(snap.dimension(), 3);
        assert_eq!(snap.time_span(), None);
    }

    #[test]
    fn huge_capacity_allocates_on_demand() {
        let buf = SampleBuffer::new(usize::MAX / 4, 3);
        buf.append(t(0), &[1.0, 2.0, 3.0]);
        buf.append(t(1), &[4.0, 5.0, 6.0]);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.capacity(), usize::MAX / 4);
    }

    #[test]
    #[should_panic(expected = "capacity must be at least 1")]
    fn zero_capacity_panics() {
        let _ = SampleBuffer::new(0, 3);
    }

    #[test]
    #[should_panic(expected = "dimension does not match")]
    fn dimension_mismatch_panics() {
        let buf = SampleBuffer::new(4, 3);
        buf.append(t(0), &[1.0, 2.0]);
    }

    #[test]
    fn capacity_three_keeps_last_three() {
        let buf = SampleBuffer::new(3, 3);
        for i in 1..=5 {
            let v = i as f64;
            buf.append(t(i), &[v, v, v]);
        }
        let snap = buf.snapshot();
        assert_eq!(
            snap.samples(),
            vec![
                TelemetrySample::new(t(3), vec![3.0, 3.0, 3.0]),
                TelemetrySample::new(t(4), vec![4.0, 4.0, 4.0]),
                TelemetrySample::new(t(5), vec![5.0, 5.0, 5.0]),
            ]
        );
    }

    #[test]
    fn length_is_min_of_appends_and_capacity() {
        for capacity in [1usize, 2, 7, 16] {
            let buf = SampleBuffer::new(capacity, 2);
            for k in 1..=(capacity * 3) {
                buf.append(t(k as i64), &[k as f64, -(k as f64)]);
                let snap = buf.snapshot();
                assert_eq!(snap.len(), k.min(capacity));
                assert_synchronized(&snap);
                let expected_first = k.saturating_sub(capacity) + 1;
                assert_eq!(snap.channels[0][0], expected_first as f64);
                assert_eq!(snap.channels[1][0], -(expected_first as f64));
                assert_eq!(*snap.channels[0].last().unwrap(), k as f64);
            }
        }
    }

    #[test]
    fn capacity_one_holds_only_newest() {
        let buf = SampleBuffer::new(1, 1);
        buf.append(t(0), &[1.0]);
        buf.append(t(1), &[2.0]);
        let snap = buf.snapshot();
        assert_eq!(snap.timestamps, vec![t(1)]);
        assert_eq!(snap.channel(0), Some(&[2.0][..]));
    }

    #[test]
    fn duplicates_are_kept_in_arrival_order() {
        let buf = SampleBuffer::new(5, 1);
        for v in [2.0, 2.0, 1.0, 2.0] {
            buf.append(t(0), &[v]);
        }
        assert_eq!(buf.snapshot().channels[0], vec![2.0, 2.0, 1.0, 2.0]);
    }

    #[test]
    fn backwards_clock_is_clamped_to_newest() {
        let buf = SampleBuffer::new(5, 1);
        buf.append(t(10), &[1.0]);
        buf.append(t(5), &[2.0]);
        buf.append(t(12), &[3.0]);
        assert_eq!(buf.snapshot().timestamps, vec![t(10), t(10), t(12)]);
    }

    #[test]
    fn snapshot_is_isolated_from_later_appends() {
        let buf = SampleBuffer::new(3, 2);
        buf.append(t(0), &[1.0, 10.0]);
        let before = buf.snapshot();
        buf.append(t(1), &[2.0, 20.0]);
        buf.append(t(2), &[3.0, 30.0]);
        buf.append(t(3), &[4.0, 40.0]);
        assert_eq!(before.len(), 1);
        assert_eq!(before.channels, vec![vec![1.0], vec![10.0]]);
        assert_eq!(buf.snapshot().channels[0], vec![2.0, 3.0, 4.0]);
    }

    #[test]
    fn push_appends_a_whole_sample() {
        let buf = SampleBuffer::new(2, 2);
        buf.push(&TelemetrySample::new(t(0), vec![0.5, 1.5]));
        assert_eq!(
            buf.snapshot().sample(0),
            Some(TelemetrySample::new(t(0), vec![0.5, 1.5]))
        );
        assert_eq!(buf.snapshot().sample(1), None);
    }

    #[test]
    fn concurrent_snapshots_never_see_partial_appends() {
        let buf = Arc::new(SampleBuffer::new(64, 3));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let buf = Arc::clone(&buf);
            let done = Arc::clone(&done);
            thread::spawn(move || {
                for i in 0..20_000 {
                    let v = i as f64;
                    buf.append(t(i), &[v, v, v]);
                }
                done.store(true, Ordering::Release);
            })
        };

        while !done.load(Ordering::Acquire) {
            let snap = buf.snapshot();
            assert_synchronized(&snap);
            assert!(snap.len() <= 64);
            // Every row was written with identical values on all channels.
            for j in 0..snap.len() {
                assert_eq!(snap.channels[0][j], snap.channels[1][j]);
                assert_eq!(snap.channels[1][j], snap.channels[2][j]);
            }
            // Rows are consecutive and in arrival order.
            for pair in snap.channels[0].windows(2) {
                assert_eq!(pair[1], pair[0] + 1.0);
            }
        }
        writer.join().unwrap();
        let last = buf.snapshot();
        assert_synchronized(&last);
        assert_eq!(last.len(), 64);
        assert_eq!(last.channels[2][63], 19_999.0);
    }
}
