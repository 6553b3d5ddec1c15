//! Render loop: fixed-interval snapshot → frame derivation → surface.
//!
//! The loop never writes shared state. Each tick takes a snapshot of the
//! [`SampleBuffer`], derives per-channel series (and, for the motion layout, a
//! stride-downsampled 3D trajectory), auto-scales every axis and hands the
//! resulting [`RenderFrame`] to a [`Surface`]. Drawing is the surface's
//! business; this module is toolkit-agnostic.

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use thiserror::Error;

use crate::buffer::{SampleBuffer, Snapshot};
use crate::sample::{Channel, Timestamp};
use crate::session::{SessionStatus, StatusView};

/// Default cap on points drawn in the trajectory panel.
pub const DEFAULT_RENDER_BUDGET: usize = 1000;

/// Fraction of the data range added above and below auto-scaled bounds.
const SCALE_MARGIN: f64 = 0.10;
/// Relative tolerance under which a range counts as a single value.
const DEGENERATE_TOLERANCE: f64 = 1e-9;
/// Longest single wait handed to [`Surface::idle`], so the stop flag is
/// noticed promptly.
const MAX_IDLE_SLICE: Duration = Duration::from_millis(50);

/// A failed render tick. Logged and skipped; never stops the loop.
#[derive(Debug, Error)]
pub enum RenderTickError {
    #[error("surface error: {0}")]
    Surface(#[from] io::Error),
    #[error("cannot derive frame: {0}")]
    Derive(String),
}

// ---------------------------------------------------------------------------
// Scaling + downsampling
// ---------------------------------------------------------------------------

/// Closed display range of one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisBounds {
    pub min: f64,
    pub max: f64,
}

impl AxisBounds {
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Where `v` falls in the range, 0.0 at `min` and 1.0 at `max`.
    pub fn normalize(&self, v: f64) -> f64 {
        let span = self.span();
        if span > 0.0 { (v - self.min) / span } else { 0.5 }
    }
}

/// Bounds covering `values` with a 10% margin of the range on each side.
///
/// When every value is equal (within a relative tolerance of 1e-9) the range
/// is `[v - 0.5, v + 0.5]`. Non-finite values are ignored; `None` when nothing
/// finite remains.
pub fn autoscale(values: &[f64]) -> Option<AxisBounds> {
    let (lo, hi) = values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc: Option<(f64, f64)>, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })?;

    let range = hi - lo;
    if range <= DEGENERATE_TOLERANCE * lo.abs().max(hi.abs()) {
        return Some(AxisBounds {
            min: lo - 0.5,
            max: lo + 0.5,
        });
    }
    Some(AxisBounds {
        min: lo - SCALE_MARGIN * range,
        max: hi + SCALE_MARGIN * range,
    })
}

/// Stride keeping at most `budget` of `count` points.
pub fn stride_for(count: usize, budget: usize) -> usize {
    count.div_ceil(budget.max(1)).max(1)
}

/// Every `stride`-th point starting at index 0, order preserved. The result
/// never holds more than `budget` points.
pub fn downsample<T: Clone>(points: &[T], budget: usize) -> Vec<T> {
    points
        .iter()
        .step_by(stride_for(points.len(), budget))
        .cloned()
        .collect()
}

// ---------------------------------------------------------------------------
// Frames
// ---------------------------------------------------------------------------

/// How the channels are laid out on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelLayout {
    /// One time-series panel per channel, stacked, sharing the time axis.
    TimeSeries,
    /// A 3D trajectory of the first three channels plus one time-series panel
    /// per channel.
    TrajectoryWithTimeSeries,
}

/// One channel over the window. `x` is seconds since the window's first sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSeries {
    pub label: &'static str,
    pub unit: &'static str,
    pub points: Vec<(f64, f64)>,
    pub x_bounds: AxisBounds,
    pub y_bounds: AxisBounds,
    pub latest: f64,
}

/// Downsampled path through channel space.
#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    pub points: Vec<[f64; 3]>,
    pub bounds: [AxisBounds; 3],
    pub labels: [&'static str; 3],
}

/// Everything a surface needs to draw one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Wall-clock time of the oldest sample in the window.
    pub started: Timestamp,
    /// Wall-clock time of the newest sample in the window.
    pub ended: Timestamp,
    pub sample_count: usize,
    pub series: Vec<ChannelSeries>,
    pub trajectory: Option<Trajectory>,
    pub status: Option<StatusView>,
}

impl RenderFrame {
    /// Seconds covered by the window.
    pub fn window_secs(&self) -> f64 {
        seconds_between(self.started, self.ended)
    }
}

fn seconds_between(from: Timestamp, to: Timestamp) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// Turn a snapshot into a frame. `Ok(None)` for an empty window.
pub fn derive_frame(
    snapshot: &Snapshot,
    channels: &[Channel],
    layout: PanelLayout,
    budget: usize,
) -> Result<Option<RenderFrame>, RenderTickError> {
    let Some((started, ended)) = snapshot.time_span() else {
        return Ok(None);
    };
    if channels.len() != snapshot.dimension() {
        return Err(RenderTickError::Derive(format!(
            "{} channel labels for {} channels",
            channels.len(),
            snapshot.dimension()
        )));
    }

    let xs: Vec<f64> = snapshot
        .timestamps
        .iter()
        .map(|&t| seconds_between(started, t))
        .collect();
    let x_bounds = AxisBounds {
        min: 0.0,
        max: xs.last().copied().unwrap_or(0.0).max(1.0),
    };

    let mut series = Vec::with_capacity(channels.len());
    for (channel, values) in channels.iter().zip(&snapshot.channels) {
        let y_bounds = autoscale(values).ok_or_else(|| {
            RenderTickError::Derive(format!("no finite values for {}", channel.key))
        })?;
        series.push(ChannelSeries {
            label: channel.label,
            unit: channel.unit,
            points: xs.iter().copied().zip(values.iter().copied()).collect(),
            x_bounds,
            y_bounds,
            latest: values.last().copied().unwrap_or(f64::NAN),
        });
    }

    let trajectory = match layout {
        PanelLayout::TimeSeries => None,
        PanelLayout::TrajectoryWithTimeSeries => Some(derive_trajectory(snapshot, channels, budget)?),
    };

    Ok(Some(RenderFrame {
        started,
        ended,
        sample_count: snapshot.len(),
        series,
        trajectory,
        status: None,
    }))
}

fn derive_trajectory(
    snapshot: &Snapshot,
    channels: &[Channel],
    budget: usize,
) -> Result<Trajectory, RenderTickError> {
    if snapshot.dimension() < 3 {
        return Err(RenderTickError::Derive(format!(
            "trajectory needs 3 channels, have {}",
            snapshot.dimension()
        )));
    }
    let full: Vec<[f64; 3]> = (0..snapshot.len())
        .map(|j| {
            [
                snapshot.channels[0][j],
                snapshot.channels[1][j],
                snapshot.channels[2][j],
            ]
        })
        .collect();
    let points = downsample(&full, budget);

    let mut bounds = [AxisBounds { min: -0.5, max: 0.5 }; 3];
    for (axis, b) in bounds.iter_mut().enumerate() {
        let values: Vec<f64> = points.iter().map(|p| p[axis]).collect();
        *b = autoscale(&values).ok_or_else(|| {
            RenderTickError::Derive(format!("no finite values on axis {axis}"))
        })?;
    }

    Ok(Trajectory {
        points,
        bounds,
        labels: [channels[0].label, channels[1].label, channels[2].label],
    })
}

// ---------------------------------------------------------------------------
// Surface + ticker
// ---------------------------------------------------------------------------

/// What the surface wants after waiting for input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// User quit or the surface closed.
    Stop,
    /// Change the redraw interval.
    SetInterval(Duration),
}

/// A visual output the render loop draws on.
pub trait Surface {
    /// Draw one frame.
    fn present(&mut self, frame: &RenderFrame) -> Result<(), RenderTickError>;

    /// Wait at most `timeout` for user input. Called between ticks.
    fn idle(&mut self, timeout: Duration) -> Result<Control, RenderTickError>;
}

/// Fixed-rate deadline tracker. Missed deadlines are skipped, not replayed.
#[derive(Debug, Clone)]
pub struct Ticker {
    interval: Duration,
    next: Instant,
}

impl Ticker {
    /// The first tick is due immediately.
    pub fn new(interval: Duration) -> Self {
        Self::starting_at(interval, Instant::now())
    }

    pub fn starting_at(interval: Duration, first: Instant) -> Self {
        Self {
            interval,
            next: first,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Change the period. Pulls the next deadline in if the new period is
    /// shorter.
    pub fn set_interval(&mut self, interval: Duration, now: Instant) {
        self.interval = interval;
        self.next = self.next.min(now + interval);
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now >= self.next
    }

    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }

    /// Move to the next deadline after a tick. Returns how many deadlines were
    /// skipped because the tick overran.
    pub fn advance(&mut self, now: Instant) -> u64 {
        self.next += self.interval;
        if self.next > now {
            return 0;
        }
        let behind = now - self.next;
        let skipped = if self.interval.is_zero() {
            0
        } else {
            (behind.as_nanos() / self.interval.as_nanos()) as u64 + 1
        };
        self.next = now + self.interval;
        skipped
    }
}

// ---------------------------------------------------------------------------
// Loop
// ---------------------------------------------------------------------------

/// Result of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Empty window, nothing drawn.
    Idle,
    Presented,
    /// Logged and skipped.
    Failed,
}

/// Why [`RenderLoop::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// The surface asked to stop (user quit, window closed).
    Stopped,
    /// The shared stop flag was raised (Ctrl-C, orchestrator shutdown).
    Interrupted,
}

pub struct RenderLoop {
    buffer: Arc<SampleBuffer>,
    channels: Vec<Channel>,
    layout: PanelLayout,
    budget: usize,
    ticker: Ticker,
    status: Option<Arc<SessionStatus>>,
    presented: u64,
    failed: u64,
}

impl RenderLoop {
    pub fn new(
        buffer: Arc<SampleBuffer>,
        channels: Vec<Channel>,
        layout: PanelLayout,
        interval: Duration,
    ) -> Self {
        Self {
            buffer,
            channels,
            layout,
            budget: DEFAULT_RENDER_BUDGET,
            ticker: Ticker::new(interval),
            status: None,
            presented: 0,
            failed: 0,
        }
    }

    /// Cap on trajectory points per frame.
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = budget.max(1);
        self
    }

    /// Attach session status to every frame.
    pub fn with_status(mut self, status: Arc<SessionStatus>) -> Self {
        self.status = Some(status);
        self
    }

    pub fn interval(&self) -> Duration {
        self.ticker.interval()
    }

    pub fn frames_presented(&self) -> u64 {
        self.presented
    }

    pub fn ticks_failed(&self) -> u64 {
        self.failed
    }

    /// Run one tick now, regardless of the ticker.
    pub fn tick<S: Surface + ?Sized>(&mut self, surface: &mut S) -> TickOutcome {
        let snapshot = self.buffer.snapshot();
        let result = derive_frame(&snapshot, &self.channels, self.layout, self.budget).and_then(
            |frame| match frame {
                None => Ok(TickOutcome::Idle),
                Some(mut frame) => {
                    frame.status = self.status.as_ref().map(|s| s.view());
                    surface.present(&frame)?;
                    Ok(TickOutcome::Presented)
                }
            },
        );
        match result {
            Ok(TickOutcome::Presented) => {
                self.presented += 1;
                TickOutcome::Presented
            }
            Ok(outcome) => outcome,
            Err(e) => {
                self.failed += 1;
                warn!("render tick skipped: {e}");
                TickOutcome::Failed
            }
        }
    }

    /// Tick on schedule until the surface stops or `stop` is raised.
    ///
    /// Tick failures are logged and skipped. An error while waiting for input
    /// means the surface is unusable and is returned.
    pub fn run<S: Surface + ?Sized>(
        &mut self,
        surface: &mut S,
        stop: &AtomicBool,
    ) -> Result<LoopExit, RenderTickError> {
        loop {
            if stop.load(Ordering::Acquire) {
                return Ok(LoopExit::Interrupted);
            }

            if self.ticker.is_due(Instant::now()) {
                self.tick(surface);
                let skipped = self.ticker.advance(Instant::now());
                if skipped > 0 {
                    debug!("render tick overran, skipped {skipped} deadline(s)");
                }
            }

            let wait = self.ticker.until_next(Instant::now()).min(MAX_IDLE_SLICE);
            match surface.idle(wait)? {
                Control::Continue => {}
                Control::Stop => return Ok(LoopExit::Stopped),
                Control::SetInterval(interval) => {
                    info!("redraw interval set to {interval:?}");
                    self.ticker.set_interval(interval, Instant::now());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, TimeZone};
    use std::collections::VecDeque;

    const MOTION: [Channel; 3] = [
        Channel::new("ax", "X acceleration", "m/s²"),
        Channel::new("ay", "Y acceleration", "m/s²"),
        Channel::new("az", "Z acceleration", "m/s²"),
    ];

    fn t(ms: i64) -> Timestamp {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + chrono::Duration::milliseconds(ms)
    }

    fn snapshot(rows: &[(i64, [f64; 3])]) -> Snapshot {
        let buf = SampleBuffer::new(rows.len().max(1), 3);
        for (ms, values) in rows {
            buf.append(t(*ms), values);
        }
        buf.snapshot()
    }

    /// Scripted idle answers; stops once they run out.
    #[derive(Default)]
    struct RecordingSurface {
        frames: Vec<RenderFrame>,
        fail_presents: usize,
        controls: VecDeque<Control>,
        idles: Vec<Duration>,
    }

    impl Surface for RecordingSurface {
        fn present(&mut self, frame: &RenderFrame) -> Result<(), RenderTickError> {
            if self.fail_presents > 0 {
                self.fail_presents -= 1;
                return Err(io::Error::other("terminal went away").into());
            }
            self.frames.push(frame.clone());
            Ok(())
        }

        fn idle(&mut self, timeout: Duration) -> Result<Control, RenderTickError> {
            self.idles.push(timeout);
            Ok(self.controls.pop_front().unwrap_or(Control::Stop))
        }
    }

    // -----------------------------------------------------------------------
    // Scaling
    // -----------------------------------------------------------------------

    #[test]
    fn autoscale_adds_ten_percent_margin() {
        let b = autoscale(&[0.0, 10.0, 5.0]).unwrap();
        assert!((b.min - -1.0).abs() < 1e-12);
        assert!((b.max - 11.0).abs() < 1e-12);
    }

    #[test]
    fn autoscale_degenerate_range_is_unit_wide() {
        assert_eq!(
            autoscale(&[5.0, 5.0, 5.0]),
            Some(AxisBounds { min: 4.5, max: 5.5 })
        );
        assert_eq!(autoscale(&[0.0]), Some(AxisBounds { min: -0.5, max: 0.5 }));
        // Within relative tolerance.
        let b = autoscale(&[1e6, 1e6 + 1e-6]).unwrap();
        assert!((b.span() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn autoscale_negative_values() {
        let b = autoscale(&[-10.0, -9.5, -8.0]).unwrap();
        assert!((b.min - -10.2).abs() < 1e-9);
        assert!((b.max - -7.8).abs() < 1e-9);
    }

    #[test]
    fn autoscale_ignores_non_finite_and_empty() {
        assert_eq!(autoscale(&[]), None);
        assert_eq!(autoscale(&[f64::NAN]), None);
        assert_eq!(
            autoscale(&[f64::NAN, 2.0, f64::INFINITY]),
            Some(AxisBounds { min: 1.5, max: 2.5 })
        );
    }

    #[test]
    fn normalize_maps_bounds_to_unit_interval() {
        let b = AxisBounds { min: -2.0, max: 2.0 };
        assert_eq!(b.normalize(-2.0), 0.0);
        assert_eq!(b.normalize(0.0), 0.5);
        assert_eq!(b.normalize(2.0), 1.0);
    }

    // -----------------------------------------------------------------------
    // Downsampling
    // -----------------------------------------------------------------------

    #[test]
    fn stride_rounds_up() {
        assert_eq!(stride_for(0, 1000), 1);
        assert_eq!(stride_for(500, 1000), 1);
        assert_eq!(stride_for(1000, 1000), 1);
        assert_eq!(stride_for(1001, 1000), 2);
        assert_eq!(stride_for(1999, 1000), 2);
        assert_eq!(stride_for(3000, 1000), 3);
    }

    #[test]
    fn downsample_stays_within_budget_and_keeps_order() {
        for count in [0usize, 1, 999, 1000, 1001, 1999, 2000, 4321] {
            let points: Vec<usize> = (0..count).collect();
            let kept = downsample(&points, 1000);
            assert!(kept.len() <= 1000, "{count} points kept {}", kept.len());
            assert!(kept.windows(2).all(|w| w[0] < w[1]));
            if count > 0 {
                assert_eq!(kept[0], 0);
            }
        }
    }

    #[test]
    fn downsample_below_budget_is_identity() {
        let points = vec![3, 1, 2];
        assert_eq!(downsample(&points, 1000), points);
    }

    // -----------------------------------------------------------------------
    // Frames
    // -----------------------------------------------------------------------

    #[test]
    fn empty_snapshot_derives_nothing() {
        let snap = SampleBuffer::new(4, 3).snapshot();
        assert_eq!(
            derive_frame(&snap, &MOTION, PanelLayout::TimeSeries, 1000).unwrap(),
            None
        );
    }

    #[test]
    fn series_use_seconds_since_first_sample() {
        let snap = snapshot(&[(0, [1.0, 2.0, 3.0]), (500, [2.0, 3.0, 4.0]), (2000, [3.0, 4.0, 5.0])]);
        let frame = derive_frame(&snap, &MOTION, PanelLayout::TimeSeries, 1000)
            .unwrap()
            .unwrap();
        assert_eq!(frame.sample_count, 3);
        assert_eq!(frame.started, t(0));
        assert_eq!(frame.ended, t(2000));
        assert_eq!(frame.window_secs(), 2.0);
        assert_eq!(frame.series.len(), 3);
        assert_eq!(frame.series[1].points, vec![(0.0, 2.0), (0.5, 3.0), (2.0, 4.0)]);
        assert_eq!(frame.series[2].latest, 5.0);
        assert_eq!(frame.series[0].label, "X acceleration");
        assert!(frame.trajectory.is_none());
    }

    #[test]
    fn trajectory_is_downsampled_and_scaled_on_kept_points() {
        let rows: Vec<(i64, [f64; 3])> = (0..10)
            .map(|i| (i * 100, [i as f64, -(i as f64), 1.0]))
            .collect();
        let snap = snapshot(&rows);
        let frame = derive_frame(&snap, &MOTION, PanelLayout::TrajectoryWithTimeSeries, 4)
            .unwrap()
            .unwrap();
        let traj = frame.trajectory.unwrap();
        // stride ceil(10 / 4) = 3 → indices 0, 3, 6, 9
        assert_eq!(
            traj.points.iter().map(|p| p[0]).collect::<Vec<_>>(),
            vec![0.0, 3.0, 6.0, 9.0]
        );
        assert_eq!(traj.bounds[2], AxisBounds { min: 0.5, max: 1.5 });
        assert!((traj.bounds[0].max - 9.9).abs() < 1e-9);
        // Time series keep every sample.
        assert_eq!(frame.series[0].points.len(), 10);
    }

    #[test]
    fn mismatched_channel_labels_fail_the_tick() {
        let snap = snapshot(&[(0, [1.0, 2.0, 3.0])]);
        let err = derive_frame(&snap, &MOTION[..2], PanelLayout::TimeSeries, 1000).unwrap_err();
        assert!(matches!(err, RenderTickError::Derive(_)));
    }

    // -----------------------------------------------------------------------
    // Ticker
    // -----------------------------------------------------------------------

    #[test]
    fn ticker_skips_missed_deadlines() {
        let start = Instant::now();
        let mut ticker = Ticker::starting_at(Duration::from_millis(100), start);
        assert!(ticker.is_due(start));
        assert_eq!(ticker.advance(start + Duration::from_millis(10)), 0);
        assert_eq!(ticker.until_next(start + Duration::from_millis(10)), Duration::from_millis(90));

        // The 100ms tick finished at 450ms: 200, 300 and 400 are dropped.
        let late = start + Duration::from_millis(450);
        let skipped = ticker.advance(late);
        assert_eq!(skipped, 3);
        assert!(!ticker.is_due(late));
        assert_eq!(ticker.until_next(late), Duration::from_millis(100));
    }

    #[test]
    fn ticker_shorter_interval_pulls_deadline_in() {
        let start = Instant::now();
        let mut ticker = Ticker::starting_at(Duration::from_secs(10), start);
        ticker.advance(start);
        ticker.set_interval(Duration::from_millis(100), start);
        assert_eq!(ticker.until_next(start), Duration::from_millis(100));
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    fn render_loop(buffer: &Arc<SampleBuffer>) -> RenderLoop {
        RenderLoop::new(
            Arc::clone(buffer),
            MOTION.to_vec(),
            PanelLayout::TimeSeries,
            Duration::ZERO,
        )
    }

    #[test]
    fn empty_buffer_ticks_are_idle() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        let mut rl = render_loop(&buffer);
        let mut surface = RecordingSurface::default();
        assert_eq!(rl.tick(&mut surface), TickOutcome::Idle);
        assert!(surface.frames.is_empty());
        assert_eq!(rl.frames_presented(), 0);
    }

    #[test]
    fn failing_present_is_skipped_and_loop_continues() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        buffer.append(t(0), &[1.0, 2.0, 3.0]);
        let mut rl = render_loop(&buffer);
        let mut surface = RecordingSurface {
            fail_presents: 1,
            controls: VecDeque::from([Control::Continue, Control::Continue]),
            ..Default::default()
        };
        let exit = rl.run(&mut surface, &AtomicBool::new(false)).unwrap();
        assert_eq!(exit, LoopExit::Stopped);
        assert_eq!(rl.ticks_failed(), 1);
        assert_eq!(rl.frames_presented(), 2);
        assert_eq!(surface.frames.len(), 2);
    }

    #[test]
    fn stop_flag_interrupts_before_ticking() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        buffer.append(t(0), &[1.0, 2.0, 3.0]);
        let mut rl = render_loop(&buffer);
        let mut surface = RecordingSurface::default();
        let exit = rl.run(&mut surface, &AtomicBool::new(true)).unwrap();
        assert_eq!(exit, LoopExit::Interrupted);
        assert!(surface.frames.is_empty());
    }

    #[test]
    fn idle_waits_are_bounded() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        let mut rl = RenderLoop::new(
            Arc::clone(&buffer),
            MOTION.to_vec(),
            PanelLayout::TimeSeries,
            Duration::from_secs(5),
        );
        let mut surface = RecordingSurface::default();
        rl.run(&mut surface, &AtomicBool::new(false)).unwrap();
        assert!(surface.idles.iter().all(|d| *d <= MAX_IDLE_SLICE));
    }

    #[test]
    fn surface_can_change_interval() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        let mut rl = render_loop(&buffer);
        let mut surface = RecordingSurface {
            controls: VecDeque::from([Control::SetInterval(Duration::from_millis(250))]),
            ..Default::default()
        };
        rl.run(&mut surface, &AtomicBool::new(false)).unwrap();
        assert_eq!(rl.interval(), Duration::from_millis(250));
    }

    #[test]
    fn frames_carry_session_status() {
        let buffer = Arc::new(SampleBuffer::new(4, 3));
        buffer.append(t(0), &[1.0, 2.0, 3.0]);
        let mut rl = render_loop(&buffer).with_status(Arc::new(SessionStatus::default()));
        let mut surface = RecordingSurface::default();
        assert_eq!(rl.tick(&mut surface), TickOutcome::Presented);
        let status = surface.frames[0].status.as_ref().unwrap();
        assert_eq!(status.state, crate::session::SessionState::Disconnected);
    }
}
