//! Line-per-tick output for pipes and dumb terminals.

use std::io::Write;
use std::thread;
use std::time::Duration;

use sensorscope_core::render::{Control, RenderFrame, RenderTickError, Surface};
use sensorscope_core::SensorVariant;

pub struct PlainSurface<W: Write> {
    out: W,
    variant: SensorVariant,
}

impl<W: Write> PlainSurface<W> {
    pub fn new(out: W, variant: SensorVariant) -> Self {
        Self { out, variant }
    }
}

/// `HH:MM:SS [n] key=latest (min..max) ...  state`
pub fn format_frame(variant: SensorVariant, frame: &RenderFrame) -> String {
    let mut line = format!("{} [{}]", frame.ended.format("%H:%M:%S"), frame.sample_count);
    for (channel, series) in variant.channels().iter().zip(&frame.series) {
        line.push_str(&format!(
            " {}={:.2}{} ({:.1}..{:.1})",
            channel.key, series.latest, channel.unit, series.y_bounds.min, series.y_bounds.max
        ));
    }
    if let Some(status) = &frame.status {
        line.push_str(&format!("  {}", status.state));
        if status.dropped > 0 {
            line.push_str(&format!(" dropped={}", status.dropped));
        }
    }
    line
}

impl<W: Write> Surface for PlainSurface<W> {
    fn present(&mut self, frame: &RenderFrame) -> Result<(), RenderTickError> {
        writeln!(self.out, "{}", format_frame(self.variant, frame))?;
        self.out.flush()?;
        Ok(())
    }

    fn idle(&mut self, timeout: Duration) -> Result<Control, RenderTickError> {
        thread::sleep(timeout);
        Ok(Control::Continue)
    }
}
