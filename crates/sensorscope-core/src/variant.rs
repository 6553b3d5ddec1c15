//! Sensor variants: channel set, wire format and display defaults.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::decoder::Decoder;
use crate::render::PanelLayout;
use crate::sample::Channel;

const CLIMATE_CHANNELS: [Channel; 3] = [
    Channel::new("temperature", "Temperature", "°C"),
    Channel::new("humidity", "Humidity", "%"),
    Channel::new("heat_index", "Heat index", "°C"),
];

const MOTION_CHANNELS: [Channel; 3] = [
    Channel::new("ax", "Acceleration X", "m/s²"),
    Channel::new("ay", "Acceleration Y", "m/s²"),
    Channel::new("az", "Acceleration Z", "m/s²"),
];

/// The sensors the pipeline knows how to visualize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorVariant {
    /// DHT temperature/humidity sensor, `"t:h:hi"` payloads.
    Climate,
    /// MPU accelerometer, `{"ax":..,"ay":..,"az":..}` payloads.
    Motion,
}

impl SensorVariant {
    pub const ALL: [SensorVariant; 2] = [Self::Climate, Self::Motion];

    pub fn name(self) -> &'static str {
        match self {
            Self::Climate => "climate",
            Self::Motion => "motion",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Climate => "Climate (DHT)",
            Self::Motion => "Motion (MPU)",
        }
    }

    pub fn channels(self) -> &'static [Channel] {
        match self {
            Self::Climate => &CLIMATE_CHANNELS,
            Self::Motion => &MOTION_CHANNELS,
        }
    }

    pub fn dimension(self) -> usize {
        self.channels().len()
    }

    pub fn decoder(self) -> Decoder {
        match self {
            Self::Climate => Decoder::delimited(':', self.dimension()),
            Self::Motion => Decoder::structured(self.channels().iter().map(|c| c.key)),
        }
    }

    pub fn default_capacity(self) -> usize {
        match self {
            Self::Climate => 300,
            Self::Motion => 500,
        }
    }

    pub fn default_interval(self) -> Duration {
        match self {
            Self::Climate => Duration::from_millis(1000),
            Self::Motion => Duration::from_millis(500),
        }
    }

    pub fn layout(self) -> PanelLayout {
        match self {
            Self::Climate => PanelLayout::TimeSeries,
            Self::Motion => PanelLayout::TrajectoryWithTimeSeries,
        }
    }
}

impl fmt::Display for SensorVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SensorVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "climate" | "dht" => Ok(Self::Climate),
            "motion" | "mpu" => Ok(Self::Motion),
            other => Err(format!(
                "unknown sensor variant {other:?} (expected climate or motion)"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoders_match_channel_count() {
        for variant in SensorVariant::ALL {
            assert_eq!(variant.decoder().dimension(), variant.dimension());
        }
    }

    #[test]
    fn climate_decodes_delimited_payloads() {
        let decoder = SensorVariant::Climate.decoder();
        assert_eq!(decoder.decode(b"23.5:60.2:24.1"), Ok(vec![23.5, 60.2, 24.1]));
    }

    #[test]
    fn motion_decodes_json_by_channel_key() {
        let decoder = SensorVariant::Motion.decoder();
        assert_eq!(
            decoder.decode(br#"{"ax": -10.0, "ay": 3.9, "az": -9.5, "t": 1}"#),
            Ok(vec![-10.0, 3.9, -9.5])
        );
    }

    #[test]
    fn defaults_per_variant() {
        assert_eq!(SensorVariant::Climate.default_capacity(), 300);
        assert_eq!(SensorVariant::Motion.default_capacity(), 500);
        assert_eq!(
            SensorVariant::Motion.default_interval(),
            Duration::from_millis(500)
        );
        assert_eq!(SensorVariant::Motion.layout(), PanelLayout::TrajectoryWithTimeSeries);
    }

    #[test]
    fn parses_names_and_aliases() {
        assert_eq!("Climate".parse(), Ok(SensorVariant::Climate));
        assert_eq!("mpu".parse(), Ok(SensorVariant::Motion));
        assert!("lidar".parse::<SensorVariant>().is_err());
        assert_eq!(SensorVariant::Motion.to_string(), "motion");
    }
}
