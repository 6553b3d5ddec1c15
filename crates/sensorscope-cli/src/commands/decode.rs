use sensorscope_core::{DecodeError, SensorVariant};

pub fn run(variant: SensorVariant, payload: &str) {
    match describe(variant, payload.as_bytes()) {
        Ok(lines) => {
            for line in lines {
                println!("{line}");
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// One `name  value unit` line per channel.
fn describe(variant: SensorVariant, payload: &[u8]) -> Result<Vec<String>, DecodeError> {
    let values = variant.decoder().decode(payload)?;
    Ok(variant
        .channels()
        .iter()
        .zip(values)
        .map(|(channel, value)| format!("{:<12} {value:>10.2} {}", channel.key, channel.unit))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn climate_payload_is_listed_per_channel() {
        let lines = describe(SensorVariant::Climate, b"23.5:60.2:24.1").unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("temperature"));
        assert!(lines[0].contains("23.50 °C"));
        assert!(lines[1].contains("60.20 %"));
    }

    #[test]
    fn bad_payload_reports_decode_error() {
        assert_eq!(
            describe(SensorVariant::Motion, br#"{"ax": 1, "ay": 2}"#),
            Err(DecodeError::MissingField { key: "az".into() })
        );
    }
}
