//! Line-oriented inbound protocol: broker messages, realtime-db nodes and
//! control commands.

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::reports::ReportWindow;
use crate::session::commands::SessionCommand;

use super::reading::{decode_payload, Metric, SensorNode, SensorReading};

#[derive(Debug, Clone, PartialEq)]
pub enum InboundMessage {
    /// One or more readings received together, in application order.
    Readings(Vec<SensorReading>),
    Command(SessionCommand),
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WireMessage {
    Reading { metric: String, value: f64 },
    Sensors(SensorNode),
    Start { name: String },
    Stop,
    Status,
    Report {
        #[serde(default = "default_report_window")]
        window: String,
    },
}

fn default_report_window() -> String {
    "weekly".to_string()
}

/// Parse one inbound line received at `received_at`. Blank lines yield `None`.
///
/// Lines starting with `{` are JSON messages; anything else is a broker message
/// of the form `<topic> <payload>`.
pub fn parse_line(line: &str, received_at: DateTime<Utc>) -> Result<Option<InboundMessage>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    if line.starts_with('{') {
        let message: WireMessage =
            serde_json::from_str(line).context("invalid inbound JSON message")?;
        return from_wire(message, received_at).map(Some);
    }

    let (topic, payload) = line
        .split_once(char::is_whitespace)
        .ok_or_else(|| anyhow!("expected '<topic> <payload>', got '{line}'"))?;
    let reading = decode_payload(topic, payload, received_at)?;
    Ok(Some(InboundMessage::Readings(vec![reading])))
}

fn from_wire(message: WireMessage, received_at: DateTime<Utc>) -> Result<InboundMessage> {
    let message = match message {
        WireMessage::Reading { metric, value } => {
            let metric =
                Metric::from_name(&metric).ok_or_else(|| anyhow!("unknown metric '{metric}'"))?;
            InboundMessage::Readings(vec![SensorReading {
                metric,
                value,
                timestamp: received_at,
            }])
        }
        WireMessage::Sensors(node) => InboundMessage::Readings(node.into_readings(received_at)),
        WireMessage::Start { name } => InboundMessage::Command(SessionCommand::Start { name }),
        WireMessage::Stop => InboundMessage::Command(SessionCommand::Stop),
        WireMessage::Status => InboundMessage::Command(SessionCommand::Status),
        WireMessage::Report { window } => {
            let window = ReportWindow::from_name(&window)
                .ok_or_else(|| anyhow!("unknown report window '{window}'"))?;
            InboundMessage::Command(SessionCommand::Report { window })
        }
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(line: &str, at: DateTime<Utc>) -> InboundMessage {
        parse_line(line, at).unwrap().unwrap()
    }

    #[test]
    fn broker_line_becomes_reading() {
        let at = Utc::now();
        assert_eq!(
            parse("focusSense/desk1/distance 87.5", at),
            InboundMessage::Readings(vec![SensorReading::distance(87.5, at)])
        );
        assert_eq!(
            parse("focusSense/desk1/holder 0", at),
            InboundMessage::Readings(vec![SensorReading::holder(0.0, at)])
        );
    }

    #[test]
    fn sensors_node_applies_distance_before_holder() {
        let at = Utc::now();
        assert_eq!(
            parse(r#"{"type":"sensors","reed":1,"distance_cm":42.0}"#, at),
            InboundMessage::Readings(vec![
                SensorReading::distance(42.0, at),
                SensorReading::holder(1.0, at),
            ])
        );
    }

    #[test]
    fn json_reading_and_commands() {
        let at = Utc::now();
        assert_eq!(
            parse(r#"{"type":"reading","metric":"distance_cm","value":42.0}"#, at),
            InboundMessage::Readings(vec![SensorReading::distance(42.0, at)])
        );
        assert_eq!(
            parse(r#"{"type":"start","name":"Alice"}"#, at),
            InboundMessage::Command(SessionCommand::Start {
                name: "Alice".into()
            })
        );
        assert_eq!(parse(r#"{"type":"stop"}"#, at), InboundMessage::Command(SessionCommand::Stop));
        assert_eq!(
            parse(r#"{"type":"report","window":"monthly"}"#, at),
            InboundMessage::Command(SessionCommand::Report {
                window: ReportWindow::CurrentMonth
            })
        );
    }

    #[test]
    fn malformed_lines_are_errors() {
        let at = Utc::now();
        assert!(parse_line("focusSense/desk1/distance abc", at).is_err());
        assert!(parse_line("focusSense/desk1/distance", at).is_err());
        assert!(parse_line("{\"type\":\"dance\"}", at).is_err());
        assert!(parse_line(r#"{"type":"reading","metric":"lux","value":3}"#, at).is_err());
        assert!(parse_line(r#"{"type":"report","window":"daily"}"#, at).is_err());
        assert_eq!(parse_line("   ", at).unwrap(), None);
    }
}
