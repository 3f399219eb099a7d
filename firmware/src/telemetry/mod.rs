//! Telemetry recording and log mirroring for the firmware target.
//!
//! Controller outcomes land in the shared core ring and every record is
//! echoed to defmt (or stdout on the host) so an RTT session shows button
//! timing and state changes live.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use fan_controller_core::controller::ControlOutcome;
use fan_controller_core::telemetry::{
    EventId, TelemetryPayload, TelemetryRecord, TelemetryRecorder as CoreRecorder,
};

use crate::controls::FirmwareInstant;

/// Core telemetry ring keyed by Embassy timestamps.
pub struct FirmwareTelemetry {
    recorder: CoreRecorder<FirmwareInstant>,
}

impl FirmwareTelemetry {
    pub const fn new() -> Self {
        Self {
            recorder: CoreRecorder::new(),
        }
    }

    /// Records a controller outcome and logs every record it produced.
    ///
    /// Returns the identifier of the first record written.
    pub fn record(&mut self, outcome: &ControlOutcome, timestamp: FirmwareInstant) -> EventId {
        let first = self.recorder.record_outcome(outcome, timestamp);
        for record in self.records_since(first) {
            log_record(record);
        }
        first
    }

    /// Newest records, starting at id `first`, that are still in the ring.
    fn records_since(
        &self,
        first: EventId,
    ) -> impl Iterator<Item = &TelemetryRecord<FirmwareInstant>> {
        let written = self.recorder.next_event_id().wrapping_sub(first);
        let written = usize::try_from(written).unwrap_or(usize::MAX);
        let skip = self.recorder.len().saturating_sub(written);
        self.recorder.oldest_first().skip(skip)
    }

    #[cfg(test)]
    fn latest(&self) -> Option<&TelemetryRecord<FirmwareInstant>> {
        self.recorder.latest()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.recorder.len()
    }
}

impl Default for FirmwareTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

fn log_record(record: &TelemetryRecord<FirmwareInstant>) {
    let timestamp_us = record.timestamp.as_micros();
    let delta_us = match record.details {
        TelemetryPayload::Edge(edge) => edge
            .elapsed_since_previous
            .map(|elapsed| u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX)),
        TelemetryPayload::None | TelemetryPayload::State(_) => None,
    };
    emit_log(record, timestamp_us, delta_us);
}

#[cfg(target_os = "none")]
fn emit_log(record: &TelemetryRecord<FirmwareInstant>, timestamp_us: u64, delta_us: Option<u64>) {
    let event = defmt::Display2Format(&record.event);
    match (record.details, delta_us) {
        (_, Some(delta)) => {
            defmt::info!("telemetry:fan {} t={}us Δ={}us", event, timestamp_us, delta);
        }
        (TelemetryPayload::State(state), None) => {
            defmt::info!(
                "telemetry:fan {} t={}us {}",
                event,
                timestamp_us,
                defmt::Display2Format(&state)
            );
        }
        _ => defmt::info!("telemetry:fan {} t={}us", event, timestamp_us),
    }
}

#[cfg(not(target_os = "none"))]
fn emit_log(record: &TelemetryRecord<FirmwareInstant>, timestamp_us: u64, delta_us: Option<u64>) {
    match (record.details, delta_us) {
        (_, Some(delta)) => println!(
            "telemetry:fan {} t={}us Δ={}us",
            record.event, timestamp_us, delta
        ),
        (TelemetryPayload::State(state), None) => {
            println!("telemetry:fan {} t={}us {}", record.event, timestamp_us, state);
        }
        _ => println!("telemetry:fan {} t={}us", record.event, timestamp_us),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fan_controller_core::edge::{Button, EdgeReport};
    use fan_controller_core::state::Request;
    use fan_controller_core::telemetry::{EdgeTelemetry, TelemetryEventKind};

    fn micros(value: u64) -> FirmwareInstant {
        FirmwareInstant::from_micros(value)
    }

    #[test]
    fn records_elapsed_between_edges() {
        let mut telemetry = FirmwareTelemetry::new();

        let first = ControlOutcome::Edge(EdgeReport {
            button: Button::CycleSpeed,
            superseded: None,
        });
        assert_eq!(telemetry.record(&first, micros(100)), 0);

        let second = ControlOutcome::Edge(EdgeReport {
            button: Button::CycleSpeed,
            superseded: Some(Request::CycleSpeed),
        });
        assert_eq!(telemetry.record(&second, micros(4_100)), 1);
        assert_eq!(telemetry.len(), 3);

        let latest = telemetry.latest().copied().unwrap();
        assert_eq!(
            latest.event,
            TelemetryEventKind::RequestSuperseded(Request::CycleSpeed)
        );
    }

    #[test]
    fn logs_only_new_records_across_id_wrap() {
        let mut telemetry = FirmwareTelemetry {
            recorder: CoreRecorder::starting_at(EventId::MAX - 1),
        };
        let edge = ControlOutcome::Edge(EdgeReport {
            button: Button::CycleSpeed,
            superseded: None,
        });
        telemetry.record(&edge, micros(0));

        let superseding = ControlOutcome::Edge(EdgeReport {
            button: Button::ToggleEnable,
            superseded: Some(Request::CycleSpeed),
        });
        let first = telemetry.record(&superseding, micros(3_000));
        assert_eq!(first, EventId::MAX);

        let ids: Vec<EventId> = telemetry.records_since(first).map(|record| record.id).collect();
        assert_eq!(ids, vec![EventId::MAX, 0]);
    }

    #[test]
    fn edge_payload_carries_spacing() {
        let mut telemetry = FirmwareTelemetry::new();
        let edge = ControlOutcome::Edge(EdgeReport {
            button: Button::ToggleEnable,
            superseded: None,
        });
        telemetry.record(&edge, micros(1_000));
        telemetry.record(&edge, micros(6_000));

        let latest = telemetry.latest().copied().unwrap();
        match latest.details {
            TelemetryPayload::Edge(EdgeTelemetry {
                elapsed_since_previous,
            }) => {
                let elapsed = elapsed_since_previous.expect("missing elapsed");
                assert_eq!(elapsed.as_micros(), 5_000);
            }
            other => panic!("expected edge payload, got {other:?}"),
        }
    }
}
