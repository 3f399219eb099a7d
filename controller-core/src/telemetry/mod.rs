//! Telemetry event catalog and ring buffer shared by firmware and host targets.
//!
//! Controller outcomes are turned into timestamped records and kept in a
//! fixed-capacity `HistoryBuf`, oldest entries evicted first. Edge records
//! carry the spacing from the previous edge, which is what you want to look
//! at when tuning the debounce period against a real switch.

use core::fmt;
use core::time::Duration;

use heapless::{HistoryBuf, OldestOrdered};

use crate::controller::{ControlOutcome, DispatchReport};
use crate::edge::{Button, EdgeReport};
use crate::power::SleepMode;
use crate::state::{ControllerState, Request};

/// Identifier assigned to each telemetry record.
pub type EventId = u32;

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Discriminated telemetry events.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    EdgeAccepted(Button),
    EdgeIgnored(Button),
    RequestSuperseded(Request),
    Dispatched(Request),
    /// Debounce expired with nothing pending.
    ExpiredIdle,
    SpuriousExpiry,
    SleepModeSelected(SleepMode),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::EdgeAccepted(button) => write!(f, "edge-accepted {button}"),
            TelemetryEventKind::EdgeIgnored(button) => write!(f, "edge-ignored {button}"),
            TelemetryEventKind::RequestSuperseded(request) => {
                write!(f, "request-superseded {request}")
            }
            TelemetryEventKind::Dispatched(request) => write!(f, "dispatched {request}"),
            TelemetryEventKind::ExpiredIdle => f.write_str("expired-idle"),
            TelemetryEventKind::SpuriousExpiry => f.write_str("spurious-expiry"),
            TelemetryEventKind::SleepModeSelected(mode) => write!(f, "sleep-mode {mode}"),
        }
    }
}

/// Payloads carried alongside telemetry events.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TelemetryPayload {
    None,
    Edge(EdgeTelemetry),
    /// Controller state after a dispatch.
    State(ControllerState),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct EdgeTelemetry {
    pub elapsed_since_previous: Option<Duration>,
}

/// Trait implemented by monotonic instant wrappers used for telemetry tracking.
pub trait TelemetryInstant: Copy {
    /// Returns the saturating duration from `earlier` to `self`.
    fn saturating_duration_since(&self, earlier: Self) -> Duration;
}

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TelemetryRecord<TInstant>
where
    TInstant: Copy,
{
    pub id: EventId,
    pub timestamp: TInstant,
    pub event: TelemetryEventKind,
    pub details: TelemetryPayload,
}

/// Telemetry ring buffer type alias.
pub type TelemetryRing<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY> =
    HistoryBuf<TelemetryRecord<TInstant>, CAPACITY>;

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<TInstant, const CAPACITY: usize = TELEMETRY_RING_CAPACITY>
where
    TInstant: Copy,
{
    ring: TelemetryRing<TInstant, CAPACITY>,
    last_edge_at: Option<TInstant>,
    next_event_id: EventId,
}

impl<TInstant, const CAPACITY: usize> TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates an empty recorder whose first record gets `next_event_id`.
    #[must_use]
    pub const fn starting_at(next_event_id: EventId) -> Self {
        Self {
            ring: HistoryBuf::new(),
            last_edge_at: None,
            next_event_id,
        }
    }

    /// Identifier the next record will receive. Wraps after `EventId::MAX`.
    #[must_use]
    pub const fn next_event_id(&self) -> EventId {
        self.next_event_id
    }

    /// Returns an iterator over the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> OldestOrdered<'_, TelemetryRecord<TInstant>> {
        self.ring.oldest_ordered()
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord<TInstant>> {
        self.ring.recent()
    }

    pub fn len(&self) -> usize {
        self.ring.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }

    /// Records every event implied by a controller outcome.
    ///
    /// Returns the identifier of the first record written.
    pub fn record_outcome(&mut self, outcome: &ControlOutcome, timestamp: TInstant) -> EventId {
        match outcome {
            ControlOutcome::Edge(report) => self.record_edge(report, timestamp),
            ControlOutcome::EdgeIgnored(button) => self.record(
                TelemetryEventKind::EdgeIgnored(*button),
                TelemetryPayload::None,
                timestamp,
            ),
            ControlOutcome::Dispatched(report) => self.record_dispatch(report, timestamp),
            ControlOutcome::SpuriousExpiry => self.record(
                TelemetryEventKind::SpuriousExpiry,
                TelemetryPayload::None,
                timestamp,
            ),
        }
    }

    /// Records an accepted edge and, when it displaced another request, the supersession.
    pub fn record_edge(&mut self, report: &EdgeReport, timestamp: TInstant) -> EventId {
        let elapsed = self
            .last_edge_at
            .map(|previous| timestamp.saturating_duration_since(previous));
        self.last_edge_at = Some(timestamp);

        let id = self.record(
            TelemetryEventKind::EdgeAccepted(report.button),
            TelemetryPayload::Edge(EdgeTelemetry {
                elapsed_since_previous: elapsed,
            }),
            timestamp,
        );

        if let Some(superseded) = report.superseded {
            self.record(
                TelemetryEventKind::RequestSuperseded(superseded),
                TelemetryPayload::None,
                timestamp,
            );
        }

        id
    }

    /// Records a debounce expiry pass and the sleep depth it selected.
    pub fn record_dispatch(&mut self, report: &DispatchReport, timestamp: TInstant) -> EventId {
        let event = report
            .request
            .map_or(TelemetryEventKind::ExpiredIdle, TelemetryEventKind::Dispatched);
        let id = self.record(event, TelemetryPayload::State(report.state), timestamp);
        self.record(
            TelemetryEventKind::SleepModeSelected(report.sleep_mode),
            TelemetryPayload::None,
            timestamp,
        );
        id
    }

    /// Records an arbitrary telemetry event with the supplied payload.
    pub fn record(
        &mut self,
        event: TelemetryEventKind,
        details: TelemetryPayload,
        timestamp: TInstant,
    ) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);

        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
            details,
        });

        id
    }
}

impl<TInstant, const CAPACITY: usize> Default for TelemetryRecorder<TInstant, CAPACITY>
where
    TInstant: TelemetryInstant,
{
    fn default() -> Self {
        Self::new()
    }
}
