//! Pipeline progress events and the broadcast bus that carries them.
//!
//! Events are informational: a run never blocks on subscribers, and a
//! subscriber that falls behind receives `Lagged` and misses events.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::error::FailureClass;
use crate::manifest::{CallTier, RunStatus};
use crate::models::{AnalysisStatus, ReportOrigin, SlotId, StakeholderCategory};

/// Progress notification emitted while a run executes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum PipelineEvent {
    RunStarted {
        run_id: Uuid,
        slots: usize,
    },
    SlotStarted {
        slot: SlotId,
    },
    InterviewGenerated {
        slot: SlotId,
        interview_id: Uuid,
        retry_count: u32,
    },
    SlotSkipped {
        slot: SlotId,
        class: FailureClass,
    },
    TierStarted {
        tier: CallTier,
        calls: usize,
    },
    AnalysisCompleted {
        interview_id: Uuid,
        status: AnalysisStatus,
    },
    CategorySynthesized {
        category: StakeholderCategory,
        members: usize,
    },
    CategoryFailed {
        category: StakeholderCategory,
    },
    ReportCompleted {
        origin: ReportOrigin,
    },
    RunFinished {
        run_id: Uuid,
        status: RunStatus,
    },
}

impl PipelineEvent {
    /// Dotted event name, e.g. `"slot.skipped"`.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::RunStarted { .. } => "run.started",
            Self::SlotStarted { .. } => "slot.started",
            Self::InterviewGenerated { .. } => "slot.generated",
            Self::SlotSkipped { .. } => "slot.skipped",
            Self::TierStarted { .. } => "tier.started",
            Self::AnalysisCompleted { .. } => "analysis.completed",
            Self::CategorySynthesized { .. } => "category.synthesized",
            Self::CategoryFailed { .. } => "category.failed",
            Self::ReportCompleted { .. } => "report.completed",
            Self::RunFinished { .. } => "run.finished",
        }
    }
}

/// Timestamped wrapper delivered to subscribers.
#[derive(Debug, Clone, Serialize)]
pub struct EventEnvelope {
    pub run_id: Uuid,
    pub occurred_at: DateTime<Utc>,
    pub event_type: &'static str,
    pub payload: PipelineEvent,
}

/// Broadcast bus for [`PipelineEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EventEnvelope>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emit an event. Dropped silently when nobody is subscribed.
    pub fn emit(&self, run_id: Uuid, event: PipelineEvent) {
        let envelope = EventEnvelope {
            run_id,
            occurred_at: Utc::now(),
            event_type: event.event_type(),
            payload: event,
        };
        tracing::trace!(
            event_type = envelope.event_type,
            subscriber_count = self.tx.receiver_count(),
            "EventBus emit"
        );
        let _ = self.tx.send(envelope);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(crate::defaults::EVENT_BUS_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_emit_subscribe() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();
        let run_id = Uuid::new_v4();

        bus.emit(run_id, PipelineEvent::RunStarted { run_id, slots: 4 });

        let envelope = rx.recv().await.unwrap();
        assert_eq!(envelope.run_id, run_id);
        assert_eq!(envelope.event_type, "run.started");
        assert!(matches!(
            envelope.payload,
            PipelineEvent::RunStarted { slots: 4, .. }
        ));
    }

    #[test]
    fn test_emit_without_subscribers_does_not_panic() {
        let bus = EventBus::new(4);
        bus.emit(
            Uuid::nil(),
            PipelineEvent::SlotStarted {
                slot: SlotId::new(StakeholderCategory::Clients, 0),
            },
        );
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = PipelineEvent::SlotSkipped {
            slot: SlotId::new(StakeholderCategory::Clients, 1),
            class: FailureClass::RateLimited,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "SlotSkipped");
        assert_eq!(json["class"], "rate_limited");
    }
}
