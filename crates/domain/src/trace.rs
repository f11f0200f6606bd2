use serde::Serialize;

/// Structured trace events emitted across all Palaver crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    WindowBuilt {
        blocks_total: usize,
        blocks_kept: usize,
        size: usize,
        budget: usize,
    },
    WindowTruncated {
        blocks_dropped: usize,
        budget: usize,
    },
    MalformedTranscript {
        index: usize,
        problem: String,
    },
    ToolDispatched {
        tool_name: String,
        call_id: String,
        is_error: bool,
        result_chars: usize,
        duration_ms: u64,
    },
    TranscriptCompacted {
        messages_folded: usize,
        size_before: usize,
        size_after: usize,
        low_information: bool,
    },
    RollingSummaryCreated {
        session_id: String,
        start_index: usize,
        end_index: usize,
        low_information: bool,
    },
    SessionSaved {
        session_id: String,
        messages: usize,
        appended: usize,
    },
    SessionDeleted {
        session_id: String,
    },
    MemoryCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    BackgroundTaskFailed {
        task: String,
        error: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        match self {
            TraceEvent::MalformedTranscript { .. } | TraceEvent::BackgroundTaskFailed { .. } => {
                tracing::warn!(trace_event = %json, "pv_event");
            }
            _ => tracing::info!(trace_event = %json, "pv_event"),
        }
    }
}
