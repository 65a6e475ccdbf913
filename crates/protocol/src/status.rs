//! Status enums shared between the executor and the runner.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// TaskStatus
// ---------------------------------------------------------------------------

/// Lifecycle of one dispatched node execution inside the Node Runner.
///
/// `Done` and `Error` are terminal; once a record reaches either, later
/// callbacks for the same runner id are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Error,
}

impl TaskStatus {
    /// Whether a waiter blocked on this record may return.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Running => write!(f, "RUNNING"),
            Self::Done => write!(f, "DONE"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

// ---------------------------------------------------------------------------
// BlockStatus
// ---------------------------------------------------------------------------

/// State of a Flow Control Block.
///
/// Transitions are monotone toward `Stop`, with the single exception of
/// `Pause → Start` on resume. `Stop` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BlockStatus {
    Queued,
    Start,
    Pause,
    Stop,
}

impl std::fmt::Display for BlockStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "QUEUED"),
            Self::Start => write!(f, "START"),
            Self::Pause => write!(f, "PAUSE"),
            Self::Stop => write!(f, "STOP"),
        }
    }
}

impl std::str::FromStr for BlockStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(Self::Queued),
            "START" => Ok(Self::Start),
            "PAUSE" => Ok(Self::Pause),
            "STOP" => Ok(Self::Stop),
            other => Err(format!("unknown block status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(TaskStatus::Done.is_terminal());
        assert!(TaskStatus::Error.is_terminal());
        assert!(!TaskStatus::Queued.is_terminal());
        assert!(!TaskStatus::Running.is_terminal());
    }

    #[test]
    fn block_status_round_trips_through_str() {
        for s in ["QUEUED", "START", "PAUSE", "STOP"] {
            let parsed: BlockStatus = s.parse().expect("should parse");
            assert_eq!(parsed.to_string(), s);
        }
        assert!("RESUME".parse::<BlockStatus>().is_err());
    }

    #[test]
    fn task_status_serializes_screaming() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Running).unwrap(),
            "\"RUNNING\""
        );
    }
}
