//! Local player position reporting.

use tracing::debug;

use crate::protocol::{ClientMessage, JoinPlayer, Position, UpdatePositionPayload};

/// Who a position update is reported as.
///
/// Only obtainable from `GameClient` while the session is authenticated and
/// the room is joined, so a report outside those states cannot be built.
#[derive(Debug, Clone, Copy)]
pub struct ReportTarget<'a> {
    client_id: &'a str,
}

impl<'a> ReportTarget<'a> {
    pub(crate) fn new(client_id: &'a str) -> Self {
        Self { client_id }
    }

    pub fn client_id(&self) -> &'a str {
        self.client_id
    }
}

/// Holds the local player's position and decides when to report it.
#[derive(Debug, Clone, Default)]
pub struct PositionReporter {
    position: Position,
    reports_sent: u64,
}

impl PositionReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Number of updates emitted so far.
    pub fn reports_sent(&self) -> u64 {
        self.reports_sent
    }

    /// Store `position`, returning an update to emit if one is due.
    ///
    /// Nothing is emitted without a target or for the unset sentinel.
    pub fn set_position(
        &mut self,
        position: Position,
        target: Option<ReportTarget<'_>>,
    ) -> Option<ClientMessage> {
        self.position = position;

        let Some(target) = target else {
            debug!("Position {} held, not reporting yet", position);
            return None;
        };
        if position.is_unset() {
            return None;
        }

        self.reports_sent += 1;
        Some(ClientMessage::UpdatePosition(UpdatePositionPayload {
            client_id: target.client_id.to_string(),
            position,
        }))
    }

    /// Snapshot attached to a manual join.
    pub fn join_snapshot(&self, client_id: &str) -> JoinPlayer {
        JoinPlayer {
            position: self.position,
            id: client_id.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TARGET: ReportTarget<'static> = ReportTarget { client_id: "c1" };

    #[test]
    fn test_defaults_to_sentinel() {
        let reporter = PositionReporter::new();
        assert!(reporter.position().is_unset());
    }

    #[test]
    fn test_no_target_no_report() {
        let mut reporter = PositionReporter::new();
        assert!(reporter
            .set_position(Position::new(1.0, 2.0, 3.0), None)
            .is_none());
        // Still stored
        assert_eq!(reporter.position(), Position::new(1.0, 2.0, 3.0));
        assert_eq!(reporter.reports_sent(), 0);
    }

    #[test]
    fn test_zero_vector_suppressed() {
        let mut reporter = PositionReporter::new();
        assert!(reporter.set_position(Position::ZERO, Some(TARGET)).is_none());
        assert_eq!(reporter.reports_sent(), 0);
    }

    #[test]
    fn test_report() {
        let mut reporter = PositionReporter::new();
        let message = reporter
            .set_position(Position::new(1.0, 2.0, 3.0), Some(TARGET))
            .unwrap();

        assert_eq!(
            message,
            ClientMessage::UpdatePosition(UpdatePositionPayload {
                client_id: "c1".to_string(),
                position: Position::new(1.0, 2.0, 3.0),
            })
        );
        assert_eq!(reporter.reports_sent(), 1);
    }

    #[test]
    fn test_join_snapshot() {
        let mut reporter = PositionReporter::new();
        reporter.set_position(Position::new(4.0, 5.0, 6.0), None);

        let snapshot = reporter.join_snapshot("c1");
        assert_eq!(snapshot.id, "c1");
        assert_eq!(snapshot.position, Position::new(4.0, 5.0, 6.0));
    }
}
