use std::sync::Arc;

use tracing::warn;

use super::catalog::Inventory;
use super::domain::{ItemId, SessionId};
use super::persistence::SnapshotSink;
use super::report::FinalReport;
use super::session::{AssessmentError, NextItem, Session, SessionSnapshot};
use super::settings::{AssessmentConfig, AssessmentMode};

/// Service composing the shared inventory, the session operations, and a
/// snapshot sink. Each mutating call offers a fresh snapshot afterwards;
/// sink failures are logged and never fail the assessment.
pub struct AssessmentService<K> {
    inventory: Arc<Inventory>,
    sink: Arc<K>,
    config: AssessmentConfig,
}

impl<K> AssessmentService<K>
where
    K: SnapshotSink + 'static,
{
    pub fn new(inventory: Arc<Inventory>, sink: Arc<K>, config: AssessmentConfig) -> Self {
        Self {
            inventory,
            sink,
            config,
        }
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inventory
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    fn offer(&self, session: &Session) {
        if let Err(err) = self.sink.offer(session.snapshot()) {
            warn!(session_id = %session.id(), error = %err, "snapshot offer failed");
        }
    }

    pub fn start(
        &self,
        mode: AssessmentMode,
        seed: Option<u64>,
    ) -> Result<Session, AssessmentError> {
        self.start_with_id(SessionId::generate(), mode, seed)
    }

    pub fn start_with_id(
        &self,
        id: SessionId,
        mode: AssessmentMode,
        seed: Option<u64>,
    ) -> Result<Session, AssessmentError> {
        let session = Session::start(id, &self.inventory, mode, seed, self.config.clone())?;
        self.offer(&session);
        Ok(session)
    }

    pub fn next_item<'a>(
        &'a self,
        session: &mut Session,
    ) -> Result<NextItem<'a>, AssessmentError> {
        let next = session.next_item(&self.inventory);
        self.offer(session);
        next
    }

    pub fn submit(
        &self,
        session: &mut Session,
        item_id: &ItemId,
        answer: u8,
        latency_ms: Option<u64>,
    ) -> Result<(), AssessmentError> {
        session.submit(&self.inventory, item_id, answer, latency_ms)?;
        self.offer(session);
        Ok(())
    }

    pub fn skip(&self, session: &mut Session, item_id: &ItemId) -> Result<(), AssessmentError> {
        session.skip(&self.inventory, item_id)?;
        self.offer(session);
        Ok(())
    }

    /// Finalize and offer the final snapshot. Repeated calls return the same
    /// report and re-offer the same final snapshot.
    pub fn finalize(&self, session: &mut Session) -> FinalReport {
        let report = session.finalize(&self.inventory).clone();
        self.offer(session);
        report
    }

    pub fn resume(&self, snapshot: SessionSnapshot) -> Result<Session, AssessmentError> {
        Ok(Session::resume(snapshot, &self.inventory)?)
    }
}
