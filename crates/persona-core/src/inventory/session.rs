//! The caller-owned assessment session.
//!
//! A [`Session`] holds every piece of mutable state for one respondent. The
//! selector and scoring engine are stateless views over the shared
//! [`Inventory`]; they receive the session's components as arguments.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::catalog::Inventory;
use super::domain::{Item, ItemId, Response, SessionId, TraitId};
use super::ledger::ResponseLedger;
use super::report::{Diagnostic, FinalReport, TerminationReason};
use super::scoring::{ScoringEngine, ScoringState, SessionTally};
use super::selector::{AdaptiveSelector, SelectionError, SelectorState, TerminationPolicy};
use super::settings::{AssessmentConfig, AssessmentMode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Finalized,
}

/// What the presentation layer should do next.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NextItem<'a> {
    Present(&'a Item),
    Complete(TerminationReason),
}

/// A rejected submission. The session is left exactly as it was.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum InvalidResponse {
    #[error("answer {answer} is outside the scale {min}..={max}")]
    OutOfScale { answer: u8, min: u8, max: u8 },
    #[error("item '{item_id}' is not the pending item '{pending}'")]
    NotPending { item_id: ItemId, pending: ItemId },
    #[error("item '{item_id}' was submitted but no item is pending")]
    NothingPending { item_id: ItemId },
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SnapshotError {
    #[error("snapshot references item '{item_id}' which is not in the catalog")]
    UnknownItem { item_id: ItemId },
    #[error("snapshot references trait '{trait_id}' which is not in the trait model")]
    UnknownTrait { trait_id: TraitId },
    #[error("snapshot carries an invalid assessment config: {0}")]
    InvalidConfig(String),
    #[error("snapshot is finalized but carries no report")]
    MissingReport,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum AssessmentError {
    #[error(transparent)]
    InvalidResponse(#[from] InvalidResponse),
    #[error("item pool exhausted after {presented} item(s); finalize the session")]
    ExhaustedPool { presented: usize },
    #[error("session is already finalized")]
    SessionFinalized,
    #[error("item '{0}' is not in the catalog")]
    UnknownItem(ItemId),
    #[error("invalid assessment config: {0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

impl From<SelectionError> for AssessmentError {
    fn from(err: SelectionError) -> Self {
        match err {
            SelectionError::ExhaustedPool { presented } => Self::ExhaustedPool { presented },
        }
    }
}

/// Serializable copy of a session, offered to persistence after every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub mode: AssessmentMode,
    #[serde(default)]
    pub seed: Option<u64>,
    pub config: AssessmentConfig,
    pub targets: BTreeMap<TraitId, u32>,
    pub ledger: ResponseLedger,
    #[serde(default)]
    pub pending: Option<ItemId>,
    pub selector: SelectorState,
    pub scoring: ScoringState,
    pub status: SessionStatus,
    #[serde(default)]
    pub termination: Option<TerminationReason>,
    #[serde(default)]
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default)]
    pub report: Option<FinalReport>,
    pub started_at: DateTime<Utc>,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn is_final(&self) -> bool {
        self.status == SessionStatus::Finalized
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    id: SessionId,
    mode: AssessmentMode,
    seed: Option<u64>,
    config: AssessmentConfig,
    targets: BTreeMap<TraitId, u32>,
    ledger: ResponseLedger,
    selector: SelectorState,
    scoring: ScoringState,
    pending: Option<ItemId>,
    status: SessionStatus,
    termination: Option<TerminationReason>,
    diagnostics: Vec<Diagnostic>,
    report: Option<FinalReport>,
    started_at: DateTime<Utc>,
}

impl Session {
    pub fn start(
        id: SessionId,
        inventory: &Inventory,
        mode: AssessmentMode,
        seed: Option<u64>,
        config: AssessmentConfig,
    ) -> Result<Self, AssessmentError> {
        config.validate().map_err(AssessmentError::InvalidConfig)?;
        let targets = capped_targets(inventory, mode);

        info!(
            session_id = %id,
            mode = mode.label(),
            seed,
            items = inventory.items().len(),
            traits = inventory.model().len(),
            "assessment session started"
        );

        Ok(Self {
            id,
            mode,
            seed,
            targets,
            ledger: ResponseLedger::new(),
            selector: SelectorState::new(),
            scoring: ScoringState::new(inventory.model()),
            pending: None,
            status: SessionStatus::Active,
            termination: None,
            diagnostics: Vec::new(),
            report: None,
            started_at: Utc::now(),
            config,
        })
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn mode(&self) -> AssessmentMode {
        self.mode
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn config(&self) -> &AssessmentConfig {
        &self.config
    }

    pub fn targets(&self) -> &BTreeMap<TraitId, u32> {
        &self.targets
    }

    pub fn ledger(&self) -> &ResponseLedger {
        &self.ledger
    }

    pub fn selector_state(&self) -> &SelectorState {
        &self.selector
    }

    pub fn scoring_state(&self) -> &ScoringState {
        &self.scoring
    }

    pub fn pending(&self) -> Option<&ItemId> {
        self.pending.as_ref()
    }

    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn is_finalized(&self) -> bool {
        self.status == SessionStatus::Finalized
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn report(&self) -> Option<&FinalReport> {
        self.report.as_ref()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn policy(&self) -> TerminationPolicy {
        TerminationPolicy {
            max_items: self.config.max_items(self.mode),
            min_items: self.config.min_items(self.mode),
            confidence_threshold: self.config.confidence_threshold,
        }
    }

    /// Share of the item cap already presented, `0..=100`.
    pub fn progress_percent(&self) -> f64 {
        let max = self.policy().max_items.max(1);
        (self.ledger.len() as f64 / max as f64 * 100.0).min(100.0)
    }

    pub fn live_scores(&self, inventory: &Inventory) -> BTreeMap<TraitId, f64> {
        ScoringEngine::new(inventory, &self.config).live_scores(&self.scoring)
    }

    pub fn confidence(&self, inventory: &Inventory, trait_id: &TraitId) -> f64 {
        ScoringEngine::new(inventory, &self.config).confidence(&self.scoring, trait_id)
    }

    pub fn mean_confidence(&self, inventory: &Inventory) -> f64 {
        ScoringEngine::new(inventory, &self.config).mean_confidence(&self.scoring)
    }

    /// The pending item, a freshly selected one, or the reason to stop.
    ///
    /// Calling again without submitting returns the same pending item.
    pub fn next_item<'i>(
        &mut self,
        inventory: &'i Inventory,
    ) -> Result<NextItem<'i>, AssessmentError> {
        if let Some(report) = &self.report {
            return Ok(NextItem::Complete(report.termination));
        }
        match self.termination {
            Some(TerminationReason::ExhaustedPool) => {
                return Err(AssessmentError::ExhaustedPool {
                    presented: self.ledger.len(),
                });
            }
            Some(reason) => return Ok(NextItem::Complete(reason)),
            None => {}
        }
        if let Some(pending) = &self.pending {
            return inventory
                .items()
                .get(pending)
                .map(NextItem::Present)
                .ok_or_else(|| AssessmentError::UnknownItem(pending.clone()));
        }

        let engine = ScoringEngine::new(inventory, &self.config);
        let policy = self.policy();
        if let Some(reason) =
            policy.should_terminate(self.ledger.len(), engine.mean_confidence(&self.scoring))
        {
            info!(session_id = %self.id, reason = reason.label(), "assessment complete");
            self.termination = Some(reason);
            return Ok(NextItem::Complete(reason));
        }

        let confidence: BTreeMap<TraitId, f64> = inventory
            .model()
            .traits()
            .iter()
            .map(|definition| {
                (
                    definition.id.clone(),
                    engine.confidence(&self.scoring, &definition.id),
                )
            })
            .collect();

        let selector =
            AdaptiveSelector::new(inventory, &self.config, &self.targets, policy, self.seed);
        match selector.select(
            &mut self.selector,
            &self.ledger,
            self.pending.as_ref(),
            &confidence,
            Utc::now(),
        ) {
            Ok(item_id) => {
                let item = inventory
                    .items()
                    .get(&item_id)
                    .ok_or_else(|| AssessmentError::UnknownItem(item_id.clone()))?;
                self.pending = Some(item_id);
                Ok(NextItem::Present(item))
            }
            Err(err) => {
                let SelectionError::ExhaustedPool { presented } = err;
                warn!(session_id = %self.id, presented, "no eligible items remain");
                self.termination = Some(TerminationReason::ExhaustedPool);
                self.diagnostics.push(Diagnostic::ExhaustedPool { presented });
                Err(err.into())
            }
        }
    }

    /// Validate before touching anything so a rejection changes nothing.
    fn check_pending<'i>(
        &self,
        inventory: &'i Inventory,
        item_id: &ItemId,
    ) -> Result<&'i Item, AssessmentError> {
        if self.is_finalized() {
            return Err(AssessmentError::SessionFinalized);
        }
        match &self.pending {
            None => Err(InvalidResponse::NothingPending {
                item_id: item_id.clone(),
            }
            .into()),
            Some(pending) if pending != item_id => Err(InvalidResponse::NotPending {
                item_id: item_id.clone(),
                pending: pending.clone(),
            }
            .into()),
            Some(_) => inventory
                .items()
                .get(item_id)
                .ok_or_else(|| AssessmentError::UnknownItem(item_id.clone())),
        }
    }

    pub fn submit(
        &mut self,
        inventory: &Inventory,
        item_id: &ItemId,
        answer: u8,
        latency_ms: Option<u64>,
    ) -> Result<(), AssessmentError> {
        let item = self.check_pending(inventory, item_id)?;
        let scale = inventory.scale();
        if !scale.contains(answer) {
            return Err(InvalidResponse::OutOfScale {
                answer,
                min: scale.min,
                max: scale.max,
            }
            .into());
        }

        ScoringEngine::new(inventory, &self.config).record(
            &mut self.scoring,
            item,
            answer,
            &self.targets,
        );
        self.selector.note_answered(item);
        self.ledger.append(Response {
            item_id: item_id.clone(),
            answer: Some(answer),
            latency_ms,
            recorded_at: Utc::now(),
        });
        self.pending = None;

        debug!(
            session_id = %self.id,
            item_id = %item_id,
            answer,
            presented = self.ledger.len(),
            "response recorded"
        );
        Ok(())
    }

    /// Record an explicit skip. The item is never shown again and earns no coverage.
    pub fn skip(&mut self, inventory: &Inventory, item_id: &ItemId) -> Result<(), AssessmentError> {
        self.check_pending(inventory, item_id)?;
        self.ledger.append(Response {
            item_id: item_id.clone(),
            answer: None,
            latency_ms: None,
            recorded_at: Utc::now(),
        });
        self.pending = None;
        debug!(session_id = %self.id, item_id = %item_id, "item skipped");
        Ok(())
    }

    /// Produce the final report, or return the one already produced.
    ///
    /// May be called at any point; an unfinished session ends as `EarlyExit`.
    pub fn finalize(&mut self, inventory: &Inventory) -> &FinalReport {
        let report = match self.report.take() {
            Some(report) => report,
            None => {
                let engine = ScoringEngine::new(inventory, &self.config);
                let policy = self.policy();
                let termination = self
                    .termination
                    .or_else(|| {
                        policy.should_terminate(
                            self.ledger.len(),
                            engine.mean_confidence(&self.scoring),
                        )
                    })
                    .unwrap_or(TerminationReason::EarlyExit);
                let tally = SessionTally {
                    termination,
                    answered: self.ledger.answered(),
                    skipped: self.ledger.skipped(),
                    max_items: policy.max_items,
                };
                let report = engine.finalize(&self.scoring, tally, self.diagnostics.clone());

                self.termination = Some(termination);
                self.status = SessionStatus::Finalized;
                self.pending = None;
                info!(
                    session_id = %self.id,
                    termination = termination.label(),
                    quality = ?report.quality,
                    "session finalized"
                );
                report
            }
        };
        self.report.insert(report)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session_id: self.id.clone(),
            mode: self.mode,
            seed: self.seed,
            config: self.config.clone(),
            targets: self.targets.clone(),
            ledger: self.ledger.clone(),
            pending: self.pending.clone(),
            selector: self.selector.clone(),
            scoring: self.scoring.clone(),
            status: self.status,
            termination: self.termination,
            diagnostics: self.diagnostics.clone(),
            report: self.report.clone(),
            started_at: self.started_at,
            saved_at: Utc::now(),
        }
    }

    /// Rebuild a session from a snapshot taken against the same catalog.
    pub fn resume(snapshot: SessionSnapshot, inventory: &Inventory) -> Result<Self, SnapshotError> {
        snapshot
            .config
            .validate()
            .map_err(SnapshotError::InvalidConfig)?;

        let catalog = inventory.items();
        let referenced = snapshot
            .ledger
            .entries()
            .iter()
            .map(|response| &response.item_id)
            .chain(snapshot.pending.iter())
            .chain(snapshot.selector.item_ids());
        for item_id in referenced {
            if catalog.get(item_id).is_none() {
                return Err(SnapshotError::UnknownItem {
                    item_id: item_id.clone(),
                });
            }
        }
        let model = inventory.model();
        for trait_id in snapshot.targets.keys() {
            if !model.contains(trait_id) {
                return Err(SnapshotError::UnknownTrait {
                    trait_id: trait_id.clone(),
                });
            }
        }
        if snapshot.is_final() && snapshot.report.is_none() {
            return Err(SnapshotError::MissingReport);
        }

        info!(
            session_id = %snapshot.session_id,
            presented = snapshot.ledger.len(),
            status = ?snapshot.status,
            "session resumed"
        );

        Ok(Self {
            id: snapshot.session_id,
            mode: snapshot.mode,
            seed: snapshot.seed,
            config: snapshot.config,
            targets: snapshot.targets,
            ledger: snapshot.ledger,
            selector: snapshot.selector,
            scoring: snapshot.scoring,
            pending: snapshot.pending,
            status: snapshot.status,
            termination: snapshot.termination,
            diagnostics: snapshot.diagnostics,
            report: snapshot.report,
            started_at: snapshot.started_at,
        })
    }
}

/// Mode targets, each capped at the number of items that load on the trait.
fn capped_targets(inventory: &Inventory, mode: AssessmentMode) -> BTreeMap<TraitId, u32> {
    let available = inventory.items().items_per_trait();
    let mut targets = mode.targets(inventory.model().traits());
    for (trait_id, target) in &mut targets {
        let items = available.get(trait_id).copied().unwrap_or(0);
        let cap = u32::try_from(items).unwrap_or(u32::MAX).max(1);
        if *target > cap {
            warn!(
                trait_id = %trait_id,
                requested = *target,
                items,
                "catalog has fewer items than the mode asks for; target capped"
            );
            *target = cap;
        }
    }
    targets
}
