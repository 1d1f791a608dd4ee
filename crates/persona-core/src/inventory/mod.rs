//! Assessment core: catalog, adaptive selection, scoring, matching, and sessions.

pub mod catalog;
pub mod domain;
pub mod ledger;
pub mod matcher;
pub mod model;
pub mod persistence;
pub mod report;
pub mod scoring;
pub mod selector;
pub mod service;
pub mod session;
pub mod settings;

#[cfg(test)]
mod tests;

pub use catalog::{CatalogError, CatalogLoader, Inventory, ItemCatalog};
pub use domain::{
    AnswerScale, Direction, Item, ItemId, Response, SessionId, TraitDefinition, TraitId,
    TraitLoading,
};
pub use ledger::ResponseLedger;
pub use matcher::{
    MatchOutcome, MatcherError, ProfileMatch, ProfileMatcher, Ranking, ReferenceProfile,
};
pub use model::{CorrelationMatrix, CorrelationPair, TraitModel};
pub use persistence::{
    JsonFileSnapshotStore, MemorySnapshotStore, SaveRecord, SnapshotSink, SnapshotStore,
    SnapshotWriter, StoreError, WriterHandle, WriterSummary,
};
pub use report::{
    Diagnostic, FinalReport, ResponseStyle, ResultQuality, SmoothingAdjustment,
    TerminationReason, TraitScore,
};
pub use scoring::{AxisPole, AxisResult, ScoringEngine, ScoringState, TypeAxis, TypeCode};
pub use selector::{AdaptiveSelector, SelectionError, SelectorState, TerminationPolicy};
pub use service::AssessmentService;
pub use session::{
    AssessmentError, InvalidResponse, NextItem, Session, SessionSnapshot, SessionStatus,
    SnapshotError,
};
pub use settings::{AssessmentConfig, AssessmentMode, SelectorWeights};
