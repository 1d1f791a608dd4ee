use serde::{Deserialize, Serialize};

use super::domain::{ItemId, Response};

/// Append-only record of everything the respondent was shown and said.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseLedger {
    entries: Vec<Response>,
}

impl ResponseLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, response: Response) {
        self.entries.push(response);
    }

    pub fn entries(&self) -> &[Response] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, item_id: &ItemId) -> bool {
        self.entries.iter().any(|entry| &entry.item_id == item_id)
    }

    /// Responses that carry an answer.
    pub fn answered(&self) -> usize {
        self.entries.iter().filter(|entry| !entry.is_skip()).count()
    }

    pub fn skipped(&self) -> usize {
        self.entries.iter().filter(|entry| entry.is_skip()).count()
    }

    pub fn last(&self) -> Option<&Response> {
        self.entries.last()
    }
}
