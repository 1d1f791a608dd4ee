use serde::{Deserialize, Serialize};

/// Largest possible standard deviation of values on `[0, 1]`.
const MAX_SD: f64 = 0.5;

/// Running evidence for one trait: direct answers plus correlated spill-over.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceAccumulator {
    direct_sum: f64,
    direct_weight: f64,
    direct_count: u32,
    mean: f64,
    m2: f64,
    correlated_sum: f64,
    correlated_weight: f64,
    confidence: f64,
}

impl EvidenceAccumulator {
    /// Record one oriented, normalized answer aimed at this trait.
    pub(crate) fn add_direct(&mut self, value: f64, weight: f64) {
        self.direct_sum += value * weight;
        self.direct_weight += weight;
        self.direct_count += 1;

        // Welford over the unweighted values; consistency ignores item weight.
        let delta = value - self.mean;
        self.mean += delta / f64::from(self.direct_count);
        self.m2 += delta * (value - self.mean);
    }

    pub(crate) fn add_correlated(&mut self, value: f64, weight: f64) {
        self.correlated_sum += value * weight;
        self.correlated_weight += weight;
    }

    pub fn direct_count(&self) -> u32 {
        self.direct_count
    }

    pub fn direct_mean(&self) -> Option<f64> {
        (self.direct_weight > 0.0).then(|| self.direct_sum / self.direct_weight)
    }

    pub fn correlated_mean(&self) -> Option<f64> {
        (self.correlated_weight > 0.0).then(|| self.correlated_sum / self.correlated_weight)
    }

    pub fn variance(&self) -> f64 {
        if self.direct_count == 0 {
            0.0
        } else {
            (self.m2 / f64::from(self.direct_count)).max(0.0)
        }
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    /// Displayed score: direct and correlated evidence blended `direct:correlated`.
    /// Without direct answers only correlated evidence counts; with nothing, neutral.
    pub fn blended(&self, direct: f64, correlated: f64) -> f64 {
        let score = if self.direct_weight > 0.0 {
            let numerator = direct * self.direct_sum + correlated * self.correlated_sum;
            let denominator = direct * self.direct_weight + correlated * self.correlated_weight;
            numerator / denominator
        } else if let Some(mean) = self.correlated_mean() {
            mean
        } else {
            0.5
        };
        score.clamp(0.0, 1.0)
    }

    /// Recompute confidence after new direct evidence.
    ///
    /// `quantity` saturates at `target` answers; `consistency` falls with the
    /// spread of answers but never below `floor`. The stored value only ratchets
    /// upward, so new direct evidence cannot lower it.
    pub(crate) fn refresh_confidence(&mut self, target: u32, floor: f64) {
        let target = target.max(1);
        let quantity = f64::from(self.direct_count.min(target)) / f64::from(target);
        let consistency = (1.0 - self.variance().sqrt() / MAX_SD).max(floor);
        let computed = (quantity * consistency).clamp(0.0, 1.0);
        self.confidence = self.confidence.max(computed);
    }
}

/// Direct-only running mean for one facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetEvidence {
    sum: f64,
    weight: f64,
    count: u32,
}

impl FacetEvidence {
    pub(crate) fn add(&mut self, value: f64, weight: f64) {
        self.sum += value * weight;
        self.weight += weight;
        self.count += 1;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn mean(&self) -> Option<f64> {
        (self.weight > 0.0).then(|| (self.sum / self.weight).clamp(0.0, 1.0))
    }
}

/// Tally of answer extremity, independent of item keying.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleCounts {
    pub high: u32,
    pub low: u32,
    pub moderate: u32,
}

impl StyleCounts {
    pub(crate) fn observe(&mut self, normalized: f64) {
        if normalized >= 0.75 {
            self.high += 1;
        } else if normalized <= 0.25 {
            self.low += 1;
        } else {
            self.moderate += 1;
        }
    }

    pub fn total(&self) -> u32 {
        self.high + self.low + self.moderate
    }
}
