//! Three-tier approval labels and the minimal diff that moves an issue to
//! the tier matching its approval count.

use serde::Serialize;

/// Label per tier, indexed by `min(granted, 2)`.
pub const LABELS: [&str; 3] = ["lgtm/need 2", "lgtm/need 1", "lgtm/done"];

/// Tier index for a number of granted approvals; saturates at "done".
pub fn tier(granted: usize) -> usize {
    granted.min(LABELS.len() - 1)
}

pub fn label_for(granted: usize) -> &'static str {
    LABELS[tier(granted)]
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LabelDiff {
    pub to_add: Vec<String>,
    pub to_remove: Vec<String>,
}

impl LabelDiff {
    /// Labels to add and remove so that `current` carries the label for
    /// `granted` and none of the lower tiers. Labels outside the vocabulary
    /// and higher-tier labels are left alone.
    pub fn compute(granted: usize, current: &[String]) -> Self {
        let idx = tier(granted);
        let target = LABELS[idx];
        let stale = &LABELS[..idx];

        let has_target = current.iter().any(|label| label == target);
        let to_remove = current
            .iter()
            .filter(|label| label.as_str() != target && stale.contains(&label.as_str()))
            .cloned()
            .collect();
        let to_add = if has_target {
            Vec::new()
        } else {
            vec![target.to_string()]
        };

        Self { to_add, to_remove }
    }

    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// The label set after this diff is applied to `current`.
    pub fn apply(&self, current: &[String]) -> Vec<String> {
        let mut labels: Vec<String> = current
            .iter()
            .filter(|label| !self.to_remove.contains(label))
            .cloned()
            .collect();
        labels.extend(self.to_add.iter().cloned());
        labels
    }
}
