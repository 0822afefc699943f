use mv_targets::TargetId;
use mv_targets::TargetSelection;

pub(super) const EMPTY_SELECTION_WARNING: &str = "Please select at least one AI.";

/// Working copy of the "Select AIs" checkboxes; applied only on confirm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(super) struct SelectionDraft {
    pub(super) checked: Vec<(TargetId, bool)>,
    pub(super) warning: Option<&'static str>,
}

impl SelectionDraft {
    pub(super) fn from_selection(selection: &TargetSelection) -> Self {
        Self {
            checked: TargetId::ALL
                .into_iter()
                .map(|target| (target, selection.is_enabled(target)))
                .collect(),
            warning: None,
        }
    }

    pub(super) fn set_all(&mut self, enabled: bool) {
        for (_, checked) in &mut self.checked {
            *checked = enabled;
        }
    }

    /// Checked targets, or `None` with the warning raised when nothing is checked.
    pub(super) fn confirm(&mut self) -> Option<Vec<TargetId>> {
        let chosen: Vec<TargetId> = self
            .checked
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(target, _)| *target)
            .collect();
        if chosen.is_empty() {
            self.warning = Some(EMPTY_SELECTION_WARNING);
            return None;
        }
        self.warning = None;
        Some(chosen)
    }
}
