//! Registry of the AI chat sites the application drives.

use mv_core::AppError;
use mv_core::AppResult;
use tracing::info;

/// Substitution point inside every injection template.
pub const PROMPT_PLACEHOLDER: &str = "{prompt}";

/// One hosted AI chat service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TargetId {
    ChatGpt,
    Claude,
    Grok,
    AiStudio,
    KimiK2,
}

/// Static description of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetDefinition {
    pub id: TargetId,
    pub name: &'static str,
    pub home_url: &'static str,
    /// Script with a single `{prompt}` placeholder; `None` for view-only targets.
    pub injection_template: Option<&'static str>,
}

/// Registry order doubles as pane order and broadcast order.
pub static REGISTRY: [TargetDefinition; 5] = [
    TargetDefinition {
        id: TargetId::ChatGpt,
        name: "ChatGPT",
        home_url: "https://chatgpt.com/",
        injection_template: Some(include_str!("templates/chatgpt.js")),
    },
    TargetDefinition {
        id: TargetId::Claude,
        name: "Claude",
        home_url: "https://claude.ai/new",
        injection_template: Some(include_str!("templates/claude.js")),
    },
    TargetDefinition {
        id: TargetId::Grok,
        name: "Grok",
        home_url: "https://x.com/i/grok",
        injection_template: Some(include_str!("templates/grok.js")),
    },
    TargetDefinition {
        id: TargetId::AiStudio,
        name: "AI Studio",
        home_url: "https://aistudio.google.com/prompts/new_chat",
        injection_template: Some(include_str!("templates/ai_studio.js")),
    },
    TargetDefinition {
        id: TargetId::KimiK2,
        name: "Kimi K2",
        home_url: "https://www.kimi.com/en",
        injection_template: Some(include_str!("templates/kimi.js")),
    },
];

impl TargetId {
    pub const ALL: [TargetId; 5] = [
        TargetId::ChatGpt,
        TargetId::Claude,
        TargetId::Grok,
        TargetId::AiStudio,
        TargetId::KimiK2,
    ];

    pub fn definition(self) -> &'static TargetDefinition {
        &REGISTRY[self.registry_index()]
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }

    pub fn from_name(value: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .find(|definition| definition.name == value)
            .map(|definition| definition.id)
    }

    fn registry_index(self) -> usize {
        match self {
            Self::ChatGpt => 0,
            Self::Claude => 1,
            Self::Grok => 2,
            Self::AiStudio => 3,
            Self::KimiK2 => 4,
        }
    }
}

/// The enabled subset of the registry. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSelection {
    enabled: Vec<TargetId>,
}

impl Default for TargetSelection {
    fn default() -> Self {
        Self {
            enabled: TargetId::ALL.to_vec(),
        }
    }
}

impl TargetSelection {
    /// Restores a saved selection; missing or empty means everything enabled.
    pub fn from_saved(saved: Option<&[TargetId]>) -> Self {
        let mut selection = Self::default();
        if let Some(saved) = saved {
            if selection.set_enabled(saved).is_err() {
                info!("saved target selection is empty; enabling all targets");
            }
        }
        selection
    }

    /// Replaces the enabled set. An empty set is rejected and leaves the current one in effect.
    pub fn set_enabled(&mut self, targets: &[TargetId]) -> AppResult<()> {
        if targets.is_empty() {
            return Err(AppError::new(
                "targets.selection_empty",
                "at least one AI target must stay enabled",
            ));
        }

        self.enabled = TargetId::ALL
            .into_iter()
            .filter(|target| targets.contains(target))
            .collect();
        Ok(())
    }

    pub fn is_enabled(&self, target: TargetId) -> bool {
        self.enabled.contains(&target)
    }

    pub fn enabled(&self) -> &[TargetId] {
        &self.enabled
    }

    /// Enabled definitions in registry order.
    pub fn effective_targets(&self) -> Vec<&'static TargetDefinition> {
        self.enabled.iter().map(|target| target.definition()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::PROMPT_PLACEHOLDER;
    use super::REGISTRY;
    use super::TargetId;
    use super::TargetSelection;

    #[test]
    fn registry_ids_match_their_slots() {
        for (index, definition) in REGISTRY.iter().enumerate() {
            assert_eq!(TargetId::ALL[index], definition.id);
            assert_eq!(definition.id.definition().name, definition.name);
            assert_eq!(TargetId::from_name(definition.name), Some(definition.id));
        }
        assert_eq!(TargetId::from_name("Bard"), None);
    }

    #[test]
    fn home_urls_are_absolute_https() {
        for definition in &REGISTRY {
            let parsed = url::Url::parse(definition.home_url);
            assert!(parsed.is_ok(), "{} has a bad home url", definition.name);
            if let Ok(parsed) = parsed {
                assert_eq!(parsed.scheme(), "https");
            }
        }
    }

    #[test]
    fn templates_have_exactly_one_placeholder() {
        for definition in &REGISTRY {
            let template = definition.injection_template.unwrap_or_default();
            assert_eq!(
                template.matches(PROMPT_PLACEHOLDER).count(),
                1,
                "{} template",
                definition.name
            );
        }
    }

    #[test]
    fn templates_poll_every_hundred_milliseconds() {
        for definition in &REGISTRY {
            let template = definition.injection_template.unwrap_or_default();
            assert!(template.contains("setInterval("));
            assert!(template.contains("}, 100);"));
            assert!(template.contains("clearInterval(interval)"));
        }
    }

    #[test]
    fn empty_selection_is_rejected_and_previous_kept() {
        let mut selection = TargetSelection::default();
        assert!(selection.set_enabled(&[TargetId::Grok]).is_ok());

        let result = selection.set_enabled(&[]);
        assert_eq!(
            result.map_err(|error| error.code),
            Err("targets.selection_empty")
        );
        assert_eq!(selection.enabled(), &[TargetId::Grok]);
    }

    #[test]
    fn effective_targets_follow_registry_order() {
        let mut selection = TargetSelection::default();
        assert!(
            selection
                .set_enabled(&[TargetId::KimiK2, TargetId::ChatGpt, TargetId::Grok])
                .is_ok()
        );
        let names: Vec<_> = selection
            .effective_targets()
            .iter()
            .map(|definition| definition.name)
            .collect();
        assert_eq!(names, vec!["ChatGPT", "Grok", "Kimi K2"]);
    }

    #[test]
    fn saved_selection_falls_back_to_all() {
        assert_eq!(TargetSelection::from_saved(None), TargetSelection::default());
        assert_eq!(
            TargetSelection::from_saved(Some(&[])),
            TargetSelection::default()
        );
        assert_eq!(
            TargetSelection::from_saved(Some(&[TargetId::Claude])).enabled(),
            &[TargetId::Claude]
        );
    }
}
