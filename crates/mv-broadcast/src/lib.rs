//! Sends one prompt to every live pane by injecting its target's script.

use mv_core::PaneId;
use mv_core::WebSurface;
use mv_panes::PaneManager;
use mv_targets::PROMPT_PLACEHOLDER;
use mv_targets::TargetId;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Escapes a prompt for embedding inside a JS string or template literal.
///
/// Replacement order matters: backslashes first, so later escapes are not doubled.
/// `$` is escaped so `${...}` in a prompt stays text inside template literals;
/// `\$` reads back as `$` in single-quoted strings too.
pub fn escape_prompt(prompt: &str) -> String {
    prompt
        .replace('\\', "\\\\")
        .replace('`', "\\`")
        .replace('\n', "\\n")
        .replace('\'', "\\'")
        .replace('$', "\\$")
}

/// Substitutes an already escaped prompt into a template.
pub fn render_script(template: &str, escaped_prompt: &str) -> String {
    template.replace(PROMPT_PLACEHOLDER, escaped_prompt)
}

/// Result of one broadcast request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BroadcastOutcome {
    /// Manual mode is on; nothing was sent.
    Suppressed,
    /// The prompt was blank after trimming.
    EmptyPrompt,
    Dispatched {
        panes: Vec<(PaneId, TargetId)>,
        failed: Vec<(PaneId, TargetId)>,
    },
}

impl BroadcastOutcome {
    /// Whether the shell should clear the prompt box.
    pub fn consumed_prompt(&self) -> bool {
        matches!(self, Self::Dispatched { .. })
    }
}

#[derive(Debug, Default, Clone)]
pub struct Broadcaster {
    manual_mode: bool,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_manual_mode(&self) -> bool {
        self.manual_mode
    }

    /// Enables or disables manual ("log in") mode. Returns the new state.
    pub fn set_manual_mode(&mut self, enabled: bool) -> bool {
        if self.manual_mode != enabled {
            info!(enabled, "manual mode changed");
        }
        self.manual_mode = enabled;
        self.manual_mode
    }

    pub fn toggle_manual_mode(&mut self) -> bool {
        self.set_manual_mode(!self.manual_mode)
    }

    /// Injects `prompt` into every live pane whose target has a template.
    ///
    /// Dispatch follows pane order and each pane is independent: a script the
    /// host rejects is logged and the remaining panes still receive theirs.
    /// Nothing reports whether the page actually submitted.
    pub fn broadcast<S: WebSurface>(
        &self,
        prompt: &str,
        panes: &mut PaneManager<S>,
    ) -> BroadcastOutcome {
        if self.manual_mode {
            debug!("broadcast suppressed in manual mode");
            return BroadcastOutcome::Suppressed;
        }

        let trimmed = prompt.trim();
        if trimmed.is_empty() {
            return BroadcastOutcome::EmptyPrompt;
        }

        let escaped = escape_prompt(trimmed);
        let mut dispatched = Vec::new();
        let mut failed = Vec::new();

        for pane in panes.panes_mut() {
            let target = pane.target();
            let Some(template) = target.definition().injection_template else {
                continue;
            };

            let script = render_script(template, &escaped);
            match pane.surface_mut().evaluate_script(&script) {
                Ok(()) => dispatched.push((pane.id(), target)),
                Err(error) => {
                    warn!(pane = %pane.id(), target_name = target.name(), %error, "prompt injection failed");
                    failed.push((pane.id(), target));
                }
            }
        }

        info!(
            chars = trimmed.chars().count(),
            dispatched = dispatched.len(),
            failed = failed.len(),
            "prompt broadcast"
        );
        BroadcastOutcome::Dispatched {
            panes: dispatched,
            failed,
        }
    }
}
