//! In-memory surfaces for exercising pane, popup and broadcast logic without a webview.

use crate::AppError;
use crate::AppResult;
use crate::SurfaceFactory;
use crate::SurfaceRect;
use crate::SurfaceRequest;
use crate::SurfaceRole;
use crate::WebSurface;

#[derive(Debug, Clone, PartialEq)]
pub enum SurfaceCommand {
    Navigate(String),
    Reload,
    Evaluate(String),
    Bounds(SurfaceRect),
    Visible(bool),
    Zoom(f64),
    CaptureSelection,
    DevTools,
}

/// Records every command it receives.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    /// Creation order across one factory; stands in for instance identity.
    pub serial: u64,
    pub role: SurfaceRole,
    pub label: String,
    pub profile_name: String,
    pub initial_url: String,
    pub commands: Vec<SurfaceCommand>,
    pub fail_scripts: bool,
}

impl RecordingSurface {
    pub fn scripts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|command| match command {
                SurfaceCommand::Evaluate(source) => Some(source.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, wanted: &SurfaceCommand) -> usize {
        self.commands
            .iter()
            .filter(|command| *command == wanted)
            .count()
    }
}

impl WebSurface for RecordingSurface {
    fn navigate(&mut self, url: &str) -> AppResult<()> {
        self.commands.push(SurfaceCommand::Navigate(url.to_owned()));
        Ok(())
    }

    fn reload(&mut self) -> AppResult<()> {
        self.commands.push(SurfaceCommand::Reload);
        Ok(())
    }

    fn evaluate_script(&mut self, source: &str) -> AppResult<()> {
        if self.fail_scripts {
            return Err(AppError::new(
                "testing.script_rejected",
                "surface configured to reject scripts",
            ));
        }
        self.commands.push(SurfaceCommand::Evaluate(source.to_owned()));
        Ok(())
    }

    fn set_bounds(&mut self, rect: SurfaceRect) -> AppResult<()> {
        self.commands.push(SurfaceCommand::Bounds(rect));
        Ok(())
    }

    fn set_visible(&mut self, visible: bool) -> AppResult<()> {
        self.commands.push(SurfaceCommand::Visible(visible));
        Ok(())
    }

    fn set_zoom(&mut self, factor: f64) -> AppResult<()> {
        self.commands.push(SurfaceCommand::Zoom(factor));
        Ok(())
    }

    fn capture_selection(&mut self) -> AppResult<()> {
        self.commands.push(SurfaceCommand::CaptureSelection);
        Ok(())
    }

    fn open_devtools(&mut self) {
        self.commands.push(SurfaceCommand::DevTools);
    }
}

/// Hands out [`RecordingSurface`]s; labels listed in `fail_labels` fail to build.
#[derive(Debug, Default)]
pub struct RecordingFactory {
    pub created: u64,
    pub fail_labels: Vec<String>,
    pub fail_scripts_for: Vec<String>,
}

impl SurfaceFactory for RecordingFactory {
    type Surface = RecordingSurface;

    fn create(&mut self, request: &SurfaceRequest<'_>) -> AppResult<RecordingSurface> {
        if self.fail_labels.iter().any(|label| label == request.label) {
            return Err(AppError::new(
                "testing.surface_rejected",
                format!("factory configured to reject `{}`", request.label),
            ));
        }

        self.created += 1;
        Ok(RecordingSurface {
            serial: self.created,
            role: request.role,
            label: request.label.to_owned(),
            profile_name: request.profile_name.to_owned(),
            initial_url: request.url.to_owned(),
            commands: Vec::new(),
            fail_scripts: self
                .fail_scripts_for
                .iter()
                .any(|label| label == request.label),
        })
    }
}
