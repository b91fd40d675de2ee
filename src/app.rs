use std::path::PathBuf;
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::ai::{GenerateError, GenerationService};
use crate::config::Settings;
use crate::diagram::{
    export_svg, run_attempt, DiagramEngine, ExportError, KrokiEngine, RenderAttempt,
    RenderError, RenderPipeline,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Compose,
    Settings,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    ModelName,
    ApiKey,
}

/// Ticks a transient status line stays visible (300ms each).
const STATUS_TICKS: u8 = 10;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub screen: Screen,
    pub input_mode: InputMode,

    // Prompt pane
    pub prompt_input: String,
    pub prompt_cursor: usize,

    // Generation state. Each submission gets the next sequence number;
    // completions carrying an older number are discarded, so a slow reply
    // can never clobber a newer one.
    pub generating: bool,
    pub generation_seq: u64,
    pub generate_task: Option<JoinHandle<(u64, Result<String, GenerateError>)>>,
    pub generation_error: Option<String>,

    // Render pipeline
    pub pipeline: RenderPipeline,
    pub render_task: Option<JoinHandle<(u64, Result<String, RenderError>)>>,
    pub show_source: bool,

    // Export state
    pub exporting: bool,
    pub export_task: Option<JoinHandle<Result<PathBuf, ExportError>>>,

    // Settings screen
    pub settings: Option<Settings>,
    pub settings_field: SettingsField,
    pub model_input: String,
    pub model_cursor: usize,
    pub key_input: String,
    pub key_cursor: usize,
    pub show_api_key: bool,

    // Transient status line
    pub status: Option<String>,
    pub status_ticks: u8,

    // Animation state
    pub animation_frame: u8,

    pub service: GenerationService,
    pub engine: Arc<dyn DiagramEngine>,
}

impl App {
    pub fn new() -> Self {
        Self::with_parts(GenerationService::new(), Arc::new(KrokiEngine::new()))
    }

    pub fn with_parts(service: GenerationService, engine: Arc<dyn DiagramEngine>) -> Self {
        let settings = Settings::load();
        let (model_input, key_input) = settings
            .as_ref()
            .map(|s| (s.model_name.clone(), s.api_key.clone()))
            .unwrap_or_default();
        let model_cursor = model_input.chars().count();
        let key_cursor = key_input.chars().count();

        Self {
            should_quit: false,
            screen: Screen::Compose,
            input_mode: InputMode::Normal,

            prompt_input: String::new(),
            prompt_cursor: 0,

            generating: false,
            generation_seq: 0,
            generate_task: None,
            generation_error: None,

            pipeline: RenderPipeline::new(),
            render_task: None,
            show_source: false,

            exporting: false,
            export_task: None,

            settings,
            settings_field: SettingsField::ModelName,
            model_input,
            model_cursor,
            key_input,
            key_cursor,
            show_api_key: false,

            status: None,
            status_ticks: 0,

            animation_frame: 0,

            service,
            engine,
        }
    }

    /// Kick off a generation for the current prompt. A submission while one
    /// is in flight supersedes it — the old task keeps running but its
    /// result is dead on arrival.
    pub fn submit_prompt(&mut self) {
        let text = self.prompt_input.trim().to_string();
        if text.is_empty() {
            return;
        }

        self.generation_seq += 1;
        let seq = self.generation_seq;
        self.generating = true;
        self.generation_error = None;

        let service = self.service.clone();
        let settings = self.settings.clone();
        self.generate_task = Some(tokio::spawn(async move {
            let result = service.generate(settings.as_ref(), &text).await;
            (seq, result)
        }));
    }

    fn apply_generation(&mut self, seq: u64, result: Result<String, GenerateError>) {
        if seq != self.generation_seq {
            tracing::debug!(seq, latest = self.generation_seq, "discarding stale generation");
            return;
        }
        self.generating = false;

        match result {
            Ok(source) => {
                self.generation_error = None;
                self.show_source = false;
                if let Some(attempt) = self.pipeline.set_source(Some(source)) {
                    self.start_render(attempt);
                }
            }
            Err(err) => {
                let not_configured = matches!(err, GenerateError::NotConfigured);
                self.generation_error = Some(err.to_string());
                if not_configured {
                    // No point leaving the user staring at the prompt.
                    self.screen = Screen::Settings;
                    self.input_mode = InputMode::Editing;
                }
            }
        }
    }

    pub fn start_render(&mut self, attempt: RenderAttempt) {
        let engine = Arc::clone(&self.engine);
        self.render_task = Some(tokio::spawn(async move {
            let outcome = run_attempt(engine.as_ref(), &attempt).await;
            (attempt.token, outcome)
        }));
    }

    pub fn cycle_theme(&mut self) {
        let next = self.pipeline.theme().next();
        if let Some(attempt) = self.pipeline.set_theme(next) {
            self.start_render(attempt);
        }
        self.set_status(format!("Theme: {}", self.pipeline.theme().display_name()));
    }

    /// Save the rendered diagram as `diagram.svg`. A no-op while nothing is
    /// rendered or another export is still running.
    pub fn export(&mut self) {
        if self.exporting {
            return;
        }
        let Some(svg) = self.pipeline.rendered_svg() else {
            self.set_status("Nothing rendered to export".to_string());
            return;
        };

        let svg = svg.to_string();
        let dir = export_dir();
        self.exporting = true;
        self.set_status("Exporting...".to_string());
        self.export_task = Some(tokio::task::spawn_blocking(move || export_svg(&svg, &dir)));
    }

    pub fn save_settings(&mut self) {
        let settings = Settings::new(self.model_input.trim(), self.key_input.trim());
        if !settings.is_complete() {
            self.set_status("Model name and API key are both required".to_string());
            return;
        }

        match settings.save() {
            Ok(()) => {
                self.settings = Some(settings);
                self.set_status("Settings saved".to_string());
                self.screen = Screen::Compose;
                self.input_mode = InputMode::Normal;
            }
            Err(err) => {
                tracing::error!(%err, "failed to save settings");
                self.set_status(format!("Error saving settings: {err}"));
            }
        }
    }

    pub fn open_settings(&mut self) {
        // Re-fill the form from the stored record so edits start from truth.
        if let Some(settings) = &self.settings {
            self.model_input = settings.model_name.clone();
            self.key_input = settings.api_key.clone();
        }
        self.model_cursor = self.model_input.chars().count();
        self.key_cursor = self.key_input.chars().count();
        self.settings_field = SettingsField::ModelName;
        self.show_api_key = false;
        self.screen = Screen::Settings;
    }

    pub fn set_status(&mut self, message: String) {
        self.status = Some(message);
        self.status_ticks = STATUS_TICKS;
    }

    /// Tick: advance the spinner, decay the status line.
    pub fn tick_animation(&mut self) {
        if self.generating || *self.pipeline.state() == crate::diagram::RenderState::Loading {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
        if self.status_ticks > 0 {
            self.status_ticks -= 1;
            if self.status_ticks == 0 {
                self.status = None;
            }
        }
    }

    /// Reap finished background tasks. Called on every tick; stale results
    /// are dropped by the sequence/token guards, never applied.
    pub async fn poll_tasks(&mut self) {
        if self.generate_task.as_ref().is_some_and(JoinHandle::is_finished) {
            let task = self.generate_task.take().expect("checked above");
            match task.await {
                Ok((seq, result)) => self.apply_generation(seq, result),
                Err(err) => {
                    tracing::error!(%err, "generation task panicked");
                    self.generating = false;
                    self.set_status("Generation failed unexpectedly".to_string());
                }
            }
        }

        if self.render_task.as_ref().is_some_and(JoinHandle::is_finished) {
            let task = self.render_task.take().expect("checked above");
            match task.await {
                Ok((token, outcome)) => {
                    self.pipeline.complete(token, outcome);
                }
                Err(err) => {
                    tracing::error!(%err, "render task panicked");
                }
            }
        }

        if self.export_task.as_ref().is_some_and(JoinHandle::is_finished) {
            let task = self.export_task.take().expect("checked above");
            self.exporting = false;
            match task.await {
                Ok(Ok(path)) => self.set_status(format!("Saved {}", path.display())),
                Ok(Err(err)) => self.set_status(format!("Export failed: {err}")),
                Err(err) => {
                    tracing::error!(%err, "export task panicked");
                    self.set_status("Export failed unexpectedly".to_string());
                }
            }
        }
    }

    pub fn busy(&self) -> bool {
        self.generating || *self.pipeline.state() == crate::diagram::RenderState::Loading
    }
}

/// Where exports land: the platform downloads directory, else the cwd.
fn export_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."))
}
