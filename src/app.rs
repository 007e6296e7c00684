use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;

use crate::attachment::ImageAttachment;
use crate::dictation::Dictation;
use crate::error::SearchError;
use crate::export;
use crate::gemini::{ChatSession, Content, GeminiClient, GroundedAnswer};
use crate::input::{append_transcript, InputBuffer};
use crate::mode::Mode;
use crate::state::{ChatHistoryItem, Source};

pub const TEXT_SAMPLE_PROMPT: &str =
    "Who individually won the most bronze medals during the Paris Olympics in 2024?";
pub const IMAGE_SAMPLE_PROMPT: &str = "What is this landmark and where is it located?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
    Attaching, // Image path popup
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Results,
    Sources,
    Input,
}

/// A finished single-shot search, shown until the next one replaces it
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub prompt: String,
    pub image: Option<String>,
    pub answer: GroundedAnswer,
}

/// Input and result state of the text and image search modes
#[derive(Debug, Default)]
pub struct SearchPanel {
    pub input: InputBuffer,
    pub result: Option<SearchResult>,
    pub error: Option<String>,
    pub scroll: u16,
    pub total_lines: u16,
    pub height: u16,
    pub sources_state: ListState,
}

impl SearchPanel {
    fn with_prompt(prompt: &str) -> Self {
        Self {
            input: InputBuffer::new(prompt),
            ..Self::default()
        }
    }

    pub fn sources(&self) -> &[Source] {
        self.result
            .as_ref()
            .map(|r| r.answer.sources.as_slice())
            .unwrap_or(&[])
    }
}

/// Conversation mode: the visible turns and the session replayed to the model
#[derive(Debug, Default)]
pub struct ChatPanel {
    pub input: InputBuffer,
    pub history: Vec<ChatHistoryItem>,
    pub session: ChatSession,
    pub scroll: u16,
    pub follow: bool, // keep the newest turn in view
    pub height: u16,
    pub width: u16,
}

/// The request currently in flight
#[derive(Debug, Clone)]
pub struct PendingQuery {
    pub mode: Mode,
    pub prompt: String,
    pub image: Option<String>,
}

/// What to send to the model for one submit
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub mode: Mode,
    pub contents: Vec<Content>,
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub mode: Mode,
    pub input_mode: InputMode,
    pub focus: FocusPane,

    // Per-mode state
    pub text: SearchPanel,
    pub image: SearchPanel,
    pub image_attachment: Option<ImageAttachment>,
    pub chat: ChatPanel,
    pub attach_input: InputBuffer,

    // Request state
    pub pending: Option<PendingQuery>,
    pub query_task: Option<JoinHandle<Result<GroundedAnswer, SearchError>>>,

    // Dictation state
    pub dictation: Option<Dictation>,
    pub listening: bool,
    pub dictation_target: Mode,
    pub dictation_task: Option<JoinHandle<Result<String>>>,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    /// One-line status shown in the header (attach errors, export paths)
    pub notice: Option<String>,

    // Panel areas for mouse hit-testing (updated during render)
    pub results_area: Option<Rect>,
    pub sources_area: Option<Rect>,
    pub chat_area: Option<Rect>,

    pub client: Option<GeminiClient>,
    pub model: String,
}

impl App {
    pub fn new(
        mode: Mode,
        model: String,
        client: Option<GeminiClient>,
        dictation: Option<Dictation>,
    ) -> Self {
        Self {
            should_quit: false,
            mode,
            input_mode: InputMode::Normal,
            focus: FocusPane::Input,

            text: SearchPanel::with_prompt(TEXT_SAMPLE_PROMPT),
            image: SearchPanel::with_prompt(IMAGE_SAMPLE_PROMPT),
            image_attachment: None,
            chat: ChatPanel {
                follow: true,
                ..ChatPanel::default()
            },
            attach_input: InputBuffer::default(),

            pending: None,
            query_task: None,

            dictation,
            listening: false,
            dictation_target: mode,
            dictation_task: None,

            animation_frame: 0,
            notice: None,

            results_area: None,
            sources_area: None,
            chat_area: None,

            client,
            model,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Loading state of the given mode's view
    pub fn is_loading_in(&self, mode: Mode) -> bool {
        self.pending.as_ref().is_some_and(|p| p.mode == mode)
    }

    pub fn set_mode(&mut self, mode: Mode) {
        if self.mode != mode {
            self.mode = mode;
            self.input_mode = InputMode::Normal;
            self.focus = FocusPane::Input;
            self.notice = None;
        }
    }

    pub fn input(&self) -> &InputBuffer {
        self.input_for(self.mode)
    }

    pub fn input_for(&self, mode: Mode) -> &InputBuffer {
        match mode {
            Mode::Text => &self.text.input,
            Mode::Image => &self.image.input,
            Mode::Conversation => &self.chat.input,
        }
    }

    pub fn input_mut(&mut self) -> &mut InputBuffer {
        self.input_for_mut(self.mode)
    }

    fn input_for_mut(&mut self, mode: Mode) -> &mut InputBuffer {
        match mode {
            Mode::Text => &mut self.text.input,
            Mode::Image => &mut self.image.input,
            Mode::Conversation => &mut self.chat.input,
        }
    }

    /// The search panel of the current mode; `None` in conversation mode
    pub fn search_panel(&self) -> Option<&SearchPanel> {
        match self.mode {
            Mode::Text => Some(&self.text),
            Mode::Image => Some(&self.image),
            Mode::Conversation => None,
        }
    }

    pub fn search_panel_mut(&mut self) -> Option<&mut SearchPanel> {
        match self.mode {
            Mode::Text => Some(&mut self.text),
            Mode::Image => Some(&mut self.image),
            Mode::Conversation => None,
        }
    }

    // Image attachment
    pub fn attach_image(&mut self, path: &Path) -> Result<()> {
        if self.is_loading() {
            return Err(anyhow!("Wait for the current answer before changing the image"));
        }
        let attachment = ImageAttachment::from_path(path)?;
        log::info!("Attached {} ({})", attachment.path.display(), attachment.mime_type);
        self.notice = Some(format!("Attached {}", attachment.file_name()));
        self.image_attachment = Some(attachment);
        Ok(())
    }

    pub fn remove_image(&mut self) {
        if !self.is_loading() && self.image_attachment.take().is_some() {
            self.notice = Some("Image removed".to_string());
        }
    }

    /// The input is read-only while a request is in flight, and in image
    /// mode until an image is attached
    pub fn input_locked(&self) -> bool {
        self.is_loading() || (self.mode == Mode::Image && self.image_attachment.is_none())
    }

    pub fn can_submit(&self) -> bool {
        if self.is_loading() {
            return false;
        }
        match self.mode {
            Mode::Text | Mode::Conversation => !self.input().is_blank(),
            Mode::Image => self.image_attachment.is_some(),
        }
    }

    /// Validate and record a submit for the current mode, returning what to send.
    /// Reading an attached image happens here, before anything is marked pending.
    pub async fn submit(&mut self) -> Option<QueryRequest> {
        if !self.can_submit() {
            return None;
        }
        let mode = self.mode;
        let prompt = self.input().text().to_string();

        let (contents, image) = match mode {
            Mode::Text => (vec![Content::user_text(&prompt)], None),
            Mode::Image => {
                let attachment = self.image_attachment.clone()?;
                match attachment.to_inline_data().await {
                    Ok(inline) => (
                        vec![Content::user_with_image(&prompt, inline)],
                        Some(attachment.file_name()),
                    ),
                    Err(e) => {
                        log::error!("Could not read {}: {}", attachment.path.display(), e);
                        self.image.error = Some(format!("Could not read image: {}", e));
                        return None;
                    }
                }
            }
            Mode::Conversation => {
                let contents = self.chat.session.contents_for(&prompt);
                self.chat.history.push(ChatHistoryItem::user(prompt.clone()));
                self.chat.input.clear();
                self.chat.follow = true;
                (contents, None)
            }
        };

        if let Some(panel) = self.search_panel_mut() {
            panel.result = None;
            panel.error = None;
            panel.scroll = 0;
            panel.sources_state.select(None);
        }

        self.pending = Some(PendingQuery { mode, prompt, image });
        self.animation_frame = 0;
        Some(QueryRequest { mode, contents })
    }

    /// Start the request in the background; without a client it fails right away
    pub fn dispatch(&mut self, request: QueryRequest) {
        log::info!("Dispatching {} query", request.mode.as_str());
        match self.client.clone() {
            Some(client) => {
                self.query_task = Some(tokio::spawn(async move {
                    client.generate(&request.contents).await
                }));
            }
            None => {
                log::warn!("No Gemini API key configured");
                self.complete_query(Err(SearchError::ApiKey));
            }
        }
    }

    /// Apply the outcome of the pending request to the mode that sent it
    pub fn complete_query(&mut self, outcome: Result<GroundedAnswer, SearchError>) {
        let Some(pending) = self.pending.take() else {
            return;
        };

        match pending.mode {
            Mode::Conversation => {
                let item = match outcome {
                    Ok(answer) => {
                        self.chat.session.record(&pending.prompt, &answer.text);
                        log::debug!("Session has {} exchanges", self.chat.session.exchanges());
                        ChatHistoryItem::model(answer.text, answer.sources)
                    }
                    Err(e) => {
                        log::warn!("Conversation turn failed: {:?}", e);
                        ChatHistoryItem::error(e.to_string())
                    }
                };
                self.chat.history.push(item);
                self.chat.follow = true;
            }
            Mode::Text | Mode::Image => {
                let panel = if pending.mode == Mode::Text {
                    &mut self.text
                } else {
                    &mut self.image
                };
                match outcome {
                    Ok(answer) => {
                        let first = if answer.sources.is_empty() { None } else { Some(0) };
                        panel.sources_state.select(first);
                        panel.result = Some(SearchResult {
                            prompt: pending.prompt,
                            image: pending.image,
                            answer,
                        });
                    }
                    Err(e) => {
                        log::warn!("Search failed: {:?}", e);
                        panel.error = Some(e.to_string());
                    }
                }
                panel.scroll = 0;
            }
        }
    }

    /// Collect finished background tasks
    pub async fn poll_tasks(&mut self) {
        if self.query_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.query_task.take() {
                let outcome = match task.await {
                    Ok(outcome) => outcome,
                    Err(e) => Err(SearchError::classify(e.to_string())),
                };
                self.complete_query(outcome);
            }
        }

        if self.dictation_task.as_ref().is_some_and(|t| t.is_finished()) {
            if let Some(task) = self.dictation_task.take() {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(anyhow!(e)),
                };
                self.finish_dictation(result);
            }
        }
    }

    // Dictation
    pub fn can_dictate(&self) -> bool {
        self.dictation.is_some()
            && !self.is_loading()
            && !self.listening
            && !(self.mode == Mode::Image && self.image_attachment.is_none())
    }

    pub fn start_dictation(&mut self) {
        if !self.can_dictate() {
            return;
        }
        if let Some(dictation) = self.dictation.clone() {
            log::info!("Listening for {} input via {}", self.mode.as_str(), dictation.program());
            self.listening = true;
            self.dictation_target = self.mode;
            self.dictation_task = Some(tokio::spawn(async move { dictation.capture().await }));
        }
    }

    pub fn finish_dictation(&mut self, result: Result<String>) {
        self.listening = false;
        match result {
            Ok(transcript) if !transcript.is_empty() => {
                let target = self.input_for_mut(self.dictation_target);
                let text = append_transcript(target.text(), &transcript);
                target.set(&text);
            }
            Ok(_) => {}
            Err(e) => {
                log::warn!("Dictation failed: {}", e);
                self.notice = Some(format!("Dictation failed: {}", e));
            }
        }
    }

    /// Drop the conversation and start a fresh session
    pub fn new_conversation(&mut self) {
        if self.is_loading_in(Mode::Conversation) {
            return;
        }
        self.chat.history.clear();
        self.chat.session = ChatSession::new();
        self.chat.scroll = 0;
        self.chat.follow = true;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() || self.listening {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Scrolling
    pub fn scroll_down(&mut self, lines: u16) {
        match self.mode {
            Mode::Conversation => {
                self.chat.scroll = self.chat.scroll.saturating_add(lines);
            }
            _ => {
                if let Some(panel) = self.search_panel_mut() {
                    let max_scroll = panel.total_lines.saturating_sub(panel.height);
                    panel.scroll = panel.scroll.saturating_add(lines).min(max_scroll);
                }
            }
        }
    }

    pub fn scroll_up(&mut self, lines: u16) {
        match self.mode {
            Mode::Conversation => {
                self.chat.follow = false;
                self.chat.scroll = self.chat.scroll.saturating_sub(lines);
            }
            _ => {
                if let Some(panel) = self.search_panel_mut() {
                    panel.scroll = panel.scroll.saturating_sub(lines);
                }
            }
        }
    }

    pub fn scroll_to_top(&mut self) {
        self.scroll_up(u16::MAX);
    }

    pub fn scroll_to_bottom(&mut self) {
        if self.mode == Mode::Conversation {
            self.chat.follow = true;
        } else {
            self.scroll_down(u16::MAX);
        }
    }

    // Sources list navigation
    pub fn sources_nav_down(&mut self) {
        if let Some(panel) = self.search_panel_mut() {
            let len = panel.sources().len();
            if len > 0 {
                let i = panel.sources_state.selected().unwrap_or(0);
                panel.sources_state.select(Some((i + 1).min(len - 1)));
            }
        }
    }

    pub fn sources_nav_up(&mut self) {
        if let Some(panel) = self.search_panel_mut() {
            let i = panel.sources_state.selected().unwrap_or(0);
            panel.sources_state.select(Some(i.saturating_sub(1)));
        }
    }

    pub fn selected_source(&self) -> Option<&Source> {
        let panel = self.search_panel()?;
        panel.sources_state.selected().and_then(|i| panel.sources().get(i))
    }

    pub fn has_sources(&self) -> bool {
        self.search_panel().is_some_and(|p| !p.sources().is_empty())
    }

    /// Tab order: results, sources (when there are any), input
    pub fn cycle_focus(&mut self) {
        self.focus = match self.focus {
            FocusPane::Results if self.has_sources() => FocusPane::Sources,
            FocusPane::Results | FocusPane::Sources => FocusPane::Input,
            FocusPane::Input => FocusPane::Results,
        };
    }

    /// HTML body for the current mode's content, if there is any yet
    pub fn export_body(&self) -> Option<String> {
        match self.mode {
            Mode::Conversation => {
                if self.chat.history.is_empty() {
                    None
                } else {
                    Some(export::conversation_html(&self.chat.history))
                }
            }
            _ => {
                let result = self.search_panel()?.result.as_ref()?;
                Some(export::result_html(
                    &result.prompt,
                    result.image.as_deref(),
                    &result.answer.text,
                    &result.answer.sources,
                ))
            }
        }
    }

    pub fn export_current(&mut self) -> Result<Option<PathBuf>> {
        let Some(body) = self.export_body() else {
            self.notice = Some("Nothing to export yet".to_string());
            return Ok(None);
        };
        let path = export::write_export(&export::export_dir()?, self.mode, &body)?;
        self.notice = Some(format!("Saved {}", path.display()));
        Ok(Some(path))
    }
}
