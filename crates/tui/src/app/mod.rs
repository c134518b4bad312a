use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    mpsc::{Receiver, TryRecvError},
    Arc,
};

use client::backend::{upload, Backend, BackendConfig, PdfFile};
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use paper_core::chat::{ChatDelta, Role, UploadError};
use paper_core::transcript::Transcript;
use ratatui::layout::Rect;
use tracing::{error, info};
use unicode_segmentation::UnicodeSegmentation;

pub mod chat;
pub mod history;
pub mod input;

use crate::strings;

pub struct WrappedTurn {
    pub role: Role,
    pub content_len: usize,
    pub lines: Vec<String>,
}

/// Upload progress surfaced on the status line.
pub enum UploadStatus {
    Pending(String),
    Done(String),
    Failed(String),
}

impl UploadStatus {
    pub fn label(&self) -> &str {
        match self {
            UploadStatus::Pending(s) | UploadStatus::Done(s) | UploadStatus::Failed(s) => s,
        }
    }
}

pub struct App {
    pub transcript: Transcript,
    pub input: String,
    pub input_cursor: usize,
    pub history: Vec<String>,
    pub history_index: Option<usize>,
    pub should_quit: bool,
    pub chat_scroll: u16,
    pub stick_to_bottom: bool,
    pub chat_area: Option<Rect>,
    pub chat_wrap_width: u16,
    pub chat_cache: Vec<WrappedTurn>,
    pub chat_total_lines: usize,
    pub input_visible_lines: u16,
    pub input_max_lines: u16,
    pub dirty: bool,
    pub backend_label: String,
    pub notice: Option<String>,
    pub upload_status: Option<UploadStatus>,
    chat_rx: Option<Receiver<Result<String, String>>>,
    chat_cancel: Option<Arc<AtomicBool>>,
    upload_rx: Option<Receiver<Result<String, String>>>,
    pub selected_pdf: Option<PathBuf>,
}

impl App {
    pub fn new() -> Self {
        let cfg = BackendConfig::from_env_and_file();
        let mut transcript = Transcript::new();
        transcript.push_assistant(strings::WELCOME);
        Self {
            transcript,
            input: String::new(),
            input_cursor: 0,
            history: Vec::new(),
            history_index: None,
            should_quit: false,
            chat_scroll: 0,
            stick_to_bottom: true,
            chat_area: None,
            chat_wrap_width: 0,
            chat_cache: Vec::new(),
            chat_total_lines: 0,
            input_visible_lines: 1,
            input_max_lines: 6,
            dirty: true,
            backend_label: cfg.base_url,
            notice: None,
            upload_status: None,
            chat_rx: None,
            chat_cancel: None,
            upload_rx: None,
            selected_pdf: None,
        }
    }

    pub fn streaming(&self) -> bool {
        self.chat_rx.is_some()
    }

    // Returns true if a supported slash command was handled
    fn try_handle_slash_command(&mut self, text: &str) -> bool {
        let s = text.trim();
        if !s.starts_with('/') {
            return false;
        }
        let rest = &s[1..];
        let mut parts = rest.splitn(2, char::is_whitespace);
        let cmd = parts.next().unwrap_or("").to_lowercase();
        let arg = parts.next().unwrap_or("").trim();
        match cmd.as_str() {
            "upload" => {
                if arg.is_empty() {
                    self.notice = Some(strings::UPLOAD_USAGE.to_string());
                    return true;
                }
                self.start_upload(PathBuf::from(arg));
                true
            }
            _ => true, // Unknown slash cmd: consume it quietly
        }
    }

    pub fn submit(&mut self) {
        let text = self.input.trim().to_string();
        if text.is_empty() {
            return;
        }

        if self.try_handle_slash_command(&text) {
            self.input.clear();
            self.input_cursor = 0;
            self.dirty = true;
            return;
        }

        // One stream at a time: the active one owns the transcript tail.
        if self.chat_rx.is_some() {
            self.notice = Some(strings::BUSY_STREAMING.to_string());
            self.dirty = true;
            return;
        }

        self.record_history_entry(&text);
        self.notice = None;
        self.transcript.push_user(text.clone());
        self.transcript.begin_reply();

        let (tx, rx) = std::sync::mpsc::channel::<Result<String, String>>();
        self.chat_rx = Some(rx);
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.chat_cancel = Some(cancel_flag.clone());
        info!(target: "tui", "submit: input_len={} chars", text.len());
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(Err(format!("runtime: {}", e)));
                    return;
                }
            };
            rt.block_on(async move {
                let cfg = BackendConfig::from_env_and_file();
                let backend = match Backend::new(cfg) {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(format!("client: {}", e)));
                        error!(target: "tui", "backend build error: {}", e);
                        return;
                    }
                };
                match backend.stream_chat(&text).await {
                    Ok(mut s) => {
                        use futures::StreamExt;
                        let mut tick =
                            tokio::time::interval(std::time::Duration::from_millis(100));
                        loop {
                            tokio::select! {
                                _ = tick.tick() => {
                                    if cancel_flag.load(Ordering::Relaxed) {
                                        let _ = tx.send(Err("canceled".to_string()));
                                        break;
                                    }
                                }
                                it = s.next() => {
                                    match it {
                                        Some(Ok(ChatDelta::Text(t))) => {
                                            let _ = tx.send(Ok(t));
                                        }
                                        Some(Ok(ChatDelta::Done)) => break,
                                        Some(Err(e)) => {
                                            let _ = tx.send(Err(format!("{}", e)));
                                            error!(target: "tui", "stream error: {}", e);
                                            break;
                                        }
                                        None => break,
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        let _ = tx.send(Err(format!("{}", e)));
                        error!(target: "tui", "stream start error: {}", e);
                    }
                }
            });
        });

        self.input.clear();
        self.input_cursor = 0;
        self.stick_to_bottom = true;
        self.chat_scroll = 0;
        self.dirty = true;
    }

    fn start_upload(&mut self, path: PathBuf) {
        if self.upload_rx.is_some() {
            self.notice = Some(strings::BUSY_UPLOADING.to_string());
            return;
        }
        let file = match PdfFile::from_path(&path) {
            Ok(f) => f,
            Err(e) => {
                self.upload_status =
                    Some(UploadStatus::Failed(format!("{}: {}", path.display(), e)));
                return;
            }
        };
        // Reject a non-PDF at selection time; the client re-checks before
        // sending anyway.
        if upload::validate(&file).is_err() {
            self.upload_status = Some(UploadStatus::Failed(strings::SELECT_PDF.to_string()));
            return;
        }
        self.selected_pdf = Some(path);
        self.notice = None;
        self.upload_status = Some(UploadStatus::Pending(strings::uploading(&file.file_name())));

        let (tx, rx) = std::sync::mpsc::channel::<Result<String, String>>();
        self.upload_rx = Some(rx);
        info!(target: "tui", "upload: file={} size={}", file.file_name(), file.size);
        std::thread::spawn(move || {
            let rt = match tokio::runtime::Runtime::new() {
                Ok(rt) => rt,
                Err(e) => {
                    let _ = tx.send(Err(format!("runtime: {}", e)));
                    return;
                }
            };
            rt.block_on(async move {
                let cfg = BackendConfig::from_env_and_file();
                let backend = match Backend::new(cfg) {
                    Ok(b) => b,
                    Err(e) => {
                        let _ = tx.send(Err(format!("client: {}", e)));
                        return;
                    }
                };
                match backend.upload_pdf(&file).await {
                    Ok(up) => {
                        let _ = tx.send(Ok(up.filename));
                    }
                    Err(e) => {
                        error!(target: "tui", "upload error: {}", e);
                        let msg = match e {
                            UploadError::InvalidType(_) => strings::SELECT_PDF.to_string(),
                            UploadError::Network(_) => strings::UPLOAD_CONNECT_FAIL.to_string(),
                            UploadError::Server(m) => m,
                            UploadError::Io(m) => m,
                        };
                        let _ = tx.send(Err(msg));
                    }
                }
            });
        });
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        if let KeyEventKind::Press = key.kind {
            match key.code {
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    // Ctrl+C: cancel active stream if any; otherwise quit
                    if self.chat_rx.is_some() {
                        if let Some(cancel) = &self.chat_cancel {
                            cancel.store(true, Ordering::Relaxed);
                        }
                    } else {
                        self.should_quit = true;
                    }
                }
                KeyCode::Esc => self.should_quit = true,
                KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => {
                    self.insert_text("\n");
                    self.dirty = true;
                }
                KeyCode::Enter => self.submit(),
                KeyCode::Up => self.history_prev(),
                KeyCode::Down => self.history_next(),
                KeyCode::Left => {
                    if self.input_cursor > 0 {
                        self.input_cursor -= 1;
                    }
                    self.dirty = true;
                }
                KeyCode::Right => {
                    let l = self.input.graphemes(true).count();
                    if self.input_cursor < l {
                        self.input_cursor += 1;
                    }
                    self.dirty = true;
                }
                KeyCode::Backspace => {
                    self.delete_left_grapheme();
                    self.dirty = true;
                }
                KeyCode::Delete => {
                    self.delete_right_grapheme();
                    self.dirty = true;
                }
                KeyCode::Home => {
                    self.move_cursor_line_start();
                    self.dirty = true;
                }
                KeyCode::End => {
                    self.move_cursor_line_end();
                    self.dirty = true;
                }
                KeyCode::Char('a') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.move_cursor_line_start();
                    self.dirty = true;
                }
                KeyCode::Char('e') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.move_cursor_line_end();
                    self.dirty = true;
                }
                KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.delete_prev_word();
                    self.dirty = true;
                }
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.kill_to_line_start();
                    self.dirty = true;
                }
                KeyCode::Char('k') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    self.kill_to_line_end();
                    self.dirty = true;
                }
                KeyCode::PageUp => self.scroll_up(10),
                KeyCode::PageDown => self.scroll_down(10),
                KeyCode::Char(ch) => {
                    if !key.modifiers.contains(KeyModifiers::CONTROL) {
                        let mut buf = [0u8; 4];
                        self.insert_text(ch.encode_utf8(&mut buf));
                        self.dirty = true;
                    }
                }
                _ => {}
            }
        }
    }

    pub fn scroll_up(&mut self, n: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(n);
        self.stick_to_bottom = false;
        self.dirty = true;
    }

    pub fn scroll_down(&mut self, n: u16) {
        self.chat_scroll = self.chat_scroll.saturating_sub(n);
        if self.chat_scroll == 0 {
            self.stick_to_bottom = true;
        }
        self.dirty = true;
    }

    pub fn on_tick(&mut self) {
        // Drain streamed chat deltas into the transcript tail
        if let Some(rx) = &self.chat_rx {
            for _ in 0..64 {
                match rx.try_recv() {
                    Ok(Ok(chunk)) => {
                        self.transcript.append_reply(&chunk);
                        self.stick_to_bottom = true;
                        self.dirty = true;
                    }
                    Ok(Err(_)) => {
                        // A half-formed answer is worse than an explicit
                        // failure notice; the partial text goes with it.
                        self.transcript.replace_reply(strings::ERROR_REPLY);
                        self.chat_rx = None;
                        self.chat_cancel = None;
                        self.stick_to_bottom = true;
                        self.dirty = true;
                        break;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        // Worker finished: the reply is complete.
                        self.chat_rx = None;
                        self.chat_cancel = None;
                        self.dirty = true;
                        break;
                    }
                }
            }
        }

        // Collect the upload outcome, if one is pending
        if let Some(rx) = &self.upload_rx {
            match rx.try_recv() {
                Ok(Ok(filename)) => {
                    self.upload_status =
                        Some(UploadStatus::Done(strings::upload_success(&filename)));
                    self.selected_pdf = None;
                    // Success notice joins the transcript only while no
                    // stream owns the tail.
                    if self.chat_rx.is_none() {
                        self.transcript.push_assistant(strings::UPLOADED_NOTICE);
                    }
                    self.upload_rx = None;
                    self.stick_to_bottom = true;
                    self.dirty = true;
                }
                Ok(Err(msg)) => {
                    self.upload_status = Some(UploadStatus::Failed(msg));
                    self.upload_rx = None;
                    self.dirty = true;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => {
                    self.upload_rx = None;
                    self.dirty = true;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app_with_stream() -> (App, std::sync::mpsc::Sender<Result<String, String>>) {
        let mut app = App::new();
        app.transcript.push_user("hello");
        app.transcript.begin_reply();
        let (tx, rx) = std::sync::mpsc::channel();
        app.chat_rx = Some(rx);
        (app, tx)
    }

    #[test]
    fn deltas_grow_the_placeholder_reply() {
        let (mut app, tx) = app_with_stream();
        tx.send(Ok("Hel".to_string())).unwrap();
        tx.send(Ok("lo".to_string())).unwrap();
        app.on_tick();
        assert_eq!(app.transcript.last().unwrap().content, "Hello");
        assert!(app.streaming());
    }

    #[test]
    fn a_failed_request_replaces_the_reply_with_the_fixed_notice() {
        let (mut app, tx) = app_with_stream();
        tx.send(Ok("par".to_string())).unwrap();
        app.on_tick();
        tx.send(Err("connection refused".to_string())).unwrap();
        app.on_tick();
        assert_eq!(app.transcript.last().unwrap().content, strings::ERROR_REPLY);
        assert!(!app.streaming());
    }

    #[test]
    fn a_disconnected_worker_completes_the_turn() {
        let (mut app, tx) = app_with_stream();
        tx.send(Ok("done".to_string())).unwrap();
        drop(tx);
        app.on_tick();
        assert_eq!(app.transcript.last().unwrap().content, "done");
        assert!(!app.streaming());
    }
}
