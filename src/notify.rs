//! User-visible dialogs.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Info,
    Warning,
    Error,
}

/// A dialog shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub text: String,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            text: text.into(),
        }
    }
}

/// Shows notifications and asks for confirmation.
///
/// `confirm` is a suspension point: the caller waits for the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// Ask the user to confirm an action over the listed items.
    async fn confirm(&self, title: &str, items: &[String]) -> bool;

    fn success(&self, title: &str, text: &str) {
        self.notify(Notice::new(NoticeLevel::Success, title, text));
    }

    fn info(&self, title: &str, text: &str) {
        self.notify(Notice::new(NoticeLevel::Info, title, text));
    }

    fn error(&self, title: &str, text: &str) {
        self.notify(Notice::new(NoticeLevel::Error, title, text));
    }
}

/// Renders notices as log lines. Used when no UI is attached.
#[derive(Debug, Clone)]
pub struct TracingNotifier {
    auto_confirm: bool,
}

impl TracingNotifier {
    pub fn new(auto_confirm: bool) -> Self {
        Self { auto_confirm }
    }
}

impl Default for TracingNotifier {
    fn default() -> Self {
        Self::new(true)
    }
}

#[async_trait]
impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success | NoticeLevel::Info => {
                tracing::info!("[{}] {}", notice.title, notice.text)
            }
            NoticeLevel::Warning => tracing::warn!("[{}] {}", notice.title, notice.text),
            NoticeLevel::Error => tracing::error!("[{}] {}", notice.title, notice.text),
        }
    }

    async fn confirm(&self, title: &str, items: &[String]) -> bool {
        tracing::info!(
            "[{}] {} ({})",
            title,
            items.join(", "),
            if self.auto_confirm { "confirmed" } else { "declined" }
        );
        self.auto_confirm
    }
}

/// Records every notice and answers confirmations with a fixed value.
#[derive(Debug)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
    confirmations: Mutex<Vec<(String, Vec<String>)>>,
    answer: AtomicBool,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self {
            notices: Mutex::new(Vec::new()),
            confirmations: Mutex::new(Vec::new()),
            answer: AtomicBool::new(true),
        }
    }

    /// Answer future confirmations with `answer`.
    pub fn answer_confirmations(&self, answer: bool) {
        self.answer.store(answer, Ordering::Relaxed);
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn notices_at(&self, level: NoticeLevel) -> Vec<Notice> {
        self.notices()
            .into_iter()
            .filter(|n| n.level == level)
            .collect()
    }

    /// Every confirmation asked so far, as `(title, items)`.
    pub fn confirmations(&self) -> Vec<(String, Vec<String>)> {
        self.confirmations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for RecordingNotifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }

    async fn confirm(&self, title: &str, items: &[String]) -> bool {
        self.confirmations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((title.to_string(), items.to_vec()));
        self.answer.load(Ordering::Relaxed)
    }
}
