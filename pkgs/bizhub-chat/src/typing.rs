//! Typing debouncer - clears typing state after input goes idle

use std::time::Duration;
use tokio::task::JoinHandle;

use crate::realtime::TypingSignal;

/// Publishes `typing=true` on input and `typing=false` once no input has
/// arrived for the idle period
pub struct TypingDebouncer {
    idle: Duration,
    pending: Option<PendingIdle>,
}

/// A scheduled `typing=false` and what it will publish
struct PendingIdle {
    task: JoinHandle<()>,
    signal: TypingSignal,
    conversation_id: String,
}

impl TypingDebouncer {
    pub fn new(idle: Duration) -> Self {
        Self {
            idle,
            pending: None,
        }
    }

    /// Input happened in `conversation_id`
    pub fn on_input(&mut self, signal: TypingSignal, conversation_id: &str) {
        signal.send(true, conversation_id);
        self.cancel();

        let idle = self.idle;
        let timer_signal = signal.clone();
        let timer_conversation = conversation_id.to_string();
        let task = tokio::spawn(async move {
            tokio::time::sleep(idle).await;
            timer_signal.send(false, &timer_conversation);
        });

        self.pending = Some(PendingIdle {
            task,
            signal,
            conversation_id: conversation_id.to_string(),
        });
    }

    /// Publish the scheduled `typing=false` now. No-op when nothing is armed.
    pub fn flush(&mut self) {
        let Some(pending) = self.pending.take() else {
            return;
        };
        if pending.task.is_finished() {
            return;
        }

        pending.task.abort();
        pending.signal.send(false, &pending.conversation_id);
    }

    /// Disarm the idle timer without publishing anything
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }

    /// Whether a `typing=false` is still scheduled
    pub fn is_armed(&self) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|pending| !pending.task.is_finished())
    }
}

impl Default for TypingDebouncer {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

impl Drop for TypingDebouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}
