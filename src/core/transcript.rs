//! Transcript segmentation.
//!
//! Turns the provider's interim/final results into two signals: [`Activity`] for every
//! non-empty interim result (the barge-in trigger) and one [`Utterance`] per spoken turn.

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::core::events::EventBus;
use crate::core::stt::{STTEvent, STTResult};

/// Caller speech detected before the utterance is final
#[derive(Debug, Clone, PartialEq)]
pub struct Activity {
    pub text: String,
    pub stream_sid: String,
}

/// A completed caller utterance
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
}

#[derive(Debug, Default)]
struct OpenUtterance {
    buffer: String,
    finalized: bool,
}

pub struct TranscriptSegmenter {
    stream_sid: String,
    utterance: Mutex<OpenUtterance>,
    activity: EventBus<Activity>,
    utterances: EventBus<Utterance>,
}

impl TranscriptSegmenter {
    pub fn new(stream_sid: impl Into<String>) -> Self {
        Self {
            stream_sid: stream_sid.into(),
            utterance: Mutex::new(OpenUtterance::default()),
            activity: EventBus::new(),
            utterances: EventBus::new(),
        }
    }

    pub fn activity(&self) -> &EventBus<Activity> {
        &self.activity
    }

    pub fn utterances(&self) -> &EventBus<Utterance> {
        &self.utterances
    }

    pub async fn handle(&self, event: STTEvent) {
        match event {
            STTEvent::Transcript(STTResult {
                transcript,
                is_final: true,
                is_speech_final,
                ..
            }) => self.on_final(&transcript, is_speech_final).await,
            STTEvent::Transcript(result) => self.on_partial(&result.transcript).await,
            STTEvent::UtteranceEnd => self.on_utterance_end().await,
        }
    }

    pub async fn on_partial(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }

        self.activity
            .emit(Activity {
                text: text.to_string(),
                stream_sid: self.stream_sid.clone(),
            })
            .await;
    }

    pub async fn on_final(&self, text: &str, is_endpoint_final: bool) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }

        let completed = {
            let mut utterance = self.utterance.lock();
            utterance.buffer.push(' ');
            utterance.buffer.push_str(text);
            utterance.finalized = is_endpoint_final;

            is_endpoint_final.then(|| std::mem::take(&mut utterance.buffer))
        };

        match completed {
            Some(text) => {
                info!("Utterance complete: {}", text.trim());
                self.utterances.emit(Utterance { text }).await;
            }
            None => debug!("Utterance still open: {}", text),
        }
    }

    /// Provider gave up waiting for a speech-final result; flush whatever is buffered.
    pub async fn on_utterance_end(&self) {
        let pending = {
            let mut utterance = self.utterance.lock();
            if utterance.finalized || utterance.buffer.is_empty() {
                None
            } else {
                utterance.finalized = true;
                Some(std::mem::take(&mut utterance.buffer))
            }
        };

        match pending {
            Some(text) => {
                info!("Utterance end flushed: {}", text.trim());
                self.utterances.emit(Utterance { text }).await;
            }
            None => debug!("Utterance end with nothing pending"),
        }
    }

    pub fn pending_text(&self) -> String {
        self.utterance.lock().buffer.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn collect(segmenter: &TranscriptSegmenter) -> (Arc<Mutex<Vec<Activity>>>, Arc<Mutex<Vec<String>>>) {
        let activity = Arc::new(Mutex::new(Vec::new()));
        let utterances = Arc::new(Mutex::new(Vec::new()));

        let sink = activity.clone();
        segmenter.activity().subscribe(move |event| {
            let sink = sink.clone();
            Box::pin(async move { sink.lock().push(event) })
        });

        let sink = utterances.clone();
        segmenter.utterances().subscribe(move |event| {
            let sink = sink.clone();
            Box::pin(async move { sink.lock().push(event.text) })
        });

        (activity, utterances)
    }

    #[tokio::test]
    async fn test_finals_join_across_pause() {
        let segmenter = TranscriptSegmenter::new("MZ123");
        let (_, utterances) = collect(&segmenter);

        segmenter.on_final("I need help", false).await;
        assert!(utterances.lock().is_empty());

        segmenter.on_final(" with my order.", true).await;

        assert_eq!(*utterances.lock(), vec![" I need help with my order."]);
        assert!(segmenter.pending_text().is_empty());
    }

    #[tokio::test]
    async fn test_partial_emits_activity_with_stream_sid() {
        let segmenter = TranscriptSegmenter::new("MZ123");
        let (activity, utterances) = collect(&segmenter);

        segmenter
            .handle(STTEvent::Transcript(STTResult::new(
                "wait".to_string(),
                false,
                false,
                0.8,
            )))
            .await;
        segmenter.on_partial("   ").await;

        assert_eq!(
            *activity.lock(),
            vec![Activity {
                text: "wait".to_string(),
                stream_sid: "MZ123".to_string()
            }]
        );
        assert!(utterances.lock().is_empty());
    }

    #[tokio::test]
    async fn test_utterance_end_flushes_open_buffer_once() {
        let segmenter = TranscriptSegmenter::new("MZ123");
        let (_, utterances) = collect(&segmenter);

        segmenter.on_final("cancel my subscription", false).await;
        segmenter.handle(STTEvent::UtteranceEnd).await;
        segmenter.handle(STTEvent::UtteranceEnd).await;

        assert_eq!(*utterances.lock(), vec![" cancel my subscription"]);
    }

    #[tokio::test]
    async fn test_utterance_end_with_nothing_pending_is_silent() {
        let segmenter = TranscriptSegmenter::new("MZ123");
        let (_, utterances) = collect(&segmenter);

        segmenter.on_utterance_end().await;
        segmenter.on_final("Yes.", true).await;
        segmenter.on_utterance_end().await;

        assert_eq!(*utterances.lock(), vec![" Yes."]);
    }

    #[tokio::test]
    async fn test_empty_final_is_ignored() {
        let segmenter = TranscriptSegmenter::new("MZ123");
        let (_, utterances) = collect(&segmenter);

        segmenter.on_final("", true).await;
        assert!(utterances.lock().is_empty());
        assert!(segmenter.pending_text().is_empty());
    }
}
