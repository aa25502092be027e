//! The per-call actor.
//!
//! Producers run as independent tasks and report back through one unbounded inbox.
//! The actor drains the inbox sequentially, so the segmenter, controller, playback
//! buffer and mark set only ever see one event at a time.

use std::sync::Arc;

use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::errors::{SessionError, SessionResult};
use super::events::SessionEvent;
use crate::core::interruption::InterruptionCoordinator;
use crate::core::llm::{ReplyEvent, ReplyGenerator, ToolContext};
use crate::core::playback::{AudioChunk, AudioDelivery, AudioSent};
use crate::core::providers::ProviderSet;
use crate::core::stt::{BaseSTT, STTEvent, STTEventCallback};
use crate::core::transcript::{Activity, TranscriptSegmenter, Utterance};
use crate::core::transport::Transport;
use crate::core::tts::BaseTTS;
use crate::core::turn::{Sentence, TurnController, TurnId};

/// Per-call settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub stream_sid: String,
    pub call_sid: String,
    pub system_message: String,
    /// Spoken when the call connects
    pub initial_message: String,
    pub max_tool_rounds: usize,
}

/// Pipeline state owned by the actor task
struct Pipeline {
    segmenter: Arc<TranscriptSegmenter>,
    turns: Arc<TurnController>,
    delivery: Arc<AudioDelivery>,
    interruption: Arc<InterruptionCoordinator>,
}

impl Pipeline {
    async fn handle(&self, event: SessionEvent) {
        match event {
            SessionEvent::Stt(event) => self.segmenter.handle(event).await,
            SessionEvent::Reply { turn, event } => match event {
                ReplyEvent::Fragment(text) => self.turns.push_fragment(turn, &text).await,
                ReplyEvent::Say(text) => self.turns.say(turn, &text).await,
                ReplyEvent::Done => self.turns.finish(turn).await,
                ReplyEvent::Failed(e) => {
                    error!("Reply generation for {} failed: {}", turn, e);
                    self.abandon(turn);
                }
            },
            SessionEvent::Speech(chunk) => {
                if let Err(e) = self.delivery.submit(chunk).await {
                    warn!("Failed to deliver audio: {}", e);
                }
            }
            SessionEvent::SpeechFailed {
                turn,
                sequence_index,
                error,
            } => {
                error!(
                    "Synthesis of {} sentence {:?} failed: {}",
                    turn, sequence_index, error
                );
                self.abandon(turn);
            }
            SessionEvent::MarkAcknowledged(mark) => self.interruption.on_mark_acknowledged(&mark),
            SessionEvent::Stop => {}
        }
    }

    fn abandon(&self, turn: TurnId) {
        self.turns.abandon(turn);
        self.delivery.abandon_turn(turn);
    }
}

/// One active call
pub struct Session {
    stream_sid: String,
    events: mpsc::UnboundedSender<SessionEvent>,
    stt: Arc<RwLock<Box<dyn BaseSTT>>>,
    actor: Option<JoinHandle<()>>,
}

impl Session {
    /// Wire the pipeline, connect the recognizer and start speaking the greeting.
    pub async fn start(
        config: SessionConfig,
        providers: &dyn ProviderSet,
        transport: Arc<dyn Transport>,
    ) -> SessionResult<Self> {
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let segmenter = Arc::new(TranscriptSegmenter::new(config.stream_sid.clone()));
        let turns = Arc::new(TurnController::new());
        let delivery = Arc::new(AudioDelivery::new(transport.clone()));
        let interruption = Arc::new(InterruptionCoordinator::new(
            transport,
            delivery.clone(),
            turns.clone(),
        ));

        let tts = providers.text_to_speech();
        let generator = Arc::new(ReplyGenerator::new(
            providers.completion(),
            providers.tools(),
            config.system_message.clone(),
            config.initial_message.clone(),
            ToolContext {
                call_sid: config.call_sid.clone(),
            },
            config.max_tool_rounds,
        ));

        let pipeline = Pipeline {
            segmenter,
            turns,
            delivery,
            interruption,
        };
        wire(&pipeline, tts.clone(), generator, events_tx.clone());

        let mut stt = providers.speech_to_text()?;
        stt.on_event(stt_callback(events_tx.clone())).await?;
        stt.connect().await?;

        let actor = tokio::spawn(run(events_rx, pipeline));

        if !config.initial_message.trim().is_empty() {
            spawn_synthesis(
                tts,
                events_tx.clone(),
                Sentence {
                    turn: TurnId::GREETING,
                    sequence_index: None,
                    text: config.initial_message.clone(),
                },
            );
        }

        info!(
            "Session started for stream {} (call {})",
            config.stream_sid, config.call_sid
        );

        Ok(Self {
            stream_sid: config.stream_sid,
            events: events_tx,
            stt: Arc::new(RwLock::new(stt)),
            actor: Some(actor),
        })
    }

    pub fn stream_sid(&self) -> &str {
        &self.stream_sid
    }

    /// Hand caller audio to the recognizer without waiting for it to be accepted.
    pub fn feed_audio(&self, audio: Vec<u8>) {
        let stt = self.stt.clone();
        tokio::spawn(async move {
            let mut stt = stt.write().await;
            if let Err(e) = stt.send_audio(audio).await {
                debug!("Dropped caller audio: {}", e);
            }
        });
    }

    pub fn mark_acknowledged(&self, mark: impl Into<String>) -> SessionResult<()> {
        self.send(SessionEvent::MarkAcknowledged(mark.into()))
    }

    /// Queue an event as if a producer had reported it.
    pub fn send(&self, event: SessionEvent) -> SessionResult<()> {
        self.events.send(event).map_err(|_| SessionError::Stopped)
    }

    /// Close the recognizer and wait for the actor to drain.
    pub async fn stop(mut self) -> SessionResult<()> {
        let disconnected = self.stt.write().await.disconnect().await;

        let _ = self.events.send(SessionEvent::Stop);
        if let Some(actor) = self.actor.take()
            && let Err(e) = actor.await
        {
            error!("Session actor for {} panicked: {}", self.stream_sid, e);
        }

        info!("Session stopped for stream {}", self.stream_sid);
        disconnected.map_err(SessionError::from)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.actor.is_some() {
            let _ = self.events.send(SessionEvent::Stop);
        }
    }
}

async fn run(mut events: mpsc::UnboundedReceiver<SessionEvent>, pipeline: Pipeline) {
    while let Some(event) = events.recv().await {
        if matches!(event, SessionEvent::Stop) {
            break;
        }
        pipeline.handle(event).await;
    }
    debug!("Session actor exited");
}

/// Connect the stages' buses. Handlers run inside the actor, so they only do
/// bookkeeping and spawn producer work.
fn wire(
    pipeline: &Pipeline,
    tts: Arc<dyn BaseTTS>,
    generator: Arc<ReplyGenerator>,
    events: mpsc::UnboundedSender<SessionEvent>,
) {
    let interruption = pipeline.interruption.clone();
    let interrupted = generator.clone();
    pipeline
        .segmenter
        .activity()
        .subscribe(move |activity: Activity| {
            let interruption = interruption.clone();
            let generator = interrupted.clone();
            Box::pin(async move {
                match interruption.on_activity(&activity).await {
                    Ok(true) => generator.interrupt(),
                    Ok(false) => {}
                    Err(e) => {
                        // Turn state was reset even though the clear frame failed
                        warn!("Failed to clear transport after barge-in: {}", e);
                        generator.interrupt();
                    }
                }
            })
        });

    let turns = pipeline.turns.clone();
    let delivery = pipeline.delivery.clone();
    let reply_events = events.clone();
    pipeline
        .segmenter
        .utterances()
        .subscribe(move |utterance: Utterance| {
            let turn = turns.begin_turn(&utterance.text);
            delivery.begin_turn(turn);
            generator.begin_turn(turn);
            spawn_reply(generator.clone(), reply_events.clone(), turn, utterance.text);
            Box::pin(async {})
        });

    pipeline
        .turns
        .sentences()
        .subscribe(move |sentence: Sentence| {
            spawn_synthesis(tts.clone(), events.clone(), sentence);
            Box::pin(async {})
        });

    // Weak, since the coordinator itself holds the delivery stage
    let interruption = Arc::downgrade(&pipeline.interruption);
    pipeline
        .delivery
        .audio_sent()
        .subscribe(move |sent: AudioSent| {
            if let Some(interruption) = interruption.upgrade() {
                interruption.on_audio_sent(&sent);
            }
            Box::pin(async {})
        });
}

fn stt_callback(events: mpsc::UnboundedSender<SessionEvent>) -> STTEventCallback {
    Arc::new(move |event: STTEvent| {
        let events = events.clone();
        Box::pin(async move {
            let _ = events.send(SessionEvent::Stt(event));
        })
    })
}

fn spawn_reply(
    generator: Arc<ReplyGenerator>,
    events: mpsc::UnboundedSender<SessionEvent>,
    turn: TurnId,
    utterance: String,
) {
    tokio::spawn(async move {
        generator
            .run_turn(turn, &utterance, |event| {
                let _ = events.send(SessionEvent::Reply { turn, event });
            })
            .await;
    });
}

fn spawn_synthesis(
    tts: Arc<dyn BaseTTS>,
    events: mpsc::UnboundedSender<SessionEvent>,
    sentence: Sentence,
) {
    tokio::spawn(async move {
        let Sentence {
            turn,
            sequence_index,
            text,
        } = sentence;
        debug!("Synthesizing {} sentence {:?}: {}", turn, sequence_index, text);

        let event = match tts.synthesize(&text).await {
            Ok(audio) => SessionEvent::Speech(AudioChunk {
                turn,
                sequence_index,
                payload: audio.to_base64(),
            }),
            Err(e) => SessionEvent::SpeechFailed {
                turn,
                sequence_index,
                error: e.to_string(),
            },
        };
        let _ = events.send(event);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::llm::runner::testing::ScriptedLLM;
    use crate::core::llm::{BaseLLM, CompletionDelta, LLMResult, ToolRegistry};
    use crate::core::stt::{STTConfig, STTError, STTResult};
    use crate::core::transport::testing::{RecordingTransport, Sent};
    use crate::core::tts::{AudioData, TTSError, TTSResult};
    use async_trait::async_trait;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use parking_lot::Mutex;
    use std::time::Duration;

    type CallbackSlot = Arc<Mutex<Option<STTEventCallback>>>;

    struct FakeSTT {
        config: STTConfig,
        slot: CallbackSlot,
        connected: bool,
    }

    #[async_trait]
    impl BaseSTT for FakeSTT {
        fn new(config: STTConfig) -> Result<Self, STTError> {
            Ok(Self {
                config,
                slot: Arc::default(),
                connected: false,
            })
        }

        async fn connect(&mut self) -> Result<(), STTError> {
            self.connected = true;
            Ok(())
        }

        async fn disconnect(&mut self) -> Result<(), STTError> {
            self.connected = false;
            Ok(())
        }

        fn is_ready(&self) -> bool {
            self.connected
        }

        async fn send_audio(&mut self, _audio_data: Vec<u8>) -> Result<(), STTError> {
            Ok(())
        }

        async fn on_event(&mut self, callback: STTEventCallback) -> Result<(), STTError> {
            *self.slot.lock() = Some(callback);
            Ok(())
        }

        fn get_config(&self) -> Option<&STTConfig> {
            Some(&self.config)
        }

        fn get_provider_info(&self) -> &'static str {
            "fake"
        }
    }

    /// Echoes the text as audio; sentences containing "slow" take longer
    struct EchoTTS;

    #[async_trait]
    impl BaseTTS for EchoTTS {
        async fn synthesize(&self, text: &str) -> TTSResult<AudioData> {
            if text.contains("fail") {
                return Err(TTSError::ProviderError("synthesis rejected".to_string()));
            }
            if text.contains("slow") {
                tokio::time::sleep(Duration::from_millis(80)).await;
            }
            Ok(AudioData {
                data: text.as_bytes().to_vec(),
                sample_rate: 8000,
                format: "mulaw".to_string(),
                duration_ms: None,
            })
        }
    }

    struct FakeProviders {
        slot: CallbackSlot,
        llm: Arc<ScriptedLLM>,
    }

    impl ProviderSet for FakeProviders {
        fn speech_to_text(&self) -> Result<Box<dyn BaseSTT>, STTError> {
            Ok(Box::new(FakeSTT {
                config: STTConfig::default(),
                slot: self.slot.clone(),
                connected: false,
            }))
        }

        fn text_to_speech(&self) -> Arc<dyn BaseTTS> {
            Arc::new(EchoTTS)
        }

        fn completion(&self) -> Arc<dyn BaseLLM> {
            self.llm.clone()
        }

        fn tools(&self) -> ToolRegistry {
            ToolRegistry::new()
        }
    }

    struct Harness {
        session: Session,
        transport: Arc<RecordingTransport>,
        slot: CallbackSlot,
    }

    impl Harness {
        async fn start(rounds: Vec<Vec<LLMResult<CompletionDelta>>>) -> Self {
            let slot: CallbackSlot = Arc::default();
            let providers = FakeProviders {
                slot: slot.clone(),
                llm: Arc::new(ScriptedLLM::new(rounds)),
            };
            let transport = Arc::new(RecordingTransport::default());
            let config = SessionConfig {
                stream_sid: "MZ1".to_string(),
                call_sid: "CA1".to_string(),
                system_message: "Be brief.".to_string(),
                initial_message: "Hi there.".to_string(),
                max_tool_rounds: 2,
            };

            let session = Session::start(config, &providers, transport.clone())
                .await
                .unwrap();
            Self {
                session,
                transport,
                slot,
            }
        }

        async fn stt(&self, event: STTEvent) {
            let callback = self.slot.lock().clone().unwrap();
            callback(event).await;
        }

        async fn say(&self, text: &str) {
            self.stt(STTEvent::Transcript(STTResult::new(
                text.to_string(),
                true,
                true,
                0.9,
            )))
            .await;
        }

        async fn wait_for_playbacks(&self, count: usize) -> Vec<String> {
            for _ in 0..200 {
                let playbacks = self.transport.playbacks();
                if playbacks.len() >= count {
                    return playbacks;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            self.transport.playbacks()
        }

        async fn settle(&self) {
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
    }

    fn audio(text: &str) -> String {
        STANDARD.encode(text)
    }

    fn text(t: &str) -> LLMResult<CompletionDelta> {
        Ok(CompletionDelta::Text(t.to_string()))
    }

    #[tokio::test]
    async fn test_greeting_is_played_with_mark() {
        let harness = Harness::start(vec![]).await;

        assert_eq!(harness.wait_for_playbacks(1).await, vec![audio("Hi there.")]);
        assert_eq!(harness.transport.marks().len(), 1);

        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_reply_sentences_play_in_order() {
        let harness = Harness::start(vec![vec![
            text("This is slow"),
            text(" to say. Fast one."),
            text(" Done"),
        ]])
        .await;
        harness.wait_for_playbacks(1).await;

        harness.say("What are your hours?").await;

        let playbacks = harness.wait_for_playbacks(4).await;
        assert_eq!(
            playbacks,
            vec![
                audio("Hi there."),
                audio("This is slow to say."),
                audio("Fast one."),
                audio("Done"),
            ]
        );

        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_barge_in_clears_once() {
        let harness = Harness::start(vec![]).await;
        harness.wait_for_playbacks(1).await;

        let partial = || {
            STTEvent::Transcript(STTResult::new("wait".to_string(), false, false, 0.5))
        };
        harness.stt(partial()).await;
        harness.stt(partial()).await;
        harness.settle().await;

        assert_eq!(harness.transport.clears(), 1);
        assert_eq!(
            harness.transport.sent.lock().last(),
            Some(&Sent::Clear)
        );

        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_acknowledged_audio_is_not_interrupted() {
        let harness = Harness::start(vec![]).await;
        harness.wait_for_playbacks(1).await;

        let mark = harness.transport.marks()[0].clone();
        harness.session.mark_acknowledged(mark).unwrap();
        harness
            .stt(STTEvent::Transcript(STTResult::new(
                "um".to_string(),
                false,
                false,
                0.5,
            )))
            .await;
        harness.settle().await;

        assert_eq!(harness.transport.clears(), 0);
        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_synthesis_abandons_turn_only() {
        let harness = Harness::start(vec![
            vec![text("This will fail. Never heard.")],
            vec![text("Second answer.")],
        ])
        .await;
        harness.wait_for_playbacks(1).await;

        harness.say("First question").await;
        harness.settle().await;
        assert_eq!(harness.transport.playbacks().len(), 1);

        harness.say("Second question").await;
        let playbacks = harness.wait_for_playbacks(2).await;
        assert_eq!(playbacks.last(), Some(&audio("Second answer.")));

        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_generation_failure_keeps_session_alive() {
        let harness = Harness::start(vec![vec![Err(crate::core::llm::LLMError::StreamError(
            "reset".to_string(),
        ))]])
        .await;
        harness.wait_for_playbacks(1).await;

        harness.say("Hello?").await;
        harness.settle().await;

        assert_eq!(harness.transport.playbacks().len(), 1);
        assert!(harness.session.mark_acknowledged("unknown").is_ok());
        harness.session.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_stopped_session_rejects_events() {
        let harness = Harness::start(vec![]).await;
        let sender = harness.session.events.clone();
        harness.session.stop().await.unwrap();

        assert!(sender.send(SessionEvent::Stop).is_err());
    }
}
