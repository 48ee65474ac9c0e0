use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, FromRequest, Multipart, Request, State};
use axum::http::{header::CONTENT_TYPE, StatusCode};
use axum::{routing::post, Json, Router};
use sarthi_core::domain::reply::ReplyOrigin;
use sarthi_core::errors::{ApplicationError, InterfaceError};
use sarthi_core::pipeline::Orchestrator;
use sarthi_core::providers::Transcriber;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::delivery::ReplyDelivery;

#[derive(Clone)]
pub struct WebhookState {
    pub orchestrator: Arc<Orchestrator>,
    pub delivery: Arc<dyn ReplyDelivery>,
    pub transcriber: Arc<dyn Transcriber>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct InboundMessage {
    #[serde(default)]
    pub from_number: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<String>,
}

/// Multipart voice message: `from_number`, optional `location`, and the
/// recording under `audio`.
#[derive(Clone, Debug, Default)]
pub struct VoiceNote {
    pub from_number: String,
    pub location: Option<String>,
    pub audio: Option<Bytes>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookReply {
    pub ok: bool,
    pub answer: String,
    pub origin: ReplyOrigin,
    /// Present for voice notes only; empty when transcription failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WebhookRejection {
    pub ok: bool,
    pub error: &'static str,
    pub correlation_id: String,
}

type Rejection = (StatusCode, Json<WebhookRejection>);

pub fn router(state: WebhookState, max_body_bytes: usize) -> Router {
    Router::new()
        .route("/webhook", post(receive))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .with_state(state)
}

/// JSON bodies carry text messages, multipart bodies carry voice notes.
pub async fn receive(
    State(state): State<WebhookState>,
    request: Request,
) -> Result<Json<WebhookReply>, Rejection> {
    let content_type = request
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let Json(inbound) = Json::<InboundMessage>::from_request(request, &())
            .await
            .map_err(|rejection| invalid(rejection.body_text()))?;
        answer_text(&state, inbound).await
    } else if content_type.starts_with("multipart/form-data") {
        let multipart = Multipart::from_request(request, &())
            .await
            .map_err(|rejection| invalid(rejection.body_text()))?;
        let note = read_voice_note(multipart).await?;
        answer_voice(&state, note).await
    } else {
        Err(invalid(format!("unsupported content type `{content_type}`")))
    }
}

pub async fn answer_text(
    state: &WebhookState,
    inbound: InboundMessage,
) -> Result<Json<WebhookReply>, Rejection> {
    let from_number = require_sender(&inbound.from_number)?;
    let location = inbound.location.as_deref().unwrap_or_default();
    let (answer, origin) = answer(state, from_number, &inbound.message, location).await;
    Ok(Json(WebhookReply { ok: true, answer, origin, transcript: None }))
}

/// A failed or missing transcription still gets an answer: the pipeline runs
/// on empty text and settles on the static fallback.
pub async fn answer_voice(
    state: &WebhookState,
    note: VoiceNote,
) -> Result<Json<WebhookReply>, Rejection> {
    let from_number = require_sender(&note.from_number)?;

    let transcript = match note.audio.as_deref() {
        Some(audio) if !audio.is_empty() => match state.transcriber.transcribe(audio).await {
            Ok(text) => text,
            Err(error) => {
                warn!(
                    event_name = "webhook.transcription.failed",
                    transcriber = state.transcriber.name(),
                    error_class = error.0.class(),
                    error = %error,
                    "voice note could not be transcribed"
                );
                String::new()
            }
        },
        _ => String::new(),
    };

    let location = note.location.as_deref().unwrap_or_default();
    let (answer, origin) = answer(state, from_number, &transcript, location).await;
    Ok(Json(WebhookReply { ok: true, answer, origin, transcript: Some(transcript) }))
}

async fn answer(
    state: &WebhookState,
    from_number: &str,
    text: &str,
    location: &str,
) -> (String, ReplyOrigin) {
    let run = state.orchestrator.run(text, location).await;

    if let Err(error) = state.delivery.deliver(from_number, &run.reply).await {
        warn!(
            event_name = "webhook.delivery.failed",
            correlation_id = %run.correlation_id,
            delivery = state.delivery.name(),
            error = %error,
            "reply could not be delivered to the gateway"
        );
    }

    info!(
        event_name = "webhook.message.answered",
        correlation_id = %run.correlation_id,
        origin = %run.reply.origin,
        "webhook message answered"
    );

    (run.reply.text, run.reply.origin)
}

async fn read_voice_note(mut multipart: Multipart) -> Result<VoiceNote, Rejection> {
    let mut note = VoiceNote::default();
    while let Some(field) =
        multipart.next_field().await.map_err(|error| invalid(error.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        match name.as_str() {
            "from_number" => {
                note.from_number = field.text().await.map_err(|error| invalid(error.body_text()))?
            }
            "location" => {
                let location = field.text().await.map_err(|error| invalid(error.body_text()))?;
                note.location = Some(location);
            }
            "audio" => {
                note.audio =
                    Some(field.bytes().await.map_err(|error| invalid(error.body_text()))?);
            }
            _ => {}
        }
    }
    Ok(note)
}

fn require_sender(from_number: &str) -> Result<&str, Rejection> {
    match from_number.trim() {
        "" => Err(invalid("from_number is required")),
        trimmed => Ok(trimmed),
    }
}

fn invalid(detail: impl Into<String>) -> Rejection {
    reject(
        ApplicationError::InvalidMessage(detail.into()).into_interface(Uuid::new_v4().to_string()),
    )
}

fn reject(error: InterfaceError) -> Rejection {
    let status = match &error {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!(
        event_name = "webhook.message.rejected",
        correlation_id = %error.correlation_id(),
        error = %error,
        "webhook message rejected"
    );
    (
        status,
        Json(WebhookRejection {
            ok: false,
            error: error.user_message(),
            correlation_id: error.correlation_id().to_string(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use axum::Json;
    use sarthi_agent::{DisabledGenerativeFallback, DisabledTranscriber};
    use sarthi_core::compose::STATIC_FALLBACK_MESSAGE;
    use sarthi_core::domain::knowledge::KnowledgeEntry;
    use sarthi_core::domain::price::PriceQuote;
    use sarthi_core::domain::query::{Crop, Topic};
    use sarthi_core::domain::reply::{Reply, ReplyOrigin};
    use sarthi_core::domain::weather::WeatherSnapshot;
    use sarthi_core::errors::{
        PriceUnavailable, ProviderError, TranscriptionUnavailable, WeatherUnavailable,
    };
    use sarthi_core::intent::{KeywordIntentExtractor, KeywordTable};
    use sarthi_core::knowledge::InMemoryKnowledgeStore;
    use sarthi_core::pipeline::{Orchestrator, PipelineSettings};
    use sarthi_core::providers::{MarketPriceProvider, Transcriber, WeatherProvider};
    use serde_json::Value;
    use tower::ServiceExt;

    use super::{answer_text, router, InboundMessage, WebhookState};
    use crate::delivery::{DeliveryError, ReplyDelivery};

    const BOUNDARY: &str = "sarthi-test-boundary";

    struct OfflineWeather;

    #[async_trait]
    impl WeatherProvider for OfflineWeather {
        async fn fetch(&self, _location: &str) -> Result<WeatherSnapshot, WeatherUnavailable> {
            Err(WeatherUnavailable(ProviderError::Network("offline".to_string())))
        }
    }

    struct OfflineMarket;

    #[async_trait]
    impl MarketPriceProvider for OfflineMarket {
        async fn fetch(&self, _crop: Crop) -> Result<PriceQuote, PriceUnavailable> {
            Err(PriceUnavailable::Exhausted {
                primary: ProviderError::Status(503),
                secondary: ProviderError::NotConfigured("none".to_string()),
            })
        }
    }

    #[derive(Default)]
    struct RecordingDelivery {
        fail: bool,
        sent: Mutex<Vec<(String, Reply)>>,
    }

    #[async_trait]
    impl ReplyDelivery for RecordingDelivery {
        fn name(&self) -> &'static str {
            "recording"
        }

        async fn deliver(&self, to_number: &str, reply: &Reply) -> Result<(), DeliveryError> {
            if self.fail {
                return Err(DeliveryError::Rejected(502));
            }
            self.sent.lock().expect("delivery log").push((to_number.to_string(), reply.clone()));
            Ok(())
        }
    }

    struct ScriptedTranscriber {
        transcript: Result<&'static str, ProviderError>,
        calls: AtomicUsize,
    }

    impl ScriptedTranscriber {
        fn hearing(transcript: &'static str) -> Arc<Self> {
            Arc::new(Self { transcript: Ok(transcript), calls: AtomicUsize::new(0) })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                transcript: Err(ProviderError::Network("connection refused".to_string())),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl Transcriber for ScriptedTranscriber {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn transcribe(&self, audio: &[u8]) -> Result<String, TranscriptionUnavailable> {
            assert!(!audio.is_empty());
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.transcript.clone().map(str::to_string).map_err(TranscriptionUnavailable)
        }
    }

    fn state_with(
        delivery: Arc<RecordingDelivery>,
        transcriber: Arc<dyn Transcriber>,
    ) -> WebhookState {
        let knowledge = InMemoryKnowledgeStore::from_entries(vec![KnowledgeEntry::new(
            Crop::Mustard,
            Topic::Irrigation,
            "पहली सिंचाई बुवाई के 30-35 दिन बाद करें।",
        )])
        .expect("knowledge");
        let orchestrator = Orchestrator::new(
            Arc::new(KeywordIntentExtractor::new(KeywordTable::bilingual_default())),
            Arc::new(knowledge),
            Arc::new(OfflineWeather),
            Arc::new(OfflineMarket),
            Arc::new(DisabledGenerativeFallback),
            PipelineSettings::default(),
        );
        WebhookState { orchestrator: Arc::new(orchestrator), delivery, transcriber }
    }

    fn state(delivery: Arc<RecordingDelivery>) -> WebhookState {
        state_with(delivery, Arc::new(DisabledTranscriber))
    }

    fn inbound(from_number: &str, message: &str) -> InboundMessage {
        InboundMessage {
            from_number: from_number.to_string(),
            message: message.to_string(),
            location: None,
        }
    }

    fn multipart_body(fields: &[(&str, &[u8])]) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"").as_bytes(),
            );
            if *name == "audio" {
                body.extend_from_slice(b"; filename=\"note.ogg\"\r\nContent-Type: audio/ogg");
            }
            body.extend_from_slice(b"\r\n\r\n");
            body.extend_from_slice(value);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post(state: WebhookState, content_type: &str, body: Vec<u8>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/webhook")
            .header(CONTENT_TYPE, content_type)
            .body(Body::from(body))
            .expect("request");
        let response = router(state, 1024 * 1024).oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.expect("body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    async fn post_voice(state: WebhookState, fields: &[(&str, &[u8])]) -> (StatusCode, Value) {
        post(state, &format!("multipart/form-data; boundary={BOUNDARY}"), multipart_body(fields))
            .await
    }

    #[tokio::test]
    async fn knowledge_answer_is_returned_and_delivered() {
        let delivery = Arc::new(RecordingDelivery::default());

        let Json(reply) =
            answer_text(&state(delivery.clone()), inbound("+919812345678", "सरसों के लिए सिंचाई?"))
                .await
                .expect("answered");

        assert!(reply.ok);
        assert_eq!(reply.origin, ReplyOrigin::Knowledge);
        assert!(reply.answer.contains("30-35"));
        assert_eq!(reply.transcript, None);

        let sent = delivery.sent.lock().expect("delivery log");
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "+919812345678");
        assert_eq!(sent[0].1.text, reply.answer);
    }

    #[tokio::test]
    async fn blank_sender_is_rejected_with_safe_message() {
        let delivery = Arc::new(RecordingDelivery::default());

        let (status, Json(rejection)) =
            answer_text(&state(delivery.clone()), inbound("   ", "सरसों के लिए सिंचाई?"))
                .await
                .expect_err("blank sender");

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(!rejection.ok);
        assert!(!rejection.error.contains("from_number"));
        assert!(!rejection.correlation_id.is_empty());
        assert!(delivery.sent.lock().expect("delivery log").is_empty());
    }

    #[tokio::test]
    async fn empty_message_still_gets_a_reply() {
        let Json(reply) = answer_text(&state(Arc::new(RecordingDelivery::default())), inbound("+91", ""))
            .await
            .expect("answered");

        assert_eq!(reply.origin, ReplyOrigin::StaticFallback);
        assert_eq!(reply.answer, STATIC_FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_fail_the_request() {
        let delivery = Arc::new(RecordingDelivery { fail: true, ..RecordingDelivery::default() });

        let Json(reply) = answer_text(&state(delivery), inbound("+91", "गेहूं का भाव"))
            .await
            .expect("answered despite gateway error");

        assert!(reply.ok);
        assert_eq!(reply.origin, ReplyOrigin::StaticFallback);
    }

    #[tokio::test]
    async fn json_body_is_routed_as_text_message() {
        let body = serde_json::to_vec(&serde_json::json!({
            "from_number": "+919812345678",
            "message": "सरसों के लिए सिंचाई?",
            "location": "Jaipur, Rajasthan"
        }))
        .expect("json");

        let (status, reply) =
            post(state(Arc::new(RecordingDelivery::default())), "application/json", body).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["origin"], "knowledge");
        assert!(reply.get("transcript").is_none());
    }

    #[tokio::test]
    async fn voice_note_is_transcribed_and_answered() {
        let delivery = Arc::new(RecordingDelivery::default());
        let transcriber = ScriptedTranscriber::hearing("सरसों के लिए सिंचाई?");

        let (status, reply) = post_voice(
            state_with(delivery.clone(), transcriber.clone()),
            &[("from_number", b"+919812345678"), ("location", b"Chomu"), ("audio", b"OggS voice")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["ok"], true);
        assert_eq!(reply["origin"], "knowledge");
        assert_eq!(reply["transcript"], "सरसों के लिए सिंचाई?");
        assert!(reply["answer"].as_str().unwrap_or_default().contains("30-35"));
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
        assert_eq!(delivery.sent.lock().expect("delivery log")[0].0, "+919812345678");
    }

    #[tokio::test]
    async fn failed_transcription_answers_with_static_fallback() {
        let transcriber = ScriptedTranscriber::failing();

        let (status, reply) = post_voice(
            state_with(Arc::new(RecordingDelivery::default()), transcriber.clone()),
            &[("from_number", b"+91"), ("audio", b"OggS voice")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["origin"], "static_fallback");
        assert_eq!(reply["answer"], STATIC_FALLBACK_MESSAGE);
        assert_eq!(reply["transcript"], "");
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn voice_note_without_audio_skips_transcription() {
        let transcriber = ScriptedTranscriber::hearing("unused");

        let (status, reply) = post_voice(
            state_with(Arc::new(RecordingDelivery::default()), transcriber.clone()),
            &[("from_number", b"+91")],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(reply["origin"], "static_fallback");
        assert_eq!(reply["transcript"], "");
        assert_eq!(transcriber.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn voice_note_without_sender_is_rejected() {
        let (status, reply) = post_voice(
            state_with(Arc::new(RecordingDelivery::default()), ScriptedTranscriber::hearing("x")),
            &[("audio", b"OggS voice")],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["ok"], false);
    }

    #[tokio::test]
    async fn unsupported_content_type_is_rejected() {
        let (status, reply) = post(
            state(Arc::new(RecordingDelivery::default())),
            "text/plain",
            b"sarson sinchai".to_vec(),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(reply["ok"], false);
        assert!(reply["correlation_id"].as_str().is_some_and(|id| !id.is_empty()));
    }
}
