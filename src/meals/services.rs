use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::errors::{GenerationError, GenerationResult};
use super::prompt::{build_request, MealRequest};
use super::validate::validate_reply;
use crate::llm::TextGenerator;

/// Which UI action started a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationTrigger {
    Description,
    Selection,
    Fridge,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GenerationOutcome {
    pub id: Uuid,
    pub sequence: u64,
    pub trigger: GenerationTrigger,
    /// A newer generation was issued before this one finished.
    pub stale: bool,
    pub completed_at: OffsetDateTime,
    pub result: GenerationResult,
}

/// Issues sequence numbers and keeps the result of the newest generation.
///
/// Results that finish after a newer request was issued are reported stale
/// and never replace the latest result.
#[derive(Debug, Default)]
pub struct GenerationLedger {
    issued: AtomicU64,
    latest: RwLock<Option<GenerationOutcome>>,
}

impl GenerationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, sequence: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == sequence
    }

    /// Records the outcome; returns it with `stale` set when it was superseded.
    pub async fn complete(
        &self,
        sequence: u64,
        trigger: GenerationTrigger,
        result: GenerationResult,
    ) -> GenerationOutcome {
        let mut latest = self.latest.write().await;
        let outcome = GenerationOutcome {
            id: Uuid::new_v4(),
            sequence,
            trigger,
            stale: !self.is_current(sequence),
            completed_at: OffsetDateTime::now_utc(),
            result,
        };
        if outcome.stale {
            warn!(id = %outcome.id, sequence, newest = self.issued.load(Ordering::SeqCst), "discarding stale generation");
        } else {
            *latest = Some(outcome.clone());
        }
        outcome
    }

    pub async fn latest(&self) -> Option<GenerationOutcome> {
        self.latest.read().await.clone()
    }
}

/// Builds the prompt, calls the generator once and validates the reply.
pub async fn generate_meal(
    generator: &dyn TextGenerator,
    ledger: &GenerationLedger,
    request: &MealRequest,
    trigger: GenerationTrigger,
) -> GenerationOutcome {
    let sequence = ledger.begin();
    let prompt = build_request(request);
    debug!(sequence, ?trigger, user_instruction = %prompt.user_instruction, "generating meal");

    let result = match generator.complete(&prompt).await {
        Ok(raw) => validate_reply(&raw),
        Err(e) => Err(GenerationError::Transport(e.to_string())),
    };

    match &result {
        Ok(plan) => info!(sequence, ?trigger, meal = %plan.name, "meal generated"),
        Err(e) => warn!(sequence, ?trigger, kind = ?e.kind(), detail = e.detail(), "meal generation failed"),
    }

    ledger.complete(sequence, trigger, result).await
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Arc;

    use axum::async_trait;
    use tokio::sync::{Mutex, Notify};

    use super::*;
    use crate::llm::TransportError;
    use crate::meals::errors::ErrorKind;
    use crate::meals::prompt::GenerationRequest;
    use crate::meals::validate::tests::sample_plan;

    /// Replies with canned content and remembers every request it saw.
    pub(crate) struct ScriptedGenerator {
        reply: Result<String, (u16, String)>,
        pub(crate) seen: Mutex<Vec<GenerationRequest>>,
    }

    impl ScriptedGenerator {
        pub(crate) fn replying(content: impl Into<String>) -> Self {
            Self {
                reply: Ok(content.into()),
                seen: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn failing(status: u16, message: &str) -> Self {
            Self {
                reply: Err((status, message.to_string())),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedGenerator {
        async fn complete(&self, request: &GenerationRequest) -> Result<String, TransportError> {
            self.seen.lock().await.push(request.clone());
            match &self.reply {
                Ok(content) => Ok(content.clone()),
                Err((status, message)) => Err(TransportError::Status {
                    status: *status,
                    message: message.clone(),
                }),
            }
        }
    }

    pub(crate) fn valid_reply() -> String {
        serde_json::json!({ "lunch": sample_plan() }).to_string()
    }

    #[tokio::test]
    async fn successful_generation_becomes_latest() {
        let generator = ScriptedGenerator::replying(valid_reply());
        let ledger = GenerationLedger::new();
        let request = MealRequest {
            ingredients: vec!["chicken".into(), "rice".into()],
            ..Default::default()
        };

        let outcome = generate_meal(&generator, &ledger, &request, GenerationTrigger::Selection).await;
        assert_eq!(outcome.sequence, 1);
        assert!(!outcome.stale);
        assert_eq!(outcome.result, Ok(sample_plan()));

        let latest = ledger.latest().await.expect("latest recorded");
        assert_eq!(latest.sequence, 1);

        let seen = generator.seen.lock().await;
        assert_eq!(seen.len(), 1);
        assert!(seen[0].user_instruction.contains("chicken, rice"));
    }

    #[tokio::test]
    async fn transport_failure_is_typed() {
        let generator = ScriptedGenerator::failing(401, "Incorrect API key provided");
        let ledger = GenerationLedger::new();

        let outcome =
            generate_meal(&generator, &ledger, &MealRequest::default(), GenerationTrigger::Description)
                .await;
        let err = outcome.result.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TransportError);
        assert!(err.detail().contains("Incorrect API key provided"));
    }

    #[tokio::test]
    async fn unparseable_reply_is_a_parse_failure() {
        let generator = ScriptedGenerator::replying("Sure! Here is a meal: pasta.");
        let ledger = GenerationLedger::new();
        let outcome =
            generate_meal(&generator, &ledger, &MealRequest::default(), GenerationTrigger::Description)
                .await;
        assert_eq!(outcome.result.unwrap_err().kind(), ErrorKind::ParseError);
    }

    #[tokio::test]
    async fn superseded_result_is_stale_and_not_recorded() {
        let ledger = GenerationLedger::new();
        let first = ledger.begin();
        let second = ledger.begin();
        assert!(!ledger.is_current(first));

        let newer = ledger
            .complete(second, GenerationTrigger::Fridge, Ok(sample_plan()))
            .await;
        assert!(!newer.stale);

        let older = ledger
            .complete(first, GenerationTrigger::Description, Err(GenerationError::Empty("x".into())))
            .await;
        assert!(older.stale);

        let latest = ledger.latest().await.unwrap();
        assert_eq!(latest.sequence, second);
        assert_eq!(latest.result, Ok(sample_plan()));
    }

    /// Holds its reply until released so two generations can overlap.
    struct GatedGenerator {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl TextGenerator for GatedGenerator {
        async fn complete(&self, _request: &GenerationRequest) -> Result<String, TransportError> {
            self.gate.notified().await;
            Ok("{}".to_string())
        }
    }

    #[tokio::test]
    async fn late_reply_does_not_overwrite_newer_result() {
        let ledger = Arc::new(GenerationLedger::new());
        let gate = Arc::new(Notify::new());
        let slow = Arc::new(GatedGenerator { gate: gate.clone() });

        let slow_task = {
            let ledger = ledger.clone();
            let slow = slow.clone();
            tokio::spawn(async move {
                generate_meal(slow.as_ref(), &ledger, &MealRequest::default(), GenerationTrigger::Description)
                    .await
            })
        };
        while ledger.issued.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let fast = ScriptedGenerator::replying(valid_reply());
        let newer = generate_meal(&fast, &ledger, &MealRequest::default(), GenerationTrigger::Selection).await;
        assert_eq!(newer.sequence, 2);
        assert!(!newer.stale);

        gate.notify_one();
        let older = slow_task.await.unwrap();
        assert_eq!(older.sequence, 1);
        assert!(older.stale);

        assert_eq!(ledger.latest().await.unwrap().sequence, 2);
    }
}
