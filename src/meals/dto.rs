use serde::Serialize;
use time::OffsetDateTime;
use uuid::Uuid;

use super::errors::ErrorKind;
use super::services::{GenerationOutcome, GenerationTrigger};
use super::types::MealPlan;

#[derive(Debug, Serialize)]
pub struct GenerationResponse {
    pub id: Uuid,
    pub sequence: u64,
    pub trigger: GenerationTrigger,
    pub stale: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub completed_at: OffsetDateTime,
    #[serde(flatten)]
    pub body: GenerationBody,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationBody {
    Success { meal: MealPlan },
    Failure { kind: ErrorKind, message: String },
}

impl From<GenerationOutcome> for GenerationResponse {
    fn from(o: GenerationOutcome) -> Self {
        let body = match o.result {
            Ok(meal) => GenerationBody::Success { meal },
            Err(e) => GenerationBody::Failure {
                kind: e.kind(),
                message: e.to_string(),
            },
        };
        Self {
            id: o.id,
            sequence: o.sequence,
            trigger: o.trigger,
            stale: o.stale,
            completed_at: o.completed_at,
            body,
        }
    }
}

impl GenerationResponse {
    pub fn is_success(&self) -> bool {
        matches!(self.body, GenerationBody::Success { .. })
    }
}
