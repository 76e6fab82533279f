use crate::core::gate::{AdmissionGate, AdmissionOutcome};
use crate::domain::model::{MealSlot, StudentId};
use crate::domain::ports::{Clock, Identification, Identifier, RecordStore, SystemClock};
use crate::utils::error::{AdmitError, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::time::timeout;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum CaptureOutcome {
    Unrecognized,
    Decided {
        student_id: StudentId,
        outcome: AdmissionOutcome,
    },
}

/// One attendance terminal: identifies the captured face, then asks the
/// shared gate for an admission decision.
pub struct Kiosk<I: Identifier, S: RecordStore, C: Clock = SystemClock> {
    name: String,
    identifier: I,
    gate: Arc<AdmissionGate<S, C>>,
}

impl<I: Identifier, S: RecordStore, C: Clock> Kiosk<I, S, C> {
    pub fn new(name: impl Into<String>, identifier: I, gate: Arc<AdmissionGate<S, C>>) -> Self {
        Self {
            name: name.into(),
            identifier,
            gate,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub async fn capture(&self, image: &[u8], slot: Option<MealSlot>) -> Result<CaptureOutcome> {
        if image.is_empty() {
            return Err(AdmitError::RecognitionFailed {
                message: "captured image is empty".to_string(),
            });
        }

        let limit = self.gate.policy().operation_timeout;
        let identification = timeout(limit, self.identifier.identify(image))
            .await
            .map_err(|_| AdmitError::RecognitionFailed {
                message: format!("no result within {:?}", limit),
            })??;

        let student_id = match identification {
            Identification::Match(id) => id,
            Identification::NoMatch => {
                tracing::info!(kiosk = %self.name, "No matching student for capture");
                return Ok(CaptureOutcome::Unrecognized);
            }
        };

        tracing::debug!(kiosk = %self.name, student_id = %student_id, "Capture identified");
        let outcome = self.gate.admit(&student_id, slot).await?;
        Ok(CaptureOutcome::Decided {
            student_id,
            outcome,
        })
    }
}
