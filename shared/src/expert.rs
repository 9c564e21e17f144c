use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::model::ValidationError;

/// How long the "request sent" confirmation stays up before the shell sends
/// `ExpertConfirmationElapsed`.
pub const CONFIRMATION_DISPLAY: Duration = Duration::from_millis(3000);

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExpertSubject {
    #[default]
    DiseaseIdentification,
    FertilizerRecommendation,
    IrrigationAdvice,
    GeneralInquiry,
}

impl ExpertSubject {
    pub const ALL: [Self; 4] = [
        Self::DiseaseIdentification,
        Self::FertilizerRecommendation,
        Self::IrrigationAdvice,
        Self::GeneralInquiry,
    ];

    #[must_use]
    pub const fn label_key(self) -> &'static str {
        match self {
            Self::DiseaseIdentification => "subject_disease",
            Self::FertilizerRecommendation => "subject_fertilizer",
            Self::IrrigationAdvice => "subject_irrigation",
            Self::GeneralInquiry => "subject_general",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpertForm {
    pub subject: ExpertSubject,
    pub description: String,
    pub sent: bool,
    pub error_key: Option<&'static str>,
}

impl ExpertForm {
    /// Nothing leaves the device; a valid submission only flips the form
    /// into its confirmation state.
    pub fn submit(&mut self) -> Result<(), ValidationError> {
        if self.description.trim().is_empty() {
            let error = ValidationError::Required {
                field: "description",
            };
            self.error_key = Some(error.message_key());
            return Err(error);
        }
        self.sent = true;
        self.error_key = None;
        Ok(())
    }

    /// Back to a blank form once the confirmation has been shown.
    pub fn dismiss_confirmation(&mut self) {
        if self.sent {
            *self = Self::default();
        }
    }
}
