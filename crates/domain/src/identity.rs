use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PractitionerIdentity {
    pub practitioner_id: String,
    pub display_name: String,
}

impl PractitionerIdentity {
    pub fn with_practitioner_id(practitioner_id: impl Into<String>) -> Self {
        let practitioner_id = practitioner_id.into();
        Self {
            practitioner_id: practitioner_id.clone(),
            display_name: practitioner_id,
        }
    }
}
