use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Public handle for a pro forma request. The token is a bearer secret:
/// it is the only identifier ever shown to the unauthenticated party and
/// must never be written to log output.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct ShareToken(String);

impl ShareToken {
    /// Random 128-bit identifier rendered as 32 lowercase hex characters.
    /// Carries no owner, timestamp, or sequence structure.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}
