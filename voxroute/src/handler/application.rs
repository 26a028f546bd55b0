use serde::Deserialize;
use voxroute_core::{CalloutError, HandlerId};

/// Platform credentials of a voice application.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationConfig {
    /// Application key.
    #[serde(default)]
    pub application_key: String,
    /// Application secret.
    #[serde(default)]
    pub application_secret: String,
}

/// The coordinating instance callbacks are routed through.
///
/// Its presence marks the process as serving voice callbacks; outgoing calls
/// borrow its credentials.
#[derive(Debug)]
pub struct Application {
    id: HandlerId,
    config: ApplicationConfig,
}

impl Application {
    /// Create an application instance.
    pub fn new(id: impl Into<HandlerId>, config: ApplicationConfig) -> Self {
        Self {
            id: id.into(),
            config,
        }
    }

    /// Instance identity.
    pub fn id(&self) -> &HandlerId {
        &self.id
    }

    /// Credentials for signing platform requests.
    pub fn credentials(&self) -> Result<&ApplicationConfig, CalloutError> {
        if self.config.application_key.is_empty() || self.config.application_secret.is_empty() {
            return Err(CalloutError::MissingCredentials);
        }
        Ok(&self.config)
    }
}
