use std::time::Duration;

use tokio::runtime::Handle;

use crate::calibration::ActuatorTarget;

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("actuator returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("HTTP actuator needs a running tokio runtime")]
    NoRuntime,
}

/// Receives targets for the device. `dispatch` must not block the caller.
pub trait ActuatorSink: Send + Sync {
    fn dispatch(&self, target: ActuatorTarget);
}

/// Posts targets as JSON to an HTTP endpoint, one spawned task per target.
#[derive(Clone, Debug)]
pub struct HttpActuator {
    client: reqwest::Client,
    endpoint: String,
    runtime: Handle,
}

impl HttpActuator {
    /// Must be called from within a tokio runtime; sends are spawned onto it.
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let runtime = Handle::try_current().map_err(|_| TransportError::NoRuntime)?;
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            runtime,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Post one target and return the response body.
    pub async fn send(&self, target: ActuatorTarget) -> Result<String, TransportError> {
        let response = self.client.post(&self.endpoint).json(&target).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl ActuatorSink for HttpActuator {
    fn dispatch(&self, target: ActuatorTarget) {
        let actuator = self.clone();
        self.runtime.spawn(async move {
            match actuator.send(target).await {
                Ok(body) => log::debug!("actuator accepted {target:?}: {}", body.trim()),
                Err(err) => log::warn!("actuator send to {} failed: {err}", actuator.endpoint),
            }
        });
    }
}

/// Logs targets instead of sending them.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogActuator;

impl ActuatorSink for LogActuator {
    fn dispatch(&self, target: ActuatorTarget) {
        log::info!(
            "dry run: servo1={} servo2={} servo3={}",
            target.servo1,
            target.servo2,
            target.servo3
        );
    }
}
