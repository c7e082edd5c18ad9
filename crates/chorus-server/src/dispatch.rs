//! Routes decoded messages to registry operations.

use std::sync::Arc;

use tracing::{debug, instrument};

use crate::errors::DispatchError;
use crate::ids::ClientId;
use crate::protocol::{Inbound, Outbound};
use crate::registry::SessionRegistry;

/// Maps each inbound message type to its registry operation and reply.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<SessionRegistry>,
}

impl Dispatcher {
    /// Dispatch against `registry`.
    pub fn new(registry: Arc<SessionRegistry>) -> Self {
        Self { registry }
    }

    /// The registry messages act on.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Handle one text frame from `client_id`.
    ///
    /// Returns the reply to send back, if the message type has one.
    #[instrument(skip_all, fields(kind))]
    pub async fn dispatch(
        &self,
        client_id: &ClientId,
        text: &str,
    ) -> Result<Option<Outbound>, DispatchError> {
        let inbound: Inbound = serde_json::from_str(text).map_err(DispatchError::Decode)?;
        let _ = tracing::Span::current().record("kind", inbound.kind());
        debug!(client_id = %client_id, "dispatching message");

        let reply = match inbound {
            Inbound::PlaySignalOscillator(params) => {
                let _ = self.registry.start_sound(client_id, params).await;
                None
            }
            Inbound::StopAudio => {
                let _ = self.registry.stop_sound(client_id);
                None
            }
            Inbound::GetAllPlayingSounds => Some(Outbound::ActiveSounds {
                data: self.registry.snapshot_all(),
            }),
            Inbound::GetOtherClientsActions => Some(Outbound::OtherClientsActions {
                data: self.registry.snapshot_excluding(client_id),
            }),
            Inbound::Unknown => {
                debug!(client_id = %client_id, "ignoring unknown message type");
                None
            }
        };
        Ok(reply)
    }
}
