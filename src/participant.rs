//! Maps the messages of a coordinator onto the masking engine.
//!
//! See the [crate] documentation since this is a private module anyways.

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
};

use crate::{
    crypto::{GroupParameters, PublicKey},
    engine::{MaskingEngine, MaskingError},
    mask::MaskTensor,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(
    serialize = "Id: Ord + serde::Serialize",
    deserialize = "Id: Ord + serde::Deserialize<'de>"
))]
/// A message from the coordinator to a participant.
pub enum Inbound<Id> {
    /// Installs group parameters before the session starts.
    Configure(GroupParameters),
    /// Assigns the identifier of the participant for this session.
    AssignIdentifier(Id),
    /// Broadcasts the public keys of all participants, possibly including the receiver.
    PeerPublicKeys(BTreeMap<Id, PublicKey>),
    /// Requests the negated self-mask.
    RequestSelfSecret,
    /// Requests the reveal of the pairwise masks applied for dropped peers.
    RequestPartialReveal(BTreeSet<Id>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A message from a participant to the coordinator.
pub enum Outbound {
    PublicKey(PublicKey),
    MaskedTensor(MaskTensor),
    SelfSecret(MaskTensor),
    PartialRevealSecret(MaskTensor),
}

/// A participant of a secure aggregation session.
pub struct Participant<Id> {
    engine: MaskingEngine<Id>,
    id: Option<Id>,
}

impl<Id> Participant<Id>
where
    Id: Ord + Clone + Debug,
{
    /// Creates a participant around a fresh engine.
    pub fn new(engine: MaskingEngine<Id>) -> Self {
        Self { engine, id: None }
    }

    /// Gets the masking engine.
    pub fn engine(&self) -> &MaskingEngine<Id> {
        &self.engine
    }

    /// Gets the identifier of the participant, if it has been assigned already.
    pub fn id(&self) -> Option<&Id> {
        self.id.as_ref()
    }

    /// Handles a message of the coordinator and returns the reply, if any.
    ///
    /// # Errors
    /// Fails if the engine rejects the message. Receiving the peer public keys before an
    /// identifier has been assigned is a [`ProtocolOrderViolation`], an own entry in the
    /// broadcast which doesn't match the own public key is an [`IdentifierConflict`].
    ///
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    /// [`IdentifierConflict`]: MaskingError::IdentifierConflict
    pub fn handle(&mut self, message: Inbound<Id>) -> Result<Option<Outbound>, MaskingError> {
        match message {
            Inbound::Configure(group) => {
                debug!("received group parameters");
                self.engine.configure(group)?;
                Ok(None)
            }
            Inbound::AssignIdentifier(id) => {
                if self.engine.is_masked() || self.engine.is_invalidated() {
                    return Err(MaskingError::ProtocolOrderViolation(
                        "the identifier cannot be changed once the session has started",
                    ));
                }
                info!(?id, "assigned identifier");
                self.id = Some(id);
                Ok(Some(Outbound::PublicKey(self.engine.public_key().clone())))
            }
            Inbound::PeerPublicKeys(mut peers) => {
                let own_id = self.id.clone().ok_or(MaskingError::ProtocolOrderViolation(
                    "peer public keys received before an identifier was assigned",
                ))?;
                if let Some(own_key) = peers.remove(&own_id) {
                    if &own_key != self.engine.public_key() {
                        return Err(MaskingError::IdentifierConflict(format!(
                            "the broadcast assigns a foreign public key to the own identifier {:?}",
                            own_id
                        )));
                    }
                }
                debug!(nb_peers = peers.len(), "received peer public keys");
                let masked = self.engine.prepare_masked_tensor(peers, own_id)?;
                Ok(Some(Outbound::MaskedTensor(masked)))
            }
            Inbound::RequestSelfSecret => {
                debug!("received request for the self secret");
                let secret = self.engine.private_secret_for_reveal()?;
                Ok(Some(Outbound::SelfSecret(secret)))
            }
            Inbound::RequestPartialReveal(peer_ids) => {
                debug!(?peer_ids, "received request for a partial reveal");
                let secret = self.engine.reveal_partial(peer_ids)?;
                Ok(Some(Outbound::PartialRevealSecret(secret)))
            }
        }
    }
}
