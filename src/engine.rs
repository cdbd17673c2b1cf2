//! The masking engine of a participant.
//!
//! See the [crate] documentation for an overview of the protocol.

use std::{
    cmp::Ordering,
    collections::{BTreeMap, BTreeSet},
    fmt::Debug,
};

use num::bigint::BigUint;
use thiserror::Error;

use crate::{
    crypto::{GroupParameters, InvalidGroupError, KeyPair, PrivateExponent, PublicKey, SharedSecret},
    mask::{
        embed,
        seed::derive_mask,
        InvalidMaskConfigError,
        MaskConfig,
        MaskSeed,
        MaskTensor,
        Shape,
        Tensor,
    },
    InitError,
    PeerPublicKeys,
};

#[derive(Debug, Error)]
/// Errors of the masking engine.
pub enum MaskingError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("protocol order violation: {0}")]
    ProtocolOrderViolation(&'static str),

    #[error("identifier conflict: {0}")]
    IdentifierConflict(String),

    #[error("shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: Shape, actual: Shape },

    #[error("the public key of peer {0} is not an element of the group")]
    InvalidPeerKey(String),

    #[error("peer {0} is not part of the session")]
    UnknownPeer(String),

    #[error(transparent)]
    Init(#[from] InitError),
}

impl From<InvalidGroupError> for MaskingError {
    fn from(error: InvalidGroupError) -> Self {
        Self::InvalidConfiguration(error.to_string())
    }
}

impl From<InvalidMaskConfigError> for MaskingError {
    fn from(error: InvalidMaskConfigError) -> Self {
        Self::InvalidConfiguration(error.to_string())
    }
}

const INVALIDATED: &str = "the session has been invalidated by an earlier error";

/// The state which exists once the masked tensor has been prepared.
struct MaskedSession<Id> {
    own_id: Id,
    secrets: BTreeMap<Id, SharedSecret>,
    self_secret_revealed: bool,
}

/// The session state of an engine.
///
/// It only ever moves forward: `Ready` -> `Masked`, and any failed session operation moves it to
/// `Invalidated`.
enum Session<Id> {
    Ready,
    Masked(MaskedSession<Id>),
    Invalidated,
}

/// The masking engine of a single participant for a single session.
///
/// It owns the ephemeral key pair and the self-mask seed, masks the local tensor with pairwise
/// and self masks and produces reveal material on request. The operations must be called in
/// protocol order:
///
/// 1. [`configure()`] (optional, before the session starts)
/// 2. [`public_key()`]
/// 3. [`prepare_masked_tensor()`], exactly once
/// 4. [`private_secret_for_reveal()`] at most once, and [`reveal_partial()`]
///
/// Any failure of a session operation invalidates the session. The engine then refuses all
/// further session operations, and a fresh engine with a fresh key pair and self-mask seed is
/// required.
///
/// Revealed values follow one sign convention: the coordinator *adds* them to its aggregate.
///
/// [`configure()`]: MaskingEngine::configure
/// [`public_key()`]: MaskingEngine::public_key
/// [`prepare_masked_tensor()`]: MaskingEngine::prepare_masked_tensor
/// [`private_secret_for_reveal()`]: MaskingEngine::private_secret_for_reveal
/// [`reveal_partial()`]: MaskingEngine::reveal_partial
pub struct MaskingEngine<Id> {
    group: GroupParameters,
    config: MaskConfig,
    shape: Shape,
    tensor: Tensor,
    keys: KeyPair,
    self_mask_seed: MaskSeed,
    session: Session<Id>,
}

impl<Id> MaskingEngine<Id>
where
    Id: Ord + Clone + Debug,
{
    /// Creates an engine with a fresh key pair and self-mask seed.
    ///
    /// The `shape` is the shape of all masks of the session. It is checked against the shape of
    /// the `tensor` only when the tensor is masked.
    ///
    /// # Errors
    /// Fails if the group parameters or the masking configuration are invalid or if there is
    /// insufficient system entropy to generate secrets.
    pub fn new(
        group: GroupParameters,
        config: MaskConfig,
        shape: Shape,
        tensor: Tensor,
    ) -> Result<Self, MaskingError> {
        // crucial: init must be called before drawing any secrets
        sodiumoxide::init().or(Err(InitError))?;
        group.validate()?;
        config.check()?;
        let keys = KeyPair::generate(&group);
        let self_mask_seed = MaskSeed::generate(&group);
        debug!(public_key = %keys.public, %shape, "created masking engine");
        Ok(Self {
            group,
            config,
            shape,
            tensor,
            keys,
            self_mask_seed,
            session: Session::Ready,
        })
    }

    /// Creates an engine with a known private exponent and self-mask seed.
    ///
    /// # Errors
    /// Fails if the group parameters or the masking configuration are invalid or if the private
    /// exponent is not less than the modulus.
    pub fn with_secrets(
        group: GroupParameters,
        config: MaskConfig,
        shape: Shape,
        tensor: Tensor,
        secret: PrivateExponent,
        self_mask_seed: MaskSeed,
    ) -> Result<Self, MaskingError> {
        group.validate()?;
        config.check()?;
        if !secret.is_valid(&group) {
            return Err(MaskingError::InvalidConfiguration(
                "the private exponent must be less than the modulus".into(),
            ));
        }
        Ok(Self {
            keys: KeyPair::from_secret(&group, secret),
            group,
            config,
            shape,
            tensor,
            self_mask_seed,
            session: Session::Ready,
        })
    }

    /// Installs the group parameters and recomputes the public key.
    ///
    /// The private exponent and the self-mask seed are kept, only the public key `g^x mod p` is
    /// recomputed in the new group. Configuring identical parameters again is a no-op.
    ///
    /// # Errors
    /// Fails with [`InvalidConfiguration`] unless `modulus > generator > 1`, and with
    /// [`ProtocolOrderViolation`] once the session has started. The engine is left untouched on
    /// failure.
    ///
    /// [`InvalidConfiguration`]: MaskingError::InvalidConfiguration
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    pub fn configure(&mut self, group: GroupParameters) -> Result<(), MaskingError> {
        group.validate()?;
        match self.session {
            Session::Ready => {}
            Session::Masked(_) => {
                return Err(MaskingError::ProtocolOrderViolation(
                    "the group cannot be changed once the session has started",
                ))
            }
            Session::Invalidated => return Err(MaskingError::ProtocolOrderViolation(INVALIDATED)),
        }
        if group == self.group {
            debug!("group parameters unchanged");
            return Ok(());
        }
        self.keys.public = self.keys.secret.public_key(&group);
        self.group = group;
        info!(public_key = %self.keys.public, "configured new group parameters");
        Ok(())
    }

    /// Replaces the local tensor and the shape of the session.
    ///
    /// # Errors
    /// Fails with [`ProtocolOrderViolation`] once the session has started.
    ///
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    pub fn set_tensor(&mut self, tensor: Tensor, shape: Shape) -> Result<(), MaskingError> {
        match self.session {
            Session::Ready => {
                debug!(%shape, "replaced local tensor");
                self.tensor = tensor;
                self.shape = shape;
                Ok(())
            }
            Session::Masked(_) => Err(MaskingError::ProtocolOrderViolation(
                "the tensor cannot be changed once it has been masked",
            )),
            Session::Invalidated => Err(MaskingError::ProtocolOrderViolation(INVALIDATED)),
        }
    }

    /// Gets the public key of this participant.
    pub fn public_key(&self) -> &PublicKey {
        &self.keys.public
    }

    /// Gets the group parameters.
    pub fn group(&self) -> &GroupParameters {
        &self.group
    }

    /// Gets the masking configuration.
    pub fn config(&self) -> MaskConfig {
        self.config
    }

    /// Gets the shape of the session.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Gets the local tensor.
    pub fn tensor(&self) -> &Tensor {
        &self.tensor
    }

    /// Checks whether the masked tensor has been prepared in this session.
    pub fn is_masked(&self) -> bool {
        matches!(self.session, Session::Masked(_))
    }

    /// Checks whether the session has been invalidated by an error.
    pub fn is_invalidated(&self) -> bool {
        matches!(self.session, Session::Invalidated)
    }

    /// Computes the secret shared with the owner of the public key `peer`.
    ///
    /// # Errors
    /// Fails if the public key is not a non-zero residue of the group.
    pub fn shared_secret(&self, peer: &PublicKey) -> Result<SharedSecret, MaskingError> {
        self.keys
            .secret
            .agree(&self.group, peer)
            .ok_or_else(|| MaskingError::InvalidPeerKey(peer.to_string()))
    }

    /// Derives the mask of an integer `seed` in the shape of the session.
    pub fn derive_mask(&self, seed: &BigUint) -> MaskTensor {
        derive_mask(seed, &self.shape, self.config)
    }

    /// Masks the local tensor.
    ///
    /// The masked tensor is the embedded local tensor plus the self-mask plus, for every peer
    /// `j`, the mask seeded by the secret shared with `j`. That mask is added if `j` is greater
    /// than `own_id` and subtracted if it is less, so the pairwise masks cancel when the masked
    /// tensors of all participants are summed. The peer secrets and `own_id` are kept for later
    /// reveals.
    ///
    /// # Errors
    /// Fails with
    /// - [`ProtocolOrderViolation`] if the tensor has already been masked in this session,
    /// - [`ShapeMismatch`] if the local tensor doesn't have the shape of the session,
    /// - [`IdentifierConflict`] if a peer has the identifier `own_id`,
    /// - [`InvalidPeerKey`] if a peer's public key is not an element of the group.
    ///
    /// Any failure invalidates the session.
    ///
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    /// [`ShapeMismatch`]: MaskingError::ShapeMismatch
    /// [`IdentifierConflict`]: MaskingError::IdentifierConflict
    /// [`InvalidPeerKey`]: MaskingError::InvalidPeerKey
    pub fn prepare_masked_tensor(
        &mut self,
        peer_public_keys: PeerPublicKeys<Id>,
        own_id: Id,
    ) -> Result<MaskTensor, MaskingError> {
        let result = self.try_prepare_masked_tensor(peer_public_keys, own_id);
        let (masked, session) = self.invalidate_on_error(result)?;
        info!(
            own_id = ?session.own_id,
            nb_peers = session.secrets.len(),
            "prepared masked tensor"
        );
        self.session = Session::Masked(session);
        Ok(masked)
    }

    fn try_prepare_masked_tensor(
        &self,
        peer_public_keys: PeerPublicKeys<Id>,
        own_id: Id,
    ) -> Result<(MaskTensor, MaskedSession<Id>), MaskingError> {
        match self.session {
            Session::Ready => {}
            Session::Masked(_) => {
                return Err(MaskingError::ProtocolOrderViolation(
                    "the masked tensor has already been prepared in this session",
                ))
            }
            Session::Invalidated => return Err(MaskingError::ProtocolOrderViolation(INVALIDATED)),
        }
        if self.tensor.shape() != &self.shape || self.tensor.data().len() != self.shape.len() {
            return Err(MaskingError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: self.tensor.shape().clone(),
            });
        }
        if peer_public_keys.is_empty() {
            warn!("no peers: the masked tensor is only protected by the self-mask");
        }

        let mut masked = embed(&self.tensor, self.config);
        let mut secrets = BTreeMap::new();
        for (peer_id, peer_key) in peer_public_keys {
            let ordering = Self::order_peer(&peer_id, &own_id)?;
            let secret = self
                .keys
                .secret
                .agree(&self.group, &peer_key)
                .ok_or_else(|| MaskingError::InvalidPeerKey(format!("{:?}", peer_id)))?;
            let mask = self.derive_mask(secret.value());
            match ordering {
                Ordering::Greater => masked.add_mask(&mask),
                _ => masked.subtract_mask(&mask),
            }
            secrets.insert(peer_id, secret);
        }
        masked.add_mask(&self.self_mask());

        let session = MaskedSession {
            own_id,
            secrets,
            self_secret_revealed: false,
        };
        Ok((masked, session))
    }

    /// Gets the negated self-mask.
    ///
    /// The coordinator adds it to the aggregate to cancel this participant's self-mask. It must
    /// only be requested after the masked tensor has been submitted.
    ///
    /// # Errors
    /// Fails with [`ProtocolOrderViolation`] before the tensor has been masked or if the
    /// self-mask has already been revealed in this session. Any failure invalidates the session.
    ///
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    pub fn private_secret_for_reveal(&mut self) -> Result<MaskTensor, MaskingError> {
        let result = match &mut self.session {
            Session::Masked(session) if !session.self_secret_revealed => {
                session.self_secret_revealed = true;
                Ok(())
            }
            Session::Masked(_) => Err(MaskingError::ProtocolOrderViolation(
                "the self-mask has already been revealed in this session",
            )),
            Session::Ready => Err(MaskingError::ProtocolOrderViolation(
                "the self-mask cannot be revealed before the tensor has been masked",
            )),
            Session::Invalidated => Err(MaskingError::ProtocolOrderViolation(INVALIDATED)),
        };
        self.invalidate_on_error(result)?;
        info!("revealed self-mask");
        Ok(self.self_mask().negated())
    }

    /// Reveals the signed pairwise masks this participant applied for the given peers.
    ///
    /// For every peer `k` in `peer_ids` the pairwise mask is recomputed from the stored shared
    /// secret with the same sign as in [`prepare_masked_tensor()`]. The negated sum is returned,
    /// so the coordinator cancels the masks of dropped peers by adding it to the aggregate.
    /// Duplicate identifiers count once.
    ///
    /// # Errors
    /// Fails with
    /// - [`ProtocolOrderViolation`] before the tensor has been masked,
    /// - [`IdentifierConflict`] if `peer_ids` contains this participant's own identifier,
    /// - [`UnknownPeer`] if an identifier was not a peer when the tensor was masked.
    ///
    /// Any failure invalidates the session.
    ///
    /// [`prepare_masked_tensor()`]: MaskingEngine::prepare_masked_tensor
    /// [`ProtocolOrderViolation`]: MaskingError::ProtocolOrderViolation
    /// [`IdentifierConflict`]: MaskingError::IdentifierConflict
    /// [`UnknownPeer`]: MaskingError::UnknownPeer
    pub fn reveal_partial<I>(&mut self, peer_ids: I) -> Result<MaskTensor, MaskingError>
    where
        I: IntoIterator<Item = Id>,
    {
        let peer_ids = peer_ids.into_iter().collect::<BTreeSet<_>>();
        let result = self.try_reveal_partial(&peer_ids);
        let reveal = self.invalidate_on_error(result)?;
        info!(nb_peers = peer_ids.len(), "revealed pairwise masks");
        Ok(reveal)
    }

    fn try_reveal_partial(&self, peer_ids: &BTreeSet<Id>) -> Result<MaskTensor, MaskingError> {
        let session = match &self.session {
            Session::Masked(session) => session,
            Session::Ready => {
                return Err(MaskingError::ProtocolOrderViolation(
                    "masks cannot be revealed before the tensor has been masked",
                ))
            }
            Session::Invalidated => return Err(MaskingError::ProtocolOrderViolation(INVALIDATED)),
        };

        let mut applied = MaskTensor::zeros(self.config, self.shape.clone());
        for peer_id in peer_ids {
            let ordering = Self::order_peer(peer_id, &session.own_id)?;
            let secret = session
                .secrets
                .get(peer_id)
                .ok_or_else(|| MaskingError::UnknownPeer(format!("{:?}", peer_id)))?;
            let mask = self.derive_mask(secret.value());
            match ordering {
                Ordering::Greater => applied.add_mask(&mask),
                _ => applied.subtract_mask(&mask),
            }
        }
        Ok(applied.negated())
    }

    /// Compares a peer identifier with the own one. Ties are a protocol error.
    fn order_peer(peer_id: &Id, own_id: &Id) -> Result<Ordering, MaskingError> {
        match peer_id.cmp(own_id) {
            Ordering::Equal => Err(MaskingError::IdentifierConflict(format!(
                "peer identifier {:?} equals the own identifier",
                peer_id
            ))),
            ordering => Ok(ordering),
        }
    }

    fn self_mask(&self) -> MaskTensor {
        self.self_mask_seed.derive_mask(&self.shape, self.config)
    }

    fn invalidate_on_error<T>(
        &mut self,
        result: Result<T, MaskingError>,
    ) -> Result<T, MaskingError> {
        if let Err(error) = &result {
            warn!("invalidating session: {}", error);
            self.session = Session::Invalidated;
        }
        result
    }
}
