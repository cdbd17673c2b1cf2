//! # Pairwise-masked secure aggregation: the participant side
//!
//! A group of participants each holds a private tensor, e.g. a local model update. A coordinator
//! should learn the *sum* of all tensors but never an individual contribution, even if it is
//! curious or some participants drop out halfway through a round.
//!
//! The crate implements everything a participant needs for that:
//!
//! - **Key agreement**: every participant holds an ephemeral Diffie-Hellman [`KeyPair`] in a
//!   discrete-log group described by [`GroupParameters`]. Two participants derive the same
//!   [`SharedSecret`] from each other's [`PublicKey`].
//! - **Mask derivation**: a shared secret seeds a ChaCha20 stream which yields a tensor of
//!   elements of a finite group (see the [`mask`] module). Both members of a pair obtain
//!   bit-identical masks.
//! - **Pairwise cancellation**: the member of a pair with the *lower* identifier adds the pair's
//!   mask, the member with the higher identifier subtracts it. Summing all masked tensors cancels
//!   every pairwise mask.
//! - **Self-masking**: each participant additionally adds a mask derived from a private seed. The
//!   coordinator asks for it only after the masked tensor has been submitted.
//! - **Dropout recovery**: if a peer leaves after key agreement, the remaining participants
//!   reveal the signed masks they applied on its behalf, and the coordinator cancels them.
//!
//! The [`MaskingEngine`] carries one participant through one session. The [`Participant`] maps
//! the coordinator's messages onto engine calls; transport and wire format are up to the caller.
//!
//! ```
//! # use std::collections::BTreeMap;
//! # use secagg_client::{
//! #     mask::{Aggregation, MaskConfig, Shape, Tensor},
//! #     GroupParameters,
//! #     MaskingEngine,
//! # };
//! let group = GroupParameters::default();
//! let config = MaskConfig::default();
//! let shape = Shape::new(vec![2, 2]);
//!
//! let mut engines = (1_u32..=3)
//!     .map(|id| {
//!         let tensor = Tensor::filled(shape.clone(), f64::from(id));
//!         let engine = MaskingEngine::new(group.clone(), config, shape.clone(), tensor).unwrap();
//!         (id, engine)
//!     })
//!     .collect::<BTreeMap<_, _>>();
//! let public_keys = engines
//!     .iter()
//!     .map(|(id, engine)| (*id, engine.public_key().clone()))
//!     .collect::<BTreeMap<_, _>>();
//!
//! let mut aggregation = Aggregation::new(config, shape.clone());
//! for (id, engine) in engines.iter_mut() {
//!     let mut peers = public_keys.clone();
//!     peers.remove(id);
//!     aggregation.aggregate(engine.prepare_masked_tensor(peers, *id).unwrap()).unwrap();
//! }
//! for engine in engines.values_mut() {
//!     aggregation.add_reveal(engine.private_secret_for_reveal().unwrap()).unwrap();
//! }
//! assert_eq!(aggregation.unmask().unwrap(), Tensor::filled(shape, 6.0));
//! ```
//!
//! The scheme is honest-but-curious secure at best, and the default group parameters are far too
//! small for anything but demonstrations.

#[macro_use]
extern crate serde;
#[macro_use]
extern crate tracing;

pub mod crypto;
mod engine;
pub mod mask;
mod participant;
pub mod settings;

use std::collections::BTreeMap;

use thiserror::Error;

pub use self::{
    crypto::{GroupParameters, KeyPair, PublicKey, SharedSecret},
    engine::{MaskingEngine, MaskingError},
    participant::{Inbound, Outbound, Participant},
};

#[derive(Error, Debug)]
#[error("initialization failed: insufficient system entropy to generate secrets")]
/// An error related to insufficient system entropy for secrets at program startup.
pub struct InitError;

/// The public values of all other participants of a session, keyed by their identifiers.
pub type PeerPublicKeys<Id> = BTreeMap<Id, PublicKey>;
