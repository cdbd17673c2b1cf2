use std::collections::{BTreeMap, BTreeSet};

use num::bigint::BigUint;
use secagg_client::{
    crypto::PrivateExponent,
    mask::{embed, Aggregation, MaskConfig, MaskSeed, MaskTensor, Shape, Tensor},
    GroupParameters,
    Inbound,
    MaskingEngine,
    MaskingError,
    Outbound,
    Participant,
    PeerPublicKeys,
    PublicKey,
};

fn shape() -> Shape {
    Shape::new(vec![10, 10])
}

/// A tensor whose values are exactly representable at the default precision.
fn tensor(id: u32) -> Tensor {
    let data = (0..shape().len())
        .map(|i| f64::from(id) * 0.125 - (i % 7) as f64 * 0.5)
        .collect();
    Tensor::new(shape(), data).unwrap()
}

fn engines(ids: &[u32]) -> BTreeMap<u32, MaskingEngine<u32>> {
    ids.iter()
        .map(|id| {
            let engine = MaskingEngine::new(
                GroupParameters::default(),
                MaskConfig::default(),
                shape(),
                tensor(*id),
            )
            .unwrap();
            (*id, engine)
        })
        .collect()
}

fn public_keys(engines: &BTreeMap<u32, MaskingEngine<u32>>) -> PeerPublicKeys<u32> {
    engines
        .iter()
        .map(|(id, engine)| (*id, engine.public_key().clone()))
        .collect()
}

fn without(keys: &PeerPublicKeys<u32>, ids: &[u32]) -> PeerPublicKeys<u32> {
    keys.iter()
        .filter(|(id, _)| !ids.contains(*id))
        .map(|(id, key)| (*id, key.clone()))
        .collect()
}

fn plain_sum(ids: &[u32]) -> Tensor {
    let mut aggregation = Aggregation::new(MaskConfig::default(), shape());
    for id in ids {
        aggregation
            .aggregate(embed(&tensor(*id), MaskConfig::default()))
            .unwrap();
    }
    aggregation.unmask().unwrap()
}

#[test]
fn pairwise_masks_cancel() {
    let ids = [2, 3, 5, 7, 11];
    let mut engines = engines(&ids);
    let keys = public_keys(&engines);

    let mut masked_sum = Aggregation::new(MaskConfig::default(), shape());
    let mut self_masks = Aggregation::new(MaskConfig::default(), shape());
    for (id, engine) in engines.iter_mut() {
        let masked = engine
            .prepare_masked_tensor(without(&keys, &[*id]), *id)
            .unwrap();
        masked_sum.aggregate(masked).unwrap();
        let mut self_mask = embed(engine.tensor(), MaskConfig::default());
        self_mask.add_mask(&engine.private_secret_for_reveal().unwrap().negated());
        self_masks.aggregate(self_mask).unwrap();
    }
    // what remains are the embedded tensors and the self-masks
    assert_eq!(MaskTensor::from(masked_sum), MaskTensor::from(self_masks));
}

#[test]
fn self_mask_reveal_recovers_the_sum() {
    let ids = [1, 2, 3, 4];
    let mut engines = engines(&ids);
    let keys = public_keys(&engines);

    let mut aggregation = Aggregation::new(MaskConfig::default(), shape());
    for (id, engine) in engines.iter_mut() {
        let masked = engine
            .prepare_masked_tensor(without(&keys, &[*id]), *id)
            .unwrap();
        aggregation.aggregate(masked).unwrap();
    }
    for engine in engines.values_mut() {
        aggregation
            .add_reveal(engine.private_secret_for_reveal().unwrap())
            .unwrap();
    }
    assert_eq!(aggregation.unmask().unwrap(), plain_sum(&ids));
}

#[test]
fn masks_cancel_after_reconfiguring_to_a_large_group() {
    // 2^128 + 51
    let modulus = "340282366920938463463374607431768211507"
        .parse::<BigUint>()
        .unwrap();
    let group = GroupParameters::new(BigUint::from(3_u32), modulus).unwrap();
    let ids = [1, 2, 3];
    let mut engines = engines(&ids);
    for engine in engines.values_mut() {
        engine.configure(group.clone()).unwrap();
        assert_eq!(engine.group(), &group);
    }
    let keys = public_keys(&engines);

    let mut aggregation = Aggregation::new(MaskConfig::default(), shape());
    for (id, engine) in engines.iter_mut() {
        let masked = engine
            .prepare_masked_tensor(without(&keys, &[*id]), *id)
            .unwrap();
        aggregation.aggregate(masked).unwrap();
    }
    for engine in engines.values_mut() {
        aggregation
            .add_reveal(engine.private_secret_for_reveal().unwrap())
            .unwrap();
    }
    assert_eq!(aggregation.unmask().unwrap(), plain_sum(&ids));
}

#[test]
fn dropouts_are_recovered_by_partial_reveals() {
    let ids = [1, 2, 3, 4, 5, 6];
    let dropped = [2, 5];
    let mut engines = engines(&ids);
    let keys = public_keys(&engines);
    for id in dropped.iter() {
        engines.remove(id);
    }

    let mut aggregation = Aggregation::new(MaskConfig::default(), shape());
    for (id, engine) in engines.iter_mut() {
        let masked = engine
            .prepare_masked_tensor(without(&keys, &[*id]), *id)
            .unwrap();
        aggregation.aggregate(masked).unwrap();
    }
    for engine in engines.values_mut() {
        aggregation
            .add_reveal(engine.private_secret_for_reveal().unwrap())
            .unwrap();
        aggregation
            .add_reveal(engine.reveal_partial(dropped.iter().cloned()).unwrap())
            .unwrap();
    }
    assert_eq!(aggregation.unmask().unwrap(), plain_sum(&[1, 3, 4, 6]));
}

#[test]
fn masks_are_deterministic_across_engines() {
    let group = GroupParameters::default();
    let secret = || PrivateExponent::new(BigUint::from(4_242_u32));
    let seed = || MaskSeed::new(BigUint::from(99_u32));
    let mut peers = PeerPublicKeys::new();
    peers.insert(1_u32, PublicKey::from(BigUint::from(81_u32)));
    peers.insert(9_u32, PublicKey::from(BigUint::from(27_u32)));

    let masked = (0..2)
        .map(|_| {
            let mut engine = MaskingEngine::with_secrets(
                group.clone(),
                MaskConfig::default(),
                shape(),
                tensor(4),
                secret(),
                seed(),
            )
            .unwrap();
            engine.prepare_masked_tensor(peers.clone(), 4).unwrap()
        })
        .collect::<Vec<_>>();
    assert_eq!(masked[0], masked[1]);
}

#[test]
fn shared_secrets_commute() {
    let engines = engines(&[1, 2, 3]);
    for (i, a) in engines.values().enumerate() {
        for b in engines.values().skip(i + 1) {
            assert_eq!(
                a.shared_secret(b.public_key()).unwrap(),
                b.shared_secret(a.public_key()).unwrap(),
            );
        }
    }
}

#[test]
fn participants_run_a_session() {
    let ids = ["ada", "grace", "hedy"];
    let mut participants = ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let engine = MaskingEngine::new(
                GroupParameters::default(),
                MaskConfig::default(),
                shape(),
                tensor(i as u32),
            )
            .unwrap();
            (id.to_string(), Participant::new(engine))
        })
        .collect::<BTreeMap<_, _>>();

    let mut keys = BTreeMap::new();
    for (id, participant) in participants.iter_mut() {
        match participant.handle(Inbound::AssignIdentifier(id.clone())) {
            Ok(Some(Outbound::PublicKey(key))) => {
                keys.insert(id.clone(), key);
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }

    // the broadcast includes every receiver's own entry
    let mut aggregation = Aggregation::new(MaskConfig::default(), shape());
    for participant in participants.values_mut() {
        match participant.handle(Inbound::PeerPublicKeys(keys.clone())) {
            Ok(Some(Outbound::MaskedTensor(masked))) => aggregation.aggregate(masked).unwrap(),
            other => panic!("unexpected reply: {:?}", other),
        }
    }
    for participant in participants.values_mut() {
        match participant.handle(Inbound::RequestSelfSecret) {
            Ok(Some(Outbound::SelfSecret(secret))) => aggregation.add_reveal(secret).unwrap(),
            other => panic!("unexpected reply: {:?}", other),
        }
        match participant.handle(Inbound::RequestPartialReveal(BTreeSet::new())) {
            Ok(Some(Outbound::PartialRevealSecret(secret))) => {
                aggregation.add_reveal(secret).unwrap()
            }
            other => panic!("unexpected reply: {:?}", other),
        }
    }
    assert_eq!(aggregation.unmask().unwrap(), plain_sum(&[0, 1, 2]));
}

#[test]
fn failed_sessions_stay_invalidated() {
    let mut engines = engines(&[1, 2]);
    let keys = public_keys(&engines);
    let engine = engines.get_mut(&1).unwrap();
    assert!(matches!(
        engine.prepare_masked_tensor(keys.clone(), 1),
        Err(MaskingError::IdentifierConflict(_)),
    ));
    assert!(matches!(
        engine.prepare_masked_tensor(without(&keys, &[1]), 1),
        Err(MaskingError::ProtocolOrderViolation(_)),
    ));
    assert!(matches!(
        engine.private_secret_for_reveal(),
        Err(MaskingError::ProtocolOrderViolation(_)),
    ));
    assert!(matches!(
        engine.reveal_partial(vec![2]),
        Err(MaskingError::ProtocolOrderViolation(_)),
    ));
}
