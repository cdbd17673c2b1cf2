use std::{
    collections::{BTreeMap, BTreeSet},
    convert::TryFrom,
    path::PathBuf,
};

use anyhow::{anyhow, bail, ensure, Context};
use secagg_client::{
    mask::{Aggregation, MaskConfig, MaskTensor, Shape, Tensor},
    settings::Settings,
    GroupParameters,
    Inbound,
    MaskingEngine,
    Outbound,
    Participant,
};
use structopt::StructOpt;
use tracing_subscriber::*;

#[macro_use]
extern crate tracing;

#[derive(Debug, StructOpt)]
#[structopt(name = "test-drive")]
/// Runs a secure aggregation session with in-process participants.
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,

    /// Number of participants
    #[structopt(short, default_value = "5")]
    participants: u32,

    /// Number of participants which drop out after the key exchange
    #[structopt(short, default_value = "1")]
    dropouts: u32,

    /// The value every participant fills its tensor with
    #[structopt(short, default_value = "3.0")]
    value: f64,
}

fn tensor_of(reply: Option<Outbound>) -> anyhow::Result<MaskTensor> {
    match reply {
        Some(Outbound::MaskedTensor(tensor))
        | Some(Outbound::SelfSecret(tensor))
        | Some(Outbound::PartialRevealSecret(tensor)) => Ok(tensor),
        other => bail!("expected a tensor, got {:?}", other),
    }
}

fn main() -> anyhow::Result<()> {
    let opt = Opt::from_args();
    ensure!(opt.participants >= 2, "at least two participants are required");
    ensure!(
        opt.dropouts < opt.participants,
        "at least one participant must survive"
    );

    let Settings { group, mask, log } =
        Settings::new(&opt.config_path).context("failed to load the settings")?;
    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(log.filter)
        .with_ansi(true)
        .init();

    let group = GroupParameters::try_from(group)?;
    let config = MaskConfig::from(mask);
    let shape = Shape::new(vec![10, 10]);

    let mut participants = BTreeMap::new();
    for id in 1..=opt.participants {
        let tensor = Tensor::new(shape.clone(), vec![opt.value; shape.len()])?;
        let engine = MaskingEngine::new(group.clone(), config, shape.clone(), tensor)?;
        participants.insert(id, Participant::new(engine));
    }

    // key exchange
    let mut public_keys = BTreeMap::new();
    for (id, participant) in participants.iter_mut() {
        participant.handle(Inbound::Configure(group.clone()))?;
        match participant.handle(Inbound::AssignIdentifier(*id))? {
            Some(Outbound::PublicKey(public_key)) => {
                public_keys.insert(*id, public_key);
            }
            other => bail!("expected a public key, got {:?}", other),
        }
    }
    info!("collected {} public keys", public_keys.len());

    // the participants with the highest identifiers leave after the key exchange
    let dropped = (opt.participants - opt.dropouts + 1..=opt.participants).collect::<BTreeSet<_>>();
    participants.retain(|id, _| !dropped.contains(id));
    info!(?dropped, "participants dropped out");

    let mut aggregation = Aggregation::new(config, shape);
    for participant in participants.values_mut() {
        let reply = participant.handle(Inbound::PeerPublicKeys(public_keys.clone()))?;
        aggregation.aggregate(tensor_of(reply)?)?;
    }
    info!("aggregated {} masked tensors", aggregation.nb_tensors());

    for participant in participants.values_mut() {
        let reply = participant.handle(Inbound::RequestSelfSecret)?;
        aggregation.add_reveal(tensor_of(reply)?)?;
        if !dropped.is_empty() {
            let reply = participant.handle(Inbound::RequestPartialReveal(dropped.clone()))?;
            aggregation.add_reveal(tensor_of(reply)?)?;
        }
    }

    let nb_survivors = aggregation.nb_tensors();
    let sum = aggregation.unmask()?;
    let first = sum
        .data()
        .first()
        .copied()
        .ok_or_else(|| anyhow!("the aggregated tensor is empty"))?;
    println!(
        "{} of {} participants completed the session, the sum is {} in every entry (expected {})",
        nb_survivors,
        opt.participants,
        first,
        opt.value * nb_survivors as f64,
    );

    Ok(())
}
