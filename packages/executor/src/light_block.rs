//! Light client blocks: a signed header and the validator set that signed it.

use prost::Message;
use tendermint::{block::signed_header::SignedHeader, validator};
use tendermint_proto::v0_38::types::{
    LightBlock as RawLightBlock, SignedHeader as RawSignedHeader, ValidatorSet as RawValidatorSet,
};

use crate::{channel::StatusChannel, error::NodeError};

/// Picks the validator with the highest proposer priority. Among equal
/// priorities the lowest address wins.
#[must_use]
pub fn select_proposer(validators: &[validator::Info]) -> Option<validator::Info> {
    validators
        .iter()
        .max_by(|a, b| {
            a.proposer_priority
                .value()
                .cmp(&b.proposer_priority.value())
                .then_with(|| b.address.cmp(&a.address))
        })
        .cloned()
}

/// Queries the validators and the commit at `height` concurrently and
/// returns the protobuf encoded `tendermint.types.LightBlock`.
///
/// # Errors
/// Returns the first failing query's error. Nothing is returned partially.
#[tracing::instrument(skip(status), level = "debug")]
pub async fn build_light_block<S: StatusChannel + ?Sized>(
    status: &S,
    height: u64,
) -> Result<Vec<u8>, NodeError> {
    let (validators, signed_header) = tokio::try_join!(
        status.validators_at(Some(height)),
        status.signed_header_at(height)
    )?;

    let infos: Vec<validator::Info> = validators.into_iter().map(|v| v.info).collect();
    let proposer = select_proposer(&infos);
    let validator_set = validator::Set::new(infos, proposer);

    Ok(encode(signed_header, validator_set))
}

/// Encodes a signed header and validator set as a `tendermint.types.LightBlock`.
#[must_use]
pub fn encode(signed_header: SignedHeader, validator_set: validator::Set) -> Vec<u8> {
    RawLightBlock {
        signed_header: Some(RawSignedHeader::from(signed_header)),
        validator_set: Some(RawValidatorSet::from(validator_set)),
    }
    .encode_to_vec()
}

/// Decodes bytes produced by [`build_light_block`].
///
/// # Errors
/// Returns [`NodeError::Decode`] when the bytes are not a complete, valid
/// light block.
pub fn decode_light_block(bytes: &[u8]) -> Result<(SignedHeader, validator::Set), NodeError> {
    let raw = RawLightBlock::decode(bytes)?;
    let signed_header = raw
        .signed_header
        .ok_or_else(|| NodeError::Decode("light block without signed header".to_string()))?;
    let validator_set = raw
        .validator_set
        .ok_or_else(|| NodeError::Decode("light block without validator set".to_string()))?;

    Ok((
        SignedHeader::try_from(signed_header).map_err(|e| NodeError::Decode(e.to_string()))?,
        validator::Set::try_from(validator_set).map_err(|e| NodeError::Decode(e.to_string()))?,
    ))
}
