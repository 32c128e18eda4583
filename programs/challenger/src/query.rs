//! One-shot queries behind `challenger query`.

use anyhow::Result;
use challenger_executor::{Account, Executor, QueryChannel, StatusChannel, ValidatorRecord};
use serde_json::{json, Value};

use crate::cli::query::QueryTarget;

/// Runs `target` against the active node and returns what should be printed.
///
/// # Errors
/// Returns the node's error; nothing is retried except the height query.
pub async fn run<S: StatusChannel, Q: QueryChannel>(
    executor: &Executor<S, Q>,
    target: &QueryTarget,
) -> Result<String> {
    let output = match target {
        QueryTarget::Height => executor.latest_block_height_with_retry().await?.to_string(),
        QueryTarget::Block { height } => {
            serde_json::to_string_pretty(&executor.block_at_height(*height).await?)?
        }
        QueryTarget::LightBlock { height } => hex::encode(executor.light_block_bytes(*height).await?),
        QueryTarget::Validators { height: Some(height) } => {
            render_validators(&executor.validators_at_height(*height).await?)
        }
        QueryTarget::Validators { height: None } => {
            render_validators(&executor.cached_latest_validators().await?)
        }
        QueryTarget::Account { address } => render_account(&executor.account(address).await?),
    };
    Ok(output)
}

fn validator_json(validator: &ValidatorRecord) -> Value {
    json!({
        "address": validator.info.address.to_string(),
        "voting_power": validator.info.power.value(),
        "proposer_priority": validator.info.proposer_priority.value(),
        "bls_key": hex::encode(&validator.bls_key),
    })
}

/// Pretty JSON array of validators with hex encoded BLS keys.
#[must_use]
pub fn render_validators(validators: &[ValidatorRecord]) -> String {
    let entries: Vec<Value> = validators.iter().map(validator_json).collect();
    format!("{:#}", Value::Array(entries))
}

/// Pretty JSON of the fields common to every account type.
#[must_use]
pub fn render_account(account: &Account) -> String {
    let kind = match account {
        Account::Base(_) => "base",
        Account::Module(_) => "module",
    };
    format!(
        "{:#}",
        json!({
            "type": kind,
            "address": account.address(),
            "account_number": account.account_number(),
            "sequence": account.sequence(),
        })
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use challenger_executor::account::AccountRegistry;

    #[test]
    fn account_is_rendered_as_json() {
        let registry = AccountRegistry::default();
        // field 1 (address) = "0xab", field 3 (account_number) = 4, field 4 (sequence) = 9
        let bytes = [0x0a, 0x04, b'0', b'x', b'a', b'b', 0x18, 0x04, 0x20, 0x09];
        let account = registry
            .decode(challenger_executor::account::BASE_ACCOUNT_TYPE_URL, &bytes)
            .unwrap();

        let rendered: Value = serde_json::from_str(&render_account(&account)).unwrap();
        assert_eq!(
            rendered,
            json!({"type": "base", "address": "0xab", "account_number": 4, "sequence": 9})
        );
    }

    #[test]
    fn empty_validator_set_renders_empty_array() {
        assert_eq!(render_validators(&[]), "[]");
    }
}
