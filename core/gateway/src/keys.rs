//! Weighted key selection.

use bifrost_error::BifrostError;
use bifrost_protocol::Key;
use bifrost_protocol::Provider;
use bifrost_protocol::RequestContext;
use rand::Rng;
use serde_json::Value;

/// Context key under which a governance plugin may place a key-id
/// allow-list (JSON array of key ids) restricting selection.
pub const KEY_ALLOW_LIST_KEY: &str = "allowed-key-ids";

/// Select one key for the given model.
///
/// Eligible keys are enabled, admit the model (empty allow-list admits
/// all), and pass the optional id allow-list. Selection is weighted-random
/// over the eligible set: p(k) = weight(k) / Σ weight. Keys with weight 0
/// are only drawn when every eligible key has weight 0, in which case the
/// draw is uniform. No sticky affinity between requests.
pub fn select_key<'a>(
    provider: &Provider,
    model: &str,
    keys: &'a [Key],
    allowed_ids: Option<&[String]>,
) -> Result<&'a Key, BifrostError> {
    let eligible: Vec<&Key> = keys
        .iter()
        .filter(|key| key.enabled)
        .filter(|key| key.supports_model(model))
        .filter(|key| allowed_ids.is_none_or(|ids| ids.iter().any(|id| *id == key.id)))
        .collect();

    if eligible.is_empty() {
        return Err(BifrostError::no_eligible_key(provider.as_str(), model));
    }

    let total: u64 = eligible.iter().map(|key| u64::from(key.weight)).sum();
    let mut rng = rand::rng();

    if total == 0 {
        let index = rng.random_range(0..eligible.len());
        return Ok(eligible[index]);
    }

    let mut draw = rng.random_range(0..total);
    for key in &eligible {
        let weight = u64::from(key.weight);
        if draw < weight {
            return Ok(key);
        }
        draw -= weight;
    }
    // Unreachable: draw < total and the weights sum to total.
    Ok(eligible[eligible.len() - 1])
}

/// Read the governance key allow-list from the request context, if set.
pub fn allowed_ids_from_context(ctx: &RequestContext) -> Option<Vec<String>> {
    match ctx.value(KEY_ALLOW_LIST_KEY) {
        Some(Value::Array(entries)) => Some(
            entries
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
#[path = "keys.test.rs"]
mod tests;
