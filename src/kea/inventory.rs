use serde_json::Value;

use crate::error::{ProvisionError, Result};
use crate::models::{result_code, ExistingSubnet};
use crate::utils::Ipv4Cidr;

use super::client::KeaClient;
use super::commands;

/// Current subnets on the server.
/// An empty server answers subnet4-list with result 3, which is not a failure here.
pub async fn list_subnets(client: &KeaClient) -> Result<Vec<ExistingSubnet>> {
    let envelope = commands::subnet4_list();
    let first = client
        .invoke(&envelope)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| ProvisionError::Transport("empty response to subnet4-list".to_string()))?;

    match first.result {
        result_code::SUCCESS => Ok(subnets_from_arguments(first.argument("subnets"))),
        result_code::EMPTY => Ok(Vec::new()),
        code => Err(ProvisionError::Command {
            command: envelope.command,
            result: code,
            text: first.text,
        }),
    }
}

/// Project the untyped `subnets` argument, skipping entries that lack an id or subnet
pub fn subnets_from_arguments(subnets: Option<&Value>) -> Vec<ExistingSubnet> {
    let Some(entries) = subnets.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let id = entry
                .get("id")
                .and_then(Value::as_u64)
                .and_then(|id| u32::try_from(id).ok())
                .filter(|id| *id > 0);
            let subnet = entry.get("subnet").and_then(Value::as_str);
            match (id, subnet) {
                (Some(id), Some(subnet)) => Some(ExistingSubnet {
                    id,
                    subnet: subnet.to_string(),
                }),
                _ => {
                    tracing::debug!("Skipping malformed subnet entry: {}", entry);
                    None
                }
            }
        })
        .collect()
}

/// Smallest positive ID not in `existing`, whatever order the server listed them in
pub fn next_free_id(existing: &[u32]) -> u32 {
    let mut ids = existing.to_vec();
    ids.sort_unstable();
    ids.dedup();

    let mut next = 1u32;
    for id in ids {
        if id == next {
            next = next.saturating_add(1);
        } else if id > next {
            break;
        }
    }
    next
}

/// First existing subnet whose range intersects `candidate`.
/// Entries the server reports in a form we cannot parse only match on exact text.
pub fn find_overlap<'a>(
    existing: &'a [ExistingSubnet],
    candidate: &Ipv4Cidr,
    candidate_text: &str,
) -> Option<&'a ExistingSubnet> {
    existing.iter().find(|s| match s.subnet.parse::<Ipv4Cidr>() {
        Ok(cidr) => cidr.overlaps(candidate),
        Err(_) => s.subnet.trim() == candidate_text.trim(),
    })
}
