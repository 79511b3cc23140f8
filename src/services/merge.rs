use std::collections::HashSet;

use crate::models::Client;

/// Normalized identity used to recognise the same client on both sides:
/// lowercase trimmed name, then email or phone.
pub fn identity_key(client: &Client) -> String {
    let contact = client.contact().unwrap_or_default();
    format!(
        "{}::{}",
        client.name.trim().to_lowercase(),
        contact.trim().to_lowercase()
    )
}

/// Merges remote clients into the local list. Local records always win a
/// collision on either identity key or id; unseen remote records are appended
/// in remote order.
pub fn merge_clients(local: &[Client], remote: Vec<Client>) -> Vec<Client> {
    let mut seen_keys: HashSet<String> = local.iter().map(identity_key).collect();
    let mut seen_ids: HashSet<String> = local.iter().map(|client| client.id.clone()).collect();
    let mut merged = local.to_vec();
    for client in remote {
        if seen_ids.contains(&client.id) || seen_keys.contains(&identity_key(&client)) {
            continue;
        }
        seen_ids.insert(client.id.clone());
        seen_keys.insert(identity_key(&client));
        merged.push(client);
    }
    merged
}
