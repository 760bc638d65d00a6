//! Deterministic logical IDs derived from construct paths.
//!
//! A construct path is the stack name followed by the construct names that
//! lead to the resource, e.g. `["InfraStack", "ecs-vpc", "PublicSubnet1"]`.
//! The readable part drops the stack name and every non-alphanumeric
//! character; an 8-character hash of the full path keeps IDs unique when two
//! paths collapse to the same readable text.

use sha2::{Digest, Sha256};

const MAX_LOGICAL_ID_LEN: usize = 255;
const HASH_LEN: usize = 8;
const MAX_HUMAN_LEN: usize = 240;

/// Logical ID for a construct path.
#[must_use]
pub fn logical_id<S: AsRef<str>>(path: &[S]) -> String {
    let components: Vec<&str> = path.iter().map(AsRef::as_ref).collect();
    let readable = match components.as_slice() {
        [] => &[][..],
        [only] => std::slice::from_ref(only),
        [_stack, rest @ ..] => rest,
    };

    let mut human: String = readable
        .iter()
        .flat_map(|c| c.chars())
        .filter(char::is_ascii_alphanumeric)
        .collect();
    human.truncate(MAX_HUMAN_LEN);

    format!("{human}{}", path_hash(&components))
}

fn path_hash(components: &[&str]) -> String {
    let digest = Sha256::digest(components.join("/").as_bytes());
    digest
        .iter()
        .take(HASH_LEN / 2)
        .map(|b| format!("{b:02X}"))
        .collect()
}

/// Whether `id` is acceptable to CloudFormation as a logical ID.
#[must_use]
pub fn is_valid_logical_id(id: &str) -> bool {
    !id.is_empty() && id.len() <= MAX_LOGICAL_ID_LEN && id.chars().all(|c| c.is_ascii_alphanumeric())
}
