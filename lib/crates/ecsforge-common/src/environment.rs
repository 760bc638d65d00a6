use std::fmt;

use serde::{Deserialize, Serialize};

/// Target account and region of a stack.
///
/// Both are optional: an unset value makes the template environment-agnostic
/// and CloudFormation fills in whatever the deploying credentials point at.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Environment {
    /// AWS account ID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account: Option<String>,
    /// AWS region, e.g. `eu-west-1`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Environment {
    #[must_use]
    pub fn new(account: Option<String>, region: Option<String>) -> Self {
        Self { account, region }
    }

    /// Whether a cross-stack import from `other` can be resolved in `self`.
    ///
    /// Exports are regional and account-scoped, so two stacks may only share
    /// values when neither pins a different account or region.
    #[must_use]
    pub fn can_import_from(&self, other: &Environment) -> bool {
        compatible(self.account.as_deref(), other.account.as_deref())
            && compatible(self.region.as_deref(), other.region.as_deref())
    }
}

fn compatible(a: Option<&str>, b: Option<&str>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "aws://{}/{}",
            self.account.as_deref().unwrap_or("unknown-account"),
            self.region.as_deref().unwrap_or("unknown-region")
        )
    }
}
