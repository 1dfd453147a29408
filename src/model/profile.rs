//! Mailbox owner profile from the `/me` endpoint.

use serde::Deserialize;

/// The signed-in user's profile, printed at startup so the operator can
/// confirm which mailbox the token belongs to.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub display_name: Option<String>,

    #[serde(default)]
    pub user_principal_name: Option<String>,

    #[serde(default)]
    pub mail: Option<String>,
}

impl Profile {
    /// Best available identity string: UPN, then mail, then display name.
    pub fn identity(&self) -> &str {
        self.user_principal_name
            .as_deref()
            .or(self.mail.as_deref())
            .or(self.display_name.as_deref())
            .unwrap_or("<unknown>")
    }
}
