use serde::Deserialize;
use time::OffsetDateTime;
use uuid::Uuid;

/// Request body for wallet creation and renaming.
#[derive(Debug, Deserialize)]
pub struct WalletNameRequest {
    pub name: String,
}

/// Request body for inviting a member by email.
#[derive(Debug, Deserialize)]
pub struct InviteMemberRequest {
    pub email: String,
}

/// Request body for changing a member's role. The role arrives as a plain
/// string and is validated against the closed role set.
#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

/// Request body for filing a transaction into a wallet.
#[derive(Debug, Deserialize)]
pub struct CreateWalletTransactionRequest {
    pub amount: f64,
    #[serde(rename = "type")]
    pub kind: String,
    pub category_id: Uuid,
    #[serde(default)]
    pub description: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
}
