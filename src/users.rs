//! User directory: profiles, web3 wallet users, employee invitations and
//! dashboard routing, all kept in a [`DocumentStore`].

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;
use tracing::{info, warn};

use crate::clock::SharedClock;
use crate::model::UserId;
use crate::store::{Document, DocumentStore, StoreError, decode, encode, field_eq};

pub const USERS: &str = "users";
pub const EMPLOYEES: &str = "employees";
pub const DEMO_REQUESTS: &str = "demoRequests";

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("invalid invitation token {0}")]
    InvalidInvitation(String),
    #[error("invitation email does not match {0}")]
    EmailMismatch(String),
    #[error("user {0} not found")]
    UserNotFound(UserId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Employer,
    Employee,
    Web3,
}

/// A stored user profile.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    #[serde(skip)]
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub wallet_address: Option<String>,
    #[serde(default)]
    pub is_web3_enabled: bool,
    #[serde(default)]
    pub employer_id: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Fields to set on a profile; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub user_type: Option<UserType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

/// A pending employee invitation, keyed by its token.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Invitation {
    email: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    employer_id: Option<String>,
}

/// The signed-in identity as reported by the authentication provider.
#[derive(Debug, Clone, Default)]
pub struct SessionUser {
    pub id: UserId,
    pub email: Option<String>,
    pub name: Option<String>,
    pub user_type: Option<UserType>,
}

/// Which dashboard a user lands on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dashboard {
    Employer,
    Employee,
    Web3,
}

impl Dashboard {
    pub fn path(self) -> &'static str {
        match self {
            Dashboard::Employer => "/dashboard/employer",
            Dashboard::Employee => "/dashboard/employee",
            Dashboard::Web3 => "/dashboard/web3",
        }
    }
}

impl From<UserType> for Dashboard {
    fn from(user_type: UserType) -> Self {
        match user_type {
            UserType::Employer => Dashboard::Employer,
            UserType::Employee => Dashboard::Employee,
            UserType::Web3 => Dashboard::Web3,
        }
    }
}

/// Generate a demo wallet address: `0x` followed by 12 hex digits from the
/// thread-local CSPRNG.
pub fn generate_wallet_address() -> String {
    let bytes: [u8; 6] = rand::random();
    format!("0x{}", hex::encode(bytes))
}

/// User lookups over a shared document store.
pub struct UserDirectory<S> {
    store: Arc<S>,
    clock: SharedClock,
}

/// Public API
impl<S: DocumentStore> UserDirectory<S> {
    pub fn new(store: Arc<S>, clock: SharedClock) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Apply `patch` to user `id`, creating the profile if it does not exist.
    pub async fn create_or_update_user(
        &self,
        id: &str,
        patch: UserPatch,
    ) -> Result<UserId, DirectoryError> {
        let mut document = encode(&patch)?;
        let now = self.timestamp();
        let exists = self.store.get(USERS, id).await?.is_some();
        if !exists {
            document.insert("createdAt".into(), now.clone());
        }
        document.insert("updatedAt".into(), now);
        self.store.set(USERS, id, document, exists).await?;
        Ok(id.to_string())
    }

    /// Find the user owning `address`, recording the login, or create a web3 user for it.
    pub async fn create_web3_user(&self, address: &str) -> Result<UserId, DirectoryError> {
        let now = self.timestamp();
        if let Some((id, _)) = self.first_user_where("walletAddress", address).await? {
            self.store
                .set(USERS, &id, object(json!({ "lastLoginAt": now })), true)
                .await?;
            return Ok(id);
        }

        let document = object(json!({
            "walletAddress": address,
            "type": UserType::Web3,
            "createdAt": now,
            "updatedAt": now,
        }));
        let id = self.store.add(USERS, document).await?;
        info!(user = %id, address, "web3 user created");
        Ok(id)
    }

    pub async fn user_by_id(&self, id: &str) -> Result<Option<UserProfile>, DirectoryError> {
        match self.store.get(USERS, id).await? {
            Some(document) => Ok(Some(Self::profile(id.to_string(), document)?)),
            None => Ok(None),
        }
    }

    pub async fn user_by_wallet(
        &self,
        address: &str,
    ) -> Result<Option<UserProfile>, DirectoryError> {
        match self.first_user_where("walletAddress", address).await? {
            Some((id, document)) => Ok(Some(Self::profile(id, document)?)),
            None => Ok(None),
        }
    }

    /// Redeem invitation `token` for `email`:
    /// - Ensure the invitation exists and was issued to `email`
    /// - Create the employee user, or link an existing user with that email
    /// - Mark the invitation active
    pub async fn accept_employee_invite(
        &self,
        token: &str,
        email: &str,
    ) -> Result<UserId, DirectoryError> {
        let document = self
            .store
            .get(EMPLOYEES, token)
            .await?
            .ok_or_else(|| DirectoryError::InvalidInvitation(token.to_string()))?;
        let invitation: Invitation = decode(EMPLOYEES, token, document)?;
        if invitation.email != email {
            return Err(DirectoryError::EmailMismatch(email.to_string()));
        }

        let now = self.timestamp();
        let user_id = match self.first_user_where("email", email).await? {
            Some((id, _)) => {
                let link = object(json!({
                    "employerId": invitation.employer_id,
                    "employeeId": token,
                    "updatedAt": now,
                }));
                self.store.set(USERS, &id, link, true).await?;
                id
            }
            None => {
                let user = object(json!({
                    "email": email,
                    "name": invitation.name,
                    "type": UserType::Employee,
                    "employerId": invitation.employer_id,
                    "employeeId": token,
                    "createdAt": now,
                    "updatedAt": now,
                }));
                self.store.add(USERS, user).await?
            }
        };

        let activation = object(json!({
            "status": "Active",
            "userId": user_id,
            "activatedAt": now,
        }));
        self.store.set(EMPLOYEES, token, activation, true).await?;

        info!(user = %user_id, token, "employee invitation accepted");
        Ok(user_id)
    }

    /// Record a demo request from a prospective employer; returns the request id.
    pub async fn request_employer_demo(&self, email: &str) -> Result<String, DirectoryError> {
        let request = object(json!({
            "email": email,
            "status": "pending",
            "requestedAt": self.timestamp(),
        }));
        Ok(self.store.add(DEMO_REQUESTS, request).await?)
    }

    /// Give an existing user a generated wallet address and enable web3 features.
    pub async fn enable_web3_features(&self, id: &str) -> Result<String, DirectoryError> {
        if self.store.get(USERS, id).await?.is_none() {
            return Err(DirectoryError::UserNotFound(id.to_string()));
        }

        let address = generate_wallet_address();
        let update = object(json!({
            "isWeb3Enabled": true,
            "walletAddress": address,
            "updatedAt": self.timestamp(),
        }));
        self.store.set(USERS, id, update, true).await?;
        Ok(address)
    }

    /// Pick the dashboard for a signed-in user. A stored profile decides first,
    /// then the session's own type; unknown users are registered as web3 users.
    /// Store failures fall back to the web3 dashboard.
    pub async fn resolve_dashboard(&self, session: &SessionUser) -> Dashboard {
        match self.stored_dashboard(session).await {
            Ok(Some(dashboard)) => dashboard,
            Ok(None) => session.user_type.map_or(Dashboard::Web3, Dashboard::from),
            Err(e) => {
                warn!(user = %session.id, reason = %e, "could not resolve dashboard");
                Dashboard::Web3
            }
        }
    }
}

/// Private API
impl<S: DocumentStore> UserDirectory<S> {
    async fn stored_dashboard(
        &self,
        session: &SessionUser,
    ) -> Result<Option<Dashboard>, DirectoryError> {
        match self.store.get(USERS, &session.id).await? {
            Some(document) => {
                let user_type = document
                    .get("type")
                    .cloned()
                    .and_then(|v| serde_json::from_value::<UserType>(v).ok());
                let web3_enabled = document.get("isWeb3Enabled") == Some(&Value::Bool(true));
                Ok(match user_type {
                    Some(user_type) => Some(user_type.into()),
                    None if web3_enabled => Some(Dashboard::Web3),
                    None => None,
                })
            }
            None => {
                let now = self.timestamp();
                let user = object(json!({
                    "email": session.email,
                    "name": session.name,
                    "type": UserType::Web3,
                    "createdAt": now,
                    "updatedAt": now,
                }));
                self.store.set(USERS, &session.id, user, false).await?;
                Ok(None)
            }
        }
    }

    async fn first_user_where(
        &self,
        field: &str,
        value: &str,
    ) -> Result<Option<(String, Document)>, StoreError> {
        let mut found = self.store.query(USERS, field_eq(field, value)).await?;
        Ok((!found.is_empty()).then(|| found.swap_remove(0)))
    }

    fn profile(id: UserId, document: Document) -> Result<UserProfile, StoreError> {
        let mut profile: UserProfile = decode(USERS, &id, document)?;
        profile.id = id;
        Ok(profile)
    }

    fn timestamp(&self) -> Value {
        json!(self.clock.now())
    }
}

fn object(value: Value) -> Document {
    match value {
        Value::Object(map) => map,
        _ => Document::new(),
    }
}
