//! Identity types.
//!
//! - [`Identity`] - The signed-in user (exactly one or none per session)
//! - [`AuthMethod`] - How the identity was established
//! - [`AuthMode`] - Which credential family backs the identity
//! - [`UserProfile`] - The account service's profile payload

use serde::{Deserialize, Serialize};
use std::fmt;

use super::de::{opt_string_or_number, string_or_number};

// ============================================================================
// Auth Mode
// ============================================================================

/// Which credential family an identity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthMode {
    /// Username/password with access and refresh tokens.
    Password,
    /// Third-party identity wallet (email, federated or wallet signature).
    IdentityWallet,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Password => write!(f, "password"),
            Self::IdentityWallet => write!(f, "identity-wallet"),
        }
    }
}

// ============================================================================
// Auth Method
// ============================================================================

/// The concrete sign-in method recorded on an identity.
///
/// The identity-wallet widget reports which of its sub-methods was used;
/// they all collapse to [`AuthMode::IdentityWallet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Password login against the account service.
    #[serde(alias = "jwt")]
    Password,
    /// Wallet widget, email one-time code.
    Email,
    /// Wallet widget, federated Google sign-in.
    Google,
    /// Wallet widget, cryptographic wallet signature.
    Wallet,
}

impl AuthMethod {
    /// Returns the credential family for this method.
    pub fn mode(self) -> AuthMode {
        match self {
            Self::Password => AuthMode::Password,
            Self::Email | Self::Google | Self::Wallet => AuthMode::IdentityWallet,
        }
    }

    /// Parses a method name as used on the command line.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "password" | "jwt" => Some(Self::Password),
            "email" => Some(Self::Email),
            "google" => Some(Self::Google),
            "wallet" => Some(Self::Wallet),
            _ => None,
        }
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Password => "password",
            Self::Email => "email",
            Self::Google => "google",
            Self::Wallet => "wallet",
        };
        write!(f, "{name}")
    }
}

// ============================================================================
// Identity
// ============================================================================

/// The signed-in user.
///
/// Serialized in camelCase because wallet-mode identities are persisted in
/// the same shape the wallet widget produces them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    /// Stable identifier.
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Display name.
    pub name: String,
    /// Email address, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// How this identity signed in.
    pub auth_method: AuthMethod,
    /// Wallet address for wallet-signature sign-ins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,
}

impl Identity {
    /// Creates an identity with no email or wallet address.
    pub fn new(id: impl Into<String>, name: impl Into<String>, auth_method: AuthMethod) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            email: None,
            auth_method,
            wallet_address: None,
        }
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets the wallet address.
    #[must_use]
    pub fn with_wallet_address(mut self, address: impl Into<String>) -> Self {
        self.wallet_address = Some(address.into());
        self
    }

    /// Returns the credential family backing this identity.
    pub fn mode(&self) -> AuthMode {
        self.auth_method.mode()
    }
}

// ============================================================================
// User Profile
// ============================================================================

/// Profile fields returned by the account service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// Account id (numeric on the wire).
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    /// Login name.
    #[serde(default)]
    pub username: Option<String>,
    /// Email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Given name.
    #[serde(default)]
    pub first_name: Option<String>,
    /// Family name.
    #[serde(default)]
    pub last_name: Option<String>,
    /// Linked wallet address.
    #[serde(default, deserialize_with = "opt_string_or_number")]
    pub wallet_address: Option<String>,
}

impl UserProfile {
    /// Best available display name: full name, then username, then email.
    pub fn display_name(&self) -> String {
        let full = [self.first_name.as_deref(), self.last_name.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        if !full.is_empty() {
            return full;
        }

        self.username
            .iter()
            .chain(self.email.iter())
            .find(|s| !s.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| self.id.clone())
    }

    /// Converts the profile into a password-mode identity.
    pub fn into_identity(self) -> Identity {
        let name = self.display_name();
        Identity {
            id: self.id,
            name,
            email: self.email.filter(|e| !e.is_empty()),
            auth_method: AuthMethod::Password,
            wallet_address: self.wallet_address.filter(|w| !w.is_empty()),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
