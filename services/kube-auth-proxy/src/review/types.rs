//! TokenReview wire types (`authentication.k8s.io/v1`).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// API version sent with every review request.
pub const API_VERSION: &str = "authentication.k8s.io/v1";
/// Object kind sent with every review request.
pub const KIND: &str = "TokenReview";

/// Extra key carrying the name of the cluster that issued the token.
pub const EXTRA_KEY_CLUSTER_NAME: &str = "cluster-name";

/// Request body posted to the authority.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReviewRequest<'a> {
    /// Always [`API_VERSION`]
    pub api_version: &'static str,
    /// Always [`KIND`]
    pub kind: &'static str,
    /// Token to review
    pub spec: TokenReviewSpec<'a>,
}

impl<'a> TokenReviewRequest<'a> {
    /// Builds a review request for `token`.
    #[must_use]
    pub const fn new(token: &'a str) -> Self {
        Self {
            api_version: API_VERSION,
            kind: KIND,
            spec: TokenReviewSpec { token },
        }
    }
}

/// `spec` of a review request.
#[derive(Debug, Serialize)]
pub struct TokenReviewSpec<'a> {
    /// Raw bearer token
    pub token: &'a str,
}

/// Review response returned by the authority.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenReview {
    /// API version echoed by the authority
    #[serde(default)]
    pub api_version: String,
    /// Kind echoed by the authority
    #[serde(default)]
    pub kind: String,
    /// The verdict
    #[serde(default)]
    pub status: TokenReviewStatus,
}

impl TokenReview {
    /// Builds an authenticated review for tests and fixtures.
    #[must_use]
    pub fn authenticated(user: UserInfo) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            status: TokenReviewStatus {
                authenticated: true,
                user,
                error: String::new(),
            },
        }
    }

    /// Builds an unauthenticated review carrying `reason`.
    #[must_use]
    pub fn unauthenticated(reason: impl Into<String>) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            status: TokenReviewStatus {
                authenticated: false,
                user: UserInfo::default(),
                error: reason.into(),
            },
        }
    }

    /// Whether the authority accepted the token.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.status.authenticated
    }
}

/// Authentication decision and identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenReviewStatus {
    /// Whether the token identifies a valid principal
    #[serde(default)]
    pub authenticated: bool,
    /// Identity of the principal, empty when unauthenticated
    #[serde(default)]
    pub user: UserInfo,
    /// Reason the token was rejected
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
}

/// Identity attributes of an authenticated principal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInfo {
    /// Principal name, e.g. `system:serviceaccount:default:test`
    #[serde(default)]
    pub username: String,
    /// Kubernetes UID of the principal
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub uid: String,
    /// Group memberships in authority order
    #[serde(default)]
    pub groups: Vec<String>,
    /// Authority-specific attributes
    #[serde(default)]
    pub extra: HashMap<String, Vec<String>>,
}

impl UserInfo {
    /// Creates user info with just a username.
    #[must_use]
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            ..Self::default()
        }
    }

    /// Adds group memberships.
    #[must_use]
    pub fn with_groups<I, S>(mut self, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Adds an extra attribute.
    #[must_use]
    pub fn with_extra<I, S>(mut self, key: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra
            .insert(key.into(), values.into_iter().map(Into::into).collect());
        self
    }

    /// First value of the cluster-name extra, if any.
    #[must_use]
    pub fn cluster_name(&self) -> Option<&str> {
        self.extra
            .get(EXTRA_KEY_CLUSTER_NAME)
            .and_then(|values| values.first())
            .map(String::as_str)
    }
}
