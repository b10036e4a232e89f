/// Permission gate: a uniform tri-state view of platform permission queries.
///
/// The gate only reports status; it never opens system settings and never
/// retries a denial. When `can_ask_again` is false the UI is expected to
/// redirect the user to settings instead of prompting again.
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// The three capabilities the app asks the platform for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PermissionKind {
    Camera,
    Location,
    MediaLibrary,
}

/// Platform permission status, normalized across backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Result of a status check or a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionResponse {
    pub status: PermissionStatus,
    /// False once the platform will no longer show its native dialog.
    pub can_ask_again: bool,
}

impl PermissionResponse {
    pub fn is_granted(&self) -> bool {
        self.status == PermissionStatus::Granted
    }
}

/// Capability wrapping the platform's permission service.
///
/// `request_permission` triggers the native dialog at most once per call.
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn check_status(&self, kind: PermissionKind) -> PermissionResponse;

    /// Ask the platform for the permission. Returns whether it was granted.
    async fn request_permission(&self, kind: PermissionKind) -> bool;
}

/// Gate with a fixed grant set, for platforms without a real permission
/// service (the web build grants everything it supports up front) and for
/// tests.
#[derive(Debug, Clone, Default)]
pub struct FixedPermissionGate {
    granted: Vec<PermissionKind>,
}

impl FixedPermissionGate {
    /// Gate that grants every kind.
    pub fn allow_all() -> Self {
        FixedPermissionGate {
            granted: vec![
                PermissionKind::Camera,
                PermissionKind::Location,
                PermissionKind::MediaLibrary,
            ],
        }
    }

    /// Gate that grants only the listed kinds; everything else reports
    /// denied with `can_ask_again: false`.
    pub fn granting(granted: Vec<PermissionKind>) -> Self {
        FixedPermissionGate { granted }
    }
}

#[async_trait]
impl PermissionGate for FixedPermissionGate {
    async fn check_status(&self, kind: PermissionKind) -> PermissionResponse {
        if self.granted.contains(&kind) {
            PermissionResponse {
                status: PermissionStatus::Granted,
                can_ask_again: true,
            }
        } else {
            PermissionResponse {
                status: PermissionStatus::Denied,
                can_ask_again: false,
            }
        }
    }

    async fn request_permission(&self, kind: PermissionKind) -> bool {
        self.check_status(kind).await.is_granted()
    }
}
