//! Caller identity and guest user-id derivation.
//!
//! The backend detects retakes by user id. Signed-in callers are identified
//! by their account email; guests get a derived id of the form
//! `guest_<normalized name>_<device id>`, where the device id is a random
//! token generated once and persisted in durable storage so repeated guest
//! attempts from the same device collapse to the same identifier.

use std::path::PathBuf;
use std::sync::Mutex;

use uuid::Uuid;

use crate::error::SessionError;

/// Minimum display-name length, after trimming.
pub const MIN_DISPLAY_NAME_LEN: usize = 3;

/// A signed-in platform account.
#[derive(Debug, Clone)]
pub struct Account {
    /// Account email; doubles as the stable user id.
    pub email: String,
    /// Name shown on the leaderboard and result screen.
    pub display_name: String,
}

/// The caller's identity for one session, passed into the session controller
/// at construction rather than read from ambient global state.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// The signed-in account, if any. `None` means guest.
    pub account: Option<Account>,
    /// Durable per-device token used for guest ids.
    pub device_id: String,
}

impl AuthContext {
    pub fn signed_in(account: Account, device_id: String) -> Self {
        Self {
            account: Some(account),
            device_id,
        }
    }

    pub fn guest(device_id: String) -> Self {
        Self {
            account: None,
            device_id,
        }
    }

    pub fn is_guest(&self) -> bool {
        self.account.is_none()
    }

    /// The stable user id submitted with an attempt.
    ///
    /// Signed-in: the account email. Guest: derived from the confirmed
    /// display name and the device id.
    pub fn user_id_for(&self, display_name: &str) -> String {
        match &self.account {
            Some(account) => account.email.clone(),
            None => guest_user_id(display_name, &self.device_id),
        }
    }
}

/// Derive a guest user id: `guest_<normalized name>_<device id>`.
pub fn guest_user_id(display_name: &str, device_id: &str) -> String {
    format!("guest_{}_{}", normalize_name(display_name), device_id)
}

/// Lower-case a name and collapse whitespace runs into single underscores.
pub fn normalize_name(name: &str) -> String {
    name.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Validate a display name, returning the trimmed name.
pub fn validate_display_name(name: &str) -> Result<&str, SessionError> {
    let trimmed = name.trim();
    if trimmed.chars().count() < MIN_DISPLAY_NAME_LEN {
        return Err(SessionError::NameTooShort {
            min: MIN_DISPLAY_NAME_LEN,
        });
    }
    Ok(trimmed)
}

/// Durable storage for the per-device guest token.
pub trait DeviceIdStore: Send + Sync {
    /// The previously stored device id, if any.
    fn load(&self) -> Option<String>;

    /// Persist a freshly generated device id.
    fn store(&self, device_id: &str) -> std::io::Result<()>;
}

/// Load the device id, generating and persisting a new token on first use.
///
/// A persistence failure is logged and tolerated: the session proceeds with
/// an ephemeral id for this run.
pub fn obtain_device_id(store: &dyn DeviceIdStore) -> String {
    if let Some(existing) = store.load() {
        return existing;
    }
    let fresh = Uuid::new_v4().simple().to_string();
    if let Err(e) = store.store(&fresh) {
        tracing::warn!("failed to persist device id: {e}");
    }
    fresh
}

/// File-backed device-id store.
///
/// If the file is deleted the next run generates a new token and the server
/// sees a brand-new guest, so retake detection restarts from zero. That
/// matches the platform's existing behavior for cleared client storage.
#[derive(Debug)]
pub struct FileDeviceStore {
    path: PathBuf,
}

impl FileDeviceStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl DeviceIdStore for FileDeviceStore {
    fn load(&self) -> Option<String> {
        std::fs::read_to_string(&self.path)
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    fn store(&self, device_id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, device_id)
    }
}

/// In-memory device-id store for tests.
#[derive(Debug, Default)]
pub struct MemoryDeviceStore {
    id: Mutex<Option<String>>,
}

impl MemoryDeviceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(device_id: &str) -> Self {
        Self {
            id: Mutex::new(Some(device_id.to_string())),
        }
    }
}

impl DeviceIdStore for MemoryDeviceStore {
    fn load(&self) -> Option<String> {
        self.id.lock().unwrap().clone()
    }

    fn store(&self, device_id: &str) -> std::io::Result<()> {
        *self.id.lock().unwrap() = Some(device_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lowercases_and_collapses_whitespace() {
        assert_eq!(normalize_name("Ahmed Hassan"), "ahmed_hassan");
        assert_eq!(normalize_name("  Fatima   Al  Zahra "), "fatima_al_zahra");
        assert_eq!(normalize_name("Yusuf\t\nIbn Omar"), "yusuf_ibn_omar");
    }

    #[test]
    fn guest_id_is_deterministic() {
        assert_eq!(
            guest_user_id("Ahmed Hassan", "abc123"),
            "guest_ahmed_hassan_abc123"
        );
        // Same inputs, separate call: identical id
        assert_eq!(
            guest_user_id("Ahmed Hassan", "abc123"),
            guest_user_id("Ahmed Hassan", "abc123")
        );
    }

    #[test]
    fn signed_in_id_is_the_email() {
        let auth = AuthContext::signed_in(
            Account {
                email: "student@example.com".into(),
                display_name: "Student".into(),
            },
            "devtoken".into(),
        );
        assert_eq!(auth.user_id_for("Whatever Name"), "student@example.com");
    }

    #[test]
    fn display_name_validation() {
        assert!(validate_display_name("Al").is_err());
        assert!(validate_display_name("  a  ").is_err());
        assert_eq!(validate_display_name("  Ali ").unwrap(), "Ali");
    }

    #[test]
    fn device_id_generated_once_and_reused() {
        let store = MemoryDeviceStore::new();
        let first = obtain_device_id(&store);
        let second = obtain_device_id(&store);
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn cleared_store_regenerates_device_id() {
        let store = MemoryDeviceStore::new();
        let first = obtain_device_id(&store);
        *store.id.lock().unwrap() = None;
        let second = obtain_device_id(&store);
        assert_ne!(first, second);
    }

    #[test]
    fn file_store_round_trip() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = FileDeviceStore::new(dir.path().join("state/device_id"));
        assert!(store.load().is_none());
        let id = obtain_device_id(&store);
        assert_eq!(store.load().as_deref(), Some(id.as_str()));

        let reopened = FileDeviceStore::new(dir.path().join("state/device_id"));
        assert_eq!(obtain_device_id(&reopened), id);
    }
}
