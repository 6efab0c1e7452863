use crate::model::{Id, auth::CredentialHash};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use thiserror::Error;
use time::UtcDateTime;

pub const USER_HANDLE_MAX_LEN: usize = 50;
pub const DISPLAY_NAME_MAX_LEN: usize = 80;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash, Serialize, Deserialize)]
pub struct User {
    pub id: Id<UserMarker>,
    pub handle: UserHandle,
    pub display_name: DisplayName,
    pub created_at: UtcDateTime,
}

/// Everything needed to register a user. The credential is hashed before it
/// gets here; the repository never sees plaintext.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub handle: UserHandle,
    pub display_name: DisplayName,
    pub credential_hash: CredentialHash,
}

/// Per-profile counters for the profile view.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash, Serialize, Deserialize)]
pub struct ProfileCounts {
    pub posts: u64,
    pub favorites: u64,
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct UserHandle(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The user handle is invalid: {0}")]
pub struct InvalidUserHandleError(String);

impl UserHandle {
    /// A handle is non-empty, at most [`USER_HANDLE_MAX_LEN`] characters, and
    /// contains no whitespace.
    pub fn new(handle: String) -> Result<Self, InvalidUserHandleError> {
        let valid = !handle.is_empty()
            && handle.chars().count() <= USER_HANDLE_MAX_LEN
            && !handle.chars().any(char::is_whitespace);

        if valid {
            Ok(UserHandle(handle))
        } else {
            Err(InvalidUserHandleError(handle))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for UserHandle {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        UserHandle::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"UserHandle"))
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The display name is invalid: {0}")]
pub struct InvalidDisplayNameError(String);

impl DisplayName {
    /// A display name has visible content and at most
    /// [`DISPLAY_NAME_MAX_LEN`] characters.
    pub fn new(name: String) -> Result<Self, InvalidDisplayNameError> {
        let valid = !name.trim().is_empty() && name.chars().count() <= DISPLAY_NAME_MAX_LEN;

        if valid {
            Ok(DisplayName(name))
        } else {
            Err(InvalidDisplayNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl<'de> Deserialize<'de> for DisplayName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        DisplayName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"DisplayName"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::user::{DisplayName, UserHandle};

    #[test]
    fn handle_validation() {
        assert!(UserHandle::new("alice".to_owned()).is_ok());
        assert!(UserHandle::new("a".repeat(50)).is_ok());

        assert!(UserHandle::new(String::new()).is_err());
        assert!(UserHandle::new("a".repeat(51)).is_err());
        assert!(UserHandle::new("has space".to_owned()).is_err());
        assert!(UserHandle::new("tab\there".to_owned()).is_err());
    }

    #[test]
    fn display_name_validation() {
        assert!(DisplayName::new("Alice Liddell".to_owned()).is_ok());
        assert!(DisplayName::new("a".repeat(80)).is_ok());

        assert!(DisplayName::new(String::new()).is_err());
        assert!(DisplayName::new("   ".to_owned()).is_err());
        assert!(DisplayName::new("a".repeat(81)).is_err());
    }
}
