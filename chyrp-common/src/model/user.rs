use crate::model::{Id, auth::PasswordDigest, media::MediaPath};
use serde::Serialize;
use thiserror::Error;

pub const USERNAME_MAX_LEN: usize = 150;
pub const DISPLAY_NAME_MAX_LEN: usize = 150;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub display_name: DisplayName,
    pub profile_pic: Option<MediaPath>,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub display_name: DisplayName,
    pub password_hash: PasswordDigest,
}

/// Changes to a profile. `None` leaves the field untouched.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ProfileUpdate {
    pub display_name: Option<DisplayName>,
    pub profile_pic: Option<MediaPath>,
}

/// Lower-case ASCII letters and underscores only.
#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct Username(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error(
    "Username must be 1 to {USERNAME_MAX_LEN} characters of lowercase letters and underscores: {0:?}"
)]
pub struct InvalidUsernameError(String);

impl Username {
    pub fn new(username: String) -> Result<Self, InvalidUsernameError> {
        let valid = !username.is_empty()
            && username.len() <= USERNAME_MAX_LEN
            && username.bytes().all(|b| b.is_ascii_lowercase() || b == b'_');

        if valid {
            Ok(Username(username))
        } else {
            Err(InvalidUsernameError(username))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct DisplayName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("Display name must be 1 to {DISPLAY_NAME_MAX_LEN} characters")]
pub struct InvalidDisplayNameError;

impl DisplayName {
    pub fn new(display_name: String) -> Result<Self, InvalidDisplayNameError> {
        let trimmed = display_name.trim();
        if trimmed.is_empty() || trimmed.chars().count() > DISPLAY_NAME_MAX_LEN {
            return Err(InvalidDisplayNameError);
        }

        Ok(Self(trimmed.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

impl From<Username> for DisplayName {
    fn from(value: Username) -> Self {
        Self(value.0)
    }
}
