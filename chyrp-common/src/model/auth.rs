use crate::{
    model::{
        Id,
        user::{User, UserMarker},
    },
    util::PositiveDuration,
};
use argon2::{
    Argon2, Params,
    password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
};
use base64::{
    DecodeError, Engine,
    display::Base64Display,
    prelude::{BASE64_STANDARD, BASE64_URL_SAFE_NO_PAD},
};
use std::{
    fmt::{Debug, Formatter},
    num::ParseIntError,
    str::FromStr,
};
use thiserror::Error;
use time::OffsetDateTime;

pub const SESSION_TOKEN_CORE_LEN: usize = 24;
pub const SESSION_TOKEN_SALT_LEN: usize = 18;
pub const SESSION_TOKEN_HASH_LEN: usize = Params::DEFAULT_OUTPUT_LEN;
pub const PASSWORD_SALT_LEN: usize = 16;
pub const CSRF_TOKEN_LEN: usize = 32;

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Hashing session token failed: {0}")]
pub struct SessionTokenHashError(argon2::Error);

#[derive(Clone, Eq, PartialEq, Debug, Error)]
pub enum SessionTokenDecodeError {
    #[error("Not enough parts separated by ':'")]
    NotEnoughParts,
    #[error("Invalid user id: {0}")]
    InvalidUserId(ParseIntError),
    #[error("Decoding base64 failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("The length of the core part is incorrect")]
    InvalidCoreLength,
    #[error("The length of the salt part is incorrect")]
    InvalidSaltLength,
}

/// Secret handed to the client in the session cookie.
///
/// Only [`SessionTokenHash`] is ever stored, so a leaked sessions table does not leak sessions.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionToken {
    pub user_id: Id<UserMarker>,
    pub core: [u8; SESSION_TOKEN_CORE_LEN],
    pub salt: [u8; SESSION_TOKEN_SALT_LEN],
}

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct SessionTokenHash(pub Box<[u8; SESSION_TOKEN_HASH_LEN]>);

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Session {
    pub user: Id<UserMarker>,
    pub token_hash: SessionTokenHash,
    pub created_at: OffsetDateTime,
    pub expires_after: Option<PositiveDuration>,
}

impl Session {
    #[must_use]
    pub fn is_expired_at(&self, now: OffsetDateTime) -> bool {
        self.expires_after
            .is_some_and(|expires_after| self.created_at + expires_after.get() < now)
    }
}

impl SessionToken {
    #[must_use]
    pub fn generate_random(user_id: Id<UserMarker>) -> Self {
        let core = rand::random();
        let salt = rand::random();

        Self {
            user_id,
            core,
            salt,
        }
    }

    #[must_use]
    pub fn as_token_str(&self) -> String {
        let user_id = self.user_id;
        let encoded_core = Base64Display::new(&self.core, &BASE64_STANDARD);
        let encoded_salt = Base64Display::new(&self.salt, &BASE64_STANDARD);

        format!("{user_id}:{encoded_core}:{encoded_salt}")
    }

    pub fn hash(&self) -> Result<SessionTokenHash, SessionTokenHashError> {
        let argon2 = Argon2::default();

        let mut hash = Box::new([0; SESSION_TOKEN_HASH_LEN]);
        argon2
            .hash_password_into(&self.core, &self.salt, &mut *hash)
            .map_err(SessionTokenHashError)?;

        Ok(SessionTokenHash(hash))
    }
}

impl FromStr for SessionToken {
    type Err = SessionTokenDecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');

        let user_id_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let core_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;
        let salt_part = parts.next().ok_or(Self::Err::NotEnoughParts)?;

        let user_id = user_id_part.parse().map_err(Self::Err::InvalidUserId)?;
        let core = BASE64_STANDARD
            .decode(core_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidCoreLength)?;
        let salt = BASE64_STANDARD
            .decode(salt_part)?
            .try_into()
            .map_err(|_| Self::Err::InvalidSaltLength)?;

        Ok(Self {
            user_id,
            core,
            salt,
        })
    }
}

impl Debug for SessionToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionToken")
            .field("user_id", &self.user_id)
            .field("core", &"[redacted]")
            .field("salt", &"[redacted]")
            .finish()
    }
}

impl Debug for SessionTokenHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionTokenHash").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The session token hash had an invalid length")]
pub struct InvalidSessionTokenHashError;

impl TryFrom<Vec<u8>> for SessionTokenHash {
    type Error = InvalidSessionTokenHashError;

    fn try_from(value: Vec<u8>) -> Result<Self, Self::Error> {
        Ok(Self(
            value
                .into_boxed_slice()
                .try_into()
                .map_err(|_| InvalidSessionTokenHashError)?,
        ))
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Error)]
#[error("Password hashing failed: {0}")]
pub struct PasswordHashError(password_hash::Error);

/// Argon2 password hash in PHC string format.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct PasswordDigest(String);

impl PasswordDigest {
    pub fn hash(password: &str) -> Result<Self, PasswordHashError> {
        let salt_bytes: [u8; PASSWORD_SALT_LEN] = rand::random();
        let salt = SaltString::encode_b64(&salt_bytes).map_err(PasswordHashError)?;
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(PasswordHashError)?;

        Ok(Self(hash.to_string()))
    }

    /// Wraps a PHC string read back from storage.
    #[must_use]
    pub fn from_phc(phc: String) -> Self {
        Self(phc)
    }

    #[must_use]
    pub fn as_phc(&self) -> &str {
        &self.0
    }

    pub fn verify(&self, password: &str) -> Result<bool, PasswordHashError> {
        let parsed = PasswordHash::new(&self.0).map_err(PasswordHashError)?;

        match Argon2::default().verify_password(password.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(err) => Err(PasswordHashError(err)),
        }
    }
}

impl Debug for PasswordDigest {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PasswordDigest").field(&"[redacted]").finish()
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: PasswordDigest,
}

/// Anti-forgery token, sent both as a cookie and echoed back in a request header.
#[derive(Clone, Eq, PartialEq, Hash)]
pub struct CsrfToken(String);

impl CsrfToken {
    #[must_use]
    pub fn generate_random() -> Self {
        let bytes: [u8; CSRF_TOKEN_LEN] = rand::random();
        Self(BASE64_URL_SAFE_NO_PAD.encode(bytes))
    }

    /// Accepts a token previously issued by [`CsrfToken::generate_random`].
    #[must_use]
    pub fn parse(token: &str) -> Option<Self> {
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(token).ok()?;
        (decoded.len() == CSRF_TOKEN_LEN).then(|| Self(token.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    /// Compares without short-circuiting on the first differing byte.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let candidate = candidate.as_bytes();

        expected.len() == candidate.len()
            && expected
                .iter()
                .zip(candidate)
                .fold(0, |diff, (a, b)| diff | (a ^ b))
                == 0
    }
}

impl Debug for CsrfToken {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("CsrfToken").field(&"[redacted]").finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::{
            Id,
            auth::{CsrfToken, PasswordDigest, Session, SessionToken, SessionTokenDecodeError},
        },
        util::PositiveDuration,
    };
    use time::{Duration, macros::datetime};

    #[test]
    fn session_token_round_trips_through_cookie_value() {
        let token = SessionToken::generate_random(Id::from(1234));
        let parsed: SessionToken = token.as_token_str().parse().unwrap();

        assert_eq!(parsed, token);
        assert_eq!(parsed.hash().unwrap(), token.hash().unwrap());
    }

    #[test]
    fn malformed_session_tokens() {
        assert_eq!(
            "1234".parse::<SessionToken>(),
            Err(SessionTokenDecodeError::NotEnoughParts)
        );
        assert!(matches!(
            "abc:AAAA:AAAA".parse::<SessionToken>(),
            Err(SessionTokenDecodeError::InvalidUserId(_))
        ));
        assert_eq!(
            "1:AAAA:AAAA".parse::<SessionToken>(),
            Err(SessionTokenDecodeError::InvalidCoreLength)
        );
    }

    #[test]
    fn different_tokens_hash_differently() {
        let first = SessionToken::generate_random(Id::from(1));
        let second = SessionToken::generate_random(Id::from(1));

        assert_ne!(first.hash().unwrap(), second.hash().unwrap());
    }

    #[test]
    fn session_expiry() {
        let created_at = datetime!(2025-06-01 12:00 UTC);
        let mut session = Session {
            user: Id::from(1),
            token_hash: SessionToken::generate_random(Id::from(1)).hash().unwrap(),
            created_at,
            expires_after: None,
        };
        assert!(!session.is_expired_at(created_at + Duration::days(10_000)));

        session.expires_after = PositiveDuration::new(Duration::hours(1));
        assert!(!session.is_expired_at(created_at + Duration::minutes(59)));
        assert!(session.is_expired_at(created_at + Duration::minutes(61)));
    }

    #[test]
    fn password_verification() {
        let digest = PasswordDigest::hash("hunter2").unwrap();

        assert!(digest.verify("hunter2").unwrap());
        assert!(!digest.verify("hunter3").unwrap());
        assert!(
            PasswordDigest::from_phc("not a phc string".to_owned())
                .verify("hunter2")
                .is_err()
        );
    }

    #[test]
    fn csrf_tokens() {
        let token = CsrfToken::generate_random();

        assert!(token.matches(token.get()));
        assert!(!token.matches(""));
        assert!(!token.matches(CsrfToken::generate_random().get()));
        assert_eq!(CsrfToken::parse(token.get()), Some(token));
        assert_eq!(CsrfToken::parse("too-short"), None);
    }
}
