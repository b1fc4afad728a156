//! Defines the session token stored in the auth cookie and how to serialize/deserialize it.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::user::UserId;

mod datetime_format {
    //! Serializes a [time::OffsetDateTime] in a fixed width format.
    //!
    //! The default serializer for [time::OffsetDateTime] writes midnight as
    //! "0:00:00.0", which the default deserializer then rejects because it
    //! expects two digit hours.
    use serde::{Deserialize, Deserializer, Serializer};
    use time::{
        OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description,
    };

    /// Date time format for the token expiry, e.g. "2021-01-01 00:00:00.0 +00:00:00".
    const DATE_TIME_FORMAT: &[BorrowedFormatItem] = format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond] [offset_hour \
             sign:mandatory]:[offset_minute]:[offset_second]"
    );

    pub fn serialize<S>(dt: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let formatted = dt
            .format(DATE_TIME_FORMAT)
            .map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&formatted)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<OffsetDateTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        OffsetDateTime::parse(&s, DATE_TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// Proof that a user logged in, valid until `expires_at`.
#[derive(Serialize, Deserialize, Debug, PartialEq)]
pub struct Token {
    pub user_id: UserId,

    #[serde(
        serialize_with = "datetime_format::serialize",
        deserialize_with = "datetime_format::deserialize"
    )]
    pub expires_at: OffsetDateTime,
}

impl Token {
    /// Whether the token is still valid at `now`.
    pub fn is_valid_at(&self, now: OffsetDateTime) -> bool {
        now < self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use time::{Duration, UtcOffset, macros::datetime};

    use crate::{auth::token::Token, user::UserId};

    #[test]
    fn serialise_token() {
        let expires_at = datetime!(2025-12-21 03:54:00).assume_offset(UtcOffset::UTC);
        let token = Token {
            user_id: UserId::Partner,
            expires_at,
        };
        let expected = r#"{"user_id":"partner","expires_at":"2025-12-21 03:54:00.0 +00:00:00"}"#;

        let actual = serde_json::to_string(&token).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn deserialise_token_with_midnight_expiry() {
        let expected = Token {
            user_id: UserId::Owner,
            expires_at: datetime!(2025-12-21 00:00:00).assume_offset(UtcOffset::UTC),
        };
        let token_string = r#"{"user_id":"owner","expires_at":"2025-12-21 00:00:00.0 +00:00:00"}"#;

        let actual: Token = serde_json::from_str(token_string).unwrap();

        assert_eq!(expected, actual);
    }

    #[test]
    fn token_with_unknown_user_is_rejected() {
        let token_string = r#"{"user_id":"guest","expires_at":"2025-12-21 00:00:00.0 +00:00:00"}"#;

        let result = serde_json::from_str::<Token>(token_string);

        assert!(result.is_err());
    }

    #[test]
    fn token_expires_at_expiry_time() {
        let expires_at = datetime!(2025-12-21 12:00 UTC);
        let token = Token {
            user_id: UserId::Owner,
            expires_at,
        };

        assert!(token.is_valid_at(expires_at - Duration::seconds(1)));
        assert!(!token.is_valid_at(expires_at));
    }
}
