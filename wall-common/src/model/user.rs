use crate::{
    model::{Id, password::HashedPassword},
    validation::{FieldError, max_chars, non_blank},
};
use validator::ValidateEmail;

pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct UserMarker;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct User {
    pub id: Id<UserMarker>,
    pub username: Username,
    pub email: Email,
    pub is_active: bool,
    pub is_staff: bool,
    pub is_superuser: bool,
}

/// A user together with the hash needed to check their password.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct UserCredentials {
    pub user: User,
    pub password: HashedPassword,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct CreateUser {
    pub username: Username,
    pub email: Email,
    pub password: HashedPassword,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Username(String);

impl Username {
    /// Trims `username` and checks it is non-blank, short enough and made up
    /// of word characters and `@.+-` only.
    pub fn new(username: &str) -> Result<Self, FieldError> {
        let username = non_blank(username)?;
        max_chars(username, USERNAME_MAX_LEN)?;

        let allowed = |c: char| c.is_alphanumeric() || matches!(c, '_' | '@' | '.' | '+' | '-');
        if !username.chars().all(allowed) {
            return Err(FieldError::InvalidUsername);
        }

        Ok(Self(username.to_owned()))
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

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash)]
pub struct Email(String);

impl Email {
    pub fn new(email: &str) -> Result<Self, FieldError> {
        let email = non_blank(email)?;
        max_chars(email, EMAIL_MAX_LEN)?;

        if !email.validate_email() {
            return Err(FieldError::InvalidEmail);
        }

        Ok(Self(email.to_owned()))
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        model::user::{Email, USERNAME_MAX_LEN, Username},
        validation::FieldError,
    };

    #[test]
    fn username_is_trimmed() {
        let username = Username::new("  startingUser ").unwrap();
        assert_eq!(username.get(), "startingUser");
    }

    #[test]
    fn username_rules() {
        for legal in ["a", "user.name", "first+last", "mail@host", "under_score-dash", "Zoë"] {
            assert!(Username::new(legal).is_ok(), "{legal} should be accepted");
        }

        assert_eq!(Username::new(""), Err(FieldError::Blank));
        assert_eq!(Username::new("   "), Err(FieldError::Blank));
        assert_eq!(Username::new("has space"), Err(FieldError::InvalidUsername));
        assert_eq!(Username::new("semi;colon"), Err(FieldError::InvalidUsername));

        let longest = "a".repeat(USERNAME_MAX_LEN);
        assert!(Username::new(&longest).is_ok());
        assert_eq!(
            Username::new(&format!("{longest}a")),
            Err(FieldError::TooLong {
                max: USERNAME_MAX_LEN
            })
        );
    }

    #[test]
    fn email_rules() {
        assert_eq!(
            Email::new(" startingUser@mail.com ").unwrap().get(),
            "startingUser@mail.com"
        );

        for legal in ["user@localhost", "first.last+tag@sub.mail.co.uk", "o'brien@mail.com"] {
            assert!(Email::new(legal).is_ok(), "{legal} should be accepted");
        }

        assert_eq!(Email::new(""), Err(FieldError::Blank));
        for illegal in [
            "no-at-sign",
            "@mail.com",
            "a,b@x.com",
            "<script>@x.com",
            "a@-x-.com",
            "user@.com",
            "user@mail.",
            "user@mail..com",
            "us er@mail.com",
            "a@b@mail.com",
        ] {
            assert_eq!(Email::new(illegal), Err(FieldError::InvalidEmail), "{illegal}");
        }
    }
}
