//! Viewer identity read from the client cookie jar.
//!
//! Identity is display-only: it decides whether an encrypted body is shown
//! or gated behind the passphrase prompt. The server re-checks everything.

/// Default cookie carrying the signed-in address.
pub const USER_COOKIE: &str = "user_email";

/// Look up `name` in a `document.cookie` style header.
///
/// The name must start the header or follow a space. Double quotes are
/// stripped from the value; an empty value counts as absent.
#[must_use]
pub fn cookie_value(header: &str, name: &str) -> Option<String> {
    if name.is_empty() {
        return None;
    }
    let mut search_from = 0;
    while let Some(offset) = header[search_from..].find(name) {
        let start = search_from + offset;
        let after = start + name.len();
        let at_boundary = start == 0 || header[..start].ends_with(' ');
        if at_boundary && header[after..].starts_with('=') {
            let raw = &header[after + 1..];
            let raw = raw.split(';').next().unwrap_or_default();
            let cleaned: String = raw.chars().filter(|c| *c != '"').collect();
            return (!cleaned.is_empty()).then_some(cleaned);
        }
        search_from = after;
    }
    None
}

/// Who is looking at the screen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user_email: Option<String>,
}

impl Session {
    #[must_use]
    pub fn from_cookie_header(header: &str, cookie_name: &str) -> Self {
        Self {
            user_email: cookie_value(header, cookie_name),
        }
    }

    #[must_use]
    pub fn for_user(email: impl Into<String>) -> Self {
        Self {
            user_email: Some(email.into()),
        }
    }

    #[must_use]
    pub fn user_email(&self) -> Option<&str> {
        self.user_email.as_deref()
    }

    /// True when the signed-in address equals `address`.
    #[must_use]
    pub fn is(&self, address: &str) -> bool {
        self.user_email.as_deref() == Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_first_cookie() {
        assert_eq!(
            cookie_value("user_email=alice@mail.test; csrftoken=abc", USER_COOKIE).as_deref(),
            Some("alice@mail.test")
        );
    }

    #[test]
    fn finds_later_cookie_and_strips_quotes() {
        let header = "csrftoken=abc; user_email=\"bob@mail.test\"";
        assert_eq!(cookie_value(header, USER_COOKIE).as_deref(), Some("bob@mail.test"));
    }

    #[test]
    fn ignores_names_that_only_end_with_the_cookie_name() {
        let header = "old_user_email=eve@mail.test; user_email=bob@mail.test";
        assert_eq!(cookie_value(header, USER_COOKIE).as_deref(), Some("bob@mail.test"));
        assert_eq!(cookie_value("xuser_email=eve@mail.test", USER_COOKIE), None);
    }

    #[test]
    fn missing_or_empty_cookie_is_anonymous() {
        assert_eq!(cookie_value("", USER_COOKIE), None);
        assert_eq!(cookie_value("user_email=\"\"", USER_COOKIE), None);
        let session = Session::from_cookie_header("csrftoken=abc", USER_COOKIE);
        assert_eq!(session.user_email(), None);
        assert!(!session.is("alice@mail.test"));
    }

    #[test]
    fn session_matches_address() {
        let session = Session::from_cookie_header("user_email=alice@mail.test", USER_COOKIE);
        assert!(session.is("alice@mail.test"));
        assert!(!session.is("bob@mail.test"));
    }
}
