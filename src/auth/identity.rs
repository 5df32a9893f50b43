use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An external identity of a user: `(authentication type, id)`.
///
/// Text form is `"type/id"`; `\` escapes `/` and `\` in either part. A bare
/// id uses [`UserIdentity::DEFAULT_AUTH_TYPE`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserIdentity {
    auth_type: String,
    user_id: String,
}

impl UserIdentity {
    pub const DEFAULT_AUTH_TYPE: &'static str = "Default";

    pub fn new(auth_type: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            auth_type: auth_type.into(),
            user_id: user_id.into(),
        }
    }

    pub fn parse(text: &str) -> Self {
        let mut parts = Vec::with_capacity(2);
        let mut current = String::new();
        let mut chars = text.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        current.push(escaped);
                    }
                }
                '/' if parts.is_empty() => parts.push(std::mem::take(&mut current)),
                _ => current.push(c),
            }
        }
        parts.push(current);

        let user_id = parts.pop().unwrap_or_default();
        match parts.pop() {
            Some(auth_type) => Self::new(auth_type, user_id),
            None => Self::new(Self::DEFAULT_AUTH_TYPE, user_id),
        }
    }

    pub fn auth_type(&self) -> &str {
        &self.auth_type
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn is_authenticated(&self) -> bool {
        !self.user_id.is_empty()
    }

    pub fn into_parts(self) -> (String, String) {
        (self.auth_type, self.user_id)
    }
}

fn write_escaped(f: &mut fmt::Formatter<'_>, part: &str) -> fmt::Result {
    for c in part.chars() {
        if c == '/' || c == '\\' {
            f.write_str("\\")?;
        }
        write!(f, "{}", c)?;
    }
    Ok(())
}

impl fmt::Display for UserIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.auth_type != Self::DEFAULT_AUTH_TYPE {
            write_escaped(f, &self.auth_type)?;
            f.write_str("/")?;
        }
        write_escaped(f, &self.user_id)
    }
}

impl From<&str> for UserIdentity {
    fn from(text: &str) -> Self {
        Self::parse(text)
    }
}

impl Serialize for UserIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UserIdentity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Ok(Self::parse(&text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parts(text: &str) -> (String, String) {
        UserIdentity::parse(text).into_parts()
    }

    #[test]
    fn test_parse() {
        assert_eq!(parts("1"), ("Default".to_string(), "1".to_string()));
        assert_eq!(parts("1/2"), ("1".to_string(), "2".to_string()));
        assert_eq!(parts("1\\/2"), ("Default".to_string(), "1/2".to_string()));
        assert_eq!(parts("a/b/c"), ("a".to_string(), "b/c".to_string()));
    }

    #[test]
    fn test_display_round_trips_escapes() {
        let identity = UserIdentity::new("Google", "a/b\\c");
        let text = identity.to_string();
        assert_eq!(text, "Google/a\\/b\\\\c");
        assert_eq!(UserIdentity::parse(&text), identity);

        assert_eq!(UserIdentity::new("Default", "7").to_string(), "7");
    }

    #[test]
    fn test_authentication() {
        assert!(UserIdentity::parse("Google/1").is_authenticated());
        assert!(!UserIdentity::parse("Google/").is_authenticated());
        assert!(!UserIdentity::parse("").is_authenticated());
    }
}
