use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps contact details (emails, phone numbers) so they never leak through
/// `{:?}` or `{}` in log macros. Serialization still yields the real value,
/// since API responses need it.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Masked<T>(pub T);

impl<T> fmt::Debug for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T> fmt::Display for Masked<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "********")
    }
}

impl<T: Serialize> Serialize for Masked<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<T> Masked<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl Masked<String> {
    /// Log-safe hint: first character and domain of an email, e.g. `j***@mail.com`.
    pub fn hint(&self) -> String {
        match self.0.split_once('@') {
            Some((local, domain)) => {
                let first = local.chars().next().map(String::from).unwrap_or_default();
                format!("{}***@{}", first, domain)
            }
            None => "***".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_and_display_hide_value() {
        let email = Masked::new("jane@example.com".to_string());
        assert_eq!(format!("{:?}", email), "********");
        assert_eq!(format!("{}", email), "********");
    }

    #[test]
    fn serializes_real_value() {
        let email = Masked::new("jane@example.com".to_string());
        assert_eq!(serde_json::to_string(&email).unwrap(), "\"jane@example.com\"");
    }

    #[test]
    fn hint_keeps_domain_only() {
        assert_eq!(Masked::new("jane@example.com".to_string()).hint(), "j***@example.com");
        assert_eq!(Masked::new("0123456789".to_string()).hint(), "***");
    }
}
