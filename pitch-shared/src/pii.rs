use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps guest contact data so it never shows up verbatim in `{:?}` or `{}` output.
///
/// Serialization still writes the real value; public API views call
/// [`mask_email`] / [`mask_phone`] explicitly before exposing contact data.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
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

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// `jane.doe@example.com` -> `j*******@example.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match chars.next() {
                Some(first) => format!("{}{}@{}", first, "*".repeat(chars.count()), domain),
                None => format!("@{}", domain),
            }
        }
        None => "*".repeat(email.chars().count()),
    }
}

/// Keeps the last two digits visible.
pub fn mask_phone(phone: &str) -> String {
    let digits: Vec<char> = phone.chars().filter(|c| c.is_ascii_digit()).collect();
    let visible = digits.len().saturating_sub(2);
    digits
        .iter()
        .enumerate()
        .map(|(i, c)| if i < visible { '*' } else { *c })
        .collect()
}
