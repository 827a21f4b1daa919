use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Wraps a value that must not leak into log output (payment screenshot
/// references, contact details). Debug and Display render a fixed mask;
/// serialization still writes the real value so API responses stay intact.
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
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl From<String> for Masked<String> {
    fn from(value: String) -> Self {
        Masked(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_in_logs_but_not_on_the_wire() {
        let reference = Masked("https://cdn.example/receipts/abc.png".to_string());
        assert_eq!(format!("{:?}", reference), "********");
        assert_eq!(format!("{}", reference), "********");
        assert_eq!(
            serde_json::to_string(&reference).unwrap(),
            "\"https://cdn.example/receipts/abc.png\""
        );
    }
}
