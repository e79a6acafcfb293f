use std::collections::BTreeMap;

/// A single predicted attribute value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AttributeValue {
    Text(String),
    Color([u8; 3]),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        AttributeValue::Text(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        AttributeValue::Text(value)
    }
}

impl From<[u8; 3]> for AttributeValue {
    fn from(value: [u8; 3]) -> Self {
        AttributeValue::Color(value)
    }
}

/// Attribute name to value, as merged from one or more predictors.
///
/// Missing keys mean "unknown"; callers supply their own fallback.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    values: BTreeMap<String, AttributeValue>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Overlays `other` on top of `self`; `other` wins on shared keys.
    pub fn merge(&mut self, other: Attributes) {
        self.values.extend(other.values);
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.values.get(key)
    }

    /// The value for `key` if it is text.
    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            AttributeValue::Text(s) => Some(s),
            AttributeValue::Color(_) => None,
        }
    }

    /// The value for `key` if it is a colour.
    pub fn color(&self, key: &str) -> Option<[u8; 3]> {
        match self.values.get(key)? {
            AttributeValue::Color(c) => Some(*c),
            AttributeValue::Text(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_overrides_shared_keys() {
        let mut base = Attributes::new().with("gender", "A").with("race", "R");
        base.merge(Attributes::new().with("gender", "B"));

        assert_eq!(base.text("gender"), Some("B"));
        assert_eq!(base.text("race"), Some("R"));
        assert_eq!(base.len(), 2);
    }

    #[test]
    fn test_typed_accessors_reject_wrong_variant() {
        let attrs = Attributes::new()
            .with("box_color", [1u8, 2, 3])
            .with("age", "20대");

        assert_eq!(attrs.color("box_color"), Some([1, 2, 3]));
        assert_eq!(attrs.text("box_color"), None);
        assert_eq!(attrs.color("age"), None);
        assert_eq!(attrs.text("missing"), None);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(Attributes::default().is_empty());
    }
}
