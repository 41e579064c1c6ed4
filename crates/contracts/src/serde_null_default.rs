//! Reads `null` the same as a missing key: the field's `Default`.
//!
//! Pair with `#[serde(default)]` so both absent and null fields decode.

use serde::{Deserialize, Deserializer};

pub fn deserialize<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Wrapper {
        #[serde(default, deserialize_with = "super::deserialize")]
        items: Vec<String>,
    }

    #[test]
    fn null_and_missing_become_default() {
        let null: Wrapper = serde_json::from_str(r#"{"items":null}"#).expect("null items");
        let missing: Wrapper = serde_json::from_str("{}").expect("missing items");
        assert!(null.items.is_empty());
        assert!(missing.items.is_empty());
    }

    #[test]
    fn present_values_pass_through() {
        let parsed: Wrapper = serde_json::from_str(r#"{"items":["a"]}"#).expect("items");
        assert_eq!(parsed.items, vec!["a".to_string()]);
    }
}
