//! Map-as-pairs serde adapter
//!
//! Protocol maps are keyed by composite values (`AddrId`, `Address`,
//! `(MintetteId, AddrId)`), which JSON cannot express as object keys. Fields
//! annotated with `#[serde(with = "crate::serde_pairs")]` travel as a
//! sequence of `(key, value)` pairs instead; the binary encoding is
//! unaffected since both forms are a length-prefixed entry list.

use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;

pub fn serialize<K, V, S>(map: &BTreeMap<K, V>, serializer: S) -> Result<S::Ok, S::Error>
where
    K: Serialize,
    V: Serialize,
    S: Serializer,
{
    let mut seq = serializer.serialize_seq(Some(map.len()))?;
    for entry in map {
        seq.serialize_element(&entry)?;
    }
    seq.end()
}

pub fn deserialize<'de, K, V, D>(deserializer: D) -> Result<BTreeMap<K, V>, D::Error>
where
    K: Deserialize<'de> + Ord,
    V: Deserialize<'de>,
    D: Deserializer<'de>,
{
    let pairs = Vec::<(K, V)>::deserialize(deserializer)?;
    Ok(pairs.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Holder {
        #[serde(with = "crate::serde_pairs")]
        map: BTreeMap<(u64, u64), String>,
    }

    #[test]
    fn test_json_roundtrip_with_composite_keys() {
        let mut map = BTreeMap::new();
        map.insert((1, 2), "a".to_string());
        map.insert((3, 4), "b".to_string());
        let holder = Holder { map };

        let json = serde_json::to_string(&holder).unwrap();
        let back: Holder = serde_json::from_str(&json).unwrap();
        assert_eq!(holder, back);
    }

    #[test]
    fn test_binary_encoding_matches_plain_map() {
        let mut map = BTreeMap::new();
        map.insert((1u64, 2u64), "a".to_string());
        let holder = Holder { map: map.clone() };

        assert_eq!(
            bincode::serialize(&holder).unwrap(),
            bincode::serialize(&map).unwrap()
        );
    }
}
