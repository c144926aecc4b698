//! Selectors used in component cost specs to pick ports (`i`, `k`) and
//! channel numbers (`j`, `l`): `"*"`, a single number, or a range list such
//! as `"1-10,12,17-20"`.

use crate::error::{OnraError, OnraResult};
use serde::de::{Deserializer, Error as DeError};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeSet;

/// A port/channel selector from a cost spec entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// `"*"` - matches everything.
    Any,
    /// An explicit set of numbers.
    Nos(BTreeSet<u32>),
}

impl Selector {
    /// Parse `"1-10,12"` style text (or a bare number) into a selector.
    pub fn parse(txt: &str) -> OnraResult<Selector> {
        let txt = txt.trim();
        if txt == "*" {
            return Ok(Selector::Any);
        }
        let mut nos = BTreeSet::new();
        for part in txt.split(',') {
            let bounds: Vec<&str> = part.split('-').collect();
            match bounds.as_slice() {
                [single] => {
                    nos.insert(parse_no(single)?);
                }
                [start, end] => {
                    let start = parse_no(start)?;
                    let end = parse_no(end)?;
                    for no in start..=end {
                        nos.insert(no);
                    }
                }
                _ => {
                    return Err(OnraError::Parse(format!("invalid selector range: {part}")));
                }
            }
        }
        Ok(Selector::Nos(nos))
    }

    /// Whether the selector matches a number.
    pub fn matches(&self, no: u32) -> bool {
        match self {
            Selector::Any => true,
            Selector::Nos(nos) => nos.contains(&no),
        }
    }

    /// The explicit numbers of the selector, or `None` for `Any`.
    pub fn nos(&self) -> Option<&BTreeSet<u32>> {
        match self {
            Selector::Any => None,
            Selector::Nos(nos) => Some(nos),
        }
    }
}

fn parse_no(txt: &str) -> OnraResult<u32> {
    txt.trim()
        .parse::<u32>()
        .map_err(|e| OnraError::Parse(format!("invalid selector number '{txt}': {e}")))
}

// Cost specs write selectors either as JSON numbers or as strings.
impl<'de> Deserialize<'de> for Selector {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Num(u32),
            Text(String),
        }
        match Raw::deserialize(deserializer)? {
            Raw::Num(no) => Ok(Selector::Nos(BTreeSet::from([no]))),
            Raw::Text(txt) => Selector::parse(&txt).map_err(D::Error::custom),
        }
    }
}

impl Serialize for Selector {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Selector::Any => serializer.serialize_str("*"),
            Selector::Nos(nos) => {
                let txt: Vec<String> = nos.iter().map(|n| n.to_string()).collect();
                serializer.serialize_str(&txt.join(","))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn star_matches_everything() {
        let s = Selector::parse("*").unwrap();
        assert!(s.matches(1));
        assert!(s.matches(999));
    }

    #[test]
    fn range_list_expands() {
        let s = Selector::parse("1-3,7,9-10").unwrap();
        for no in [1, 2, 3, 7, 9, 10] {
            assert!(s.matches(no), "expected {no} to match");
        }
        assert!(!s.matches(4));
        assert!(!s.matches(8));
    }

    #[test]
    fn json_number_and_string_both_deserialize() {
        let from_num: Selector = serde_json::from_str("29").unwrap();
        assert!(from_num.matches(29));
        assert!(!from_num.matches(30));

        let from_str: Selector = serde_json::from_str("\"1-3\"").unwrap();
        assert!(from_str.matches(2));

        let star: Selector = serde_json::from_str("\"*\"").unwrap();
        assert_eq!(star, Selector::Any);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(Selector::parse("1-2-3").is_err());
        assert!(Selector::parse("abc").is_err());
    }
}
