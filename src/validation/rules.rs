//! Reusable rule building blocks shared by the tool rule sets.

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::marker::PhantomData;

/// The entries of a JSON object in document order. Repeated keys are kept so
/// rules can report them; a map type would silently keep only the last one.
#[derive(Debug, Clone, PartialEq)]
pub struct Entries<V>(Vec<(String, V)>);

impl<V> Default for Entries<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Entries<V> {
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(key, _)| key.as_str())
    }

    /// First value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&V> {
        self.iter().find(|(k, _)| *k == key).map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V> FromIterator<(String, V)> for Entries<V> {
    fn from_iter<I: IntoIterator<Item = (String, V)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for Entries<V> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct EntriesVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for EntriesVisitor<V> {
            type Value = Entries<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a JSON object")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, V>()? {
                    entries.push(entry);
                }
                Ok(Entries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor(PhantomData))
    }
}

/// One of two mutually exclusive inputs.
#[derive(Debug, Clone, PartialEq)]
pub enum OneOf<A, B> {
    First(A),
    Second(B),
}

/// Why an exactly-one-of check failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Both,
    Neither,
}

pub fn exactly_one<A, B>(first: Option<A>, second: Option<B>) -> Result<OneOf<A, B>, Presence> {
    match (first, second) {
        (Some(a), None) => Ok(OneOf::First(a)),
        (None, Some(b)) => Ok(OneOf::Second(b)),
        (Some(_), Some(_)) => Err(Presence::Both),
        (None, None) => Err(Presence::Neither),
    }
}

/// Items that fail `predicate`, in input order.
pub fn nonconforming<'a, T, P>(items: impl IntoIterator<Item = &'a T>, predicate: P) -> Vec<&'a T>
where
    T: ?Sized + 'a,
    P: Fn(&T) -> bool,
{
    items.into_iter().filter(|item| !predicate(item)).collect()
}

/// Keys that do not appear in `allowed`, in input order.
pub fn keys_outside<'a>(
    keys: impl IntoIterator<Item = &'a str>,
    allowed: &HashSet<&str>,
) -> Vec<&'a str> {
    keys.into_iter().filter(|key| !allowed.contains(key)).collect()
}

/// Each repeated item once, in the order its first repeat occurs.
pub fn duplicates<'a>(items: impl IntoIterator<Item = &'a str>) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    let mut reported = HashSet::new();
    let mut out = Vec::new();

    for item in items {
        if !seen.insert(item) && reported.insert(item) {
            out.push(item);
        }
    }
    out
}

/// Interpret a JSON value as a `[lower, upper]` pair of finite numbers.
pub fn bound_pair(value: &Value) -> Option<(f64, f64)> {
    match value.as_array()?.as_slice() {
        [lower, upper] => {
            let (lower, upper) = (lower.as_f64()?, upper.as_f64()?);
            (lower.is_finite() && upper.is_finite()).then_some((lower, upper))
        }
        _ => None,
    }
}

pub fn strictly_ordered(lower: f64, upper: f64) -> bool {
    lower < upper
}

/// ModelSEED compound identifiers: `cpd` followed by five digits.
pub fn is_compound_id(id: &str) -> bool {
    id.len() == 8
        && id.starts_with("cpd")
        && id[3..].bytes().all(|b| b.is_ascii_digit())
}
