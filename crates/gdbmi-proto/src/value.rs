//! The value tree carried by keyed records.
//!
//! Four node kinds cover every piece of record data: a quoted constant, a
//! `{name=value,...}` tuple, a `[...]` list, and a `name=value` pair. Nodes
//! are immutable once built and own their children outright.

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};

use crate::error::ValueError;

/// A node of the value tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Leaf text, stored exactly as it appeared between the quotes.
    Const(String),
    /// Keyed collection with unique names.
    Tuple(Tuple),
    /// Ordered collection; elements may be of any kind.
    List(List),
    /// A name bound to a nested value.
    Named(Named),
}

impl Value {
    /// Build a constant.
    pub fn constant(text: impl Into<String>) -> Self {
        Value::Const(text.into())
    }

    /// Build a named value, rejecting an empty name.
    pub fn named(name: impl Into<String>, value: Value) -> Result<Self, ValueError> {
        Named::new(name, value).map(Value::Named)
    }

    /// Short lowercase name of the node kind, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Const(_) => "const",
            Value::Tuple(_) => "tuple",
            Value::List(_) => "list",
            Value::Named(_) => "named",
        }
    }

    /// Look up a child by name.
    ///
    /// Named values delegate to the value they wrap.
    pub fn by_key(&self, key: &str) -> Result<&Value, ValueError> {
        match self {
            Value::Tuple(tuple) => tuple.by_key(key),
            Value::Named(named) => named.value().by_key(key),
            Value::Const(_) | Value::List(_) => Err(ValueError::NotKeyed(self.kind())),
        }
    }

    /// Look up a child by name, returning `None` on any miss.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.by_key(key).ok()
    }

    /// Look up a child by position.
    pub fn by_index(&self, index: usize) -> Result<&Value, ValueError> {
        match self {
            Value::Tuple(tuple) => tuple.by_index(index),
            Value::List(list) => list.by_index(index),
            Value::Named(named) => named.value().by_index(index),
            Value::Const(_) => Err(ValueError::NotIndexable(self.kind())),
        }
    }

    /// Number of children. Constants have none.
    pub fn len(&self) -> usize {
        match self {
            Value::Const(_) => 0,
            Value::Tuple(tuple) => tuple.len(),
            Value::List(list) => list.len(),
            Value::Named(named) => named.value().len(),
        }
    }

    /// Whether [`len`](Self::len) is zero.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a keyed lookup for `key` would succeed.
    pub fn contains_key(&self, key: &str) -> bool {
        self.by_key(key).is_ok()
    }

    /// Children in order. Tuple children are yielded without their names.
    pub fn children(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Value::Const(_) => Box::new(std::iter::empty()),
            Value::Tuple(tuple) => Box::new(tuple.values()),
            Value::List(list) => Box::new(list.iter()),
            Value::Named(named) => named.value().children(),
        }
    }

    /// Raw text of a constant, or of a named constant.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Const(text) => Some(text),
            Value::Named(named) => match named.value() {
                Value::Const(text) => Some(text),
                _ => None,
            },
            _ => None,
        }
    }

    /// Parse the constant text into `T`.
    pub fn parse<T: FromStr>(&self) -> Option<T> {
        self.as_str().and_then(|text| text.parse().ok())
    }

    /// Constant text with C-style escapes resolved.
    pub fn unescaped(&self) -> Option<String> {
        self.as_str().map(unescape)
    }

    /// The tuple behind this value, looking through a name.
    pub fn as_tuple(&self) -> Option<&Tuple> {
        match self {
            Value::Tuple(tuple) => Some(tuple),
            Value::Named(named) => named.value().as_tuple(),
            _ => None,
        }
    }

    /// The list behind this value, looking through a name.
    pub fn as_list(&self) -> Option<&List> {
        match self {
            Value::List(list) => Some(list),
            Value::Named(named) => named.value().as_list(),
            _ => None,
        }
    }

    /// The name/value pair, if this is a named value.
    pub fn as_named(&self) -> Option<&Named> {
        match self {
            Value::Named(named) => Some(named),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::Const(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::Const(text)
    }
}

impl From<Tuple> for Value {
    fn from(tuple: Tuple) -> Self {
        Value::Tuple(tuple)
    }
}

impl From<List> for Value {
    fn from(list: List) -> Self {
        Value::List(list)
    }
}

impl From<Named> for Value {
    fn from(named: Named) -> Self {
        Value::Named(named)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Const(text) => write!(f, "\"{text}\""),
            Value::Tuple(tuple) => fmt::Display::fmt(tuple, f),
            Value::List(list) => fmt::Display::fmt(list, f),
            Value::Named(named) => fmt::Display::fmt(named, f),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Const(text) => serializer.serialize_str(text),
            Value::Tuple(tuple) => tuple.serialize(serializer),
            Value::List(list) => list.serialize(serializer),
            Value::Named(named) => named.serialize(serializer),
        }
    }
}

// ---------------------------------------------------------------------------
// Named
// ---------------------------------------------------------------------------

/// A `name=value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Named {
    name: String,
    value: Box<Value>,
}

impl Named {
    /// Bind `value` to `name`. The name must contain non-whitespace text.
    pub fn new(name: impl Into<String>, value: Value) -> Result<Self, ValueError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(ValueError::EmptyName);
        }
        Ok(Self {
            name,
            value: Box::new(value),
        })
    }

    /// The bound name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound value.
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Split into name and value.
    pub fn into_parts(self) -> (String, Value) {
        (self.name, *self.value)
    }
}

impl fmt::Display for Named {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.name, self.value)
    }
}

impl Serialize for Named {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(&self.name, self.value.as_ref())?;
        map.end()
    }
}

// ---------------------------------------------------------------------------
// Tuple
// ---------------------------------------------------------------------------

/// An ordered mapping from unique names to values.
///
/// When built from pairs that repeat a name, the last pair wins and the
/// entry takes the position of that last occurrence.
#[derive(Debug, Clone, Default)]
pub struct Tuple {
    entries: IndexMap<String, Value>,
}

impl Tuple {
    /// An empty tuple.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from named pairs, collapsing repeated names.
    pub fn from_named<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = Named>,
    {
        let mut entries = IndexMap::new();
        for named in pairs {
            let (name, value) = named.into_parts();
            entries.shift_remove(&name);
            entries.insert(name, value);
        }
        Self { entries }
    }

    /// Build from arbitrary values; every value must be [`Value::Named`].
    pub fn try_from_values<I>(values: I) -> Result<Self, ValueError>
    where
        I: IntoIterator<Item = Value>,
    {
        let pairs = values
            .into_iter()
            .map(|value| match value {
                Value::Named(named) => Ok(named),
                _ => Err(ValueError::UnnamedTupleEntry),
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_named(pairs))
    }

    /// Look up an entry by name.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Look up an entry by name, failing with [`ValueError::KeyNotFound`].
    pub fn by_key(&self, key: &str) -> Result<&Value, ValueError> {
        self.get(key)
            .ok_or_else(|| ValueError::KeyNotFound(key.to_string()))
    }

    /// Look up an entry by position.
    pub fn by_index(&self, index: usize) -> Result<&Value, ValueError> {
        self.entries
            .get_index(index)
            .map(|(_, value)| value)
            .ok_or(ValueError::IndexOutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tuple has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether an entry named `key` exists.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Entry names in order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Entry values in order.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.entries.values()
    }

    /// `(name, value)` pairs in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }
}

// IndexMap equality ignores order; tuples compare entry by entry.
impl PartialEq for Tuple {
    fn eq(&self, other: &Self) -> bool {
        self.entries.len() == other.entries.len() && self.entries.iter().eq(other.entries.iter())
    }
}

impl Eq for Tuple {}

impl FromIterator<Named> for Tuple {
    fn from_iter<I: IntoIterator<Item = Named>>(iter: I) -> Self {
        Self::from_named(iter)
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.entries.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{name}={value}")?;
        }
        f.write_str("}")
    }
}

impl Serialize for Tuple {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

// ---------------------------------------------------------------------------
// List
// ---------------------------------------------------------------------------

/// An ordered sequence of values with no uniqueness constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct List {
    elements: Vec<Value>,
}

impl List {
    /// Wrap a vector of elements.
    pub fn new(elements: Vec<Value>) -> Self {
        Self { elements }
    }

    /// Element at `index`, or `None`.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.elements.get(index)
    }

    /// Element at `index`, failing with [`ValueError::IndexOutOfRange`].
    pub fn by_index(&self, index: usize) -> Result<&Value, ValueError> {
        self.get(index).ok_or(ValueError::IndexOutOfRange {
            index,
            len: self.len(),
        })
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Whether the list has no elements.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Elements in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Value> {
        self.elements.iter()
    }
}

impl FromIterator<Value> for List {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a List {
    type Item = &'a Value;
    type IntoIter = std::slice::Iter<'a, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl fmt::Display for List {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.elements.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            fmt::Display::fmt(value, f)?;
        }
        f.write_str("]")
    }
}

impl Serialize for List {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.elements.len()))?;
        for value in &self.elements {
            seq.serialize_element(value)?;
        }
        seq.end()
    }
}

// ---------------------------------------------------------------------------
// Escapes
// ---------------------------------------------------------------------------

/// Resolve C-style escapes as emitted in constant and stream text.
///
/// Octal escapes (`\NNN`) produce raw bytes, which are decoded as UTF-8
/// with invalid sequences replaced. Unknown escapes are kept verbatim.
pub fn unescape(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b'\\' || i + 1 >= bytes.len() {
            out.push(b);
            i += 1;
            continue;
        }
        let next = bytes[i + 1];
        i += 2;
        match next {
            b'n' => out.push(b'\n'),
            b't' => out.push(b'\t'),
            b'r' => out.push(b'\r'),
            b'a' => out.push(0x07),
            b'b' => out.push(0x08),
            b'f' => out.push(0x0c),
            b'v' => out.push(0x0b),
            b'e' => out.push(0x1b),
            b'"' | b'\\' | b'\'' => out.push(next),
            b'0'..=b'7' => {
                let mut code = u32::from(next - b'0');
                let mut digits = 1;
                while digits < 3 && i < bytes.len() && (b'0'..=b'7').contains(&bytes[i]) {
                    code = code * 8 + u32::from(bytes[i] - b'0');
                    i += 1;
                    digits += 1;
                }
                out.push((code & 0xff) as u8);
            }
            other => {
                out.push(b'\\');
                out.push(other);
            }
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn named(name: &str, value: Value) -> Named {
        Named::new(name, value).unwrap()
    }

    fn sample_tuple() -> Tuple {
        Tuple::from_named(vec![
            named("id", Value::constant("17")),
            named("type", Value::constant("process")),
        ])
    }

    #[test]
    fn const_renders_with_quotes() {
        assert_eq!(Value::constant("0xefffeb7c").to_string(), "\"0xefffeb7c\"");
    }

    #[test]
    fn const_equality_is_textual() {
        assert_eq!(Value::constant("1"), Value::from("1"));
        assert_ne!(Value::constant("1"), Value::constant("01"));
    }

    #[test]
    fn named_rejects_blank_name() {
        assert_eq!(
            Named::new("", Value::constant("x")).unwrap_err(),
            ValueError::EmptyName
        );
        assert_eq!(
            Value::named("  ", Value::constant("x")).unwrap_err(),
            ValueError::EmptyName
        );
    }

    #[test]
    fn tuple_collapses_duplicates_last_wins() {
        let tuple = Tuple::from_named(vec![
            named("reason", Value::constant("a")),
            named("signal", Value::constant("SIGSEGV")),
            named("reason", Value::constant("b")),
        ]);
        assert_eq!(tuple.len(), 2);
        assert_eq!(tuple.get("reason"), Some(&Value::constant("b")));
        let keys: Vec<&str> = tuple.keys().collect();
        assert_eq!(keys, vec!["signal", "reason"]);
    }

    #[test]
    fn tuple_try_from_values_rejects_unnamed() {
        let result = Tuple::try_from_values(vec![Value::constant("x")]);
        assert_eq!(result.unwrap_err(), ValueError::UnnamedTupleEntry);
    }

    #[test]
    fn tuple_lookup_by_key_and_index() {
        let tuple = sample_tuple();
        assert_eq!(tuple.by_key("id").unwrap(), &Value::constant("17"));
        assert_eq!(tuple.by_index(1).unwrap(), &Value::constant("process"));
        assert_eq!(
            tuple.by_key("pid").unwrap_err(),
            ValueError::KeyNotFound("pid".into())
        );
        assert_eq!(
            tuple.by_index(2).unwrap_err(),
            ValueError::IndexOutOfRange { index: 2, len: 2 }
        );
    }

    #[test]
    fn tuple_equality_is_order_sensitive() {
        let a = sample_tuple();
        let b = Tuple::from_named(vec![
            named("type", Value::constant("process")),
            named("id", Value::constant("17")),
        ]);
        assert_ne!(a, b);
        assert_eq!(a, sample_tuple());
    }

    #[test]
    fn tuple_renders_as_braced_pairs() {
        assert_eq!(sample_tuple().to_string(), r#"{id="17",type="process"}"#);
        assert_eq!(Tuple::new().to_string(), "{}");
    }

    #[test]
    fn list_renders_and_indexes() {
        let list = List::new(vec![Value::constant("async"), Value::constant("python")]);
        assert_eq!(list.to_string(), r#"["async","python"]"#);
        assert_eq!(list.by_index(1).unwrap(), &Value::constant("python"));
        assert!(list.by_index(5).is_err());
    }

    #[test]
    fn const_is_not_keyed_or_indexable() {
        let value = Value::constant("1");
        assert_eq!(value.by_key("x").unwrap_err(), ValueError::NotKeyed("const"));
        assert_eq!(
            value.by_index(0).unwrap_err(),
            ValueError::NotIndexable("const")
        );
        assert_eq!(value.len(), 0);
        assert!(!value.contains_key("x"));
    }

    #[test]
    fn list_is_not_keyed() {
        let value = Value::List(List::default());
        assert_eq!(value.by_key("x").unwrap_err(), ValueError::NotKeyed("list"));
    }

    #[test]
    fn named_delegates_to_inner_value() {
        let value = Value::Named(named("bkpt", Value::Tuple(sample_tuple())));
        assert_eq!(value.len(), 2);
        assert_eq!(value.by_key("id").unwrap(), &Value::constant("17"));
        assert_eq!(value.by_index(1).unwrap(), &Value::constant("process"));
        assert!(value.contains_key("type"));
        assert_eq!(value.to_string(), r#"bkpt={id="17",type="process"}"#);
    }

    #[test]
    fn as_str_sees_through_named_const() {
        let value = Value::Named(named("line", Value::constant("68")));
        assert_eq!(value.as_str(), Some("68"));
        assert_eq!(value.parse::<u32>(), Some(68));
        assert_eq!(Value::Tuple(Tuple::new()).as_str(), None);
        assert_eq!(Value::constant("abc").parse::<i64>(), None);
    }

    #[test]
    fn children_iterates_in_order() {
        let value = Value::Tuple(sample_tuple());
        let texts: Vec<&str> = value.children().filter_map(Value::as_str).collect();
        assert_eq!(texts, vec!["17", "process"]);
        assert_eq!(Value::constant("x").children().count(), 0);
    }

    #[test]
    fn serializes_to_json_shapes() {
        let value = Value::List(List::new(vec![
            Value::Tuple(sample_tuple()),
            Value::Named(named("n", Value::constant("1"))),
        ]));
        let json = serde_json::to_value(&value).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{"id": "17", "type": "process"}, {"n": "1"}])
        );
    }

    #[test]
    fn unescape_handles_common_escapes() {
        assert_eq!(unescape(r#"Hello\n"#), "Hello\n");
        assert_eq!(unescape(r#"say \"hi\"\t\\"#), "say \"hi\"\t\\");
        assert_eq!(unescape(r"\101\102"), "AB");
        assert_eq!(unescape(r"\303\251"), "é");
        assert_eq!(unescape(r"keep \q"), r"keep \q");
        assert_eq!(unescape("trailing\\"), "trailing\\");
    }
}
