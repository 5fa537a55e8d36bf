//! `MiValue`: the value side of a parsed GDB/MI record.

use std::fmt;

/// An ordered mapping from field name to [`MiValue`] that preserves
/// duplicate keys.
///
/// GDB/MI tuples are legal with repeated names (e.g.
/// `thread-ids={thread-id="1",thread-id="2"}`). Rather than silently
/// dropping duplicates, each entry after the first is stored under its
/// name suffixed with `#<n>` (`thread-id`, `thread-id#1`, `thread-id#2`,
/// ...), and [`MiTuple::all`] returns every value sharing a name prefix
/// for callers that iterate by known prefix.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize)]
pub struct MiTuple {
    entries: Vec<(String, MiValue)>,
}

impl MiTuple {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a field, suffixing the key with `#<n>` if `name` has been
    /// seen before in this tuple.
    pub fn push(&mut self, name: String, value: MiValue) {
        let count = self.entries.iter().filter(|(k, _)| k == &name).count();
        let key = if count == 0 {
            name
        } else {
            format!("{name}#{count}")
        };
        self.entries.push((key, value));
    }

    /// Look up the first (un-suffixed) occurrence of `name`.
    pub fn get(&self, name: &str) -> Option<&MiValue> {
        self.entries.iter().find(|(k, _)| k == name).map(|(_, v)| v)
    }

    /// All values whose key equals `name` or `name#<n>`, in insertion
    /// order — for consumers that know a field repeats.
    pub fn all<'a, 'b>(&'a self, name: &'b str) -> impl Iterator<Item = &'a MiValue> + 'b
    where
        'a: 'b,
    {
        self.entries.iter().filter_map(move |(k, v)| {
            let is_match = k == name
                || k.strip_prefix(name)
                    .and_then(|rest| rest.strip_prefix('#'))
                    .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()));
            is_match.then_some(v)
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MiValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn get_const(&self, name: &str) -> Result<&str, MiFieldError> {
        match self.get(name) {
            Some(MiValue::Const(s)) => Ok(s.as_str()),
            Some(other) => Err(MiFieldError::WrongShape {
                field: name.to_string(),
                found: other.shape_name(),
            }),
            None => Err(MiFieldError::Missing(name.to_string())),
        }
    }

    pub fn get_tuple(&self, name: &str) -> Result<&MiTuple, MiFieldError> {
        match self.get(name) {
            Some(MiValue::Tuple(t)) => Ok(t),
            Some(other) => Err(MiFieldError::WrongShape {
                field: name.to_string(),
                found: other.shape_name(),
            }),
            None => Err(MiFieldError::Missing(name.to_string())),
        }
    }

    pub fn get_list(&self, name: &str) -> Result<&[MiValue], MiFieldError> {
        match self.get(name) {
            Some(MiValue::List(l)) => Ok(l.as_slice()),
            Some(other) => Err(MiFieldError::WrongShape {
                field: name.to_string(),
                found: other.shape_name(),
            }),
            None => Err(MiFieldError::Missing(name.to_string())),
        }
    }
}

/// A typed error produced when code reaches into a parsed [`MiTuple`] by
/// name and the expected shape is absent — see spec §9 "Dynamic property
/// access in MI results".
#[derive(Debug, Clone, thiserror::Error)]
pub enum MiFieldError {
    #[error("missing field '{0}'")]
    Missing(String),
    #[error("field '{field}' has unexpected shape '{found}'")]
    WrongShape { field: String, found: &'static str },
}

/// One value in the GDB/MI value grammar.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(tag = "kind", content = "value")]
pub enum MiValue {
    Const(String),
    Tuple(MiTuple),
    List(Vec<MiValue>),
}

impl MiValue {
    fn shape_name(&self) -> &'static str {
        match self {
            MiValue::Const(_) => "const",
            MiValue::Tuple(_) => "tuple",
            MiValue::List(_) => "list",
        }
    }

    pub fn as_const(&self) -> Option<&str> {
        match self {
            MiValue::Const(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&MiTuple> {
        match self {
            MiValue::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[MiValue]> {
        match self {
            MiValue::List(l) => Some(l),
            _ => None,
        }
    }
}

impl fmt::Display for MiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MiValue::Const(s) => write!(f, "{s:?}"),
            MiValue::Tuple(t) => {
                write!(f, "{{")?;
                for (i, (k, v)) in t.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{k}={v}")?;
                }
                write!(f, "}}")
            }
            MiValue::List(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{v}")?;
                }
                write!(f, "]")
            }
        }
    }
}
