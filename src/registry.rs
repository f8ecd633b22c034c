//! Name lookup tables for the pluggable strategy families.
//!
//! Every family (distance metrics, map metrics, neighborhoods, decays,
//! normalizers) is a closed enum. Its textual form is a name followed by
//! whitespace-separated positional numbers, e.g. `"polynomial 0.5 0.01 2"`.
//! A [`Registry`] maps each name to the argument counts it accepts and a
//! constructor; each family builds its registry once, on first use.

use crate::error::{KohonenError, Result};
use std::collections::HashMap;

/// Constructor for a registry entry, called with the parsed arguments.
pub type Constructor<T> = fn(&[f64]) -> Result<T>;

/// One named variant of a strategy family.
pub struct Entry<T> {
    /// Identifier used in the textual form.
    pub name: &'static str,
    /// Accepted positional argument counts.
    pub arities: &'static [usize],
    /// Builds the variant from its arguments.
    pub build: Constructor<T>,
}

/// Name to constructor table for one strategy family.
pub struct Registry<T> {
    kind: &'static str,
    entries: Vec<Entry<T>>,
    by_name: HashMap<&'static str, usize>,
}

impl<T> Registry<T> {
    /// Builds a registry.
    ///
    /// # Panics
    ///
    /// Panics if two entries share a name.
    pub fn new(kind: &'static str, entries: Vec<Entry<T>>) -> Self {
        let mut by_name = HashMap::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let previous = by_name.insert(entry.name, i);
            assert!(
                previous.is_none(),
                "duplicate {} name '{}'",
                kind,
                entry.name
            );
        }

        Self {
            kind,
            entries,
            by_name,
        }
    }

    /// Family name used in error messages.
    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Registered names, in registration order.
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|e| e.name).collect()
    }

    /// Parses the textual form `"name arg1 arg2 ..."`.
    pub fn parse(&self, text: &str) -> Result<T> {
        let mut parts = text.split_whitespace();
        let name = parts.next().ok_or_else(|| KohonenError::UnknownIdentifier {
            kind: self.kind,
            name: text.to_string(),
        })?;

        let entry = self
            .by_name
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| KohonenError::UnknownIdentifier {
                kind: self.kind,
                name: name.to_string(),
            })?;

        let args = parts
            .map(|p| {
                p.parse::<f64>().map_err(|_| KohonenError::InvalidArgument {
                    name: name.to_string(),
                    message: format!("'{}' is not a number", p),
                })
            })
            .collect::<Result<Vec<f64>>>()?;

        if !entry.arities.contains(&args.len()) {
            let expected = entry
                .arities
                .iter()
                .map(|a| a.to_string())
                .collect::<Vec<_>>()
                .join(" or ");
            return Err(KohonenError::ArgumentCount {
                name: name.to_string(),
                expected,
                found: args.len(),
            });
        }

        (entry.build)(&args)
    }
}

/// Implements `FromStr`, `TryFrom<String>` and `From<T> for String` for a
/// family type, given an expression yielding its registry. The type must
/// implement `Display` in the textual form; serde then (de)serializes it as
/// a string via `#[serde(try_from = "String", into = "String")]`.
macro_rules! text_form {
    ($ty:ty, $registry:expr) => {
        impl std::str::FromStr for $ty {
            type Err = crate::error::KohonenError;

            fn from_str(s: &str) -> crate::error::Result<Self> {
                $registry.parse(s)
            }
        }

        impl TryFrom<String> for $ty {
            type Error = crate::error::KohonenError;

            fn try_from(s: String) -> crate::error::Result<Self> {
                s.parse()
            }
        }

        impl From<$ty> for String {
            fn from(value: $ty) -> String {
                value.to_string()
            }
        }
    };
}

pub(crate) use text_form;

/// Formats a name and its arguments in the textual form.
pub(crate) fn format_spec(name: &str, args: &[f64]) -> String {
    let mut out = name.to_string();
    for a in args {
        out.push(' ');
        out.push_str(&a.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Shape {
        Point,
        Circle(f64),
    }

    fn registry() -> Registry<Shape> {
        Registry::new(
            "shape",
            vec![
                Entry {
                    name: "point",
                    arities: &[0],
                    build: |_| Ok(Shape::Point),
                },
                Entry {
                    name: "circle",
                    arities: &[1],
                    build: |a| Ok(Shape::Circle(a[0])),
                },
            ],
        )
    }

    #[test]
    fn test_parse() {
        let reg = registry();
        assert_eq!(reg.parse("point").unwrap(), Shape::Point);
        assert_eq!(reg.parse("  circle   2.5 ").unwrap(), Shape::Circle(2.5));
        assert_eq!(reg.names(), vec!["point", "circle"]);
    }

    #[test]
    fn test_unknown_name() {
        let err = registry().parse("square 1").unwrap_err();
        match err {
            KohonenError::UnknownIdentifier { kind, name } => {
                assert_eq!(kind, "shape");
                assert_eq!(name, "square");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(registry().parse("").is_err());
    }

    #[test]
    fn test_argument_count() {
        let err = registry().parse("circle 1 2").unwrap_err();
        assert!(matches!(err, KohonenError::ArgumentCount { found: 2, .. }));
    }

    #[test]
    fn test_invalid_number() {
        let err = registry().parse("circle big").unwrap_err();
        assert!(matches!(err, KohonenError::InvalidArgument { .. }));
    }

    #[test]
    #[should_panic(expected = "duplicate shape name 'point'")]
    fn test_duplicate_names_rejected() {
        Registry::<Shape>::new(
            "shape",
            vec![
                Entry {
                    name: "point",
                    arities: &[0],
                    build: |_| Ok(Shape::Point),
                },
                Entry {
                    name: "point",
                    arities: &[0],
                    build: |_| Ok(Shape::Point),
                },
            ],
        );
    }

    #[test]
    fn test_format_spec() {
        assert_eq!(format_spec("linear", &[0.5, 0.01]), "linear 0.5 0.01");
        assert_eq!(format_spec("box", &[]), "box");
    }
}
