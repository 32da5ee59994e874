//! Query template substitution.
//!
//! Arguments are escaped first and substituted second; a raw value never
//! reaches the query string.
use std::fmt;

use crate::{
    Result,
    escape::{EscapeError, IntoValue, Value},
};

/// Arguments for one templated query.
#[derive(Debug, Clone, PartialEq)]
pub enum Args {
    /// No substitution is performed, `%` is left untouched.
    None,
    /// A single value for a lone `%s`.
    Scalar(Value),
    /// Values substituted into `%s` placeholders in order.
    Positional(Vec<Value>),
    /// Values substituted into `%(name)s` placeholders by key.
    Named(Vec<(String, Value)>),
}

impl Args {
    /// Single value for a lone `%s`.
    pub fn scalar(value: impl IntoValue) -> Args {
        Args::Scalar(value.into_value())
    }

    /// Values for `%s` placeholders, in order.
    pub fn positional<I>(values: I) -> Args
    where
        I: IntoIterator,
        I::Item: IntoValue,
    {
        Args::Positional(values.into_iter().map(IntoValue::into_value).collect())
    }

    /// Values for `%(name)s` placeholders.
    pub fn named<K, V, I>(values: I) -> Args
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: IntoValue,
    {
        Args::Named(
            values
                .into_iter()
                .map(|(key, value)| (key.into(), value.into_value()))
                .collect(),
        )
    }
}

enum Escaped<'a> {
    Positional(Vec<String>),
    Named(Vec<(&'a str, String)>),
}

/// Substitute escaped `args` into the `%s` / `%(name)s` placeholders of
/// `query`. `%%` is a literal percent.
pub fn substitute(query: &str, args: &Args) -> Result<String> {
    let escaped = match args {
        Args::None => return Ok(query.to_owned()),
        Args::Scalar(value) => Escaped::Positional(vec![value.escape()?]),
        Args::Positional(values) => Escaped::Positional(
            values.iter().map(Value::escape).collect::<Result<_, EscapeError>>()?,
        ),
        Args::Named(pairs) => Escaped::Named(
            pairs
                .iter()
                .map(|(key, value)| Ok((key.as_str(), value.escape()?)))
                .collect::<Result<_, EscapeError>>()?,
        ),
    };

    let mut out = String::with_capacity(query.len());
    let mut next = 0;
    let mut rest = query;

    while let Some(at) = rest.find('%') {
        out.push_str(&rest[..at]);
        rest = &rest[at + 1..];

        match rest.as_bytes().first() {
            Some(b'%') => {
                out.push('%');
                rest = &rest[1..];
            }
            Some(b's') => {
                let Escaped::Positional(values) = &escaped else {
                    return Err(SubstituteError::MissingArgument.into());
                };
                let Some(value) = values.get(next) else {
                    return Err(SubstituteError::MissingArgument.into());
                };
                out.push_str(value);
                next += 1;
                rest = &rest[1..];
            }
            Some(b'(') => {
                let Some(close) = rest.find(')') else {
                    return Err(SubstituteError::Unsupported.into());
                };
                if !rest[close + 1..].starts_with('s') {
                    return Err(SubstituteError::Unsupported.into());
                }
                let key = &rest[1..close];

                let Escaped::Named(pairs) = &escaped else {
                    return Err(SubstituteError::MissingKey(key.to_owned()).into());
                };
                let Some((_, value)) = pairs.iter().find(|(name, _)| *name == key) else {
                    return Err(SubstituteError::MissingKey(key.to_owned()).into());
                };
                out.push_str(value);
                rest = &rest[close + 2..];
            }
            _ => return Err(SubstituteError::Unsupported.into()),
        }
    }
    out.push_str(rest);

    if let Escaped::Positional(values) = &escaped {
        if next < values.len() {
            return Err(SubstituteError::UnusedArgument(values.len() - next).into());
        }
    }

    Ok(out)
}

/// Placeholder and argument mismatch.
pub enum SubstituteError {
    /// More `%s` placeholders than positional arguments.
    MissingArgument,
    /// Positional arguments left unconsumed by the template.
    UnusedArgument(usize),
    /// `%(name)s` key missing from the named arguments.
    MissingKey(String),
    /// Placeholder syntax other than `%s`, `%(name)s` or `%%`.
    Unsupported,
}

impl std::error::Error for SubstituteError { }

impl fmt::Display for SubstituteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot substitute arguments, ")?;
        match self {
            Self::MissingArgument => write!(f, "not enough arguments for placeholders"),
            Self::UnusedArgument(n) => write!(f, "{n} argument(s) not converted"),
            Self::MissingKey(key) => write!(f, "key not found: {key:?}"),
            Self::Unsupported => write!(f, "unsupported placeholder"),
        }
    }
}

impl fmt::Debug for SubstituteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::error::ErrorKind;

    fn kind(err: crate::Error) -> String {
        format!("{}", err.kind())
    }

    #[test]
    fn positional() {
        let out = substitute(
            "SELECT * FROM users WHERE name = %s AND age > %s",
            &Args::positional(["O'Brien".into_value(), 30.into_value()]),
        )
        .unwrap();
        assert_eq!(out, r"SELECT * FROM users WHERE name = 'O\'Brien' AND age > 30");
    }

    #[test]
    fn named() {
        let out = substitute(
            "UPDATE t SET a = %(a)s WHERE b = %(b)s AND a != %(a)s",
            &Args::named([("a", 1), ("b", 2)]),
        )
        .unwrap();
        assert_eq!(out, "UPDATE t SET a = 1 WHERE b = 2 AND a != 1");
    }

    #[test]
    fn scalar() {
        let out = substitute("SELECT %s", &Args::scalar("x")).unwrap();
        assert_eq!(out, "SELECT 'x'");
    }

    #[test]
    fn literal_percent() {
        let out = substitute("SELECT '100%%' || %s", &Args::scalar("x")).unwrap();
        assert_eq!(out, "SELECT '100%' || 'x'");
    }

    #[test]
    fn none_leaves_query_untouched() {
        let out = substitute("SELECT '100%'", &Args::None).unwrap();
        assert_eq!(out, "SELECT '100%'");
    }

    #[test]
    fn argument_mismatch() {
        let err = substitute("SELECT %s, %s", &Args::scalar(1)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Substitute(SubstituteError::MissingArgument)));

        let err = substitute("SELECT %s", &Args::positional([1, 2])).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Substitute(SubstituteError::UnusedArgument(1))
        ));

        let err = substitute("SELECT %(missing)s", &Args::named([("here", 1)])).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Substitute(SubstituteError::MissingKey(_))));

        let err = substitute("SELECT %d", &Args::scalar(1)).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::Substitute(SubstituteError::Unsupported)));
    }

    #[test]
    fn escaping_happens_before_substitution() {
        // an injection attempt survives only as an inert quoted literal
        let out = substitute(
            "SELECT * FROM t WHERE n = %s",
            &Args::scalar("x'; DROP TABLE t; --"),
        )
        .unwrap();
        assert_eq!(out, r"SELECT * FROM t WHERE n = 'x\'; DROP TABLE t; --'");
    }

    #[test]
    fn unused_kind_helper() {
        // keep Display coverage for the error texts
        assert!(kind(SubstituteError::Unsupported.into()).contains("unsupported"));
    }
}
