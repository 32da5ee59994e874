//! Literal value escaping.
//!
//! Renders a native value as a literal token safe to substitute into a query
//! string. Dispatch is a single match over [`Value`] so new kinds are added
//! in one place; the table never changes at runtime.
use rust_decimal::Decimal;
use std::fmt::{self, Write};
use time::{Date, Duration, PrimitiveDateTime, Time};

/// A native value together with its kind tag.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Decimal(Decimal),
    Date(Date),
    Time(Time),
    DateTime(PrimitiveDateTime),
    Duration(Duration),
    /// Renders parenthesized, for `IN (...)` clauses.
    Seq(Vec<Value>),
    /// Renders as a bare comma-joined list, no parentheses.
    Set(Vec<Value>),
    /// Not a literal; only valid for keyed substitution.
    Map(Vec<(String, Value)>),
}

impl Value {
    /// Render self as a literal token.
    ///
    /// Pure and deterministic; never touches the network.
    pub fn escape(&self) -> Result<String, EscapeError> {
        let mut out = String::new();
        self.escape_into(&mut out)?;
        Ok(out)
    }

    fn escape_into(&self, out: &mut String) -> Result<(), EscapeError> {
        match self {
            Value::Null => out.push_str("NULL"),
            Value::Bool(b) => out.push_str(match b {
                true => "true",
                false => "false",
            }),
            Value::Int(i) => out.push_str(itoa::Buffer::new().format(*i)),
            Value::Float(f) => {
                if !f.is_finite() {
                    return Err(EscapeError::NonFinite);
                }
                // fixed-point, never scientific notation
                write!(out, "{f:.15}").expect("fmt to String is infallible");
            }
            Value::Str(s) => escape_str_into(s, out),
            Value::Bytes(b) => escape_str_into(&String::from_utf8_lossy(b), out),
            Value::Decimal(d) => write!(out, "{d}").expect("fmt to String is infallible"),
            Value::Date(d) => {
                out.push('\'');
                date_into(*d, out);
                out.push('\'');
            }
            Value::Time(t) => {
                out.push('\'');
                time_into(*t, out);
                out.push('\'');
            }
            Value::DateTime(dt) => {
                out.push('\'');
                date_into(dt.date(), out);
                out.push(' ');
                time_into(dt.time(), out);
                out.push('\'');
            }
            Value::Duration(d) => duration_into(*d, out),
            Value::Seq(items) => {
                out.push('(');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.escape_into(out)?;
                }
                out.push(')');
            }
            Value::Set(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        out.push(',');
                    }
                    item.escape_into(out)?;
                }
            }
            Value::Map(_) => return Err(EscapeError::NoLiteral("map")),
        }
        Ok(())
    }
}

/// Replace every control or quoting character by its two-character escape
/// form, wrap in single quotes.
fn escape_str_into(s: &str, out: &mut String) {
    out.push('\'');
    for c in s.chars() {
        match c {
            '\0' => out.push_str("\\0"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\x1a' => out.push_str("\\Z"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            c => out.push(c),
        }
    }
    out.push('\'');
}

fn date_into(d: Date, out: &mut String) {
    write!(out, "{:04}-{:02}-{:02}", d.year(), d.month() as u8, d.day())
        .expect("fmt to String is infallible");
}

/// `HH:MM:SS`, fractional suffix only when the sub-second part is non-zero.
fn time_into(t: Time, out: &mut String) {
    write!(out, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second())
        .expect("fmt to String is infallible");
    if t.microsecond() != 0 {
        write!(out, ".{:06}", t.microsecond()).expect("fmt to String is infallible");
    }
}

/// `'HH:MM:SS'` where hours run past 24 for multi-day durations.
fn duration_into(d: Duration, out: &mut String) {
    let abs = d.abs();
    let secs = abs.whole_seconds();
    let micros = abs.subsec_microseconds();

    out.push('\'');
    if d.is_negative() {
        out.push('-');
    }
    write!(out, "{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60)
        .expect("fmt to String is infallible");
    if micros != 0 {
        write!(out, ".{micros:06}").expect("fmt to String is infallible");
    }
    out.push('\'');
}

/// A value with no literal form.
pub enum EscapeError {
    /// Non-finite floats have no fixed-point literal.
    NonFinite,
    /// Kind cannot be rendered as a single literal token.
    NoLiteral(&'static str),
}

impl std::error::Error for EscapeError { }

impl fmt::Display for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("cannot escape value, ")?;
        match self {
            Self::NonFinite => write!(f, "float is not finite"),
            Self::NoLiteral(kind) => write!(f, "{kind} has no literal form"),
        }
    }
}

impl fmt::Debug for EscapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{self}\"")
    }
}

/// Conversion into a [`Value`] for argument binding.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

macro_rules! into_value {
    ($ty:ty => |$v:ident| $body:expr) => {
        impl IntoValue for $ty {
            fn into_value(self) -> Value {
                let $v = self;
                $body
            }
        }
    };
}

into_value!(bool => |v| Value::Bool(v));
into_value!(i8 => |v| Value::Int(v.into()));
into_value!(i16 => |v| Value::Int(v.into()));
into_value!(i32 => |v| Value::Int(v.into()));
into_value!(i64 => |v| Value::Int(v));
into_value!(u8 => |v| Value::Int(v.into()));
into_value!(u16 => |v| Value::Int(v.into()));
into_value!(u32 => |v| Value::Int(v.into()));
into_value!(f32 => |v| Value::Float(v.into()));
into_value!(f64 => |v| Value::Float(v));
into_value!(&str => |v| Value::Str(v.to_owned()));
into_value!(String => |v| Value::Str(v));
into_value!(&[u8] => |v| Value::Bytes(v.to_vec()));
into_value!(Vec<u8> => |v| Value::Bytes(v));
into_value!(Decimal => |v| Value::Decimal(v));
into_value!(Date => |v| Value::Date(v));
into_value!(Time => |v| Value::Time(v));
into_value!(PrimitiveDateTime => |v| Value::DateTime(v));
into_value!(Duration => |v| Value::Duration(v));
into_value!(Vec<Value> => |v| Value::Seq(v));

#[cfg(test)]
mod test {
    use super::*;
    use time::Month;

    fn escape(value: Value) -> String {
        value.escape().unwrap()
    }

    #[test]
    fn escape_str() {
        assert_eq!(escape(Value::Str("O'Brien".into())), r"'O\'Brien'");
        assert_eq!(escape(Value::Str("line\nbreak".into())), r"'line\nbreak'");
        assert_eq!(escape(Value::Str("back\\slash".into())), r"'back\\slash'");
        assert_eq!(escape(Value::Str("nul\0quote\"".into())), r#"'nul\0quote\"'"#);
        assert_eq!(escape(Value::Str("ctrl\x1az".into())), r"'ctrl\Zz'");
        assert_eq!(escape(Value::Str("plain".into())), "'plain'");
    }

    #[test]
    fn escape_float_fixed_point() {
        let out = escape(Value::Float(3.14));
        let (_, frac) = out.split_once('.').unwrap();
        assert_eq!(frac.len(), 15);
        assert!(out.starts_with("3.14"));

        assert!(Value::Float(f64::NAN).escape().is_err());
        assert!(Value::Float(f64::INFINITY).escape().is_err());
    }

    #[test]
    fn escape_scalars() {
        assert_eq!(escape(Value::Null), "NULL");
        assert_eq!(escape(Value::Bool(true)), "true");
        assert_eq!(escape(Value::Int(-42)), "-42");
        assert_eq!(escape(Value::Decimal("1.500".parse().unwrap())), "1.500");
        assert_eq!(escape(Value::Bytes(b"it's".to_vec())), r"'it\'s'");
    }

    #[test]
    fn seq_parenthesized_set_bare() {
        let items = vec![Value::Int(1), Value::Str("a".into()), Value::Null];
        assert_eq!(escape(Value::Seq(items.clone())), "(1,'a',NULL)");
        assert_eq!(escape(Value::Set(items)), "1,'a',NULL");
    }

    #[test]
    fn map_is_not_a_literal() {
        let map = Value::Map(vec![("k".into(), Value::Int(1))]);
        assert!(map.escape().is_err());
        assert!(Value::Seq(vec![map]).escape().is_err());
    }

    #[test]
    fn escape_temporal() {
        let date = Date::from_calendar_date(2007, Month::February, 25).unwrap();
        assert_eq!(escape(Value::Date(date)), "'2007-02-25'");

        let time = Time::from_hms(22, 32, 17).unwrap();
        assert_eq!(escape(Value::Time(time)), "'22:32:17'");

        let micro = Time::from_hms_micro(22, 32, 17, 300).unwrap();
        assert_eq!(escape(Value::Time(micro)), "'22:32:17.000300'");

        let dt = PrimitiveDateTime::new(date, time);
        assert_eq!(escape(Value::DateTime(dt)), "'2007-02-25 22:32:17'");
    }

    #[test]
    fn escape_duration_past_midnight() {
        let d = Duration::hours(25) + Duration::minutes(6) + Duration::seconds(17);
        assert_eq!(escape(Value::Duration(d)), "'25:06:17'");
        assert_eq!(escape(Value::Duration(-d)), "'-25:06:17'");

        let sub = Duration::seconds(3) + Duration::microseconds(1500);
        assert_eq!(escape(Value::Duration(sub)), "'00:00:03.001500'");
    }
}
