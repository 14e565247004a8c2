use std::{
    fmt,
    iter::Peekable,
    str::Chars,
};

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::BatchError;

/// A typed value bound to a `?` placeholder of a statement template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Double(f64),
    Text(String),
    Bytes(Vec<u8>),
    Timestamp(NaiveDateTime),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Double(v) => write!(f, "{}", v),
            Value::Text(v) => write!(f, "'{}'", v),
            Value::Bytes(v) => write!(f, "<{} bytes>", v.len()),
            Value::Timestamp(v) => write!(f, "'{}'", v),
        }
    }
}

macro_rules! impl_from_value {
    ($($source:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$source> for Value {
                fn from(value: $source) -> Self {
                    Value::$variant(value.into())
                }
            }
        )*
    };
}

impl_from_value! {
    bool => Bool,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Int,
    u16 => Int,
    u32 => Int,
    f32 => Double,
    f64 => Double,
    String => Text,
    &str => Text,
    Vec<u8> => Bytes,
    NaiveDateTime => Timestamp,
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

/// Highest parameter index SQLite accepts by default.
const MAX_PARAMETER_INDEX: usize = 32766;

/// Counts the parameters a SQL template expects.
///
/// Positional placeholders are bare `?`, numbered `?NNN` and `$NNN`. As in
/// SQLite, a bare `?` takes the index after the largest one seen so far, and
/// a numbered placeholder may repeat: `?1 + ?1` expects a single parameter.
/// The count is the largest index.
///
/// Text inside single-quoted literals, quoted identifiers (`"..."`, `` `...` ``,
/// `[...]`), `--` line comments and `/* */` block comments is skipped.
///
/// # Errors
///
/// `BatchError::UnsupportedPlaceholder` for named placeholders (`:name`,
/// `@name`, `$name`) and for numbered ones that are zero or out of range:
/// parameters are bound by position only.
pub fn count_placeholders(template: &str) -> Result<usize, BatchError> {
    #[derive(PartialEq)]
    enum Scan {
        Code,
        Literal,
        Identifier(char),
        LineComment,
        BlockComment,
    }

    let unsupported = |placeholder: String| BatchError::UnsupportedPlaceholder {
        template: template.to_string(),
        placeholder,
    };

    let mut state = Scan::Code;
    let mut highest = 0;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        state = match state {
            Scan::Code => match c {
                '?' | '$' => {
                    let mut digits = String::new();
                    while let Some(d) = chars.next_if(char::is_ascii_digit) {
                        digits.push(d);
                    }
                    if !digits.is_empty() {
                        match digits.parse::<usize>() {
                            Ok(index) if (1..=MAX_PARAMETER_INDEX).contains(&index) => {
                                highest = highest.max(index);
                            }
                            _ => return Err(unsupported(format!("{}{}", c, digits))),
                        }
                    } else if c == '?' {
                        highest += 1;
                    } else if let Some(name) = take_name(&mut chars) {
                        return Err(unsupported(format!("{}{}", c, name)));
                    }
                    Scan::Code
                }
                ':' | '@' => match take_name(&mut chars) {
                    Some(name) => return Err(unsupported(format!("{}{}", c, name))),
                    None => Scan::Code,
                },
                '\'' => Scan::Literal,
                '"' => Scan::Identifier('"'),
                '`' => Scan::Identifier('`'),
                '[' => Scan::Identifier(']'),
                '-' if chars.peek() == Some(&'-') => {
                    chars.next();
                    Scan::LineComment
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    Scan::BlockComment
                }
                _ => Scan::Code,
            },
            // A doubled quote is an escaped quote: leaving and re-entering yields the same state.
            Scan::Literal if c == '\'' => Scan::Code,
            Scan::Identifier(close) if c == close => Scan::Code,
            Scan::LineComment if c == '\n' => Scan::Code,
            Scan::BlockComment if c == '*' && chars.peek() == Some(&'/') => {
                chars.next();
                Scan::Code
            }
            other => other,
        };
    }

    Ok(highest)
}

/// Consumes an identifier starting right after a `:`, `@` or `$` sigil.
fn take_name(chars: &mut Peekable<Chars<'_>>) -> Option<String> {
    let first = chars.next_if(|c| c.is_alphabetic() || *c == '_')?;
    let mut name = String::from(first);
    while let Some(c) = chars.next_if(|c| c.is_alphanumeric() || *c == '_') {
        name.push(c);
    }
    Some(name)
}

/// One parameterized mutation: a SQL template and the values bound to its
/// placeholders, in order.
///
/// A `Statement` is validated when it is built and cannot be changed afterwards.
///
/// # Examples
///
/// ```
/// use batch_tx::core::statement::{Statement, Value};
///
/// let statement = Statement::new(
///     "update transactions set transaction_amount=? where id=?",
///     vec![Value::from(123.4), Value::from(341)],
/// )
/// .unwrap();
/// assert_eq!(statement.parameters().len(), 2);
///
/// assert!(Statement::new("update transactions set transaction_amount=?", vec![]).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedStatement")]
pub struct Statement {
    template: String,
    parameters: Vec<Value>,
}

#[derive(Deserialize)]
struct UncheckedStatement {
    template: String,
    #[serde(default)]
    parameters: Vec<Value>,
}

impl TryFrom<UncheckedStatement> for Statement {
    type Error = BatchError;

    fn try_from(unchecked: UncheckedStatement) -> Result<Self, Self::Error> {
        Statement::new(unchecked.template, unchecked.parameters)
    }
}

impl Statement {
    /// Builds a statement, checking that `parameters` fills every placeholder of `template`.
    ///
    /// # Errors
    ///
    /// `BatchError::MalformedStatement` when the template is blank or the
    /// parameter count differs from the placeholder count.
    /// `BatchError::UnsupportedPlaceholder` when the template uses named placeholders.
    pub fn new(template: impl Into<String>, parameters: Vec<Value>) -> Result<Self, BatchError> {
        let template = template.into();
        let expected = count_placeholders(&template)?;
        Self::checked(template, expected, parameters)
    }

    /// Builds a statement without parameters.
    pub fn raw(sql: impl Into<String>) -> Result<Self, BatchError> {
        Self::new(sql, Vec::new())
    }

    fn checked(template: String, expected: usize, parameters: Vec<Value>) -> Result<Self, BatchError> {
        if template.trim().is_empty() || parameters.len() != expected {
            return Err(BatchError::MalformedStatement {
                template,
                expected,
                actual: parameters.len(),
            });
        }
        Ok(Self {
            template,
            parameters,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn parameters(&self) -> &[Value] {
        &self.parameters
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.template)?;
        if !self.parameters.is_empty() {
            let values: Vec<String> = self.parameters.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", values.join(", "))?;
        }
        Ok(())
    }
}

/// A reusable template whose placeholders are counted once and then bound to
/// many rows of parameters, like a prepared statement filled in a loop.
///
/// ```
/// use batch_tx::core::statement::{StatementTemplate, Value};
///
/// let update = StatementTemplate::new("update transactions set transaction_amount=? where id=?").unwrap();
/// let statement = update.bind(vec![Value::from(1.0), Value::from(341)]).unwrap();
/// assert_eq!(statement.template(), update.template());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct StatementTemplate {
    template: String,
    placeholders: usize,
}

impl StatementTemplate {
    pub fn new(template: impl Into<String>) -> Result<Self, BatchError> {
        let template = template.into();
        if template.trim().is_empty() {
            return Err(BatchError::MalformedStatement {
                template,
                expected: 0,
                actual: 0,
            });
        }
        let placeholders = count_placeholders(&template)?;
        Ok(Self {
            template,
            placeholders,
        })
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Number of parameters each bound row must fill.
    pub fn placeholders(&self) -> usize {
        self.placeholders
    }

    pub fn bind(&self, parameters: Vec<Value>) -> Result<Statement, BatchError> {
        Statement::checked(self.template.clone(), self.placeholders, parameters)
    }
}
