//! The route pattern compiler.
//!
//! A pattern is ordinary regex text interspersed with typed placeholders:
//!
//! | Token | Parameter |
//! |-------|-----------|
//! | `{{i}}` | required `i64` |
//! | `{{d}}` | required `f64` |
//! | `{{s:R}}` | required `String` matching the nested regex `R` |
//! | `{{i?:C}}` | optional `i64`, `C` consumed and discarded with it |
//! | `{{d?:C}}` | optional `f64` |
//! | `{{s?:R:C}}` | optional `String` |
//!
//! Compilation turns the pattern into one anchored regex with a named capture
//! group per placeholder (`__0`, `__1`, ... in source order) plus the ordered
//! schema of parameter types.

use crate::hanami_error::PatternError;
use crate::util::unwrap_ok;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::fmt::{Display, Formatter};

/// The type of one route parameter. A compiled pattern's schema is an ordered
/// sequence of these; handlers are checked against it at route construction.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum RouteParamType {
  /// `{{i}}`
  Int64,
  /// `{{d}}`
  Double,
  /// `{{s:R}}`
  String,
  /// `{{i?:C}}`
  OptionalInt64,
  /// `{{d?:C}}`
  OptionalDouble,
  /// `{{s?:R:C}}`
  OptionalString,
}

impl Display for RouteParamType {
  fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
    match self {
      RouteParamType::Int64 => f.write_str("Int64"),
      RouteParamType::Double => f.write_str("Double"),
      RouteParamType::String => f.write_str("String"),
      RouteParamType::OptionalInt64 => f.write_str("OptionalInt64"),
      RouteParamType::OptionalDouble => f.write_str("OptionalDouble"),
      RouteParamType::OptionalString => f.write_str("OptionalString"),
    }
  }
}

/// One extracted route parameter, tagged with its type.
#[derive(Clone, Debug, PartialEq)]
pub enum PathArg {
  /// A required integer.
  Int(i64),
  /// A required double.
  Double(f64),
  /// A required string.
  Str(String),
  /// An optional integer.
  OptInt(Option<i64>),
  /// An optional double.
  OptDouble(Option<f64>),
  /// An optional string.
  OptStr(Option<String>),
}

/// The ordered extracted parameters of one matched request, in pattern order.
///
/// The typed accessors abort on a tag mismatch: the construction-time schema
/// check makes a mismatch unreachable, so hitting one is a library bug.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathArgs(Vec<PathArg>);

impl PathArgs {
  /// Wraps a list of extracted parameters.
  pub fn new(args: Vec<PathArg>) -> Self {
    Self(args)
  }

  /// The number of parameters.
  pub fn len(&self) -> usize {
    self.0.len()
  }

  /// Returns `true` if there are no parameters.
  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  /// The raw tagged value at `index`.
  pub fn get(&self, index: usize) -> Option<&PathArg> {
    self.0.get(index)
  }

  /// The required integer at `index`.
  pub fn int(&self, index: usize) -> i64 {
    match self.0.get(index) {
      Some(PathArg::Int(v)) => *v,
      _ => crate::util::unreachable(),
    }
  }

  /// The required double at `index`.
  pub fn double(&self, index: usize) -> f64 {
    match self.0.get(index) {
      Some(PathArg::Double(v)) => *v,
      _ => crate::util::unreachable(),
    }
  }

  /// The required string at `index`.
  pub fn string(&self, index: usize) -> &str {
    match self.0.get(index) {
      Some(PathArg::Str(v)) => v.as_str(),
      _ => crate::util::unreachable(),
    }
  }

  /// The optional integer at `index`.
  pub fn opt_int(&self, index: usize) -> Option<i64> {
    match self.0.get(index) {
      Some(PathArg::OptInt(v)) => *v,
      _ => crate::util::unreachable(),
    }
  }

  /// The optional double at `index`.
  pub fn opt_double(&self, index: usize) -> Option<f64> {
    match self.0.get(index) {
      Some(PathArg::OptDouble(v)) => *v,
      _ => crate::util::unreachable(),
    }
  }

  /// The optional string at `index`.
  pub fn opt_string(&self, index: usize) -> Option<&str> {
    match self.0.get(index) {
      Some(PathArg::OptStr(v)) => v.as_deref(),
      _ => crate::util::unreachable(),
    }
  }

  /// Unwraps into the underlying list.
  pub fn into_vec(self) -> Vec<PathArg> {
    self.0
  }
}

/// A compiled pattern: the anchored regex plus the ordered parameter schema.
#[derive(Clone, Debug)]
pub struct CompiledPattern {
  pub(crate) regex: Regex,
  pub(crate) schema: Vec<RouteParamType>,
}

static PLACEHOLDER_SCANNER: Lazy<Regex> = Lazy::new(|| {
  unwrap_ok(Regex::new(concat!(
    r"(?P<int>\{\{i\}\})",
    r"|(?P<optional_int>\{\{i\?(?::(?P<optional_int_consumed>.+?))?\}\})",
    r"|(?P<double>\{\{d\}\})",
    r"|(?P<optional_double>\{\{d\?(?::(?P<optional_double_consumed>.+?))?\}\})",
    r"|(?P<string>\{\{s:(?P<string_regex>.+?)\}\})",
    r"|(?P<optional_string>\{\{s\?:(?P<optional_string_regex>.+?)(?::(?P<optional_string_consumed>.+?))?\}\})",
  )))
});

struct Replacement {
  original: String,
  substitute: String,
}

fn validate_nested_regex(pattern: &str, token: &str, fragment: &str) -> Result<(), PatternError> {
  Regex::new(fragment).map(|_| ()).map_err(|e| PatternError::NestedRegex {
    pattern: pattern.to_string(),
    token: token.to_string(),
    error: e.to_string(),
  })
}

fn scan_placeholders(
  pattern: &str,
) -> Result<(Vec<Replacement>, Vec<RouteParamType>), PatternError> {
  let mut replacements = Vec::new();
  let mut schema = Vec::new();

  for m in PLACEHOLDER_SCANNER.captures_iter(pattern) {
    let index = replacements.len();
    if let Some(token) = m.name("int") {
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?P<__{index}>[+-]?\d+)"),
      });
      schema.push(RouteParamType::Int64);
    } else if let Some(token) = m.name("optional_int") {
      let consumed = m.name("optional_int_consumed").map(|c| c.as_str()).unwrap_or("");
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?:(?P<__{index}>[+-]?\d+){consumed})?"),
      });
      schema.push(RouteParamType::OptionalInt64);
    } else if let Some(token) = m.name("double") {
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?P<__{index}>[+-]?\d+(?:\.\d+)?)"),
      });
      schema.push(RouteParamType::Double);
    } else if let Some(token) = m.name("optional_double") {
      let consumed = m.name("optional_double_consumed").map(|c| c.as_str()).unwrap_or("");
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?:(?P<__{index}>[+-]?\d+(?:\.\d+)?){consumed})?"),
      });
      schema.push(RouteParamType::OptionalDouble);
    } else if let Some(token) = m.name("string") {
      let fragment = m.name("string_regex").map(|c| c.as_str()).unwrap_or("");
      validate_nested_regex(pattern, token.as_str(), fragment)?;
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?P<__{index}>{fragment})"),
      });
      schema.push(RouteParamType::String);
    } else if let Some(token) = m.name("optional_string") {
      let fragment = m.name("optional_string_regex").map(|c| c.as_str()).unwrap_or("");
      let consumed = m.name("optional_string_consumed").map(|c| c.as_str()).unwrap_or("");
      validate_nested_regex(pattern, token.as_str(), fragment)?;
      replacements.push(Replacement {
        original: token.as_str().to_string(),
        substitute: format!(r"(?:(?P<__{index}>{fragment}){consumed})?"),
      });
      schema.push(RouteParamType::OptionalString);
    }
  }

  Ok((replacements, schema))
}

/// Compiles a route pattern into its regex and parameter schema.
///
/// Text outside placeholders is copied verbatim and may itself be regex. The
/// resulting regex only matches complete paths.
pub(crate) fn compile_pattern(pattern: &str) -> Result<CompiledPattern, PatternError> {
  let (replacements, schema) = scan_placeholders(pattern)?;

  // Substitute as a second step, with a cursor that never rewinds. Every
  // recorded token must still be present at or after the cursor.
  let mut final_route = pattern.to_string();
  let mut cursor = 0usize;
  for replacement in &replacements {
    let found = final_route
      .get(cursor..)
      .and_then(|tail| tail.find(replacement.original.as_str()))
      .map(|offset| offset + cursor)
      .ok_or_else(|| PatternError::SubstitutionInvariant {
        pattern: pattern.to_string(),
        token: replacement.original.clone(),
      })?;
    final_route.replace_range(found..found + replacement.original.len(), &replacement.substitute);
    cursor = found + replacement.substitute.len();
  }

  let regex = Regex::new(&format!(r"\A(?:{final_route})\z")).map_err(|e| {
    PatternError::OuterRegex { pattern: pattern.to_string(), error: e.to_string() }
  })?;

  Ok(CompiledPattern { regex, schema })
}

fn parse_int_saturating(text: &str) -> i64 {
  // Overflow in either direction substitutes the maximum representable value.
  text.parse::<i64>().unwrap_or(i64::MAX)
}

fn parse_double_saturating(text: &str) -> f64 {
  match text.parse::<f64>() {
    Ok(v) => v,
    Err(_) => {
      if text.starts_with('-') {
        f64::NEG_INFINITY
      } else {
        f64::INFINITY
      }
    }
  }
}

/// Parses one captured group into its tagged value. `text` is `None` when the
/// group did not participate in the match, which is only legal for optional
/// parameter types.
pub(crate) fn parse_capture(ty: RouteParamType, text: Option<&str>) -> PathArg {
  match ty {
    RouteParamType::Int64 => {
      PathArg::Int(parse_int_saturating(crate::util::unwrap_some(text)))
    }
    RouteParamType::Double => {
      PathArg::Double(parse_double_saturating(crate::util::unwrap_some(text)))
    }
    RouteParamType::String => PathArg::Str(crate::util::unwrap_some(text).to_string()),
    RouteParamType::OptionalInt64 => PathArg::OptInt(text.map(parse_int_saturating)),
    RouteParamType::OptionalDouble => PathArg::OptDouble(text.map(parse_double_saturating)),
    RouteParamType::OptionalString => PathArg::OptStr(text.map(str::to_string)),
  }
}

/// Snapshots the capture groups of a match into owned per-parameter texts, in
/// schema order.
pub(crate) fn snapshot_captures(
  schema: &[RouteParamType],
  captures: &Captures<'_>,
) -> Vec<Option<String>> {
  schema
    .iter()
    .enumerate()
    .map(|(i, _)| captures.name(&format!("__{i}")).map(|m| m.as_str().to_string()))
    .collect()
}

/// Parses the snapshotted capture texts into tagged values, in schema order.
pub(crate) fn extract_args(schema: &[RouteParamType], raw: &[Option<String>]) -> PathArgs {
  PathArgs::new(
    schema
      .iter()
      .zip(raw.iter())
      .map(|(ty, text)| parse_capture(*ty, text.as_deref()))
      .collect(),
  )
}
