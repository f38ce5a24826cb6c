//! Deferred references and the template strings that embed them.
//!
//! A deferred reference names a value the provisioning system substitutes at
//! deployment instantiation: a deployment parameter, or an attribute of another
//! resource in the same graph. Synthesis can carry these references around and
//! write them into the artifact, but it can never turn one into a string it
//! computes with.
//!
//! # Placeholder Formats
//!
//! - `$${param:<name>}` - the value of a declared deployment parameter
//! - `$${resource:<id>:<attribute>}` - an attribute (`name`, `arn`, ...) of a resource
//!
//! # Shell and Script Variables
//!
//! Single `$` characters pass through unchanged, so inline code such as
//! `` `file-${Date.now()}.txt` `` or `$HOME` needs no escaping.
//!
//! # Escaping
//!
//! Use `$$$` before `{` to produce a literal `$${` sequence. In general, a run
//! of `$` directly before `{` is read by its length: an odd run of `2k - 1`
//! is `k` literal dollars and a literal `{`, an even run of `2k + 2` is `k`
//! literal dollars followed by a placeholder. Runs not followed by `{` are
//! literal as written. [`render`] applies the same rule in reverse, so
//! `parse(&render(segments))` gives the segments back.
//!
//! # Example
//!
//! ```
//! use condstack_lib::reference::{parse, DeferredRef, Segment};
//!
//! let segments = parse("bucket=$${resource:custom-bucket:name} $HOME").unwrap();
//! assert_eq!(segments, vec![
//!     Segment::Literal("bucket=".to_string()),
//!     Segment::Ref(DeferredRef::resource("custom-bucket", "name")),
//!     Segment::Literal(" $HOME".to_string()),
//! ]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::graph::ResourceId;

/// A value known only once the stack is instantiated.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeferredRef {
  /// `$${param:<name>}`
  Parameter(String),

  /// `$${resource:<id>:<attribute>}`
  Resource { id: ResourceId, attribute: String },
}

impl DeferredRef {
  pub fn parameter(name: impl Into<String>) -> Self {
    DeferredRef::Parameter(name.into())
  }

  pub fn resource(id: impl Into<String>, attribute: impl Into<String>) -> Self {
    DeferredRef::Resource {
      id: ResourceId::new(id),
      attribute: attribute.into(),
    }
  }
}

impl fmt::Display for DeferredRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      DeferredRef::Parameter(name) => write!(f, "$${{param:{name}}}"),
      DeferredRef::Resource { id, attribute } => write!(f, "$${{resource:{id}:{attribute}}}"),
    }
  }
}

/// A segment of parsed text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Segment {
  /// Literal text (no placeholders)
  Literal(String),

  /// A reference left for the provisioning system
  Ref(DeferredRef),
}

/// Errors that can occur during placeholder parsing or substitution.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum ReferenceError {
  #[error("unclosed placeholder at position {0}")]
  Unclosed(usize),

  #[error("unknown placeholder type: {0}")]
  UnknownType(String),

  #[error("malformed placeholder: {0}")]
  Malformed(String),

  #[error("unresolved parameter: {0}")]
  UnresolvedParameter(String),

  #[error("unresolved resource: {id} attribute '{attribute}'")]
  UnresolvedResource { id: String, attribute: String },
}

/// Supplies concrete values for deferred references.
///
/// Synthesis never implements this; only code modelling a deployment does.
pub trait Resolver {
  fn resolve_parameter(&self, name: &str) -> Result<String, ReferenceError>;

  fn resolve_resource(&self, id: &str, attribute: &str) -> Result<String, ReferenceError>;
}

/// Parse a string containing placeholders into segments.
///
/// # Errors
///
/// Returns an error if a placeholder is malformed (unclosed, unknown type, etc.)
pub fn parse(input: &str) -> Result<Vec<Segment>, ReferenceError> {
  let mut segments = Vec::new();
  let mut literal = String::new();
  let mut chars = input.char_indices().peekable();

  while let Some((pos, ch)) = chars.next() {
    if ch != '$' {
      literal.push(ch);
      continue;
    }

    let mut run = 1;
    while chars.next_if(|&(_, c)| c == '$').is_some() {
      run += 1;
    }

    if chars.next_if(|&(_, c)| c == '{').is_none() {
      // `$HOME`, `$$variable`, a trailing `$`
      push_dollars(&mut literal, run);
      continue;
    }

    if run % 2 == 1 {
      // `${Date.now()}` in inline code, or an escaped `$${`
      push_dollars(&mut literal, run.div_ceil(2));
      literal.push('{');
      continue;
    }

    push_dollars(&mut literal, (run - 2) / 2);
    if !literal.is_empty() {
      segments.push(Segment::Literal(std::mem::take(&mut literal)));
    }

    let mut content = String::new();
    let mut found_close = false;

    for (_, c) in chars.by_ref() {
      if c == '}' {
        found_close = true;
        break;
      }
      content.push(c);
    }

    if !found_close {
      return Err(ReferenceError::Unclosed(pos + run - 2));
    }

    segments.push(Segment::Ref(parse_placeholder_content(&content)?));
  }

  if !literal.is_empty() {
    segments.push(Segment::Literal(literal));
  }

  Ok(segments)
}

fn push_dollars(out: &mut String, count: usize) {
  out.extend(std::iter::repeat_n('$', count));
}

/// Parse the content inside a placeholder (everything between `$${` and `}`).
fn parse_placeholder_content(content: &str) -> Result<DeferredRef, ReferenceError> {
  let (kind, rest) = content
    .split_once(':')
    .ok_or_else(|| ReferenceError::Malformed(format!("missing colon in '{content}'")))?;

  match kind {
    "param" => {
      if rest.is_empty() || rest.contains(':') {
        return Err(ReferenceError::Malformed(format!("param placeholder needs one name: '{content}'")));
      }
      Ok(DeferredRef::parameter(rest))
    }
    "resource" => {
      let (id, attribute) = rest
        .split_once(':')
        .ok_or_else(|| ReferenceError::Malformed(format!("resource placeholder missing attribute: '{content}'")))?;
      if id.is_empty() || attribute.is_empty() {
        return Err(ReferenceError::Malformed(format!("empty id or attribute in '{content}'")));
      }
      Ok(DeferredRef::resource(id, attribute))
    }
    _ => Err(ReferenceError::UnknownType(kind.to_string())),
  }
}

/// Substitute all placeholders in a string using the provided resolver.
pub fn substitute(input: &str, resolver: &impl Resolver) -> Result<String, ReferenceError> {
  let segments = parse(input)?;
  substitute_segments(&segments, resolver)
}

/// Substitute placeholders in pre-parsed segments.
pub fn substitute_segments(segments: &[Segment], resolver: &impl Resolver) -> Result<String, ReferenceError> {
  let mut result = String::new();

  for segment in segments {
    match segment {
      Segment::Literal(s) => result.push_str(s),
      Segment::Ref(r) => {
        let value = resolve(r, resolver)?;
        result.push_str(&value);
      }
    }
  }

  Ok(result)
}

pub fn resolve(reference: &DeferredRef, resolver: &impl Resolver) -> Result<String, ReferenceError> {
  match reference {
    DeferredRef::Parameter(name) => resolver.resolve_parameter(name),
    DeferredRef::Resource { id, attribute } => resolver.resolve_resource(id.as_str(), attribute),
  }
}

/// Render segments back to placeholder text.
///
/// Literal dollars directly before a `{` or a placeholder are escaped per the
/// run-length rule in the module docs.
pub fn render(segments: &[Segment]) -> String {
  let mut out = String::new();
  // literal `$`s not yet written, carried across segment boundaries
  let mut dollars = 0;

  for segment in segments {
    match segment {
      Segment::Literal(s) => {
        for ch in s.chars() {
          match ch {
            '$' => dollars += 1,
            '{' if dollars > 0 => {
              push_dollars(&mut out, 2 * dollars - 1);
              dollars = 0;
              out.push('{');
            }
            _ => {
              push_dollars(&mut out, dollars);
              dollars = 0;
              out.push(ch);
            }
          }
        }
      }
      Segment::Ref(r) => {
        push_dollars(&mut out, 2 * dollars);
        dollars = 0;
        out.push_str(&r.to_string());
      }
    }
  }

  push_dollars(&mut out, dollars);
  out
}

/// A string attribute with embedded deferred references.
///
/// Serializes as its placeholder text so artifacts stay readable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Template(Vec<Segment>);

impl Template {
  pub fn parse(input: &str) -> Result<Self, ReferenceError> {
    parse(input).map(Template)
  }

  pub fn segments(&self) -> &[Segment] {
    &self.0
  }

  pub fn references(&self) -> impl Iterator<Item = &DeferredRef> {
    self.0.iter().filter_map(|s| match s {
      Segment::Ref(r) => Some(r),
      Segment::Literal(_) => None,
    })
  }
}

impl TryFrom<String> for Template {
  type Error = ReferenceError;

  fn try_from(value: String) -> Result<Self, Self::Error> {
    Template::parse(&value)
  }
}

impl From<Template> for String {
  fn from(value: Template) -> Self {
    render(&value.0)
  }
}

impl fmt::Display for Template {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&render(&self.0))
  }
}
