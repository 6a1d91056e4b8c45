//! Narration templates: safe `{name}` substitution.
//!
//! Templates are user-supplied text such as
//! `"Salary paid for the month of {month} {cfl}"`. Only named placeholders
//! are recognized; format specs and conversions (`{month:>9}`, `{month!r}`)
//! are rejected so a template can never smuggle in formatting directives.
//! `{{` and `}}` produce literal braces. Nothing else in the text is touched.
//!
//! Templates are compiled once, before any row is mapped, so a bad template
//! fails the whole conversion instead of producing half-rendered narrations.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TemplateError;

pub const DEFAULT_DEBIT_TEMPLATE: &str = "Salary paid for the month of {month} {cfl}";
pub const DEFAULT_CREDIT_TEMPLATE: &str = "Salary credited for the month of {month}";

/// A recognized placeholder name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placeholder {
    Month,
    Cfl,
}

impl Placeholder {
    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Month => "month",
            Placeholder::Cfl => "cfl",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "month" => Some(Placeholder::Month),
            "cfl" => Some(Placeholder::Cfl),
            _ => None,
        }
    }
}

/// Which side of the transfer a narration is printed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NarrationKind {
    Debit,
    Credit,
}

impl NarrationKind {
    /// Placeholders this narration may use. The credit side has no CFL.
    pub fn available(&self) -> &'static [Placeholder] {
        match self {
            NarrationKind::Debit => &[Placeholder::Month, Placeholder::Cfl],
            NarrationKind::Credit => &[Placeholder::Month],
        }
    }
}

impl fmt::Display for NarrationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NarrationKind::Debit => write!(f, "debit"),
            NarrationKind::Credit => write!(f, "credit"),
        }
    }
}

/// Per-row substitution values.
#[derive(Debug, Clone, Copy)]
pub struct NarrationValues<'a> {
    pub month: &'a str,
    pub cfl: &'a str,
}

impl NarrationValues<'_> {
    fn get(&self, placeholder: Placeholder) -> &str {
        match placeholder {
            Placeholder::Month => self.month,
            Placeholder::Cfl => self.cfl,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Placeholder),
}

/// A compiled narration template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NarrationTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl NarrationTemplate {
    /// Compile `template`, allowing only `available` placeholders.
    ///
    /// `label` names the template in error messages ("debit", "credit").
    pub fn compile(
        label: &str,
        template: &str,
        available: &[Placeholder],
    ) -> Result<Self, TemplateError> {
        let chars: Vec<char> = template.chars().collect();
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut i = 0;

        while i < chars.len() {
            match chars[i] {
                '{' if chars.get(i + 1) == Some(&'{') => {
                    literal.push('{');
                    i += 2;
                }
                '}' if chars.get(i + 1) == Some(&'}') => {
                    literal.push('}');
                    i += 2;
                }
                '}' => {
                    return Err(TemplateError::UnbalancedBrace {
                        template: label.to_string(),
                        brace: '}',
                        position: i,
                    });
                }
                '{' => {
                    let start = i;
                    let close = chars[i + 1..]
                        .iter()
                        .position(|c| *c == '}' || *c == '{')
                        .map(|p| p + i + 1)
                        .filter(|p| chars[*p] == '}')
                        .ok_or_else(|| TemplateError::UnbalancedBrace {
                            template: label.to_string(),
                            brace: '{',
                            position: start,
                        })?;

                    let raw: String = chars[start + 1..close].iter().collect();
                    let placeholder = parse_placeholder(label, &raw, start, available)?;

                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Field(placeholder));
                    i = close + 1;
                }
                c => {
                    literal.push(c);
                    i += 1;
                }
            }
        }

        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
        })
    }

    /// Compile a debit or credit narration.
    pub fn for_kind(kind: NarrationKind, template: &str) -> Result<Self, TemplateError> {
        Self::compile(&kind.to_string(), template, kind.available())
    }

    /// Fill the template.
    pub fn render(&self, values: &NarrationValues<'_>) -> String {
        let mut out = String::with_capacity(self.source.len() + 16);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field(p) => out.push_str(values.get(*p)),
            }
        }
        out
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Placeholders used, in order of appearance.
    pub fn placeholders(&self) -> Vec<Placeholder> {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Field(p) => Some(*p),
                Segment::Literal(_) => None,
            })
            .collect()
    }
}

fn parse_placeholder(
    label: &str,
    raw: &str,
    position: usize,
    available: &[Placeholder],
) -> Result<Placeholder, TemplateError> {
    if raw.is_empty() {
        return Err(TemplateError::EmptyPlaceholder {
            template: label.to_string(),
            position,
        });
    }

    if raw.contains([':', '!', '.', '[']) {
        return Err(TemplateError::FormatDirective {
            template: label.to_string(),
            raw: raw.to_string(),
        });
    }

    Placeholder::from_name(raw)
        .filter(|p| available.contains(p))
        .ok_or_else(|| TemplateError::UnknownPlaceholder {
            template: label.to_string(),
            name: raw.to_string(),
            available: available
                .iter()
                .map(|p| format!("{{{}}}", p.name()))
                .collect::<Vec<_>>()
                .join(", "),
        })
}

/// One-shot render. `{cfl}` is only available when `cfl` is `Some`.
pub fn render_narration(
    template: &str,
    month: &str,
    cfl: Option<&str>,
) -> Result<String, TemplateError> {
    let available: &[Placeholder] = if cfl.is_some() {
        &[Placeholder::Month, Placeholder::Cfl]
    } else {
        &[Placeholder::Month]
    };
    let compiled = NarrationTemplate::compile("narration", template, available)?;
    Ok(compiled.render(&NarrationValues {
        month,
        cfl: cfl.unwrap_or(""),
    }))
}
