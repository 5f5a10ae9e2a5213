//! Evaluation options and `> !#` file option parsing.

use bon::Builder;

/// How line breaks in a top-level string result are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineBreakStyle {
    /// Output is returned unchanged.
    #[default]
    Default,
    /// Every `\n` is doubled so markdown renderers keep the break.
    Markdown,
}

/// Options controlling evaluation.
///
/// Unset fields fall back to the options declared in the root file, and
/// then to the defaults (lenient, no null substitution, default line
/// breaks).
///
/// # Example
///
/// ```
/// use lg::{EvaluationOptions, LineBreakStyle};
///
/// let options = EvaluationOptions::builder()
///     .strict(true)
///     .line_break_style(LineBreakStyle::Markdown)
///     .build();
/// assert!(options.is_strict());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Builder)]
pub struct EvaluationOptions {
    /// Missing or failing expressions are errors.
    pub strict: Option<bool>,
    /// Replacement text for `null` expression results; `${path}` is replaced
    /// by the expression's source.
    #[builder(into)]
    pub null_substitution: Option<String>,
    pub line_break_style: Option<LineBreakStyle>,
}

impl EvaluationOptions {
    /// Build options from raw `> !#` lines such as `@strict = true`.
    ///
    /// Unknown keys and malformed values are ignored.
    pub fn from_file_options(lines: &[String]) -> Self {
        let mut options = Self::default();
        for (key, value) in lines.iter().filter_map(|line| parse_option(line)) {
            match key.as_str() {
                "strict" => options.strict = value.parse::<bool>().ok(),
                "replacenull" => options.null_substitution = Some(value),
                "linebreakstyle" => {
                    options.line_break_style = match value.to_lowercase().as_str() {
                        "markdown" => Some(LineBreakStyle::Markdown),
                        "default" => Some(LineBreakStyle::Default),
                        _ => None,
                    };
                }
                _ => {}
            }
        }
        options
    }

    /// Fill unset fields from `fallback`.
    pub fn merge(self, fallback: &EvaluationOptions) -> Self {
        Self {
            strict: self.strict.or(fallback.strict),
            null_substitution: self
                .null_substitution
                .or_else(|| fallback.null_substitution.clone()),
            line_break_style: self.line_break_style.or(fallback.line_break_style),
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict.unwrap_or(false)
    }

    pub fn line_breaks(&self) -> LineBreakStyle {
        self.line_break_style.unwrap_or_default()
    }
}

/// Split an option line into a lower-cased key (without `@`) and a value.
pub(crate) fn parse_option(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once('=')?;
    let key = key.trim().trim_start_matches('@').trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    Some((key, value.trim().to_string()))
}
