//! Placeholder substitution for property-list templates
//!
//! Templates are plain text containing `__TOKEN__` placeholders. Rendering is
//! a single literal pass over the template, so substituted values are never
//! rescanned. Values are XML-escaped since every template this crate renders
//! is an XML property list.

use std::{path::Path, sync::LazyLock};

use regex::{Captures, Regex};

use crate::error::{InstallError, InstallResult};

/// Matches any `__UPPER_CASE__` token, known or not
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"__[A-Z][A-Z0-9_]*?__").expect("placeholder regex is valid"));

/// Placeholders understood by the installer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// Absolute path of the snap_tools directory
    InstallPath,
    /// Interpreter that runs `snap_tool.py`
    PythonPath,
}

impl Placeholder {
    pub const ALL: [Placeholder; 2] = [Placeholder::InstallPath, Placeholder::PythonPath];

    /// The literal token as it appears in templates
    pub fn token(&self) -> &'static str {
        match self {
            Placeholder::InstallPath => "__INSTALL_PATH__",
            Placeholder::PythonPath => "__PYTHON_PATH__",
        }
    }
}

/// Values to substitute, in insertion order
#[derive(Debug, Clone, Default)]
pub struct Substitutions {
    values: Vec<(Placeholder, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the value for `placeholder`, replacing any earlier value
    pub fn set(mut self, placeholder: Placeholder, value: impl AsRef<str>) -> Self {
        let escaped = escape_xml(value.as_ref());
        match self.values.iter_mut().find(|(p, _)| *p == placeholder) {
            Some(entry) => entry.1 = escaped,
            None => self.values.push((placeholder, escaped)),
        }
        self
    }

    /// Convenience for path values
    pub fn set_path(self, placeholder: Placeholder, path: &Path) -> Self {
        self.set(placeholder, path.to_string_lossy())
    }

    fn value_for(&self, token: &str) -> Option<&str> {
        self.values
            .iter()
            .find(|(p, _)| p.token() == token)
            .map(|(_, v)| v.as_str())
    }
}

/// Escapes the five XML special characters
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Replaces every occurrence of each placeholder's token
///
/// # Examples
///
/// ```
/// use snap_autostart::template::{Placeholder, Substitutions, render};
///
/// let subs = Substitutions::new().set(Placeholder::InstallPath, "/opt/snap");
/// let out = render("<string>__INSTALL_PATH__/snap_tool.py</string>", &subs);
/// assert_eq!(out, "<string>/opt/snap/snap_tool.py</string>");
/// ```
pub fn render(template: &str, substitutions: &Substitutions) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| {
            let token = &caps[0];
            substitutions.value_for(token).unwrap_or(token).to_string()
        })
        .into_owned()
}

/// Lists the distinct placeholder tokens still present in `text`
pub fn unresolved_placeholders(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    for m in PLACEHOLDER_RE.find_iter(text) {
        if !found.iter().any(|t| t == m.as_str()) {
            found.push(m.as_str().to_string());
        }
    }
    found
}

/// Checks that rendering `template` yields a plist fit to hand to launchd
///
/// Every token in the template must have a substitution and the template
/// must keep its `<plist>` root element. Only the template is scanned, so
/// values such as `/Users/me/__SNAP__` are accepted.
pub fn validate_plist(template: &str, substitutions: &Substitutions) -> InstallResult<()> {
    let leftover: Vec<String> = unresolved_placeholders(template)
        .into_iter()
        .filter(|token| substitutions.value_for(token).is_none())
        .collect();
    if !leftover.is_empty() {
        return Err(InstallError::UnresolvedPlaceholders {
            placeholders: leftover,
        });
    }

    if !template.contains("<plist") || !template.contains("</plist>") {
        return Err(InstallError::InvalidTemplate {
            reason: "missing <plist> root element".to_string(),
        });
    }

    Ok(())
}
