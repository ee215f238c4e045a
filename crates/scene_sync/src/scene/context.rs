//! Evaluation context

use std::collections::BTreeMap;

/// Parameters a scene is evaluated under
///
/// Contexts are shared through `Arc` and compared by identity when a
/// controller is handed a new one; their contents are immutable once shared.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Context {
    frame: f32,
    variables: BTreeMap<String, String>,
}

impl Context {
    /// Context at frame 0 with no variables
    pub fn new() -> Self {
        Self::default()
    }

    /// Context at the given frame
    pub fn at_frame(frame: f32) -> Self {
        Self {
            frame,
            ..Self::default()
        }
    }

    /// Current frame
    pub fn frame(&self) -> f32 {
        self.frame
    }

    /// Builder-style variable assignment
    #[must_use]
    pub fn with_variable(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.insert(name.into(), value.into());
        self
    }

    /// Look up a variable
    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    /// Replace `${name}` references with variable values
    ///
    /// Unknown variables expand to nothing. An unterminated reference is
    /// kept as written.
    pub fn substitute(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(start) = rest.find("${") {
            let Some(length) = rest[start + 2..].find('}') else {
                break;
            };
            out.push_str(&rest[..start]);
            let name = &rest[start + 2..start + 2 + length];
            out.push_str(self.variable(name).unwrap_or_default());
            rest = &rest[start + 3 + length..];
        }
        out.push_str(rest);
        out
    }
}
