use regex::{Regex, RegexBuilder};

use crate::{errors::Error, messaging::types::Button, Result};

/// Picks which keyboard button, if any, to press on an incoming message.
#[derive(Clone, Debug)]
pub struct ButtonMatcher {
    patterns: Vec<Regex>,
}

impl ButtonMatcher {
    /// Compile case-insensitive patterns; earlier patterns take priority.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let patterns = patterns
            .iter()
            .map(|p| {
                RegexBuilder::new(p.as_ref())
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        Error::Config(format!("invalid auto-click pattern {:?}: {e}", p.as_ref()))
                    })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { patterns })
    }

    pub fn pick<'a>(&self, buttons: &'a [Button]) -> Option<&'a Button> {
        self.patterns.iter().find_map(|re| {
            buttons
                .iter()
                .filter(|b| b.is_clickable())
                .find(|b| re.is_match(b.label.trim()))
        })
    }
}
