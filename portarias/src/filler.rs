use log::debug;

/// A document seen as a flat sequence of editable texts.
///
/// Implementations decide what a unit is (a paragraph, a table cell, ...).
/// They must hand out every text-bearing unit, in document order.
pub trait TextUnits {
    fn text_units(&mut self) -> Vec<&mut String>;
}

/// Placeholder tokens and their replacement, in insertion order.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct TokenMap {
    entries: Vec<(String, String)>,
}

impl TokenMap {
    pub fn new() -> TokenMap {
        TokenMap::default()
    }

    /// Sets the replacement of a token. An existing entry keeps its position.
    pub fn insert(&mut self, token: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(entry) = self.entries.iter_mut().find(|(t, _)| t == token) {
            entry.1 = value;
        } else {
            self.entries.push((token.to_string(), value));
        }
    }

    pub fn get(&self, token: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(t, _)| t == token)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(t, v)| (t.as_str(), v.as_str()))
    }

    /// Replaces every token occurring in `text`.
    ///
    /// The text is scanned once from left to right. Where several tokens
    /// match at the same position the longest one is used, so `#LOTACAO`
    /// never eats the start of `#LOTACAOORIGEM`. Inserted values are not
    /// scanned again.
    ///
    /// Returns `None` when the text contains no token.
    pub fn substitute(&self, text: &str) -> Option<String> {
        let mut ordered: Vec<&(String, String)> =
            self.entries.iter().filter(|(t, _)| !t.is_empty()).collect();
        ordered.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut out = String::with_capacity(text.len());
        let mut changed = false;
        let mut rest = text;
        while let Some(c) = rest.chars().next() {
            match ordered.iter().find(|(t, _)| rest.starts_with(t.as_str())) {
                Some((token, value)) => {
                    out.push_str(value);
                    rest = &rest[token.len()..];
                    changed = true;
                }
                None => {
                    out.push(c);
                    rest = &rest[c.len_utf8()..];
                }
            }
        }
        if changed {
            Some(out)
        } else {
            None
        }
    }
}

/// Fills the tokens of a document in place.
///
/// Tokens without an entry in the map are left as they are.
/// Returns the number of text units that were modified.
pub fn fill<D: TextUnits + ?Sized>(document: &mut D, tokens: &TokenMap) -> usize {
    let mut modified = 0;
    for unit in document.text_units() {
        if let Some(replaced) = tokens.substitute(unit) {
            *unit = replaced;
            modified += 1;
        }
    }
    debug!("fill: {} tokens, {} text units modified", tokens.len(), modified);
    modified
}
