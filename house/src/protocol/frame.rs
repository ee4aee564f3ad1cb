//! Text frames: `command: key="value", key="value"\n`.

use std::fmt;

/// One protocol frame: a command and its ordered properties.
///
/// Producers keep insertion order; consumers look properties up by name and
/// must not depend on their position.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    command: String,
    properties: Vec<(String, String)>,
}

impl Frame {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            properties: Vec::new(),
        }
    }

    /// Builder-style property insertion. Replaces an existing key in place.
    pub fn with(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.properties.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((key, value)),
        }
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn properties(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Encode as one wire line, including the trailing `\n`.
    ///
    /// Quotes and line breaks cannot be represented inside a value and are
    /// dropped.
    pub fn encode(&self) -> String {
        let props = self
            .properties
            .iter()
            .map(|(k, v)| format!("{}=\"{}\"", sanitize(k), sanitize(v)))
            .collect::<Vec<_>>()
            .join(", ");
        format!("{}: {}\n", sanitize(&self.command), props)
    }

    /// Parse one line (without its delimiter).
    ///
    /// Returns `None` for a blank line. Property fragments without `=` are
    /// skipped. A line without `:` is a bare command.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim_end_matches(['\r', '\n']);
        if line.trim().is_empty() {
            return None;
        }
        let (command, rest) = match line.split_once(':') {
            Some((command, rest)) => (command.trim(), rest),
            None => (line.trim(), ""),
        };
        let mut frame = Frame::new(command);
        for (key, value) in PropertyScanner::new(rest) {
            frame.set(key, value);
        }
        Some(frame)
    }
}

/// Equality ignores property order.
impl PartialEq for Frame {
    fn eq(&self, other: &Self) -> bool {
        self.command == other.command
            && self.properties.len() == other.properties.len()
            && self
                .properties
                .iter()
                .all(|(k, v)| other.get(k) == Some(v.as_str()))
    }
}

impl Eq for Frame {}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.encode().trim_end())
    }
}

fn sanitize(s: &str) -> String {
    s.chars().filter(|c| !matches!(c, '"' | '\r' | '\n')).collect()
}

/// Walks `key="value", key=value, ...`, tolerating `key = "value"` spacing.
///
/// A quoted value may contain commas; an unquoted value ends at the next comma.
struct PropertyScanner<'a> {
    rest: &'a str,
}

impl<'a> PropertyScanner<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }
}

impl<'a> Iterator for PropertyScanner<'a> {
    type Item = (&'a str, &'a str);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let input = self.rest.trim_start_matches([' ', ',', '\t']);
            if input.is_empty() {
                self.rest = input;
                return None;
            }

            let key_end = input.find(['=', ',']).unwrap_or(input.len());
            if !input[key_end..].starts_with('=') {
                // malformed fragment
                self.rest = &input[key_end..];
                continue;
            }
            let key = input[..key_end].trim();
            let after_eq = input[key_end + 1..].trim_start();

            let (value, rest) = if let Some(quoted) = after_eq.strip_prefix('"') {
                match quoted.find('"') {
                    Some(close) => (&quoted[..close], &quoted[close + 1..]),
                    None => (quoted, ""),
                }
            } else {
                let end = after_eq.find(',').unwrap_or(after_eq.len());
                (after_eq[..end].trim_end(), &after_eq[end..])
            };
            self.rest = rest;

            if key.is_empty() {
                continue;
            }
            return Some((key, value));
        }
    }
}
