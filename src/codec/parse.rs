//! Splitting input lines into blocks, control lines and parts.

use crate::{
    codec::dataset::Dataset,
    error::SixxError,
    input::{Located, Text},
};

/// Drop comment lines, which start with `#`.
pub fn remove_comments(lines: Vec<Text>) -> Vec<Text> {
    lines.into_iter().filter(|l| !l.starts_with('#')).collect()
}

/// Group lines into blocks: maximal runs of non-blank lines.
pub fn blocks(lines: Vec<Text>) -> Vec<Vec<Text>> {
    let mut blocks = Vec::new();
    let mut block = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            if !block.is_empty() {
                blocks.push(std::mem::take(&mut block));
            }
        } else {
            block.push(line);
        }
    }
    if !block.is_empty() {
        blocks.push(block);
    }
    blocks
}

/// The text of a control line after its `%`.
pub fn control_text(line: &Text) -> Option<Text> {
    line.strip_prefix("%")
}

pub fn is_control_line(line: &Text) -> bool {
    line.starts_with('%')
}

/// Run every control in a block of control lines. A line whose `%` is followed by
/// white space continues the line above it. The first word of each joined control
/// must be one of `words`; `dispatch` gets the word and the remaining text, if any.
pub fn controls<F>(block: &[Text], words: &[&str], mut dispatch: F) -> Result<(), SixxError>
where
    F: FnMut(&Text, Option<Text>) -> Result<(), SixxError>,
{
    let mut joined: Vec<(Text, String)> = Vec::new();
    for line in block {
        let text = control_text(line).ok_or_else(|| {
            SixxError::input_line(line, "illegal non-control line in a control block")
        })?;
        let cont = text.trim_start();
        if !cont.is_empty() && cont.len() != text.len() {
            let Some((_, control)) = joined.last_mut() else {
                return Err(SixxError::input_line(line, "misplaced continuation line"));
            };
            control.push(' ');
            control.push_str(&cont.trim_end());
            continue;
        }
        joined.push((text.clone(), text.trim_end().to_string()));
    }
    for (first, control) in joined {
        let control = Text::new(control, first.loc());
        let Some((word, rest)) = control.split_first_word() else {
            return Err(SixxError::input_line(&control, "unsupported control \"%\""));
        };
        if !words.contains(&word.as_str()) {
            return Err(SixxError::input_line(
                &control,
                format!("unsupported control \"%{word}\""),
            ));
        }
        tracing::trace!("[Controls] %{} {:?}", word, rest.as_deref());
        dispatch(&word, rest)?;
    }
    Ok(())
}

/// The text following a control word that needs some.
pub fn control_arg(word: &Text, rest: Option<Text>) -> Result<Text, SixxError> {
    rest.ok_or_else(|| SixxError::input_line(word, format!("%{word} requires extra text")))
}

/// A delimited part of a data block. The implicit first part has no delimiter.
#[derive(Debug, Clone, PartialEq)]
pub struct Part {
    pub delim: Option<char>,
    pub data: Dataset,
}

impl Part {
    /// The delimiter as written, `""` for the implicit first part.
    pub fn delim_str(&self) -> String {
        self.delim.map(String::from).unwrap_or_default()
    }

    fn delimiter(line: &Text) -> Option<char> {
        let trimmed = line.trim_end();
        let mut chars = trimmed.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_alphabetic() && !c.is_whitespace() => Some(c),
            _ => None,
        }
    }

    /// Parse one part starting at `*pos`: an optional delimiter line, then key-value
    /// lines. Keys must be ASCII and start with a letter.
    pub fn parse(lines: &[Text], pos: &mut usize) -> Result<Part, SixxError> {
        let first = lines.get(*pos).and_then(|l| l.loc());
        let delim = lines.get(*pos).and_then(Part::delimiter);
        if delim.is_some() {
            *pos += 1;
        }
        let mut data = Dataset::parse(lines, pos)?;
        data.set_loc(first);
        check_keys(&data)?;
        Ok(Part { delim, data })
    }
}

fn check_keys(data: &Dataset) -> Result<(), SixxError> {
    for entry in data.entries() {
        let key = &entry.key;
        if !key.is_ascii() {
            return Err(SixxError::input(key, "invalid key - not ASCII"));
        }
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            return Err(SixxError::input(key, "invalid key - must start with letter"));
        }
        if let Some(sub) = &entry.sub {
            check_keys(sub)?;
        }
    }
    Ok(())
}

/// Split a data block into its parts, in input order.
pub fn parts(block: &[Text]) -> Result<Vec<Part>, SixxError> {
    let mut parts = Vec::new();
    let mut pos = 0;
    while let Some(line) = block.get(pos) {
        let start = pos;
        let part = Part::parse(block, &mut pos)?;
        if pos == start {
            return Err(SixxError::input_line(line, "malformed line"));
        }
        if part.data.is_empty() {
            return Err(SixxError::input_line(line, "empty part"));
        }
        parts.push(part);
    }
    Ok(parts)
}
