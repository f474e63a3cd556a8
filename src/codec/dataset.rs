//! Keyed line data.
//!
//! A [Dataset] holds the `key value` lines of one part of a data block, in input order.
//! An indented run of lines forms a sub-dataset attached to the line just above it. A
//! [DatasetMemo] wraps a dataset to remember which values were read, so that lines nobody
//! asked for can be reported instead of silently dropped.

use std::{
    cell::RefCell,
    collections::BTreeSet,
    rc::Rc,
};

use crate::{
    error::SixxError,
    input::{Loc, Located, Text},
};

/// One `key value` line, with the indented lines beneath it.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    pub key: Text,
    pub value: Text,
    pub sub: Option<Dataset>,
}

/// An ordered multi-map from keys to values. Duplicate keys keep their input order.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    entries: Vec<Entry>,
    loc: Option<Loc>,
}

impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Split a line into its key and value. Lines without both are not data lines.
fn key_value(line: &Text) -> Option<(Text, Text)> {
    match line.split_first_word()? {
        (key, Some(value)) => Some((key, value)),
        (_, None) => None,
    }
}

impl Dataset {
    pub fn new(loc: Option<Loc>) -> Dataset {
        Dataset {
            entries: Vec::new(),
            loc,
        }
    }

    pub fn set_loc(&mut self, loc: Option<Loc>) {
        self.loc = loc;
    }

    pub fn push(&mut self, key: Text, value: Text, sub: Option<Dataset>) {
        self.entries.push(Entry { key, value, sub });
    }

    /// Parse lines from `*pos` onwards, stopping at the first line that is not a
    /// `key value` line. `*pos` is left at that line.
    pub fn parse(lines: &[Text], pos: &mut usize) -> Result<Dataset, SixxError> {
        let mut dataset = Dataset::new(lines.get(*pos).and_then(|l| l.loc()));
        dataset.parse_level(lines, pos, 0)?;
        Ok(dataset)
    }

    fn parse_level(
        &mut self,
        lines: &[Text],
        pos: &mut usize,
        indent: usize,
    ) -> Result<(), SixxError> {
        while let Some(line) = lines.get(*pos) {
            let Some((key, value)) = key_value(line) else {
                break;
            };
            let ind = indentation(line);
            if ind < indent {
                return Ok(());
            }
            if ind > indent {
                let Some(last) = self.entries.last_mut() else {
                    return Err(SixxError::input_line(line, "illegal indentation"));
                };
                if last.sub.is_some() {
                    return Err(SixxError::input_line(line, "illegal indentation"));
                }
                let mut sub = Dataset::new(line.loc());
                sub.parse_level(lines, pos, ind)?;
                last.sub = Some(sub);
                continue;
            }
            self.push(key, value, None);
            *pos += 1;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// The distinct keys, in order of first appearance.
    pub fn keys(&self) -> Vec<&Text> {
        let mut keys: Vec<&Text> = Vec::new();
        for entry in &self.entries {
            if !keys.contains(&&entry.key) {
                keys.push(&entry.key);
            }
        }
        keys
    }

    fn values(&self, key: &str) -> Vec<&Entry> {
        self.entries.iter().filter(|e| e.key == key).collect()
    }

    /// The single value for `key`, with its sub-dataset.
    pub fn get(&self, key: &str) -> Result<(&Text, Option<&Dataset>), SixxError> {
        match self.values(key).as_slice() {
            [] => Err(SixxError::input_line(self, format!("missing '{key}'"))),
            [entry] => Ok((&entry.value, entry.sub.as_ref())),
            [_, second, ..] => Err(SixxError::input_line(
                &second.value,
                format!("duplicate '{key}'"),
            )),
        }
    }

    /// Every value for `key`, possibly none.
    pub fn mget(&self, key: &str) -> Vec<(&Text, Option<&Dataset>)> {
        self.values(key)
            .into_iter()
            .map(|e| (&e.value, e.sub.as_ref()))
            .collect()
    }

    /// Like [Dataset::get], for values that must not have a sub-dataset.
    pub fn getvalue(&self, key: &str) -> Result<&Text, SixxError> {
        match self.get(key)? {
            (value, None) => Ok(value),
            (_, Some(sub)) => Err(SixxError::input_line(sub, "spurious data")),
        }
    }

    /// Like [Dataset::mget], for values that must not have a sub-dataset.
    pub fn mgetvalue(&self, key: &str) -> Result<Vec<&Text>, SixxError> {
        self.mget(key)
            .into_iter()
            .map(|(value, sub)| match sub {
                None => Ok(value),
                Some(sub) => Err(SixxError::input_line(sub, "spurious data")),
            })
            .collect()
    }

    /// The location of every value, sub-datasets included.
    pub fn all_locs(&self) -> Vec<Loc> {
        let mut locs = Vec::new();
        for entry in &self.entries {
            locs.extend(entry.value.loc());
            if let Some(sub) = &entry.sub {
                locs.extend(sub.all_locs());
            }
        }
        locs
    }
}

impl Located for Dataset {
    fn loc(&self) -> Option<Loc> {
        self.loc.clone()
    }
}

/// A view of a [Dataset] that records the location of every value fetched through it.
/// Views of sub-datasets share the record of the view they came from.
#[derive(Debug, Clone)]
pub struct DatasetMemo<'d> {
    dataset: &'d Dataset,
    memo: Rc<RefCell<BTreeSet<Loc>>>,
}

impl<'d> DatasetMemo<'d> {
    pub fn new(dataset: &'d Dataset) -> DatasetMemo<'d> {
        DatasetMemo {
            dataset,
            memo: Rc::new(RefCell::new(BTreeSet::new())),
        }
    }

    pub fn dataset(&self) -> &'d Dataset {
        self.dataset
    }

    fn remember(&self, value: &Text) {
        if let Some(loc) = value.loc() {
            self.memo.borrow_mut().insert(loc);
        }
    }

    fn sub(&self, sub: Option<&'d Dataset>) -> Option<DatasetMemo<'d>> {
        sub.map(|dataset| DatasetMemo {
            dataset,
            memo: Rc::clone(&self.memo),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.dataset.contains(key)
    }

    pub fn get(&self, key: &str) -> Result<(&'d Text, Option<DatasetMemo<'d>>), SixxError> {
        let (value, sub) = self.dataset.get(key)?;
        self.remember(value);
        Ok((value, self.sub(sub)))
    }

    pub fn mget(&self, key: &str) -> Vec<(&'d Text, Option<DatasetMemo<'d>>)> {
        self.dataset
            .mget(key)
            .into_iter()
            .map(|(value, sub)| {
                self.remember(value);
                (value, self.sub(sub))
            })
            .collect()
    }

    pub fn getvalue(&self, key: &str) -> Result<&'d Text, SixxError> {
        let value = self.dataset.getvalue(key)?;
        self.remember(value);
        Ok(value)
    }

    /// [DatasetMemo::getvalue], or `None` if there is no such key.
    pub fn optvalue(&self, key: &str) -> Result<Option<&'d Text>, SixxError> {
        if self.contains(key) {
            self.getvalue(key).map(Some)
        } else {
            Ok(None)
        }
    }

    pub fn mgetvalue(&self, key: &str) -> Result<Vec<&'d Text>, SixxError> {
        let values = self.dataset.mgetvalue(key)?;
        for value in &values {
            self.remember(value);
        }
        Ok(values)
    }

    /// Locations of the values fetched so far.
    pub fn memo(&self) -> BTreeSet<Loc> {
        self.memo.borrow().clone()
    }

    pub fn all_locs(&self) -> Vec<Loc> {
        self.dataset.all_locs()
    }

    /// Locations of the values never fetched, in input order.
    pub fn unconsumed(&self) -> Vec<Loc> {
        let memo = self.memo.borrow();
        let mut missed: Vec<Loc> = self
            .all_locs()
            .into_iter()
            .filter(|loc| !memo.contains(loc))
            .collect();
        missed.sort();
        missed.dedup();
        missed
    }
}

impl Located for DatasetMemo<'_> {
    fn loc(&self) -> Option<Loc> {
        self.dataset.loc()
    }
}
