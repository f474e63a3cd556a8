use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};
use walkdir::WalkDir;

use crate::{
    codec::{
        builder::{split_data, BlockBuilder, BuildResult, Defaults, Journal},
        diagnostic::{Interrupt, UnresolvedReference},
        parse::{blocks, control_arg, controls, is_control_line, parts, remove_comments},
    },
    entity::DataFactory,
    error::SixxError,
    graph::NodeId,
    input::{lines, read_lines, Text},
    model::Model,
};

/// Control words accepted in control blocks.
pub const CONTROL_WORDS: [&str; 5] = ["country", "area", "default", "in", "data"];

/// File extensions read when a directory is given as input.
pub const INPUT_EXTENSIONS: [&str; 2] = ["sixx", "txt"];

/// Parses blocks of input into a [Model], resolving references between data blocks.
///
/// ## Overview
///
/// Input is a sequence of blocks separated by blank lines. Control blocks (lines starting
/// with `%`) take effect immediately: they define countries and areas, set the defaults
/// copied into later data blocks, and declare how `data` fields choose their context.
/// Data blocks define entries.
///
/// ## Suspended Blocks
///
/// A data block may name an entry that is defined further down the input, so a block
/// never looks a name up on its first run. It is parked at its first lookup, and
/// [Self::finish_parsing] retries the parked blocks in rounds once every block has
/// been seen:
///
/// 1. Each round runs every parked block once, in input order. A run may attempt one
///    new lookup; finding the entry lets the block carry on to its next lookup or to
///    its end.
/// 2. A block that completes leaves the parked set. One that resolves a reference but
///    parks again stays, having made progress.
/// 3. A round in which no block made progress means the remaining references name
///    entries that do not exist, or entries that are themselves waiting on the blocks
///    that refer to them. The next round runs in no-suspend mode: the first lookup
///    that finds nothing is reported as an error at the line that made it.
///
/// An ambiguous lookup, or any other error, fails at once.
///
/// Runs are replayed from the top of the block, using each block's [Journal] so that
/// nothing it created before parking is created again.
pub struct BlockCompiler {
    model: Model,
    last_country: Option<NodeId>,
    defaults: Defaults,
    factories: HashMap<String, DataFactory>,
    last_factory: Option<DataFactory>,
    pending: Vec<PendingBlock>,
    no_suspend: bool,
}

/// A data block waiting for a reference to be defined.
#[derive(Debug)]
struct PendingBlock {
    lines: Vec<Text>,
    defaults: Defaults,
    journal: Journal,
    waiting: Option<UnresolvedReference>,
}

impl PendingBlock {
    fn run(
        &mut self,
        model: &mut Model,
        factories: &HashMap<String, DataFactory>,
        no_suspend: bool,
    ) -> BuildResult<()> {
        self.journal.rewind();
        let parts = parts(&self.lines)?;
        let mut builder = BlockBuilder::new(model, factories, &mut self.journal, no_suspend);
        let result = builder.build(&parts, &self.defaults);
        self.waiting = match &result {
            Err(Interrupt::Suspend(unresolved)) => Some(unresolved.clone()),
            _ => None,
        };
        result
    }
}

impl Default for BlockCompiler {
    fn default() -> Self {
        Self::new(Model::new())
    }
}

impl BlockCompiler {
    pub fn new(model: Model) -> Self {
        Self {
            model,
            last_country: None,
            defaults: Defaults::default(),
            factories: HashMap::new(),
            last_factory: None,
            pending: Vec::new(),
            no_suspend: false,
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The finished model. Call [Self::finish_parsing] first.
    pub fn into_model(self) -> Model {
        self.model
    }

    /// Whether a round of retries has failed to make progress.
    pub fn no_suspend(&self) -> bool {
        self.no_suspend
    }

    /// The references the parked blocks are waiting for, in input order.
    pub fn pending_references(&self) -> Vec<&UnresolvedReference> {
        self.pending.iter().filter_map(|b| b.waiting.as_ref()).collect()
    }

    /// Parse one block: run a control block, or start a data block, which completes or
    /// is parked until [Self::finish_parsing].
    pub fn parse_block(&mut self, block: Vec<Text>) -> Result<(), SixxError> {
        let Some(first) = block.first() else {
            return Ok(());
        };
        if is_control_line(first) {
            return controls(&block, &CONTROL_WORDS, |word, rest| self.control(word, rest));
        }
        let mut pending = PendingBlock {
            lines: block,
            defaults: self.defaults.clone(),
            journal: Journal::default(),
            waiting: None,
        };
        match pending.run(&mut self.model, &self.factories, self.no_suspend) {
            Ok(()) => Ok(()),
            Err(Interrupt::Suspend(unresolved)) => {
                tracing::trace!("[Compiler] parked block: {unresolved}");
                self.pending.push(pending);
                Ok(())
            }
            Err(Interrupt::Fail(err)) => Err(err),
        }
    }

    /// Parse every block of some input lines.
    pub fn parse_lines(&mut self, lines: Vec<Text>) -> Result<(), SixxError> {
        for block in blocks(remove_comments(lines)) {
            self.parse_block(block)?;
        }
        Ok(())
    }

    /// Parse input text, locating its lines in `path`.
    pub fn parse_source(&mut self, source: &str, path: &str) -> Result<(), SixxError> {
        self.parse_lines(lines(source, path))
    }

    /// Parse files in order. A directory stands for its input files, sorted by path.
    pub fn parse_files<P: AsRef<Path>>(&mut self, paths: &[P]) -> Result<(), SixxError> {
        for path in paths {
            for file in input_files(path.as_ref())? {
                tracing::info!("[Compiler] Parsing {:?}", file);
                self.parse_lines(read_lines(&file)?)?;
            }
        }
        Ok(())
    }

    /// Retry the parked blocks until all complete, or report the first reference that
    /// cannot be resolved.
    pub fn finish_parsing(&mut self) -> Result<(), SixxError> {
        let mut round = 0;
        while !self.pending.is_empty() {
            round += 1;
            let retry = std::mem::take(&mut self.pending);
            tracing::debug!(
                "[Compiler] Round {round}: retrying {} parked blocks{}",
                retry.len(),
                if self.no_suspend { " (no suspend)" } else { "" }
            );
            let mut progress = false;
            for mut block in retry {
                let resolved = block.journal.resolved();
                block.journal.wake();
                match block.run(&mut self.model, &self.factories, self.no_suspend) {
                    Ok(()) => progress = true,
                    Err(Interrupt::Suspend(unresolved)) => {
                        progress |= block.journal.resolved() > resolved;
                        tracing::trace!("[Compiler] parked block: {unresolved}");
                        self.pending.push(block);
                    }
                    Err(Interrupt::Fail(err)) => return Err(err),
                }
            }
            if !progress {
                if self.no_suspend {
                    return Err(SixxError::invariant(format!(
                        "{} blocks parked without progress in no-suspend mode",
                        self.pending.len()
                    )));
                }
                tracing::debug!(
                    "[Compiler] No progress with {} parked blocks; failing the first unresolved reference",
                    self.pending.len()
                );
                self.no_suspend = true;
            }
        }
        Ok(())
    }

    fn control(&mut self, word: &Text, rest: Option<Text>) -> Result<(), SixxError> {
        match word.as_str() {
            "country" => {
                let text = control_arg(word, rest)?;
                self.last_country = Some(self.model.add_country(&text)?);
            }
            "area" => {
                let text = control_arg(word, rest)?;
                let country = self
                    .last_country
                    .ok_or_else(|| SixxError::input_line(&text, "no preceding country definition"))?;
                self.model.add_area(country, &text)?;
            }
            "default" => self.parse_default(word, rest)?,
            "in" => self.parse_control_in(control_arg(word, rest)?)?,
            "data" => {
                let text = control_arg(word, rest)?;
                let factory = self
                    .last_factory
                    .ok_or_else(|| SixxError::input_line(&text, "no preceding \"%in\""))?;
                let (id, _) = split_data(&text);
                if self.factories.contains_key(&id) {
                    return Err(SixxError::input_line(&text, "duplicate data declaration"));
                }
                self.factories.insert(id, factory);
            }
            _ => {
                return Err(SixxError::input_line(
                    word,
                    format!("unsupported control \"%{word}\""),
                ))
            }
        }
        Ok(())
    }

    /// `%default in <place|none>` and `%default key <keywords>`.
    fn parse_default(&mut self, word: &Text, rest: Option<Text>) -> Result<(), SixxError> {
        let text = control_arg(word, rest)?;
        let Some((key, value)) = text.split_first_word() else {
            return Err(SixxError::input(&text, "unsupported %default"));
        };
        match key.as_str() {
            "in" => {
                let value = value.ok_or_else(|| {
                    SixxError::input_line(&text, "%default in: missing place or \"none\"")
                })?;
                self.defaults.place = if value == "none" {
                    None
                } else {
                    Some(self.model.world.parse_place(&self.model.graph, &value)?)
                };
            }
            "key" => {
                self.defaults.keywords = match value {
                    Some(value) => self.model.keywords(&value)?,
                    None => Vec::new(),
                };
            }
            _ => return Err(SixxError::input(&key, "unsupported %default")),
        }
        Ok(())
    }

    /// `%in <place|none>:` chooses the context of the ids declared by the `%data`
    /// lines that follow.
    fn parse_control_in(&mut self, text: Text) -> Result<(), SixxError> {
        let text = text.trim_end();
        let Some((last, _)) = text.char_indices().last() else {
            return Err(SixxError::input_line(&text, "missing colon \":\""));
        };
        if !text.ends_with(':') {
            return Err(SixxError::input(&text.tail(last), "missing colon \":\""));
        }
        let place = text.slice(0..last).trim_end();
        self.last_factory = Some(if place == "none" {
            DataFactory::NoContext
        } else {
            DataFactory::Place(self.model.world.parse_place(&self.model.graph, &place)?)
        });
        Ok(())
    }
}

/// The input files a path stands for.
fn input_files(path: &Path) -> Result<Vec<PathBuf>, SixxError> {
    if !path.is_dir() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).follow_links(true) {
        let entry = entry?;
        let is_input = entry
            .path()
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| INPUT_EXTENSIONS.contains(&ext));
        if entry.file_type().is_file() && is_input {
            files.push(entry.into_path());
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        graph::{
            predicate::{incoming, outgoing},
            NodeType,
        },
        model::Lookup,
    };
    use enumset::EnumSet;
    use test_log::test;

    fn compile(source: &str) -> Result<Model, SixxError> {
        let mut compiler = BlockCompiler::default();
        compiler.parse_source(source, "c.sixx")?;
        compiler.finish_parsing()?;
        Ok(compiler.into_model())
    }

    fn only(model: &Model, node_type: NodeType) -> NodeId {
        let ids = model.registered(EnumSet::only(node_type));
        assert_eq!(ids.len(), 1, "one {node_type} expected");
        ids[0]
    }

    #[test]
    fn forward_reference_resolves() {
        let mut compiler = BlockCompiler::default();
        compiler
            .parse_source("fn Jo\nln Bloggs\nwork Acme\n\nco Acme\n", "c.sixx")
            .unwrap();
        let waiting: Vec<String> = compiler
            .pending_references()
            .iter()
            .map(|r| r.name.clone())
            .collect();
        assert_eq!(waiting, vec!["Acme"]);

        compiler.finish_parsing().unwrap();
        assert!(compiler.pending_references().is_empty());
        assert!(!compiler.no_suspend());
        let model = compiler.into_model();
        let jo = only(&model, NodeType::Person);
        let acme = only(&model, NodeType::Company);
        assert_eq!(model.graph.nodes(jo, outgoing() & NodeType::WorksAt), vec![acme]);
    }

    #[test]
    fn missing_reference_fails_with_location() {
        let err = compile("co Acme\n\nfn Jo\nln Bloggs\nwork Nowhere\n").unwrap_err();
        assert_eq!(err.message(), "no such Organisation/Residence \"Nowhere\"");
        assert_eq!(err.loc().map(|l| l.line), Some(5));
    }

    #[test]
    fn default_keywords_apply_to_later_blocks() {
        let model = compile("co Before\n\n%default key friend\n\nco Acme\nkey- friend\n\nco After\n").unwrap();
        let friend = model.keyword("friend").unwrap();
        let keyed = |name: &str| {
            let Lookup::Found(org) = model.find(NodeType::Company, name) else {
                panic!("{name} not found");
            };
            model.graph.nodes(org, outgoing() & NodeType::KeyedWith)
        };
        assert!(keyed("Before").is_empty());
        assert!(keyed("Acme").is_empty());
        assert_eq!(keyed("After"), vec![friend]);
    }

    #[test]
    fn data_declarations_choose_context() {
        let model = compile("%in none:\n%data height\n\nfn Jo\ndata height = 180\n").unwrap();
        let jo = only(&model, NodeType::Person);
        let data = model.graph.nodes(jo, incoming() & NodeType::HasContext);
        assert_eq!(data.len(), 1);
        assert_eq!(model.graph.data_context(data[0]), Some(jo));

        let err = compile("fn Jo\ndata height = 180\n").unwrap_err();
        assert_eq!(err.message(), "data context (place) unknown");
    }

    #[test]
    fn control_errors() {
        let msg = |source: &str| compile(source).unwrap_err().message();
        assert_eq!(msg("%area ac=8 \"SA\"\n"), "no preceding country definition");
        assert_eq!(msg("%in none\n"), "missing colon \":\"");
        assert_eq!(msg("%data height\n"), "no preceding \"%in\"");
        assert_eq!(msg("%in none:\n%data h\n%data h\n"), "duplicate data declaration");
        assert_eq!(msg("%default in\n"), "%default in: missing place or \"none\"");
        assert_eq!(msg("%default colour red\n"), "unsupported %default");
        assert_eq!(msg("%colour red\n"), "unsupported control \"%colour\"");
    }

    #[test]
    fn directories_expand_to_sorted_input_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.sixx"), "fn Jo\nln Bloggs\nwork Acme\n").unwrap();
        std::fs::write(dir.path().join("a.txt"), "co Acme\n").unwrap();
        std::fs::write(dir.path().join("notes.md"), "not input\n").unwrap();
        let files = input_files(dir.path()).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.txt"));

        let mut compiler = BlockCompiler::default();
        compiler.parse_files(&[dir.path()]).unwrap();
        compiler.finish_parsing().unwrap();
        assert_eq!(compiler.model().registered(EnumSet::only(NodeType::Company)).len(), 1);
    }
}
