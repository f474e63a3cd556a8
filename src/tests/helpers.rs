//! Shared test utilities for parsed models

use crate::{
    codec::BlockCompiler,
    error::SixxError,
    graph::{NodeId, NodeType},
    model::{Lookup, Model},
};

/// Initialize logging for tests
pub fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init()
        .ok();
}

/// Country and area definitions most test inputs start with.
pub const WORLD: &str = "\
%country AU lang=en cc=61 ap=0 \"Australia\"
%area ac=8 \"South Australia\" / \"SA\"
%area ac=2 \"New South Wales\" / \"NSW\"
%country NZ lang=en cc=64 ap=0 \"New Zealand\"
";

/// Parse `source` after [WORLD] into a model, running every retry round.
pub fn compile(source: &str) -> Result<Model, SixxError> {
    init_logging();
    let mut compiler = BlockCompiler::default();
    compiler.parse_source(&format!("{WORLD}\n{source}"), "test.sixx")?;
    compiler.finish_parsing()?;
    Ok(compiler.into_model())
}

/// The single node of the given type that `name` refers to.
pub fn find(model: &Model, node_type: NodeType, name: &str) -> NodeId {
    match model.find(node_type, name) {
        Lookup::Found(id) => id,
        other => panic!("{node_type} {name:?}: {other:?}"),
    }
}
