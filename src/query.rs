//! Selection expressions, as given on the command line after `--`.
//!
//! ```text
//! or    := and ( "-or" and )*
//! and   := unary ( ["-and"] unary )*
//! unary := "-not" unary | "(" or ")" | term
//! term  := "=" keyword | "in:" place | ( "work:" | "with:" | "ex:" | "loc:" ) organisation
//!        | name
//! ```
//!
//! Juxtaposed terms are joined by "and", binding tighter than an explicit `-and`. A bare
//! name selects the entries whose names contain it at a word start.

use crate::{
    error::SixxError,
    graph::{
        predicate::{in_place, keyed_with, name_imatches, outgoing, to_node, NodePredicate},
        NodeType,
    },
    model::{Lookup, Model},
};

const OP_AND: &str = "-and";
const OP_OR: &str = "-or";
const OP_NOT: &str = "-not";
const OP_OPEN: &str = "(";
const OP_CLOSE: &str = ")";

fn is_operator(token: &str) -> bool {
    matches!(token, OP_AND | OP_OR | OP_NOT | OP_OPEN | OP_CLOSE)
}

fn expression(message: String) -> SixxError {
    SixxError::Expression(message)
}

/// Parse a sequence of tokens into a predicate over entries.
pub fn parse_predicate<S: AsRef<str>>(model: &Model, tokens: &[S]) -> Result<NodePredicate, SixxError> {
    let tokens: Vec<&str> = tokens.iter().map(AsRef::as_ref).collect();
    if tokens.is_empty() {
        return Err(expression("empty expression".to_string()));
    }
    let parser = PredicateParser { model };
    let (pred, rest) = parser.or(&tokens)?;
    if let Some(token) = rest.first() {
        return Err(expression(format!("spurious token '{token}'")));
    }
    Ok(pred)
}

struct PredicateParser<'m> {
    model: &'m Model,
}

type Parsed<'t> = (NodePredicate, &'t [&'t str]);

impl PredicateParser<'_> {
    fn or<'t>(&self, tokens: &'t [&'t str]) -> Result<Parsed<'t>, SixxError> {
        let (mut pred, mut tokens) = self.and(tokens)?;
        while tokens.len() > 1 && tokens[0] == OP_OR {
            let (next, rest) = self.and(&tokens[1..])?;
            pred = pred | next;
            tokens = rest;
        }
        Ok((pred, tokens))
    }

    fn and<'t>(&self, tokens: &'t [&'t str]) -> Result<Parsed<'t>, SixxError> {
        let (mut pred, mut tokens) = self.unary(tokens)?;
        loop {
            let (next, rest) = match tokens {
                [op, rest @ ..] if *op == OP_AND && !rest.is_empty() => self.unary(rest)?,
                [token, ..] if !is_operator(token) => self.unary(tokens)?,
                _ => break,
            };
            pred = pred & next;
            tokens = rest;
        }
        Ok((pred, tokens))
    }

    fn unary<'t>(&self, tokens: &'t [&'t str]) -> Result<Parsed<'t>, SixxError> {
        match tokens {
            [op, rest @ ..] if *op == OP_NOT && !rest.is_empty() => {
                let (pred, rest) = self.unary(rest)?;
                Ok((!pred, rest))
            }
            [op, rest @ ..] if *op == OP_OPEN && !rest.is_empty() => {
                let (pred, rest) = self.or(rest)?;
                match rest {
                    [close, rest @ ..] if *close == OP_CLOSE => Ok((pred, rest)),
                    _ => Err(expression(format!("missing \"{OP_CLOSE}\""))),
                }
            }
            [token, rest @ ..] => Ok((self.term(token)?, rest)),
            [] => Err(expression("missing term".to_string())),
        }
    }

    fn term(&self, token: &str) -> Result<NodePredicate, SixxError> {
        if let Some(keyword) = token.strip_prefix('=') {
            let id = self
                .model
                .keyword(keyword)
                .ok_or_else(|| expression(format!("no such keyword '{keyword}'")))?;
            return Ok(keyed_with(id));
        }
        if let Some(place) = token.strip_prefix("in:") {
            let place = self
                .model
                .lookup_place(place)
                .map_err(|_| expression(format!("no such place '{place}'")))?;
            return Ok(in_place(place));
        }
        let relation = token.split_once(':').and_then(|(cond, name)| {
            let link = match cond {
                "work" => NodeType::WorksAt,
                "loc" => NodeType::LocatedAt,
                "with" => NodeType::With,
                "ex" => NodeType::Ex,
                _ => return None,
            };
            Some((link, name))
        });
        if let Some((link, name)) = relation {
            let org = match self.model.find(NodeType::Organisation, name) {
                Lookup::Found(org) => org,
                Lookup::Ambiguous(_) => {
                    return Err(expression(format!("ambiguous organisation '{name}'")))
                }
                Lookup::NotFound => return Err(expression(format!("no such organisation '{name}'"))),
            };
            let select = outgoing() & link & to_node(org);
            return Ok(NodePredicate::new(move |g, n| !g.links(n, select.clone()).is_empty()));
        }
        Ok(name_imatches(token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{codec::BlockCompiler, graph::NodeId};
    use test_log::test;

    const SOURCE: &str = "\
%country AU lang=en cc=61 ap=0 \"Australia\"
%area ac=8 \"South Australia\" / \"SA\"
%country NZ lang=en cc=64 ap=0 \"New Zealand\"

co Acme
in SA
key supplier

co Zenith
in New Zealand

fn Jo
ln Bloggs
work Acme
key friend

fn Al
ln Bloggs
with Zenith

fn Cy
ln Young
work Zenith
key friend
";

    fn model() -> Model {
        let mut compiler = BlockCompiler::default();
        compiler.parse_source(SOURCE, "q.sixx").unwrap();
        compiler.finish_parsing().unwrap();
        compiler.into_model()
    }

    fn select(model: &Model, expr: &str) -> Vec<String> {
        let tokens: Vec<&str> = expr.split_whitespace().collect();
        let pred = parse_predicate(model, &tokens).unwrap();
        let mut names: Vec<String> = model
            .registered(NodeType::Person | NodeType::Company)
            .into_iter()
            .filter(|id: &NodeId| pred.test(&model.graph, *id))
            .map(|id| model.graph.display_name(id, "en"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn terms_select_entries() {
        let model = model();
        assert_eq!(select(&model, "=friend"), vec!["Cy Young", "Jo Bloggs"]);
        assert_eq!(select(&model, "work:Acme"), vec!["Jo Bloggs"]);
        assert_eq!(select(&model, "with:Zenith"), vec!["Al Bloggs"]);
        assert_eq!(select(&model, "in:SA"), vec!["Acme", "Jo Bloggs"]);
        assert_eq!(select(&model, "in:NZ"), vec!["Cy Young", "Zenith"]);
        assert_eq!(select(&model, "bloggs"), vec!["Al Bloggs", "Jo Bloggs"]);
    }

    #[test]
    fn operators_and_precedence() {
        let model = model();
        assert_eq!(select(&model, "bloggs =friend"), vec!["Jo Bloggs"]);
        assert_eq!(select(&model, "bloggs -and -not =friend"), vec!["Al Bloggs"]);
        assert_eq!(
            select(&model, "=supplier -or work:Zenith"),
            vec!["Acme", "Cy Young"]
        );
        assert_eq!(
            select(&model, "( =supplier -or =friend ) -and -not young"),
            vec!["Acme", "Jo Bloggs"]
        );
    }

    #[test]
    fn expression_errors() {
        let model = model();
        let msg = |expr: &str| {
            let tokens: Vec<&str> = expr.split_whitespace().collect();
            match parse_predicate(&model, &tokens) {
                Err(SixxError::Expression(msg)) => msg,
                Err(other) => panic!("unexpected error {other}"),
                Ok(_) => panic!("{expr} parsed"),
            }
        };
        assert_eq!(msg("( =friend"), "missing \")\"");
        assert_eq!(msg("=enemy"), "no such keyword 'enemy'");
        assert_eq!(msg("in:Atlantis"), "no such place 'Atlantis'");
        assert_eq!(msg("work:Nobody"), "no such organisation 'Nobody'");
        assert_eq!(msg("=friend )"), "spurious token ')'");
    }
}
