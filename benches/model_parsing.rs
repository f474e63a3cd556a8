//! Performance benchmarks for contact parsing and reports
//!
//! These benchmarks generate a synthetic contacts file to measure:
//! - Block parsing and model construction
//! - Forward reference resolution across retry rounds
//! - Collation and reference culling in the dump report
//!
//! Run with: cargo bench

use criterion::{criterion_group, criterion_main, Criterion};
use sixx_core::{
    codec::BlockCompiler,
    report::{self, ReportOptions},
    Model,
};

const WORLD: &str = "\
%country AU lang=en cc=61 ap=0 \"Australia\"
%area ac=8 \"South Australia\" / \"SA\"
";

fn word(mut i: usize) -> String {
    let mut w = String::new();
    loop {
        w.insert(0, (b'a' + (i % 26) as u8) as char);
        i /= 26;
        if i == 0 {
            return w;
        }
    }
}

// People come before the companies they work at, so every block is parked once.
fn corpus(people: usize) -> String {
    let companies = people / 10 + 1;
    let mut source = String::from(WORLD);
    for i in 0..people {
        source.push_str(&format!(
            "\nfn P{}\nln S{}\nin SA\nphh 8{:03}-{:04}\nwork Co {}\n",
            word(i),
            word(i % 37),
            i % 1000,
            i,
            word(i % companies)
        ));
    }
    for c in 0..companies {
        source.push_str(&format!("\nco Co {}\nin SA\nph 8123-{c:04}\n", word(c)));
    }
    source
}

fn compile(source: &str) -> Model {
    let mut compiler = BlockCompiler::default();
    compiler.parse_source(source, "bench.sixx").unwrap();
    compiler.finish_parsing().unwrap();
    compiler.into_model()
}

fn bench_parse_forward_references(c: &mut Criterion) {
    let source = corpus(200);
    c.bench_function("parse_forward_references", |b| {
        b.iter(|| compile(&source).graph.len());
    });
}

fn bench_dump_report(c: &mut Criterion) {
    let model = compile(&corpus(200));
    let select = report::default_selection();
    let opts = ReportOptions::default();
    c.bench_function("dump_report", |b| {
        b.iter(|| report::dump(&model, &select, &opts).unwrap().len());
    });
}

criterion_group!(benches, bench_parse_forward_references, bench_dump_report);
criterion_main!(benches);
