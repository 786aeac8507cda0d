use isa_recognizer::{Analyzer, ReferenceIndex};
use std::env;
use std::fs;

fn main() {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: rankings <corpus-dir> <file>");
        return;
    }
    let index = ReferenceIndex::load(&args[1]).unwrap();
    let data = fs::read(&args[2]).unwrap();
    let analyzer = Analyzer::new(index);

    let verdict = analyzer.deduce(&data);
    println!("verdict: {}", verdict.display_label());
    for ranking in [&verdict.order2, &verdict.order3] {
        println!("{}:", ranking.order());
        for (i, score) in ranking.top(10).iter().enumerate() {
            println!("  {}. {} - {:.4}", i + 1, score.label, score.divergence);
        }
    }
}
