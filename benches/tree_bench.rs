use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use std::path::PathBuf;
use testree::classifier::{OutputClassifier, SummaryLayoutClassifier};
use testree::models::{Capability, Location, NodeKind, Range, TestNode};
use testree::tree::TestTree;

/// 50 files with 40 examples each, nested under a class group.
fn build_tree() -> (TestTree, PathBuf) {
    let mut tree = TestTree::new();
    let mut last = PathBuf::new();
    for f in 0..50 {
        let path = PathBuf::from(format!("/w/test/models/file_{f}_test.rb"));
        let file_id = path.display().to_string();
        tree.add(
            TestNode::new(file_id.as_str(), format!("file_{f}_test.rb"), Location::new(&path), NodeKind::File),
            None,
        )
        .unwrap();

        let group_id = format!("{file_id}::Class{f}");
        tree.add(
            TestNode::new(
                group_id.as_str(),
                format!("Class{f}"),
                Location::new(&path).with_range(Range::lines(0, 400)),
                NodeKind::Group,
            ),
            Some(&file_id.as_str().into()),
        )
        .unwrap();

        for e in 0..40 {
            let id = format!("{group_id}#test_{e}");
            let start = 2 + e * 10;
            tree.add(
                TestNode::new(
                    id.as_str(),
                    format!("test_{e}"),
                    Location::new(&path).with_range(Range::lines(start, start + 8)),
                    NodeKind::Example,
                )
                .with_capability(Capability::Example),
                Some(&group_id.as_str().into()),
            )
            .unwrap();
            tree.set_command(&id.as_str().into(), format!("ruby {file_id}:{}", start + 1))
                .unwrap();
        }
        last = path;
    }
    (tree, last)
}

fn bench_find_by_location(c: &mut Criterion) {
    let (tree, path) = build_tree();
    c.bench_function("find_by_location", |b| {
        b.iter(|| tree.find_by_location(black_box(&path), black_box(305)));
    });
}

fn bench_classify(c: &mut Criterion) {
    let mut lines = vec![String::new(), "Run options: --seed 1234".to_string()];
    lines.extend((0..6).map(|i| format!("# Running {i}")));
    lines.push("F".to_string());
    lines.extend((0..200).map(|i| format!("  test/models/user_test.rb:{i}: Expected true")));
    lines.push("Finished in 0.4s".to_string());
    lines.push("1 runs, 1 assertions, 1 failures, 0 errors, 0 skips".to_string());
    let raw = lines.join("\n");

    c.bench_function("classify_minitest_failure", |b| {
        b.iter(|| SummaryLayoutClassifier.classify(black_box(&raw)));
    });
}

criterion_group!(benches, bench_find_by_location, bench_classify);
criterion_main!(benches);
