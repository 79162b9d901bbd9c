use std::fs;
use std::sync::Arc;

use autoheal_core::fakes::FakeSuggestions;
use autoheal_core::{collect_sources, BugType, Detector, Failure};
use tempfile::tempdir;

fn py_detector() -> Detector {
    Detector::new(vec!["py".to_string()])
}

#[tokio::test]
async fn unused_os_is_one_linting_failure() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("main.py"), "import os\nprint('hello')\n").unwrap();

    let failures = py_detector().detect(dir.path()).await.unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].bug_type, BugType::Linting);
    assert_eq!(failures[0].location(), ("main.py", 1));
    assert!(failures.iter().all(|f| f.bug_type != BugType::Import));
}

#[tokio::test]
async fn scan_walks_subdirectories_and_skips_git() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("pkg/sub")).unwrap();
    fs::create_dir_all(dir.path().join(".git")).unwrap();
    fs::write(dir.path().join("pkg/sub/util.py"), "if ready\n    go()\n").unwrap();
    fs::write(dir.path().join(".git/hook.py"), "import os\n").unwrap();
    fs::write(dir.path().join("README.md"), "if this\n").unwrap();

    let failures = py_detector().detect(dir.path()).await.unwrap();

    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].location(), ("pkg/sub/util.py", 1));
    assert_eq!(failures[0].bug_type, BugType::Syntax);
}

#[test]
fn sources_are_sorted_and_filtered() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("b.py"), "x = 1\n").unwrap();
    fs::write(dir.path().join("a.py"), "y = 2\n").unwrap();
    fs::write(dir.path().join("c.txt"), "z\n").unwrap();
    fs::write(dir.path().join("d.py"), [0xff, 0xfe, 0x00]).unwrap();

    let sources = collect_sources(dir.path(), &["py".to_string()]).unwrap();
    let paths: Vec<&str> = sources.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["a.py", "b.py"]);

    let all = collect_sources(dir.path(), &[]).unwrap();
    assert_eq!(all.len(), 3);
}

#[test]
fn extension_match_ignores_case() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("MAIN.PY"), "x = 1\n").unwrap();
    fs::write(dir.path().join("tool.Py"), "y = 2\n").unwrap();

    let sources = collect_sources(dir.path(), &["py".to_string()]).unwrap();
    let paths: Vec<&str> = sources.iter().map(|s| s.path.as_str()).collect();
    assert_eq!(paths, vec!["MAIN.PY", "tool.Py"]);
}

#[tokio::test]
async fn identical_trees_give_identical_results() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    for dir in [&first, &second] {
        fs::write(dir.path().join("x.py"), "import sys\nwhile True\n\t pass\n").unwrap();
        fs::write(dir.path().join("y.py"), "import os\n").unwrap();
    }

    let a = py_detector().detect(first.path()).await.unwrap();
    let b = py_detector().detect(second.path()).await.unwrap();
    assert!(!a.is_empty());
    assert_eq!(a, b);
}

#[tokio::test]
async fn suggestions_are_merged_without_duplicates() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("calc.py"), "import os\ntotal = price - 1\n").unwrap();

    let suggestions = FakeSuggestions::new()
        // same (file, line) as the lexical linting failure
        .with_failure(Failure::new("calc.py", 1, BugType::Logic, "Shadowed import"))
        .with_failure(Failure::new("calc.py", 2, BugType::Logic, "Off-by-one in total"))
        .with_failure(Failure::new("calc.py", 0, BugType::TypeError, "Bad line"));
    let detector = py_detector().with_suggestions(Some(Arc::new(suggestions)));

    let failures = detector.detect(dir.path()).await.unwrap();

    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].bug_type, BugType::Linting);
    assert_eq!(failures[1].location(), ("calc.py", 2));
    assert_eq!(failures[1].bug_type, BugType::Logic);
    assert_eq!(failures[1].message, "Off-by-one in total");
}

#[tokio::test]
async fn empty_tree_is_clean() {
    let dir = tempdir().unwrap();
    assert!(py_detector().detect(dir.path()).await.unwrap().is_empty());
}
