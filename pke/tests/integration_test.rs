use anyhow::Result;
use pke::errors::unify_path;
use pke::{
    run, stream, CancellationToken, ExtensionFilter, SearchConfig, SearchError, SearchEvent,
    SearchHit, SearchOutcome, SearchRequest,
};
use std::cell::Cell;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

fn create_test_files(dir: &TempDir, files: &[(&str, &str)]) -> Result<()> {
    for (name, content) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
    }
    Ok(())
}

/// Runs a search and collects `(file name relative to root, hits)` in delivery order
fn collect_hits(
    request: &SearchRequest,
    root: &Path,
) -> Result<(Vec<(String, Vec<SearchHit>)>, SearchOutcome)> {
    let root = unify_path(root);
    let token = CancellationToken::new();
    let mut files = Vec::new();
    let summary = run(
        request,
        &token,
        |path, hits| {
            let rel = path.strip_prefix(&root).unwrap_or(path);
            files.push((rel.to_string_lossy().replace('\\', "/"), hits));
        },
        || {},
    )?;
    Ok((files, summary.outcome))
}

fn no_excludes() -> Vec<PathBuf> {
    Vec::new()
}

#[test]
fn test_scenario_single_hit_on_line_three() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("a.txt", "one\ntwo\nthe quick brown fox\nfour\n"),
            ("b.md", "brown in a markdown file\n"),
        ],
    )?;

    let request = SearchRequest::new(
        "brown",
        [dir.path()],
        ExtensionFilter::from_extensions([".txt"]),
        no_excludes(),
    )?;
    let (files, outcome) = collect_hits(&request, dir.path())?;

    assert_eq!(outcome, SearchOutcome::Completed);
    assert_eq!(files.len(), 1);
    let (name, hits) = &files[0];
    assert_eq!(name, "a.txt");
    assert_eq!(hits.len(), 1);
    assert!(hits[0].file_path.ends_with("a.txt"));
    assert_eq!(hits[0].line_number, 3);
    assert_eq!(hits[0].snippet, "...the quick **brown** fox...");
    Ok(())
}

#[test]
fn test_scenario_excluded_subtree_yields_nothing() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[("top.txt", "key at top\n"), ("sub/b.txt", "key below\n")],
    )?;

    let request = SearchRequest::new(
        "key",
        [dir.path()],
        ExtensionFilter::All,
        [dir.path().join("sub")],
    )?;
    let (files, _) = collect_hits(&request, dir.path())?;

    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["top.txt"]);
    Ok(())
}

#[test]
fn test_scenario_explicit_file_overrides_exclude() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("readme", "the key is here\n")])?;

    let request = SearchRequest::new(
        "key",
        [dir.path().join("readme")],
        ExtensionFilter::from_extensions([".txt"]),
        [dir.path()],
    )?;
    let (files, _) = collect_hits(&request, dir.path())?;

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].0, "readme");
    Ok(())
}

#[test]
fn test_scenario_missing_root_fails_before_callbacks() -> Result<()> {
    let dir = tempdir()?;
    let request = SearchRequest::new(
        "key",
        [dir.path().join("does-not-exist")],
        ExtensionFilter::All,
        no_excludes(),
    )?;

    let token = CancellationToken::new();
    let fired = Cell::new(false);
    let result = run(&request, &token, |_, _| fired.set(true), || fired.set(true));

    match result {
        Err(SearchError::InvalidRoot(path)) => assert!(path.ends_with("does-not-exist")),
        other => panic!("expected InvalidRoot, got {:?}", other),
    }
    assert!(!fired.get());
    Ok(())
}

#[test]
fn test_match_all_visits_every_file_once() -> Result<()> {
    let dir = tempdir()?;
    let mut layout = Vec::new();
    for d in ["", "a/", "a/b/", "c/"] {
        for f in ["x.txt", "y.rs", "Makefile"] {
            layout.push(format!("{}{}", d, f));
        }
    }
    let files: Vec<(&str, &str)> = layout.iter().map(|n| (n.as_str(), "key\n")).collect();
    create_test_files(&dir, &files)?;

    let request = SearchRequest::new(
        "key",
        [dir.path().to_path_buf(), dir.path().join("a")],
        ExtensionFilter::All,
        no_excludes(),
    )?;
    let (found, _) = collect_hits(&request, dir.path())?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for (name, _) in &found {
        *counts.entry(name.clone()).or_default() += 1;
    }
    assert_eq!(counts.len(), layout.len());
    assert!(counts.values().all(|&c| c == 1));
    Ok(())
}

#[test]
fn test_include_inside_exclude_is_searched() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("archive/old.txt", "key\n"),
            ("archive/keep/new.txt", "key\n"),
            ("live.txt", "key\n"),
        ],
    )?;

    let request = SearchRequest::new(
        "key",
        [dir.path().to_path_buf(), dir.path().join("archive/keep")],
        ExtensionFilter::All,
        [dir.path().join("archive")],
    )?;
    let (files, _) = collect_hits(&request, dir.path())?;

    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["live.txt", "archive/keep/new.txt"]);
    Ok(())
}

#[test]
fn test_hits_follow_traversal_and_line_order() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("b.txt", "key\nx\nkey\n"),
            ("a/z.txt", "key\n"),
            ("a/y.txt", "x\nx\nkey\nkey\n"),
            ("c.txt", "key\n"),
        ],
    )?;

    let request = SearchRequest::new("key", [dir.path()], ExtensionFilter::All, no_excludes())?;
    let (files, _) = collect_hits(&request, dir.path())?;

    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a/y.txt", "a/z.txt", "b.txt", "c.txt"]);

    let y_lines: Vec<usize> = files[0].1.iter().map(|h| h.line_number).collect();
    assert_eq!(y_lines, vec![3, 4]);
    let b_lines: Vec<usize> = files[2].1.iter().map(|h| h.line_number).collect();
    assert_eq!(b_lines, vec![1, 3]);
    Ok(())
}

#[test]
fn test_cancel_after_n_files_scans_at_most_one_more() -> Result<()> {
    let dir = tempdir()?;
    for i in 0..20 {
        create_test_files(&dir, &[(&format!("f{:02}.txt", i), "key\n")])?;
    }

    let request = SearchRequest::new("key", [dir.path()], ExtensionFilter::All, no_excludes())?;
    let token = CancellationToken::new();
    let delivered = Cell::new(0usize);
    let completions = Cell::new(0usize);

    let summary = run(
        &request,
        &token,
        |_, _| {
            delivered.set(delivered.get() + 1);
            if delivered.get() == 3 {
                token.cancel();
            }
        },
        || completions.set(completions.get() + 1),
    )?;

    assert_eq!(summary.outcome, SearchOutcome::Cancelled);
    assert!(summary.stats.files_visited <= 4);
    assert_eq!(delivered.get(), 3);
    assert_eq!(completions.get(), 1);
    Ok(())
}

#[test]
fn test_cancel_is_idempotent_across_runs() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "key\n")])?;
    let request = SearchRequest::new("key", [dir.path()], ExtensionFilter::All, no_excludes())?;

    let once = CancellationToken::new();
    once.cancel();
    let many = CancellationToken::new();
    for _ in 0..5 {
        many.cancel();
    }

    let a = run(&request, &once, |_, _| {}, || {})?;
    let b = run(&request, &many, |_, _| {}, || {})?;
    assert_eq!(a, b);
    assert_eq!(a.outcome, SearchOutcome::Cancelled);
    assert_eq!(a.total_hits(), 0);
    Ok(())
}

#[test]
fn test_undecodable_file_does_not_stop_search() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("a.txt", "key\n"),
            ("b.dat", "key\n"),
            ("c.txt", "key\n"),
        ],
    )?;
    fs::write(dir.path().join("b.dat"), b"\xff\xfe\xfd key\n")?;

    let request = SearchRequest::new("key", [dir.path()], ExtensionFilter::All, no_excludes())?;
    let token = CancellationToken::new();
    let mut names = Vec::new();
    let summary = run(
        &request,
        &token,
        |path, _| names.push(path.file_name().unwrap().to_string_lossy().into_owned()),
        || {},
    )?;

    assert_eq!(names, vec!["a.txt", "c.txt"]);
    assert_eq!(summary.stats.decode_errors, 1);
    assert_eq!(summary.outcome, SearchOutcome::Completed);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_broken_entry_does_not_stop_search() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(&dir, &[("a.txt", "key\n"), ("c.txt", "key\n")])?;
    std::os::unix::fs::symlink(dir.path().join("gone.txt"), dir.path().join("b.txt"))?;

    let request = SearchRequest::new("key", [dir.path()], ExtensionFilter::All, no_excludes())?;
    let (files, outcome) = collect_hits(&request, dir.path())?;
    let names: Vec<&str> = files.iter().map(|(n, _)| n.as_str()).collect();
    assert_eq!(names, vec!["a.txt", "c.txt"]);
    assert_eq!(outcome, SearchOutcome::Completed);

    let token = CancellationToken::new();
    let summary = run(&request, &token, |_, _| {}, || {})?;
    assert_eq!(summary.stats.io_errors, 1);
    assert_eq!(summary.stats.decode_errors, 0);
    assert_eq!(summary.outcome, SearchOutcome::Completed);
    Ok(())
}

#[test]
fn test_stream_from_config_file() -> Result<()> {
    let dir = tempdir()?;
    create_test_files(
        &dir,
        &[
            ("notes/todo.md", "- [ ] write the fox chapter\n"),
            ("notes/archive/old.md", "fox\n"),
            ("notes/code.rs", "// fox\n"),
        ],
    )?;

    let config_path = dir.path().join("pke.yaml");
    let root = dir.path().join("notes");
    fs::write(
        &config_path,
        format!(
            "key: \"fox\"\ninclude_paths: [{:?}]\ninclude_exts: [\"md\"]\nexclude_paths: [{:?}]\nsnippet_width: 3\n",
            root.to_string_lossy(),
            root.join("archive").to_string_lossy()
        ),
    )?;

    let config = SearchConfig::load_from(Some(&config_path))?;
    let request = config.to_request()?;
    let token = CancellationToken::new();

    let mut hits = Vec::new();
    let mut summary = None;
    for event in stream(&request, &token)? {
        match event {
            SearchEvent::Hits(file) => hits.extend(file.hits),
            SearchEvent::Complete(s) => summary = Some(s),
        }
    }

    assert_eq!(hits.len(), 1);
    assert!(hits[0].file_path.ends_with("todo.md"));
    assert_eq!(hits[0].snippet, "...the **fox** chapter...");
    assert_eq!(summary.map(|s| s.outcome), Some(SearchOutcome::Completed));
    Ok(())
}
