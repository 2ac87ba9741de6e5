use std::fs;

use arxdiff::archive::FileSet;
use arxdiff::arxiv::DiffVersion;
use arxdiff::diff::{
    build_diff_entries, select_diff_file, select_diff_pair, DiffPair, DiffStatus,
};
use arxdiff::error::ArxDiffError;
use tempfile::tempdir;

fn file_set(files: &[(&str, &[u8])]) -> (tempfile::TempDir, FileSet) {
    let dir = tempdir().unwrap();
    for (path, content) in files {
        let full = dir.path().join(path);
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full, content).unwrap();
    }
    let set = FileSet::from_dir(dir.path()).unwrap();
    (dir, set)
}

fn version(n: u32) -> DiffVersion {
    DiffVersion {
        version: n,
        id: format!("2104.08653v{}", n),
        submitted_utc: format!("2021-04-{:02} 12:00:00 UTC", n),
        size_label: "12kb".to_string(),
    }
}

#[test]
fn test_classification_over_two_sets() {
    let (_d1, old) = file_set(&[(
        "a.tex",
        b"old contents".as_slice(),
    ), ("b.tex", b"gone")]);
    let (_d2, new) = file_set(&[("a.tex", b"new contents".as_slice()), ("c.tex", b"fresh")]);

    let entries = build_diff_entries(&old, &new);
    let summary: Vec<(&str, DiffStatus)> = entries
        .iter()
        .map(|e| (e.path.as_str(), e.status))
        .collect();

    assert_eq!(
        summary,
        vec![
            ("a.tex", DiffStatus::Modified),
            ("b.tex", DiffStatus::Removed),
            ("c.tex", DiffStatus::Added),
        ]
    );
}

#[test]
fn test_entry_invariants() {
    let (_d1, old) = file_set(&[("a.tex", b"x".as_slice()), ("b.tex", b"y")]);
    let (_d2, new) = file_set(&[("a.tex", b"x".as_slice()), ("c.tex", b"z")]);

    for entry in build_diff_entries(&old, &new) {
        match entry.status {
            DiffStatus::Added => {
                assert!(entry.old_file.is_none() && entry.new_file.is_some())
            }
            DiffStatus::Removed => {
                assert!(entry.old_file.is_some() && entry.new_file.is_none())
            }
            _ => assert!(entry.old_file.is_some() && entry.new_file.is_some()),
        }
    }
}

#[test]
fn test_byte_equality() {
    // Same bytes from different archives compare unchanged
    let (_d1, old) = file_set(&[("a.tex", b"identical bytes".as_slice())]);
    let (_d2, new) = file_set(&[("a.tex", b"identical bytes".as_slice())]);
    assert_eq!(build_diff_entries(&old, &new)[0].status, DiffStatus::Unchanged);

    // A single differing byte is modified
    let (_d3, new) = file_set(&[("a.tex", b"identical bytez".as_slice())]);
    assert_eq!(build_diff_entries(&old, &new)[0].status, DiffStatus::Modified);

    // A length-only difference is modified
    let (_d4, new) = file_set(&[("a.tex", b"identical bytes!".as_slice())]);
    assert_eq!(build_diff_entries(&old, &new)[0].status, DiffStatus::Modified);
}

#[test]
fn test_unreadable_path_classifies_as_failed() {
    let (dir_old, old) = file_set(&[("a.tex", b"x".as_slice()), ("b.tex", b"same")]);
    let (_dir_new, new) = file_set(&[("a.tex", b"y".as_slice()), ("b.tex", b"same")]);

    // Content is read lazily, so deleting the backing file after
    // enumeration makes the old side unreadable at comparison time.
    fs::remove_file(dir_old.path().join("a.tex")).unwrap();

    let entries = build_diff_entries(&old, &new);
    let summary: Vec<(&str, DiffStatus)> = entries
        .iter()
        .map(|e| (e.path.as_str(), e.status))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("a.tex", DiffStatus::Failed),
            ("b.tex", DiffStatus::Unchanged),
        ]
    );
}

#[test]
fn test_subdirectory_paths_preserved() {
    let (_d1, old) = file_set(&[("sections/intro.tex", b"a".as_slice())]);
    let (_d2, new) = file_set(&[("sections/intro.tex", b"b".as_slice())]);

    let entries = build_diff_entries(&old, &new);
    assert_eq!(entries[0].path, "sections/intro.tex");
    assert_eq!(entries[0].status, DiffStatus::Modified);
}

#[test]
fn test_default_file_selection_prefers_document_root() {
    let (_d1, old) = file_set(&[
        ("aaa.tex", b"\\section{No document env}".as_slice()),
        ("main.tex", b"\\begin{document}\\end{document}".as_slice()),
    ]);
    let (_d2, new) = file_set(&[
        ("aaa.tex", b"\\section{No document env}".as_slice()),
        ("main.tex", b"\\begin{document}changed\\end{document}".as_slice()),
    ]);

    let entries = build_diff_entries(&old, &new);
    let selected = select_diff_file(&entries).unwrap();
    assert_eq!(selected.path, "main.tex");
}

#[test]
fn test_default_file_selection_falls_back_to_changed_path() {
    let (_d1, old) = file_set(&[
        ("notes.txt", b"same".as_slice()),
        ("refs.bib", b"old".as_slice()),
    ]);
    let (_d2, new) = file_set(&[
        ("notes.txt", b"same".as_slice()),
        ("refs.bib", b"new".as_slice()),
    ]);

    let entries = build_diff_entries(&old, &new);
    let selected = select_diff_file(&entries).unwrap();
    assert_eq!(selected.path, "refs.bib");
    assert_eq!(selected.status, DiffStatus::Modified);
}

#[test]
fn test_version_pair_defaults() {
    let versions = vec![version(1), version(2), version(3)];
    let pair = select_diff_pair(&versions, None, None).unwrap();
    assert_eq!(pair, DiffPair { from: 2, to: 3 });
}

#[test]
fn test_version_pair_honors_valid_preferences() {
    let versions = vec![version(1), version(2), version(3)];
    let pair = select_diff_pair(&versions, Some(1), Some(2)).unwrap();
    assert_eq!(pair, DiffPair { from: 1, to: 2 });
}

#[test]
fn test_version_pair_invalid_side_defaults_independently() {
    let versions = vec![version(1), version(2), version(3)];
    // 99 does not exist, so only the "to" side falls back
    let pair = select_diff_pair(&versions, Some(1), Some(99)).unwrap();
    assert_eq!(pair, DiffPair { from: 1, to: 3 });
}

#[test]
fn test_version_pair_refuses_degenerate_sets() {
    let err = select_diff_pair(&[version(1)], None, None).unwrap_err();
    assert!(matches!(err, ArxDiffError::NotEnoughVersions(1)));

    let err = select_diff_pair(&[], None, None).unwrap_err();
    assert!(matches!(err, ArxDiffError::NotEnoughVersions(0)));
}

#[test]
fn test_version_pair_unsorted_input() {
    let versions = vec![version(3), version(1), version(2)];
    let pair = select_diff_pair(&versions, None, None).unwrap();
    assert_eq!(pair, DiffPair { from: 2, to: 3 });
}
