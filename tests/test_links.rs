use std::fs;

use arxdiff::archive::FileSet;
use arxdiff::error::ArxDiffError;
use arxdiff::latex::links::{collect_link_spans, find_label, resolve_file_target, LinkKind};
use arxdiff::render::Language;
use tempfile::tempdir;

#[test]
fn test_adjacent_refs_do_not_overlap() {
    let spans = collect_link_spans(r"see \ref{a}\ref{b}", Language::Latex);
    assert_eq!(spans.len(), 2);
    assert_eq!(spans[0].payload, "a");
    assert_eq!(spans[1].payload, "b");
    assert!(spans[0].to <= spans[1].from);
}

#[test]
fn test_input_and_graphics_spans() {
    let text = r"\input{intro}
\includegraphics[width=\linewidth]{fig/plot}
\includegraphics{bare}";
    let spans = collect_link_spans(text, Language::Latex);

    assert_eq!(spans.len(), 3);
    assert_eq!(spans[0].kind, LinkKind::Input);
    assert_eq!(spans[0].payload, "intro");
    assert_eq!(spans[1].kind, LinkKind::Graphics);
    assert_eq!(spans[1].payload, "fig/plot");
    assert_eq!(spans[2].payload, "bare");
}

#[test]
fn test_ref_family_commands() {
    let text = r"\ref{a} \Cref{b} \cref{c} \eqref{d} \pageref{e} \autoref{f}";
    let spans = collect_link_spans(text, Language::Latex);
    let payloads: Vec<&str> = spans.iter().map(|s| s.payload.as_str()).collect();
    assert_eq!(payloads, vec!["a", "b", "c", "d", "e", "f"]);
    assert!(spans.iter().all(|s| s.kind == LinkKind::Ref));
}

#[test]
fn test_span_offsets_index_original_text() {
    let text = r"x \ref{key} y";
    let spans = collect_link_spans(text, Language::Latex);
    assert_eq!(spans.len(), 1);
    assert_eq!(&text[spans[0].from..spans[0].to], r"\ref{key}");
}

#[test]
fn test_empty_payload_discarded() {
    let spans = collect_link_spans(r"\ref{  } \input{}", Language::Latex);
    assert!(spans.is_empty());
}

#[test]
fn test_non_latex_content_yields_nothing() {
    assert!(collect_link_spans(r"\ref{a}", Language::Bibtex).is_empty());
    assert!(collect_link_spans(r"\ref{a}", Language::Plaintext).is_empty());
}

#[test]
fn test_commented_links_ignored() {
    let spans = collect_link_spans("% \\ref{hidden}\n\\ref{real}", Language::Latex);
    assert_eq!(spans.len(), 1);
    assert_eq!(spans[0].payload, "real");
}

fn fixture_file_set() -> (tempfile::TempDir, FileSet) {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("main.tex"),
        "\\begin{document}\n\\input{intro}\n\\end{document}\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("intro.tex"),
        "intro text\n\\label{sec:intro}\nmore\n",
    )
    .unwrap();
    fs::create_dir(dir.path().join("fig")).unwrap();
    fs::write(dir.path().join("fig").join("plot.png"), b"\x89PNG").unwrap();

    let files = FileSet::from_dir(dir.path()).unwrap();
    (dir, files)
}

#[test]
fn test_resolve_input_target() {
    let (_dir, files) = fixture_file_set();

    // As-is, then with .tex appended
    let hit = resolve_file_target(&files, LinkKind::Input, "intro.tex").unwrap();
    assert_eq!(hit.path, "intro.tex");
    let hit = resolve_file_target(&files, LinkKind::Input, "intro").unwrap();
    assert_eq!(hit.path, "intro.tex");

    assert!(resolve_file_target(&files, LinkKind::Input, "missing").is_none());
}

#[test]
fn test_resolve_graphics_target() {
    let (_dir, files) = fixture_file_set();

    let hit = resolve_file_target(&files, LinkKind::Graphics, "fig/plot").unwrap();
    assert_eq!(hit.path, "fig/plot.png");

    // Base-filename fallback when the directory component is wrong
    let hit = resolve_file_target(&files, LinkKind::Graphics, "figures/plot").unwrap();
    assert_eq!(hit.path, "fig/plot.png");
}

#[test]
fn test_find_label() {
    let (_dir, files) = fixture_file_set();

    let (path, line) = find_label(&files, "sec:intro").unwrap();
    assert_eq!(path, "intro.tex");
    assert_eq!(line, 2);

    let err = find_label(&files, "sec:nope").unwrap_err();
    assert!(matches!(err, ArxDiffError::LabelNotFound(_)));
}

#[test]
fn test_find_label_skips_commented_labels() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("a.tex"),
        "% \\label{only:comment}\nreal line\n",
    )
    .unwrap();
    let files = FileSet::from_dir(dir.path()).unwrap();

    assert!(find_label(&files, "only:comment").is_err());
}
