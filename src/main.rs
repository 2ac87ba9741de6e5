use std::fmt::Write as _;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;

use arxdiff::archive::FileSet;
use arxdiff::arxiv::{fetch_source, fetch_versions, PaperId};
use arxdiff::diff::{build_diff_entries, select_diff_file, select_diff_pair, DiffEntry};
use arxdiff::error::ArxDiffError;
use arxdiff::latex::comments::{build_visible_line_map, strip_latex_comments};
use arxdiff::latex::links::{collect_link_spans, find_label, resolve_file_target, LinkKind};
use arxdiff::latex::outline::parse_tex_outline;
use arxdiff::render::{format_rendered, render_file_diff, DiffLayout, DiffRendering, Language};

/// Fetch, browse, outline and diff the LaTeX source of arXiv papers
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Output file (prints to stdout if not specified)
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Command {
    /// List the files inside a paper's source archive
    Files {
        /// arXiv paper ID or URL (e.g., 2104.08653 or 2104.08653v2)
        paper: String,
    },
    /// Print the sectioning outline of a LaTeX file
    Outline {
        paper: String,
        /// File within the archive (defaults to the main .tex file)
        #[arg(short, long)]
        file: Option<String>,
        /// Suppress the outline for documents shorter than this
        #[arg(long, default_value_t = 150)]
        min_lines: usize,
    },
    /// Print a file from the archive
    Show {
        paper: String,
        file: String,
        /// Drop comment lines and trailing comments
        #[arg(long)]
        strip_comments: bool,
    },
    /// List link spans in a LaTeX file and resolve their targets
    Links {
        paper: String,
        /// File within the archive (defaults to the main .tex file)
        #[arg(short, long)]
        file: Option<String>,
        /// Report label positions in the comment-stripped rendering
        #[arg(long)]
        strip_comments: bool,
    },
    /// List the submitted versions of a paper as JSON
    Versions {
        paper: String,
    },
    /// Compare two versions of a paper file-by-file
    Diff {
        paper: String,
        /// Version to diff from (defaults to the second-latest)
        #[arg(long)]
        from: Option<u32>,
        /// Version to diff to (defaults to the latest)
        #[arg(long)]
        to: Option<u32>,
        /// File to diff (defaults to the main .tex file, else the
        /// first changed path)
        #[arg(short, long)]
        file: Option<String>,
        /// Only list per-file statuses
        #[arg(long)]
        names_only: bool,
        /// Two-column layout instead of unified
        #[arg(long)]
        split: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Configure logging
    if cli.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let output = run(&cli.command)?;

    if let Some(output_file) = &cli.output {
        fs::write(output_file, output)
            .with_context(|| format!("Failed to write output to {:?}", output_file))?;
        info!("Output written to {:?}", output_file);
    } else {
        print!("{}", output);
    }

    Ok(())
}

fn run(command: &Command) -> Result<String> {
    match command {
        Command::Files { paper } => cmd_files(paper),
        Command::Outline {
            paper,
            file,
            min_lines,
        } => cmd_outline(paper, file.as_deref(), *min_lines),
        Command::Show {
            paper,
            file,
            strip_comments,
        } => cmd_show(paper, file, *strip_comments),
        Command::Links {
            paper,
            file,
            strip_comments,
        } => cmd_links(paper, file.as_deref(), *strip_comments),
        Command::Versions { paper } => cmd_versions(paper),
        Command::Diff {
            paper,
            from,
            to,
            file,
            names_only,
            split,
        } => cmd_diff(paper, *from, *to, file.as_deref(), *names_only, *split),
    }
}

/// Load the requested file, or fall back to main-file detection.
fn pick_file<'a>(
    files: &'a FileSet,
    requested: Option<&str>,
) -> Result<&'a std::sync::Arc<arxdiff::archive::FileEntry>> {
    if let Some(path) = requested {
        return files
            .get(path)
            .ok_or_else(|| ArxDiffError::NoSuchFile(path.to_string()).into());
    }
    files
        .main_file()
        .ok_or_else(|| anyhow::anyhow!("no main .tex file detected; pass --file explicitly"))
}

fn cmd_files(paper: &str) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let files = fetch_source(&id)?;

    let mut out = String::new();
    for entry in files.iter() {
        writeln!(out, "{}", entry.path)?;
    }
    Ok(out)
}

fn cmd_outline(paper: &str, file: Option<&str>, min_lines: usize) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let files = fetch_source(&id)?;
    let entry = pick_file(&files, file)?;
    let outline = parse_tex_outline(entry.text()?);

    // Presentation policy, not an extractor concern: tiny documents
    // and single-heading documents get no outline.
    if outline.entries.len() < 2 || outline.line_count < min_lines {
        return Ok(format!("no outline available for {}\n", entry.path));
    }

    let mut out = String::new();
    for item in &outline.entries {
        writeln!(
            out,
            "{}{}  ({}, line {})",
            "  ".repeat(item.depth),
            item.title,
            item.command.as_str(),
            item.line_number
        )?;
    }
    Ok(out)
}

fn cmd_show(paper: &str, file: &str, strip_comments: bool) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let files = fetch_source(&id)?;
    let entry = pick_file(&files, Some(file))?;
    let text = entry.text()?;

    let mut out = if strip_comments {
        strip_latex_comments(text)
    } else {
        text.to_string()
    };
    if !out.ends_with('\n') {
        out.push('\n');
    }
    Ok(out)
}

fn cmd_links(paper: &str, file: Option<&str>, strip_comments: bool) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let files = fetch_source(&id)?;
    let entry = pick_file(&files, file)?;
    let text = entry.text()?;

    let spans = collect_link_spans(text, Language::from_path(&entry.path));

    let mut out = String::new();
    for span in &spans {
        let target = match span.kind {
            LinkKind::Input | LinkKind::Graphics => resolve_file_target(&files, span.kind, &span.payload)
                .map(|e| e.path.clone())
                .unwrap_or_else(|| "(target not found)".to_string()),
            LinkKind::Ref => match find_label(&files, &span.payload) {
                Ok((path, line)) => {
                    let line = if strip_comments {
                        // Translate into the stripped rendering's
                        // coordinates.
                        files
                            .get(&path)
                            .and_then(|e| e.text().ok())
                            .map(build_visible_line_map)
                            .and_then(|map| map.get(line - 1).copied())
                            .filter(|&l| l != 0)
                            .unwrap_or(line)
                    } else {
                        line
                    };
                    format!("{}:{}", path, line)
                }
                Err(e) => format!("({})", e),
            },
        };
        let kind = match span.kind {
            LinkKind::Input => "input",
            LinkKind::Graphics => "graphics",
            LinkKind::Ref => "ref",
        };
        writeln!(
            out,
            "{}..{}  {:<8} {:<30} -> {}",
            span.from, span.to, kind, span.payload, target
        )?;
    }
    if spans.is_empty() {
        writeln!(out, "no link spans in {}", entry.path)?;
    }
    Ok(out)
}

fn cmd_versions(paper: &str) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let versions = fetch_versions(&id.base)?;
    let mut out = serde_json::to_string_pretty(&versions)?;
    out.push('\n');
    Ok(out)
}

fn cmd_diff(
    paper: &str,
    from: Option<u32>,
    to: Option<u32>,
    file: Option<&str>,
    names_only: bool,
    split: bool,
) -> Result<String> {
    let id = PaperId::parse(paper)?;
    let versions = fetch_versions(&id.base)?;

    let pair = match select_diff_pair(&versions, from.or(id.version), to) {
        Ok(pair) => pair,
        Err(ArxDiffError::NotEnoughVersions(n)) => {
            return Ok(format!(
                "{} has {} version(s); diff requires at least two\n",
                id.base, n
            ));
        }
        Err(e) => return Err(e.into()),
    };

    info!("Comparing {} v{} against v{}", id.base, pair.from, pair.to);
    let old_files = fetch_source(&id.with_version(pair.from))?;
    let new_files = fetch_source(&id.with_version(pair.to))?;

    let entries = build_diff_entries(&old_files, &new_files);

    let mut out = String::new();
    writeln!(out, "diff {} v{}..v{}", id.base, pair.from, pair.to)?;
    for entry in &entries {
        writeln!(out, "  {:<10} {}", entry.status.to_string(), entry.path)?;
    }
    if names_only {
        return Ok(out);
    }

    // An explicitly requested file that exists in neither version
    // falls back to the default selection.
    let selected = match file {
        Some(path) => match entries.iter().find(|e| e.path == path) {
            Some(e) => Some(e),
            None => {
                log::warn!("`{}` not present in either version, using default", path);
                select_diff_file(&entries)
            }
        },
        None => select_diff_file(&entries),
    };
    let Some(selected) = selected else {
        writeln!(out, "no files to compare")?;
        return Ok(out);
    };

    let layout = if split {
        DiffLayout::Split
    } else {
        DiffLayout::Unified
    };
    writeln!(out)?;
    writeln!(
        out,
        "--- {} ({}, {})",
        selected.path,
        selected.status,
        Language::from_path(&selected.path).as_str()
    )?;
    write_rendering(&mut out, selected, layout)?;
    Ok(out)
}

fn write_rendering(out: &mut String, entry: &DiffEntry, layout: DiffLayout) -> Result<()> {
    match render_file_diff(entry) {
        DiffRendering::Hunks(rendered) => {
            out.push_str(&format_rendered(&rendered, layout));
        }
        DiffRendering::SideBySideText { old, new, .. } => {
            writeln!(out, "(diff unavailable, showing both versions)")?;
            writeln!(out, "<<<<<<< old")?;
            writeln!(out, "{}", old.trim_end_matches('\n'))?;
            writeln!(out, "=======")?;
            writeln!(out, "{}", new.trim_end_matches('\n'))?;
            writeln!(out, ">>>>>>> new")?;
        }
        DiffRendering::SideBySideBinary => {
            let size = |f: &Option<std::sync::Arc<arxdiff::archive::FileEntry>>| {
                f.as_ref()
                    .and_then(|f| f.bytes().ok())
                    .map(|b| b.len().to_string())
                    .unwrap_or_else(|| "-".to_string())
            };
            writeln!(
                out,
                "binary content, not diffed (old: {} bytes, new: {} bytes)",
                size(&entry.old_file),
                size(&entry.new_file)
            )?;
        }
        DiffRendering::NoPreview => {
            writeln!(out, "no preview available")?;
        }
    }
    Ok(())
}
