//! Source scanner for generated-output trees.
//!
//! Walks the generated root, keeps files with a recognized extension,
//! reads their content, and attaches the lexical analysis. Unreadable
//! files are logged and excluded from the run; they never abort a scan.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cli::{AppContext, ScanArgs};
use crate::core::analyze::{self, FileAnalysis};
use crate::infra::io::read_file_smart;
use crate::infra::walk::FileWalker;

/// Extensions accepted by the scanner: general-purpose source, markup,
/// and data-interchange formats.
pub const RECOGNIZED_EXTENSIONS: &[&str] = &[
    // general-purpose
    "ts", "tsx", "mts", "cts", "js", "jsx", "mjs", "cjs", "py", "pyi", "rs", "go", "java", "rb",
    "php", "c", "h", "cpp", "hpp", "cs", "swift", "kt", "sh", "sql",
    // markup
    "md", "markdown", "html", "htm", "css", "scss",
    // data interchange
    "json", "yaml", "yml", "toml", "xml", "txt",
];

/// Extensions the import resolver tries as suffixes for relative
/// imports (code formats only).
pub const SOURCE_EXTENSIONS: &[&str] = &["ts", "tsx", "js", "jsx", "mjs", "cjs", "py", "rs", "go"];

/// One generated file: content plus its structural analysis.
///
/// Owned by the scan pass that created it; `content` is replaced
/// exactly once by the merge planner's output before being written.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub abs_path: PathBuf,
    pub rel_path: PathBuf,
    pub content: String,
    pub analysis: FileAnalysis,
}

/// Scan failures that abort the run before any file processing.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("generated root {} does not exist", .0.display())]
    MissingRoot(PathBuf),
    #[error("generated root {} is not a directory", .0.display())]
    NotADirectory(PathBuf),
}

fn has_recognized_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .is_some_and(|e| RECOGNIZED_EXTENSIONS.contains(&e.as_str()))
}

/// Walk `root` and produce a `SourceFile` for every recognized file.
///
/// The only fatal condition is an unusable root; per-file read errors
/// are downgraded to warnings and the file is skipped.
pub fn scan_root(root: &Path, walker: &FileWalker) -> Result<Vec<SourceFile>> {
    if !root.exists() {
        return Err(ScanError::MissingRoot(root.to_path_buf()).into());
    }
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()).into());
    }

    let mut files = Vec::new();

    for abs_path in walker.walk_files(root) {
        if !has_recognized_extension(&abs_path) {
            continue;
        }

        let content = match read_file_smart(&abs_path) {
            Ok(c) => c.as_ref().to_string(),
            Err(err) => {
                warn!("skipping unreadable file {}: {err:#}", abs_path.display());
                continue;
            }
        };

        let rel_path = abs_path
            .strip_prefix(root)
            .unwrap_or(&abs_path)
            .to_path_buf();

        let analysis = analyze::analyze_path(&content, &rel_path);
        debug!(
            "scanned {} ({} imports, {} functions)",
            rel_path.display(),
            analysis.imports.len(),
            analysis.functions.len()
        );

        files.push(SourceFile {
            abs_path,
            rel_path,
            content,
            analysis,
        });
    }

    Ok(files)
}

/// JSONL record emitted by `gup scan`.
#[derive(Serialize)]
struct ScanRecord<'a> {
    path: &'a Path,
    analysis: &'a FileAnalysis,
}

/// CLI entry point for the standalone analyzer.
pub fn run(args: ScanArgs, ctx: &AppContext) -> Result<()> {
    let config = crate::infra::config::load_config().unwrap_or_default();
    let walker = FileWalker::new(&config.ignore_patterns)?;

    let root = crate::infra::expand_path(&args.path);
    let files = scan_root(&root, &walker)?;

    if files.is_empty() {
        if !ctx.quiet {
            println!("No recognized files under {}", root.display());
        }
        return Ok(());
    }

    let output = args
        .output
        .clone()
        .or_else(|| config.scan.output_file.clone().map(PathBuf::from));

    match output {
        Some(path) => {
            let file = File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            let mut writer = BufWriter::new(file);
            write_records(&mut writer, &files)?;
            writer.flush().context("Failed to flush output")?;

            if !ctx.quiet {
                println!("✓ Analyzed {} files to {}", files.len(), path.display());
            }
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write_records(&mut lock, &files)?;
        }
    }

    Ok(())
}

fn write_records<W: Write>(writer: &mut W, files: &[SourceFile]) -> Result<()> {
    for file in files {
        let record = ScanRecord {
            path: &file.rel_path,
            analysis: &file.analysis,
        };
        let json = serde_json::to_string(&record).context("Failed to serialize analysis")?;
        writer
            .write_all(json.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .context("Failed to write record")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::analyze::Language;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn scans_recognized_files_only() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "src/util.ts", "export function add() {}\n");
        write(dir.path(), "notes.md", "# notes\n");
        write(dir.path(), "binary.bin", "\x00\x01");

        let walker = FileWalker::new(&[]).unwrap();
        let files = scan_root(dir.path(), &walker).unwrap();

        let rels: Vec<_> = files.iter().map(|f| f.rel_path.clone()).collect();
        assert_eq!(
            rels,
            vec![PathBuf::from("notes.md"), PathBuf::from("src/util.ts")]
        );
    }

    #[test]
    fn analysis_is_attached_per_language() {
        let dir = tempfile::TempDir::new().unwrap();
        write(dir.path(), "mod.py", "def hello():\n    pass\n");

        let walker = FileWalker::new(&[]).unwrap();
        let files = scan_root(dir.path(), &walker).unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].analysis.language, Language::Python);
        assert_eq!(files[0].analysis.functions[0].name, "hello");
    }

    #[test]
    fn missing_root_is_a_hard_error() {
        let walker = FileWalker::new(&[]).unwrap();
        let err = scan_root(Path::new("/definitely/not/here"), &walker).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }
}
