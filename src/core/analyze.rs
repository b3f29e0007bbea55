//! Lexical structural analysis of source files.
//!
//! Derives a lightweight per-file summary (imports, exports, functions,
//! classes, types) from ordered regex extraction rules keyed by the
//! language inferred from the file extension. This is deliberately a
//! best-effort lexical pass, not a parser: a rule that fails to match
//! malformed source simply yields nothing, it never aborts the scan.
//!
//! Rule tables are per-language and self-contained, so adding a
//! language means adding one table, not touching the detector or the
//! merge planner.

use std::path::Path;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde::Serialize;

use crate::infra::line_index::NewlineIndex;

/// Language inferred from a file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Language {
    TypeScript,
    JavaScript,
    Python,
    Rust,
    Go,
    Markup,
    Data,
    Unknown,
}

impl Language {
    /// Infer the language from a path's extension.
    pub fn from_path(path: &Path) -> Language {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Language::Unknown;
        };

        match ext.to_lowercase().as_str() {
            "ts" | "tsx" | "mts" | "cts" => Language::TypeScript,
            "js" | "jsx" | "mjs" | "cjs" => Language::JavaScript,
            "py" | "pyi" => Language::Python,
            "rs" => Language::Rust,
            "go" => Language::Go,
            "md" | "markdown" | "html" | "htm" | "css" | "scss" => Language::Markup,
            "json" | "yaml" | "yml" | "toml" | "xml" => Language::Data,
            _ => Language::Unknown,
        }
    }

    /// Languages whose function blocks are delimited by braces rather
    /// than indentation.
    pub fn uses_braces(self) -> bool {
        !matches!(self, Language::Python)
    }
}

/// One import statement: the module source string and the 1-based line
/// of its first occurrence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportRef {
    pub source: String,
    pub line: usize,
}

/// One named symbol and the 1-based line of its declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SymbolRef {
    pub name: String,
    pub line: usize,
}

/// Structural summary of a single file.
///
/// Line numbers are computed from the byte offset of the first pattern
/// match within the content existing at analysis time; they are not
/// re-validated after a merge rewrites the file.
#[derive(Debug, Clone, Serialize)]
pub struct FileAnalysis {
    pub language: Language,
    pub imports: Vec<ImportRef>,
    pub exports: Vec<SymbolRef>,
    pub functions: Vec<SymbolRef>,
    pub classes: Vec<SymbolRef>,
    pub types: Vec<SymbolRef>,
    pub line_count: usize,
    pub byte_size: usize,
}

impl FileAnalysis {
    fn empty(language: Language, content: &str) -> Self {
        Self {
            language,
            imports: Vec::new(),
            exports: Vec::new(),
            functions: Vec::new(),
            classes: Vec::new(),
            types: Vec::new(),
            line_count: NewlineIndex::build(content.as_bytes()).line_count(),
            byte_size: content.len(),
        }
    }
}

/// Extraction rule table for one language. Every regex exposes the
/// captured name (or import source) in its first non-empty group.
struct RuleSet {
    imports: Vec<Regex>,
    functions: Vec<Regex>,
    classes: Vec<Regex>,
    types: Vec<Regex>,
    exports: Vec<Regex>,
    /// Rules whose single capture is a comma-separated name list
    /// (e.g. `export { a, b as c }`, `__all__ = [...]`).
    export_lists: Vec<Regex>,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("static extraction rule must compile"))
        .collect()
}

static TYPESCRIPT_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    imports: compile(&[
        // `import x from 'y'`, `import {a, b} from 'y'`, bare `import 'y'`
        r#"(?m)^[ \t]*import[ \t]+(?:[\w$*{}, \t]+[ \t]+from[ \t]+)?['"]([^'"\n]+)['"]"#,
        // synchronous require-like calls
        r#"require\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
        // dynamic imports
        r#"import\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
    ]),
    functions: compile(&[
        // named declarations, optionally exported/async/generator
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)",
        // identifier-bound function-valued expressions
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*=[ \t]*(?:async[ \t]+)?(?:function\b|\([^)\n]*\)[ \t]*(?::[^=\n]+)?=>|[A-Za-z_$][\w$]*[ \t]*=>)",
    ]),
    classes: compile(&[
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:abstract[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
    ]),
    types: compile(&[
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:interface|type)[ \t]+([A-Za-z_$][\w$]*)",
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const[ \t]+)?enum[ \t]+([A-Za-z_$][\w$]*)",
    ]),
    exports: compile(&[
        r"(?m)^[ \t]*export[ \t]+(?:default[ \t]+)?(?:abstract[ \t]+)?(?:async[ \t]+)?(?:function[ \t]*\*?|class|const|let|var|interface|type|enum)[ \t]+([A-Za-z_$][\w$]*)",
        r"(?m)^[ \t]*export[ \t]+default[ \t]+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*$",
    ]),
    export_lists: compile(&[r"(?m)^[ \t]*export[ \t]*\{([^}]*)\}"]),
});

static JAVASCRIPT_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    imports: compile(&[
        r#"(?m)^[ \t]*import[ \t]+(?:[\w$*{}, \t]+[ \t]+from[ \t]+)?['"]([^'"\n]+)['"]"#,
        r#"require\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
        r#"import\([ \t]*['"]([^'"\n]+)['"][ \t]*\)"#,
    ]),
    functions: compile(&[
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?(?:async[ \t]+)?function[ \t]*\*?[ \t]*([A-Za-z_$][\w$]*)",
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:const|let|var)[ \t]+([A-Za-z_$][\w$]*)[ \t]*=[ \t]*(?:async[ \t]+)?(?:function\b|\([^)\n]*\)[ \t]*=>|[A-Za-z_$][\w$]*[ \t]*=>)",
    ]),
    classes: compile(&[
        r"(?m)^[ \t]*(?:export[ \t]+)?(?:default[ \t]+)?class[ \t]+([A-Za-z_$][\w$]*)",
    ]),
    // JavaScript has no type/interface declarations
    types: Vec::new(),
    exports: compile(&[
        r"(?m)^[ \t]*export[ \t]+(?:default[ \t]+)?(?:async[ \t]+)?(?:function[ \t]*\*?|class|const|let|var)[ \t]+([A-Za-z_$][\w$]*)",
        r"(?m)^[ \t]*export[ \t]+default[ \t]+([A-Za-z_$][\w$]*)[ \t]*;?[ \t]*$",
        // CommonJS named exports
        r"(?m)^[ \t]*(?:module\.)?exports\.([A-Za-z_$][\w$]*)[ \t]*=",
    ]),
    export_lists: compile(&[r"(?m)^[ \t]*export[ \t]*\{([^}]*)\}"]),
});

static PYTHON_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    imports: compile(&[
        r"(?m)^[ \t]*from[ \t]+([\w.]+)[ \t]+import\b",
        r"(?m)^[ \t]*import[ \t]+([\w.]+)",
    ]),
    functions: compile(&[r"(?m)^[ \t]*(?:async[ \t]+)?def[ \t]+([A-Za-z_]\w*)"]),
    classes: compile(&[r"(?m)^[ \t]*class[ \t]+([A-Za-z_]\w*)"]),
    types: Vec::new(),
    exports: Vec::new(),
    export_lists: compile(&[r"__all__[ \t]*=[ \t]*\[([^\]]*)\]"]),
});

static RUST_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    imports: compile(&[r"(?m)^[ \t]*(?:pub[ \t]+)?use[ \t]+([\w:]+)"]),
    functions: compile(&[
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:async[ \t]+)?(?:unsafe[ \t]+)?fn[ \t]+([A-Za-z_]\w*)",
    ]),
    classes: Vec::new(),
    types: compile(&[
        r"(?m)^[ \t]*(?:pub(?:\([^)\n]*\))?[ \t]+)?(?:struct|enum|trait|union|type)[ \t]+([A-Za-z_]\w*)",
    ]),
    exports: compile(&[
        r"(?m)^[ \t]*pub(?:\([^)\n]*\))?[ \t]+(?:async[ \t]+)?(?:unsafe[ \t]+)?(?:fn|struct|enum|trait|const|static|type|mod)[ \t]+([A-Za-z_]\w*)",
    ]),
    export_lists: Vec::new(),
});

static GO_RULES: LazyLock<RuleSet> = LazyLock::new(|| RuleSet {
    imports: compile(&[
        r#"(?m)^[ \t]*import[ \t]+(?:\w+[ \t]+)?"([^"\n]+)""#,
        // entries inside an import ( ... ) block
        r#"(?m)^\t"([^"\n]+)"$"#,
    ]),
    functions: compile(&[r"(?m)^func[ \t]+(?:\([^)\n]*\)[ \t]+)?([A-Za-z_]\w*)"]),
    classes: Vec::new(),
    types: compile(&[r"(?m)^type[ \t]+([A-Za-z_]\w*)"]),
    // Go exports by capitalization; no explicit export statements
    exports: Vec::new(),
    export_lists: Vec::new(),
});

fn rules_for(language: Language) -> Option<&'static RuleSet> {
    match language {
        Language::TypeScript => Some(&TYPESCRIPT_RULES),
        Language::JavaScript => Some(&JAVASCRIPT_RULES),
        Language::Python => Some(&PYTHON_RULES),
        Language::Rust => Some(&RUST_RULES),
        Language::Go => Some(&GO_RULES),
        Language::Markup | Language::Data | Language::Unknown => None,
    }
}

/// Analyze file content under the rules of `language`.
///
/// Unsupported languages yield an analysis with empty symbol lists but
/// populated `line_count`/`byte_size`.
pub fn analyze(content: &str, language: Language) -> FileAnalysis {
    let Some(rules) = rules_for(language) else {
        return FileAnalysis::empty(language, content);
    };

    let index = NewlineIndex::build(content.as_bytes());

    let mut analysis = FileAnalysis::empty(language, content);
    analysis.imports = extract_imports(content, &index, &rules.imports);
    analysis.functions = extract_symbols(content, &index, &rules.functions);
    analysis.classes = extract_symbols(content, &index, &rules.classes);
    analysis.types = extract_symbols(content, &index, &rules.types);
    analysis.exports = extract_exports(content, &index, rules);
    analysis
}

/// Convenience wrapper: infer the language from the path, then analyze.
pub fn analyze_path(content: &str, path: &Path) -> FileAnalysis {
    analyze(content, Language::from_path(path))
}

/// First non-empty capture group of a match, if any.
fn first_capture<'t>(caps: &regex::Captures<'t>) -> Option<regex::Match<'t>> {
    (1..caps.len()).find_map(|i| caps.get(i))
}

fn extract_imports(content: &str, index: &NewlineIndex, rules: &[Regex]) -> Vec<ImportRef> {
    // First occurrence wins; insertion order preserved for the planner.
    let mut seen: IndexMap<String, usize> = IndexMap::new();

    for rule in rules {
        for caps in rule.captures_iter(content) {
            let Some(m) = first_capture(&caps) else {
                continue;
            };
            seen.entry(m.as_str().to_string())
                .or_insert_with(|| index.line_of_byte(m.start()));
        }
    }

    let mut imports: Vec<ImportRef> = seen
        .into_iter()
        .map(|(source, line)| ImportRef { source, line })
        .collect();

    // Rules run one after another, so re-establish file order.
    imports.sort_by_key(|i| i.line);
    imports
}

fn extract_symbols(content: &str, index: &NewlineIndex, rules: &[Regex]) -> Vec<SymbolRef> {
    let mut seen: IndexMap<String, usize> = IndexMap::new();

    for rule in rules {
        for caps in rule.captures_iter(content) {
            let Some(m) = first_capture(&caps) else {
                continue;
            };
            seen.entry(m.as_str().to_string())
                .or_insert_with(|| index.line_of_byte(m.start()));
        }
    }

    let mut symbols: Vec<SymbolRef> = seen
        .into_iter()
        .map(|(name, line)| SymbolRef { name, line })
        .collect();

    symbols.sort_by_key(|s| s.line);
    symbols
}

fn extract_exports(content: &str, index: &NewlineIndex, rules: &RuleSet) -> Vec<SymbolRef> {
    let mut out = extract_symbols(content, index, &rules.exports);

    // Name-list forms: split on commas, honor `orig as alias`
    // (the alias is the exported name), strip Python's quotes.
    for rule in &rules.export_lists {
        for caps in rule.captures_iter(content) {
            let Some(m) = first_capture(&caps) else {
                continue;
            };
            let line = index.line_of_byte(m.start());
            for raw in m.as_str().split(',') {
                let name = raw
                    .rsplit(" as ")
                    .next()
                    .unwrap_or(raw)
                    .trim()
                    .trim_matches(['\'', '"'])
                    .to_string();
                if !name.is_empty() && !out.iter().any(|s| s.name == name) {
                    out.push(SymbolRef { name, line });
                }
            }
        }
    }

    out.sort_by_key(|s| s.line);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typescript_full_summary() {
        let src = r#"import { helper } from "./util";
import fs from "fs";
const lazy = require("./lazy");

export interface Point { x: number; y: number }

export function add(a: number, b: number): number {
    return a + b;
}

const mul = (a: number, b: number) => a * b;

export class Calculator {
    value = 0;
}

export { mul };
"#;
        let analysis = analyze(src, Language::TypeScript);

        let sources: Vec<_> = analysis.imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["./util", "fs", "./lazy"]);
        assert_eq!(analysis.imports[0].line, 1);

        let fns: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fns, vec!["add", "mul"]);

        let classes: Vec<_> = analysis.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(classes, vec!["Calculator"]);

        let types: Vec<_> = analysis.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(types, vec!["Point"]);

        let exports: Vec<_> = analysis.exports.iter().map(|e| e.name.as_str()).collect();
        assert!(exports.contains(&"add"));
        assert!(exports.contains(&"Calculator"));
        assert!(exports.contains(&"mul"));
    }

    #[test]
    fn export_list_aliases_use_exported_name() {
        let src = "const internal = () => 1;\nexport { internal as publicName };\n";
        let analysis = analyze(src, Language::TypeScript);

        let exports: Vec<_> = analysis.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exports, vec!["publicName"]);
    }

    #[test]
    fn python_summary() {
        let src = "import os\nfrom collections import OrderedDict\n\nclass Widget:\n    def render(self):\n        pass\n\ndef main():\n    pass\n\n__all__ = ['Widget', 'main']\n";
        let analysis = analyze(src, Language::Python);

        let sources: Vec<_> = analysis.imports.iter().map(|i| i.source.as_str()).collect();
        assert_eq!(sources, vec!["os", "collections"]);

        let fns: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fns, vec!["render", "main"]);

        let classes: Vec<_> = analysis.classes.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(classes, vec!["Widget"]);

        let exports: Vec<_> = analysis.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exports, vec!["Widget", "main"]);
    }

    #[test]
    fn rust_summary() {
        let src = "use std::fmt;\n\npub struct Config {\n    name: String,\n}\n\npub fn load() -> Config {\n    todo_impl()\n}\n\nfn todo_impl() -> Config {\n    unimplemented!()\n}\n";
        let analysis = analyze(src, Language::Rust);

        assert_eq!(analysis.imports[0].source, "std::fmt");

        let fns: Vec<_> = analysis.functions.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(fns, vec!["load", "todo_impl"]);

        let types: Vec<_> = analysis.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(types, vec!["Config"]);

        let exports: Vec<_> = analysis.exports.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(exports, vec!["Config", "load"]);
    }

    #[test]
    fn unsupported_language_yields_empty_lists() {
        let src = "# Title\n\nSome (unbalanced text\n";
        let analysis = analyze(src, Language::Markup);

        assert!(analysis.imports.is_empty());
        assert!(analysis.functions.is_empty());
        assert_eq!(analysis.line_count, 3);
        assert_eq!(analysis.byte_size, src.len());
    }

    #[test]
    fn malformed_source_never_panics() {
        let src = "import {{{{ from from ((('\nfunction \nclass\n";
        let analysis = analyze(src, Language::TypeScript);
        assert!(analysis.functions.is_empty());
    }

    #[test]
    fn duplicate_declarations_reported_once() {
        let src = "function dup() {}\nfunction dup() {}\n";
        let analysis = analyze(src, Language::JavaScript);
        assert_eq!(analysis.functions.len(), 1);
        assert_eq!(analysis.functions[0].line, 1);
    }

    #[test]
    fn language_detection_matrix() {
        assert_eq!(Language::from_path(Path::new("a.ts")), Language::TypeScript);
        assert_eq!(Language::from_path(Path::new("b.jsx")), Language::JavaScript);
        assert_eq!(Language::from_path(Path::new("c.py")), Language::Python);
        assert_eq!(Language::from_path(Path::new("d.rs")), Language::Rust);
        assert_eq!(Language::from_path(Path::new("e.go")), Language::Go);
        assert_eq!(Language::from_path(Path::new("f.md")), Language::Markup);
        assert_eq!(Language::from_path(Path::new("g.json")), Language::Data);
        assert_eq!(Language::from_path(Path::new("h.xyz")), Language::Unknown);
        assert_eq!(Language::from_path(Path::new("Makefile")), Language::Unknown);
    }
}
