//! Path plausibility classifier.
//!
//! Model output is full of strings that look a bit like file paths: shell
//! commands, URLs, half sentences, comment lines. [`is_valid_path`] decides
//! whether a candidate is a usable file target.
//!
//! Every rule is a standalone predicate. Rejection rules run first and any one
//! of them vetoes the candidate; then at least one acceptance rule must match.
//! [`rejection_reason`] exposes which rule fired, for debug logging.

use std::sync::OnceLock;

use regex::Regex;

use super::tool_tags::TAG_FRAGMENTS;

// ─── Word Lists ──────────────────────────────────────────────────────────────

/// Interpreters and shell commands. A candidate whose first token is one of
/// these is a command line, not a path.
const COMMAND_WORDS: &[&str] = &[
    "python", "python3", "py", "pip", "pip3", "poetry", "uv", "node", "npm", "npx", "yarn",
    "pnpm", "deno", "bun", "go", "cargo", "rustc", "rustup", "ruby", "gem", "bundle", "java",
    "javac", "mvn", "gradle", "dotnet", "gcc", "g++", "clang", "make", "cmake", "php",
    "composer", "swift", "bash", "sh", "zsh", "pwsh", "powershell", "cd", "ls", "cat", "echo",
    "mkdir", "rm", "cp", "mv", "touch", "chmod", "sudo", "git", "docker", "kubectl",
    "terraform", "curl", "wget", "export", "source", "run",
];

/// Network markers. Anything containing one of these is a URL or a request.
const NETWORK_MARKERS: &[&str] = &["http://", "https://", "curl", "localhost"];

/// Words that show up in prose describing code but never as a standalone
/// token of a real path. Only words longer than three characters count.
const PROSE_WORDS: &[&str] = &[
    "creates", "validates", "middleware", "handles", "implements", "returns", "defines",
    "contains", "configures", "updates", "initializes", "renders", "exports", "imports",
    "example", "following", "function", "component", "should", "which", "this", "that",
    "with", "here", "then", "your", "these", "those", "will", "would",
];

/// File endings accepted outright: extensions plus well-known bare filenames.
const ALLOWED_ENDINGS: &[&str] = &[
    // Systems / compiled
    ".rs", ".go", ".c", ".h", ".cc", ".cpp", ".hpp", ".cs", ".java", ".kt", ".kts", ".swift",
    ".scala", ".zig",
    // Scripting
    ".py", ".rb", ".php", ".lua", ".pl", ".r", ".jl", ".ex", ".exs", ".erl", ".hs", ".ml",
    ".dart", ".sh", ".bash", ".zsh", ".ps1", ".bat",
    // Web
    ".js", ".jsx", ".mjs", ".cjs", ".ts", ".tsx", ".vue", ".svelte", ".html", ".htm", ".css",
    ".scss", ".sass", ".less", ".svg",
    // Data / config
    ".json", ".yaml", ".yml", ".toml", ".xml", ".ini", ".cfg", ".conf", ".env", ".properties",
    ".sql", ".graphql", ".gql", ".proto", ".tf", ".lock", ".mod", ".sum", ".gradle", ".mk",
    ".dockerfile",
    // Docs
    ".md", ".mdx", ".txt", ".rst", ".csv",
    // Bare filenames
    "dockerfile", "makefile", "procfile", "gemfile", "rakefile", "package.json",
    "tsconfig.json", "cargo.toml", "go.mod", "go.sum", "requirements.txt", "pyproject.toml",
    ".gitignore", ".dockerignore", ".editorconfig",
];

/// Leading markers that make a candidate a comment or a flag.
const COMMENT_MARKERS: &[&str] = &["//", "#", "/*", "--"];

// ─── Entry Point ─────────────────────────────────────────────────────────────

/// Decide whether `candidate` is a plausible file target. Pure and deterministic.
pub fn is_valid_path(candidate: &str) -> bool {
    rejection_reason(candidate).is_none() && is_accepted(candidate)
}

/// Name of the first rejection rule `candidate` trips, if any.
pub fn rejection_reason(candidate: &str) -> Option<&'static str> {
    const REJECTIONS: &[(&str, fn(&str) -> bool)] = &[
        ("blank", is_blank),
        ("edge_whitespace", has_edge_whitespace),
        ("double_space", has_double_space),
        ("comment_marker", starts_with_comment_marker),
        ("angle_brackets", has_angle_brackets),
        ("tag_fragment", contains_tag_fragment),
        ("command", starts_with_command),
        ("network", has_network_marker),
        ("prose_word", has_prose_word),
    ];

    REJECTIONS
        .iter()
        .find(|(_, rule)| rule(candidate))
        .map(|(name, _)| *name)
}

fn is_accepted(candidate: &str) -> bool {
    has_allowed_ending(candidate)
        || has_path_separator(candidate)
        || is_bare_filename(candidate)
        || is_absolute_with_extension(candidate)
}

// ─── Rejection Rules ─────────────────────────────────────────────────────────

fn is_blank(candidate: &str) -> bool {
    candidate.trim().is_empty()
}

fn has_edge_whitespace(candidate: &str) -> bool {
    candidate.trim() != candidate
}

fn has_double_space(candidate: &str) -> bool {
    candidate.contains("  ")
}

pub(crate) fn starts_with_comment_marker(candidate: &str) -> bool {
    COMMENT_MARKERS
        .iter()
        .any(|marker| candidate.starts_with(marker))
}

fn has_angle_brackets(candidate: &str) -> bool {
    candidate.contains('<') || candidate.contains('>')
}

fn contains_tag_fragment(candidate: &str) -> bool {
    TAG_FRAGMENTS
        .iter()
        .any(|fragment| candidate.contains(fragment))
}

fn starts_with_command(candidate: &str) -> bool {
    candidate
        .split_whitespace()
        .next()
        .map(|first| COMMAND_WORDS.contains(&first.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn has_network_marker(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    NETWORK_MARKERS.iter().any(|marker| lower.contains(marker))
}

fn has_prose_word(candidate: &str) -> bool {
    candidate.split_whitespace().any(|token| {
        let word = token
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        word.len() > 3 && PROSE_WORDS.contains(&word.as_str())
    })
}

// ─── Acceptance Rules ────────────────────────────────────────────────────────

fn has_allowed_ending(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    ALLOWED_ENDINGS.iter().any(|ending| lower.ends_with(ending))
}

fn has_path_separator(candidate: &str) -> bool {
    (candidate.contains('/') || candidate.contains('\\')) && candidate.len() > 3
}

fn is_bare_filename(candidate: &str) -> bool {
    static BARE_FILENAME: OnceLock<Regex> = OnceLock::new();
    let re = BARE_FILENAME.get_or_init(|| {
        Regex::new(r"^(?:[A-Za-z0-9_][A-Za-z0-9_.\-]*\.[A-Za-z0-9]{1,10}|\.[A-Za-z0-9_][A-Za-z0-9_.\-]*)$")
            .expect("bare filename pattern is valid")
    });
    candidate.len() > 2 && re.is_match(candidate)
}

fn is_absolute_with_extension(candidate: &str) -> bool {
    let absolute = candidate.starts_with('/')
        || candidate.starts_with("~/")
        || is_windows_drive_path(candidate);
    absolute && has_allowed_ending(candidate)
}

fn is_windows_drive_path(candidate: &str) -> bool {
    let bytes = candidate.as_bytes();
    bytes.len() > 3
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes[2] == b'\\' || bytes[2] == b'/')
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_common_paths() {
        for path in [
            "main.go",
            "src/main.rs",
            "config.yaml",
            "package.json",
            "Dockerfile",
            ".gitignore",
            "/home/user/project/app.py",
            "C:\\Users\\dev\\app.ts",
            "~/notes/todo.md",
            "src/components",
            "My Documents/report.txt",
            "build.sh",
        ] {
            assert!(is_valid_path(path), "should accept {path:?}");
        }
    }

    #[test]
    fn test_rejects_blank_and_padded() {
        assert_eq!(rejection_reason(""), Some("blank"));
        assert_eq!(rejection_reason("   "), Some("blank"));
        assert_eq!(rejection_reason(" main.go"), Some("edge_whitespace"));
        assert_eq!(rejection_reason("main.go "), Some("edge_whitespace"));
        assert_eq!(rejection_reason("my  file.txt"), Some("double_space"));
    }

    #[test]
    fn test_rejects_comment_markers() {
        assert_eq!(rejection_reason("// main.go"), Some("comment_marker"));
        assert_eq!(rejection_reason("# config.yaml"), Some("comment_marker"));
        assert_eq!(rejection_reason("--force"), Some("comment_marker"));
    }

    #[test]
    fn test_rejects_markup() {
        assert_eq!(rejection_reason("<main.go>"), Some("angle_brackets"));
        assert_eq!(rejection_reason("app.py</open_file"), Some("angle_brackets"));
        assert!(!is_valid_path("read_file>app.py"));
    }

    #[test]
    fn test_rejects_commands() {
        for cmd in ["python app.py", "node server.js", "go run main.go", "cargo build", "npm install"] {
            assert_eq!(rejection_reason(cmd), Some("command"), "{cmd:?}");
        }
        // A file that merely starts with a command name is fine.
        assert!(is_valid_path("go.mod"));
        assert!(is_valid_path("node_modules/lib/index.js"));
    }

    #[test]
    fn test_rejects_urls() {
        assert_eq!(rejection_reason("https://example.com/app.js"), Some("network"));
        assert_eq!(rejection_reason("localhost:8080/api"), Some("network"));
        assert!(!is_valid_path("http://x.io/a.py"));
    }

    #[test]
    fn test_rejects_prose() {
        assert_eq!(rejection_reason("creates users.go"), Some("prose_word"));
        assert_eq!(rejection_reason("auth middleware file.js"), Some("prose_word"));
        assert!(!is_valid_path("This validates input"));
        // Prose words inside a path segment are not isolated.
        assert!(is_valid_path("src/middleware/auth.js"));
        assert!(is_valid_path("middleware.js"));
    }

    #[test]
    fn test_accepts_directories_with_spaces() {
        let candidate = "docs/My Big Project Notes/plan.md";
        assert_eq!(rejection_reason(candidate), None);
        assert!(is_valid_path(candidate));
        assert!(is_valid_path("Program Files/My App/settings.ini"));
        // Sentences still fail on their command or prose words.
        assert_eq!(rejection_reason("Run the server"), Some("command"));
        assert_eq!(rejection_reason("this file goes in main.go"), Some("prose_word"));
    }

    #[test]
    fn test_rejects_non_paths_without_signals() {
        for candidate in ["hello", "Step 2", "a.", "ab", "TODO:"] {
            assert!(!is_valid_path(candidate), "should reject {candidate:?}");
        }
    }

    #[test]
    fn test_acceptance_rules_individually() {
        assert!(has_allowed_ending("README.MD"));
        assert!(has_path_separator("a/bc"));
        assert!(!has_path_separator("a/b"));
        assert!(is_bare_filename("notes.v2"));
        assert!(!is_bare_filename("a.b c"));
        assert!(is_absolute_with_extension("/etc/app/config.toml"));
        assert!(!is_absolute_with_extension("/etc/app/config"));
    }

    #[test]
    fn test_accepted_strings_never_carry_rejected_features() {
        let samples = [
            "main.go", "<x.go>", "# a.py", "// b.rs", "python c.py", "go d.go", "src/e.ts",
            "f.json", "cargo g.toml", "h/i.md", "#j.rs", "node", "k.yaml",
        ];
        for sample in samples {
            if is_valid_path(sample) {
                assert!(!sample.contains('<') && !sample.contains('>'));
                assert!(!sample.starts_with("//") && !sample.starts_with('#'));
                let first = sample.split_whitespace().next().unwrap_or("");
                assert!(!COMMAND_WORDS.contains(&first));
            }
        }
    }

    #[test]
    fn test_is_deterministic() {
        for sample in ["main.go", "python x.py", "src/lib.rs"] {
            assert_eq!(is_valid_path(sample), is_valid_path(sample));
        }
    }
}
