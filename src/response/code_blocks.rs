//! Fenced code block scanning and the language ↔ extension tables.
//!
//! Recognizes backtick and tilde fences of three or more characters. The
//! info string after the opening fence is split into an optional language
//! tag and an optional header (everything else on that line). Blocks that
//! never close are skipped.

use std::sync::OnceLock;

use regex::Regex;

/// One closed fenced block in a completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Position among all closed blocks, starting at 0.
    pub index: usize,
    /// Lowercased language tag, if the info string started with one.
    pub language: Option<String>,
    /// Remaining info-string text after the language tag.
    pub header: Option<String>,
    pub body: String,
    /// 0-based line of the opening fence.
    pub start_line: usize,
    /// 0-based line of the closing fence.
    pub end_line: usize,
}

struct OpenFence<'a> {
    marker: char,
    len: usize,
    info: &'a str,
}

// ─── Scanner ─────────────────────────────────────────────────────────────────

/// Scan `text` for closed fenced blocks, in order.
pub fn scan_fenced_blocks(text: &str) -> Vec<FencedBlock> {
    let lines: Vec<&str> = text.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let Some(open) = parse_open_fence(lines[i]) else {
            i += 1;
            continue;
        };

        let close = (i + 1..lines.len()).find(|&j| is_closing_fence(lines[j], &open));
        let Some(close) = close else {
            tracing::debug!(line = i, "skipping unterminated fenced block");
            break;
        };

        let (language, header) = parse_info(open.info);
        blocks.push(FencedBlock {
            index: blocks.len(),
            language,
            header,
            body: lines[i + 1..close].join("\n"),
            start_line: i,
            end_line: close,
        });
        i = close + 1;
    }

    blocks
}

fn parse_open_fence(line: &str) -> Option<OpenFence<'_>> {
    let trimmed = line.trim_start();
    let marker = trimmed.chars().next().filter(|c| *c == '`' || *c == '~')?;
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    Some(OpenFence {
        marker,
        len,
        info: trimmed[len..].trim(),
    })
}

fn is_closing_fence(line: &str, open: &OpenFence<'_>) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= open.len && trimmed.chars().all(|c| c == open.marker)
}

// ─── Info String ─────────────────────────────────────────────────────────────

fn is_language_token(token: &str) -> bool {
    static LANGUAGE_TOKEN: OnceLock<Regex> = OnceLock::new();
    LANGUAGE_TOKEN
        .get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9_+#\-]*$").expect("language token pattern is valid"))
        .is_match(token)
}

/// Split an info string into `(language, header)`.
///
/// Forms: `lang`, `lang header…`, `lang:path`, and a bare `header…` whose
/// first token is not a language tag (e.g. `main.go` or `// main.go`).
fn parse_info(info: &str) -> (Option<String>, Option<String>) {
    let info = info.trim();
    if info.is_empty() {
        return (None, None);
    }

    let (first, rest) = match info.split_once(char::is_whitespace) {
        Some((first, rest)) => (first, rest.trim()),
        None => (info, ""),
    };

    if let Some((lang, path)) = first.split_once(':') {
        let drive_letter = lang.len() == 1 && (path.starts_with('\\') || path.starts_with('/'));
        if !path.is_empty() && !drive_letter && is_known_language(lang) {
            let header = if rest.is_empty() {
                path.to_string()
            } else {
                format!("{path} {rest}")
            };
            return (Some(lang.to_lowercase()), Some(header));
        }
    }

    if is_language_token(first) {
        let header = (!rest.is_empty()).then(|| rest.to_string());
        return (Some(first.to_lowercase()), header);
    }

    (None, Some(info.to_string()))
}

// ─── Language Tables ─────────────────────────────────────────────────────────

const LANGUAGE_EXTENSIONS: &[(&str, &str)] = &[
    ("rust", "rs"),
    ("rs", "rs"),
    ("go", "go"),
    ("golang", "go"),
    ("python", "py"),
    ("py", "py"),
    ("javascript", "js"),
    ("js", "js"),
    ("jsx", "jsx"),
    ("typescript", "ts"),
    ("ts", "ts"),
    ("tsx", "tsx"),
    ("java", "java"),
    ("kotlin", "kt"),
    ("swift", "swift"),
    ("c", "c"),
    ("cpp", "cpp"),
    ("c++", "cpp"),
    ("csharp", "cs"),
    ("cs", "cs"),
    ("c#", "cs"),
    ("ruby", "rb"),
    ("rb", "rb"),
    ("php", "php"),
    ("html", "html"),
    ("css", "css"),
    ("scss", "scss"),
    ("json", "json"),
    ("yaml", "yaml"),
    ("yml", "yaml"),
    ("toml", "toml"),
    ("xml", "xml"),
    ("sql", "sql"),
    ("bash", "sh"),
    ("sh", "sh"),
    ("shell", "sh"),
    ("zsh", "sh"),
    ("powershell", "ps1"),
    ("markdown", "md"),
    ("md", "md"),
    ("dockerfile", "dockerfile"),
    ("makefile", "mk"),
    ("make", "mk"),
    ("text", "txt"),
    ("plaintext", "txt"),
    ("txt", "txt"),
    ("vue", "vue"),
    ("svelte", "svelte"),
    ("lua", "lua"),
    ("dart", "dart"),
    ("scala", "scala"),
    ("r", "r"),
    ("graphql", "graphql"),
    ("proto", "proto"),
    ("protobuf", "proto"),
];

const SHELL_LANGUAGES: &[&str] = &[
    "bash", "sh", "shell", "zsh", "console", "shell-session", "powershell", "ps1", "cmd", "bat",
];

fn is_known_language(lang: &str) -> bool {
    let lower = lang.to_lowercase();
    LANGUAGE_EXTENSIONS.iter().any(|(name, _)| *name == lower)
}

/// File extension for a language tag, falling back to `txt`.
pub fn extension_for_language(language: Option<&str>) -> &'static str {
    let Some(language) = language else {
        return "txt";
    };
    let lower = language.to_lowercase();
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(name, _)| *name == lower)
        .map(|(_, ext)| *ext)
        .unwrap_or("txt")
}

/// Canonical language name for a file extension (first table entry wins).
pub fn language_for_extension(extension: &str) -> Option<&'static str> {
    let ext = canonical_extension(extension);
    LANGUAGE_EXTENSIONS
        .iter()
        .find(|(_, e)| *e == ext)
        .map(|(name, _)| *name)
}

pub fn is_shell_language(language: &str) -> bool {
    SHELL_LANGUAGES.contains(&language.to_lowercase().as_str())
}

/// Lowercase an extension and fold common aliases (`yml` → `yaml`).
pub fn canonical_extension(extension: &str) -> String {
    let lower = extension.trim_start_matches('.').to_lowercase();
    match lower.as_str() {
        "yml" => "yaml".into(),
        "htm" => "html".into(),
        "mjs" | "cjs" => "js".into(),
        "markdown" => "md".into(),
        "bash" | "zsh" => "sh".into(),
        _ => lower,
    }
}

/// Extension of the last path segment, if it has one.
pub fn extension_of(path: &str) -> Option<String> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (stem, ext) = file_name.rsplit_once('.')?;
    if ext.is_empty() || (stem.is_empty() && !file_name.starts_with('.')) {
        return None;
    }
    Some(canonical_extension(ext))
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scan_single_block_with_header() {
        let blocks = scan_fenced_blocks("```go main.go\nfunc main(){}\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].language.as_deref(), Some("go"));
        assert_eq!(blocks[0].header.as_deref(), Some("main.go"));
        assert_eq!(blocks[0].body, "func main(){}");
        assert_eq!((blocks[0].start_line, blocks[0].end_line), (0, 2));
    }

    #[test]
    fn test_scan_multiple_blocks_in_order() {
        let text = "Intro\n```go\npackage main\n```\nthen\n```yaml config.yaml\nserver:\n  port: 8080\n```\n";
        let blocks = scan_fenced_blocks(text);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].index, 0);
        assert_eq!(blocks[1].index, 1);
        assert_eq!(blocks[1].body, "server:\n  port: 8080");
    }

    #[test]
    fn test_unterminated_block_is_skipped() {
        let blocks = scan_fenced_blocks("```rust\nfn main() {}\n");
        assert!(blocks.is_empty());
    }

    #[test]
    fn test_longer_fence_contains_shorter() {
        let text = "````md\n```rust\nfn x() {}\n```\n````";
        let blocks = scan_fenced_blocks(text);
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "```rust\nfn x() {}\n```");
    }

    #[test]
    fn test_tilde_fence() {
        let blocks = scan_fenced_blocks("~~~python\nprint(1)\n~~~");
        assert_eq!(blocks[0].language.as_deref(), Some("python"));
        assert_eq!(blocks[0].body, "print(1)");
    }

    #[test]
    fn test_empty_body() {
        let blocks = scan_fenced_blocks("```\n```");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].body, "");
        assert_eq!(blocks[0].language, None);
    }

    #[test]
    fn test_parse_info_forms() {
        assert_eq!(parse_info(""), (None, None));
        assert_eq!(parse_info("Rust"), (Some("rust".into()), None));
        assert_eq!(
            parse_info("rust:src/main.rs"),
            (Some("rust".into()), Some("src/main.rs".into()))
        );
        assert_eq!(parse_info("main.go"), (None, Some("main.go".into())));
        assert_eq!(parse_info("// main.go"), (None, Some("// main.go".into())));
        assert_eq!(
            parse_info("python # app.py"),
            (Some("python".into()), Some("# app.py".into()))
        );
        assert_eq!(
            parse_info("C:\\proj\\main.c"),
            (None, Some("C:\\proj\\main.c".into()))
        );
        assert_eq!(
            parse_info("File: main.go"),
            (None, Some("File: main.go".into()))
        );
    }

    #[test]
    fn test_extension_table() {
        assert_eq!(extension_for_language(Some("Rust")), "rs");
        assert_eq!(extension_for_language(Some("golang")), "go");
        assert_eq!(extension_for_language(Some("c#")), "cs");
        assert_eq!(extension_for_language(Some("brainfudge")), "txt");
        assert_eq!(extension_for_language(None), "txt");
    }

    #[test]
    fn test_language_for_extension() {
        assert_eq!(language_for_extension("rs"), Some("rust"));
        assert_eq!(language_for_extension(".yml"), Some("yaml"));
        assert_eq!(language_for_extension("zzz"), None);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("src/main.rs").as_deref(), Some("rs"));
        assert_eq!(extension_of("config.YML").as_deref(), Some("yaml"));
        assert_eq!(extension_of("Dockerfile"), None);
        assert_eq!(extension_of("dir.d/Makefile"), None);
        assert_eq!(extension_of(".env").as_deref(), Some("env"));
    }

    #[test]
    fn test_shell_languages() {
        assert!(is_shell_language("bash"));
        assert!(is_shell_language("Shell"));
        assert!(!is_shell_language("python"));
    }
}
