//! Code-block recommendation extractor.
//!
//! Runs once over a completed response. Every closed fenced block becomes a
//! candidate [`Recommendation`]; its target path is resolved by the first
//! rule that produces one:
//!
//! 1. the fence header is itself a path (`go main.go`, `// main.go`, `File: main.go`)
//! 2. the fence header embeds a tool-call tag, possibly truncated
//!    (`<write_file>main.go`); an implausible inner path skips the block
//! 3. a comment in the first few body lines names a path
//! 4. the body is substantive code and a path named by a tool call elsewhere
//!    in the response has the block's extension
//! 5. a synthesized `code<N>.<ext>` name
//!
//! Results are deduplicated by path, first block wins.

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use super::code_blocks::{
    canonical_extension, extension_for_language, extension_of, is_shell_language,
    language_for_extension, scan_fenced_blocks, FencedBlock,
};
use super::errors::ResponseError;
use super::path_classifier::is_valid_path;
use super::tool_tags::{find_embedded_tag, find_tag_spans, starts_with_tool_markup, ToolKind};
use super::types::{LineRange, Recommendation};

/// Default number of leading body lines searched for a path comment.
pub const DEFAULT_COMMENT_SCAN_LINES: usize = 5;

/// Languages whose bodies are legitimately wrapped in angle brackets.
const MARKUP_LANGUAGES: &[&str] = &["html", "xml", "svg", "vue", "svelte", "jsx", "tsx"];

const HEADER_LABELS: &[&str] = &["filename:", "file:", "path:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractorOptions {
    pub max_comment_scan_lines: usize,
}

impl Default for ExtractorOptions {
    fn default() -> Self {
        Self {
            max_comment_scan_lines: DEFAULT_COMMENT_SCAN_LINES,
        }
    }
}

/// Which rule resolved a block's target. Logged at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rule {
    Header,
    HeaderTag,
    LeadingComment,
    KnownToolPath,
    Synthesized,
}

#[derive(Debug)]
struct Resolved {
    path: String,
    line_numbers: Option<LineRange>,
    rule: Rule,
}

/// Stateless apart from its options; safe to share between sessions.
#[derive(Debug, Clone, Default)]
pub struct RecommendationExtractor {
    options: ExtractorOptions,
}

/// Extract with default options.
pub fn extract_recommendations(text: &str) -> Vec<Recommendation> {
    RecommendationExtractor::default().extract(text)
}

impl RecommendationExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self { options }
    }

    /// Extract deduplicated recommendations from `text`, in block order.
    pub fn extract(&self, text: &str) -> Vec<Recommendation> {
        let known_paths = known_tool_call_paths(text);
        let mut seen: HashSet<String> = HashSet::new();
        let mut synthesized = 0usize;
        let mut recommendations = Vec::new();

        for block in scan_fenced_blocks(text) {
            if let Some(reason) = filter_reason(&block) {
                tracing::debug!(
                    block = block.index,
                    start_line = block.start_line,
                    end_line = block.end_line,
                    reason,
                    "skipping code block"
                );
                continue;
            }

            let resolved = match self.resolve(&block, &known_paths, &mut synthesized) {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::debug!(block = block.index, error = %e, "skipping code block");
                    continue;
                }
            };

            if !is_valid_path(&resolved.path) {
                tracing::debug!(block = block.index, path = %resolved.path, "resolved path failed validation");
                continue;
            }
            if !seen.insert(resolved.path.clone()) {
                tracing::debug!(block = block.index, path = %resolved.path, "duplicate target, keeping first");
                continue;
            }

            tracing::debug!(
                block = block.index,
                start_line = block.start_line,
                end_line = block.end_line,
                path = %resolved.path,
                rule = ?resolved.rule,
                "resolved code block target"
            );

            let language = block.language.clone().or_else(|| {
                extension_of(&resolved.path)
                    .and_then(|ext| language_for_extension(&ext))
                    .map(str::to_string)
            });

            recommendations.push(Recommendation {
                file_path: resolved.path,
                code: block.body.trim_matches('\n').to_string(),
                language,
                line_numbers: resolved.line_numbers,
            });
        }

        recommendations
    }

    fn resolve(
        &self,
        block: &FencedBlock,
        known_paths: &[String],
        synthesized: &mut usize,
    ) -> Result<Resolved, ResponseError> {
        if let Some(header) = block.header.as_deref() {
            if let Some((path, line_numbers)) = path_from_header(header) {
                return Ok(Resolved {
                    path,
                    line_numbers,
                    rule: Rule::Header,
                });
            }
            if let Some(result) = path_from_header_tag(header) {
                let (path, line_numbers) = result?;
                return Ok(Resolved {
                    path,
                    line_numbers,
                    rule: Rule::HeaderTag,
                });
            }
        }

        if let Some((path, line_numbers)) =
            path_from_leading_comment(&block.body, self.options.max_comment_scan_lines)
        {
            return Ok(Resolved {
                path,
                line_numbers,
                rule: Rule::LeadingComment,
            });
        }

        let extension = extension_for_language(block.language.as_deref());

        if is_substantive_code(&block.body) {
            if let Some(path) = known_path_with_extension(known_paths, extension) {
                return Ok(Resolved {
                    path: path.to_string(),
                    line_numbers: None,
                    rule: Rule::KnownToolPath,
                });
            }
        }

        *synthesized += 1;
        Ok(Resolved {
            path: format!("code{}.{extension}", *synthesized),
            line_numbers: None,
            rule: Rule::Synthesized,
        })
    }
}

// ─── Pass 1: Known Tool-Call Paths ───────────────────────────────────────────

/// Paths named by balanced tool-call tags anywhere in `text`, unique, in
/// order of first appearance. Only plausible paths are kept.
pub fn known_tool_call_paths(text: &str) -> Vec<String> {
    let mut paths: Vec<String> = Vec::new();

    for span in find_tag_spans(text) {
        let inner = span.inner.trim();
        let candidate = match span.kind {
            ToolKind::WriteFile => inner.lines().next().unwrap_or("").trim(),
            ToolKind::ReadFile | ToolKind::OpenFile => inner,
        };
        if is_valid_path(candidate) && !paths.iter().any(|p| p == candidate) {
            paths.push(candidate.to_string());
        }
    }

    paths
}

// ─── Filters ─────────────────────────────────────────────────────────────────

fn filter_reason(block: &FencedBlock) -> Option<&'static str> {
    let trimmed = block.body.trim();
    if trimmed.is_empty() {
        return Some("empty body");
    }
    if is_tool_markup_echo(block) {
        return Some("shell block echoing tool markup");
    }
    if is_angle_wrapped(block) {
        return Some("body wrapped in angle brackets");
    }
    None
}

fn is_tool_markup_echo(block: &FencedBlock) -> bool {
    block.language.as_deref().is_some_and(is_shell_language)
        && starts_with_tool_markup(block.body.trim_start())
}

fn is_angle_wrapped(block: &FencedBlock) -> bool {
    let markup = block
        .language
        .as_deref()
        .is_some_and(|lang| MARKUP_LANGUAGES.contains(&lang));
    let trimmed = block.body.trim();
    !markup && trimmed.starts_with('<') && trimmed.ends_with('>')
}

// ─── Rule 1: Header Path ─────────────────────────────────────────────────────

fn path_from_header(header: &str) -> Option<(String, Option<LineRange>)> {
    let (path, range) = clean_candidate(header);
    is_valid_path(&path).then_some((path, range))
}

// ─── Rule 2: Header Tag ──────────────────────────────────────────────────────

/// `None` when the header holds no tag; `Some(Err)` when it holds one whose
/// inner path is implausible, which skips the block.
fn path_from_header_tag(
    header: &str,
) -> Option<Result<(String, Option<LineRange>), ResponseError>> {
    let (_, inner) = find_embedded_tag(header)?;
    let (path, range) = clean_candidate(inner);
    if is_valid_path(&path) {
        Some(Ok((path, range)))
    } else {
        Some(Err(ResponseError::InvalidPath { path }))
    }
}

// ─── Rule 3: Leading Comment ─────────────────────────────────────────────────

const LINE_COMMENT_MARKERS: &[(&str, char)] =
    &[("//", '/'), ("#", '#'), ("--", '-'), (";", ';'), ("%", '%')];
const BLOCK_COMMENT_MARKERS: &[(&str, &str)] = &[("/*", "*/"), ("<!--", "-->")];

fn path_from_leading_comment(body: &str, max_lines: usize) -> Option<(String, Option<LineRange>)> {
    body.lines()
        .take(max_lines)
        .map(str::trim)
        .filter(|line| !line.is_empty() && !is_shebang_or_encoding(line))
        .filter_map(comment_content)
        .filter(|content| !starts_with_any_comment_marker(content))
        .map(clean_candidate)
        .find(|(path, _)| is_valid_path(path))
}

fn is_shebang_or_encoding(line: &str) -> bool {
    line.starts_with("#!") || line.starts_with("# -*-")
}

/// The text of a single-line comment, with its marker stripped.
fn comment_content(line: &str) -> Option<&str> {
    for (open, close) in BLOCK_COMMENT_MARKERS {
        if let Some(rest) = line.strip_prefix(open) {
            return Some(rest.trim_end_matches(close).trim());
        }
    }
    for (marker, repeat) in LINE_COMMENT_MARKERS {
        if line.starts_with(marker) {
            return Some(line.trim_start_matches(*repeat).trim());
        }
    }
    None
}

fn starts_with_any_comment_marker(content: &str) -> bool {
    LINE_COMMENT_MARKERS
        .iter()
        .any(|(marker, _)| content.starts_with(marker))
        || BLOCK_COMMENT_MARKERS
            .iter()
            .any(|(open, _)| content.starts_with(open))
}

// ─── Rule 4: Known Tool-Call Path ────────────────────────────────────────────

const CODE_TOKENS: &[&str] = &[
    "{", "}", "(", ")", ";", "=", "=>", "->", "::", "fn ", "func ", "def ", "class ", "import ",
    "return", "const ", "let ", "var ", "package ", "struct ", "impl ", "public ", "#include",
];

/// Long enough, contains structural tokens, and is not markdown or prose.
fn is_substantive_code(body: &str) -> bool {
    let trimmed = body.trim();
    trimmed.len() > 50
        && CODE_TOKENS.iter().any(|token| trimmed.contains(token))
        && !looks_like_markdown(trimmed)
        && !looks_like_prose(trimmed)
}

fn looks_like_markdown(text: &str) -> bool {
    static LIST_ITEM: OnceLock<Regex> = OnceLock::new();
    let list_item =
        LIST_ITEM.get_or_init(|| Regex::new(r"^(?:[-*+>]\s|#{1,6}\s|\d+\.\s)").expect("list item pattern is valid"));

    let mut lines = text.lines().map(str::trim).filter(|l| !l.is_empty()).peekable();
    lines.peek().is_some() && lines.all(|l| list_item.is_match(l))
}

/// Most lines read as sentences: several words, ending in terminal punctuation.
fn looks_like_prose(text: &str) -> bool {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    let sentences = lines
        .iter()
        .filter(|l| l.split_whitespace().count() >= 5 && l.ends_with(['.', '!', '?']))
        .count();
    !lines.is_empty() && sentences * 2 > lines.len()
}

fn known_path_with_extension<'a>(known_paths: &'a [String], extension: &str) -> Option<&'a str> {
    let wanted = canonical_extension(extension);
    known_paths
        .iter()
        .find(|path| extension_of(path).as_deref() == Some(wanted.as_str()))
        .map(String::as_str)
}

// ─── Candidate Cleaning ──────────────────────────────────────────────────────

/// Strip comment markers, labels, quoting and a line-range suffix from a
/// header or comment, returning the bare candidate path.
fn clean_candidate(raw: &str) -> (String, Option<LineRange>) {
    let mut text = raw.trim();

    if let Some(content) = comment_content(text) {
        text = content;
    }

    let lower = text.to_lowercase();
    if let Some(label) = HEADER_LABELS.iter().find(|label| lower.starts_with(*label)) {
        text = text.get(label.len()..).unwrap_or(text).trim();
    }

    text = text.trim_matches(|c: char| c == '`' || c == '"' || c == '\'').trim();

    let (path, range) = split_line_range(text);
    (path.trim_end_matches(':').trim().to_string(), range)
}

/// Split `path:10-20`, `path:7` or `path#L10-L20` into path and range.
fn split_line_range(text: &str) -> (&str, Option<LineRange>) {
    static LINE_RANGE: OnceLock<Regex> = OnceLock::new();
    let re = LINE_RANGE.get_or_init(|| {
        Regex::new(r"(?::(\d+)(?:-(\d+))?|#L(\d+)(?:-L?(\d+))?)$").expect("line range pattern is valid")
    });

    let Some(caps) = re.captures(text) else {
        return (text, None);
    };
    let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
    let Some(start) = number(1).or_else(|| number(3)) else {
        return (text, None);
    };
    let end = number(2).or_else(|| number(4)).unwrap_or(start);

    let whole = caps.get(0).map(|m| m.start()).unwrap_or(text.len());
    (&text[..whole], Some(LineRange::new(start, end)))
}

// ─── Tests ───────────────────────────────────────────────────────────────────
