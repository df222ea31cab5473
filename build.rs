use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use walkdir::WalkDir;

// Directories holding this crate's own Rust sources. Anything else under the
// package root (build output, vendored reference material) is not scanned.
const SOURCE_DIRS: [&str; 5] = ["risk", "calibrate", "cli", "tests", "benches"];

const FORBIDDEN_WORDS: [&str; 14] = [
    "FIXED",
    "CORRECTED",
    "FIX",
    "FIXES",
    "NEW",
    "CHANGED",
    "CHANGES",
    "CHANGE",
    "MODIFIED",
    "MODIFIES",
    "MODIFY",
    "UPDATED",
    "UPDATES",
    "UPDATE",
];

// Collects matching lines from a single file so the whole list can be
// reported at once.
struct ViolationCollector {
    violations: Vec<String>,
    file_path: PathBuf,
    kind: ViolationKind,
}

#[derive(Clone, Copy)]
enum ViolationKind {
    UnderscorePrefix,
    ForbiddenComment { check_stars_in_doc_comments: bool },
    UppercaseComment,
    AllowDeadCode,
}

impl ViolationCollector {
    fn new(file_path: &Path, kind: ViolationKind) -> Self {
        Self {
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
            kind,
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let what = match self.kind {
            ViolationKind::UnderscorePrefix => "underscore-prefixed variables",
            ViolationKind::ForbiddenComment { .. } => "forbidden comment patterns",
            ViolationKind::UppercaseComment => {
                "comments with all uppercase alphabetic characters"
            }
            ViolationKind::AllowDeadCode => "#[allow(dead_code)] attributes",
        };
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            what,
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }

        match self.kind {
            ViolationKind::UnderscorePrefix => {
                error_msg.push_str(
                    "\n⚠️ Underscore-prefixed variable names are not allowed in kindred.\n",
                );
                error_msg.push_str(
                    "   Either use the variable (removing the underscore) or remove it completely.\n",
                );
            }
            ViolationKind::ForbiddenComment { .. } => {
                error_msg.push_str(&format!(
                    "\n⚠️ Comments containing {} are not allowed in kindred.\n",
                    FORBIDDEN_WORDS
                        .iter()
                        .map(|w| format!("'{w}'"))
                        .collect::<Vec<_>>()
                        .join(", ")
                ));
                error_msg.push_str(
                    "   The '**' pattern is not allowed in regular comments (but is allowed in doc comments).\n",
                );
            }
            ViolationKind::UppercaseComment => {
                error_msg.push_str(
                    "\n⚠️ Comments where all alphabetic characters are uppercase are not allowed in kindred.\n",
                );
                error_msg.push_str("   Strongly consider deleting the comment completely.\n");
            }
            ViolationKind::AllowDeadCode => {
                error_msg.push_str(
                    "\n⚠️ #[allow(dead_code)] attributes are not allowed in kindred.\n",
                );
                error_msg.push_str(
                    "   Either use the code (removing the attribute) or remove it completely.\n",
                );
            }
        }
        Some(error_msg)
    }
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

fn is_comment_line(line: &str) -> bool {
    line.trim_start().starts_with("//") || line.contains("/*")
}

// Matches inside a quoted string are not identifiers.
fn underscore_match_is_in_string(line: &str) -> bool {
    line.split('"')
        .enumerate()
        .any(|(i, part)| i % 2 == 1 && part.contains('_'))
}

fn comment_text(line: &str) -> Option<&str> {
    let trimmed = line.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        Some(rest.trim())
    } else if let Some(rest) = trimmed.strip_prefix("//") {
        Some(rest.trim())
    } else if let Some(idx) = line.find("/*") {
        let rest = &line[idx + 2..];
        Some(match rest.find("*/") {
            Some(end) => rest[..end].trim(),
            None => rest.trim(),
        })
    } else {
        None
    }
}

impl Sink for ViolationCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();

        let is_violation = match self.kind {
            ViolationKind::UnderscorePrefix => {
                let is_pure_comment = line_text.trim_start().starts_with("//")
                    || (line_text.contains("/*")
                        && !line_text.contains("*/match")
                        && !line_text.contains("*/let"));
                !is_pure_comment && !underscore_match_is_in_string(line_text)
            }
            ViolationKind::ForbiddenComment {
                check_stars_in_doc_comments,
            } => {
                // A line with a forbidden word is never excused.
                let has_forbidden_word = FORBIDDEN_WORDS.iter().any(|w| line_text.contains(w));
                check_stars_in_doc_comments
                    || has_forbidden_word
                    || !(is_doc_comment(line_text) && line_text.contains("**"))
            }
            ViolationKind::UppercaseComment => {
                is_comment_line(line_text)
                    && comment_text(line_text).is_some_and(|text| {
                        let mut letters = text.chars().filter(|c| c.is_alphabetic()).peekable();
                        letters.peek().is_some() && letters.all(|c| c.is_uppercase())
                    })
            }
            ViolationKind::AllowDeadCode => true,
        };

        if is_violation {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

// Every .rs file under the crate's source directories.
fn rust_sources() -> impl Iterator<Item = PathBuf> {
    SOURCE_DIRS
        .into_iter()
        .filter(|dir| Path::new(dir).is_dir())
        .flat_map(|dir| {
            WalkDir::new(dir)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
                .map(|e| e.into_path())
        })
}

fn scan(pattern: &str, kind: ViolationKind) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(pattern)?;
    let mut searcher = Searcher::new();
    for path in rust_sources() {
        let mut collector = ViolationCollector::new(&path, kind);
        searcher.search_path(&matcher, &path, &mut collector)?;
        if let Some(error_message) = collector.check_and_get_error_message() {
            return Err(error_message.into());
        }
    }
    Ok(())
}

fn scan_source_policy() -> Result<(), Box<dyn Error>> {
    // Underscore-prefixed bindings, including in match arms and destructuring.
    scan(r"\b(_[a-zA-Z0-9_]+)\b", ViolationKind::UnderscorePrefix)?;

    let forbidden_words_pattern = format!(r"(//|/\*|///).*(?:{})", FORBIDDEN_WORDS.join("|"));
    scan(
        &forbidden_words_pattern,
        ViolationKind::ForbiddenComment {
            check_stars_in_doc_comments: true,
        },
    )?;
    scan(
        r"(//|/\*).*\*\*",
        ViolationKind::ForbiddenComment {
            check_stars_in_doc_comments: false,
        },
    )?;
    scan(r"(//|/\*|///).*", ViolationKind::UppercaseComment)?;
    scan(
        r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]",
        ViolationKind::AllowDeadCode,
    )?;
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for dir in SOURCE_DIRS {
        println!("cargo:rerun-if-changed={dir}");
    }

    let build_timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    println!("cargo:rustc-env=KINDRED_BUILD_TIMESTAMP={build_timestamp}");

    if let Err(e) = scan_source_policy() {
        // Shown in cargo's output before the build fails.
        eprintln!("{e}");
        std::process::exit(1);
    }
}
