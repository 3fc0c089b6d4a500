use grep::regex::RegexMatcher;
use grep::searcher::{Searcher, Sink, SinkMatch};
use std::error::Error;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

// Directories holding the crate's own Rust sources. Everything else in the
// checkout (reference material, target/) is left alone.
const SOURCE_ROOTS: [&str; 4] = ["expansion", "numerics", "tests", "benches"];

// Which policy a collector enforces; selects the message printed on failure.
#[derive(Clone, Copy)]
enum Policy {
    UnderscoreBinding,
    ForbiddenWord,
    StarsInComment,
    UppercaseComment,
    AllowDeadCode,
}

impl Policy {
    fn headline(self) -> &'static str {
        match self {
            Policy::UnderscoreBinding => "underscore-prefixed variables",
            Policy::ForbiddenWord => "forbidden comment words",
            Policy::StarsInComment => "'**' patterns in regular comments",
            Policy::UppercaseComment => "comments with all uppercase alphabetic characters",
            Policy::AllowDeadCode => "#[allow(dead_code)] attributes",
        }
    }

    fn advice(self) -> &'static str {
        match self {
            Policy::UnderscoreBinding => {
                "Either use the variable (removing the underscore) or remove it completely."
            }
            Policy::ForbiddenWord => {
                "Comments narrating edits (FIXED, CHANGED, UPDATED and friends) are not allowed. Remove them."
            }
            Policy::StarsInComment => "The '**' pattern is only allowed in doc comments.",
            Policy::UppercaseComment => "STRONGLY CONSIDER deleting the comment completely.",
            Policy::AllowDeadCode => "Either use the code or remove it completely.",
        }
    }
}

// Collects matching lines of a single file, filtering false positives per policy.
struct PolicyCollector {
    policy: Policy,
    violations: Vec<String>,
    file_path: PathBuf,
}

impl PolicyCollector {
    fn new(policy: Policy, file_path: &Path) -> Self {
        Self {
            policy,
            violations: Vec::new(),
            file_path: file_path.to_path_buf(),
        }
    }

    fn check_and_get_error_message(&self) -> Option<String> {
        if self.violations.is_empty() {
            return None;
        }

        let file_name = self.file_path.to_str().unwrap_or("?");
        let mut error_msg = format!(
            "\n❌ ERROR: Found {} {} in {}:\n",
            self.violations.len(),
            self.policy.headline(),
            file_name
        );
        for violation in &self.violations {
            error_msg.push_str(&format!("   {violation}\n"));
        }
        error_msg.push_str(&format!("\n⚠️ {}\n", self.policy.advice()));
        Some(error_msg)
    }

    fn keeps(&self, line_text: &str) -> bool {
        match self.policy {
            Policy::UnderscoreBinding => {
                let is_pure_comment = line_text.trim_start().starts_with("//");
                let in_string = line_text
                    .split('"')
                    .enumerate()
                    .any(|(i, part)| i % 2 == 1 && part.contains('_'));
                !is_pure_comment && !in_string
            }
            Policy::StarsInComment => !is_doc_comment(line_text),
            Policy::UppercaseComment => comment_text(line_text).is_some_and(|text| {
                let alpha: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
                !alpha.is_empty() && alpha.iter().all(|c| c.is_uppercase())
            }),
            Policy::ForbiddenWord | Policy::AllowDeadCode => true,
        }
    }
}

impl Sink for PolicyCollector {
    type Error = std::io::Error;

    fn matched(&mut self, _: &Searcher, mat: &SinkMatch) -> Result<bool, Self::Error> {
        let line_number = mat.line_number().unwrap_or(0);
        let line_text = std::str::from_utf8(mat.bytes()).unwrap_or("").trim_end();
        if self.keeps(line_text) {
            self.violations.push(format!("{line_number}:{line_text}"));
        }
        Ok(true)
    }
}

fn is_doc_comment(line: &str) -> bool {
    line.trim_start().starts_with("///")
}

// Extracts the text of a line comment or a single-line block comment.
fn comment_text(line_text: &str) -> Option<&str> {
    let trimmed = line_text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("///") {
        return Some(rest.trim());
    }
    if let Some(rest) = trimmed.strip_prefix("//") {
        return Some(rest.trim());
    }
    let idx = line_text.find("/*")?;
    let body = &line_text[idx + 2..];
    Some(match body.find("*/") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    })
}

fn rust_sources() -> Vec<PathBuf> {
    SOURCE_ROOTS
        .iter()
        .flat_map(|root| WalkDir::new(root).into_iter().filter_map(|e| e.ok()))
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "rs"))
        .map(|e| e.into_path())
        .collect()
}

fn scan(policy: Policy, pattern: &str, paths: &[PathBuf]) -> Result<(), Box<dyn Error>> {
    let matcher = RegexMatcher::new_line_matcher(pattern)?;
    let mut searcher = Searcher::new();
    for path in paths {
        let mut collector = PolicyCollector::new(policy, path);
        searcher.search_path(&matcher, path, &mut collector)?;
        if let Some(error_message) = collector.check_and_get_error_message() {
            return Err(error_message.into());
        }
    }
    Ok(())
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    for root in SOURCE_ROOTS {
        println!("cargo:rerun-if-changed={root}");
    }

    let sources = rust_sources();
    let checks = [
        (Policy::UnderscoreBinding, r"\b(_[a-zA-Z0-9_]+)\b"),
        (
            Policy::ForbiddenWord,
            r"(//|/\*).*(?:FIXED|CORRECTED|FIX|FIXES|NEW|CHANGED|CHANGES|CHANGE|MODIFIED|MODIFIES|MODIFY|UPDATED|UPDATES|UPDATE)",
        ),
        (Policy::StarsInComment, r"(//|/\*).*\*\*"),
        (Policy::UppercaseComment, r"(//|/\*).*"),
        (Policy::AllowDeadCode, r"#\s*\[\s*allow\s*\(\s*dead_code\s*\)\s*\]"),
    ];

    for (policy, pattern) in checks {
        if let Err(e) = scan(policy, pattern, &sources) {
            eprintln!("{e}");
            std::process::exit(1);
        }
    }
}
