use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use bbcode::Recovery;
use serde::Deserialize;

use crate::config::Config;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExpectedRecovery {
    /// Substring that must appear in the recovery message.
    pub contains: String,

    /// If set, the recovery's span must start on this 1-based source line.
    #[serde(default)]
    pub line: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TestConfig {
    /// Human-readable test description.
    #[serde(default)]
    pub description: Option<String>,

    /// Tag configuration, same schema as `bbcode.toml`. Defaults apply when absent.
    #[serde(default)]
    pub config: Option<Config>,

    /// Expected HTML rendering (trimmed comparison).
    #[serde(default)]
    pub expect_html: Option<String>,

    /// Expected preview rendering (trimmed comparison).
    #[serde(default)]
    pub expect_preview: Option<String>,

    /// Expected text content (trimmed comparison).
    #[serde(default)]
    pub expect_text: Option<String>,

    /// Expected minimal BBCode of the parsed tree (trimmed comparison).
    #[serde(default)]
    pub expect_bbcode: Option<String>,

    /// Expected recoveries. If present (even empty), count and content are checked.
    #[serde(default)]
    pub expect_recoveries: Option<Vec<ExpectedRecovery>>,
}

/// Split a `.test.bb` file into its TOML front matter and BBCode source.
fn parse_test_file(content: &str) -> Result<(TestConfig, &str), String> {
    let content = content.trim_start_matches('\u{feff}');

    let after_open = content
        .strip_prefix("---")
        .ok_or("missing opening --- front matter delimiter")?;
    let after_open = after_open
        .strip_prefix('\n')
        .or_else(|| after_open.strip_prefix("\r\n"))
        .unwrap_or(after_open);

    let close_pos = after_open
        .find("\n---")
        .ok_or("missing closing --- front matter delimiter")?;

    let toml_str = after_open[..close_pos].trim_end_matches('\r');
    let rest = &after_open[close_pos + "\n---".len()..];
    let source = rest
        .strip_prefix("\r\n")
        .or_else(|| rest.strip_prefix('\n'))
        .unwrap_or(rest);

    let config: TestConfig =
        toml::from_str(toml_str).map_err(|e| format!("TOML parse error: {}", e))?;

    Ok((config, source))
}

pub enum TestOutcome {
    Pass,
    Fail(String),
}

pub struct TestResult {
    pub path: PathBuf,
    pub description: Option<String>,
    pub outcome: TestOutcome,
}

impl TestResult {
    fn label(&self) -> &str {
        self.description.as_deref().unwrap_or_else(|| {
            self.path
                .file_name()
                .and_then(|s| s.to_str())
                .and_then(|s| s.strip_suffix(".test.bb"))
                .unwrap_or("?")
        })
    }
}

fn run_single_test(path: &Path) -> TestResult {
    let fail = |description: Option<String>, reason: String| TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Fail(reason),
    };

    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) => return fail(None, format!("cannot read file: {}", e)),
    };

    let (test, source) = match parse_test_file(&content) {
        Ok(pair) => pair,
        Err(e) => return fail(None, format!("front matter error: {}", e)),
    };
    let description = test.description.clone();

    let config = test.config.as_ref().cloned().unwrap_or_default();
    let definitions = match config
        .validators()
        .and_then(|validators| config.definitions(&validators))
    {
        Ok(definitions) => definitions,
        Err(e) => return fail(description, format!("config error: {}", e)),
    };

    let (document, recoveries) =
        match bbcode::Parser::new(&definitions).parse_with_recoveries(source) {
            Ok(parsed) => parsed,
            Err(e) => return fail(description, format!("parse error: {}", e)),
        };

    let checks: [(&str, &Option<String>, fn(&bbcode::Document) -> String); 4] = [
        ("html", &test.expect_html, renderer::render_html),
        ("preview", &test.expect_preview, renderer::render_preview),
        ("text", &test.expect_text, renderer::render_text),
        ("bbcode", &test.expect_bbcode, |document| document.to_string()),
    ];
    for (what, expected, render) in checks {
        let Some(expected) = expected else {
            continue;
        };
        let actual = render(&document);
        let (actual, expected) = (actual.trim(), expected.trim());
        if actual != expected {
            return fail(
                description,
                format!(
                    "{} mismatch\n  expected: {}\n  actual:   {}",
                    what, expected, actual
                ),
            );
        }
    }

    if let Some(expected) = &test.expect_recoveries {
        if let Some(reason) = check_recoveries(source, &recoveries, expected) {
            return fail(description, reason);
        }
    }

    TestResult {
        path: path.to_path_buf(),
        description,
        outcome: TestOutcome::Pass,
    }
}

/// Convert a byte offset in `source` to a 1-based line number.
fn byte_offset_to_line(source: &str, offset: usize) -> usize {
    source[..offset.min(source.len())]
        .bytes()
        .filter(|&b| b == b'\n')
        .count()
        + 1
}

/// Check that actual recoveries match expectations. Returns `Some(reason)` on mismatch.
fn check_recoveries(
    source: &str,
    recoveries: &[Recovery],
    expected: &[ExpectedRecovery],
) -> Option<String> {
    if recoveries.len() != expected.len() {
        let actual: Vec<String> = recoveries.iter().map(|r| format!("  - {}", r)).collect();
        return Some(format!(
            "expected {} recovery(ies), got {}\n  actual recoveries:\n{}",
            expected.len(),
            recoveries.len(),
            if actual.is_empty() {
                "    (none)".to_string()
            } else {
                actual.join("\n")
            }
        ));
    }

    for (i, (actual, expected)) in recoveries.iter().zip(expected).enumerate() {
        let msg = actual.kind.to_string();
        if !msg.contains(&expected.contains) {
            return Some(format!(
                "recovery[{}]: expected message containing \"{}\", got: {}",
                i, expected.contains, msg
            ));
        }

        if let Some(expected_line) = expected.line {
            let actual_line = byte_offset_to_line(source, actual.span.start);
            if actual_line != expected_line {
                return Some(format!(
                    "recovery[{}]: expected on line {}, but span is on line {}",
                    i, expected_line, actual_line
                ));
            }
        }
    }

    None
}

/// Discover `.test.bb` files grouped by category (subfolder relative to root).
/// Files directly in `root` get category "" (uncategorized).
fn discover_categorized(root: &Path) -> BTreeMap<String, Vec<PathBuf>> {
    let mut categories: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    collect_tests(root, root, &mut categories);
    for files in categories.values_mut() {
        files.sort();
    }
    categories
}

fn collect_tests(dir: &Path, root: &Path, out: &mut BTreeMap<String, Vec<PathBuf>>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_tests(&path, root, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.ends_with(".test.bb"))
        {
            let category = path
                .parent()
                .and_then(|p| p.strip_prefix(root).ok())
                .map(|p| p.to_string_lossy().replace('\\', "/"))
                .unwrap_or_default();
            out.entry(category).or_default().push(path);
        }
    }
}

/// List available categories for the given test path.
pub fn list_categories(path: &Path) {
    if path.is_file() {
        eprintln!("(single file, no categories)");
        return;
    }

    let categories = discover_categorized(path);
    if categories.is_empty() {
        eprintln!("no .test.bb files found in {}", path.display());
        return;
    }

    eprintln!("available categories:");
    for (cat, files) in &categories {
        let label = if cat.is_empty() { "(root)" } else { cat.as_str() };
        eprintln!("  {} ({} tests)", label, files.len());
    }
}

fn paint(s: &str, code: &str, no_color: bool) -> String {
    if no_color {
        s.to_string()
    } else {
        format!("\x1b[{}m{}\x1b[0m", code, s)
    }
}

/// Run all `.test.bb` files under `path` (or a single file).
/// If `categories` is non-empty, only run tests in those categories.
/// Returns exit code: 0 = all pass, 1 = any failure.
pub fn run_tests(path: &Path, no_color: bool, categories: &[String]) -> i32 {
    let selected: BTreeMap<String, Vec<PathBuf>> = if path.is_file() {
        BTreeMap::from([(String::new(), vec![path.to_path_buf()])])
    } else {
        let all_categories = discover_categorized(path);
        if all_categories.is_empty() {
            eprintln!("no .test.bb files found in {}", path.display());
            return 1;
        }
        if categories.is_empty() {
            all_categories
        } else {
            filter_categories(all_categories, categories)
        }
    };

    if selected.is_empty() {
        eprintln!("no matching categories found");
        return 1;
    }

    let mut passed = 0usize;
    let mut failures: Vec<TestResult> = Vec::new();

    for (cat, files) in &selected {
        if !path.is_file() {
            let header = if cat.is_empty() { "(root)" } else { cat.as_str() };
            eprintln!();
            eprintln!("{}", paint(header, "1", no_color));
        }

        for file in files {
            let result = run_single_test(file);
            match &result.outcome {
                TestOutcome::Pass => {
                    passed += 1;
                    eprintln!("  {}  {}", paint("PASS", "32", no_color), result.label());
                }
                TestOutcome::Fail(_) => {
                    eprintln!("  {}  {}", paint("FAIL", "31", no_color), result.label());
                    failures.push(result);
                }
            }
        }
    }

    if !failures.is_empty() {
        eprintln!();
        eprintln!("failures:");
        for f in &failures {
            eprintln!();
            eprintln!("  --- {} ---", f.path.display());
            if let TestOutcome::Fail(reason) = &f.outcome {
                for line in reason.lines() {
                    eprintln!("  {}", line);
                }
            }
        }
    }

    eprintln!();
    let failed = failures.len();
    if failed == 0 {
        eprintln!("test result: {}. {} passed, 0 failed", paint("ok", "32", no_color), passed);
        0
    } else {
        eprintln!(
            "test result: {}. {} passed, {} failed (of {})",
            paint("FAILED", "31", no_color),
            passed,
            failed,
            passed + failed
        );
        1
    }
}

fn filter_categories(
    all_categories: BTreeMap<String, Vec<PathBuf>>,
    requested: &[String],
) -> BTreeMap<String, Vec<PathBuf>> {
    let available: Vec<String> = all_categories
        .keys()
        .map(|k| if k.is_empty() { "(root)".to_string() } else { k.clone() })
        .collect();

    let requested: Vec<&str> = requested.iter().map(|r| r.trim_matches('/')).collect();
    for req in &requested {
        let found = all_categories
            .keys()
            .any(|cat| cat == req || cat.starts_with(&format!("{}/", req)));
        if !found {
            eprintln!(
                "warning: category '{}' not found (available: {})",
                req,
                available.join(", ")
            );
        }
    }

    all_categories
        .into_iter()
        .filter(|(cat, _)| {
            requested
                .iter()
                .any(|req| cat == req || cat.starts_with(&format!("{}/", req)))
        })
        .collect()
}
