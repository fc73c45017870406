//! Rule-based quality scanner.
//!
//! Every non-baseline entry that exists (empty or not) is compared with its
//! baseline value. Checks are mechanical: placeholders, ICU structure, markup,
//! copy-paste, length and whitespace. Absent keys are a coverage concern and
//! are not reported here.

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::workspace::Workspace;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::debug;

static HTML_TAG_REGEX: OnceLock<Regex> = OnceLock::new();
static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityCheck {
    Empty,
    MissingVariables,
    IcuSyntax,
    HtmlMismatch,
    Untranslated,
    LengthAnomaly,
    Whitespace,
}

impl QualityCheck {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityCheck::Empty => "empty",
            QualityCheck::MissingVariables => "missing_variables",
            QualityCheck::IcuSyntax => "icu_syntax",
            QualityCheck::HtmlMismatch => "html_mismatch",
            QualityCheck::Untranslated => "untranslated",
            QualityCheck::LengthAnomaly => "length_anomaly",
            QualityCheck::Whitespace => "whitespace",
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            QualityCheck::MissingVariables | QualityCheck::IcuSyntax => Severity::Error,
            QualityCheck::Empty | QualityCheck::HtmlMismatch | QualityCheck::Untranslated => {
                Severity::Warning
            }
            QualityCheck::LengthAnomaly | QualityCheck::Whitespace => Severity::Info,
        }
    }
}

/// A problem found in one check of one pair of values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    pub check: QualityCheck,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityIssue {
    pub severity: Severity,
    pub check: QualityCheck,
    pub locale: String,
    pub namespace: String,
    pub key: String,
    pub baseline_value: String,
    pub locale_value: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct QualityFilter {
    pub locale: Option<String>,
    pub severity: Option<Severity>,
    pub check: Option<QualityCheck>,
}

impl QualityFilter {
    fn matches(&self, issue: &QualityIssue) -> bool {
        self.locale.as_ref().map_or(true, |l| l == &issue.locale)
            && self.severity.map_or(true, |s| s == issue.severity)
            && self.check.map_or(true, |c| c == issue.check)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QualitySummary {
    pub total: usize,
    pub by_severity: BTreeMap<String, usize>,
    pub by_locale: BTreeMap<String, usize>,
    pub by_check: BTreeMap<String, usize>,
}

impl QualitySummary {
    fn from_issues(issues: &[QualityIssue]) -> Self {
        let mut summary = Self {
            total: issues.len(),
            ..Default::default()
        };
        for issue in issues {
            *summary
                .by_severity
                .entry(issue.severity.as_str().to_string())
                .or_default() += 1;
            *summary.by_locale.entry(issue.locale.clone()).or_default() += 1;
            *summary
                .by_check
                .entry(issue.check.as_str().to_string())
                .or_default() += 1;
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub baseline: String,
    /// Entries compared (before filtering)
    pub scanned: usize,
    pub issues: Vec<QualityIssue>,
    pub summary: QualitySummary,
}

/// Run every check on one (baseline, translation) pair.
///
/// An empty translation yields only the `empty` finding.
pub fn check_pair(baseline: &str, translation: &str) -> Vec<Finding> {
    let mut findings = Vec::new();

    if translation.is_empty() {
        findings.push(Finding {
            check: QualityCheck::Empty,
            message: "value is empty".to_string(),
        });
        return findings;
    }

    let source = scan_message(baseline);
    let target = scan_message(translation);

    let missing = missing_arguments(&source.arguments, &target.arguments);
    if !missing.is_empty() {
        findings.push(Finding {
            check: QualityCheck::MissingVariables,
            message: format!(
                "missing placeholders: {}",
                missing
                    .iter()
                    .map(|m| format!("{{{}}}", m))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        });
    }

    if source.uses_plural_or_select {
        let problem = match &target.syntax_error {
            Some(error) => Some(error.clone()),
            None if !target.uses_plural_or_select => {
                Some("plural/select construct from the baseline is missing".to_string())
            }
            None if target.missing_other => Some("plural/select has no 'other' case".to_string()),
            None => None,
        };
        if let Some(problem) = problem {
            findings.push(Finding {
                check: QualityCheck::IcuSyntax,
                message: problem,
            });
        }
    }

    let source_tags = html_tags(baseline);
    let target_tags = html_tags(translation);
    if source_tags != target_tags {
        findings.push(Finding {
            check: QualityCheck::HtmlMismatch,
            message: format!(
                "tags differ: baseline has {:?}, translation has {:?}",
                source_tags, target_tags
            ),
        });
    }

    let baseline_len = baseline.chars().count();
    if translation == baseline && baseline.trim().contains(char::is_whitespace) && baseline_len > 5 {
        findings.push(Finding {
            check: QualityCheck::Untranslated,
            message: "value is identical to the baseline".to_string(),
        });
    }

    let translation_len = translation.chars().count();
    if baseline_len > 10 && translation_len > baseline_len * 2 {
        findings.push(Finding {
            check: QualityCheck::LengthAnomaly,
            message: format!(
                "translation is {} chars, baseline is {}",
                translation_len, baseline_len
            ),
        });
    }

    if translation.trim() != translation {
        findings.push(Finding {
            check: QualityCheck::Whitespace,
            message: "leading or trailing whitespace".to_string(),
        });
    }

    findings
}

/// Scan every non-baseline locale against the baseline.
pub fn scan_catalogs(baseline_code: &str, catalogs: &BTreeMap<String, Catalog>) -> CatalogResult<(usize, Vec<QualityIssue>)> {
    let baseline = catalogs.get(baseline_code).ok_or_else(|| {
        CatalogError::NotFound(format!("baseline locale '{}'", baseline_code))
    })?;
    let entries = baseline.entries();

    let mut scanned = 0;
    let mut issues = Vec::new();
    for (locale, catalog) in catalogs {
        if locale == baseline_code {
            continue;
        }
        for entry in &entries {
            let Some(value) = catalog.get(&entry.namespace, &entry.key) else {
                continue;
            };
            scanned += 1;
            for finding in check_pair(&entry.value, value) {
                issues.push(QualityIssue {
                    severity: finding.check.severity(),
                    check: finding.check,
                    locale: locale.clone(),
                    namespace: entry.namespace.clone(),
                    key: entry.key.clone(),
                    baseline_value: entry.value.clone(),
                    locale_value: value.to_string(),
                    message: finding.message,
                });
            }
        }
    }
    Ok((scanned, issues))
}

impl Workspace {
    pub fn quality_scan(&self, filter: &QualityFilter) -> CatalogResult<QualityReport> {
        let baseline = self.baseline()?;
        let catalogs = self.store.load_all()?;
        let (scanned, issues) = scan_catalogs(&baseline, &catalogs)?;

        let issues: Vec<QualityIssue> = issues.into_iter().filter(|i| filter.matches(i)).collect();
        debug!("Quality scan: {} entries, {} issues", scanned, issues.len());
        Ok(QualityReport {
            baseline,
            scanned,
            summary: QualitySummary::from_issues(&issues),
            issues,
        })
    }
}

/// Sorted, attribute-free list of opening and closing tags.
fn html_tags(text: &str) -> Vec<String> {
    let regex = HTML_TAG_REGEX.get_or_init(|| {
        Regex::new(r"<(/?)([A-Za-z][A-Za-z0-9-]*)\b[^<>]*?(/?)>").expect("static tag pattern")
    });
    let mut tags: Vec<String> = regex
        .captures_iter(text)
        .map(|caps| {
            let closing = caps.get(1).map_or("", |m| m.as_str());
            let name = caps.get(2).map_or("", |m| m.as_str()).to_ascii_lowercase();
            let self_closing = caps.get(3).map_or("", |m| m.as_str());
            format!("<{}{}{}>", closing, name, self_closing)
        })
        .collect();
    tags.sort();
    tags
}

/// Baseline arguments (as a multiset) that the translation lacks.
fn missing_arguments(source: &[String], target: &[String]) -> Vec<String> {
    let mut available: BTreeMap<&str, usize> = BTreeMap::new();
    for name in target {
        *available.entry(name.as_str()).or_default() += 1;
    }
    let mut missing = Vec::new();
    for name in source {
        match available.get_mut(name.as_str()) {
            Some(count) if *count > 0 => *count -= 1,
            _ => missing.push(name.clone()),
        }
    }
    missing
}

/// What a message's braces contain.
#[derive(Debug, Default, PartialEq, Eq)]
struct MessageScan {
    /// Argument names in order of appearance, nested cases included
    arguments: Vec<String>,
    uses_plural_or_select: bool,
    missing_other: bool,
    syntax_error: Option<String>,
}

/// Walk an ICU message. Case bodies of plural/select arguments are walked
/// recursively; text inside them is never mistaken for an argument.
fn scan_message(text: &str) -> MessageScan {
    let chars: Vec<char> = text.chars().collect();
    let mut scan = MessageScan::default();
    let mut pos = 0;
    if let Err(error) = walk_text(&chars, &mut pos, 0, &mut scan) {
        scan.syntax_error = Some(error);
        // Fall back to plain `{name}` tokens so variables are still compared.
        scan.arguments = placeholder_tokens(text);
    }
    scan
}

fn placeholder_tokens(text: &str) -> Vec<String> {
    let regex = PLACEHOLDER_REGEX.get_or_init(|| {
        Regex::new(r"\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*[,}]").expect("static placeholder pattern")
    });
    regex
        .captures_iter(text)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

fn walk_text(chars: &[char], pos: &mut usize, depth: usize, scan: &mut MessageScan) -> Result<(), String> {
    while *pos < chars.len() {
        match chars[*pos] {
            '{' => {
                *pos += 1;
                walk_argument(chars, pos, depth, scan)?;
            }
            '}' => {
                if depth == 0 {
                    return Err(format!("unexpected '}}' at position {}", *pos));
                }
                return Ok(());
            }
            '\'' => skip_quoted(chars, pos),
            _ => *pos += 1,
        }
    }
    if depth > 0 {
        return Err("unclosed '{'".to_string());
    }
    Ok(())
}

/// ICU apostrophe quoting: `''` is a literal quote, `'{...}'` is literal text.
fn skip_quoted(chars: &[char], pos: &mut usize) {
    match chars.get(*pos + 1) {
        Some('\'') => *pos += 2,
        Some('{') | Some('}') | Some('#') => {
            *pos += 2;
            while *pos < chars.len() && chars[*pos] != '\'' {
                *pos += 1;
            }
            *pos += 1;
        }
        _ => *pos += 1,
    }
}

fn read_until(chars: &[char], pos: &mut usize, stops: &[char]) -> String {
    let start = *pos;
    while *pos < chars.len() && !stops.contains(&chars[*pos]) {
        *pos += 1;
    }
    chars[start..*pos].iter().collect::<String>().trim().to_string()
}

fn expect_close(chars: &[char], pos: &mut usize) -> Result<(), String> {
    match chars.get(*pos) {
        Some('}') => {
            *pos += 1;
            Ok(())
        }
        _ => Err("unclosed '{'".to_string()),
    }
}

/// Called just after an opening brace.
fn walk_argument(chars: &[char], pos: &mut usize, depth: usize, scan: &mut MessageScan) -> Result<(), String> {
    let name = read_until(chars, pos, &[',', '}', '{']);
    match chars.get(*pos) {
        Some('}') => {
            *pos += 1;
            if !name.is_empty() {
                scan.arguments.push(name);
            }
            Ok(())
        }
        Some(',') => {
            *pos += 1;
            if name.is_empty() {
                return Err("argument without a name".to_string());
            }
            scan.arguments.push(name);
            let kind = read_until(chars, pos, &[',', '}', '{']);
            match chars.get(*pos) {
                Some('}') => {
                    *pos += 1;
                    Ok(())
                }
                Some(',') if matches!(kind.as_str(), "plural" | "select" | "selectordinal") => {
                    *pos += 1;
                    scan.uses_plural_or_select = true;
                    walk_cases(chars, pos, depth, scan)
                }
                Some(',') => {
                    // Style argument of number/date/time: skip to the closing brace.
                    *pos += 1;
                    read_until(chars, pos, &['}', '{']);
                    expect_close(chars, pos)
                }
                _ => Err(format!("malformed '{}' argument", kind)),
            }
        }
        Some('{') => Err("'{' inside an argument name".to_string()),
        _ => Err("unclosed '{'".to_string()),
    }
}

/// `selector {text} selector {text} ... }`
fn walk_cases(chars: &[char], pos: &mut usize, depth: usize, scan: &mut MessageScan) -> Result<(), String> {
    let mut has_other = false;
    let mut cases = 0;
    loop {
        while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
            *pos += 1;
        }
        match chars.get(*pos) {
            None => return Err("unclosed plural/select".to_string()),
            Some('}') => {
                *pos += 1;
                break;
            }
            _ => {}
        }

        let selector = read_until(chars, pos, &['{', '}', ' ', '\t', '\n']);
        while chars.get(*pos).is_some_and(|c| c.is_whitespace()) {
            *pos += 1;
        }
        if selector.starts_with("offset:") {
            continue;
        }
        if chars.get(*pos) != Some(&'{') {
            return Err(format!("case '{}' has no message", selector));
        }
        *pos += 1;
        walk_text(chars, pos, depth + 1, scan)?;
        expect_close(chars, pos)?;

        has_other |= selector == "other";
        cases += 1;
    }
    if cases == 0 {
        return Err("plural/select without cases".to_string());
    }
    if !has_other {
        scan.missing_other = true;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checks(baseline: &str, translation: &str) -> Vec<QualityCheck> {
        check_pair(baseline, translation)
            .into_iter()
            .map(|f| f.check)
            .collect()
    }

    // ==================== Message Scanning ====================

    #[test]
    fn test_scan_simple_placeholders() {
        let scan = scan_message("Hello {name}, you have {count} new {count}");
        assert_eq!(scan.arguments, vec!["name", "count", "count"]);
        assert!(!scan.uses_plural_or_select);
        assert!(scan.syntax_error.is_none());
    }

    #[test]
    fn test_scan_plural_does_not_treat_case_text_as_arguments() {
        let scan = scan_message("{count, plural, =0 {no items} one {item} other {# items for {name}}}");
        assert_eq!(scan.arguments, vec!["count", "name"]);
        assert!(scan.uses_plural_or_select);
        assert!(!scan.missing_other);
    }

    #[test]
    fn test_scan_select_without_other() {
        let scan = scan_message("{gender, select, male {He} female {She}}");
        assert!(scan.uses_plural_or_select);
        assert!(scan.missing_other);
    }

    #[test]
    fn test_scan_number_style_argument() {
        let scan = scan_message("Total: {amount, number, ::currency/EUR}");
        assert_eq!(scan.arguments, vec!["amount"]);
        assert!(scan.syntax_error.is_none());
    }

    #[test]
    fn test_scan_unbalanced_braces() {
        assert!(scan_message("{count, plural, other {# items}").syntax_error.is_some());
        assert!(scan_message("Hello }").syntax_error.is_some());
        let scan = scan_message("Hello {name");
        assert!(scan.syntax_error.is_some());
    }

    #[test]
    fn test_scan_quoted_braces_are_literal() {
        let scan = scan_message("Use '{braces}' and it''s {name}");
        assert_eq!(scan.arguments, vec!["name"]);
        assert!(scan.syntax_error.is_none());
    }

    #[test]
    fn test_plural_offset() {
        let scan = scan_message("{n, plural, offset:1 =0 {none} other {# more}}");
        assert!(scan.syntax_error.is_none());
        assert!(!scan.missing_other);
    }

    // ==================== Checks ====================

    #[test]
    fn test_missing_variable_is_error() {
        let findings = check_pair("Hello, {name}!", "Hola!");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].check, QualityCheck::MissingVariables);
        assert_eq!(findings[0].check.severity(), Severity::Error);
        assert!(findings[0].message.contains("{name}"));
    }

    #[test]
    fn test_duplicate_placeholders_are_counted() {
        assert_eq!(
            checks("{a} and {a}", "{a} y"),
            vec![QualityCheck::MissingVariables]
        );
        assert!(checks("{a} and {b}", "{b} y {a}").is_empty());
    }

    #[test]
    fn test_empty_value_short_circuits() {
        assert_eq!(checks("Hello, {name}!", ""), vec![QualityCheck::Empty]);
    }

    #[test]
    fn test_icu_translation_missing_other() {
        let baseline = "{count, plural, one {# item} other {# items}}";
        assert!(checks(baseline, "{count, plural, one {# artículo} other {# artículos}}").is_empty());
        assert_eq!(
            checks(baseline, "{count, plural, one {# artículo}}"),
            vec![QualityCheck::IcuSyntax]
        );
        assert_eq!(
            checks(baseline, "{count, plural, one {# artículo} other {# artículos}"),
            vec![QualityCheck::IcuSyntax]
        );
    }

    #[test]
    fn test_icu_dropped_entirely() {
        let found = checks("{count, plural, one {# item} other {# items}}", "Artículos: {count}");
        assert_eq!(found, vec![QualityCheck::IcuSyntax]);
    }

    #[test]
    fn test_html_mismatch() {
        assert_eq!(
            checks("Read the <b>terms</b>", "Lee los términos"),
            vec![QualityCheck::HtmlMismatch]
        );
        assert!(checks(
            "<link>Click</link> or <b>tap</b>",
            "<b>Toca</b> o <link>haz clic</link>"
        )
        .is_empty());
        assert!(checks("<a href=\"/x\">Go</a>", "<A class=\"y\">Ir</A>").is_empty());
    }

    #[test]
    fn test_untranslated_multi_word_only() {
        assert_eq!(
            checks("Sign in to continue", "Sign in to continue"),
            vec![QualityCheck::Untranslated]
        );
        assert!(checks("Dashboard", "Dashboard").is_empty());
        assert!(checks("OK go", "OK go").is_empty());
    }

    #[test]
    fn test_length_anomaly() {
        assert_eq!(
            checks("Save changes", "Guardar todos los cambios ahora"),
            vec![QualityCheck::LengthAnomaly]
        );
        assert!(checks("Save", "Guardar cambios").is_empty());
    }

    #[test]
    fn test_stray_whitespace() {
        assert_eq!(checks("Save", " Guardar"), vec![QualityCheck::Whitespace]);
    }

    // ==================== Catalog Scan ====================

    fn catalogs() -> BTreeMap<String, Catalog> {
        let mut map = BTreeMap::new();
        map.insert(
            "en".to_string(),
            serde_json::from_str(r#"{"Greeting": {"hello": "Hello, {name}!", "bye": "Goodbye"}}"#).unwrap(),
        );
        map.insert(
            "es".to_string(),
            serde_json::from_str(r#"{"Greeting": {"hello": "Hola!"}}"#).unwrap(),
        );
        map.insert(
            "fr".to_string(),
            serde_json::from_str(r#"{"Greeting": {"hello": "", "bye": "Au revoir "}}"#).unwrap(),
        );
        map
    }

    #[test]
    fn test_scan_only_inspects_present_entries() {
        let (scanned, issues) = scan_catalogs("en", &catalogs()).unwrap();
        assert_eq!(scanned, 3);

        let es: Vec<&QualityIssue> = issues.iter().filter(|i| i.locale == "es").collect();
        assert_eq!(es.len(), 1);
        assert_eq!(es[0].check, QualityCheck::MissingVariables);
        assert_eq!(es[0].severity, Severity::Error);
        assert_eq!(es[0].key, "hello");
        assert_eq!(es[0].baseline_value, "Hello, {name}!");

        let fr: Vec<QualityCheck> = issues
            .iter()
            .filter(|i| i.locale == "fr")
            .map(|i| i.check)
            .collect();
        assert_eq!(fr, vec![QualityCheck::Whitespace, QualityCheck::Empty]);
    }

    #[test]
    fn test_scan_is_deterministic() {
        let first = scan_catalogs("en", &catalogs()).unwrap();
        let second = scan_catalogs("en", &catalogs()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_summary_and_filter() {
        let (_, issues) = scan_catalogs("en", &catalogs()).unwrap();
        let filter = QualityFilter {
            severity: Some(Severity::Info),
            ..Default::default()
        };
        let filtered: Vec<QualityIssue> = issues.into_iter().filter(|i| filter.matches(i)).collect();
        let summary = QualitySummary::from_issues(&filtered);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.by_locale.get("fr"), Some(&1));
        assert_eq!(summary.by_check.get("whitespace"), Some(&1));
    }

    #[test]
    fn test_missing_baseline_is_not_found() {
        assert!(matches!(
            scan_catalogs("de", &catalogs()),
            Err(CatalogError::NotFound(_))
        ));
    }
}
