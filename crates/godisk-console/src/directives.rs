use std::collections::BTreeMap;
use std::sync::OnceLock;

use godisk_api::{ReportKind, ReportRequest};
use regex::Regex;

fn rep_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^rep\b").expect("valid regex"))
}

fn journaling_line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)^journaling\b").expect("valid regex"))
}

fn flag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r#"(?i)-([a-z_]+)\s*=\s*(?:"([^"]*)"|'([^']*)'|(\S+))"#).expect("valid regex")
    })
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Report requests found in a script, at most one per kind.
pub struct DetectedDirectives {
    requests: BTreeMap<ReportKind, ReportRequest>,
}

impl DetectedDirectives {
    pub fn get(&self, kind: ReportKind) -> Option<&ReportRequest> {
        self.requests.get(&kind)
    }

    pub fn contains(&self, kind: ReportKind) -> bool {
        self.requests.contains_key(&kind)
    }

    pub fn kinds(&self) -> Vec<ReportKind> {
        self.requests.keys().copied().collect()
    }

    /// Requests in report-kind order.
    pub fn requests(&self) -> impl Iterator<Item = &ReportRequest> {
        self.requests.values()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Lower-cased flag name to its first value; quoted and bare values accepted.
fn parse_flags(line: &str) -> BTreeMap<String, String> {
    let mut flags = BTreeMap::new();
    for captures in flag_pattern().captures_iter(line) {
        let Some(key) = captures.get(1) else {
            continue;
        };
        let value = captures
            .get(2)
            .or_else(|| captures.get(3))
            .or_else(|| captures.get(4))
            .map(|value| value.as_str().trim().to_string())
            .unwrap_or_default();
        flags
            .entry(key.as_str().to_ascii_lowercase())
            .or_insert(value);
    }
    flags
}

fn leading_run(value: &str, accept: impl Fn(char) -> bool) -> Option<String> {
    let run = value
        .chars()
        .take_while(|candidate| accept(*candidate))
        .collect::<String>();
    if run.is_empty() {
        None
    } else {
        Some(run)
    }
}

fn flag_id(flags: &BTreeMap<String, String>) -> Option<String> {
    leading_run(flags.get("id")?, |candidate| candidate.is_ascii_alphanumeric())
}

fn non_empty_flag(flags: &BTreeMap<String, String>, key: &str) -> Option<String> {
    flags
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

// `\` runs become `/` and repeated `/` collapse; relative paths stay relative.
fn clean_file_path(raw: &str) -> String {
    let mut cleaned = String::with_capacity(raw.len());
    for candidate in raw.chars() {
        let candidate = if candidate == '\\' { '/' } else { candidate };
        if candidate == '/' && cleaned.ends_with('/') {
            continue;
        }
        cleaned.push(candidate);
    }
    cleaned
}

fn parse_rep_line(line: &str) -> Option<ReportRequest> {
    let flags = parse_flags(line);
    let kind = ReportKind::from_name(flags.get("name")?)?;
    let id = flag_id(&flags)?;
    let mut request = ReportRequest::new(kind, id);
    match kind {
        ReportKind::Inode => {
            if let Some(ruta) = flags
                .get("ruta")
                .and_then(|ruta| leading_run(ruta, |c| c.is_ascii_digit() || c == '/'))
            {
                request = request.with_ruta(ruta);
            }
        }
        ReportKind::Listing => {
            if let Some(ruta) = non_empty_flag(&flags, "ruta") {
                request = request.with_ruta(ruta);
            }
        }
        ReportKind::File => {
            let ruta = non_empty_flag(&flags, "ruta")
                .or_else(|| non_empty_flag(&flags, "path_file"))
                .or_else(|| non_empty_flag(&flags, "path_file_ls"))?;
            request = request.with_ruta(clean_file_path(&ruta));
        }
        ReportKind::Inodes => {
            if let Some(max) = flags
                .get("max")
                .and_then(|max| max.parse::<u32>().ok())
                .filter(|max| *max > 0)
            {
                request = request.with_max(max);
            }
        }
        _ => {}
    }
    Some(request)
}

fn parse_journaling_line(line: &str) -> ReportRequest {
    let flags = parse_flags(line);
    ReportRequest::new(ReportKind::Journaling, flag_id(&flags).unwrap_or_default())
}

/// Extracts report requests from `script` without executing it.
///
/// Only trimmed lines starting with `rep` qualify (plus the bare `journaling`
/// command). Unknown kinds and lines without a usable id are skipped, and the
/// first qualifying line per kind wins.
pub fn detect_directives(script: &str) -> DetectedDirectives {
    let mut detected = DetectedDirectives::default();
    for line in script.lines().map(str::trim).filter(|line| !line.is_empty()) {
        let request = if rep_line_pattern().is_match(line) {
            parse_rep_line(line)
        } else if journaling_line_pattern().is_match(line) {
            Some(parse_journaling_line(line))
        } else {
            None
        };
        if let Some(request) = request {
            detected.requests.entry(request.kind).or_insert(request);
        }
    }
    detected
}
