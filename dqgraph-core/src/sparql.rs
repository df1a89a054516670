// Copyright 2025 DQGraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! SPARQL text normalization.
//!
//! Queries reach the store from two directions: the fixed catalog and
//! free-form model output. Both pass through the same transform chain
//! before execution: fence stripping, smart-quote fixup, then prefix
//! injection. The whole chain is idempotent, so already-clean text is
//! passed through untouched.

use once_cell::sync::Lazy;
use regex::Regex;

/// Primary namespace declaration, injected when `ex:` is used but
/// undeclared.
pub const EX_PREFIX_LINE: &str = "PREFIX ex: <http://example.org/>";

/// XML-schema namespace declaration, injected when `xsd:` is used but
/// undeclared.
pub const XSD_PREFIX_LINE: &str = "PREFIX xsd: <http://www.w3.org/2001/XMLSchema#>";

static FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```(?:sparql)?\s*([\s\S]*?)```").unwrap());
static SPARQL_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)```sparql\s+([\s\S]*?)```").unwrap());
static ANY_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```\s*([\s\S]*?)```").unwrap());
static EX_DECL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^\s*prefix\s+ex\s*:").unwrap());
static XSD_DECL: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?im)^\s*prefix\s+xsd\s*:").unwrap());

/// Strip Markdown code fencing and typographic quote characters.
///
/// Fenced blocks (tagged `sparql` or untagged) are replaced by their
/// inner content; text without fences passes through. Smart quotes and
/// apostrophes become their ASCII equivalents because they break
/// SPARQL string literals.
pub fn normalize_query(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }
    let query = FENCE.replace_all(query, "$1");
    query
        .replace(['\u{201C}', '\u{201D}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'")
        .trim()
        .to_string()
}

/// Prepend missing `PREFIX` declarations for the two namespaces the
/// data model uses. A declaration is added only when the namespace
/// token appears in the text without a line-anchored `PREFIX name:`
/// binding (case-insensitive); an existing declaration is never
/// duplicated. `ex:` is declared before `xsd:`.
pub fn ensure_prefixes(query: &str) -> String {
    let needs_ex = query.contains("ex:") && !EX_DECL.is_match(query);
    let needs_xsd = query.contains("xsd:") && !XSD_DECL.is_match(query);
    if !needs_ex && !needs_xsd {
        return query.to_string();
    }

    let mut header = Vec::new();
    if needs_ex {
        header.push(EX_PREFIX_LINE);
    }
    if needs_xsd {
        header.push(XSD_PREFIX_LINE);
    }
    format!("{}\n{}", header.join("\n"), query)
}

/// Full transform chain applied before execution.
pub fn sanitize_query(query: &str) -> String {
    ensure_prefixes(&normalize_query(query))
}

/// Pull one SPARQL query out of free-form model output.
///
/// Strategies, tried in order: a fenced block explicitly tagged
/// `sparql`, any fenced block, the raw trimmed text. Model output is
/// not guaranteed structured, so the last tier always yields.
pub fn extract_sparql(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }
    if let Some(caps) = SPARQL_FENCE.captures(text) {
        return caps[1].trim().to_string();
    }
    if let Some(caps) = ANY_FENCE.captures(text) {
        return caps[1].trim().to_string();
    }
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_tagged_and_untagged_fences() {
        assert_eq!(
            normalize_query("```sparql\nSELECT * WHERE { ?s ?p ?o }\n```"),
            "SELECT * WHERE { ?s ?p ?o }"
        );
        assert_eq!(normalize_query("```\nSELECT ?s\n```"), "SELECT ?s");
        assert_eq!(normalize_query("SELECT ?s"), "SELECT ?s");
    }

    #[test]
    fn normalizes_smart_quotes() {
        let q = "SELECT ?s WHERE { ?s ex:name \u{201C}caf\u{00E9}\u{201D} }";
        assert_eq!(
            normalize_query(q),
            "SELECT ?s WHERE { ?s ex:name \"caf\u{00E9}\" }"
        );
        assert_eq!(normalize_query("\u{2019}a\u{2018}"), "'a'");
    }

    #[test]
    fn injects_missing_prefixes_in_fixed_order() {
        let q = "SELECT (AVG(xsd:decimal(?s)) AS ?a) WHERE { ?r ex:score ?s }";
        let fixed = ensure_prefixes(q);
        let lines: Vec<&str> = fixed.lines().collect();
        assert_eq!(lines[0], EX_PREFIX_LINE);
        assert_eq!(lines[1], XSD_PREFIX_LINE);
        assert_eq!(lines[2], q);
    }

    #[test]
    fn injects_exactly_one_declaration() {
        let q = "SELECT ?s WHERE { ?r ex:score ?s }";
        let fixed = ensure_prefixes(q);
        assert_eq!(fixed.matches("PREFIX ex:").count(), 1);
        assert!(!fixed.contains("xsd"));
    }

    #[test]
    fn declared_prefixes_are_never_duplicated() {
        let q = format!("{EX_PREFIX_LINE}\nSELECT ?s WHERE {{ ?r ex:score ?s }}");
        assert_eq!(ensure_prefixes(&q), q);

        // Case-insensitive match on the keyword.
        let q = "prefix ex: <http://example.org/>\nSELECT ?s WHERE { ?r ex:score ?s }";
        assert_eq!(ensure_prefixes(q), q);
    }

    #[test]
    fn prefixes_untouched_when_namespace_unused() {
        let q = "SELECT * WHERE { ?s ?p ?o }";
        assert_eq!(ensure_prefixes(q), q);
    }

    #[test]
    fn sanitize_is_idempotent() {
        let inputs = [
            "```sparql\nSELECT ?s WHERE { ?r ex:score ?s }\n```",
            "SELECT (AVG(xsd:decimal(?s)) AS ?a) WHERE { ?r ex:score ?s }",
            "SELECT ?s WHERE { ?s ex:name \u{201C}x\u{201D} }",
            "SELECT * WHERE { ?s ?p ?o }",
            "",
        ];
        for q in inputs {
            let once = sanitize_query(q);
            assert_eq!(sanitize_query(&once), once, "not idempotent for {q:?}");
        }
    }

    #[test]
    fn extract_prefers_sparql_tagged_block() {
        let text = "Here:\n```\nnot it\n```\n```sparql\nSELECT ?s\n```";
        assert_eq!(extract_sparql(text), "SELECT ?s");
    }

    #[test]
    fn extract_falls_back_to_any_fence_then_raw() {
        assert_eq!(extract_sparql("```\nSELECT ?s\n```"), "SELECT ?s");
        assert_eq!(extract_sparql("  SELECT ?s  "), "SELECT ?s");
        assert_eq!(extract_sparql(""), "");
    }
}
