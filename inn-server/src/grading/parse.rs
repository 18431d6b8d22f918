//! Model response parsing
//!
//! The model is asked for a bare JSON object but often wraps it in a
//! markdown fence or surrounds it with prose. Parsing strips fence markers,
//! then tries each balanced `{...}` in order until one is a JSON object with
//! a usable `score`, and reads `analysis`/`feedback` from it.

use serde_json::Value;

/// Message stored when the model output cannot be used
pub const PARSE_FAILURE_MESSAGE: &str = "Automatic evaluation failed; awaiting manual review.";

/// Outcome of parsing one model response
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedEvaluation {
    /// Clamped to `[0, max_points]`, one decimal place
    pub score: f64,
    pub analysis: String,
    /// False when the fallback (score 0) was applied
    pub parsed: bool,
}

impl ParsedEvaluation {
    fn fallback() -> Self {
        Self {
            score: 0.0,
            analysis: PARSE_FAILURE_MESSAGE.to_string(),
            parsed: false,
        }
    }
}

/// Parse model text into a score for a question worth `max_points`
pub fn parse_evaluation(text: &str, max_points: f64) -> ParsedEvaluation {
    let cleaned = strip_code_fences(text);
    let found = json_object_candidates(&cleaned)
        .filter_map(|candidate| serde_json::from_str::<Value>(candidate).ok())
        .find_map(|value| {
            let score = value.get("score").and_then(score_value)?;
            Some((value, score))
        });
    let Some((value, score)) = found else {
        return ParsedEvaluation::fallback();
    };

    let analysis = ["analysis", "feedback", "reasoning"]
        .iter()
        .find_map(|field| value.get(*field).and_then(Value::as_str))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "No analysis provided.".to_string());

    ParsedEvaluation {
        score: clamp_score(score, max_points),
        analysis,
        parsed: true,
    }
}

/// Remove markdown fence markers (```json ... ```), keeping everything else
///
/// Markers are dropped from the start and end of each line, so a one-line
/// reply like ```` ```json {"score": 8} ``` ```` keeps its JSON.
pub fn strip_code_fences(text: &str) -> String {
    text.lines()
        .map(strip_fence_markers)
        .collect::<Vec<_>>()
        .join("\n")
}

fn strip_fence_markers(line: &str) -> &str {
    let mut rest = line;
    if let Some(after) = rest.trim_start().strip_prefix("```") {
        // Language tag, e.g. ```json
        rest = after.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    }
    let rest = rest.trim_end();
    rest.strip_suffix("```").unwrap_or(rest)
}

/// Every balanced `{...}` in `text`, one per opening brace, in order
pub fn json_object_candidates(text: &str) -> impl Iterator<Item = &str> {
    text.char_indices()
        .filter(|(_, ch)| *ch == '{')
        .filter_map(move |(start, _)| balanced_object_at(text, start))
}

/// First balanced `{...}` in `text`
pub fn extract_json_object(text: &str) -> Option<&str> {
    json_object_candidates(text).next()
}

/// The `{...}` opening at byte `start`, ignoring braces inside JSON strings
fn balanced_object_at(text: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in text[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }

    None
}

/// Clamp to `[0, max_points]` and round to one decimal; NaN becomes 0
pub fn clamp_score(score: f64, max_points: f64) -> f64 {
    if !score.is_finite() {
        return if score == f64::INFINITY { max_points } else { 0.0 };
    }
    let clamped = score.clamp(0.0, max_points.max(0.0));
    (clamped * 10.0).round() / 10.0
}

fn score_value(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            // Accept "7", "7.5" and "7/10"
            let head = s.split('/').next().unwrap_or("").trim();
            head.parse::<f64>().ok()
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_json() {
        let parsed = parse_evaluation(r#"{"score": 8, "analysis": "Good."}"#, 10.0);
        assert_eq!(parsed.score, 8.0);
        assert_eq!(parsed.analysis, "Good.");
        assert!(parsed.parsed);
    }

    #[test]
    fn test_fenced_json_with_prose() {
        let text = "Here is my evaluation:\n```json\n{\n  \"score\": 6.25,\n  \"analysis\": \"Partial.\"\n}\n```\nThanks!";
        let parsed = parse_evaluation(text, 10.0);
        assert_eq!(parsed.score, 6.3);
        assert_eq!(parsed.analysis, "Partial.");
    }

    #[test]
    fn test_braces_inside_strings() {
        let text = r#"{"score": 5, "analysis": "Forgot the } in `if (x) { }` and a \"quote\"."} trailing {junk}"#;
        let parsed = parse_evaluation(text, 10.0);
        assert!(parsed.parsed);
        assert_eq!(parsed.score, 5.0);
        assert!(parsed.analysis.contains("`if (x) { }`"));
    }

    #[test]
    fn test_score_clamped_to_range() {
        assert_eq!(parse_evaluation(r#"{"score": 42}"#, 15.0).score, 15.0);
        assert_eq!(parse_evaluation(r#"{"score": -3}"#, 15.0).score, 0.0);
    }

    #[test]
    fn test_string_scores_and_feedback_field() {
        let parsed = parse_evaluation(r#"{"score": "7/10", "feedback": "Ok"}"#, 10.0);
        assert_eq!(parsed.score, 7.0);
        assert_eq!(parsed.analysis, "Ok");
    }

    #[test]
    fn test_missing_analysis_gets_placeholder() {
        let parsed = parse_evaluation(r#"{"score": 3}"#, 10.0);
        assert!(parsed.parsed);
        assert_eq!(parsed.analysis, "No analysis provided.");
    }

    #[test]
    fn test_garbage_falls_back_to_zero() {
        for text in ["I cannot grade this.", "{not json}", r#"{"analysis": "no score"}"#, "{\"score\": 5"] {
            let parsed = parse_evaluation(text, 10.0);
            assert!(!parsed.parsed, "should not parse: {}", text);
            assert_eq!(parsed.score, 0.0);
            assert_eq!(parsed.analysis, PARSE_FAILURE_MESSAGE);
        }
    }

    #[test]
    fn test_extract_nested_object() {
        let text = r#"noise {"a": {"b": 1}, "c": "}"} more"#;
        assert_eq!(extract_json_object(text), Some(r#"{"a": {"b": 1}, "c": "}"}"#));
        assert_eq!(extract_json_object("no braces"), None);
    }

    #[test]
    fn test_single_line_fenced_reply() {
        let text = r#"```json {"score": 8, "analysis": "Solid."} ```"#;
        let parsed = parse_evaluation(text, 10.0);
        assert!(parsed.parsed);
        assert_eq!(parsed.score, 8.0);
        assert_eq!(parsed.analysis, "Solid.");
    }

    #[test]
    fn test_braces_in_prose_before_object() {
        let text = "The loop `for {i}` is off by one.\n{\"score\": 4, \"analysis\": \"Missed the bound.\"}";
        let parsed = parse_evaluation(text, 10.0);
        assert!(parsed.parsed);
        assert_eq!(parsed.score, 4.0);
        assert_eq!(parsed.analysis, "Missed the bound.");
    }

    #[test]
    fn test_skips_objects_without_score() {
        let text = r#"Format: {"analysis": "..."}. Result: {"score": "6", "analysis": "Fine"}"#;
        let parsed = parse_evaluation(text, 10.0);
        assert_eq!(parsed.score, 6.0);
        assert_eq!(parsed.analysis, "Fine");
    }

    #[test]
    fn test_strip_code_fences_keeps_inline_content() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "\n{}\n");
        assert_eq!(strip_code_fences("```{\"a\": 1}```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("no fences"), "no fences");
    }

    #[test]
    fn test_candidates_in_order() {
        let found: Vec<&str> = json_object_candidates("{x} and {\"a\": {\"b\": 1}}").collect();
        assert_eq!(found, vec!["{x}", "{\"a\": {\"b\": 1}}", "{\"b\": 1}"]);
    }

    #[test]
    fn test_clamp_score_non_finite() {
        assert_eq!(clamp_score(f64::NAN, 10.0), 0.0);
        assert_eq!(clamp_score(f64::INFINITY, 10.0), 10.0);
        assert_eq!(clamp_score(f64::NEG_INFINITY, 10.0), 0.0);
    }
}
