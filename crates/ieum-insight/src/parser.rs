//! Parser for the analysis assistant's free-form report text.
//!
//! Expected shape:
//!
//! ```text
//! ### ActivityLevelIndicator: GOOD
//! **이유:** 매일 산책을 다녀오심
//!
//! ### HealthStatusIndicator: FAIR
//! **이유:** 무릎 통증을 자주 언급하심
//!
//! ### 종합 평가
//! 전반적으로 양호함
//! ```
//!
//! Parsing never fails. Blocks that cannot be read are logged and skipped.

use std::collections::BTreeMap;

use regex::Regex;
use tracing::warn;

use ieum_core::indicator::IndicatorResult;

/// Reserved key the qualitative summary is returned under.
pub const SUMMARY_KEY: &str = "Summary";

pub struct ReportAnalysisParser {
    summary_regex: Regex,
    block_separator: Regex,
    reason_marker: Regex,
}

impl Default for ReportAnalysisParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportAnalysisParser {
    pub fn new() -> Self {
        Self {
            summary_regex: Regex::new(r"(?s)###\s*(?:종합 평가|Overall Evaluation)\s*:?\s*(.*?)\s*$")
                .unwrap(),
            block_separator: Regex::new(r"\n[ \t\r]*\n").unwrap(),
            reason_marker: Regex::new(r"\*\*\s*(?:이유|Reason)\s*:\s*\*\*").unwrap(),
        }
    }

    /// Extract indicator results keyed by indicator name, plus the summary
    /// under [`SUMMARY_KEY`] (as the entry's reason) when present.
    pub fn parse(&self, text: &str) -> BTreeMap<String, IndicatorResult> {
        let mut results = BTreeMap::new();

        let body = match self.summary_regex.captures(text) {
            Some(caps) => {
                let summary = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
                if !summary.is_empty() {
                    results.insert(SUMMARY_KEY.to_string(), IndicatorResult::new("", summary));
                }
                caps.get(0).map(|m| &text[..m.start()]).unwrap_or(text)
            }
            None => text,
        };

        for block in self.block_separator.split(body) {
            let block = block.trim();
            if block.is_empty() {
                continue;
            }
            match self.parse_block(block) {
                Some((name, _)) if name == SUMMARY_KEY => {
                    warn!("Skipping analysis block named after the summary key");
                }
                Some((name, result)) => {
                    results.insert(name, result);
                }
                None => warn!(block = %first_line(block), "Skipping unreadable analysis block"),
            }
        }

        results
    }

    fn parse_block(&self, block: &str) -> Option<(String, IndicatorResult)> {
        let parts: Vec<&str> = self.reason_marker.split(block).collect();
        let [header, reason] = parts.as_slice() else {
            return None;
        };

        let header = header.lines().rev().map(str::trim).find(|l| !l.is_empty())?;
        let header = strip_emphasis(header.trim_start_matches('#'));
        let (name, value) = header.split_once(':')?;
        let name = strip_emphasis(name);
        let value = strip_emphasis(value);
        let reason = reason.trim();

        if name.is_empty() || value.is_empty() {
            return None;
        }
        Some((name.to_string(), IndicatorResult::new(value, reason)))
    }
}

fn strip_emphasis(s: &str) -> &str {
    s.trim().trim_matches('*').trim()
}

fn first_line(block: &str) -> &str {
    block.lines().next().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> BTreeMap<String, IndicatorResult> {
        ReportAnalysisParser::new().parse(text)
    }

    #[test]
    fn test_single_indicator_with_summary() {
        let out = parse(
            "### ActivityLevelIndicator: GOOD\n**이유:** 활발함\n\n### 종합 평가\n전반적으로 양호함",
        );
        assert_eq!(out.len(), 2);
        assert_eq!(
            out["ActivityLevelIndicator"],
            IndicatorResult::new("GOOD", "활발함")
        );
        assert_eq!(out[SUMMARY_KEY].reason, "전반적으로 양호함");
    }

    #[test]
    fn test_full_report() {
        let text = "\
분석 결과는 다음과 같습니다.

### ActivityLevelIndicator: GOOD
**이유:** 매일 산책을 다녀오심

### HealthStatusIndicator: FAIR
**이유:** 무릎 통증을 자주 언급하심

### CognitiveFunctionIndicator: NORMAL
**이유:** 대화가 일관됨

### LifeSatisfactionIndicator: SATISFIED
**이유:** 손주 이야기를 즐겁게 하심

### PsychologicalStabilityIndicator: STABLE
**이유:** 감정 기복이 적음

### SocialConnectivityIndicator: MODERATE
**이유:** 주 1회 복지관 방문

### SupportNeedsIndicator: LOW
**이유:** 일상생활 자립 가능

### 종합 평가
이번 주는 전반적으로 안정적인 한 주였습니다.
무릎 통증에 대한 관찰이 필요합니다.
";
        let out = parse(text);
        assert_eq!(out.len(), 8);
        assert_eq!(out["SupportNeedsIndicator"].value, "LOW");
        assert_eq!(
            out[SUMMARY_KEY].reason,
            "이번 주는 전반적으로 안정적인 한 주였습니다.\n무릎 통증에 대한 관찰이 필요합니다."
        );
    }

    #[test]
    fn test_parse_is_deterministic() {
        let text = "### A: X\n**이유:** r1\n\n### B: Y\n**이유:** r2\n\n### 종합 평가\n요약";
        assert_eq!(parse(text), parse(text));
    }

    #[test]
    fn test_later_duplicate_overwrites() {
        let out = parse("### A: X\n**이유:** first\n\n### A: Y\n**이유:** second");
        assert_eq!(out["A"], IndicatorResult::new("Y", "second"));
    }

    #[test]
    fn test_block_named_summary_does_not_replace_summary() {
        let out = parse("### Summary: X\n**이유:** y\n\n### 종합 평가\n진짜 요약");
        assert_eq!(out.len(), 1);
        assert_eq!(out[SUMMARY_KEY], IndicatorResult::new("", "진짜 요약"));

        let out = parse("### Summary: X\n**이유:** y");
        assert!(out.is_empty());
    }

    #[test]
    fn test_english_markers() {
        let out = parse(
            "### HealthStatusIndicator: POOR\n**Reason:** frequent pain\n\n### Overall Evaluation\nNeeds follow-up.",
        );
        assert_eq!(out["HealthStatusIndicator"], IndicatorResult::new("POOR", "frequent pain"));
        assert_eq!(out[SUMMARY_KEY].reason, "Needs follow-up.");
    }

    #[test]
    fn test_bold_header_and_spacing() {
        let out = parse("**ActivityLevelIndicator:  EXCELLENT**\n**이유:**   아침마다 체조");
        assert_eq!(
            out["ActivityLevelIndicator"],
            IndicatorResult::new("EXCELLENT", "아침마다 체조")
        );
    }

    #[test]
    fn test_value_keeps_colons_after_first() {
        let out = parse("### A: X: extra\n**이유:** r");
        assert_eq!(out["A"].value, "X: extra");
    }

    #[test]
    fn test_blocks_without_reason_or_colon_are_skipped() {
        let out = parse(
            "### A: X\n\n### B Y\n**이유:** no colon\n\n### : Z\n**이유:** no name\n\n### C:\n**이유:** no value",
        );
        assert!(out.is_empty());
    }

    #[test]
    fn test_block_with_two_reasons_is_skipped() {
        let out = parse("### A: X\n**이유:** one\n**이유:** two");
        assert!(out.is_empty());
    }

    #[test]
    fn test_no_summary_section() {
        let out = parse("### A: X\n**이유:** r");
        assert!(!out.contains_key(SUMMARY_KEY));
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn test_empty_summary_is_omitted() {
        let out = parse("### A: X\n**이유:** r\n\n### 종합 평가\n   ");
        assert!(!out.contains_key(SUMMARY_KEY));
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert!(parse("").is_empty());
        assert!(parse("죄송합니다. 분석할 수 없습니다.").is_empty());
    }

    #[test]
    fn test_crlf_blank_lines_separate_blocks() {
        let out = parse("### A: X\r\n**이유:** r1\r\n\r\n### B: Y\r\n**이유:** r2");
        assert_eq!(out.len(), 2);
        assert_eq!(out["B"].reason, "r2");
    }
}
