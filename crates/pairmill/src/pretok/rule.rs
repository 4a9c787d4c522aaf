//! # Split Rules

use crate::errors::{PairmillError, PmResult};

/// Model-line tag for regex rules.
const REGEX_TAG: &str = "regex:";

/// Model-line tag for split-byte rules.
const BYTES_TAG: &str = "bytes:";

/// The pre-tokenizer rule: how a raw buffer is split into chunks.
#[derive(Debug, Clone)]
pub enum SplitRule {
    /// Chunks are the matches of a regex pattern; gaps are discarded.
    Regex {
        /// The pattern as configured (without implied flags).
        pattern: String,
        /// The compiled pattern, with multiline + case-insensitive flags.
        regex: fancy_regex::Regex,
    },

    /// Every byte in the set starts a new chunk.
    SplitBytes {
        /// The split bytes as configured, in order.
        bytes: Vec<u8>,
        /// Membership mask over byte values.
        mask: Box<[bool; 256]>,
    },
}

impl SplitRule {
    /// Build a regex rule.
    ///
    /// The pattern is compiled with multiline and case-insensitive flags.
    ///
    /// ## Arguments
    /// * `pattern` - The word split pattern.
    ///
    /// ## Returns
    /// The rule, or a pattern error if compilation fails.
    pub fn regex<P: Into<String>>(pattern: P) -> PmResult<Self> {
        let pattern = pattern.into();
        let regex = fancy_regex::Regex::new(&format!("(?mi){pattern}"))
            .map_err(|e| PairmillError::Pattern(e.to_string()))?;
        Ok(Self::Regex { pattern, regex })
    }

    /// Build a split-byte rule.
    ///
    /// An empty set is legal: the whole input becomes a single chunk.
    ///
    /// ## Arguments
    /// * `bytes` - The byte values that act as hard chunk boundaries.
    pub fn split_bytes<B: AsRef<[u8]>>(bytes: B) -> Self {
        let bytes = bytes.as_ref().to_vec();
        let mut mask = Box::new([false; 256]);
        for &b in &bytes {
            mask[b as usize] = true;
        }
        Self::SplitBytes { bytes, mask }
    }

    /// The rule as a single model-file line.
    pub fn to_model_line(&self) -> String {
        match self {
            Self::Regex { pattern, .. } => {
                format!("{REGEX_TAG}{}", escape_bytes(pattern.as_bytes()))
            }
            Self::SplitBytes { bytes, .. } => {
                format!("{BYTES_TAG}{}", escape_bytes(bytes))
            }
        }
    }

    /// Parse a rule from a model-file line.
    ///
    /// ## Arguments
    /// * `line` - Line 1 of a model file, without the trailing newline.
    ///
    /// ## Returns
    /// The rule, or a model-format error for unknown tags or bad escapes.
    pub fn from_model_line(line: &str) -> PmResult<Self> {
        if let Some(rest) = line.strip_prefix(REGEX_TAG) {
            let bytes = unescape_bytes(rest)?;
            let pattern = String::from_utf8(bytes)
                .map_err(|_| PairmillError::ModelFormat("rule pattern is not UTF-8".into()))?;
            Self::regex(pattern)
        } else if let Some(rest) = line.strip_prefix(BYTES_TAG) {
            Ok(Self::split_bytes(unescape_bytes(rest)?))
        } else {
            Err(PairmillError::ModelFormat(format!(
                "unknown split rule tag in {line:?}"
            )))
        }
    }
}

impl PartialEq for SplitRule {
    fn eq(
        &self,
        other: &Self,
    ) -> bool {
        match (self, other) {
            (Self::Regex { pattern: a, .. }, Self::Regex { pattern: b, .. }) => a == b,
            (Self::SplitBytes { bytes: a, .. }, Self::SplitBytes { bytes: b, .. }) => a == b,
            _ => false,
        }
    }
}

/// Escape bytes so the rule always fits one line.
fn escape_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    for &b in bytes {
        match b {
            b'\\' => out.push_str(r"\\"),
            b'\n' => out.push_str(r"\n"),
            b'\r' => out.push_str(r"\r"),
            b'\t' => out.push_str(r"\t"),
            0x20..=0x7e => out.push(b as char),
            _ => out.push_str(&format!(r"\x{b:02x}")),
        }
    }
    out
}

/// Inverse of [`escape_bytes`].
fn unescape_bytes(text: &str) -> PmResult<Vec<u8>> {
    let bad = |msg: &str| PairmillError::ModelFormat(format!("bad rule escape: {msg}"));

    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            out.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('\\') => out.push(b'\\'),
            Some('n') => out.push(b'\n'),
            Some('r') => out.push(b'\r'),
            Some('t') => out.push(b'\t'),
            Some('x') => {
                let hi = chars.next().ok_or_else(|| bad("truncated \\x"))?;
                let lo = chars.next().ok_or_else(|| bad("truncated \\x"))?;
                let hex: String = [hi, lo].iter().collect();
                out.push(u8::from_str_radix(&hex, 16).map_err(|_| bad("non-hex \\x digits"))?);
            }
            Some(other) => return Err(bad(&format!("unknown escape \\{other}"))),
            None => return Err(bad("trailing backslash")),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pretok::GPT_STYLE_PATTERN;

    #[test]
    fn test_regex_rule_line_round_trip() {
        let rule = SplitRule::regex(GPT_STYLE_PATTERN).unwrap();
        let line = rule.to_model_line();
        assert!(line.starts_with("regex:"));
        assert!(!line.contains('\n'));

        let back = SplitRule::from_model_line(&line).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_split_byte_rule_line_round_trip() {
        let rule = SplitRule::split_bytes(" \n\t\\\x01");
        let line = rule.to_model_line();
        assert_eq!(line, r"bytes: \n\t\\\x01");

        let back = SplitRule::from_model_line(&line).unwrap();
        assert_eq!(back, rule);
    }

    #[test]
    fn test_empty_split_byte_rule() {
        let rule = SplitRule::split_bytes("");
        assert_eq!(rule.to_model_line(), "bytes:");
        assert_eq!(SplitRule::from_model_line("bytes:").unwrap(), rule);
    }

    #[test]
    fn test_bad_pattern() {
        assert!(matches!(
            SplitRule::regex(r"(unclosed"),
            Err(PairmillError::Pattern(_))
        ));
    }

    #[test]
    fn test_bad_rule_lines() {
        for line in ["", "split: ", r"bytes:\q", r"bytes:\x0", r"bytes:\xzz"] {
            assert!(
                matches!(
                    SplitRule::from_model_line(line),
                    Err(PairmillError::ModelFormat(_))
                ),
                "line {line:?} should be rejected"
            );
        }
    }
}
