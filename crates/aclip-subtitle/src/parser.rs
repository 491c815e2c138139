//! SRT parsing and formatting.

use aclip_models::{SrtCue, SrtTime};
use tracing::warn;

use crate::error::{SubtitleError, SubtitleResult};

/// Parse SRT text into an ordered cue sequence.
///
/// The parser is deliberately tolerant: a UTF-8 BOM, CRLF line endings,
/// repeated blank lines and out-of-order indices are all accepted (cues are
/// re-indexed sequentially). A block that cannot be parsed is skipped with a
/// warning rather than failing the whole file. An input with no parseable
/// cues at all is an error.
pub fn parse_srt(input: &str) -> SubtitleResult<Vec<SrtCue>> {
    let input = input.trim_start_matches('\u{feff}');

    let mut cues = Vec::new();
    for (block_no, block) in split_blocks(input).into_iter().enumerate() {
        match parse_block(&block) {
            Some((start, end, text)) => {
                if end < start {
                    warn!(block = block_no + 1, "skipping cue with end before start");
                    continue;
                }
                cues.push(SrtCue {
                    index: cues.len() + 1,
                    start,
                    end,
                    text,
                });
            }
            None => {
                warn!(block = block_no + 1, "skipping malformed SRT block");
            }
        }
    }

    if cues.is_empty() {
        return Err(SubtitleError::NoCues);
    }

    cues.sort_by_key(|c| c.start);
    for (i, cue) in cues.iter_mut().enumerate() {
        cue.index = i + 1;
    }

    Ok(cues)
}

/// Render cues back to SRT text.
pub fn format_srt(cues: &[SrtCue]) -> String {
    cues.iter()
        .map(|cue| {
            format!(
                "{}\n{} --> {}\n{}\n",
                cue.index, cue.start, cue.end, cue.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Split raw SRT text into blank-line separated blocks.
fn split_blocks(input: &str) -> Vec<Vec<String>> {
    let mut blocks = Vec::new();
    let mut current: Vec<String> = Vec::new();

    for line in input.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line.to_string());
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Parse one SRT block into (start, end, text).
///
/// Blocks normally lead with a numeric index line, but some producers omit
/// it; the timing line is located by the `-->` marker instead.
fn parse_block(lines: &[String]) -> Option<(SrtTime, SrtTime, String)> {
    let timing_pos = lines.iter().position(|l| l.contains("-->"))?;
    let (start_raw, end_raw) = lines[timing_pos].split_once("-->")?;

    // Position/coordinate hints after the end timestamp are ignored.
    let end_raw = end_raw.trim().split_whitespace().next()?;

    let start: SrtTime = start_raw.trim().parse().ok()?;
    let end: SrtTime = end_raw.parse().ok()?;

    let text = lines[timing_pos + 1..].join("\n").trim().to_string();
    if text.is_empty() {
        return None;
    }

    Some((start, end, text))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "1\n00:00:00,000 --> 00:00:05,000\nA\n\n2\n00:00:05,000 --> 00:00:10,000\nB\n\n3\n00:00:10,000 --> 00:00:15,000\nC\n";

    #[test]
    fn test_parse_basic() {
        let cues = parse_srt(SAMPLE).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[0].text, "A");
        assert_eq!(cues[2].start, SrtTime::from_secs(10));
        assert_eq!(cues[2].index, 3);
    }

    #[test]
    fn test_parse_crlf_and_bom() {
        let input = format!("\u{feff}{}", SAMPLE.replace('\n', "\r\n"));
        let cues = parse_srt(&input).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!(cues[1].text, "B");
    }

    #[test]
    fn test_parse_multiline_text() {
        let input = "1\n00:00:00,000 --> 00:00:02,000\nline one\nline two\n";
        let cues = parse_srt(input).unwrap();
        assert_eq!(cues[0].text, "line one\nline two");
    }

    #[test]
    fn test_malformed_block_skipped() {
        let input = format!("{}\n\nnot a block at all\n", SAMPLE.trim_end());
        let cues = parse_srt(&input).unwrap();
        assert_eq!(cues.len(), 3);
    }

    #[test]
    fn test_missing_index_line() {
        let input = "00:00:00,000 --> 00:00:02,000\nno index\n";
        let cues = parse_srt(input).unwrap();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].index, 1);
    }

    #[test]
    fn test_out_of_order_cues_sorted() {
        let input = "2\n00:00:05,000 --> 00:00:10,000\nB\n\n1\n00:00:00,000 --> 00:00:05,000\nA\n";
        let cues = parse_srt(input).unwrap();
        assert_eq!(cues[0].text, "A");
        assert_eq!(cues[0].index, 1);
        assert_eq!(cues[1].text, "B");
        assert_eq!(cues[1].index, 2);
    }

    #[test]
    fn test_empty_input_is_error() {
        assert!(matches!(parse_srt(""), Err(SubtitleError::NoCues)));
        assert!(matches!(parse_srt("junk\n"), Err(SubtitleError::NoCues)));
    }

    #[test]
    fn test_format_round_trip() {
        let cues = parse_srt(SAMPLE).unwrap();
        let rendered = format_srt(&cues);
        let reparsed = parse_srt(&rendered).unwrap();
        assert_eq!(cues, reparsed);
    }
}
