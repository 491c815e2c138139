//! Cue-aligned chunking.

use aclip_models::{SrtCue, SubtitleChunk};

use crate::error::{SubtitleError, SubtitleResult};

/// Slice cues into chunks whose concatenated text stays within `chunk_size`
/// characters.
///
/// Splits happen only on cue boundaries; a single cue longer than the budget
/// still forms its own chunk. Concatenating the chunk texts reproduces the
/// concatenated cue texts exactly (one space joiner, matching
/// `SubtitleChunk::text` construction).
pub fn chunk_cues(cues: &[SrtCue], chunk_size: usize) -> SubtitleResult<Vec<SubtitleChunk>> {
    if chunk_size == 0 {
        return Err(SubtitleError::InvalidChunkSize);
    }
    if cues.is_empty() {
        return Err(SubtitleError::NoCues);
    }

    let mut chunks = Vec::new();
    let mut current: Vec<SrtCue> = Vec::new();
    let mut current_len = 0usize;

    for cue in cues {
        let cue_len = cue.text.chars().count();
        // The joiner space counts toward the budget once the chunk is
        // non-empty.
        let projected = current_len + cue_len + usize::from(!current.is_empty());

        if !current.is_empty() && projected > chunk_size {
            chunks.push(build_chunk(chunks.len(), std::mem::take(&mut current)));
            current_len = 0;
        }

        current_len += cue_len + usize::from(!current.is_empty());
        current.push(cue.clone());
    }

    if !current.is_empty() {
        chunks.push(build_chunk(chunks.len(), current));
    }

    Ok(chunks)
}

fn build_chunk(index: usize, cues: Vec<SrtCue>) -> SubtitleChunk {
    let text = cues
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    SubtitleChunk {
        index,
        start: cues.first().map(|c| c.start).unwrap_or_default(),
        end: cues.last().map(|c| c.end).unwrap_or_default(),
        text,
        cues,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aclip_models::SrtTime;

    fn cue(index: usize, start_s: u64, end_s: u64, text: &str) -> SrtCue {
        SrtCue {
            index,
            start: SrtTime::from_secs(start_s),
            end: SrtTime::from_secs(end_s),
            text: text.to_string(),
        }
    }

    fn cues() -> Vec<SrtCue> {
        vec![
            cue(1, 0, 5, "aaaa"),
            cue(2, 5, 10, "bbbb"),
            cue(3, 10, 15, "cccc"),
        ]
    }

    #[test]
    fn test_single_chunk_when_budget_fits() {
        let chunks = chunk_cues(&cues(), 1000).unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "aaaa bbbb cccc");
        assert_eq!(chunks[0].start, SrtTime::from_secs(0));
        assert_eq!(chunks[0].end, SrtTime::from_secs(15));
        assert_eq!(chunks[0].cues.len(), 3);
    }

    #[test]
    fn test_splits_on_cue_boundaries() {
        // Budget of 9 fits "aaaa bbbb" but not the third cue.
        let chunks = chunk_cues(&cues(), 9).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "aaaa bbbb");
        assert_eq!(chunks[1].text, "cccc");
        assert_eq!(chunks[1].index, 1);
    }

    #[test]
    fn test_oversized_cue_gets_own_chunk() {
        let oversized = vec![cue(1, 0, 5, "xxxxxxxxxx"), cue(2, 5, 10, "yy")];
        let chunks = chunk_cues(&oversized, 4).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].text, "xxxxxxxxxx");
        assert_eq!(chunks[1].text, "yy");
    }

    #[test]
    fn test_round_trip_concatenation() {
        let all = cues();
        for budget in [3, 5, 9, 14, 100] {
            let chunks = chunk_cues(&all, budget).unwrap();
            let rejoined = chunks
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            let original = all
                .iter()
                .map(|c| c.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            assert_eq!(rejoined, original, "budget {}", budget);
        }
    }

    #[test]
    fn test_zero_budget_rejected() {
        assert!(matches!(
            chunk_cues(&cues(), 0),
            Err(SubtitleError::InvalidChunkSize)
        ));
    }
}
