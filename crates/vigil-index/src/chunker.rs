//! Document chunking: markdown by heading, everything else by line window

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Contiguous from 0 after empty chunks are dropped
    pub index: usize,
    pub heading: Option<String>,
    /// 1-indexed, inclusive
    pub start_line: usize,
    pub end_line: usize,
    pub text: String,
}

/// Deepest heading level that starts a new chunk
const MAX_SPLIT_LEVEL: usize = 3;

/// Split a markdown document at headings of level 1 to 3. Fenced code is never split.
pub fn chunk_markdown(content: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut heading: Option<String> = None;
    let mut start = 1;
    let mut body: Vec<&str> = Vec::new();
    let mut in_fence = false;

    for (idx, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_fence = !in_fence;
        }
        let split_heading = if in_fence { None } else { heading_text(trimmed) };
        if let Some(text) = split_heading {
            push_chunk(&mut chunks, heading.take(), start, &body);
            heading = Some(text);
            start = idx + 1;
            body.clear();
        }
        body.push(line);
    }
    push_chunk(&mut chunks, heading, start, &body);

    renumber(chunks)
}

/// Split plain text into windows of `window` lines
pub fn chunk_lines(content: &str, window: usize) -> Vec<Chunk> {
    let window = window.max(1);
    let lines: Vec<&str> = content.lines().collect();
    let mut chunks = Vec::new();
    for (n, group) in lines.chunks(window).enumerate() {
        push_chunk(&mut chunks, None, n * window + 1, group);
    }
    renumber(chunks)
}

/// `## Title` at levels 1..=3 yields `Title`
fn heading_text(trimmed: &str) -> Option<String> {
    let level = trimmed.chars().take_while(|c| *c == '#').count();
    if level == 0 || level > MAX_SPLIT_LEVEL {
        return None;
    }
    let rest = &trimmed[level..];
    if !rest.is_empty() && !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim().trim_end_matches('#').trim().to_string())
}

fn push_chunk(chunks: &mut Vec<Chunk>, heading: Option<String>, start: usize, lines: &[&str]) {
    if lines.is_empty() {
        return;
    }
    chunks.push(Chunk {
        index: chunks.len(),
        heading,
        start_line: start,
        end_line: start + lines.len() - 1,
        text: lines.join("\n"),
    });
}

fn renumber(chunks: Vec<Chunk>) -> Vec<Chunk> {
    chunks
        .into_iter()
        .filter(|chunk| !chunk.text.trim().is_empty())
        .enumerate()
        .map(|(index, chunk)| Chunk { index, ..chunk })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_splits_at_shallow_headings() {
        let doc = "# Guide\nintro\n\n## Install\nrun it\n#### Detail\nstill install\n## Usage\nuse it\n";
        let chunks = chunk_markdown(doc);
        let headings: Vec<_> = chunks.iter().map(|c| c.heading.as_deref()).collect();
        assert_eq!(headings, vec![Some("Guide"), Some("Install"), Some("Usage")]);
        assert!(chunks[1].text.contains("still install"));
        assert_eq!((chunks[1].start_line, chunks[1].end_line), (4, 7));
    }

    #[test]
    fn test_empty_chunks_dropped_and_renumbered() {
        let doc = "\n\n# A\n# B\nbody\n";
        let chunks = chunk_markdown(doc);
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, (0..chunks.len()).collect::<Vec<_>>());
        assert!(chunks.iter().all(|c| !c.text.trim().is_empty()));
        assert_eq!(chunks.last().unwrap().heading.as_deref(), Some("B"));
    }

    #[test]
    fn test_fenced_code_is_not_split() {
        let doc = "# Title\n```sh\n# not a heading\n```\n";
        assert_eq!(chunk_markdown(doc).len(), 1);
    }

    #[test]
    fn test_hashtag_without_space_is_text() {
        assert_eq!(heading_text("#tag"), None);
        assert_eq!(heading_text("## Setup ##").as_deref(), Some("Setup"));
    }

    #[test]
    fn test_line_windows() {
        let text: String = (1..=5).map(|i| format!("line {}\n", i)).collect();
        let chunks = chunk_lines(&text, 2);
        assert_eq!(chunks.len(), 3);
        assert_eq!((chunks[2].start_line, chunks[2].end_line), (5, 5));
        assert_eq!(chunks[1].text, "line 3\nline 4");
    }

    #[test]
    fn test_blank_windows_dropped() {
        let chunks = chunk_lines("a\n\n\n\nb\n", 2);
        let indices: Vec<_> = chunks.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert_eq!(chunks[1].text.trim(), "b");
    }
}
