use std::path::Path;

use once_cell::sync::Lazy;
use pulldown_cmark::{Event, Parser, TagEnd};
use regex::Regex;

use crate::config::ChunkingConfig;

/// A bounded slice of a file's text, the unit that gets embedded and stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub content: String,
    pub file_path: String,
    /// Approximate position marker: ordinal chunk index times the configured
    /// chunk size. Once overlap is in play this is not an exact offset.
    pub start_offset: usize,
}

/// Matches definition-like tokens so code chunks close at declaration
/// boundaries instead of mid-function.
static DEFINITION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:class|struct|enum|trait|impl|interface|def|fn|func|function|const|let|var|public|private)\s")
        .expect("definition pattern is valid")
});

const CODE_EXTENSIONS: &[&str] = &[
    "py", "rs", "go", "java", "c", "cc", "cpp", "h", "hpp", "js", "ts", "tsx", "jsx", "cs", "rb",
    "php",
];

pub struct Chunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl Chunker {
    pub fn new(config: &ChunkingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size.max(1),
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
        }
    }

    /// Splits file content into bounded chunks keyed off the file's extension:
    /// markdown is flattened to plain text first, code files split at
    /// definition keywords, everything else splits by line. There is no error
    /// path; content the splitter cannot make sense of degrades to lines.
    pub fn chunk(&self, content: &str, file_path: &str) -> Vec<Chunk> {
        if content.is_empty() {
            return Vec::new();
        }

        let ext = file_type(file_path);

        let flattened;
        let text = if ext == "md" {
            flattened = flatten_markdown(content);
            flattened.as_str()
        } else {
            content
        };

        let units = if CODE_EXTENSIONS.contains(&ext) {
            split_definitions(text)
        } else {
            split_lines(text)
        };

        self.accumulate(&units, file_path)
    }

    /// Greedy accumulation: extend the current chunk until the next unit
    /// would push it past the character budget, then close it and seed the
    /// next chunk with the closed chunk's trailing overlap window.
    fn accumulate(&self, units: &[&str], file_path: &str) -> Vec<Chunk> {
        let mut chunks: Vec<Chunk> = Vec::new();
        let mut current = String::new();
        let mut current_chars = 0usize;

        for unit in units {
            let unit_chars = unit.chars().count();
            if current_chars > 0 && current_chars + unit_chars > self.chunk_size {
                let seed = tail_chars(&current, self.chunk_overlap).to_string();
                let seed_chars = seed.chars().count();
                chunks.push(Chunk {
                    content: std::mem::take(&mut current),
                    file_path: file_path.to_string(),
                    start_offset: chunks.len() * self.chunk_size,
                });
                current = seed;
                current_chars = seed_chars;
            }
            current.push_str(unit);
            current_chars += unit_chars;
        }

        // Trailing partial chunk is always flushed.
        if !current.is_empty() {
            chunks.push(Chunk {
                content: current,
                file_path: file_path.to_string(),
                start_offset: chunks.len() * self.chunk_size,
            });
        }

        chunks
    }
}

/// Extension without the dot; empty for extensionless paths.
pub fn file_type(path: &str) -> &str {
    Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
}

fn split_lines(text: &str) -> Vec<&str> {
    text.split_inclusive('\n').collect()
}

/// Splits before each definition keyword so a declaration starts a new unit.
/// Files with no recognizable definitions fall back to a line split.
fn split_definitions(text: &str) -> Vec<&str> {
    let starts: Vec<usize> = DEFINITION.find_iter(text).map(|m| m.start()).collect();
    if starts.is_empty() {
        return split_lines(text);
    }

    let mut units = Vec::with_capacity(starts.len() + 1);
    let mut prev = 0;
    for &start in &starts {
        if start > prev {
            units.push(&text[prev..start]);
            prev = start;
        }
    }
    units.push(&text[prev..]);
    units
}

/// Flattens markdown to its textual content, dropping structural markup.
fn flatten_markdown(content: &str) -> String {
    let mut text = String::with_capacity(content.len());
    for event in Parser::new(content) {
        match event {
            Event::Text(t) | Event::Code(t) => text.push_str(&t),
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            // Inline ends (emphasis, links) must not break lines.
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::CodeBlock,
            ) => {
                if !text.is_empty() && !text.ends_with('\n') {
                    text.push('\n');
                }
            }
            _ => {}
        }
    }
    text
}

/// Last `n` characters of `s`, respecting char boundaries.
fn tail_chars(s: &str, n: usize) -> &str {
    if n == 0 {
        return "";
    }
    let total = s.chars().count();
    if total <= n {
        return s;
    }
    match s.char_indices().nth(total - n) {
        Some((index, _)) => &s[index..],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(size: usize, overlap: usize) -> Chunker {
        Chunker::new(&ChunkingConfig {
            chunk_size: size,
            chunk_overlap: overlap,
        })
    }

    #[test]
    fn empty_content_produces_no_chunks() {
        assert!(chunker(1000, 200).chunk("", "src/lib.rs").is_empty());
    }

    #[test]
    fn small_python_file_is_one_whole_chunk() {
        let content = "def foo():\n    pass\n";
        let chunks = chunker(1000, 200).chunk(content, "app/main.py");

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, content);
        assert_eq!(chunks[0].file_path, "app/main.py");
        assert_eq!(chunks[0].start_offset, 0);
    }

    #[test]
    fn code_splits_at_definition_boundaries() {
        let content = "fn alpha() {\n    work();\n}\n\nfn beta() {\n    more();\n}\n";
        let chunks = chunker(30, 0).chunk(content, "src/ops.rs");

        assert!(chunks.len() >= 2);
        assert!(chunks[0].content.contains("alpha"));
        assert!(chunks.last().unwrap().content.contains("beta"));
    }

    #[test]
    fn no_characters_are_dropped() {
        let content = "line one\nline two\nline three\nline four\nline five\n";
        let overlap = 4;
        let chunks = chunker(20, overlap).chunk(content, "notes.txt");
        assert!(chunks.len() > 1);

        // Concatenating chunks minus the seeded overlap reconstructs the text.
        let mut rebuilt = chunks[0].content.clone();
        for pair in chunks.windows(2) {
            let seed = tail_chars(&pair[0].content, overlap);
            rebuilt.push_str(&pair[1].content[seed.len()..]);
        }
        assert_eq!(rebuilt, content);
    }

    #[test]
    fn log_files_split_by_line() {
        let content = "2024-01-01 ok\n2024-01-02 warn\n2024-01-03 error\n";
        let chunks = chunker(16, 0).chunk(content, "server.log");

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].content, "2024-01-01 ok\n");
        assert_eq!(chunks[1].start_offset, 16);
        assert_eq!(chunks[2].start_offset, 32);
    }

    #[test]
    fn overlap_seeds_the_next_chunk() {
        let content = "aaaaaaaa\nbbbbbbbb\ncccccccc\n";
        let chunks = chunker(10, 3).chunk(content, "data.txt");

        assert!(chunks.len() >= 2);
        let seed = tail_chars(&chunks[0].content, 3);
        assert!(chunks[1].content.starts_with(seed));
    }

    #[test]
    fn markdown_is_flattened_before_chunking() {
        let content = "# Title\n\nSome **bold** text with `code`.\n";
        let chunks = chunker(1000, 0).chunk(content, "README.md");

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].content.contains("Title"));
        assert!(chunks[0].content.contains("Some bold text with code."));
        assert!(!chunks[0].content.contains('#'));
        assert!(!chunks[0].content.contains("**"));
    }

    #[test]
    fn code_without_definitions_degrades_to_lines() {
        let content = "x = 1\ny = 2\nz = 3\n";
        let chunks = chunker(8, 0).chunk(content, "script.py");

        assert!(chunks.len() >= 2);
        let joined: String = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(joined, content);
    }

    #[test]
    fn trailing_partial_chunk_is_flushed() {
        let content = "0123456789\nab\n";
        let chunks = chunker(11, 0).chunk(content, "small.txt");

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].content, "ab\n");
    }

    #[test]
    fn file_type_extracts_extension() {
        assert_eq!(file_type("src/lib.rs"), "rs");
        assert_eq!(file_type("a/b/config.yaml"), "yaml");
        assert_eq!(file_type("Makefile"), "");
    }
}
