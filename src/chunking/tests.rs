use super::*;

fn splitter(chunk_size: usize, chunk_overlap: usize) -> TextSplitter {
    TextSplitter::new(&ChunkingConfig {
        chunk_size,
        chunk_overlap,
    })
}

fn regulation_text() -> String {
    let paragraph = "Article 4 requires every operator to keep records of all transfers. \
        Records must be retained for seven years and produced on request. \
        Failure to comply is an offence punishable by a fine.";
    (0..12)
        .map(|i| format!("Section {}.\n{}", i, paragraph))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[test]
fn default_config() {
    let config = ChunkingConfig::default();
    assert_eq!(config.chunk_size, 500);
    assert_eq!(config.chunk_overlap, 50);

    let splitter = TextSplitter::default();
    assert_eq!(splitter.chunk_size(), 500);
    assert_eq!(splitter.chunk_overlap(), 50);
}

#[test]
fn short_text_is_a_single_chunk() {
    let chunks = TextSplitter::default().split_text("A short clause.");
    assert_eq!(chunks, vec!["A short clause.".to_string()]);
}

#[test]
fn empty_text_yields_nothing() {
    assert!(TextSplitter::default().split_text("").is_empty());
    assert!(TextSplitter::default().split_text(" \n\n \n").is_empty());
}

#[test]
fn chunks_never_exceed_chunk_size() {
    let text = regulation_text();
    let chunks = TextSplitter::default().split_text(&text);

    assert!(chunks.len() > 1, "long text should be split");
    for chunk in &chunks {
        assert!(
            chunk.chars().count() <= 500,
            "chunk of {} chars exceeds limit",
            chunk.chars().count()
        );
    }
}

#[test]
fn prefers_paragraph_boundaries() {
    let first = "First paragraph about retention.".repeat(5);
    let second = "Second paragraph about audits.".repeat(5);
    let text = format!("{}\n\n{}", first, second);

    let chunks = splitter(200, 0).split_text(&text);

    assert_eq!(chunks, vec![first, second]);
}

#[test]
fn words_overlap_between_chunks() {
    let chunks = splitter(10, 5).split_text("aaaa bbbb cccc dddd");

    assert_eq!(chunks, vec!["aaaa bbbb", "bbbb cccc", "cccc dddd"]);
}

#[test]
fn zero_overlap_produces_disjoint_chunks() {
    let chunks = splitter(10, 0).split_text("aaaa bbbb cccc dddd");

    assert_eq!(chunks, vec!["aaaa bbbb", "cccc dddd"]);
}

#[test]
fn text_without_separators_falls_back_to_characters() {
    let text = "x".repeat(25);
    let chunks = splitter(10, 0).split_text(&text);

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    assert_eq!(chunks.concat(), text);
}

#[test]
fn multibyte_text_is_measured_in_characters() {
    let text = "é".repeat(30);
    let chunks = splitter(10, 0).split_text(&text);

    assert_eq!(chunks.len(), 3);
    assert!(chunks.iter().all(|c| c.chars().count() == 10));
}

#[test]
fn custom_separators_without_character_fallback_still_respect_size() {
    let text = "y".repeat(30);
    let chunks = splitter(10, 0)
        .with_separators(["\n\n", "\n", ".", " "])
        .split_text(&text);

    assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    assert_eq!(chunks.concat(), text);
}

#[test]
fn sentence_separator_stays_with_following_text() {
    let pieces = split_keeping_separator("One. Two. Three", ".");
    assert_eq!(pieces, vec!["One", ". Two", ". Three"]);
}

#[test]
fn split_pages_tags_source_and_page() {
    let pages = vec![
        Page {
            number: 1,
            text: "Scope of the regulation.".to_string(),
        },
        Page {
            number: 2,
            text: "   ".to_string(),
        },
        Page {
            number: 3,
            text: regulation_text(),
        },
    ];

    let chunks = TextSplitter::default().split_pages(&pages, "reg.pdf");

    assert!(chunks.len() > 2);
    assert!(chunks.iter().all(|c| c.metadata.source == "reg.pdf"));
    assert_eq!(chunks[0].metadata.page, 1);
    assert_eq!(chunks[0].metadata.chunk_index, 0);
    assert!(chunks.iter().all(|c| c.metadata.page != 2));
    assert!(chunks[1..].iter().all(|c| c.metadata.page == 3));

    let page_three: Vec<u32> = chunks[1..].iter().map(|c| c.metadata.chunk_index).collect();
    assert_eq!(page_three, (0..page_three.len() as u32).collect::<Vec<_>>());
}
