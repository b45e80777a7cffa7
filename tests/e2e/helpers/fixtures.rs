use audiobook_batcher::domain::shared::DocumentId;
use chrono::NaiveDate;

pub fn document() -> DocumentId {
    DocumentId::parse("lighthouse").unwrap()
}

pub fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
}

/// A book with `pages` pages separated by form feeds, each holding `paragraphs` paragraphs
/// of `sentences` numbered sentences.
pub fn book(pages: usize, paragraphs: usize, sentences: usize) -> String {
    (1..=pages)
        .map(|page| {
            (1..=paragraphs)
                .map(|paragraph| {
                    (1..=sentences)
                        .map(|sentence| {
                            format!(
                                "Page {page} paragraph {paragraph} line {sentence:02} of the tale. "
                            )
                        })
                        .collect::<String>()
                        .trim_end()
                        .to_string()
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        })
        .collect::<Vec<_>>()
        .join("\n\x0c\n")
}
