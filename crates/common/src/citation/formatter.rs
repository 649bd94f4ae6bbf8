//! Human-readable reference strings for INSPIRE records

use crate::search::{SearchHit, NOT_AVAILABLE};

/// Permalink prefix for literature records
pub const INSPIRE_LITERATURE_URL: &str = "https://inspirehep.net/literature";

/// Permalink to a record's INSPIRE page
pub fn permalink(control_number: i64) -> String {
    format!("{}/{}", INSPIRE_LITERATURE_URL, control_number)
}

/// Format a hit as a markdown reference followed by a paragraph break:
///
/// `Authors (Year). *Title*. DOI: doi. [INSPIRE record N](link)`
pub fn format_reference(hit: &SearchHit) -> String {
    let authors = hit.authors.join(", ");
    let year = hit
        .publication_year
        .map(|y| y.to_string())
        .unwrap_or_else(|| NOT_AVAILABLE.to_string());
    let doi = hit.doi.as_deref().unwrap_or(NOT_AVAILABLE);

    format!(
        "{} ({}). *{}*. DOI: {}. [INSPIRE record {}]({})\n\n",
        authors,
        year,
        hit.title,
        doi,
        hit.control_number,
        permalink(hit.control_number)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_reference() {
        let hit = SearchHit {
            authors: vec!["Hawking, S.W.".into(), "Page, D.N.".into()],
            publication_year: Some(1983),
            doi: Some("10.1007/BF01208266".into()),
            ..SearchHit::new(13580, "Thermodynamics of Black Holes in anti-De Sitter Space")
        };

        assert_eq!(
            format_reference(&hit),
            "Hawking, S.W., Page, D.N. (1983). *Thermodynamics of Black Holes in anti-De Sitter Space*. \
             DOI: 10.1007/BF01208266. \
             [INSPIRE record 13580](https://inspirehep.net/literature/13580)\n\n"
        );
    }

    #[test]
    fn test_missing_metadata_uses_placeholders() {
        let hit = SearchHit::new(99, "N/A");
        assert_eq!(
            format_reference(&hit),
            " (N/A). *N/A*. DOI: N/A. [INSPIRE record 99](https://inspirehep.net/literature/99)\n\n"
        );
    }
}
