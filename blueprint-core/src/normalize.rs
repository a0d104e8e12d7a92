//! Canonical plain-text form for AI output.
//!
//! Completion models return a mix of HTML entities, typographic punctuation
//! and markdown emphasis. Everything downstream (session history, the PDF
//! renderer) works on the cleaned form produced here.

/// Normalize raw model output.
///
/// Decodes HTML entities, straightens curly quotes, turns bullets and
/// en/em-dashes into `-`, drops `**` bold markers and trims surrounding
/// whitespace. The pass repeats until nothing changes, so the result is a
/// fixpoint: `normalize(&normalize(x)) == normalize(x)`.
pub fn normalize(raw: &str) -> String {
    let mut current = normalize_once(raw);
    loop {
        let next = normalize_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn normalize_once(raw: &str) -> String {
    let decoded = html_escape::decode_html_entities(raw);
    let mapped: String = decoded.chars().map(map_punctuation).collect();
    mapped.replace("**", "").trim().to_string()
}

fn map_punctuation(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
        '\u{2022}' | '\u{2013}' | '\u{2014}' => '-',
        other => other,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    // -- Strategy helpers --

    /// Fragments that interact: entity pieces, bold markers, mapped
    /// punctuation and whitespace.
    fn arb_fragment() -> impl Strategy<Value = String> {
        let fixed = prop::sample::select(vec![
            "&", ";", "#", "*", "**", "amp", "lt", "quot", "x2A", "\u{2018}", "\u{201D}",
            "\u{2013}", "\u{2014}", "\u{2022}", " ", "\n",
        ])
        .prop_map(str::to_string);

        prop_oneof![fixed, "[0-9]{1,3}", "[a-z]{1,4}"]
    }

    fn arb_awkward_text() -> impl Strategy<Value = String> {
        prop::collection::vec(arb_fragment(), 0..32).prop_map(|parts| parts.concat())
    }

    proptest! {
        #[test]
        fn normalize_is_idempotent(raw in any::<String>()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn normalize_is_idempotent_on_entity_soup(raw in arb_awkward_text()) {
            let once = normalize(&raw);
            prop_assert_eq!(normalize(&once), once.clone());
            prop_assert!(!once.contains("**"), "bold marker left in {:?}", once);
            prop_assert_eq!(once.trim(), once.as_str());
        }
    }
}
