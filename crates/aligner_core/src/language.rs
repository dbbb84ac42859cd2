/// Human language names mapped to the service's language codes.
///
/// Lookup is case-insensitive on the name; the codes are passed to the
/// service verbatim.
pub const LANGUAGES: &[(&str, &str)] = &[
    ("australian english", "eng-AU"),
    ("south african afrikaans", "afr-ZA"),
    ("albanian", "sqi-AL"),
    ("arabic", "arb"),
    ("basque (spain)", "eus-ES"),
    ("basque (france)", "eus-FR"),
    ("catalan", "cat-ES"),
    ("czech", "cze-CZ"),
    ("dutch", "nld-NL"),
    ("british english", "eng-GB"),
    ("new zealand english", "eng-NZ"),
    ("american english", "eng-US"),
    ("estonian", "ekk-EE"),
    ("finnish", "fin-FI"),
    ("french", "fra-FR"),
    ("georgian", "kat-GE"),
    ("german", "deu-DE"),
    ("swiss german", "gsw-CH"),
    ("swiss german (bern)", "gsw-CH-BE"),
    ("swiss german (basel)", "gsw-CH-BS"),
    ("swiss german (graubünden)", "gsw-CH-GR"),
    ("swiss german (st. gallen)", "gsw-CH-SG"),
    ("swiss german (zurich)", "gsw-CH-ZH"),
    ("haitian creole", "hat-HT"),
    ("hungarian", "hun-HU"),
    ("icelandic", "isl-IS"),
    ("italian", "ita-IT"),
    ("japanese", "jpn-JP"),
    ("guugu yimithirr", "gup-AU"),
    ("luxembourgish", "ltz-LU"),
    ("maltese", "mlt-MT"),
    ("norwegian", "nor-NO"),
    ("persian", "fas-IR"),
    ("polish", "pol-PL"),
    ("romanian", "ron-RO"),
    ("russian", "rus-RU"),
    ("slovak", "slk-SK"),
    ("spanish", "spa-ES"),
    ("swedish", "swe-SE"),
    ("thai", "tha-TH"),
    ("gungabula", "guf-AU"),
    ("unknown", "und"),
];

/// Service code for a human language name, if known.
pub fn language_code(name: &str) -> Option<&'static str> {
    let wanted = name.trim().to_lowercase();
    LANGUAGES
        .iter()
        .find(|(candidate, _)| *candidate == wanted)
        .map(|(_, code)| *code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_case_insensitive() {
        assert_eq!(language_code("German"), Some("deu-DE"));
        assert_eq!(language_code("  SWISS GERMAN (ZURICH) "), Some("gsw-CH-ZH"));
    }

    #[test]
    fn unknown_names_return_none() {
        assert_eq!(language_code("klingon"), None);
    }
}
