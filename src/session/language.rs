pub const ENGLISH_GLYPH: &str = "🇬🇧";
pub const HINDI_GLYPH: &str = "🇮🇳";
pub const DEFAULT_GLYPH: &str = "🌐";

/// Locale glyph shown by the language indicator for a reply's language tag.
///
/// Accepts the backend's language names (`english`, `hindi`) as well as
/// BCP 47 tags (`en-GB`, `hi`). Unknown tags get the default glyph.
pub fn glyph_for(tag: &str) -> &'static str {
    let tag = tag.trim().to_ascii_lowercase();
    let primary = tag.split(['-', '_']).next().unwrap_or_default();
    match primary {
        "english" | "en" => ENGLISH_GLYPH,
        "hindi" | "hi" => HINDI_GLYPH,
        _ => DEFAULT_GLYPH,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_tags_map_to_locale_glyphs() {
        assert_eq!(glyph_for("english"), ENGLISH_GLYPH);
        assert_eq!(glyph_for("en-US"), ENGLISH_GLYPH);
        assert_eq!(glyph_for("Hindi"), HINDI_GLYPH);
        assert_eq!(glyph_for("hi_IN"), HINDI_GLYPH);
    }

    #[test]
    fn unknown_tags_fall_back() {
        assert_eq!(glyph_for("fr"), DEFAULT_GLYPH);
        assert_eq!(glyph_for(""), DEFAULT_GLYPH);
    }
}
