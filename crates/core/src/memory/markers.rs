//! Marker glyph preservation
//!
//! Item names carry status glyphs (glamoured, high quality) inside their
//! literal text. Translated names come from the data tables without them, so
//! they are carried over from the text being replaced.

/// Re-attach every glyph of `glyphs` found in `original` to `translated`
///
/// A glyph in the first half of `original` becomes a `"<glyph> "` prefix,
/// otherwise a `" <glyph>"` suffix. Glyphs already present in `translated`
/// are not added twice.
pub fn preserve_markers(original: &str, translated: &str, glyphs: &[char]) -> String {
    let translated = translated.trim();
    let total = original.chars().count();

    let mut prefix = String::new();
    let mut suffix = String::new();

    for &glyph in glyphs {
        let Some(position) = original.chars().position(|c| c == glyph) else {
            continue;
        };
        if translated.contains(glyph) {
            continue;
        }

        if position * 2 < total {
            prefix.push(glyph);
            prefix.push(' ');
        } else {
            suffix.push(' ');
            suffix.push(glyph);
        }
    }

    format!("{prefix}{translated}{suffix}")
}
