//! Filename-derived hints for the metadata workflow.
//!
//! Pure functions, no I/O.  The extracted title is only a pre-filled
//! suggestion for the search field — never authoritative.

use std::sync::OnceLock;

use regex::Regex;

use crate::metadata::VideoKind;

fn trailing_suffix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Known suffix segments, stripped repeatedly from the end:
        // disc numbers, media markers, season markers, SxxEyy tags, years.
        Regex::new(r"(?i)[_\-\s](disc[_\-\s]?\d+|dvd|bluray|bd|season[_\-\s]?\d+|s\d{2}(e\d{2})?|\d{4})$")
            .expect("suffix pattern compiles")
    })
}

fn series_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(season[_\s]*\d+|s\d{2}e\d{2})").expect("series pattern compiles")
    })
}

/// Human title suggestion from an ISO path or filename.
///
/// Strips the directory and extension, peels known disc/season/year
/// suffixes off the end until none remain, then space-separates and
/// title-cases the rest.
pub fn extract_display_title(filename: &str) -> String {
    let base = filename.rsplit('/').next().unwrap_or(filename);
    let mut stem = base.strip_suffix(".iso").unwrap_or(base).to_string();

    loop {
        let stripped = trailing_suffix_re().replace(&stem, "").into_owned();
        if stripped == stem {
            break;
        }
        stem = stripped;
    }

    stem.split(|c| c == '_' || c == '-' || c == ' ')
        .filter(|w| !w.is_empty())
        .map(title_case_word)
        .collect::<Vec<_>>()
        .join(" ")
}

fn title_case_word(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Movie vs. series guess from the filename.  Feeds the default value of
/// the modal's type selector only; the user may override it.
pub fn classify_video_kind(filename: &str) -> VideoKind {
    if series_re().is_match(filename) {
        VideoKind::Series
    } else {
        VideoKind::Movie
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_season_disc_and_year() {
        assert_eq!(
            extract_display_title("Supernatural_Season_10_Disc_2_2015.iso"),
            "Supernatural"
        );
    }

    #[test]
    fn strips_path_and_media_markers() {
        assert_eq!(
            extract_display_title("/archive/dvd/the_big_lebowski_dvd.iso"),
            "The Big Lebowski"
        );
        // Trailing year segments go too, even when they are part of the title.
        assert_eq!(extract_display_title("blade_runner_2049_bd.iso"), "Blade Runner");
        assert_eq!(extract_display_title("heat_1995.iso"), "Heat");
    }

    #[test]
    fn title_cases_separator_soup() {
        assert_eq!(extract_display_title("spirited-away.iso"), "Spirited Away");
        assert_eq!(extract_display_title("foo__bar.iso"), "Foo Bar");
    }

    #[test]
    fn bare_name_survives() {
        assert_eq!(extract_display_title("Alien.iso"), "Alien");
        assert_eq!(extract_display_title(""), "");
    }

    #[test]
    fn season_pattern_means_series() {
        assert_eq!(classify_video_kind("show_s01e02.iso"), VideoKind::Series);
        assert_eq!(classify_video_kind("show_season_3_disc_1.iso"), VideoKind::Series);
        assert_eq!(classify_video_kind("movie_2020.iso"), VideoKind::Movie);
    }
}
