use regex::Regex;

/// Path separator convention used in SteamCMD's printed paths.
///
/// SteamCMD reports download locations using the path style of the machine it
/// runs on, which is not necessarily the style of the machine parsing the
/// output (e.g. logs captured on Windows, processed elsewhere). The variant is
/// selected at runtime; [`PathStyle::host_default`] picks the convention of
/// the current host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathStyle {
    Posix,
    Windows,
}

impl PathStyle {
    /// The path style of the host this process runs on.
    pub fn host_default() -> Self {
        if cfg!(windows) {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }

    pub fn separator(self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    /// Join a child segment onto a base path using this style's separator.
    pub fn join(self, base: &str, segment: &str) -> String {
        let sep = self.separator();
        format!("{}{}{}", base.trim_end_matches(sep), sep, segment)
    }
}

/// A single successful workshop item download reported by SteamCMD.
///
/// Ephemeral: produced from one matched output line, consumed by the
/// relocation step, then discarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadEvent {
    /// Steam app the item belongs to (second-to-last path segment).
    pub app_id: String,
    /// Workshop item id (last path segment).
    pub mod_id: String,
    /// Content directory exactly as printed by SteamCMD.
    pub path: String,
    /// Reported download size.
    pub bytes: u64,
}

/// Classifies single lines of SteamCMD output.
///
/// The only line shape that carries a control signal is the download success
/// report:
///
/// ```text
/// Success. Downloaded item 2169435993 to "/home/user/steamcmd/steamapps/workshop/content/108600/2169435993" (31729 bytes)
/// ```
///
/// The quoted path always ends in `content/<appID>/<modID>`, so the last two
/// segments identify the download. Everything else SteamCMD prints (progress,
/// login chatter, warnings) yields no event.
///
/// The classifier is stateless apart from its compiled pattern and is safe to
/// share across tasks.
#[derive(Debug, Clone)]
pub struct LineClassifier {
    pattern: Regex,
    style: PathStyle,
}

impl LineClassifier {
    pub fn new(style: PathStyle) -> Self {
        Self {
            pattern: Regex::new(r#"Downloaded item \d+ to "(.+?)" \((\d+) bytes\)"#)
                .expect("invalid download success pattern"),
            style,
        }
    }

    pub fn style(&self) -> PathStyle {
        self.style
    }

    /// Classify one line of SteamCMD output.
    ///
    /// Returns `Some` for a well-formed success line, `None` for everything
    /// else. If a line somehow contains several success reports, only the
    /// first is used. A line with the download marker but broken path quoting
    /// fails the pattern and yields `None` rather than an error.
    pub fn classify(&self, line: &str) -> Option<DownloadEvent> {
        let caps = self.pattern.captures(line)?;
        let path = caps.get(1)?.as_str();
        let bytes = caps.get(2)?.as_str().parse().ok()?;

        // Last two non-empty segments are <appID>/<modID>.
        let mut segments = path.split(self.style.separator()).rev().filter(|s| !s.is_empty());
        let mod_id = segments.next()?;
        let app_id = segments.next()?;

        Some(DownloadEvent {
            app_id: app_id.to_string(),
            mod_id: mod_id.to_string(),
            path: path.to_string(),
            bytes,
        })
    }
}

impl Default for LineClassifier {
    fn default() -> Self {
        Self::new(PathStyle::host_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_classify_posix_line() {
        let classifier = LineClassifier::new(PathStyle::Posix);
        let event = classifier
            .classify(r#"Success. Downloaded item 2169435993 to "/tmp/steam/content/108600/2169435993" (31729 bytes)"#)
            .unwrap();

        assert_eq!(event.app_id, "108600");
        assert_eq!(event.mod_id, "2169435993");
        assert_eq!(event.path, "/tmp/steam/content/108600/2169435993");
        assert_eq!(event.bytes, 31729);
    }

    #[test]
    fn test_classify_windows_line() {
        let classifier = LineClassifier::new(PathStyle::Windows);
        let event = classifier
            .classify(r#"Success. Downloaded item 2169435993 to "C:\steamcmd\steamapps\workshop\content\108600\2169435993" (31729 bytes)"#)
            .unwrap();

        assert_eq!(event.app_id, "108600");
        assert_eq!(event.mod_id, "2169435993");
    }

    #[test]
    fn test_classify_path_with_spaces() {
        let classifier = LineClassifier::new(PathStyle::Posix);
        let event = classifier
            .classify(r#"Success. Downloaded item 1 to "/Users/some user/Library/Application Support/Steam/steamapps/workshop/content/108600/1" (5 bytes)"#)
            .unwrap();

        assert_eq!(event.app_id, "108600");
        assert_eq!(event.mod_id, "1");
    }

    #[test]
    fn test_wrong_separator_yields_whole_path_segments() {
        // A Windows line parsed with the Posix style has no '/' separators,
        // so the whole path collapses into a single segment and classification
        // fails on the missing second segment.
        let classifier = LineClassifier::new(PathStyle::Posix);
        let event = classifier
            .classify(r#"Downloaded item 7 to "C:\content\108600\7" (1 bytes)"#);
        assert_eq!(event, None);
    }

    #[test]
    fn test_non_matching_lines_yield_nothing() {
        let classifier = LineClassifier::new(PathStyle::Posix);

        assert_eq!(classifier.classify(""), None);
        assert_eq!(classifier.classify("Loading Steam API...OK"), None);
        assert_eq!(classifier.classify(" Update state (0x61) downloading, progress: 42.81"), None);
        assert_eq!(
            classifier.classify("Steam>Logging in user 'bob' to Steam Public...FAILED"),
            None
        );
    }

    #[test]
    fn test_malformed_quoting_yields_nothing() {
        let classifier = LineClassifier::new(PathStyle::Posix);

        // Marker present but the path quoting is broken.
        assert_eq!(
            classifier.classify(r#"Downloaded item 42 to /tmp/content/1/42 (10 bytes)"#),
            None
        );
        assert_eq!(
            classifier.classify(r#"Downloaded item 42 to "/tmp/content/1/42 (10 bytes)"#),
            None
        );
    }

    #[test]
    fn test_first_match_wins() {
        let classifier = LineClassifier::new(PathStyle::Posix);
        let line = r#"Downloaded item 1 to "/a/content/10/1" (5 bytes) Downloaded item 2 to "/a/content/20/2" (6 bytes)"#;

        let event = classifier.classify(line).unwrap();
        assert_eq!(event.app_id, "10");
        assert_eq!(event.mod_id, "1");
    }

    #[test]
    fn test_trailing_separator_ignored() {
        let classifier = LineClassifier::new(PathStyle::Posix);
        let event = classifier
            .classify(r#"Downloaded item 9 to "/tmp/content/108600/9/" (1 bytes)"#)
            .unwrap();

        assert_eq!(event.app_id, "108600");
        assert_eq!(event.mod_id, "9");
    }

    #[test]
    fn test_join_uses_configured_separator() {
        assert_eq!(PathStyle::Posix.join("/tmp/content/1/2", "mods"), "/tmp/content/1/2/mods");
        assert_eq!(
            PathStyle::Windows.join(r"C:\content\1\2", "mods"),
            r"C:\content\1\2\mods"
        );
        assert_eq!(PathStyle::Posix.join("/tmp/content/1/2/", "mods"), "/tmp/content/1/2/mods");
    }

    proptest! {
        #[test]
        fn classify_never_panics(line in ".*") {
            let classifier = LineClassifier::new(PathStyle::Posix);
            let _ = classifier.classify(&line);
        }

        #[test]
        fn progress_lines_never_match(pct in 0u32..=100, sub in 0u32..100) {
            let classifier = LineClassifier::new(PathStyle::Posix);
            let line = format!(" Update state (0x61) downloading, progress: {pct}.{sub:02}");
            prop_assert!(classifier.classify(&line).is_none());
        }
    }
}
