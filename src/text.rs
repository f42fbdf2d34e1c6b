use chrono::{DateTime, SecondsFormat, Utc};
use chrono_tz::Tz;

/// Keep only emoji/pictograph (U+1F300..U+1FAFF) and dingbat (U+2700..U+27BF) characters.
pub fn extract_emojis(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, '\u{1F300}'..='\u{1FAFF}' | '\u{2700}'..='\u{27BF}'))
        .collect()
}

/// Strip NUL characters and normalize CRLF line endings to LF.
///
/// Runs of carriage returns directly before a line feed collapse with it, so the
/// output never contains `\r\n` and sanitizing twice is a no-op.
pub fn sanitize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\0' => {}
            '\n' => {
                while out.ends_with('\r') {
                    out.pop();
                }
                out.push('\n');
            }
            _ => out.push(c),
        }
    }
    out
}

/// Current wall-clock time in `tz`, formatted for use in file names.
pub fn timestamp_now(tz: Tz) -> String {
    Utc::now().with_timezone(&tz).format("%Y-%m-%d_%H-%M").to_string()
}

/// Render an instant as ISO-8601 in `tz` with second precision, e.g. `2024-01-02T09:00:00+07:00`.
pub fn format_timestamp(at: DateTime<Utc>, tz: Tz) -> String {
    at.with_timezone(&tz)
        .to_rfc3339_opts(SecondsFormat::Secs, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extract_emojis_keeps_order() {
        assert_eq!(extract_emojis("good 👍 signal 📶 ok ✅ done"), "👍📶✅");
    }

    #[test]
    fn test_extract_emojis_drops_everything_else() {
        assert_eq!(extract_emojis("plain text, 123 ©®"), "");
        assert_eq!(extract_emojis(""), "");
    }

    #[test]
    fn test_extract_emojis_range_edges() {
        let input = "\u{1F2FF}\u{1F300}\u{1FAFF}\u{1FB00}\u{26FF}\u{2700}\u{27BF}\u{27C0}";
        assert_eq!(extract_emojis(input), "\u{1F300}\u{1FAFF}\u{2700}\u{27BF}");
    }

    #[test]
    fn test_sanitize_removes_nul_and_crlf() {
        let cleaned = sanitize("a\0b\r\nc\rd\n");
        assert_eq!(cleaned, "ab\nc\rd\n");
        assert!(!cleaned.contains('\0'));
        assert!(!cleaned.contains("\r\n"));
    }

    #[test]
    fn test_sanitize_nul_between_cr_and_lf() {
        // Removing the NUL first exposes a CRLF pair, which must also go.
        assert_eq!(sanitize("x\r\0\ny"), "x\ny");
    }

    #[test]
    fn test_sanitize_collapses_cr_runs() {
        assert_eq!(sanitize("a\r\r\nb"), "a\nb");
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        for input in ["", "plain", "a\r\n\r\nb", "\0\0\r\n", "\r\r\n\n", "x\r\0\ny"] {
            let once = sanitize(input);
            assert_eq!(sanitize(&once), once, "input {:?}", input);
        }
    }

    #[test]
    fn test_timestamp_now_shape() {
        let stamp = timestamp_now(chrono_tz::Asia::Jakarta);
        assert_eq!(stamp.len(), "2024-01-01_10-00".len());
        assert_eq!(&stamp[4..5], "-");
        assert_eq!(&stamp[10..11], "_");
        assert_eq!(&stamp[13..14], "-");
    }

    #[test]
    fn test_format_timestamp_converts_zone() {
        let at = Utc.with_ymd_and_hms(2024, 1, 2, 2, 0, 0).unwrap();
        assert_eq!(
            format_timestamp(at, chrono_tz::Asia::Jakarta),
            "2024-01-02T09:00:00+07:00"
        );
        assert_eq!(format_timestamp(at, chrono_tz::UTC), "2024-01-02T02:00:00+00:00");
    }
}
