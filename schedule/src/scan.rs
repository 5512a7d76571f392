use quick_xml::Reader;
use quick_xml::events::{BytesStart, BytesText, Event};

/// Forward-only cursor over the markup tokens of one schedule page.
/// Anything unreadable, end of stream or malformed syntax alike, degrades
/// to "not found" and the caller stops with whatever it has.
pub struct TagScanner<'a> {
    reader: Reader<&'a [u8]>,
    depth: i32,
}

impl<'a> TagScanner<'a> {
    pub fn new(page: &'a str) -> Self {
        let mut reader = Reader::from_str(page);
        let config = reader.config_mut();
        config.trim_text(true);
        // Real pages drop and mismatch closing tags; take them as they come.
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        TagScanner { reader, depth: 0 }
    }

    /// Tag nesting depth seen so far. Sloppy pages can drive it negative;
    /// only relative movement means anything.
    pub fn depth(&self) -> i32 {
        self.depth
    }

    /// Advance to the next opening tag whose first attribute value equals
    /// one of `markers`, returning the matched value. `None` once the stream
    /// is exhausted.
    pub fn seek_tag(&mut self, markers: &[&str]) -> Option<String> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.depth += 1;
                    if let Some(value) = first_attr_value(&e)
                        && markers.iter().any(|m| *m == value)
                    {
                        return Some(value);
                    }
                }
                Ok(Event::End(_)) => self.depth -= 1,
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Advance to the next text token. Whitespace-only runs between tags do
    /// not count.
    pub fn next_text(&mut self) -> Option<String> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Text(t)) => return Some(decode_text(&t)),
                Ok(Event::Start(_)) => self.depth += 1,
                Ok(Event::End(_)) => self.depth -= 1,
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }

    /// Advance to the next `<b>` tag and return the text after it. Finished
    /// games print their scores bold; this is how scores are read.
    pub fn seek_bold_text(&mut self) -> Option<String> {
        loop {
            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.depth += 1;
                    if e.local_name().as_ref().eq_ignore_ascii_case(b"b") {
                        return self.next_text();
                    }
                }
                Ok(Event::End(_)) => self.depth -= 1,
                Ok(Event::Eof) | Err(_) => return None,
                Ok(_) => {}
            }
        }
    }
}

fn first_attr_value(e: &BytesStart) -> Option<String> {
    match e.html_attributes().next()? {
        Ok(attr) => attr.unescape_value().ok().map(|v| v.into_owned()),
        Err(_) => None,
    }
}

fn decode_text(t: &BytesText) -> String {
    match t.unescape() {
        Ok(s) => s.into_owned(),
        // Bare HTML entities (&nbsp;) are not XML; keep the text readable.
        Err(_) => String::from_utf8_lossy(t.as_ref()).replace("&nbsp;", " "),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
        <table>
          <tr class="divider"><td>Sunday, September 10, 2017</td></tr>
          <tr class="left">
            <td class="right">FINAL</td>
            <td class="left">Baltimore</td>
            <td><b>20</b></td>
          </tr>
        </table>
    "#;

    #[test]
    fn seek_finds_tag_by_first_attribute_value() {
        let mut scanner = TagScanner::new(PAGE);
        assert_eq!(scanner.seek_tag(&["divider"]).as_deref(), Some("divider"));
    }

    #[test]
    fn seek_reports_which_marker_matched() {
        let mut scanner = TagScanner::new(PAGE);
        assert_eq!(scanner.seek_tag(&["divider", "left"]).as_deref(), Some("divider"));
        assert_eq!(scanner.seek_tag(&["divider", "left"]).as_deref(), Some("left"));
        assert_eq!(scanner.seek_tag(&["right", "center"]).as_deref(), Some("right"));
    }

    #[test]
    fn missing_marker_reads_as_exhausted() {
        let mut scanner = TagScanner::new(PAGE);
        assert_eq!(scanner.seek_tag(&["nothing-here"]), None);
        // Exhaustion is sticky enough: further seeks find nothing either.
        assert_eq!(scanner.seek_tag(&["divider"]), None);
    }

    #[test]
    fn next_text_skips_whitespace_and_tags() {
        let mut scanner = TagScanner::new(PAGE);
        scanner.seek_tag(&["divider"]);
        assert_eq!(scanner.next_text().as_deref(), Some("Sunday, September 10, 2017"));
    }

    #[test]
    fn bold_text_is_found_past_other_cells() {
        let mut scanner = TagScanner::new(PAGE);
        scanner.seek_tag(&["right"]);
        assert_eq!(scanner.seek_bold_text().as_deref(), Some("20"));
    }

    #[test]
    fn bold_missing_reads_as_exhausted() {
        let mut scanner = TagScanner::new("<tr class=\"left\"><td>no bold here</td></tr>");
        assert_eq!(scanner.seek_bold_text(), None);
    }

    #[test]
    fn depth_tracks_nesting() {
        let mut scanner = TagScanner::new("<table><tr class=\"left\"><td>x</td></tr></table>");
        scanner.seek_tag(&["left"]); // inside <table><tr>
        assert_eq!(scanner.depth(), 2);
        scanner.next_text(); // inside <td>
        assert_eq!(scanner.depth(), 3);
    }

    #[test]
    fn unquoted_attribute_values_still_match() {
        let mut scanner = TagScanner::new("<tr class=divider><td>Sun 9/10</td></tr>");
        assert_eq!(scanner.seek_tag(&["divider"]).as_deref(), Some("divider"));
        assert_eq!(scanner.next_text().as_deref(), Some("Sun 9/10"));
    }

    #[test]
    fn entities_resolve_in_text() {
        let mut scanner = TagScanner::new("<td class=\"left\">Jones &amp; Sons</td>");
        scanner.seek_tag(&["left"]);
        assert_eq!(scanner.next_text().as_deref(), Some("Jones & Sons"));
    }

    #[test]
    fn only_the_first_attribute_is_consulted() {
        let mut scanner = TagScanner::new("<td align=\"top\" class=\"left\">x</td>");
        assert_eq!(scanner.seek_tag(&["left"]), None);
    }

    #[test]
    fn uppercase_bold_tag_matches() {
        let mut scanner = TagScanner::new("<td><B>31</B></td>");
        assert_eq!(scanner.seek_bold_text().as_deref(), Some("31"));
    }
}
