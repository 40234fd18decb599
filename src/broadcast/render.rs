//! Push-protocol rendering
//!
//! Turns a `Message` into the HTML line shown in the chat log and into the
//! server-sent event frame existing clients expect:
//!
//! ```text
//! event: newMessage
//! data: <rendered line>
//!
//! ```

use crate::store::Message;

/// SSE event name listened for by the browser client
pub const EVENT_NAME: &str = "newMessage";

/// Comment frame sent on idle streams; ignored by `EventSource`
pub const KEEP_ALIVE_FRAME: &str = ": keep-alive\n\n";

/// Timestamp layout inside the rendered line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Escape text for inclusion in HTML element content or attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&#34;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Render one chat line
pub fn render_line(message: &Message) -> String {
    format!(
        r#"<div class="message"><span class="time">[{}]</span> <span class="prompt">{}:$</span> {}</div>"#,
        message.created_at.format(TIMESTAMP_FORMAT),
        escape_html(&message.username),
        escape_html(&message.content),
    )
}

/// Render the full SSE frame for a message, blank-line terminated
///
/// A rendered line containing line breaks (`\r\n`, `\r` or `\n`, all of
/// which end an SSE line) becomes several `data:` lines, which the client
/// rejoins with `\n`.
pub fn event_frame(message: &Message) -> String {
    let line = render_line(message).replace("\r\n", "\n");
    let mut frame = format!("event: {}\n", EVENT_NAME);
    for part in line.split(['\r', '\n']) {
        frame.push_str("data: ");
        frame.push_str(part);
        frame.push('\n');
    }
    frame.push('\n');
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn message(username: &str, content: &str) -> Message {
        let created_at = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();
        Message::new(1, username, content, created_at)
    }

    #[test]
    fn test_event_frame_exact_bytes() {
        let frame = event_frame(&message("alice", "hello"));
        assert_eq!(
            frame,
            "event: newMessage\n\
             data: <div class=\"message\"><span class=\"time\">[2024-03-09T14:05:07]</span> \
             <span class=\"prompt\">alice:$</span> hello</div>\n\n"
        );
    }

    #[test]
    fn test_content_is_escaped() {
        let line = render_line(&message("<b>eve</b>", "<script>alert('x') & \"y\"</script>"));
        assert!(line.contains("&lt;b&gt;eve&lt;/b&gt;:$"));
        assert!(line.contains("&lt;script&gt;alert(&#39;x&#39;) &amp; &#34;y&#34;&lt;/script&gt;"));
        assert!(!line.contains("<script>"));
    }

    #[test]
    fn test_multiline_content_splits_data_lines() {
        let frame = event_frame(&message("bob", "one\r\ntwo"));
        let lines: Vec<_> = frame.lines().collect();

        assert_eq!(lines[0], "event: newMessage");
        assert!(lines[1].starts_with("data: <div"));
        assert!(lines[1].ends_with("one"));
        assert_eq!(lines[2], "data: two</div>");
        assert!(frame.ends_with("\n\n"));
    }

    #[test]
    fn test_bare_carriage_return_cannot_add_fields() {
        let frame = event_frame(&message("mallory", "hi\revent: hijack\rretry: 999999999"));
        let body = frame.strip_suffix("\n\n").unwrap();

        // Split the way an EventSource parser does: CR, LF and CRLF all end a line
        let lines: Vec<_> = body
            .replace("\r\n", "\n")
            .split(['\r', '\n'])
            .map(str::to_string)
            .collect();

        assert_eq!(lines[0], "event: newMessage");
        assert_eq!(lines.len(), 4);
        for line in &lines[1..] {
            assert!(line.starts_with("data: "), "unexpected field line {:?}", line);
        }
        assert_eq!(lines[2], "data: event: hijack");
        assert!(!frame.contains('\r'));
    }

    #[test]
    fn test_keep_alive_is_comment() {
        assert!(KEEP_ALIVE_FRAME.starts_with(':'));
        assert!(KEEP_ALIVE_FRAME.ends_with("\n\n"));
    }
}
