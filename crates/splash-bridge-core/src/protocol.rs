//! Line protocol spoken with the display process.
//!
//! Every logical message travels as exactly one `\n`-terminated UTF-8 line. A message that
//! itself spans several lines is sent with each embedded newline replaced by
//! [`NEWLINE_PLACEHOLDER`]; the receiving side reverses the substitution.

/// Stands in for an embedded newline on the wire
pub const NEWLINE_PLACEHOLDER: char = '\t';

/// Terminates every message on the wire
pub const LINE_DELIMITER: &[u8] = b"\n";

/// Prefix for log lines that originate from the display process
pub const GUI_TAG: &str = "[GUI] ";

/// Turn arbitrary text into a single wire-safe line.
pub fn encode_line(text: &str) -> String {
    text.chars()
        .filter(|c| *c != '\r')
        .map(|c| if c == '\n' { NEWLINE_PLACEHOLDER } else { c })
        .collect()
}

/// Recover the logical message from one received line.
pub fn decode_line(line: &str) -> String {
    let decoded: String = line
        .chars()
        .filter(|c| *c != '\r')
        .map(|c| {
            if c == NEWLINE_PLACEHOLDER {
                '\n'
            } else {
                c
            }
        })
        .collect();
    decoded.trim_end_matches('\n').to_string()
}

/// A queued status line. Never contains the line delimiter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(encode_line(text.as_ref()))
    }

    /// The encoded form written to the wire (without the delimiter)
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The text as the receiver will see it after decoding
    pub fn decoded(&self) -> String {
        decode_line(&self.0)
    }
}

impl From<&str> for StatusMessage {
    fn from(text: &str) -> Self {
        Self::new(text)
    }
}

impl From<String> for StatusMessage {
    fn from(text: String) -> Self {
        Self::new(text)
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_newlines_round_trip() {
        let message = StatusMessage::new("line1\nline2");
        assert_eq!(message.as_str(), "line1\tline2");
        assert!(!message.as_str().contains('\n'));
        assert_eq!(decode_line(message.as_str()), "line1\nline2");
    }

    #[test]
    fn test_crlf_is_normalised() {
        let message = StatusMessage::new("Loading plugins\r\nDone\r\n");
        assert_eq!(message.as_str(), "Loading plugins\tDone\t");
        assert_eq!(message.decoded(), "Loading plugins\nDone");
    }

    #[test]
    fn test_decode_strips_trailing_terminators() {
        assert_eq!(decode_line("Exception: boom\t  at Foo()\t\t"), "Exception: boom\n  at Foo()");
        assert_eq!(decode_line("plain\r"), "plain");
        assert_eq!(decode_line(""), "");
    }

    #[test]
    fn test_plain_text_untouched() {
        let message: StatusMessage = "Patching Assembly-CSharp.dll".into();
        assert_eq!(message.to_string(), "Patching Assembly-CSharp.dll");
        assert_eq!(message.decoded(), "Patching Assembly-CSharp.dll");
    }
}
