//! ANSI/VT escape sequence parser using the VTE crate.

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;
use vte::{Params, Perform};

use crate::screen::Screen;

lazy_static! {
    /// OSC 7 payload: `file://host/path` (also kitty's `kitty-shell-cwd://`)
    static ref OSC7_URL: Regex = Regex::new(r"^(?:file|kitty-shell-cwd)://[^/]*(/.*)$").unwrap();
}

/// ANSI parser feeding a [`Screen`].
///
/// The VTE state machine persists across calls, so escape sequences split
/// between two reads are still recognized.
pub struct Parser {
    vte: vte::Parser,
    performer: ScreenPerformer,
}

struct ScreenPerformer {
    screen: Screen,
    /// Working directory reported since the last take
    reported_directory: Option<String>,
}

impl Parser {
    /// Create a new parser over the given screen.
    pub fn new(screen: Screen) -> Self {
        Self {
            vte: vte::Parser::new(),
            performer: ScreenPerformer {
                screen,
                reported_directory: None,
            },
        }
    }

    /// Get a reference to the screen.
    pub fn screen(&self) -> &Screen {
        &self.performer.screen
    }

    /// Get a mutable reference to the screen.
    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.performer.screen
    }

    /// Process bytes through the VTE parser.
    pub fn process(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.vte.advance(&mut self.performer, *byte);
        }
    }

    /// Take the most recent working directory reported via OSC 7.
    pub fn take_reported_directory(&mut self) -> Option<String> {
        self.performer.reported_directory.take()
    }
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("screen", &self.performer.screen)
            .finish_non_exhaustive()
    }
}

/// First CSI parameter, with 0 and missing both meaning `default`.
fn first_param(params: &Params, default: u16) -> u16 {
    match params.iter().next().map(|p| p[0]) {
        None | Some(0) => default,
        Some(n) => n,
    }
}

/// Decode a percent-encoded path.
fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    let hex = |b: u8| (b as char).to_digit(16).map(|d| d as u8);
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex(bytes[i + 1]), hex(bytes[i + 2])) {
                out.push(hi << 4 | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Extract the directory from an OSC 7 URL.
pub fn parse_osc7(url: &str) -> Option<String> {
    OSC7_URL
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|path| percent_decode(path.as_str()))
}

impl Perform for ScreenPerformer {
    fn print(&mut self, c: char) {
        self.screen.print(c);
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            // Backspace (BS)
            0x08 => self.screen.backspace(),
            // Horizontal Tab (HT)
            0x09 => self.screen.tab(),
            // Line Feed, Vertical Tab, Form Feed
            0x0A..=0x0C => self.screen.line_feed(),
            // Carriage Return (CR)
            0x0D => self.screen.carriage_return(),
            _ => {}
        }
    }

    fn osc_dispatch(&mut self, params: &[&[u8]], _bell_terminated: bool) {
        if params.first() != Some(&&b"7"[..]) || params.len() < 2 {
            return;
        }

        // The URL itself may contain ';', which VTE splits on
        let url = params[1..]
            .iter()
            .map(|p| String::from_utf8_lossy(p))
            .collect::<Vec<_>>()
            .join(";");

        match parse_osc7(&url) {
            Some(dir) => {
                debug!("OSC 7 working directory: {}", dir);
                self.reported_directory = Some(dir);
            }
            None => debug!("Ignoring malformed OSC 7 payload: {}", url),
        }
    }

    fn csi_dispatch(&mut self, params: &Params, intermediates: &[u8], _ignore: bool, c: char) {
        // Private modes (e.g. `?25h`) do not move content
        if !intermediates.is_empty() {
            return;
        }

        match c {
            // Cursor Up / Down / Forward / Backward
            'A' => self.screen.move_by(-i32::from(first_param(params, 1)), 0),
            'B' => self.screen.move_by(i32::from(first_param(params, 1)), 0),
            'C' => self.screen.move_by(0, i32::from(first_param(params, 1))),
            'D' => self.screen.move_by(0, -i32::from(first_param(params, 1))),

            // Cursor Next Line / Previous Line
            'E' => {
                self.screen.move_by(i32::from(first_param(params, 1)), 0);
                self.screen.carriage_return();
            }
            'F' => {
                self.screen.move_by(-i32::from(first_param(params, 1)), 0);
                self.screen.carriage_return();
            }

            // Cursor Horizontal Absolute
            'G' => {
                let row = self.screen.cursor().row;
                self.screen.move_to(row, first_param(params, 1) - 1);
            }

            // Vertical Position Absolute
            'd' => {
                let col = self.screen.cursor().col;
                self.screen.move_to(first_param(params, 1) - 1, col);
            }

            // Cursor Position (CUP / HVP)
            'H' | 'f' => {
                let mut iter = params.iter();
                let row = iter.next().map_or(1, |p| p[0].max(1)) - 1;
                let col = iter.next().map_or(1, |p| p[0].max(1)) - 1;
                self.screen.move_to(row, col);
            }

            // Erase in Display / Erase in Line
            'J' => self.screen.erase_display(params.iter().next().map_or(0, |p| p[0])),
            'K' => self.screen.erase_line(params.iter().next().map_or(0, |p| p[0])),

            // Save / Restore cursor
            's' => self.screen.save_cursor(),
            'u' => self.screen.restore_cursor(),

            // SGR and everything else carry no text
            _ => {}
        }
    }

    fn esc_dispatch(&mut self, intermediates: &[u8], _ignore: bool, byte: u8) {
        if !intermediates.is_empty() {
            return;
        }
        match byte {
            b'7' => self.screen.save_cursor(),
            b'8' => self.screen.restore_cursor(),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termdeck_core::Dimensions;

    fn parser(rows: u16, cols: u16) -> Parser {
        Parser::new(Screen::new(Dimensions::new(rows, cols), 1000))
    }

    #[test]
    fn test_plain_text() {
        let mut p = parser(5, 20);
        p.process(b"hello\r\nworld");
        assert_eq!(p.screen().to_plain_text(), "hello\nworld");
    }

    #[test]
    fn test_sgr_is_ignored() {
        let mut p = parser(5, 20);
        p.process(b"\x1b[1;31mred\x1b[0m text");
        assert_eq!(p.screen().to_plain_text(), "red text");
    }

    #[test]
    fn test_cursor_position_and_erase() {
        let mut p = parser(5, 20);
        p.process(b"first\r\nsecond\x1b[1;1H\x1b[2K");
        assert_eq!(p.screen().lines(0, 10), vec!["", "second"]);

        p.process(b"\x1b[2J");
        assert_eq!(p.screen().line_count(), 0);
    }

    #[test]
    fn test_clear_scrollback() {
        let mut p = parser(2, 20);
        p.process(b"a\r\nb\r\nc\r\nd");
        assert_eq!(p.screen().scrollback_len(), 2);
        p.process(b"\x1b[3J");
        assert_eq!(p.screen().scrollback_len(), 0);
    }

    #[test]
    fn test_split_escape_sequence() {
        let mut p = parser(5, 20);
        p.process(b"abc\x1b[");
        p.process(b"2Dx");
        assert_eq!(p.screen().to_plain_text(), "axc");
    }

    #[test]
    fn test_osc7_bel_terminated() {
        let mut p = parser(5, 20);
        p.process(b"\x1b]7;file://myhost/home/user/src\x07");
        assert_eq!(
            p.take_reported_directory().as_deref(),
            Some("/home/user/src")
        );
        assert_eq!(p.take_reported_directory(), None);
    }

    #[test]
    fn test_osc7_st_terminated_and_percent_encoded() {
        let mut p = parser(5, 20);
        p.process(b"\x1b]7;file:///tmp/my%20dir\x1b\\");
        assert_eq!(p.take_reported_directory().as_deref(), Some("/tmp/my dir"));
    }

    #[test]
    fn test_other_osc_ignored() {
        let mut p = parser(5, 20);
        p.process(b"\x1b]0;window title\x07");
        assert_eq!(p.take_reported_directory(), None);
        assert_eq!(p.screen().line_count(), 0);
    }

    #[test]
    fn test_parse_osc7() {
        assert_eq!(parse_osc7("file://host/a/b").as_deref(), Some("/a/b"));
        assert_eq!(parse_osc7("kitty-shell-cwd://h/x").as_deref(), Some("/x"));
        assert_eq!(parse_osc7("http://host/a"), None);
        assert_eq!(parse_osc7("/just/a/path"), None);
    }

    #[test]
    fn test_percent_decode_edge_cases() {
        assert_eq!(percent_decode("/a%2"), "/a%2");
        assert_eq!(percent_decode("/a%zz"), "/a%zz");
        assert_eq!(percent_decode("/%E2%9C%93"), "/✓");
    }

    #[test]
    fn test_private_mode_ignored() {
        let mut p = parser(5, 20);
        p.process(b"\x1b[?25lvisible\x1b[?25h");
        assert_eq!(p.screen().to_plain_text(), "visible");
    }
}
