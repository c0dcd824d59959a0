//! Line-oriented screen buffer with scrollback.
//!
//! Cell attributes and colors are not tracked; the screen only keeps the
//! characters needed for text capture and thumbnails.

use std::collections::VecDeque;

use termdeck_core::Dimensions;

/// Cursor position (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cursor {
    /// Row on the visible screen
    pub row: u16,
    /// Column
    pub col: u16,
}

/// Visible rows plus a bounded scrollback.
#[derive(Debug)]
pub struct Screen {
    /// Visible rows, each exactly `dimensions.cols` wide
    rows: Vec<Vec<char>>,
    dimensions: Dimensions,
    cursor: Cursor,
    saved_cursor: Option<Cursor>,
    /// Lines that scrolled off the top, oldest first, trailing blanks trimmed
    scrollback: VecDeque<String>,
    scrollback_limit: usize,
}

impl Screen {
    /// Create a blank screen.
    pub fn new(dimensions: Dimensions, scrollback_limit: usize) -> Self {
        let dimensions = Dimensions::new(dimensions.rows.max(1), dimensions.cols.max(1));
        Self {
            rows: vec![blank_row(dimensions.cols); dimensions.rows as usize],
            dimensions,
            cursor: Cursor::default(),
            saved_cursor: None,
            scrollback: VecDeque::new(),
            scrollback_limit,
        }
    }

    /// Get dimensions.
    pub fn dimensions(&self) -> Dimensions {
        self.dimensions
    }

    /// Get cursor.
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// Lines held in scrollback.
    pub fn scrollback_len(&self) -> usize {
        self.scrollback.len()
    }

    /// Write a character at the cursor and advance, wrapping at the margin.
    pub fn print(&mut self, c: char) {
        if self.cursor.col >= self.dimensions.cols {
            self.cursor.col = 0;
            self.line_feed();
        }
        let (row, col) = (self.cursor.row as usize, self.cursor.col as usize);
        self.rows[row][col] = c;
        self.cursor.col += 1;
    }

    /// Move down one row, scrolling at the bottom.
    pub fn line_feed(&mut self) {
        if self.cursor.row + 1 >= self.dimensions.rows {
            self.scroll_up();
        } else {
            self.cursor.row += 1;
        }
    }

    /// Move to column 0.
    pub fn carriage_return(&mut self) {
        self.cursor.col = 0;
    }

    /// Move back one column.
    pub fn backspace(&mut self) {
        self.cursor.col = self.cursor.col.min(self.last_col()).saturating_sub(1);
    }

    /// Advance to the next tab stop (every 8 columns).
    pub fn tab(&mut self) {
        let next = (self.cursor.col / 8 + 1) * 8;
        self.cursor.col = next.min(self.last_col());
    }

    /// Move the cursor, clamped to the screen.
    pub fn move_to(&mut self, row: u16, col: u16) {
        self.cursor.row = row.min(self.dimensions.rows - 1);
        self.cursor.col = col.min(self.last_col());
    }

    /// Move the cursor by a relative offset, clamped to the screen.
    pub fn move_by(&mut self, rows: i32, cols: i32) {
        let row = (i32::from(self.cursor.row) + rows).max(0);
        let col = (i32::from(self.cursor.col.min(self.last_col())) + cols).max(0);
        self.move_to(
            row.min(i32::from(u16::MAX)) as u16,
            col.min(i32::from(u16::MAX)) as u16,
        );
    }

    /// Save the cursor position.
    pub fn save_cursor(&mut self) {
        self.saved_cursor = Some(self.cursor);
    }

    /// Restore the saved cursor position.
    pub fn restore_cursor(&mut self) {
        if let Some(saved) = self.saved_cursor.take() {
            self.move_to(saved.row, saved.col);
        }
    }

    /// Erase in display: 0 = cursor to end, 1 = start to cursor, 2 = all,
    /// 3 = all plus scrollback.
    pub fn erase_display(&mut self, mode: u16) {
        let row = self.cursor.row as usize;
        match mode {
            0 => {
                self.erase_line(0);
                for r in &mut self.rows[row + 1..] {
                    r.fill(' ');
                }
            }
            1 => {
                self.erase_line(1);
                for r in &mut self.rows[..row] {
                    r.fill(' ');
                }
            }
            2 | 3 => {
                for r in &mut self.rows {
                    r.fill(' ');
                }
                if mode == 3 {
                    self.scrollback.clear();
                }
            }
            _ => {}
        }
    }

    /// Erase in line: 0 = cursor to end, 1 = start to cursor, 2 = whole line.
    pub fn erase_line(&mut self, mode: u16) {
        let col = (self.cursor.col as usize).min(self.dimensions.cols as usize);
        let line = &mut self.rows[self.cursor.row as usize];
        match mode {
            0 => line[col..].fill(' '),
            1 => {
                let end = (col + 1).min(line.len());
                line[..end].fill(' ');
            }
            2 => line.fill(' '),
            _ => {}
        }
    }

    /// Resize, keeping the cursor row on screen by pushing top rows into
    /// scrollback when the screen gets shorter.
    pub fn resize(&mut self, dimensions: Dimensions) {
        let dimensions = Dimensions::new(dimensions.rows.max(1), dimensions.cols.max(1));

        for row in &mut self.rows {
            row.resize(dimensions.cols as usize, ' ');
        }

        let new_rows = dimensions.rows as usize;
        while self.rows.len() > new_rows {
            if (self.cursor.row as usize) < self.rows.len() - 1 && self.row_is_blank(self.rows.len() - 1)
            {
                self.rows.pop();
            } else {
                let top = self.rows.remove(0);
                self.push_scrollback(top);
                self.cursor.row = self.cursor.row.saturating_sub(1);
            }
        }
        while self.rows.len() < new_rows {
            self.rows.push(blank_row(dimensions.cols));
        }

        self.dimensions = dimensions;
        self.move_to(self.cursor.row, self.cursor.col);
    }

    /// Text of a visible row with trailing whitespace trimmed.
    pub fn row_text(&self, row: usize) -> Option<String> {
        self.rows.get(row).map(|r| trimmed(r))
    }

    /// Visible rows up to and including the last non-blank one.
    pub fn used_rows(&self) -> usize {
        (0..self.rows.len())
            .rev()
            .find(|&r| !self.row_is_blank(r))
            .map_or(0, |r| r + 1)
    }

    /// Total logical lines: scrollback plus used screen rows.
    pub fn line_count(&self) -> usize {
        self.scrollback.len() + self.used_rows()
    }

    /// Index of the first visible row in logical line numbering.
    pub fn viewport_start(&self) -> usize {
        self.scrollback.len()
    }

    /// Logical lines in `[from, to)`, clamped to what exists.
    pub fn lines(&self, from: usize, to: usize) -> Vec<String> {
        let end = to.min(self.line_count());
        (from.min(end)..end)
            .map(|idx| {
                if idx < self.scrollback.len() {
                    self.scrollback[idx].clone()
                } else {
                    trimmed(&self.rows[idx - self.scrollback.len()])
                }
            })
            .collect()
    }

    /// Visible screen as plain text, one line per used row.
    pub fn to_plain_text(&self) -> String {
        let start = self.viewport_start();
        self.lines(start, self.line_count()).join("\n")
    }

    fn scroll_up(&mut self) {
        let top = self.rows.remove(0);
        self.push_scrollback(top);
        self.rows.push(blank_row(self.dimensions.cols));
    }

    fn push_scrollback(&mut self, row: Vec<char>) {
        if self.scrollback_limit == 0 {
            return;
        }
        if self.scrollback.len() == self.scrollback_limit {
            self.scrollback.pop_front();
        }
        self.scrollback.push_back(trimmed(&row));
    }

    fn row_is_blank(&self, row: usize) -> bool {
        self.rows[row].iter().all(|c| c.is_whitespace())
    }

    fn last_col(&self) -> u16 {
        self.dimensions.cols - 1
    }
}

fn blank_row(cols: u16) -> Vec<char> {
    vec![' '; cols as usize]
}

fn trimmed(row: &[char]) -> String {
    let text: String = row.iter().collect();
    text.trim_end().to_string()
}
