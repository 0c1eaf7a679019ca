//! Elastic tab-stop writer.
//!
//! [`TabWriter`] buffers tab-terminated cells and pads each column to the
//! widest cell in its block before writing to the wrapped writer:
//! - a cell is text terminated by `\t`, the text after the last tab of a
//!   line is a trailing cell that never affects column widths,
//! - a column block is a run of consecutive lines that all have a
//!   terminated cell in that column,
//! - a line with a single cell cannot affect later lines, so it flushes
//!   everything buffered so far straight to the output.
//!
//! Widths are counted in characters; the pad character is always a space.

use std::io::{self, Write};

pub struct TabWriter<W: Write> {
    inner: W,
    min_width: usize,
    padding: usize,
    lines: Vec<Vec<String>>,
    partial: Vec<u8>,
}

impl<W: Write> TabWriter<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            min_width: 0,
            padding: 1,
            lines: Vec::new(),
            partial: Vec::new(),
        }
    }

    pub fn min_width(mut self, min_width: usize) -> Self {
        self.min_width = min_width;
        self
    }

    pub fn padding(mut self, padding: usize) -> Self {
        self.padding = padding;
        self
    }

    #[cfg(test)]
    fn into_inner(mut self) -> io::Result<W> {
        self.flush()?;
        Ok(self.inner)
    }

    fn end_line(&mut self) -> io::Result<()> {
        let line = String::from_utf8_lossy(&self.partial).into_owned();
        self.partial.clear();
        let cells: Vec<String> = line.split('\t').map(str::to_string).collect();
        let single_cell = cells.len() == 1;
        self.lines.push(cells);
        if single_cell {
            self.write_buffered(true)?;
        }
        Ok(())
    }

    fn write_buffered(&mut self, terminated: bool) -> io::Result<()> {
        let lines = std::mem::take(&mut self.lines);
        let mut widths = Vec::new();
        let mut out = Vec::new();
        self.format(&lines, 0, lines.len(), &mut widths, &mut out);
        if !terminated {
            out.pop();
        }
        self.inner.write_all(&out)
    }

    fn format(
        &self,
        lines: &[Vec<String>],
        mut start: usize,
        end: usize,
        widths: &mut Vec<usize>,
        out: &mut Vec<u8>,
    ) {
        let column = widths.len();
        let mut current = start;
        while current < end {
            if column + 1 >= lines[current].len() {
                current += 1;
                continue;
            }

            // `current` opens a block for this column.
            Self::write_lines(&lines[start..current], widths, out);
            start = current;

            let mut width = self.min_width;
            while current < end && column + 1 < lines[current].len() {
                let cell_width = lines[current][column].chars().count() + self.padding;
                width = width.max(cell_width);
                current += 1;
            }

            widths.push(width);
            self.format(lines, start, current, widths, out);
            widths.pop();
            start = current;
        }
        Self::write_lines(&lines[start..end], widths, out);
    }

    fn write_lines(lines: &[Vec<String>], widths: &[usize], out: &mut Vec<u8>) {
        for line in lines {
            for (j, cell) in line.iter().enumerate() {
                out.extend_from_slice(cell.as_bytes());
                if j + 1 < line.len() {
                    if let Some(width) = widths.get(j) {
                        let pad = width.saturating_sub(cell.chars().count());
                        out.extend(std::iter::repeat(b' ').take(pad));
                    }
                }
            }
            out.push(b'\n');
        }
    }
}

impl<W: Write> Write for TabWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        for &byte in buf {
            if byte == b'\n' {
                self.end_line()?;
            } else {
                self.partial.push(byte);
            }
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.partial.is_empty() {
            self.write_buffered(true)?;
        } else {
            let line = String::from_utf8_lossy(&self.partial).into_owned();
            self.partial.clear();
            self.lines
                .push(line.split('\t').map(str::to_string).collect());
            self.write_buffered(false)?;
        }
        self.inner.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(min_width: usize, padding: usize, input: &str) -> String {
        let mut writer = TabWriter::new(Vec::new())
            .min_width(min_width)
            .padding(padding);
        writer.write_all(input.as_bytes()).unwrap();
        String::from_utf8(writer.into_inner().unwrap()).unwrap()
    }

    #[test]
    fn test_columns_pad_to_widest_cell() {
        let out = render(4, 4, "REPOSITORY\tTAG\tSIZE\nalpine\tlatest\t3.0 MiB\n");
        assert_eq!(
            out,
            "REPOSITORY    TAG       SIZE\n\
             alpine        latest    3.0 MiB\n"
        );
    }

    #[test]
    fn test_min_width_applies_to_short_columns() {
        let out = render(8, 1, "a\tb\nc\td\n");
        assert_eq!(out, "a       b\nc       d\n");
    }

    #[test]
    fn test_trailing_cell_does_not_widen_column() {
        let out = render(0, 1, "a\tb\nccc\n");
        assert_eq!(out, "a b\nccc\n");
    }

    #[test]
    fn test_blocks_are_formatted_independently() {
        let out = render(0, 1, "aaaa\tb\nsingle\nc\td\n");
        assert_eq!(out, "aaaa b\nsingle\nc d\n");
    }

    #[test]
    fn test_single_cell_lines_pass_through() {
        let mut writer = TabWriter::new(Vec::new()).min_width(4).padding(4);
        writer.write_all(b"abcdef012345\n").unwrap();
        assert_eq!(writer.inner, b"abcdef012345\n");
    }

    #[test]
    fn test_unterminated_line_written_on_flush() {
        let out = render(0, 2, "x\ty\nlast");
        assert_eq!(out, "x  y\nlast");
    }

    #[test]
    fn test_multibyte_cells_counted_in_chars() {
        let out = render(0, 1, "é\tb\nab\tc\n");
        assert_eq!(out, "é  b\nab c\n");
    }
}
