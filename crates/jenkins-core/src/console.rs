use std::io::{self, Write};

// ---------------------------------------------------------------------------
// Traits
// ---------------------------------------------------------------------------

/// Receives the remote console log exactly as Jenkins serves it.
pub trait ConsoleSink {
    /// One progressive-log chunk, verbatim. Chunks may split lines.
    fn log(&mut self, text: &str) -> io::Result<()>;

    /// Called once after the final chunk.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Line-oriented output; lines arrive without their terminator.
pub trait LineSink {
    fn line(&mut self, line: &str) -> io::Result<()>;
}

impl<L: LineSink + ?Sized> LineSink for Box<L> {
    fn line(&mut self, line: &str) -> io::Result<()> {
        (**self).line(line)
    }
}

// ---------------------------------------------------------------------------
// LineBufferedConsole
// ---------------------------------------------------------------------------

/// Adapts a [`LineSink`] to a [`ConsoleSink`].
///
/// Splits on `\n`, `\r\n` and lone `\r`. A line cut across two chunks is held
/// back until its terminator arrives (or until [`ConsoleSink::finish`]).
#[derive(Debug)]
pub struct LineBufferedConsole<L> {
    sink: L,
    pending: String,
    /// Last chunk ended in `\r`; a leading `\n` in the next one belongs to it.
    after_cr: bool,
}

impl<L: LineSink> LineBufferedConsole<L> {
    pub fn new(sink: L) -> Self {
        Self {
            sink,
            pending: String::new(),
            after_cr: false,
        }
    }

    pub fn into_inner(self) -> L {
        self.sink
    }
}

impl<L: LineSink> ConsoleSink for LineBufferedConsole<L> {
    fn log(&mut self, text: &str) -> io::Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        let mut rest = text;
        if self.after_cr {
            self.after_cr = false;
            rest = rest.strip_prefix('\n').unwrap_or(rest);
        }

        while let Some(pos) = rest.find(|c: char| c == '\r' || c == '\n') {
            self.pending.push_str(&rest[..pos]);
            self.sink.line(&self.pending)?;
            self.pending.clear();

            let terminator = rest.as_bytes()[pos];
            rest = &rest[pos + 1..];
            if terminator == b'\r' {
                if let Some(stripped) = rest.strip_prefix('\n') {
                    rest = stripped;
                } else if rest.is_empty() {
                    self.after_cr = true;
                }
            }
        }
        self.pending.push_str(rest);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        self.after_cr = false;
        if !self.pending.is_empty() {
            self.sink.line(&self.pending)?;
            self.pending.clear();
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// LineSink implementations
// ---------------------------------------------------------------------------

/// Writes each line to an [`io::Write`], e.g. stdout.
#[derive(Debug)]
pub struct WriterLines<W> {
    writer: W,
}

impl<W: Write> WriterLines<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> LineSink for WriterLines<W> {
    fn line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.writer, "{line}")?;
        self.writer.flush()
    }
}

/// Emits each line as an INFO event on the `console` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLines;

impl LineSink for TracingLines {
    fn line(&mut self, line: &str) -> io::Result<()> {
        tracing::info!(target: "console", "{line}");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Collected(Vec<String>);

    impl LineSink for Collected {
        fn line(&mut self, line: &str) -> io::Result<()> {
            self.0.push(line.to_string());
            Ok(())
        }
    }

    fn feed(chunks: &[&str]) -> Vec<String> {
        let mut console = LineBufferedConsole::new(Collected::default());
        for chunk in chunks {
            console.log(chunk).unwrap();
        }
        console.finish().unwrap();
        console.into_inner().0
    }

    #[test]
    fn splits_complete_lines() {
        assert_eq!(feed(&["a\nb\n"]), vec!["a", "b"]);
    }

    #[test]
    fn joins_line_split_across_chunks() {
        let lines = feed(&["Buil", "ding in work", "space\nDone\n"]);
        assert_eq!(lines, vec!["Building in workspace", "Done"]);
    }

    #[test]
    fn handles_crlf_and_lone_cr() {
        assert_eq!(feed(&["a\r\nb\rc\n"]), vec!["a", "b", "c"]);
    }

    #[test]
    fn crlf_split_across_chunks_is_one_terminator() {
        assert_eq!(feed(&["a\r", "\nb\n"]), vec!["a", "b"]);
    }

    #[test]
    fn finish_flushes_trailing_partial_line() {
        assert_eq!(feed(&["Finished: SUCCESS"]), vec!["Finished: SUCCESS"]);
    }

    #[test]
    fn blank_lines_are_kept() {
        assert_eq!(feed(&["a\n\nb\n"]), vec!["a", "", "b"]);
    }

    #[test]
    fn writer_lines_appends_newline() {
        let mut console = LineBufferedConsole::new(WriterLines::new(Vec::new()));
        console.log("one\ntw").unwrap();
        console.log("o\n").unwrap();
        console.finish().unwrap();
        let out = console.into_inner().into_inner();
        assert_eq!(String::from_utf8(out).unwrap(), "one\ntwo\n");
    }
}
