// Line-oriented output buffer for generated Go source.

/// Accumulates generated source a line at a time, tracking the current
/// indent level. Indentation is a run of tabs, which is what gofmt would
/// produce anyway.
#[derive(Default)]
pub struct Printer {
    buf: String,
    indent: usize,
}

/// A position remembered for later insertion, with the indent that was
/// active when it was taken.
#[derive(Clone, Copy)]
pub struct Mark {
    offset: usize,
    indent: usize,
}

impl Printer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes one line at the current indent.
    pub fn line(&mut self, text: impl AsRef<str>) {
        let text = text.as_ref();
        if !text.is_empty() {
            for _ in 0..self.indent {
                self.buf.push('\t');
            }
            self.buf.push_str(text);
        }
        self.buf.push('\n');
    }

    /// Writes text verbatim, no indent, no trailing newline.
    pub fn raw(&mut self, text: &str) {
        self.buf.push_str(text);
    }

    pub fn indent(&mut self) {
        self.indent += 1;
    }

    pub fn outdent(&mut self) {
        debug_assert!(self.indent > 0, "unbalanced outdent");
        self.indent = self.indent.saturating_sub(1);
    }

    /// Remembers the current position so lines can be spliced in later,
    /// after subsequent content has been emitted.
    pub fn mark(&mut self) -> Mark {
        Mark {
            offset: self.buf.len(),
            indent: self.indent,
        }
    }

    /// Inserts one line at a previously taken mark. Repeated inserts at the
    /// same mark stack in reverse: the last inserted line ends up first.
    /// Inserting at a mark shifts the text behind it, so when several marks
    /// are pending they must be filled back-to-front.
    pub fn insert_line(&mut self, mark: Mark, text: &str) {
        let mut line = String::with_capacity(mark.indent + text.len() + 1);
        for _ in 0..mark.indent {
            line.push('\t');
        }
        line.push_str(text);
        line.push('\n');
        self.buf.insert_str(mark.offset, &line);
    }

    pub fn as_str(&self) -> &str {
        &self.buf
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indent_uses_tabs() {
        let mut p = Printer::new();
        p.line("func f() {");
        p.indent();
        p.line("return");
        p.outdent();
        p.line("}");
        assert_eq!(p.as_str(), "func f() {\n\treturn\n}\n");
    }

    #[test]
    fn test_empty_line_has_no_indent() {
        let mut p = Printer::new();
        p.indent();
        p.line("a");
        p.line("");
        p.line("b");
        assert_eq!(p.as_str(), "\ta\n\n\tb\n");
    }

    #[test]
    fn test_insert_at_mark_stacks_in_reverse() {
        let mut p = Printer::new();
        p.indent();
        p.line("// Types that are valid to be assigned to Value:");
        let mark = p.mark();
        p.outdent();
        p.line("}");
        p.insert_line(mark, "//\t*Msg_First");
        p.insert_line(mark, "//\t*Msg_Second");
        assert_eq!(
            p.as_str(),
            "\t// Types that are valid to be assigned to Value:\n\
             \t//\t*Msg_Second\n\
             \t//\t*Msg_First\n\
             }\n"
        );
    }
}
