use std::fmt::Write;

use url::Url;

enum Style {
    Bold,
    Code,
}

impl Style {
    fn marker(&self) -> &'static str {
        match self {
            Self::Bold => "*",
            Self::Code => "`",
        }
    }
}

/// Builds Slack `mrkdwn` text. Everything written through [`std::fmt::Write`] is escaped, the
/// style helpers emit raw markup.
#[derive(Default)]
pub struct MessageBuilder {
    pub(crate) text: String,
    style_stack: Vec<Style>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn build(mut self) -> String {
        self.close_styles();
        self.text
    }

    pub fn bold(&mut self) {
        self.open(Style::Bold);
    }

    pub fn code(&mut self) {
        self.open(Style::Code);
    }

    fn open(&mut self, style: Style) {
        self.text.push_str(style.marker());
        self.style_stack.push(style);
    }

    pub fn tag(&mut self, tag: &str) {
        self.bold();
        write!(self, "[{}]", tag).unwrap();
        self.close_last();
    }

    pub fn link(&mut self, text: &str, href: &Url) {
        self.text.push('<');
        self.text.push_str(href.as_str());
        self.text.push('|');
        write!(self, "{}", text).unwrap();
        self.text.push('>');
    }

    /// Panics if called with no style in the stack
    pub fn close_last(&mut self) {
        let style = self.style_stack.pop().expect("cannot be empty");
        self.text.push_str(style.marker());
    }

    pub fn close_styles(&mut self) {
        while !self.style_stack.is_empty() {
            self.close_last();
        }
    }
}

impl std::fmt::Write for MessageBuilder {
    fn write_str(&mut self, s: &str) -> std::fmt::Result {
        let mut last = 0;
        for (i, c) in s.char_indices() {
            // the only three characters Slack wants escaped
            let escaped = match c {
                '>' => "&gt;",
                '<' => "&lt;",
                '&' => "&amp;",
                _ => continue,
            };

            self.text.push_str(&s[last..i]);
            self.text.push_str(escaped);
            last = i + 1;
        }

        if last < s.len() {
            self.text.push_str(&s[last..]);
        }

        Ok(())
    }
}
