use anyhow::{anyhow, Context};
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Tag, TagEnd};
use syntect::{
    easy::HighlightLines,
    highlighting::{Theme, ThemeSet},
    html::{append_highlighted_html_for_styled_line, start_highlighted_html_snippet, IncludeBackground},
    parsing::{SyntaxReference, SyntaxSet},
    util::LinesWithEndings,
};

use crate::context::HighlightOptions;

pub(super) struct Highlighter {
    syntax_set: SyntaxSet,
    theme: Theme,
    line_numbers: bool,
}

impl Highlighter {
    pub fn new(options: &HighlightOptions) -> anyhow::Result<Self> {
        let mut themes = ThemeSet::load_defaults().themes;
        let theme = themes.remove(&options.theme).ok_or_else(|| {
            let names: Vec<_> = themes.keys().cloned().collect();
            anyhow!(
                "unknown highlight theme {:?} (available: {})",
                options.theme,
                names.join(", ")
            )
        })?;

        Ok(Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme,
            line_numbers: options.line_numbers,
        })
    }

    fn find_syntax(&self, info: &str, code: &str) -> &SyntaxReference {
        let ss = &self.syntax_set;
        // info strings look like "rust", "rust,ignore" or "python title=x"
        let lang = info
            .split(|c: char| c.is_whitespace() || c == ',')
            .next()
            .unwrap_or("");
        if lang.is_empty() {
            let first_line = code.lines().next().unwrap_or("");
            return ss
                .find_syntax_by_first_line(first_line)
                .unwrap_or_else(|| ss.find_syntax_plain_text());
        }
        ss.find_syntax_by_token(lang)
            .or_else(|| ss.find_syntax_by_extension(lang))
            .unwrap_or_else(|| ss.find_syntax_plain_text())
    }

    pub fn highlight_code(&self, info: &str, code: &str) -> anyhow::Result<String> {
        let syntax = self.find_syntax(info, code);
        let mut lines = HighlightLines::new(syntax, &self.theme);

        let (mut out, _) = start_highlighted_html_snippet(&self.theme);
        out.push_str("<code>");
        for (i, line) in LinesWithEndings::from(code).enumerate() {
            let regions = lines
                .highlight_line(line, &self.syntax_set)
                .with_context(|| format!("while highlighting line {}", i + 1))?;
            if self.line_numbers {
                out.push_str(&format!("<span class=\"ln\">{}</span>", i + 1));
            }
            append_highlighted_html_for_styled_line(&regions, IncludeBackground::No, &mut out)?;
        }
        out.push_str("</code></pre>\n");

        Ok(out)
    }

    /// Replaces every fenced code block in `events` with highlighted html.
    pub fn transform<'a>(&self, events: Vec<Event<'a>>) -> anyhow::Result<Vec<Event<'a>>> {
        let mut res = Vec::with_capacity(events.len());
        let mut fence: Option<CowStr<'a>> = None;
        let mut code = String::new();

        for event in events {
            match event {
                Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(info))) => {
                    fence = Some(info);
                    code.clear();
                }
                Event::Text(text) if fence.is_some() => code.push_str(&text),
                Event::End(TagEnd::CodeBlock) if fence.is_some() => {
                    let info = fence.take().unwrap_or(CowStr::Borrowed(""));
                    res.push(Event::Html(self.highlight_code(&info, &code)?.into()));
                }
                _ => res.push(event),
            }
        }

        Ok(res)
    }
}
