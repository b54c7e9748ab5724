use linkify::{LinkFinder, LinkKind};
use log::debug;
use pulldown_cmark::{html, Event, HeadingLevel, Options, Parser, Tag, TagEnd};

use crate::context::HighlightOptions;

use super::{
    highlight::Highlighter,
    utils::{attach_heading_ids, autolink, top_level_nodes},
};

/// Body extraction state: only the root's first child may be dropped as the title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BodyState {
    AwaitingFirstNode,
    Normal,
}

pub(crate) struct MarkdownEngine {
    options: Options,
    links: LinkFinder,
    highlighter: Highlighter,
}

fn is_title_heading(node: &[Event<'_>]) -> bool {
    matches!(
        node.first(),
        Some(Event::Start(Tag::Heading {
            level: HeadingLevel::H1,
            ..
        }))
    )
}

/// Joins the rendered root children, leaving out a leading level-1 heading.
///
/// A node that `render` fails on is dropped; its neighbours are kept.
fn assemble_body<'a, F>(nodes: Vec<Vec<Event<'a>>>, mut render: F) -> String
where
    F: FnMut(Vec<Event<'a>>) -> anyhow::Result<String>,
{
    let mut body = String::new();
    let mut state = BodyState::AwaitingFirstNode;
    for node in nodes {
        if state == BodyState::AwaitingFirstNode {
            state = BodyState::Normal;
            if is_title_heading(&node) {
                continue;
            }
        }

        match render(node) {
            Ok(html) => body.push_str(&html),
            Err(e) => debug!("dropping a block that failed to render: {e:#}"),
        }
    }

    body.trim().to_string()
}

impl MarkdownEngine {
    pub fn new(highlight: &HighlightOptions) -> anyhow::Result<Self> {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_GFM);

        let mut links = LinkFinder::new();
        links.kinds(&[LinkKind::Url, LinkKind::Email]);

        Ok(Self {
            options,
            links,
            highlighter: Highlighter::new(highlight)?,
        })
    }

    fn parse<'a>(&self, src: &'a str) -> Vec<Event<'a>> {
        autolink(Parser::new_ext(src, self.options).collect(), &self.links)
    }

    /// Plain text of the first level-1 heading anywhere in the document.
    ///
    /// Only the heading's own text children count; text inside emphasis,
    /// links or code spans is left out.
    pub fn extract_title(&self, src: &str) -> String {
        let mut title = String::new();
        // nesting depth inside the title heading, 0 while outside it
        let mut depth = 0usize;

        for event in self.parse(src) {
            match event {
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if depth == 0 => depth = 1,
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if depth == 1 => break,
                _ if depth == 0 => {}
                Event::Start(_) => depth += 1,
                Event::End(_) => depth -= 1,
                Event::Text(text) if depth == 1 => title.push_str(&text),
                _ => {}
            }
        }

        title.trim().to_string()
    }

    fn render_node(&self, node: Vec<Event<'_>>) -> anyhow::Result<String> {
        let events = self.highlighter.transform(node)?;
        let mut out = String::new();
        html::push_html(&mut out, events.into_iter());
        Ok(out)
    }

    /// Html of the document without its leading level-1 heading.
    pub fn extract_body(&self, src: &str) -> String {
        let events = attach_heading_ids(self.parse(src));
        assemble_body(top_level_nodes(events), |node| self.render_node(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> MarkdownEngine {
        MarkdownEngine::new(&HighlightOptions::default()).unwrap()
    }

    #[test]
    fn title_and_body_split() {
        let md = "# Hello World\n\nBody text.\n";
        let e = engine();
        assert_eq!(e.extract_title(md), "Hello World");
        assert_eq!(e.extract_body(md), "<p>Body text.</p>");
    }

    #[test]
    fn setext_heading_is_a_title() {
        let md = "Hello\n=====\n\ntext\n";
        let e = engine();
        assert_eq!(e.extract_title(md), "Hello");
        assert!(!e.extract_body(md).contains("<h1"));
    }

    #[test]
    fn title_skips_inline_markup() {
        let e = engine();
        assert_eq!(e.extract_title("# Hello *big* world\n"), "Hello  world");
        assert_eq!(e.extract_title("# [link](x) only\n"), "only");
        assert_eq!(e.extract_title("# Using `cargo`\n"), "Using");
    }

    #[test]
    fn title_is_trimmed() {
        assert_eq!(engine().extract_title("#    Spaced out   \n"), "Spaced out");
    }

    #[test]
    fn no_heading() {
        let md = "## Sub\n\nJust text.\n";
        let e = engine();
        assert_eq!(e.extract_title(md), "");
        assert_eq!(
            e.extract_body(md),
            "<h2 id=\"sub\">Sub</h2>\n<p>Just text.</p>"
        );
    }

    #[test]
    fn nested_heading_is_the_title_but_stays_in_body() {
        let md = "> # Quoted\n\npara\n";
        let e = engine();
        assert_eq!(e.extract_title(md), "Quoted");
        assert!(e.extract_body(md).contains("<h1 id=\"quoted\">Quoted</h1>"));
    }

    #[test]
    fn first_h1_wins() {
        assert_eq!(engine().extract_title("# One\n\n# Two\n"), "One");
    }

    #[test]
    fn only_leading_h1_is_suppressed() {
        let md = "Intro.\n\n# Later\n\nMore.\n";
        let e = engine();
        assert_eq!(e.extract_title(md), "Later");
        assert_eq!(
            e.extract_body(md),
            "<p>Intro.</p>\n<h1 id=\"later\">Later</h1>\n<p>More.</p>"
        );
    }

    #[test]
    fn second_h1_is_kept() {
        let md = "# One\n\n# Two\n";
        assert_eq!(engine().extract_body(md), "<h1 id=\"two\">Two</h1>");
    }

    #[test]
    fn anchors_count_the_suppressed_title() {
        let md = "# Notes\n\n## Notes\n";
        assert_eq!(engine().extract_body(md), "<h2 id=\"notes-1\">Notes</h2>");
    }

    #[test]
    fn code_is_highlighted_in_body() {
        let md = "# T\n\n```sh\necho hi\n```\n";
        let body = engine().extract_body(md);
        assert!(body.starts_with("<pre style="));
        assert!(body.contains("echo"));
    }

    #[test]
    fn gfm_table_and_strikethrough() {
        let md = "| a | b |\n|---|---|\n| 1 | 2 |\n\n~~gone~~\n";
        let body = engine().extract_body(md);
        assert!(body.contains("<table>"));
        assert!(body.contains("<del>gone</del>"));
    }

    #[test]
    fn bare_url_is_linked() {
        assert_eq!(
            engine().extract_body("See https://example.com now\n"),
            "<p>See <a href=\"https://example.com\">https://example.com</a> now</p>"
        );
    }

    #[test]
    fn linked_url_is_not_part_of_the_title() {
        assert_eq!(engine().extract_title("# Notes on https://x.io\n"), "Notes on");
    }

    #[test]
    fn failing_block_is_dropped_alone() {
        let md = "# Title\n\none\n\ntwo\n\nthree\n";
        let e = engine();
        let nodes = top_level_nodes(attach_heading_ids(e.parse(md)));
        let body = assemble_body(nodes, |node| {
            if node.iter().any(|ev| matches!(ev, Event::Text(t) if &**t == "two")) {
                anyhow::bail!("cannot render");
            }
            e.render_node(node)
        });
        assert_eq!(body, "<p>one</p>\n<p>three</p>");
    }

    #[test]
    fn every_block_failing_gives_an_empty_body() {
        let e = engine();
        let nodes = top_level_nodes(e.parse("a\n\nb\n"));
        let body = assemble_body(nodes, |_| anyhow::bail!("nope"));
        assert_eq!(body, "");
    }

    #[test]
    fn empty_document() {
        let e = engine();
        assert_eq!(e.extract_title(""), "");
        assert_eq!(e.extract_body(""), "");
    }
}
