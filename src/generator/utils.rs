use std::{borrow::Borrow, cmp::Ordering, collections::HashSet};

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{CowStr, Event, LinkType, Tag, TagEnd};

use crate::metadata::Post;

/// Newest first. Used with a stable sort, so equal dates keep walk order.
pub(super) fn sort_post<T: Borrow<Post>>(a: &T, b: &T) -> Ordering {
    b.borrow().date.cmp(&a.borrow().date)
}

/// Builds a unique anchor id for a heading whose plain text is `text`.
pub(super) fn heading_anchor(text: &str, used: &mut HashSet<String>) -> String {
    let mut id: String = text
        .trim()
        .chars()
        .filter_map(|c| {
            if c.is_ascii_alphanumeric() {
                Some(c.to_ascii_lowercase())
            } else if c.is_ascii_whitespace() || c == '-' || c == '_' {
                Some('-')
            } else {
                None
            }
        })
        .collect();
    if id.is_empty() {
        id.push_str("heading");
    }

    if used.insert(id.clone()) {
        return id;
    }
    let mut n = 1;
    loop {
        let candidate = format!("{id}-{n}");
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}

/// Gives every heading without an explicit id an anchor derived from its text.
pub(super) fn attach_heading_ids(events: Vec<Event<'_>>) -> Vec<Event<'_>> {
    let mut used = HashSet::new();
    // explicit ids take their names first
    for event in events.iter() {
        if let Event::Start(Tag::Heading { id: Some(id), .. }) = event {
            used.insert(id.to_string());
        }
    }

    let mut res = Vec::with_capacity(events.len());
    // index of the pending heading start in `res`, and its text so far
    let mut pending: Option<(usize, String)> = None;

    for event in events {
        match event {
            Event::Start(Tag::Heading { id: None, .. }) => {
                pending = Some((res.len(), String::new()));
                res.push(event);
            }
            Event::Text(ref text) | Event::Code(ref text) => {
                if let Some((_, buf)) = pending.as_mut() {
                    buf.push_str(text);
                }
                res.push(event);
            }
            Event::End(TagEnd::Heading(_)) => {
                if let Some((idx, text)) = pending.take() {
                    let anchor = heading_anchor(&text, &mut used);
                    if let Event::Start(Tag::Heading { id, .. }) = &mut res[idx] {
                        *id = Some(anchor.into());
                    }
                }
                res.push(event);
            }
            _ => res.push(event),
        }
    }

    res
}

/// Turns bare URLs and email addresses in plain text into links.
///
/// Text inside links, images and code blocks is left as is.
pub(super) fn autolink<'a>(events: Vec<Event<'a>>, finder: &LinkFinder) -> Vec<Event<'a>> {
    let mut res: Vec<Event<'a>> = Vec::with_capacity(events.len());
    // link/image/code block nesting
    let mut opaque = 0usize;
    // the parser may split one run of text over several events
    let mut text = String::new();

    let flush = |text: &mut String, res: &mut Vec<Event<'a>>| {
        if text.is_empty() {
            return;
        }
        for span in finder.spans(text) {
            let (link_type, dest_url) = match span.kind() {
                Some(LinkKind::Url) => (LinkType::Autolink, span.as_str().to_string()),
                // the html writer adds the mailto: scheme itself
                Some(LinkKind::Email) => (LinkType::Email, span.as_str().to_string()),
                _ => {
                    res.push(Event::Text(span.as_str().to_string().into()));
                    continue;
                }
            };
            res.push(Event::Start(Tag::Link {
                link_type,
                dest_url: dest_url.into(),
                title: CowStr::Borrowed(""),
                id: CowStr::Borrowed(""),
            }));
            res.push(Event::Text(span.as_str().to_string().into()));
            res.push(Event::End(TagEnd::Link));
        }
        text.clear();
    };

    for event in events {
        match event {
            Event::Text(ref t) if opaque == 0 => {
                text.push_str(t);
                continue;
            }
            Event::Start(Tag::Link { .. } | Tag::Image { .. } | Tag::CodeBlock(_)) => opaque += 1,
            Event::End(TagEnd::Link | TagEnd::Image | TagEnd::CodeBlock) => {
                opaque = opaque.saturating_sub(1)
            }
            _ => {}
        }
        flush(&mut text, &mut res);
        res.push(event);
    }
    flush(&mut text, &mut res);

    res
}

/// Splits a flat event stream into the document root's child nodes.
pub(super) fn top_level_nodes(events: Vec<Event<'_>>) -> Vec<Vec<Event<'_>>> {
    let mut nodes = vec![];
    let mut current = vec![];
    let mut depth = 0usize;

    for event in events {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
        current.push(event);
        if depth == 0 {
            nodes.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        nodes.push(current);
    }

    nodes
}
