use std::{collections::HashMap, path::Path};

use anyhow::Context as _;
use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::{
    context::Context,
    metadata::{is_markdown, parse_file_name, Post},
    renderer::{generate_renderer, render_index, render_post},
};

mod attachments;
mod extract;
mod highlight;
mod utils;

use attachments::sync_attachments;
use extract::MarkdownEngine;

fn preprocess_file(path: &Path, engine: &MarkdownEngine) -> anyhow::Result<Post> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let file_name = parse_file_name(&name)?;

    let bytes = std::fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    Ok(Post {
        title: engine.extract_title(&content),
        date: file_name.date,
        slug: file_name.slug,
        body: engine.extract_body(&content),
    })
}

/// Reads every `.md` file under `source_dir`, newest post first.
pub(crate) fn collect_posts(source_dir: &Path, engine: &MarkdownEngine) -> anyhow::Result<Vec<Post>> {
    let mut posts = vec![];
    let mut slugs: HashMap<String, usize> = HashMap::new();

    for entry in WalkDir::new(source_dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_markdown(e.path()))
    {
        let post = preprocess_file(entry.path(), engine)
            .with_context(|| format!("while preprocessing {:?}", entry.path()))?;
        debug!("{:?} -> {:?} ({})", entry.path(), post.slug, post.date);

        let seen = slugs.entry(post.slug.clone()).or_default();
        *seen += 1;
        if *seen > 1 {
            warn!("slug {:?} is used by more than one post", post.slug);
        }
        posts.push(post);
    }

    posts.sort_by(utils::sort_post);
    Ok(posts)
}

pub(crate) fn generate(ctx: &Context) -> anyhow::Result<()> {
    let engine = MarkdownEngine::new(&ctx.highlight)?;

    info!("cleaning {:?}", ctx.out_dir);
    fs_extra::dir::remove(&ctx.out_dir)
        .with_context(|| format!("while removing {:?}", ctx.out_dir))?;
    fs_extra::dir::create_all(&ctx.out_dir, false)
        .with_context(|| format!("while creating {:?}", ctx.out_dir))?;

    let attachments = sync_attachments(&ctx.source_dir, &ctx.out_dir)
        .context("while copying attachments")?;
    info!("copied {attachments} attachment(s)");

    let posts = collect_posts(&ctx.source_dir, &engine)?;
    info!("collected {} post(s)", posts.len());

    let handlebars = generate_renderer(&ctx.template_dir)?;
    for post in posts.iter() {
        let path = render_post(&handlebars, &ctx.out_dir, post)?;
        debug!("wrote {path:?}");
    }
    let index = render_index(&handlebars, &ctx.out_dir, &posts)?;
    info!("wrote {index:?}");

    Ok(())
}
