use std::fmt::Write as _;
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use chrono::NaiveDate;
use handlebars::{handlebars_helper, Handlebars};

use crate::metadata::Post;

handlebars_helper!(format_date: |date: str, fmt: str| {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .ok()
        .and_then(|d| {
            // an invalid format string surfaces as fmt::Error here instead of a panic
            let mut res = String::new();
            write!(res, "{}", d.format(fmt)).ok().map(|_| res)
        })
        .unwrap_or_else(|| date.to_string())
});

pub(crate) fn generate_renderer(template_dir: &Path) -> anyhow::Result<Handlebars<'static>> {
    let mut handlebars = handlebars::Handlebars::new();
    handlebars.register_helper("format_date", Box::new(format_date));
    handlebars
        .register_template_file("post", template_dir.join("post.hbs"))
        .context("post.hbs")?;
    handlebars
        .register_template_file("index", template_dir.join("index.hbs"))
        .context("index.hbs")?;

    Ok(handlebars)
}

fn render_to_file<T: serde::Serialize>(
    handlebars: &Handlebars<'_>,
    name: &str,
    data: &T,
    path: &Path,
) -> anyhow::Result<()> {
    let fd = File::create(path).with_context(|| format!("while creating {path:?}"))?;
    let mut writer = BufWriter::new(fd);
    handlebars.render_to_write(name, data, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Writes `<out_dir>/<slug>.html` and returns its path.
pub(crate) fn render_post(
    handlebars: &Handlebars<'_>,
    out_dir: &Path,
    post: &Post,
) -> anyhow::Result<PathBuf> {
    let path = out_dir.join(format!("{}.html", post.slug));
    render_to_file(handlebars, "post", post, &path)
        .with_context(|| format!("while generating {:?}", post.slug))?;
    Ok(path)
}

/// The whole post list is the root context of the index template.
pub(crate) fn render_index(
    handlebars: &Handlebars<'_>,
    out_dir: &Path,
    posts: &[Post],
) -> anyhow::Result<PathBuf> {
    let path = out_dir.join("index.html");
    render_to_file(handlebars, "index", &posts, &path).context("while generating index.html")?;
    Ok(path)
}
