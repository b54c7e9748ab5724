use std::path::{Path, PathBuf};

use anyhow::bail;
use clap::{command, Arg, ArgAction};
use context::{Context, HighlightOptions, DEFAULT_THEME};
use generator::generate;

mod context;
mod generator;
mod metadata;
mod renderer;

/// Refuses an output directory whose removal would take the sources with it.
fn check_out_dir(source_dir: &Path, out_dir: &Path) -> anyhow::Result<()> {
    if !out_dir.exists() {
        return Ok(());
    }
    if !out_dir.is_dir() {
        bail!("if out_dir exists, it must be directory.");
    }
    let source = source_dir.canonicalize()?;
    let out = out_dir.canonicalize()?;
    if source.starts_with(&out) {
        bail!("out_dir {out_dir:?} contains source_dir {source_dir:?} and would be removed.");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let matches = command!()
        .args(&[
            Arg::new("source_dir")
                .help("Directory scanned for YYYY-MM-DD-<slug>.md posts and images")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("."),
            Arg::new("out_dir")
                .help("Directory path of output. Existing contents will be removed.")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("build"),
            Arg::new("template_dir")
                .help("Directory containing post.hbs and index.hbs")
                .value_parser(clap::value_parser!(PathBuf))
                .default_value("template"),
            Arg::new("theme")
                .long("theme")
                .help("Syntax highlighting theme for fenced code blocks")
                .default_value(DEFAULT_THEME),
            Arg::new("no_line_numbers")
                .long("no-line-numbers")
                .help("Do not number the lines of highlighted code")
                .action(ArgAction::SetTrue),
        ])
        .get_matches();

    let source_dir: &PathBuf = matches.get_one("source_dir").expect("has a default");
    if !source_dir.is_dir() {
        bail!("source_dir must be a directory.");
    }
    let out_dir: &PathBuf = matches.get_one("out_dir").expect("has a default");
    check_out_dir(source_dir, out_dir)?;
    let template_dir: &PathBuf = matches.get_one("template_dir").expect("has a default");
    if !template_dir.is_dir() {
        bail!("template_dir must be a directory.")
    }

    let theme: &String = matches.get_one("theme").expect("has a default");
    let ctx = Context::new(
        source_dir.to_owned(),
        out_dir.to_owned(),
        template_dir.to_owned(),
        HighlightOptions {
            theme: theme.to_owned(),
            line_numbers: !matches.get_flag("no_line_numbers"),
        },
    );

    generate(&ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn nested_out_dir_is_fine() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("build");
        fs::create_dir_all(&out).unwrap();
        assert!(check_out_dir(tmp.path(), &out).is_ok());
        assert!(check_out_dir(tmp.path(), &tmp.path().join("missing")).is_ok());
    }

    #[test]
    fn out_dir_must_not_hold_the_sources() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("posts");
        fs::create_dir_all(&src).unwrap();
        assert!(check_out_dir(&src, &src).is_err());
        assert!(check_out_dir(&src, tmp.path()).is_err());
    }

    #[test]
    fn out_dir_must_be_a_directory() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("build");
        fs::write(&file, "").unwrap();
        assert!(check_out_dir(tmp.path(), &file).is_err());
    }
}
