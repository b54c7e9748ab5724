use std::{
    collections::HashMap,
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
};

use anyhow::Context;
use log::{debug, warn};
use walkdir::WalkDir;

const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "webp", "gif"];

pub(super) fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .map_or(false, |ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn is_same_file(src: &Path, dst: &Path) -> std::io::Result<bool> {
    if !dst.exists() {
        return Ok(false);
    }
    Ok(src.canonicalize()? == dst.canonicalize()?)
}

/// Copies every image under `source_dir` to the root of `out_dir`.
///
/// Directory structure is flattened. On a basename collision the file
/// copied last wins. Returns the number of attachments placed in `out_dir`.
pub(crate) fn sync_attachments(source_dir: &Path, out_dir: &Path) -> anyhow::Result<usize> {
    let mut copied: HashMap<PathBuf, PathBuf> = HashMap::new();

    for entry in WalkDir::new(source_dir).sort_by_file_name() {
        let entry = entry?;
        if entry.file_type().is_dir() || !is_image(entry.path()) {
            continue;
        }

        let src = entry.path();
        let dst = out_dir.join(entry.file_name());
        if is_same_file(src, &dst)? {
            debug!("{src:?} is already in place");
            continue;
        }

        let mut reader = BufReader::new(
            File::open(src).with_context(|| format!("while opening {src:?}"))?,
        );
        let mut writer = BufWriter::new(
            File::create(&dst).with_context(|| format!("while creating {dst:?}"))?,
        );
        std::io::copy(&mut reader, &mut writer)
            .with_context(|| format!("while copying {src:?} to {dst:?}"))?;
        writer.flush()?;

        if let Some(previous) = copied.insert(dst.clone(), src.to_path_buf()) {
            warn!("{src:?} overwrites {previous:?} at {dst:?}");
        } else {
            debug!("copied {src:?} to {dst:?}");
        }
    }

    Ok(copied.len())
}
