use std::{
    cmp::Ordering,
    iter::Peekable,
    path::{Path, PathBuf},
};

use anyhow::{Context as _, Result};
use image::DynamicImage;

use crate::basis::{FragmentId, SolveError};


const RASTER_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// `Fragment` は参照セットの断片 1 枚を表す. `id` はファイル名の自然順で 1 から振る.
#[derive(Debug, Clone)]
pub(crate) struct Fragment {
    pub(crate) id: FragmentId,
    pub(crate) path: PathBuf,
    pub(crate) image: DynamicImage,
}

impl Fragment {
    pub(crate) fn load(id: FragmentId, path: PathBuf) -> Result<Self, SolveError> {
        let image = image::open(&path).map_err(|source| SolveError::ImageLoad {
            path: path.clone(),
            source,
        })?;
        Ok(Self { id, path, image })
    }
}

/// 参照ディレクトリのラスタファイルを列挙して自然順に並べる. 中身のデコードはしない.
///
/// 1 枚も無ければ `EmptyReferenceSet` で即座に失敗する.
pub(crate) fn list_reference_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = vec![];

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read reference directory {}", dir.display()))?
    {
        let path = entry?.path();
        let is_raster = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| RASTER_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
            .unwrap_or(false);
        if path.is_file() && is_raster {
            files.push(path);
        }
    }

    if files.is_empty() {
        return Err(SolveError::EmptyReferenceSet(dir.to_path_buf()).into());
    }

    files.sort_by(|a, b| {
        natural_cmp(
            &a.file_name().unwrap_or_default().to_string_lossy(),
            &b.file_name().unwrap_or_default().to_string_lossy(),
        )
    });
    Ok(files)
}

/// 数字の並びを整数として比較する自然順. 数字以外は大文字小文字を無視して比較する.
pub(crate) fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut ai = a.chars().peekable();
    let mut bi = b.chars().peekable();

    loop {
        match (ai.peek().copied(), bi.peek().copied()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) if x.is_ascii_digit() && y.is_ascii_digit() => {
                let ord = cmp_digit_run(&take_digits(&mut ai), &take_digits(&mut bi));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            (Some(x), Some(y)) => {
                let ord = x.to_lowercase().cmp(y.to_lowercase());
                if ord != Ordering::Equal {
                    return ord;
                }
                ai.next();
                bi.next();
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<std::str::Chars>) -> String {
    let mut run = String::new();
    while let Some(&c) = chars.peek() {
        if !c.is_ascii_digit() {
            break;
        }
        run.push(c);
        chars.next();
    }
    run
}

// 先頭の 0 を捨てれば桁数の比較が整数の大小になる
fn cmp_digit_run(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
