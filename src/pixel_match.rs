use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{bail, Result};
use easy_parallel::Parallel;
use image::{
    imageops::{self, FilterType},
    GrayImage,
};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

use crate::{
    basis::{Center, MatchCandidate, SolveError, ThresholdPolicy},
    fragment::Fragment,
    grid::{self, MatchSet},
    preprocess,
};

#[cfg(test)]
mod tests;
mod zncc;

/// 前処理済みの対象画像に対する全断片の最良一致を求める.
///
/// 断片どうしは完全に独立なのでワーカースレッドへ分配し, `run` の返す並びで回収する.
/// これで併合順が id 昇順に固定され, 結果が実行ごとに揺れない. キャンセルは断片単位で
/// 確認し, 成立したら途中結果を捨てて `Cancelled` を返す.
pub(crate) fn match_all(
    target: &GrayImage,
    fragments: &[Fragment],
    cancelled: &AtomicBool,
    progress: impl Fn() + Sync,
) -> Result<Vec<MatchCandidate>> {
    let (width, height) = target.dimensions();
    let cell_w = width / grid::COLS;
    let cell_h = height / grid::ROWS;

    if cell_w == 0 || cell_h == 0 {
        bail!(
            "target image {}x{} is smaller than the {}x{} fragment grid",
            width,
            height,
            grid::COLS,
            grid::ROWS
        );
    }

    let candidates = Parallel::new()
        .each(fragments, |fragment| {
            if cancelled.load(Ordering::Relaxed) {
                return None;
            }
            let candidate = best_candidate(target, fragment, cell_w, cell_h);
            progress();
            Some(candidate)
        })
        .run();

    if cancelled.load(Ordering::Relaxed) {
        return Err(SolveError::Cancelled.into());
    }

    Ok(candidates.into_iter().flatten().collect())
}

/// 断片 1 枚を正規化してセル解像度へ合わせ, 2 種類の正規化相関で最良位置を探す.
fn best_candidate(
    target: &GrayImage,
    fragment: &Fragment,
    cell_w: u32,
    cell_h: u32,
) -> MatchCandidate {
    let normalized = preprocess::normalize(&fragment.image);
    // 参照レンダリングと撮影解像度のずれをセル寸法への縮尺で吸収する
    let resized = imageops::resize(&normalized, cell_w, cell_h, FilterType::Triangle);

    let scores = match_template(
        target,
        &resized,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let extremes = find_extremes(&scores);
    let mut best = (extremes.max_value, extremes.max_value_location);

    // 平均差し引きの ZNCC でも評価し, 高い方を採る
    let centered = zncc::best_match(target, &resized);
    if centered.0 > best.0 {
        best = centered;
    }

    let (score, (x, y)) = best;
    MatchCandidate {
        id: fragment.id,
        center: Center {
            x: x + cell_w / 2,
            y: y + cell_h / 2,
        },
        score,
    }
}

/// しきい値を超えた候補を id 昇順で `MatchSet` へ併合する.
///
/// 同じ中心座標へ解決した断片は後勝ちで上書きする. `report` のときは
/// 不一致と衝突の診断を出力する.
pub(crate) fn accumulate(candidates: &[MatchCandidate], threshold: f32, report: bool) -> MatchSet {
    let mut set = MatchSet::new();

    for c in candidates {
        if c.score < threshold {
            if report {
                println!("fragment {} unmatched, best score: {:.2}", c.id, c.score);
            }
            continue;
        }
        if let Some(previous) = set.insert(c.center, c.id) {
            if report {
                eprintln!(
                    "fragments {} and {} resolved to the same center {:?}; keeping {}",
                    previous, c.id, c.center, c.id
                );
            }
        }
    }

    set
}

/// しきい値走査. 一致数が最大になる `MatchSet` を選ぶ. 同数なら低いしきい値を採る.
///
/// 候補の最良スコアはしきい値に依存しないため, 断片ごとの照合を走査のたびに
/// やり直す必要はなく, 蓄積だけを繰り返せば同じ結果になる.
pub(crate) fn build_match_set(
    candidates: &[MatchCandidate],
    policy: &ThresholdPolicy,
) -> Result<(f32, MatchSet)> {
    let mut best: Option<(f32, MatchSet)> = None;

    for threshold in policy.thresholds() {
        let set = accumulate(candidates, threshold, false);
        if best.as_ref().map_or(true, |(_, b)| set.len() > b.len()) {
            best = Some((threshold, set));
        }
    }

    match best {
        // 採用したしきい値で診断を出し直す
        Some((threshold, _)) => Ok((threshold, accumulate(candidates, threshold, true))),
        None => bail!("threshold policy yielded no thresholds to try"),
    }
}
