use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        mpsc, Arc, Mutex,
    },
    thread,
};

use anyhow::Result;
use image::GenericImageView;

use crate::{
    basis::{FragmentId, SolveError, SwapStep, ThresholdPolicy, UNMATCHED},
    fragment::{self, Fragment},
    grid::Grid,
    pixel_match, preprocess, swap_resolve,
};


/// `Solution` は 1 回の解決で得る出力一式を表す. 提示層はこれをそのまま消費する.
#[derive(Debug)]
pub(crate) struct Solution {
    /// 復元した行優先の断片 id 列.
    pub(crate) order: Vec<FragmentId>,
    /// `order` を昇順へ整列する最小の入れ替え列.
    pub(crate) swaps: Vec<SwapStep>,
    pub(crate) sorted: Vec<FragmentId>,
    /// 採用されたしきい値.
    pub(crate) threshold: f32,
    /// id 順の参照断片ファイルパス.
    pub(crate) fragment_paths: Vec<PathBuf>,
    /// 参照断片のピクセル寸法 (width, height).
    pub(crate) piece_size: (u32, u32),
}

/// パイプライン本体. 参照一覧の確認, 対象の読み込み, 断片の読み込み, 照合,
/// グリッド割り当て, 置換の検証, 最小入れ替えの計算の順に進める.
///
/// `progress` には 0-100 の進捗率を渡す. 並行照合の間は呼び出し順が前後しうるので,
/// 単調増加が必要な消費側は `spawn` を使う.
pub(crate) fn solve(
    target_path: &Path,
    fragment_dir: &Path,
    policy: &ThresholdPolicy,
    cancelled: &AtomicBool,
    progress: impl Fn(u8) + Sync,
) -> Result<Solution> {
    // 参照セットの空チェックはどのファイルを開くよりも先
    let reference_files = fragment::list_reference_files(fragment_dir)?;
    let total = reference_files.len();

    let target_image = image::open(target_path).map_err(|source| SolveError::ImageLoad {
        path: target_path.to_path_buf(),
        source,
    })?;
    progress(5);

    let mut fragments = Vec::with_capacity(total);
    for (i, (path, id)) in reference_files.into_iter().zip(1..).enumerate() {
        if cancelled.load(Ordering::Relaxed) {
            return Err(SolveError::Cancelled.into());
        }
        fragments.push(Fragment::load(id, path)?);
        progress(5 + ((i + 1) * 25 / total) as u8);
    }

    let fragment_paths: Vec<_> = fragments.iter().map(|f| f.path.clone()).collect();
    let piece_size = fragments[0].image.dimensions();

    let target = preprocess::normalize(&target_image);
    let (width, height) = target.dimensions();

    let matched = AtomicUsize::new(0);
    let candidates = pixel_match::match_all(&target, &fragments, cancelled, || {
        let done = matched.fetch_add(1, Ordering::SeqCst) + 1;
        progress(30 + (done * 60 / total) as u8);
    })?;

    let (threshold, matches) = pixel_match::build_match_set(&candidates, policy)?;
    println!(
        "threshold {:.2} matched {} of {} fragments",
        threshold,
        matches.len(),
        total
    );

    let order = Grid::assign(width, height, &matches).order();
    progress(95);

    if order.contains(&UNMATCHED) {
        return Err(SolveError::InvalidPermutation(format!(
            "recovered sequence has unmatched cells: {:?}",
            order
        ))
        .into());
    }

    let (swaps, sorted) = swap_resolve::resolve(&order)?;
    progress(100);

    Ok(Solution {
        order,
        swaps,
        sorted,
        threshold,
        fragment_paths,
        piece_size,
    })
}

/// ワーカースレッドからの通知. 進捗が何度か流れたあと, 終端の結果がちょうど 1 回流れる.
pub(crate) enum Event {
    Progress(u8),
    Finished(Result<Solution>),
}

/// `SolveJob` はバックグラウンドで走る解決 1 回分のハンドルを表す.
pub(crate) struct SolveJob {
    pub(crate) events: mpsc::Receiver<Event>,
    cancelled: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl SolveJob {
    /// 協調キャンセルを要求する. 途中結果は捨てられ, 終端イベントは流れない.
    pub(crate) fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    pub(crate) fn join(self) {
        self.handle
            .join()
            .unwrap_or_else(|e| std::panic::resume_unwind(e));
    }
}

/// 解決をワーカースレッドで実行し, 単調増加の進捗と終端の結果をチャネルで通知する.
pub(crate) fn spawn(
    target_path: PathBuf,
    fragment_dir: PathBuf,
    policy: ThresholdPolicy,
) -> SolveJob {
    let (tx, rx) = mpsc::channel();
    let cancelled = Arc::new(AtomicBool::new(false));

    let thread_cancelled = Arc::clone(&cancelled);
    let handle = thread::Builder::new()
        .name("piece matcher".into())
        .spawn(move || {
            // 並行照合で前後した進捗は捨てて単調増加だけを流す.
            // Sender は Sync でないため単調性を守る Mutex に同居させる
            let reporter = Mutex::new((tx.clone(), 0u8));
            let progress = |percent: u8| {
                let mut reporter = reporter.lock().unwrap();
                if percent > reporter.1 {
                    reporter.1 = percent;
                    let _ = reporter.0.send(Event::Progress(percent));
                }
            };

            let result = solve(
                &target_path,
                &fragment_dir,
                &policy,
                &thread_cancelled,
                progress,
            );

            let was_cancelled = matches!(
                result
                    .as_ref()
                    .err()
                    .and_then(|e| e.downcast_ref::<SolveError>()),
                Some(SolveError::Cancelled)
            );
            if !was_cancelled {
                let _ = tx.send(Event::Finished(result));
            }
        })
        .expect("failed to launch piece matcher thread");

    SolveJob {
        events: rx,
        cancelled,
        handle,
    }
}
