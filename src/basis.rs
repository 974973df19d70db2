use std::path::PathBuf;

use thiserror::Error;

/// `FragmentId` は参照断片の 1 始まりの識別番号を表す. ファイル名の自然順で割り当てる.
pub(crate) type FragmentId = u32;

/// 確信度の足りないセルを表す番兵値.
pub(crate) const UNMATCHED: FragmentId = 0;

/// `Center` は対象画像のピクセル空間における一致領域の中心座標を表す.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct Center {
    pub(crate) x: u32,
    pub(crate) y: u32,
}

impl std::fmt::Debug for Center {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// `MatchCandidate` はある断片の最良一致を表す. スコアは正規化相互相関の値.
#[derive(Debug, Clone, Copy)]
pub(crate) struct MatchCandidate {
    pub(crate) id: FragmentId,
    pub(crate) center: Center,
    pub(crate) score: f32,
}

/// `SwapStep` は整列へ向けた 1 回の入れ替えを表す. 0 始まりの位置の組.
#[derive(Clone, Copy, PartialEq, Eq)]
pub(crate) struct SwapStep(pub(crate) usize, pub(crate) usize);

impl std::fmt::Debug for SwapStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({} <-> {})", self.0, self.1)
    }
}

/// `ThresholdPolicy` は一致を採用するしきい値の決め方を表す.
///
/// `Sweep` は範囲内を走査して一致数が最大になるしきい値を選ぶ. 同数のときは低い方を採る.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ThresholdPolicy {
    Fixed(f32),
    Sweep { start: f32, end: f32, step: f32 },
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        ThresholdPolicy::Sweep {
            start: 0.4,
            end: 0.8,
            step: 0.05,
        }
    }
}

impl ThresholdPolicy {
    pub(crate) fn thresholds(&self) -> Vec<f32> {
        match *self {
            ThresholdPolicy::Fixed(t) => vec![t],
            ThresholdPolicy::Sweep { start, end, step } => {
                let mut ts = vec![];
                let mut t = start;
                while t < end {
                    ts.push(t);
                    t += step;
                }
                ts
            }
        }
    }
}

/// `SolveError` は実行全体を打ち切る失敗の分類を表す. 断片単体の低スコアはここに含めない.
#[derive(Debug, Error)]
pub(crate) enum SolveError {
    #[error("failed to load image {}: {}", .path.display(), .source)]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("no usable reference fragments in {}", .0.display())]
    EmptyReferenceSet(PathBuf),

    #[error("sequence is not a permutation of pairwise-distinct labels: {0}")]
    InvalidPermutation(String),

    #[error("solve cancelled")]
    Cancelled,
}
