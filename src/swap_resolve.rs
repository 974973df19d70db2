use crate::basis::{SolveError, SwapStep};


/// 相異なるラベルの列を昇順に整列する最小の入れ替え列と, 整列後の列を返す.
///
/// 各ラベルの目標順位への置換を互いに素なサイクルへ分解し, 長さ k のサイクルごとに
/// 先頭位置と残りの位置を順に入れ替える k-1 手を出力する. 総手数は n - (サイクル数) で,
/// 互換による整列の下界に一致する. 入れ替えは作業用のコピーへ適用しながら記録するため,
/// 出力をそのままの順で元の列に再生すれば整列が完了する.
///
/// ラベルに重複があると置換にならないため `InvalidPermutation` で拒否する.
pub(crate) fn resolve<T>(seq: &[T]) -> Result<(Vec<SwapStep>, Vec<T>), SolveError>
where
    T: Ord + Copy + std::fmt::Debug,
{
    let n = seq.len();

    let mut by_rank: Vec<usize> = (0..n).collect();
    by_rank.sort_by(|&a, &b| seq[a].cmp(&seq[b]));

    for w in by_rank.windows(2) {
        if seq[w[0]] == seq[w[1]] {
            return Err(SolveError::InvalidPermutation(format!("{:?}", seq)));
        }
    }

    // target[i] は位置 i のラベルが移るべき順位
    let mut target = vec![0usize; n];
    for (rank, &i) in by_rank.iter().enumerate() {
        target[i] = rank;
    }

    let mut visited = vec![false; n];
    let mut swaps = vec![];
    let mut work = seq.to_vec();

    for start in 0..n {
        if visited[start] {
            continue;
        }

        let mut cycle = vec![];
        let mut cur = start;
        while !visited[cur] {
            visited[cur] = true;
            cycle.push(cur);
            cur = target[cur];
        }

        // 長さ 1 のサイクルは既に正位置なので何も出さない
        for &member in &cycle[1..] {
            work.swap(cycle[0], member);
            swaps.push(SwapStep(cycle[0], member));
        }
    }

    Ok((swaps, work))
}
