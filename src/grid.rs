use std::collections::BTreeMap;

use crate::basis::{Center, FragmentId, UNMATCHED};


pub(crate) const ROWS: u32 = 3;
pub(crate) const COLS: u32 = 4;
pub(crate) const CELLS: usize = (ROWS * COLS) as usize;

/// `MatchSet` は一致中心座標から断片 id への対応を表す. 座標キーにつき id は 1 つ.
pub(crate) type MatchSet = BTreeMap<Center, FragmentId>;

/// `Grid` は復元した 3 行 4 列の配置を表す. 一致の無いセルは番兵値 0 のまま.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Grid {
    cells: [FragmentId; CELLS],
}

impl Grid {
    /// 一致中心をセルへ割り当てる. `row = y / cell_h`, `col = x / cell_w` の床除算のみで,
    /// セル境界上の中心は添字の小さい側に入る.
    pub(crate) fn assign(width: u32, height: u32, matches: &MatchSet) -> Self {
        let mut cells = [UNMATCHED; CELLS];
        let cell_w = width / COLS;
        let cell_h = height / ROWS;

        if cell_w == 0 || cell_h == 0 {
            // 対象画像がグリッドより小さい. 割り当てられるセルは無い
            return Self { cells };
        }

        for (&center, &id) in matches {
            let row = center.y / cell_h;
            let col = center.x / cell_w;
            if row < ROWS && col < COLS {
                cells[(row * COLS + col) as usize] = id;
            }
        }

        Self { cells }
    }

    /// 行優先で平坦化した 12 要素の列を返す.
    pub(crate) fn order(&self) -> Vec<FragmentId> {
        self.cells.to_vec()
    }
}
