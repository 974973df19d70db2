use image::GrayImage;

/// 平均を差し引いた正規化相互相関 (ZNCC) を全位置で評価し, 最良の (スコア, 左上位置) を返す.
///
/// スコアは [-1, 1] に収まり, 明るさとコントラストの線形な変化に不変.
/// テンプレートか窓の分散が 0 のときはスコアを 0 とする.
pub(crate) fn best_match(image: &GrayImage, template: &GrayImage) -> (f32, (u32, u32)) {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    debug_assert!(tw <= iw && th <= ih);

    let area = (tw * th) as f32;
    let tpl: Vec<f32> = template.as_raw().iter().map(|&v| v as f32).collect();
    let tpl_mean = tpl.iter().sum::<f32>() / area;
    let tpl_centered: Vec<f32> = tpl.iter().map(|v| v - tpl_mean).collect();
    let tpl_norm = tpl_centered.iter().map(|v| v * v).sum::<f32>().sqrt();

    let mut best = (f32::MIN, (0, 0));

    for y in 0..=ih - th {
        for x in 0..=iw - tw {
            let mut sum = 0.0f32;
            for dy in 0..th {
                for dx in 0..tw {
                    sum += image.get_pixel(x + dx, y + dy).0[0] as f32;
                }
            }
            let window_mean = sum / area;

            let mut dot = 0.0f32;
            let mut window_norm = 0.0f32;
            for dy in 0..th {
                for dx in 0..tw {
                    let v = image.get_pixel(x + dx, y + dy).0[0] as f32 - window_mean;
                    dot += v * tpl_centered[(dy * tw + dx) as usize];
                    window_norm += v * v;
                }
            }

            let denominator = tpl_norm * window_norm.sqrt();
            let score = if denominator > f32::EPSILON {
                dot / denominator
            } else {
                0.0
            };
            if score > best.0 {
                best = (score, (x, y));
            }
        }
    }

    best
}
