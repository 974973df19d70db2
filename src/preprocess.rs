use image::{DynamicImage, GrayImage};
use imageproc::{contrast::equalize_histogram, filter::gaussian_blur_f32};

/// 照合前の正規化を行う. グレースケール化, ヒストグラム平坦化, 3x3 相当の平滑化の順.
///
/// 平坦化はスクリーンショットと参照レンダリングの明度・コントラスト差を打ち消すため,
/// 平滑化は圧縮ノイズを抑えるため. 入力のみに依存する純粋な変換.
pub(crate) fn normalize(image: &DynamicImage) -> GrayImage {
    let gray = image.to_luma8();
    let equalized = equalize_histogram(&gray);
    // sigma 0.8 は 3x3 カーネルの既定値に相当する
    gaussian_blur_f32(&equalized, 0.8)
}
