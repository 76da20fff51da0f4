use burn::tensor::{backend::Backend, ElementConversion, Tensor};

use super::lab::histogram_match_masked;

/// Hue-conditional saturation histogram matching: buckets pixels into 12
/// hue bins and matches `target`'s saturation distribution to `source`'s
/// within each bin independently, leaving hue and value untouched
/// (grounded on `hue_conditional_saturation_match` in
/// `examples/original_source/src/utils/color_fix.py`).
///
/// Bins with fewer than `MIN_BIN_PIXELS` samples in either clip are left
/// unmodified, since a histogram match over too few samples is noisy.
const HUE_BINS: usize = 12;
const MIN_BIN_PIXELS: usize = 100;

pub fn hue_conditional_saturation_match<B: Backend>(
    target: Tensor<B, 4>,
    source: Tensor<B, 4>,
) -> Tensor<B, 4> {
    let (t_h, t_s, t_v) = rgb_to_hsv(target);
    let (s_h, s_s, _) = rgb_to_hsv(source);

    let dims = t_h.dims();
    let n = dims[0] * dims[1] * dims[2] * dims[3];
    let flat_th = t_h.clone().reshape([n]);
    let flat_ts = t_s.clone().reshape([n]);
    let flat_sh = s_h.reshape([n]);
    let flat_ss = s_s.reshape([n]);

    let mut matched_s = flat_ts.clone();
    for bin in 0..HUE_BINS {
        // Bin 0 wraps around the red seam: [0, 1/12) union [11/12, 1).
        let t_mask = if bin == 0 {
            flat_th.clone().lower_elem(1.0 / HUE_BINS as f32)
                .bool_or(flat_th.clone().greater_equal_elem((HUE_BINS - 1) as f32 / HUE_BINS as f32))
        } else {
            let lo = bin as f32 / HUE_BINS as f32;
            let hi = (bin + 1) as f32 / HUE_BINS as f32;
            flat_th.clone().greater_equal_elem(lo).bool_and(flat_th.clone().lower_elem(hi))
        };
        let s_mask = if bin == 0 {
            flat_sh.clone().lower_elem(1.0 / HUE_BINS as f32)
                .bool_or(flat_sh.clone().greater_equal_elem((HUE_BINS - 1) as f32 / HUE_BINS as f32))
        } else {
            let lo = bin as f32 / HUE_BINS as f32;
            let hi = (bin + 1) as f32 / HUE_BINS as f32;
            flat_sh.clone().greater_equal_elem(lo).bool_and(flat_sh.clone().lower_elem(hi))
        };

        let t_count: f32 = t_mask.clone().float().sum().into_scalar().elem::<f32>();
        let s_count: f32 = s_mask.clone().float().sum().into_scalar().elem::<f32>();
        if t_count < MIN_BIN_PIXELS as f32 || s_count < MIN_BIN_PIXELS as f32 {
            continue;
        }

        let matched_bin = histogram_match_masked(
            flat_ts.clone(),
            flat_ss.clone(),
            t_mask.clone(),
            s_mask,
            t_count,
            s_count,
        )
        .clamp(0.0, 1.0);
        matched_s = matched_bin.mask_where(t_mask.bool_not(), matched_s);
    }

    let matched_s = matched_s.reshape([dims[0], dims[1], dims[2], dims[3]]);
    hsv_to_rgb(t_h.reshape([dims[0], dims[1], dims[2], dims[3]]), matched_s, t_v)
}

fn rgb_to_hsv<B: Backend>(rgb: Tensor<B, 4>) -> (Tensor<B, 4>, Tensor<B, 4>, Tensor<B, 4>) {
    let dims = rgb.dims();
    let r = rgb.clone().slice([0..dims[0], 0..1]);
    let g = rgb.clone().slice([0..dims[0], 1..2]);
    let b = rgb.slice([0..dims[0], 2..3]);

    let max = r.clone().max_pair(g.clone()).max_pair(b.clone());
    let min = r.clone().min_pair(g.clone()).min_pair(b.clone());
    let delta = max.clone() - min.clone();
    let safe_delta = delta.clone() + 1e-8;

    let r_is_max = max.clone().equal(r.clone());
    let g_is_max = max.clone().equal(g.clone());

    let hue_r = ((g.clone() - b.clone()) / safe_delta.clone()) / 6.0;
    let hue_g = ((b - r.clone()) / safe_delta.clone() + 2.0) / 6.0;
    let hue_b = ((r - g) / safe_delta + 4.0) / 6.0;

    let hue = hue_b.mask_where(g_is_max.bool_or(r_is_max.clone()), hue_g);
    let hue = hue.mask_where(r_is_max, hue_r);
    let hue = (hue.clone() - hue.clone().floor()).mask_where(delta.clone().lower_equal_elem(1e-8), Tensor::zeros_like(&hue));

    let value = max.clone();
    let safe_value = value.clone() + 1e-8;
    let saturation = (delta / safe_value).mask_where(value.clone().lower_equal_elem(1e-8), Tensor::zeros_like(&value));

    (hue, saturation, value)
}

fn hsv_to_rgb<B: Backend>(h: Tensor<B, 4>, s: Tensor<B, 4>, v: Tensor<B, 4>) -> Tensor<B, 4> {
    let h6 = h * 6.0;
    let i = h6.clone().floor();
    let f = h6 - i.clone();

    let p = v.clone() * (-s.clone() + 1.0);
    let q = v.clone() * (-(s.clone() * f.clone()) + 1.0);
    let t = v.clone() * (-(s * (-f + 1.0)) + 1.0);

    let i_mod = i.clone() - (i / 6.0).floor() * 6.0;

    let pick = |case: f32, a: &Tensor<B, 4>| i_mod.clone().equal_elem(case).float() * a.clone();

    let r = pick(0.0, &v) + pick(1.0, &q) + pick(2.0, &p) + pick(3.0, &p) + pick(4.0, &t) + pick(5.0, &v);
    let g = pick(0.0, &t) + pick(1.0, &v) + pick(2.0, &v) + pick(3.0, &q) + pick(4.0, &p) + pick(5.0, &p);
    let b = pick(0.0, &p) + pick(1.0, &p) + pick(2.0, &t) + pick(3.0, &v) + pick(4.0, &v) + pick(5.0, &q);

    Tensor::cat(vec![r, g, b], 1).clamp(0.0, 1.0)
}
