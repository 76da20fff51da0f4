use burn::tensor::{backend::Backend, Bool, Int, Tensor};

/// CIELAB perceptual color transfer: converts both clips to Lab, matches
/// `target`'s per-channel histogram to `source`'s via sorted-rank
/// interpolation, converts back to RGB (grounded on `lab_color_fix` /
/// `histogram_matching_channel` in
/// `examples/original_source/src/utils/color_fix.py`).
///
/// Both tensors are `[T, C, H, W]` RGB in `[0, 1]`.
pub fn lab_color_fix<B: Backend>(target: Tensor<B, 4>, source: Tensor<B, 4>) -> Tensor<B, 4> {
    let target_lab = rgb_to_lab(target);
    let source_lab = rgb_to_lab(source);

    let matched = match_channels(target_lab, source_lab);
    lab_to_rgb(matched)
}

/// Matches every channel of `target` to `source`'s histogram independently.
fn match_channels<B: Backend>(target: Tensor<B, 4>, source: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims = target.dims();
    let mut channels = Vec::with_capacity(dims[1]);
    for c in 0..dims[1] {
        let t_c = target.clone().slice([0..dims[0], c..c + 1]);
        let s_c = source.clone().slice([0..dims[0], c..c + 1]);
        channels.push(histogram_match(t_c, s_c));
    }
    Tensor::cat(channels, 1)
}

/// Rank-order histogram matching: sorts `target`'s values, replaces each
/// with the value at the same rank in `source`'s sorted values, then
/// scatters back to the original pixel order. Target and source have
/// equal length here, so the general quantile formula in
/// [`histogram_match_masked`] reduces to this simpler same-rank form.
fn histogram_match<B: Backend>(target: Tensor<B, 4>, source: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims = target.dims();
    let n = dims[0] * dims[1] * dims[2] * dims[3];
    let flat_target = target.reshape([n]);
    let flat_source = source.reshape([n]);

    let sorted_source = flat_source.sort(0);
    let order = flat_target.clone().argsort(0);

    // `order[i]` is the original index of the i-th smallest target value;
    // assigning `sorted_source` at those positions reproduces source's
    // distribution while preserving target's rank structure.
    let matched = flat_target.scatter(0, order, sorted_source);
    matched.reshape([dims[0], dims[1], dims[2], dims[3]])
}

/// Histogram matching over two same-length flat tensors where only a
/// subset of positions (given by `target_mask`/`source_mask`) actually
/// participates — used by [`crate::color::hsv`] to match saturation
/// within a single hue bin. Grounded on `histogram_matching_1d` in
/// `examples/original_source/src/utils/color_fix.py:656-659`, which
/// matches two differently-sized 1-D samples by quantile: `rank /
/// (n_source - 1) * (n_reference - 1)`.
///
/// Masked-out positions are pushed to a sentinel above the valid `[0,1]`
/// range before sorting, so they land at the tail of ascending order and
/// never influence the in-bin ranks; positions outside the mask come
/// back with meaningless values and the caller is expected to discard
/// them via `mask_where` against the same mask, exactly as the unmasked
/// per-bin correction already did.
pub(crate) fn histogram_match_masked<B: Backend>(
    target: Tensor<B, 1>,
    source: Tensor<B, 1>,
    target_mask: Tensor<B, 1, Bool>,
    source_mask: Tensor<B, 1, Bool>,
    target_count: f32,
    source_count: f32,
) -> Tensor<B, 1> {
    let device = target.device();
    let n = target.dims()[0];
    const SENTINEL: f32 = 2.0;

    let sentinel = Tensor::<B, 1>::from_floats([SENTINEL], &device).repeat(&[n]);
    let target_for_sort = sentinel.clone().mask_where(target_mask, target.clone());
    let source_for_sort = sentinel.mask_where(source_mask, source);

    let sort_order = target_for_sort.argsort(0);
    let sorted_source_vals = source_for_sort.sort(0);

    let rank = Tensor::<B, 1, Int>::arange(0..n as i64, &device).float();
    let t_denom = (target_count - 1.0).max(1.0);
    let s_last = (source_count - 1.0).max(0.0);
    let quantile = (rank / t_denom).clamp(0.0, 1.0);
    let source_rank_idx = (quantile * s_last).round().clamp(0.0, s_last).int();

    let matched_by_rank = sorted_source_vals.gather(0, source_rank_idx);
    target.scatter(0, sort_order, matched_by_rank)
}

/// sRGB -> CIE Lab (D65 white point), operating channel-wise over
/// `[T, 3, H, W]`.
fn rgb_to_lab<B: Backend>(rgb: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims = rgb.dims();
    let r = rgb.clone().slice([0..dims[0], 0..1]);
    let g = rgb.clone().slice([0..dims[0], 1..2]);
    let b = rgb.slice([0..dims[0], 2..3]);

    let linearize = |c: Tensor<B, 4>| {
        let low = c.clone() / 12.92;
        let high = ((c.clone() + 0.055) / 1.055).powf_scalar(2.4);
        let mask = c.greater_elem(0.04045);
        high.mask_where(mask.bool_not(), low)
    };

    let (r, g, b) = (linearize(r), linearize(g), linearize(b));

    let x = r.clone() * 0.4124564 + g.clone() * 0.3575761 + b.clone() * 0.1804375;
    let y = r.clone() * 0.2126729 + g.clone() * 0.7151522 + b.clone() * 0.0721750;
    let z = r * 0.0193339 + g * 0.1191920 + b * 0.9503041;

    let (xn, yn, zn) = (0.95047, 1.0, 1.08883);
    let fx = lab_f(x / xn);
    let fy = lab_f(y / yn);
    let fz = lab_f(z / zn);

    let l = fy.clone() * 116.0 - 16.0;
    let a = (fx - fy.clone()) * 500.0;
    let bb = (fy - fz) * 200.0;

    Tensor::cat(vec![l, a, bb], 1)
}

fn lab_f<B: Backend>(t: Tensor<B, 4>) -> Tensor<B, 4> {
    const EPSILON: f32 = 0.008856;
    const KAPPA: f32 = 903.3;
    let cbrt = t.clone().powf_scalar(1.0 / 3.0);
    let mask = t.clone().greater_elem(EPSILON);
    let linear = (t * KAPPA + 16.0) / 116.0;
    cbrt.mask_where(mask.bool_not(), linear)
}

fn lab_to_rgb<B: Backend>(lab: Tensor<B, 4>) -> Tensor<B, 4> {
    let dims = lab.dims();
    let l = lab.clone().slice([0..dims[0], 0..1]);
    let a = lab.clone().slice([0..dims[0], 1..2]);
    let bb = lab.slice([0..dims[0], 2..3]);

    let fy = (l + 16.0) / 116.0;
    let fx = fy.clone() + a / 500.0;
    let fz = fy.clone() - bb / 200.0;

    let (xn, yn, zn) = (0.95047, 1.0, 1.08883);
    let x = lab_f_inv(fx) * xn;
    let y = lab_f_inv(fy) * yn;
    let z = lab_f_inv(fz) * zn;

    let r = x.clone() * 3.2404542 + y.clone() * -1.5371385 + z.clone() * -0.4985314;
    let g = x.clone() * -0.9692660 + y.clone() * 1.8760108 + z.clone() * 0.0415560;
    let b = x * 0.0556434 + y * -0.2040259 + z * 1.0572252;

    let delinearize = |c: Tensor<B, 4>| {
        let c = c.clamp(0.0, 1.0);
        let low = c.clone() * 12.92;
        let high = c.clone().powf_scalar(1.0 / 2.4) * 1.055 - 0.055;
        let mask = c.greater_elem(0.0031308);
        high.mask_where(mask.bool_not(), low)
    };

    Tensor::cat(vec![delinearize(r), delinearize(g), delinearize(b)], 1).clamp(0.0, 1.0)
}

fn lab_f_inv<B: Backend>(t: Tensor<B, 4>) -> Tensor<B, 4> {
    const EPSILON: f32 = 6.0 / 29.0;
    const KAPPA: f32 = 903.3;
    let cube = t.clone().powf_scalar(3.0);
    let mask = t.clone().greater_elem(EPSILON);
    let linear = (t * 116.0 - 16.0) / KAPPA;
    cube.mask_where(mask.bool_not(), linear)
}
