use anyhow::Result;
use candle_core::Tensor;

/// Masked mean pooling over the sequence axis followed by L2
/// normalization. `hidden` is `[B, T, H]`, `attention_mask` is `[B, T]`
/// with 1 for real tokens and 0 for padding.
pub fn mean_pool_normalize(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (_batch, _seq, _hidden_dim) = hidden.dims3()?;
    let mask = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let mask3 = mask.unsqueeze(2)?;
    let masked = hidden.broadcast_mul(&mask3)?;
    let summed = masked.sum(1)?;
    let counts = mask.sum(1)?.unsqueeze(1)?;
    let mean = summed.broadcast_div(&counts)?;

    let eps = Tensor::new(&[1e-12f32], hidden.device())?.to_dtype(hidden.dtype())?.unsqueeze(0)?;
    let norm = mean.sqr()?.sum_keepdim(1)?.sqrt()?.broadcast_add(&eps)?;
    Ok(mean.broadcast_div(&norm)?)
}
