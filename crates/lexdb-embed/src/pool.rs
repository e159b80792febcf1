use anyhow::{ensure, Result};
use candle_core::{DType, Tensor};

/// Sentence vectors from token states: average the positions the attention
/// mask keeps, then scale each row to unit length. `[B,T,H] -> [B,H]`.
pub fn masked_mean_l2(hidden: &Tensor, attention_mask: &Tensor) -> Result<Tensor> {
    let (batch, _tokens, width) = match hidden.dims() {
        &[b, t, h] => (b, t, h),
        other => anyhow::bail!("token states must be [B,T,H], got {other:?}"),
    };

    let keep = attention_mask.to_device(hidden.device())?.to_dtype(hidden.dtype())?;
    let kept_states = hidden.broadcast_mul(&keep.unsqueeze(2)?)?;
    let kept_count = keep.sum_keepdim(1)?;
    let mean = kept_states.sum(1)?.broadcast_div(&kept_count)?;

    // f16 underflows at 1e-12
    let floor = if hidden.dtype() == DType::F16 { 1e-6 } else { 1e-12 };
    let norm = (mean.sqr()?.sum_keepdim(1)?.sqrt()? + floor)?;
    let pooled = mean.broadcast_div(&norm)?;
    ensure!(pooled.dims() == [batch, width], "pooled shape {:?} is not [{batch}, {width}]", pooled.dims());
    Ok(pooled)
}
