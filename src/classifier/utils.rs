use ndarray::Array1;

/// Max-subtracted softmax; safe against overflow for large logits.
pub(crate) fn softmax(logits: &Array1<f32>) -> Array1<f32> {
    let max = logits.fold(f32::NEG_INFINITY, |acc, &v| acc.max(v));
    let exp = logits.mapv(|v| (v - max).exp());
    let sum = exp.sum();
    if sum > 0.0 {
        exp / sum
    } else {
        Array1::from_elem(logits.len(), 1.0 / logits.len().max(1) as f32)
    }
}

/// Index and value of the largest element. Ties resolve to the lower index.
pub(crate) fn argmax(values: &Array1<f32>) -> Option<(usize, f32)> {
    if values.is_empty() {
        return None;
    }
    let mut best_index = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best_value = v;
            best_index = i;
        }
    }
    Some((best_index, best_value))
}
