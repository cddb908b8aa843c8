// ============================================================
// Layer 5 — Attention Pooling
// ============================================================
// Reduces a sequence of hidden vectors [B, T, H] to one
// vector per example [B, H]:
//
//   v   = tanh(H·W + b)      [B, T, A]
//   s   = v·u                [B, T]
//   α   = softmax_t(s)       [B, T]   Σ_t α = 1, α ≥ 0
//   out = Σ_t α_t · H_t      [B, H]
//
// Reference: Yang et al. (2016) Hierarchical Attention
//            Networks for Document Classification

use burn::{
    module::Param,
    nn::Initializer,
    prelude::*,
    tensor::activation::softmax,
};

use crate::domain::error::TrainError;

#[derive(Config, Debug)]
pub struct AttentionPoolingConfig {
    /// Width H of the hidden vectors being pooled
    pub d_hidden: usize,
    /// Width A of the attention projection
    pub attention_size: usize,
}

impl AttentionPoolingConfig {
    /// Projection starts Xavier-uniform; bias and context vector start at
    /// zero, so the initial weighting is uniform over time.
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<AttentionPooling<B>, TrainError> {
        if self.d_hidden == 0 || self.attention_size == 0 {
            return Err(TrainError::config(format!(
                "attention needs non-zero sizes, got hidden={} attention={}",
                self.d_hidden, self.attention_size
            )));
        }
        let projection = Initializer::XavierUniform { gain: 1.0 }.init_with(
            [self.d_hidden, self.attention_size],
            Some(self.d_hidden),
            Some(self.attention_size),
            device,
        );
        let bias    = Initializer::Zeros.init([self.attention_size], device);
        let context = Initializer::Zeros.init([self.attention_size], device);

        Ok(AttentionPooling { projection, bias, context })
    }
}

#[derive(Module, Debug)]
pub struct AttentionPooling<B: Backend> {
    /// W: [H, A]
    pub projection: Param<Tensor<B, 2>>,
    /// b: [A]
    pub bias: Param<Tensor<B, 1>>,
    /// u: [A]
    pub context: Param<Tensor<B, 1>>,
}

pub struct AttentionOutput<B: Backend> {
    /// Pooled representation [B, H]
    pub pooled: Tensor<B, 2>,
    /// Attention weights α [B, T]
    pub weights: Tensor<B, 2>,
}

impl<B: Backend> AttentionPooling<B> {
    pub fn forward(&self, hidden: Tensor<B, 3>) -> AttentionOutput<B> {
        let [batch, steps, d_hidden] = hidden.dims();
        let [_, attention_size]      = self.projection.val().dims();

        // [B*T, H] × [H, A] → [B*T, A]
        let v = (hidden.clone().reshape([batch * steps, d_hidden]).matmul(self.projection.val())
            + self.bias.val().unsqueeze::<2>())
        .tanh();

        // [B*T, A] × [A, 1] → [B, T]
        let scores = v
            .matmul(self.context.val().reshape([attention_size, 1]))
            .reshape([batch, steps]);

        // softmax subtracts the row max before exponentiating
        let weights = softmax(scores, 1);

        // [B, T, H] * [B, T, 1] summed over T → [B, H]
        let pooled = (hidden * weights.clone().unsqueeze_dim::<3>(2))
            .sum_dim(1)
            .reshape([batch, d_hidden]);

        AttentionOutput { pooled, weights }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::Distribution;

    type TestBackend = NdArray;

    fn to_vec<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().convert::<f32>().to_vec().unwrap()
    }

    fn pooling(d_hidden: usize, attention_size: usize) -> AttentionPooling<TestBackend> {
        let device = Default::default();
        let mut pool = AttentionPoolingConfig::new(d_hidden, attention_size)
            .init::<TestBackend>(&device)
            .unwrap();
        // Non-zero context vector so the weights are not trivially uniform
        pool.context = Param::from_tensor(Tensor::random(
            [attention_size],
            Distribution::Normal(0.0, 1.0),
            &device,
        ));
        pool
    }

    #[test]
    fn test_weights_sum_to_one_and_are_non_negative() {
        let device = Default::default();
        let pool   = pooling(6, 4);
        let hidden = Tensor::<TestBackend, 3>::random([3, 7, 6], Distribution::Normal(0.0, 2.0), &device);

        let out = pool.forward(hidden);
        assert_eq!(out.weights.dims(), [3, 7]);
        assert_eq!(out.pooled.dims(), [3, 6]);

        let sums = to_vec(out.weights.clone().sum_dim(1));
        for s in sums {
            assert!((s - 1.0).abs() < 1e-5, "row sums to {s}");
        }
        assert!(to_vec(out.weights).iter().all(|&w| w >= 0.0));
    }

    #[test]
    fn test_single_step_returns_the_hidden_vector() {
        let device = Default::default();
        let pool   = pooling(5, 3);
        let hidden = Tensor::<TestBackend, 3>::random([4, 1, 5], Distribution::Normal(0.0, 1.0), &device);

        let out = pool.forward(hidden.clone());
        assert!(to_vec(out.weights).iter().all(|&w| w == 1.0));
        assert_eq!(to_vec(out.pooled), to_vec(hidden.reshape([4, 5])));
    }

    #[test]
    fn test_zero_context_is_mean_pooling() {
        let device = Default::default();
        let pool = AttentionPoolingConfig::new(4, 3).init::<TestBackend>(&device).unwrap();
        let hidden = Tensor::<TestBackend, 3>::random([2, 5, 4], Distribution::Normal(0.0, 1.0), &device);

        let out  = pool.forward(hidden.clone());
        let mean = hidden.mean_dim(1).reshape([2, 4]);
        for (a, b) in to_vec(out.pooled).iter().zip(to_vec(mean)) {
            assert!((a - b).abs() < 1e-5);
        }
    }

    #[test]
    fn test_large_scores_stay_finite() {
        let device   = Default::default();
        let mut pool = pooling(3, 4);
        pool.context = Param::from_tensor(Tensor::full([4], 1.0e4, &device));
        let hidden = Tensor::<TestBackend, 3>::random([2, 6, 3], Distribution::Normal(0.0, 10.0), &device);

        let out = pool.forward(hidden);
        let w   = to_vec(out.weights.clone());
        assert!(w.iter().all(|x| x.is_finite()));
        for s in to_vec(out.weights.sum_dim(1)) {
            assert!((s - 1.0).abs() < 1e-5);
        }
        assert!(to_vec(out.pooled).iter().all(|x| x.is_finite()));
    }

    #[test]
    fn test_zero_attention_size_is_rejected() {
        let res = AttentionPoolingConfig::new(4, 0).init::<TestBackend>(&Default::default());
        assert!(matches!(res, Err(TrainError::Configuration(_))));
    }
}
