// ============================================================
// Layer 5 — Gradient Clipping
// ============================================================
// Global gradient-norm clipping:
//
//   N = sqrt(Σ_p ‖g_p‖²)
//   if N > max_norm:  g_p ← g_p · max_norm / N   for every p
//
// The same pass records, for each parameter, the fraction of
// its gradient entries that are exactly zero. Parameters are
// named by their module path, e.g. "head.output.weight".
//
// Reference: Pascanu et al. (2013) On the difficulty of
//            training recurrent neural networks

use std::marker::PhantomData;

use burn::{
    module::{AutodiffModule, ModuleVisitor, Param},
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};

#[derive(Debug, Clone)]
pub struct GradientReport {
    /// Global norm before clipping
    pub global_norm: f64,
    /// Whether the gradients were rescaled
    pub clipped:     bool,
    /// (module path, fraction of zero gradient entries)
    pub sparsity:    Vec<(String, f64)>,
}

/// Global L2 norm of the gradients of every parameter of `model`.
pub fn global_norm<B, M>(model: &M, grads: &GradientsParams) -> f64
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut stats = GradientStats::<B>::new(grads);
    model.visit(&mut stats);
    stats.sum_sq.sqrt()
}

/// Rescale `grads` in place so their global norm is at most `max_norm`.
///
/// A non-finite norm leaves the gradients untouched; the caller decides
/// whether that is fatal.
pub fn clip_global_norm<B, M>(model: &M, grads: &mut GradientsParams, max_norm: f64) -> GradientReport
where
    B: AutodiffBackend,
    M: AutodiffModule<B>,
{
    let mut stats = GradientStats::<B>::new(grads);
    model.visit(&mut stats);
    let norm     = stats.sum_sq.sqrt();
    let sparsity = stats.sparsity;

    let clipped = norm.is_finite() && norm > max_norm;
    if clipped {
        let mut scale = GradientScale { grads, factor: max_norm / norm };
        model.visit(&mut scale);
    }

    GradientReport { global_norm: norm, clipped, sparsity }
}

struct GradientStats<'a, B: AutodiffBackend> {
    grads:    &'a GradientsParams,
    sum_sq:   f64,
    sparsity: Vec<(String, f64)>,
    /// Field names from the visited root down to the current parameter
    path:     Vec<String>,
    _backend: PhantomData<B>,
}

impl<'a, B: AutodiffBackend> GradientStats<'a, B> {
    fn new(grads: &'a GradientsParams) -> Self {
        Self { grads, sum_sq: 0.0, sparsity: Vec::new(), path: Vec::new(), _backend: PhantomData }
    }
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradientStats<'_, B> {
    fn enter_module(&mut self, name: &str, _container_type: &str) {
        self.path.push(name.to_string());
    }

    fn exit_module(&mut self, _name: &str, _container_type: &str) {
        self.path.pop();
    }

    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        let Some(grad) = self.grads.get::<B::InnerBackend, D>(param.id) else {
            return;
        };
        let numel = grad.shape().num_elements().max(1);
        let zeros = grad.clone().equal_elem(0.0).int().sum().into_scalar().elem::<i64>();
        self.sum_sq += grad.powf_scalar(2.0).sum().into_scalar().elem::<f64>();

        // A bare parameter visited on its own has no enclosing field
        let name = if self.path.is_empty() { param.id.to_string() } else { self.path.join(".") };
        self.sparsity.push((name, zeros as f64 / numel as f64));
    }
}

struct GradientScale<'a> {
    grads:  &'a mut GradientsParams,
    factor: f64,
}

impl<B: AutodiffBackend> ModuleVisitor<B> for GradientScale<'_> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if let Some(grad) = self.grads.remove::<B::InnerBackend, D>(param.id) {
            self.grads.register::<B::InnerBackend, D>(param.id, grad.mul_scalar(self.factor));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};
    use burn::nn::{Linear, LinearConfig};
    use burn::tensor::Distribution;

    type TestBackend = Autodiff<NdArray>;

    fn model_and_grads(scale: f32) -> (Linear<TestBackend>, GradientsParams) {
        let device = Default::default();
        let model  = LinearConfig::new(4, 3).init::<TestBackend>(&device);
        let x      = Tensor::<TestBackend, 2>::random([5, 4], Distribution::Normal(0.0, 1.0), &device);
        let loss   = model.forward(x).sum().mul_scalar(scale);
        let grads  = GradientsParams::from_grads(loss.backward(), &model);
        (model, grads)
    }

    fn weight_grad(model: &Linear<TestBackend>, grads: &GradientsParams) -> Vec<f32> {
        grads
            .get::<NdArray, 2>(model.weight.id)
            .unwrap()
            .into_data()
            .convert::<f32>()
            .to_vec()
            .unwrap()
    }

    #[test]
    fn test_clipped_norm_respects_bound() {
        let (model, mut grads) = model_and_grads(100.0);
        let before = global_norm::<TestBackend, _>(&model, &grads);
        assert!(before > 1.0);

        let report = clip_global_norm::<TestBackend, _>(&model, &mut grads, 1.0);
        assert!(report.clipped);
        assert!((report.global_norm - before).abs() < 1e-6 * before);

        let after = global_norm::<TestBackend, _>(&model, &grads);
        assert!(after <= 1.0 + 1e-4, "norm after clipping: {after}");
    }

    #[test]
    fn test_below_bound_is_unchanged() {
        let (model, mut grads) = model_and_grads(1.0);
        let before = weight_grad(&model, &grads);

        let report = clip_global_norm::<TestBackend, _>(&model, &mut grads, 1.0e6);
        assert!(!report.clipped);
        assert_eq!(weight_grad(&model, &grads), before);
    }

    #[test]
    fn test_sparsity_reports_every_parameter() {
        let (model, mut grads) = model_and_grads(1.0);
        let report = clip_global_norm::<TestBackend, _>(&model, &mut grads, 5.0);
        let names: Vec<&str> = report.sparsity.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["weight", "bias"]);
        assert!(report.sparsity.iter().all(|(_, f)| (0.0..=1.0).contains(f)));
    }

    #[test]
    fn test_sparsity_names_follow_module_path() {
        use crate::ml::model::TextClassifierConfig;
        use crate::ml::Mode;

        let device = Default::default();
        let model  = TextClassifierConfig::new(2, 20, 4, 5, vec![3, 3], 4)
            .init::<TestBackend>(&device)
            .unwrap();
        let tokens = Tensor::<TestBackend, 2, Int>::from_ints([[2, 3, 4, 0, 0], [5, 6, 0, 0, 0]], &device);
        let labels = Tensor::<TestBackend, 1, Int>::from_ints([0, 1], &device);
        let loss   = model.forward_classification(tokens, labels, Mode::Train).loss;
        let mut grads = GradientsParams::from_grads(loss.backward(), &model);

        let report = clip_global_norm::<TestBackend, _>(&model, &mut grads, 5.0);
        let names: Vec<&str> = report.sparsity.iter().map(|(n, _)| n.as_str()).collect();

        assert!(names.contains(&"embedding.weight"), "{names:?}");
        assert!(names.contains(&"head.output.weight"), "{names:?}");
        assert!(names.contains(&"attention.context"), "{names:?}");
        assert!(names.iter().any(|n| n.starts_with("encoder.layers.1.")), "{names:?}");

        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len());
    }

    #[test]
    fn test_zero_gradients_are_fully_sparse() {
        let (model, mut grads) = model_and_grads(0.0);
        let report = clip_global_norm::<TestBackend, _>(&model, &mut grads, 5.0);
        assert_eq!(report.global_norm, 0.0);
        assert!(report.sparsity.iter().all(|(_, f)| *f == 1.0));
    }
}
