use burn::{
    module::{ModuleVisitor, Param},
    nn::{
        loss::CrossEntropyLossConfig,
        Embedding, EmbeddingConfig,
        Linear, LinearConfig,
    },
    prelude::*,
};

use super::{
    attention::{AttentionPooling, AttentionPoolingConfig},
    encoder::{BiLstmStack, BiLstmStackConfig},
    Mode,
};
use crate::domain::error::TrainError;

#[derive(Config, Debug)]
pub struct TextClassifierConfig {
    pub cls_num:         usize,
    pub vocab_size:      usize,
    pub emb_size:        usize,
    pub sequence_length: usize,
    pub hidden_sizes:    Vec<usize>,
    pub attention_size:  usize,
    #[config(default = 1.0)]
    pub keep_prob:       f64,
    #[config(default = 0.0)]
    pub l2_reg_lambda:   f64,
}

impl TextClassifierConfig {
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.cls_num < 2 {
            return Err(TrainError::config(format!("cls_num must be at least 2, got {}", self.cls_num)));
        }
        if self.vocab_size == 0 || self.emb_size == 0 || self.sequence_length == 0 {
            return Err(TrainError::config(format!(
                "vocab_size, emb_size and sequence_length must be positive (got {}, {}, {})",
                self.vocab_size, self.emb_size, self.sequence_length
            )));
        }
        if !(self.l2_reg_lambda >= 0.0 && self.l2_reg_lambda.is_finite()) {
            return Err(TrainError::config(format!(
                "l2_reg_lambda must be a finite non-negative number, got {}",
                self.l2_reg_lambda
            )));
        }
        Ok(())
    }

    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<TextClassifier<B>, TrainError> {
        self.validate()?;

        let embedding = EmbeddingConfig::new(self.vocab_size, self.emb_size).init(device);
        let encoder   = BiLstmStackConfig::new(self.emb_size, self.hidden_sizes.clone())
            .with_keep_prob(self.keep_prob)
            .init(device)?;
        let d_hidden  = encoder.output_size();
        let attention = AttentionPoolingConfig::new(d_hidden, self.attention_size).init(device)?;
        let head      = ClassifierHeadConfig::new(d_hidden, self.cls_num).init(device)?;

        Ok(TextClassifier {
            embedding, encoder, attention, head,
            l2_reg_lambda:   self.l2_reg_lambda,
            sequence_length: self.sequence_length,
        })
    }
}

// ─── Classifier head ──────────────────────────────────────────────────────────

#[derive(Config, Debug)]
pub struct ClassifierHeadConfig {
    pub d_hidden: usize,
    pub cls_num:  usize,
}

impl ClassifierHeadConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<ClassifierHead<B>, TrainError> {
        if self.cls_num < 2 {
            return Err(TrainError::config(format!("cls_num must be at least 2, got {}", self.cls_num)));
        }
        Ok(ClassifierHead {
            output:  LinearConfig::new(self.d_hidden, self.cls_num).init(device),
            cls_num: self.cls_num,
        })
    }
}

/// Affine map from the pooled vector to one logit per class.
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub output: Linear<B>,
    cls_num:    usize,
}

impl<B: Backend> ClassifierHead<B> {
    /// pooled: [batch, d_hidden] → logits: [batch, cls_num]
    pub fn forward(&self, pooled: Tensor<B, 2>) -> Tensor<B, 2> {
        self.output.forward(pooled)
    }

    /// Mean softmax cross-entropy over the batch, plus `penalty` when given.
    pub fn loss(
        &self,
        logits:  Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
        penalty: Option<Tensor<B, 1>>,
    ) -> Tensor<B, 1> {
        let ce = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits, targets);
        match penalty {
            Some(p) => ce + p,
            None    => ce,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.cls_num
    }
}

/// Number of rows whose argmax equals the target class. Ties resolve to the
/// lowest class index.
pub fn count_correct<B: Backend>(logits: Tensor<B, 2>, targets: Tensor<B, 1, Int>) -> usize {
    // argmax(1) returns [batch, 1]; flatten to [batch] before comparing
    let predicted = logits.argmax(1).flatten::<1>(0, 1);
    predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>() as usize
}

// ─── Full model ───────────────────────────────────────────────────────────────

#[derive(Module, Debug)]
pub struct TextClassifier<B: Backend> {
    pub embedding:   Embedding<B>,
    pub encoder:     BiLstmStack<B>,
    pub attention:   AttentionPooling<B>,
    pub head:        ClassifierHead<B>,
    l2_reg_lambda:   f64,
    sequence_length: usize,
}

pub struct ClassifierOutput<B: Backend> {
    /// [batch, cls_num]
    pub logits:    Tensor<B, 2>,
    /// [batch, seq_len]
    pub attention: Tensor<B, 2>,
}

pub struct ClassificationOutput<B: Backend> {
    /// Cross-entropy plus L2 penalty, shape [1]
    pub loss:      Tensor<B, 1>,
    pub logits:    Tensor<B, 2>,
    pub attention: Tensor<B, 2>,
    pub targets:   Tensor<B, 1, Int>,
}

impl<B: Backend> ClassificationOutput<B> {
    pub fn correct(&self) -> usize {
        count_correct(self.logits.clone(), self.targets.clone())
    }

    pub fn accuracy(&self) -> f64 {
        let [batch, _] = self.logits.dims();
        if batch == 0 {
            return 0.0;
        }
        self.correct() as f64 / batch as f64
    }
}

impl<B: Backend> TextClassifier<B> {
    /// tokens: [batch, seq_len] → logits [batch, cls_num] and attention [batch, seq_len]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>, mode: Mode) -> ClassifierOutput<B> {
        let embedded = self.embedding.forward(tokens);          // [B, T, E]
        let hidden   = self.encoder.forward(embedded, mode);    // [B, T, H]
        let pooled   = self.attention.forward(hidden);          // [B, H]
        let logits   = self.head.forward(pooled.pooled);        // [B, C]
        ClassifierOutput { logits, attention: pooled.weights }
    }

    pub fn forward_classification(
        &self,
        tokens:  Tensor<B, 2, Int>,
        targets: Tensor<B, 1, Int>,
        mode:    Mode,
    ) -> ClassificationOutput<B> {
        let output = self.forward(tokens, mode);
        let loss   = self.head.loss(output.logits.clone(), targets.clone(), self.l2_penalty());
        ClassificationOutput {
            loss,
            logits:    output.logits,
            attention: output.attention,
            targets,
        }
    }

    /// λ · Σ‖W‖² over every weight matrix (rank ≥ 2); None when λ is zero.
    pub fn l2_penalty(&self) -> Option<Tensor<B, 1>> {
        if self.l2_reg_lambda == 0.0 {
            return None;
        }
        let mut visitor = SquaredWeights::<B> { total: None };
        self.visit(&mut visitor);
        visitor.total.map(|t| t.mul_scalar(self.l2_reg_lambda))
    }

    pub fn num_classes(&self) -> usize {
        self.head.num_classes()
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}

/// Accumulates Σ w² over weight matrices; biases and vectors are skipped.
struct SquaredWeights<B: Backend> {
    total: Option<Tensor<B, 1>>,
}

impl<B: Backend> ModuleVisitor<B> for SquaredWeights<B> {
    fn visit_float<const D: usize>(&mut self, param: &Param<Tensor<B, D>>) {
        if D < 2 {
            return;
        }
        let squared = param.val().powf_scalar(2.0).sum();
        self.total = Some(match self.total.take() {
            Some(total) => total + squared,
            None        => squared,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;
    use burn::tensor::TensorData;

    type TestBackend = NdArray;

    fn config() -> TextClassifierConfig {
        TextClassifierConfig::new(3, 20, 8, 6, vec![5, 4], 7)
    }

    fn tokens(rows: Vec<Vec<i32>>) -> Tensor<TestBackend, 2, Int> {
        let b = rows.len();
        let t = rows[0].len();
        let flat: Vec<i32> = rows.into_iter().flatten().collect();
        Tensor::from_data(TensorData::new(flat, [b, t]), &Default::default())
    }

    fn targets(labels: Vec<i32>) -> Tensor<TestBackend, 1, Int> {
        let n = labels.len();
        Tensor::from_data(TensorData::new(labels, [n]), &Default::default())
    }

    #[test]
    fn test_forward_shapes() {
        let model = config().init::<TestBackend>(&Default::default()).unwrap();
        let out   = model.forward(
            tokens(vec![vec![2, 3, 4, 0, 0, 0], vec![5, 6, 7, 8, 9, 1]]),
            Mode::Eval,
        );
        assert_eq!(out.logits.dims(), [2, 3]);
        assert_eq!(out.attention.dims(), [2, 6]);
        assert_eq!(model.num_classes(), 3);
        assert_eq!(model.sequence_length(), 6);
    }

    #[test]
    fn test_loss_is_finite_and_positive() {
        let model = config().init::<TestBackend>(&Default::default()).unwrap();
        let out   = model.forward_classification(
            tokens(vec![vec![2, 3, 4, 5, 0, 0], vec![6, 7, 0, 0, 0, 0]]),
            targets(vec![0, 2]),
            Mode::Eval,
        );
        let loss = out.loss.into_scalar().elem::<f64>();
        assert!(loss.is_finite() && loss > 0.0);
    }

    #[test]
    fn test_l2_penalty_only_when_enabled() {
        let device = Default::default();
        let plain  = config().init::<TestBackend>(&device).unwrap();
        assert!(plain.l2_penalty().is_none());

        let reg = config().with_l2_reg_lambda(0.5).init::<TestBackend>(&device).unwrap();
        let penalty = reg.l2_penalty().unwrap().into_scalar().elem::<f64>();
        assert!(penalty > 0.0);

        // The penalty is added on top of cross-entropy
        let batch = tokens(vec![vec![2, 3, 4, 5, 6, 7]]);
        let with    = reg.forward_classification(batch.clone(), targets(vec![1]), Mode::Eval);
        let ce_only = reg.head.loss(with.logits.clone(), targets(vec![1]), None);
        let diff = with.loss.into_scalar().elem::<f64>() - ce_only.into_scalar().elem::<f64>();
        assert!((diff - penalty).abs() < 1e-3 * penalty.max(1.0));
    }

    #[test]
    fn test_count_correct_uses_argmax() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 2>::from_data(
            TensorData::new(vec![0.1f32, 0.9, 2.0, -1.0, 0.5, 0.5], [3, 2]),
            &device,
        );
        // rows predict 1, 0, 0 (tie → lowest index)
        assert_eq!(count_correct(logits.clone(), targets(vec![1, 0, 0])), 3);
        assert_eq!(count_correct(logits, targets(vec![0, 0, 1])), 1);
    }

    #[test]
    fn test_accuracy_of_output() {
        let device = Default::default();
        let out = ClassificationOutput::<TestBackend> {
            loss:      Tensor::zeros([1], &device),
            logits:    Tensor::from_data(TensorData::new(vec![1.0f32, 0.0, 0.0, 1.0], [2, 2]), &device),
            attention: Tensor::zeros([2, 1], &device),
            targets:   targets(vec![0, 0]),
        };
        assert_eq!(out.correct(), 1);
        assert!((out.accuracy() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_single_class() {
        let res = TextClassifierConfig::new(1, 20, 8, 6, vec![4], 4).init::<TestBackend>(&Default::default());
        assert!(matches!(res, Err(TrainError::Configuration(_))));
    }

    #[test]
    fn test_rejects_negative_lambda() {
        let res = config().with_l2_reg_lambda(-0.1).init::<TestBackend>(&Default::default());
        assert!(matches!(res, Err(TrainError::Configuration(_))));
    }
}
