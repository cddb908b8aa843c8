// ============================================================
// Layer 5 — Bidirectional LSTM Encoder
// ============================================================
// Each layer runs two independent LSTM cells over the same
// input sequence:
//
//   forward cell   reads t = 0 … T-1
//   backward cell  reads t = T-1 … 0, output re-reversed so
//                  position t lines up with the forward output
//
// The two [B, T, h] outputs are concatenated to [B, T, 2h]
// and then folded: the first half is added to the second
// half, giving [B, T, h]. The next layer therefore consumes
// width h, and the stack as a whole emits the last layer's h.
//
// Dropout (keep probability p) is applied to each direction's
// output in Mode::Train only.
//
//   x [B, T, E] → layer 0 → [B, T, h0] → layer 1 → [B, T, h1] …

use burn::{
    nn::{Dropout, DropoutConfig, Lstm, LstmConfig},
    prelude::*,
};

use super::Mode;
use crate::domain::error::TrainError;

#[derive(Config, Debug)]
pub struct BiLstmStackConfig {
    /// Width of the embedded tokens fed to the first layer
    pub d_input: usize,
    /// Per-direction hidden size of each layer, bottom to top
    pub hidden_sizes: Vec<usize>,
    /// Dropout keep probability used in Mode::Train
    #[config(default = 1.0)]
    pub keep_prob: f64,
}

impl BiLstmStackConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Result<BiLstmStack<B>, TrainError> {
        if self.hidden_sizes.is_empty() {
            return Err(TrainError::config("the encoder needs at least one LSTM layer"));
        }
        if let Some(pos) = self.hidden_sizes.iter().position(|&h| h == 0) {
            return Err(TrainError::config(format!("hidden size of layer {pos} is zero")));
        }
        if self.d_input == 0 {
            return Err(TrainError::config("encoder input width is zero"));
        }
        if !(self.keep_prob > 0.0 && self.keep_prob <= 1.0) {
            return Err(TrainError::config(format!(
                "keep_prob must be in (0, 1], got {}",
                self.keep_prob
            )));
        }

        let mut d_input = self.d_input;
        let mut layers  = Vec::with_capacity(self.hidden_sizes.len());
        for &d_hidden in &self.hidden_sizes {
            layers.push(BiLstmLayer {
                fw_cell: LstmConfig::new(d_input, d_hidden, true).init(device),
                bw_cell: LstmConfig::new(d_input, d_hidden, true).init(device),
                dropout: DropoutConfig::new(1.0 - self.keep_prob).init(),
                d_hidden,
            });
            d_input = d_hidden;
        }

        Ok(BiLstmStack { layers })
    }
}

/// One bidirectional layer.
#[derive(Module, Debug)]
pub struct BiLstmLayer<B: Backend> {
    fw_cell:  Lstm<B>,
    bw_cell:  Lstm<B>,
    dropout:  Dropout,
    d_hidden: usize,
}

impl<B: Backend> BiLstmLayer<B> {
    /// [B, T, d_in] → [B, T, d_hidden]
    pub fn forward(&self, x: Tensor<B, 3>, mode: Mode) -> Tensor<B, 3> {
        let (fw, _) = self.fw_cell.forward(x.clone(), None);

        let (bw, _) = self.bw_cell.forward(x.flip([1]), None);
        let bw = bw.flip([1]);

        let (fw, bw) = match mode {
            Mode::Train => (self.dropout.forward(fw), self.dropout.forward(bw)),
            Mode::Eval  => (fw, bw),
        };

        fold(Tensor::cat(vec![fw, bw], 2))
    }

    pub fn d_hidden(&self) -> usize {
        self.d_hidden
    }
}

#[derive(Module, Debug)]
pub struct BiLstmStack<B: Backend> {
    layers: Vec<BiLstmLayer<B>>,
}

impl<B: Backend> BiLstmStack<B> {
    /// [B, T, d_input] → [B, T, last hidden size]
    pub fn forward(&self, x: Tensor<B, 3>, mode: Mode) -> Tensor<B, 3> {
        self.layers.iter().fold(x, |h, layer| layer.forward(h, mode))
    }

    /// Width of the tensor `forward` returns.
    pub fn output_size(&self) -> usize {
        self.layers.last().map(BiLstmLayer::d_hidden).unwrap_or(0)
    }
}

/// Sum the two halves of the last axis: [B, T, 2h] → [B, T, h].
pub fn fold<B: Backend>(both: Tensor<B, 3>) -> Tensor<B, 3> {
    let [_, _, width] = both.dims();
    let half = width / 2;
    both.clone().narrow(2, 0, half) + both.narrow(2, half, half)
}
