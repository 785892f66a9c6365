// ============================================================
// Layer 5 — Verse Matcher Model
// ============================================================
// Closed-set classifier: a fixed-length character window maps
// to one logit per verse identity. Embedding lookup, the
// window flattened into one vector, two hidden layers with
// ReLU and dropout, then a linear projection to the corpus
// cardinality. Stateless across calls — one forward pass per
// prediction.

use burn::{
    nn::{
        loss::CrossEntropyLossConfig, Dropout, DropoutConfig, Embedding, EmbeddingConfig, Linear,
        LinearConfig,
    },
    prelude::*,
};

#[derive(Config, Debug)]
pub struct VerseMatcherConfig {
    pub vocab_size: usize,
    /// Fixed token-window length
    pub input_len: usize,
    /// Corpus cardinality — one class per verse
    pub output_size: usize,
    #[config(default = 64)]
    pub embed_dim: usize,
    #[config(default = 512)]
    pub hidden_size: usize,
    #[config(default = 0.3)]
    pub dropout: f64,
}

impl VerseMatcherConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> VerseMatcherModel<B> {
        VerseMatcherModel {
            embedding: EmbeddingConfig::new(self.vocab_size, self.embed_dim).init(device),
            fc1: LinearConfig::new(self.input_len * self.embed_dim, self.hidden_size).init(device),
            fc2: LinearConfig::new(self.hidden_size, self.hidden_size).init(device),
            output: LinearConfig::new(self.hidden_size, self.output_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct VerseMatcherModel<B: Backend> {
    embedding: Embedding<B>,
    fc1: Linear<B>,
    fc2: Linear<B>,
    output: Linear<B>,
    dropout: Dropout,
}

impl<B: Backend> VerseMatcherModel<B> {
    /// tokens: [batch, input_len] → logits: [batch, output_size]
    pub fn forward(&self, tokens: Tensor<B, 2, Int>) -> Tensor<B, 2> {
        let x = self.embedding.forward(tokens); // [batch, len, embed]
        let x = x.flatten::<2>(1, 2); // [batch, len * embed]

        let x = self.dropout.forward(burn::tensor::activation::relu(self.fc1.forward(x)));
        let x = self.dropout.forward(burn::tensor::activation::relu(self.fc2.forward(x)));

        self.output.forward(x)
    }

    /// Cross-entropy against the true verse class, with optional
    /// label smoothing to curb overconfidence on near-duplicate
    /// verses.
    pub fn forward_loss(
        &self,
        tokens: Tensor<B, 2, Int>,
        classes: Tensor<B, 1, Int>,
        label_smoothing: Option<f32>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(tokens);
        let ce = CrossEntropyLossConfig::new()
            .with_smoothing(label_smoothing)
            .init(&logits.device());
        let loss = ce.forward(logits.clone(), classes);
        (loss, logits)
    }
}
