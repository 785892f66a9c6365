// ============================================================
// Layer 5 — Continuation Model
// ============================================================
// Decoder-only causal transformer. Every position gets a logit
// distribution over the vocabulary for its next token; the
// training loss only covers the continuation span selected by
// the batch's supervision mask.
//
// Scaled token embedding plus a learned per-position embedding
// (functionally interchangeable with fixed sinusoids; learned
// is what the generation variant of this model family uses),
// then a stack of blocks: causal multi-head self-attention and
// a GELU feed-forward sublayer, each wrapped with residual and
// LayerNorm. Position i never attends past i, and padding
// positions are excluded from attention via the pad mask.

use burn::{
    nn::{
        attention::{generate_autoregressive_mask, MhaInput, MultiHeadAttention,
            MultiHeadAttentionConfig},
        Dropout, DropoutConfig, Embedding, EmbeddingConfig, LayerNorm, LayerNormConfig, Linear,
        LinearConfig,
    },
    prelude::*,
    tensor::activation,
};

use crate::data::batcher::ContinuationBatch;

#[derive(Config, Debug)]
pub struct ContinuationModelConfig {
    pub vocab_size: usize,
    /// Upper bound on sequence length; also sizes the learned
    /// position table, so decoding must never exceed it
    pub max_seq_len: usize,
    #[config(default = 128)]
    pub d_model: usize,
    #[config(default = 4)]
    pub num_heads: usize,
    #[config(default = 4)]
    pub num_layers: usize,
    #[config(default = 512)]
    pub d_ff: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
}

impl ContinuationModelConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> ContinuationModel<B> {
        let blocks = (0..self.num_layers)
            .map(|_| self.init_block(device))
            .collect();
        ContinuationModel {
            token_embedding: EmbeddingConfig::new(self.vocab_size, self.d_model).init(device),
            position_embedding: EmbeddingConfig::new(self.max_seq_len, self.d_model).init(device),
            blocks,
            output: LinearConfig::new(self.d_model, self.vocab_size).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
            d_model: self.d_model,
            max_seq_len: self.max_seq_len,
        }
    }

    fn init_block<B: Backend>(&self, device: &B::Device) -> DecoderBlock<B> {
        DecoderBlock {
            self_attn: MultiHeadAttentionConfig::new(self.d_model, self.num_heads)
                .with_dropout(self.dropout)
                .init(device),
            ffn_linear1: LinearConfig::new(self.d_model, self.d_ff).init(device),
            ffn_linear2: LinearConfig::new(self.d_ff, self.d_model).init(device),
            norm1: LayerNormConfig::new(self.d_model).init(device),
            norm2: LayerNormConfig::new(self.d_model).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        }
    }
}

#[derive(Module, Debug)]
pub struct DecoderBlock<B: Backend> {
    self_attn: MultiHeadAttention<B>,
    ffn_linear1: Linear<B>,
    ffn_linear2: Linear<B>,
    norm1: LayerNorm<B>,
    norm2: LayerNorm<B>,
    dropout: Dropout,
}

impl<B: Backend> DecoderBlock<B> {
    fn forward(
        &self,
        x: Tensor<B, 3>,
        causal_mask: Tensor<B, 3, Bool>,
        pad_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let attn_input = MhaInput::self_attn(x.clone())
            .mask_pad(pad_mask)
            .mask_attn(causal_mask);
        let attn_out = self.self_attn.forward(attn_input).context;
        let x = self.norm1.forward(x + self.dropout.forward(attn_out));

        let ffn_out = self
            .ffn_linear2
            .forward(activation::gelu(self.ffn_linear1.forward(x.clone())));
        self.norm2.forward(x + self.dropout.forward(ffn_out))
    }
}

#[derive(Module, Debug)]
pub struct ContinuationModel<B: Backend> {
    token_embedding: Embedding<B>,
    position_embedding: Embedding<B>,
    blocks: Vec<DecoderBlock<B>>,
    output: Linear<B>,
    dropout: Dropout,
    d_model: usize,
    max_seq_len: usize,
}

impl<B: Backend> ContinuationModel<B> {
    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    /// tokens: [batch, seq_len], pad_mask true at padding →
    /// logits: [batch, seq_len, vocab_size]
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        pad_mask: Tensor<B, 2, Bool>,
    ) -> Tensor<B, 3> {
        let [batch_size, seq_len] = tokens.dims();

        let tok_emb = self
            .token_embedding
            .forward(tokens)
            .mul_scalar((self.d_model as f64).sqrt());

        let positions = Tensor::<B, 1, Int>::arange(0..seq_len as i64, &tok_emb.device())
            .unsqueeze::<2>()
            .expand([batch_size, seq_len]);
        let pos_emb = self.position_embedding.forward(positions);

        let mut x = self.dropout.forward(tok_emb + pos_emb);

        let causal_mask =
            generate_autoregressive_mask::<B>(batch_size, seq_len, &x.device());
        for block in &self.blocks {
            x = block.forward(x, causal_mask.clone(), pad_mask.clone());
        }

        self.output.forward(x)
    }

    /// Masked cross-entropy: per-position CE multiplied by the
    /// supervision mask, summed, divided by the number of
    /// supervised positions (epsilon keeps an all-zero mask from
    /// dividing by zero).
    pub fn forward_loss(&self, batch: ContinuationBatch<B>) -> (Tensor<B, 1>, Tensor<B, 3>) {
        let logits = self.forward(batch.tokens, batch.pad_mask);

        let log_probs = activation::log_softmax(logits.clone(), 2);
        let nll = log_probs
            .gather(2, batch.targets.unsqueeze_dim::<3>(2))
            .squeeze::<2>(2)
            .neg(); // [batch, seq_len]

        let denom = batch.loss_mask.clone().sum().add_scalar(1e-8);
        let loss = (nll * batch.loss_mask).sum().div(denom);
        (loss, logits)
    }
}

/// An all-real (no padding) mask for single-sequence decoding.
pub fn no_padding_mask<B: Backend>(
    batch_size: usize,
    seq_len: usize,
    device: &B::Device,
) -> Tensor<B, 2, Bool> {
    Tensor::<B, 1, Int>::from_ints(vec![0i32; batch_size * seq_len].as_slice(), device)
        .reshape([batch_size, seq_len])
        .equal_elem(1)
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type B = NdArray;

    fn tiny_model(device: &<B as Backend>::Device) -> ContinuationModel<B> {
        ContinuationModelConfig::new(16, 20)
            .with_d_model(8)
            .with_num_heads(2)
            .with_num_layers(1)
            .with_d_ff(16)
            .with_dropout(0.0)
            .init(device)
    }

    #[test]
    fn forward_emits_logits_at_every_position() {
        let device = Default::default();
        let model = tiny_model(&device);
        let tokens = Tensor::<B, 1, Int>::from_ints([2i32, 4, 6, 7, 5, 8, 3].as_slice(), &device)
            .reshape([1, 7]);
        let pad_mask = no_padding_mask::<B>(1, 7, &device);
        let logits = model.forward(tokens, pad_mask);
        assert_eq!(logits.dims(), [1, 7, 16]);
    }

    #[test]
    fn causal_masking_ignores_future_tokens() {
        // Changing a token must not change the logits of any
        // position strictly before it.
        let device = Default::default();
        let model = tiny_model(&device);

        let a = Tensor::<B, 1, Int>::from_ints([2i32, 4, 6, 7, 5].as_slice(), &device)
            .reshape([1, 5]);
        let b = Tensor::<B, 1, Int>::from_ints([2i32, 4, 6, 7, 9].as_slice(), &device)
            .reshape([1, 5]);
        let pad_mask = no_padding_mask::<B>(1, 5, &device);

        let la = model.forward(a, pad_mask.clone());
        let lb = model.forward(b, pad_mask);

        let da: Vec<f32> = la
            .slice([0..1, 0..4, 0..16])
            .into_data()
            .to_vec()
            .unwrap_or_default();
        let db: Vec<f32> = lb
            .slice([0..1, 0..4, 0..16])
            .into_data()
            .to_vec()
            .unwrap_or_default();
        for (x, y) in da.iter().zip(&db) {
            assert!((x - y).abs() < 1e-5, "future token leaked into the past");
        }
    }
}
