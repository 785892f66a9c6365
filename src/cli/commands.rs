// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Five subcommands: two training runs, two inference modes and
// an evaluation pass. clap's derive macros generate the parsing,
// help text and type conversion.

use clap::{Args, Subcommand};

use crate::application::train_continuation_use_case::ContinuationTrainConfig;
use crate::application::train_matcher_use_case::MatcherTrainConfig;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the verse classifier on a verse corpus
    TrainMatcher(TrainMatcherArgs),

    /// Train the verse continuation model
    TrainContinuation(TrainContinuationArgs),

    /// Identify a verse from a (possibly corrupted) fragment
    Find(FindArgs),

    /// Continue a verse from its opening words
    Continue(ContinueArgs),

    /// Report both accuracy figures of the continuation checkpoint
    Eval(EvalArgs),
}

/// Arguments for `train-matcher`.
#[derive(Args, Debug)]
pub struct TrainMatcherArgs {
    /// Plain-text verse corpus, one verse per line
    #[arg(long, default_value = "data/quran.txt")]
    pub corpus: String,

    /// Directory for checkpoints and vocabularies
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Fixed character-window length fed to the classifier
    #[arg(long, default_value_t = 60)]
    pub input_len: usize,

    /// Augmented copies generated per verse
    #[arg(long, default_value_t = 4)]
    pub copies_per_verse: usize,

    /// Character-deletion rate for corrupted copies
    #[arg(long, default_value_t = 0.1)]
    pub deletion_rate: f64,

    #[arg(long, default_value_t = 64)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 100)]
    pub epochs: usize,

    #[arg(long, default_value_t = 5e-4)]
    pub lr: f64,

    /// Label-smoothing mass, e.g. 0.1; omitted means none
    #[arg(long)]
    pub label_smoothing: Option<f32>,

    /// Stop once this training accuracy is reached
    #[arg(long, default_value_t = 0.99)]
    pub target_accuracy: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Continue from the saved checkpoint instead of scratch
    #[arg(long, default_value_t = false)]
    pub resume: bool,
}

impl From<TrainMatcherArgs> for MatcherTrainConfig {
    fn from(a: TrainMatcherArgs) -> Self {
        MatcherTrainConfig {
            corpus_path: a.corpus,
            checkpoint_dir: a.checkpoint_dir,
            input_len: a.input_len,
            copies_per_verse: a.copies_per_verse,
            deletion_rate: a.deletion_rate,
            batch_size: a.batch_size,
            epochs: a.epochs,
            lr: a.lr,
            label_smoothing: a.label_smoothing,
            target_accuracy: a.target_accuracy,
            seed: a.seed,
            resume: a.resume,
            ..Default::default()
        }
    }
}

/// Arguments for `train-continuation`.
#[derive(Args, Debug)]
pub struct TrainContinuationArgs {
    /// Plain-text verse corpus, one verse per line
    #[arg(long, default_value = "data/quran.txt")]
    pub corpus: String,

    /// Directory for checkpoints and vocabularies
    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,

    /// Hidden dimension of the transformer; must divide by heads
    #[arg(long, default_value_t = 128)]
    pub d_model: usize,

    #[arg(long, default_value_t = 4)]
    pub num_heads: usize,

    #[arg(long, default_value_t = 4)]
    pub num_layers: usize,

    #[arg(long, default_value_t = 512)]
    pub d_ff: usize,

    /// Positional capacity; prompt + continuation must fit
    #[arg(long, default_value_t = 50)]
    pub max_seq_len: usize,

    /// Continuation length trained and produced, in words
    #[arg(long, default_value_t = 5)]
    pub max_output_words: usize,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    #[arg(long, default_value_t = 500)]
    pub epochs: usize,

    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// Stop once teacher-forced accuracy reaches this
    #[arg(long, default_value_t = 0.999)]
    pub target_accuracy: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Continue from the saved checkpoint instead of scratch
    #[arg(long, default_value_t = false)]
    pub resume: bool,
}

impl From<TrainContinuationArgs> for ContinuationTrainConfig {
    fn from(a: TrainContinuationArgs) -> Self {
        ContinuationTrainConfig {
            corpus_path: a.corpus,
            checkpoint_dir: a.checkpoint_dir,
            d_model: a.d_model,
            num_heads: a.num_heads,
            num_layers: a.num_layers,
            d_ff: a.d_ff,
            max_seq_len: a.max_seq_len,
            max_output_words: a.max_output_words,
            batch_size: a.batch_size,
            epochs: a.epochs,
            lr: a.lr,
            target_accuracy: a.target_accuracy,
            seed: a.seed,
            resume: a.resume,
            ..Default::default()
        }
    }
}

/// Arguments for `find`.
#[derive(Args, Debug)]
pub struct FindArgs {
    /// The spoken fragment to identify
    #[arg(long)]
    pub text: String,

    /// How many candidate verses to print
    #[arg(long, default_value_t = 3)]
    pub top_k: usize,

    #[arg(long, default_value = "data/quran.txt")]
    pub corpus: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

/// Arguments for `continue`.
#[derive(Args, Debug)]
pub struct ContinueArgs {
    /// The opening words of the verse
    #[arg(long)]
    pub text: String,

    /// Words to generate; defaults to the trained length
    #[arg(long)]
    pub max_words: Option<usize>,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}

/// Arguments for `eval`.
#[derive(Args, Debug)]
pub struct EvalArgs {
    #[arg(long, default_value = "data/quran.txt")]
    pub corpus: String,

    #[arg(long, default_value = "checkpoints")]
    pub checkpoint_dir: String,
}
