// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction; parsing via clap. All
// business logic lives in Layer 2 (application) — this layer
// only routes and prints.

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, ContinueArgs, EvalArgs, FindArgs, TrainContinuationArgs, TrainMatcherArgs};

#[derive(Parser, Debug)]
#[command(
    name = "ayah-match",
    version = "0.1.0",
    about = "Identify and continue verses from short spoken fragments."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::TrainMatcher(args) => Self::run_train_matcher(args),
            Commands::TrainContinuation(args) => Self::run_train_continuation(args),
            Commands::Find(args) => Self::run_find(args),
            Commands::Continue(args) => Self::run_continue(args),
            Commands::Eval(args) => Self::run_eval(args),
        }
    }

    fn run_train_matcher(args: TrainMatcherArgs) -> Result<()> {
        use crate::application::train_matcher_use_case::TrainMatcherUseCase;

        tracing::info!("Starting matcher training on '{}'", args.corpus);
        TrainMatcherUseCase::new(args.into()).execute()?;
        println!("Matcher training complete. Checkpoint saved.");
        Ok(())
    }

    fn run_train_continuation(args: TrainContinuationArgs) -> Result<()> {
        use crate::application::train_continuation_use_case::TrainContinuationUseCase;

        tracing::info!("Starting continuation training on '{}'", args.corpus);
        TrainContinuationUseCase::new(args.into()).execute()?;
        println!("Continuation training complete. Checkpoint saved.");
        Ok(())
    }

    fn run_find(args: FindArgs) -> Result<()> {
        use crate::application::recall_use_case::FindVerseUseCase;

        let use_case = FindVerseUseCase::new(&args.checkpoint_dir, &args.corpus)?;
        let matches = use_case.find(&args.text, args.top_k);
        if matches.is_empty() {
            println!("No match.");
            return Ok(());
        }
        for m in matches {
            println!("{:>5}  {:>6.2}%  {}", m.number, m.probability * 100.0, m.text);
        }
        Ok(())
    }

    fn run_continue(args: ContinueArgs) -> Result<()> {
        use crate::application::recall_use_case::ContinueVerseUseCase;

        let use_case = ContinueVerseUseCase::new(&args.checkpoint_dir)?;
        let continuation = use_case.continue_verse(&args.text, args.max_words);
        if continuation.is_empty() {
            println!("No continuation.");
        } else {
            println!("{continuation}");
        }
        Ok(())
    }

    fn run_eval(args: EvalArgs) -> Result<()> {
        use crate::application::evaluate_use_case::EvaluateUseCase;

        let report = EvaluateUseCase::new(args.checkpoint_dir, args.corpus).execute()?;
        println!("Samples:                 {}", report.samples);
        println!("Teacher-forced accuracy: {:.2}%", report.teacher_forced * 100.0);
        println!("Autoregressive accuracy: {:.2}%", report.autoregressive * 100.0);
        Ok(())
    }
}
