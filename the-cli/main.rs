//! Headless front-end for the picker pipeline.
//!
//! Reads candidates from stdin, runs them through the pipeline with the given
//! query and prints the matched values, best first.

use std::{
  path::PathBuf,
  sync::Arc,
};

use clap::{
  Parser,
  ValueEnum,
};
use eyre::{
  Result,
  WrapErr,
};
use the_picker::{
  Extensions,
  Matcher,
  Picker,
  PickerConfig,
  Sorter,
  builtin::{
    FuzzyMatcher,
    LengthSorter,
    LexicalSorter,
    LinesSource,
    MatchMode,
    SubstringMatcher,
  },
};
use tokio::io::BufReader;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum MatcherKind {
  Fuzzy,
  Path,
  Substring,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SorterKind {
  None,
  Lexical,
  Length,
}

#[derive(Debug, Parser)]
#[command(name = "the-picker")]
#[command(about = "Filter lines from stdin through the picker pipeline")]
struct Cli {
  /// Query to match against
  #[arg(short, long, default_value = "")]
  query: String,

  #[arg(short, long, value_enum, default_value_t = MatcherKind::Fuzzy)]
  matcher: MatcherKind,

  #[arg(short, long, value_enum, default_value_t = SorterKind::None)]
  sorter: SorterKind,

  /// Picker config (TOML)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Print at most this many matches
  #[arg(short, long)]
  limit: Option<usize>,
}

impl Cli {
  fn extensions(&self) -> Extensions {
    let matcher: Arc<dyn Matcher> = match self.matcher {
      MatcherKind::Fuzzy => Arc::new(FuzzyMatcher::new(MatchMode::Plain)),
      MatcherKind::Path => Arc::new(FuzzyMatcher::new(MatchMode::Path)),
      MatcherKind::Substring => Arc::new(SubstringMatcher),
    };
    let source = Arc::new(LinesSource::new(BufReader::new(tokio::io::stdin())));

    let mut extensions = Extensions::new(source, matcher);
    extensions.sorters = match self.sorter {
      SorterKind::None => Vec::new(),
      SorterKind::Lexical => vec![Arc::new(LexicalSorter::new()) as Arc<dyn Sorter>],
      SorterKind::Length => vec![Arc::new(LengthSorter) as Arc<dyn Sorter>],
    };
    extensions
  }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
  env_logger::init();
  let cli = Cli::parse();

  let config = match &cli.config {
    Some(path) => {
      PickerConfig::load(path).wrap_err_with(|| format!("loading {}", path.display()))?
    },
    None => PickerConfig::default(),
  };
  log::debug!("picker config: {config:?}");

  let mut picker = Picker::new(cli.extensions(), config)?.with_query(cli.query.clone());
  picker.open()?;
  picker.run_until_idle().await?;

  let view = picker.view();
  if view.progress.failed() {
    log::warn!("a pipeline stage failed; results may be incomplete");
  }
  if view.truncated {
    log::warn!("input truncated after {} items", view.collected);
  }

  let matched = picker.matched_items();
  let limit = cli.limit.unwrap_or(usize::MAX);
  for item in matched.iter().take(limit) {
    println!("{}", item.value);
  }
  Ok(())
}
