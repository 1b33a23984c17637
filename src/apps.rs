use std::error::Error;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use clap::{Parser, error::ErrorKind};
use tracing::info;

use crate::config::{Locality, ProviderConfig, TabfquadOptions};
use crate::constants::{apps, source};
use crate::data::{PartitionLabel, PartitionedCollection, RecordCollection};
use crate::errors::CorpusError;
use crate::registry::{StrategyName, TestSetFactory, run_strategy};
use crate::sampler::KeySeed;
use crate::source::RecordProvider;
use crate::strategies::tabfquad_key_grouped;

#[derive(Debug, Parser)]
#[command(
    name = "build_corpus",
    disable_help_subcommand = true,
    about = "Assemble a train/test corpus",
    long_about = "Run one named partition strategy (or fetch one pre-split test set) and report partition sizes with a membership fingerprint.",
    after_help = "Locality is taken from --remote when given, otherwise from USE_LOCAL_DATASET (unset or \"1\" means local snapshots)."
)]
/// CLI for `build_corpus`.
///
/// Common usage:
/// - Run a strategy against local snapshots: `build_corpus docvqa`
/// - Fetch from the hub instead: `build_corpus manu_embeddings --remote`
/// - Persist partitions: `build_corpus train_set --output-dir /tmp/corpus`
/// - Fetch a pre-split test set: `build_corpus --test-source tabfquad_test_subsampled`
struct BuildCorpusCli {
    #[arg(
        value_parser = parse_strategy_arg,
        required_unless_present_any = ["test_source", "list_strategies"],
        help = "Strategy to run"
    )]
    strategy: Option<StrategyName>,
    #[arg(
        long = "test-source",
        value_name = "NAME",
        conflicts_with = "strategy",
        help = "Fetch the test split of coldoc/<NAME> instead of running a strategy"
    )]
    test_source: Option<String>,
    #[arg(long = "list-strategies", help = "Print registered strategy names and exit")]
    list_strategies: bool,
    #[arg(long, help = "Resolve sources on the hub regardless of USE_LOCAL_DATASET")]
    remote: bool,
    #[arg(
        long = "data-dir",
        value_name = "DIR",
        help = "Root directory holding local snapshots (default ./data_dir)"
    )]
    data_dir: Option<PathBuf>,
    #[arg(
        long = "output-dir",
        value_name = "DIR",
        help = "Write train.jsonl/test.jsonl into this directory"
    )]
    output_dir: Option<PathBuf>,
    #[arg(
        long = "key-seed",
        conflicts_with = "test_source",
        help = "Pin the key draw of tabfquad_retrieving to this seed"
    )]
    key_seed: Option<u64>,
}

/// Run `build_corpus` against the snapshot provider.
#[cfg(feature = "huggingface")]
pub fn run_build_corpus<I>(args_iter: I) -> Result<(), Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    run_build_corpus_with(args_iter, crate::source::SnapshotProvider::new)
}

/// Run `build_corpus` with a caller-supplied provider built from the resolved
/// provider settings.
pub fn run_build_corpus_with<P, Build, I>(
    args_iter: I,
    build_provider: Build,
) -> Result<(), Box<dyn Error>>
where
    P: RecordProvider,
    Build: FnOnce(ProviderConfig) -> P,
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let Some(cli) = parse_cli::<BuildCorpusCli, _>(
        std::iter::once("build_corpus".to_string()).chain(args_iter),
    )?
    else {
        return Ok(());
    };

    if cli.list_strategies {
        for name in StrategyName::ALL {
            println!("{name}");
        }
        return Ok(());
    }

    let locality = if cli.remote {
        Locality::Remote
    } else {
        Locality::from_flag(std::env::var(source::LOCALITY_ENV).ok().as_deref())
    };
    let mut config = ProviderConfig {
        locality,
        ..ProviderConfig::default()
    };
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    info!(
        "[corpora:apps] locality={:?} data_dir={}",
        config.locality,
        config.data_dir.display()
    );
    let provider = build_provider(config);

    if let Some(name) = cli.test_source {
        let factory = TestSetFactory::coldoc(&name);
        let test = factory.fetch(&provider)?;
        println!("Test set {}: {} rows", factory.source(), test.len());
        if let Some(dir) = cli.output_dir {
            fs::create_dir_all(&dir)?;
            let path = dir.join(apps::TEST_FILENAME);
            write_jsonl(&path, &test)?;
            println!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let Some(name) = cli.strategy else {
        return Err(CorpusError::Configuration("no strategy given".into()).into());
    };
    let partitioned = match (name, cli.key_seed) {
        (StrategyName::Tabfquad, Some(seed)) => tabfquad_key_grouped(
            &provider,
            &TabfquadOptions {
                key_seed: KeySeed::Fixed(seed),
                ..TabfquadOptions::default()
            },
        )?,
        (_, Some(_)) => {
            return Err(CorpusError::Configuration(format!(
                "--key-seed only applies to {}",
                StrategyName::Tabfquad
            ))
            .into());
        }
        (name, None) => run_strategy(&provider, name)?,
    };

    print_partition_summary(name, &partitioned);
    if let Some(dir) = cli.output_dir {
        write_partitions(&dir, &partitioned)?;
    }
    Ok(())
}

fn print_partition_summary(name: StrategyName, partitioned: &PartitionedCollection) {
    println!("=== {name} ===");
    for label in [PartitionLabel::Train, PartitionLabel::Test] {
        let collection = partitioned.get(label);
        println!(
            "  {:<5} rows={:<8} fields=[{}]",
            label,
            collection.len(),
            collection.schema().join(", ")
        );
    }
    println!(
        "  fingerprint={:016x}",
        partitioned.fingerprint(name.natural_key())
    );
}

fn write_partitions(dir: &Path, partitioned: &PartitionedCollection) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(dir)?;
    for (label, filename) in [
        (PartitionLabel::Train, apps::TRAIN_FILENAME),
        (PartitionLabel::Test, apps::TEST_FILENAME),
    ] {
        let path = dir.join(filename);
        write_jsonl(&path, partitioned.get(label))?;
        println!("Wrote {}", path.display());
    }
    Ok(())
}

fn write_jsonl(path: &Path, collection: &RecordCollection) -> Result<(), CorpusError> {
    let mut writer = BufWriter::new(File::create(path)?);
    for record in collection {
        serde_json::to_writer(&mut writer, record)?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_strategy_arg(raw: &str) -> Result<StrategyName, String> {
    raw.parse::<StrategyName>().map_err(|err| err.to_string())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
