use clap::{Parser, Subcommand};
use log::{warn, LevelFilter};
use metagenome::codec;
use metagenome::file::OutputFile;
use metagenome::{
    read_seqlens, AlleleType, MultiGenome, Offset, PositionSynchronizer, Position, SyncContext,
    SyncError, VariantIngestor, VcfTable,
};
use std::io;
use std::io::Write;

const INFO: &str = "\
metagenome: synchronize genome coordinates into a shared meta-genome
usage: metagenome [--help] <subcommand>

Subcommands:

  sync:      build synchronized offset tables from VCF files.
  translate: translate genome positions into meta-genome positions.

";

#[derive(Parser)]
#[clap(name = "metagenome")]
#[clap(about = INFO)]
struct Cli {
    #[arg(short, long, action = clap::ArgAction::Count)]
    debug: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest the variants of every sample in the given VCF files and write the
    /// synchronized offset tables.
    ///
    /// This will output a TSV with the following columns:
    ///
    ///  - genome name (`reference` for the reference genome)
    ///  - allele (`paternal`, `maternal`, or `.` for the reference)
    ///  - chromosome name
    ///  - position in the genome allele's own coordinates
    ///  - number of meta-genome bases missing from the allele after that position
    ///
    /// Example:
    ///
    ///  $ metagenome sync --seqlens hg38_seqlens.tsv --save trio.state.gz \
    ///      father.vcf.gz mother.vcf.gz child.vcf.gz --output trio_offsets.tsv --header
    Sync {
        /// a TSV file of chromosome names and their lengths
        #[arg(long, required = true)]
        seqlens: String,
        /// the output file path (if not set, uses standard out)
        #[arg(long)]
        output: Option<String>,
        /// save the synchronized state for later `translate` calls
        #[arg(long)]
        save: Option<String>,
        /// the input VCF files (plain or gzip-compressed)
        #[arg(required = true)]
        vcfs: Vec<String>,
        /// Include a header
        #[arg(long, default_value_t = false)]
        header: bool,
    },
    /// Translate positions of one genome allele into meta-genome positions,
    /// using a state saved by `sync --save`.
    Translate {
        /// the saved state
        #[arg(long, required = true)]
        state: String,
        /// the genome (sample) name
        #[arg(long, required = true)]
        genome: String,
        /// the allele, `paternal` or `maternal`
        #[arg(long, default_value = "paternal")]
        allele: String,
        /// the chromosome name
        #[arg(long, required = true)]
        chrom: String,
        /// the positions to translate, in the genome allele's own coordinates
        #[arg(required = true)]
        positions: Vec<Position>,
    },
}

fn write_offsets(
    writer: &mut Box<dyn Write>,
    genome: &str,
    allele: &str,
    chrom: &str,
    offsets: &[Offset],
) -> Result<(), SyncError> {
    for offset in offsets {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            genome,
            allele,
            chrom,
            offset.position(),
            offset.value()
        )?;
    }
    Ok(())
}

fn synchronize(
    seqlens: &str,
    vcfs: &[String],
    output: Option<&str>,
    save: Option<&str>,
    header: bool,
) -> Result<(), SyncError> {
    let sl = read_seqlens(seqlens)?;
    let mut context = SyncContext::new(sl);
    for vcf in vcfs {
        context.add_source(Box::new(VcfTable::from_path(vcf)?));
    }

    let mut multi = MultiGenome::new(&context);
    let report = VariantIngestor::new(&mut context).ingest(&mut multi);
    for failure in report.failures.iter() {
        warn!("{}", failure);
    }
    PositionSynchronizer::new().synchronize(&mut multi);

    // open writer, possibly to stdout
    let mut writer = if let Some(filepath) = output {
        OutputFile::new(filepath, None).writer()?
    } else {
        Box::new(io::stdout())
    };

    if header {
        writeln!(writer, "genome\tallele\tchrom\tposition\tvalue")?;
    }

    for (chromosome, chrom) in multi.chromosomes().iter().enumerate() {
        write_offsets(
            &mut writer,
            "reference",
            ".",
            chrom,
            multi.reference.synchronized.get(chromosome),
        )?;
        for genome in multi.genomes.iter() {
            for allele in AlleleType::BOTH {
                write_offsets(
                    &mut writer,
                    &genome.name,
                    &allele.to_string(),
                    chrom,
                    genome.allele(allele).synchronized.get(chromosome),
                )?;
            }
        }
    }
    writer.flush()?;

    if let Some(filepath) = save {
        codec::save(&multi, filepath)?;
    }
    Ok(())
}

fn translate(
    state: &str,
    genome: &str,
    allele: &str,
    chrom: &str,
    positions: &[Position],
) -> Result<(), SyncError> {
    let multi = codec::load(state)?;
    let allele: AlleleType = allele.parse()?;
    let chromosome = multi.chromosome_index(chrom)?;

    let mut writer = io::stdout();
    for &position in positions {
        let meta = multi.genome_to_meta(genome, allele, chromosome, position)?;
        writeln!(writer, "{}\t{}\t{}", chrom, position, meta)?;
    }
    Ok(())
}

fn run() -> Result<(), SyncError> {
    let cli = Cli::parse();

    let level = match cli.debug {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new().filter_level(level).init();

    match &cli.command {
        Some(Commands::Sync {
            seqlens,
            output,
            save,
            vcfs,
            header,
        }) => synchronize(seqlens, vcfs, output.as_deref(), save.as_deref(), *header),
        Some(Commands::Translate {
            state,
            genome,
            allele,
            chrom,
            positions,
        }) => translate(state, genome, allele, chrom, positions),
        None => {
            println!("{}\n", INFO);
            std::process::exit(1);
        }
    }
}

fn main() {
    match run() {
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
