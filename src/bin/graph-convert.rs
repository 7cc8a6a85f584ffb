use biased_sampling::graph_stream::{create_writer, edge_count, open_reader_with_buffer};
use biased_sampling::prelude::*;
use std::path::PathBuf;
use std::time::Instant;
use structopt::StructOpt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "graph_convert",
    about = "Streams a graph from one file format into another"
)]
struct Parameters {
    #[structopt(short = "i", long, parse(from_os_str))]
    input: PathBuf,

    #[structopt(short = "o", long, parse(from_os_str))]
    output: PathBuf,

    /// Integers (binary input) or tokens (text input) per read
    #[structopt(short = "b", long, default_value = "32768")]
    buffer: usize,
}

fn convert(opt: &Parameters) -> Result<()> {
    let start = Instant::now();

    let mut reader = open_reader_with_buffer(&opt.input, opt.buffer)?;
    let mut writer = create_writer(&opt.output)?;

    let mut vertices = 0;
    let mut edges = 0;
    while let Some(part) = reader.read_adjacency_list()? {
        let largest = part
            .iter()
            .flat_map(|(&source, targets)| std::iter::once(source).chain(targets.iter().copied()))
            .max();
        if let Some(v) = largest {
            vertices = vertices.max(v + 1);
        }
        edges += edge_count(&part);

        writer.write_next_part(&part)?;
        debug!(position = reader.position(), len = reader.len(), "converted part");
    }
    writer.finish()?;

    println!("vertices:{}", vertices);
    println!("edges:{}", edges);
    println!("runtime_s:{}", start.elapsed().as_secs_f64());
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opt = Parameters::from_args();
    assert!(opt.buffer > 0);

    if let Err(e) = convert(&opt) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
