use crate::querier::Orientation;
use std::path::PathBuf;
use std::str::FromStr;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "biased_sampling",
    about = "Samples a graph with (biased) random walks running in parallel"
)]
pub struct Parameters {
    /// Graph file; the format follows the extension (.bin, .bel, .txt, .csv)
    #[structopt(short = "g", long, parse(from_os_str))]
    pub graph: PathBuf,

    #[structopt(short = "o", long, default_value = "undirected")]
    pub orientation: Orientation,

    #[structopt(short = "w", long, default_value = "srw")]
    pub walk: WalkType,

    /// Edge weights of the weighted walks (wrw, lwrw)
    #[structopt(short = "f", long, default_value = "uniform")]
    pub weight: WeightKind,

    #[structopt(short = "b", long, default_value = "0.5")]
    pub beta: f64,

    #[structopt(long, default_value = "0")]
    pub partition_size: usize,

    #[structopt(long, default_value = "1.0")]
    pub partition_bias: f64,

    /// Vertices of at least this degree are not cached persistently
    #[structopt(long)]
    pub degree_threshold: Option<usize>,

    #[structopt(short = "n", long, default_value = "1")]
    pub walks: usize,

    #[structopt(long)]
    pub steps: Option<u64>,

    #[structopt(long)]
    pub time: Option<f64>,

    /// Fraction of vertices to visit
    #[structopt(long)]
    pub coverage: Option<f64>,

    /// Number of hits of the most visited vertex
    #[structopt(long)]
    pub rehits: Option<usize>,

    #[structopt(short = "t", long)]
    pub num_threads: Option<usize>,

    #[structopt(short = "s", long)]
    pub seed_value: Option<u64>,

    /// All walks draw from one centralized generator
    #[structopt(long)]
    pub shared_rng: bool,

    /// Writes one step log per walk into this directory
    #[structopt(long, parse(from_os_str))]
    pub log_dir: Option<PathBuf>,

    #[structopt(short = "r", long)]
    pub report_visits: bool,
}

#[derive(Eq, Clone, Copy, PartialEq, Debug)]
pub enum WalkType {
    Simple,
    LazySimple,
    Weighted,
    LazyWeighted,
    MetropolisHastings,
    ContinuousTime,
    DistributionalIncrements,
    NegativeExponential,
}

impl WalkType {
    pub fn is_weighted(self) -> bool {
        matches!(self, WalkType::Weighted | WalkType::LazyWeighted)
    }
}

impl FromStr for WalkType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "srw" => Ok(WalkType::Simple),
            "lsrw" => Ok(WalkType::LazySimple),
            "wrw" => Ok(WalkType::Weighted),
            "lwrw" => Ok(WalkType::LazyWeighted),
            "mhrw" => Ok(WalkType::MetropolisHastings),
            "ctsrw" => Ok(WalkType::ContinuousTime),
            "dirw" => Ok(WalkType::DistributionalIncrements),
            "ctrw" => Ok(WalkType::NegativeExponential),
            _ => Err(format!("Unknown walk type: {}", s)),
        }
    }
}

#[derive(Eq, Clone, Copy, PartialEq, Debug)]
pub enum WeightKind {
    Uniform,
    DegreeBias,
    VertexReciprocal,
    Triangle,
    HiddenPartition,
}

impl FromStr for WeightKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(WeightKind::Uniform),
            "degree" => Ok(WeightKind::DegreeBias),
            "vertex" => Ok(WeightKind::VertexReciprocal),
            "triangle" => Ok(WeightKind::Triangle),
            "partition" => Ok(WeightKind::HiddenPartition),
            _ => Err(format!("Unknown weight function: {}", s)),
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "undirected" => Ok(Orientation::Undirected),
            "directed" => Ok(Orientation::Directed),
            "bidirectional" => Ok(Orientation::Bidirectional),
            _ => Err(format!("Unknown orientation: {}", s)),
        }
    }
}

impl Parameters {
    pub fn has_termination(&self) -> bool {
        self.steps.is_some()
            || self.time.is_some()
            || self.coverage.is_some()
            || self.rehits.is_some()
    }
}

pub fn check_options(mut opt: Parameters) -> Parameters {
    assert!(
        opt.has_termination(),
        "at least one of --steps, --time, --coverage, --rehits is required"
    );
    assert!(opt.walks >= 1);

    assert!(opt.beta.is_finite());
    assert!(opt.partition_bias >= 0.0);
    assert!(opt.time.map_or(true, |t| t >= 0.0));
    assert!(opt.coverage.map_or(true, |c| (0.0..=1.0).contains(&c)));

    if opt.num_threads.is_none() {
        opt.num_threads = Some(num_cpus::get());
    }
    assert!(opt.num_threads.unwrap() > 0);

    opt
}

pub fn get_and_check_options() -> Parameters {
    check_options(Parameters::from_args())
}
