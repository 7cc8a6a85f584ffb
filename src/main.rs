use biased_sampling::graph::{
    AdjacencyGraph, BidirectionalAdjacencyGraph, Graph, UndirectedAdjacencyGraph,
};
use biased_sampling::graph_stream::open_reader;
use biased_sampling::parameters::{get_and_check_options, Parameters, WalkType, WeightKind};
use biased_sampling::prelude::*;
use biased_sampling::querier::weighted::FULLY_BUFFERED;
use biased_sampling::querier::Orientation;
use biased_sampling::report::{merged_visits, report_distribution, report_walks};
use biased_sampling::rng::{fork_rng, rng_from_seed, SharedRandom};
use biased_sampling::sampler::termination::{
    AnyCondition, CoverageCondition, RehitsCondition, StepsCondition, TimeCondition,
};
use biased_sampling::sampler::{MultiSampler, Sampler, StepLogger};
use biased_sampling::weight_function::{
    DegreeBias, HiddenPartition, TriangleWeight, UniformWeight, VertexReciprocal,
};
use pcg_rand::Pcg64;
use rand::Rng;
use std::io::stdout;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn load_graph(opt: &Parameters) -> Result<Arc<dyn Graph>> {
    let start = Instant::now();
    let adjacency = open_reader(&opt.graph)?.read_entire()?;

    let graph: Arc<dyn Graph> = match opt.orientation {
        Orientation::Undirected => Arc::new(UndirectedAdjacencyGraph::from_adjacency(&adjacency)),
        Orientation::Directed => Arc::new(AdjacencyGraph::from_adjacency(&adjacency)),
        Orientation::Bidirectional => {
            Arc::new(BidirectionalAdjacencyGraph::from_adjacency(&adjacency))
        }
    };

    info!(
        path = %opt.graph.display(),
        vertices = graph.vertex_count(),
        load_s = start.elapsed().as_secs_f64(),
        "graph loaded"
    );
    Ok(graph)
}

fn termination(opt: &Parameters, vertex_count: usize) -> AnyCondition {
    let mut condition = AnyCondition::new();
    if let Some(steps) = opt.steps {
        condition = condition.with(StepsCondition::new(steps));
    }
    if let Some(time) = opt.time {
        condition = condition.with(TimeCondition::new(time));
    }
    if let Some(fraction) = opt.coverage {
        condition = condition.with(CoverageCondition::new(vertex_count, fraction));
    }
    if let Some(hits) = opt.rehits {
        condition = condition.with(RehitsCondition::new(hits));
    }
    condition
}

fn create_walk<W: WeightFunction + 'static, R: Rng + Send + 'static>(
    walk: WalkType,
    start: Node,
    querier: &Arc<GraphQuerier>,
    weighted: &Arc<WeightedGraphQuerier<W>>,
    rng: R,
) -> Box<dyn Walk> {
    let q = querier.clone();
    match walk {
        WalkType::Simple => Box::new(RandomWalk::simple(start, q, rng)),
        WalkType::LazySimple => Box::new(RandomWalk::lazy_simple(start, q, rng)),
        WalkType::Weighted => Box::new(RandomWalk::weighted(start, weighted.clone(), rng)),
        WalkType::LazyWeighted => Box::new(RandomWalk::lazy_weighted(start, weighted.clone(), rng)),
        WalkType::MetropolisHastings => Box::new(RandomWalk::metropolis(start, q, rng)),
        WalkType::ContinuousTime => Box::new(RandomWalk::continuous_time(start, q, rng)),
        WalkType::DistributionalIncrements => {
            Box::new(RandomWalk::distributional_increments(start, q, rng))
        }
        WalkType::NegativeExponential => Box::new(RandomWalk::negative_exponential(start, q, rng)),
    }
}

fn execute<W: WeightFunction + 'static>(
    opt: &Parameters,
    graph: Arc<dyn Graph>,
    weight_function: W,
) -> Result<()> {
    let querier = Arc::new(GraphQuerier::new(graph.clone())?);
    let vertex_count = querier.vertex_count();
    assert!(vertex_count > 0, "cannot sample an empty graph");

    let weighted = Arc::new(WeightedGraphQuerier::new(
        GraphQuerier::new(graph)?,
        weight_function,
        opt.degree_threshold.unwrap_or(FULLY_BUFFERED),
    ));

    let mut master = rng_from_seed(opt.seed_value);
    let shared = SharedRandom::new(fork_rng::<Pcg64>(&mut master));

    if let Some(dir) = &opt.log_dir {
        std::fs::create_dir_all(dir)?;
    }

    let samplers = (0..opt.walks)
        .map(|job_id| -> Result<Sampler> {
            let start = master.gen_range(0..vertex_count);
            let walk = if opt.shared_rng {
                create_walk(opt.walk, start, &querier, &weighted, shared.clone())
            } else {
                create_walk(opt.walk, start, &querier, &weighted, fork_rng::<Pcg64>(&mut master))
            };

            let mut sampler = Sampler::new(job_id, walk, termination(opt, vertex_count));
            if opt.report_visits {
                sampler = sampler.with_visit_statistics();
            }
            if let Some(dir) = &opt.log_dir {
                let log = StepLogger::create(dir.join(format!("walk_{}.csv", job_id)))?;
                sampler = sampler.with_observer(log);
            }
            Ok(sampler)
        })
        .collect::<Result<Vec<_>>>()?;

    let multi = MultiSampler::new(opt.num_threads.unwrap_or_else(num_cpus::get));

    let start = Instant::now();
    let reports = multi.run(samplers)?;
    let runtime = start.elapsed();

    println!("runtime_s:{}", runtime.as_secs_f64());
    println!("simulated_time:{}", multi.simulated_time());
    println!(
        "graph_queries:{}",
        querier.total_queries() + weighted.querier().total_queries()
    );
    if opt.walk.is_weighted() {
        println!("weight_function:{}", weighted.policy_name());
        println!("mappings_built:{}", weighted.mappings_built());
        println!("cached_vertices:{}", weighted.cached_vertices());
    }

    let mut out = stdout().lock();
    report_walks(&reports, &mut out)?;
    if let Some(visits) = merged_visits(&reports) {
        report_distribution(&visits.hit_distribution(), &mut out)?;
    }

    Ok(())
}

fn run(opt: &Parameters) -> Result<()> {
    let graph = load_graph(opt)?;

    match opt.weight {
        WeightKind::Uniform => execute(opt, graph, UniformWeight),
        WeightKind::DegreeBias => execute(opt, graph, DegreeBias::new(opt.beta)),
        WeightKind::VertexReciprocal => execute(opt, graph, VertexReciprocal),
        WeightKind::Triangle => execute(opt, graph, TriangleWeight),
        WeightKind::HiddenPartition => execute(
            opt,
            graph,
            HiddenPartition::new(opt.partition_bias, opt.partition_size),
        ),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let opt = get_and_check_options();

    if let Err(e) = run(&opt) {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
