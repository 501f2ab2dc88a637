use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use sgc::codegen::CodegenOptions;
use sgc::graph::NodeInstance;
use sgc::library::NodeLibrary;
use sgc::template::{BodyCompiler, Defines, TemplateCompiler};
use sgc::*;

// Benchmark scenarios: generated graphs over a small fixed library.

const LIBRARY: &str = r#"{ "types": {
    "step": {
        "inputs": [{ "name": "x", "type": "float" }],
        "outputs": [{ "name": "o", "type": "float" }],
        "body": "{{#if CLAMP}}o = clamp(x * {{GAIN}}, 0.0, 1.0);{{else}}o = x * {{GAIN}};{{/if}}",
        "defines": { "GAIN": 1.5 }
    },
    "sum": {
        "inputs": [
            { "name": "a", "type": "float" },
            { "name": "b", "type": "float" }
        ],
        "outputs": [{ "name": "s", "type": "float" }],
        "body": "s = a + b;"
    }
} }"#;

fn library() -> NodeLibrary {
    NodeLibrary::from_json_str(LIBRARY).expect("benchmark library must load")
}

/// `time → s0 → s1 → … → s(n-1)`, listed consumer-first so the sort has work
/// to do.
fn chain_graph(n: usize) -> Vec<NodeInstance> {
    let mut nodes = Vec::with_capacity(n + 1);
    nodes.push(NodeInstance::external("time", "uniform", "float", "time").edge("s0", "x", None));
    for i in 0..n {
        let mut node = NodeInstance::new(format!("s{i}"), "step");
        if i + 1 < n {
            node = node.edge(&format!("s{}", i + 1), "x", None);
        } else {
            node = node.edge("_", "", None);
        }
        if i % 2 == 0 {
            node = node.define("CLAMP", serde_json::json!(true));
        }
        nodes.push(node);
    }
    nodes.reverse();
    nodes
}

/// One external feeding `n` steps, pairwise reduced by `sum` nodes.
fn fan_graph(n: usize) -> Vec<NodeInstance> {
    let mut src = NodeInstance::external("time", "uniform", "float", "time");
    let mut nodes = Vec::new();
    for i in 0..n {
        src = src.edge(&format!("s{i}"), "x", None);
        let input = if i % 2 == 0 { "a" } else { "b" };
        nodes.push(NodeInstance::new(format!("s{i}"), "step").edge(&format!("r{}", i / 2), input, None));
    }
    for j in 0..n.div_ceil(2) {
        nodes.push(NodeInstance::new(format!("r{j}"), "sum"));
    }
    nodes.insert(0, src);
    nodes
}

fn scenarios() -> Vec<(String, Vec<NodeInstance>)> {
    let mut out = Vec::new();
    for n in [10_usize, 100, 1000] {
        out.push((format!("chain/{n}"), chain_graph(n)));
        out.push((format!("fan/{n}"), fan_graph(n)));
    }
    out
}

// Full build latency (build graph -> verify -> sort -> codegen).
fn bench_full_build_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("kpi/full_build_latency");
    let lib = library();
    let opts = CodegenOptions::default();

    for (name, nodes) in scenarios() {
        group.bench_with_input(BenchmarkId::from_parameter(name), &nodes, |b, nodes| {
            b.iter_batched(
                || nodes.clone(),
                |nodes| {
                    let shader =
                        pipeline::build_shader(&lib, black_box(nodes), &TemplateCompiler, &opts)
                            .expect("benchmark graph must build");
                    black_box(shader.source.len());
                },
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

// Phase-level latency on the largest chain.
fn bench_phase_latency(c: &mut Criterion) {
    let lib = library();
    let opts = CodegenOptions::default();
    let nodes = chain_graph(1000);

    {
        let mut group = c.benchmark_group("kpi/phase_latency/sort");
        let g = graph::build_graph(nodes.clone()).expect("benchmark graph must index");
        group.bench_function("chain1000", |b| {
            b.iter(|| {
                let order = schedule::sort(black_box(&g)).expect("benchmark graph is acyclic");
                black_box(order.len());
            });
        });
        group.finish();
    }

    {
        let mut group = c.benchmark_group("kpi/phase_latency/codegen");
        let g = graph::build_graph(nodes.clone()).expect("benchmark graph must index");
        let order = schedule::sort(&g).expect("benchmark graph is acyclic");
        group.bench_function("chain1000", |b| {
            b.iter(|| {
                let r = codegen::assemble(&lib, black_box(&order), &TemplateCompiler, &opts)
                    .expect("benchmark graph must generate");
                black_box(r.source.len());
            });
        });
        group.finish();
    }
}

// Body template compile + render.
fn bench_template(c: &mut Criterion) {
    let lib = library();
    let body = &lib.lookup("step").expect("step type").body;
    let mut defines = Defines::new();
    defines.insert("GAIN".to_string(), serde_json::json!(2.0));
    defines.insert("CLAMP".to_string(), serde_json::json!(true));

    c.bench_function("kpi/template/compile_render", |b| {
        b.iter(|| {
            let f = TemplateCompiler
                .compile("step", black_box(body))
                .expect("benchmark template must compile");
            black_box(f(&defines).expect("benchmark template must render"));
        });
    });
}

criterion_group!(
    benches,
    bench_full_build_latency,
    bench_phase_latency,
    bench_template,
);
criterion_main!(benches);
