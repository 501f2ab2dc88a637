// Snapshot tests: lock generated shader text to detect unintended changes.
//
// Uses the library API (load library → parse graph → build_shader) over the
// graphs under `demos/`. Snapshots are inline `insta` snapshots.
//
// Run `cargo insta review` after intentional output changes to update baselines.

use std::path::{Path, PathBuf};

use sgc::codegen::CodegenOptions;
use sgc::library::NodeLibrary;
use sgc::template::TemplateCompiler;

fn project_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .to_path_buf()
}

fn demo(name: &str) -> PathBuf {
    project_root().join("demos").join(name)
}

fn load_library() -> NodeLibrary {
    let mut library = NodeLibrary::new();
    library
        .load_file(&demo("library.json"))
        .unwrap_or_else(|e| panic!("failed to load demo library: {}", e));
    library
}

fn compile_demo(name: &str, options: &CodegenOptions) -> String {
    let library = load_library();
    let nodes = sgc::graph::load_graph_file(&demo(name))
        .unwrap_or_else(|e| panic!("failed to load {}: {}", name, e));
    let shader = sgc::pipeline::build_shader(&library, nodes, &TemplateCompiler, options)
        .unwrap_or_else(|e| panic!("build of {} failed: {}", name, e));
    assert!(
        shader.diagnostics.is_empty(),
        "unexpected warnings: {:?}",
        shader.diagnostics
    );
    shader.source
}

#[test]
fn pulse_shader() {
    let source = compile_demo("pulse.json", &CodegenOptions::default());
    insta::assert_snapshot!(source, @r"
uniform float time;

void main(void) {
    // node n1, double
    float inp_n1_t;
    // node n2, show
    float inp_n2_v;

    // node u, external
    {
        inp_n1_t = time;
    }
    // node n1, double
    {
        float o;
        o = inp_n1_t * 2.0;
        inp_n2_v = o;
    }
    // node n2, show
    {
        gl_FragColor = vec4(vec3(inp_n2_v), 1.0);
    }
}
");
}

#[test]
fn ripple_shader() {
    let source = compile_demo("ripple.json", &CodegenOptions::default());
    insta::assert_snapshot!(source, @r"
uniform vec3 coolColor;
uniform vec3 warmColor;
uniform float time;

void main(void) {
    // node wave1, wave
    float inp_wave1_t;
    // node k, scale
    float inp_k_v;
    // node blend, mix_color
    vec3 inp_blend_a;
    vec3 inp_blend_b;
    float inp_blend_k;
    // node out, frag_out
    vec3 inp_out_color;

    // node cool, external
    {
        inp_blend_b = coolColor;
    }
    // node warm, external
    {
        inp_blend_a = warmColor;
    }
    // node time, external
    {
        inp_wave1_t = time;
    }
    // node wave1, wave
    {
        float w;
        w = sin(inp_wave1_t * 3.0);
        inp_k_v = w;
    }
    // node k, scale
    {
        float o;
        o = inp_k_v * 0.5;
        inp_blend_k = o * 0.5 + 0.5;
    }
    // node blend, mix_color
    {
        vec3 c;
        c = mix(inp_blend_a, inp_blend_b, inp_blend_k);
        inp_out_color = c;
    }
    // node out, frag_out
    {
        gl_FragColor = vec4(inp_out_color, 1.0);
    }
}
");
}

#[test]
fn pulse_shader_compact() {
    let options = CodegenOptions {
        entry_point: "void mainImage(out vec4 fragColor, in vec2 fragCoord)".to_string(),
        indent: "  ".to_string(),
        node_comments: false,
    };
    let source = compile_demo("pulse.json", &options);
    insta::assert_snapshot!(source, @r"
uniform float time;

void mainImage(out vec4 fragColor, in vec2 fragCoord) {
  float inp_n1_t;
  float inp_n2_v;

  {
    inp_n1_t = time;
  }
  {
    float o;
    o = inp_n1_t * 2.0;
    inp_n2_v = o;
  }
  {
    gl_FragColor = vec4(vec3(inp_n2_v), 1.0);
  }
}
");
}

#[test]
fn pulse_dot() {
    let nodes = sgc::graph::load_graph_file(&demo("pulse.json")).unwrap();
    let graph = sgc::graph::build_graph(nodes).unwrap();
    insta::assert_snapshot!(sgc::dot::emit_dot(&graph), @r#"
digraph shader {
    rankdir=LR;
    node [fontname="Helvetica", fontsize=10];
    edge [fontname="Helvetica", fontsize=9];

    "node:u" [label="u: uniform float time", shape=ellipse];
    "node:n1" [label="n1: double", shape=box];
    "node:n2" [label="n2: show", shape=box];

    "node:u" -> "node:n1" [label="time → t"];
    "node:n1" -> "node:n2" [label="o → v"];
}
"#);
}
