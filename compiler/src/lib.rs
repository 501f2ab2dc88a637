// sgc — Shader Graph Compiler
//
// Library root. Compiles a graph of shader node instances, wired by output
// edges and typed by a node-type library, into one shader program.

pub mod ast;
pub mod codegen;
pub mod diag;
pub mod dot;
pub mod graph;
pub mod lexer;
pub mod library;
pub mod naming;
pub mod parser;
pub mod pipeline;
pub mod schedule;
pub mod template;
