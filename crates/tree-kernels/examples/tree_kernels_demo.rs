//! Tree Kernels Demonstration
//!
//! This example compares three parse trees with every kernel family:
//! 1. SubTree / SubSetTree - Production-gated fragment counting
//! 2. PartialTree - Fragments over child subsequences
//! 3. SmoothedPartialTree - Partial matching with a node similarity
//!
//! Run with: cargo run --example tree_kernels_demo

use tree_kernels::{
    gram_matrix, normalize_gram_matrix, CharJaccardSimilarity, NodeBuilder, NormalizedTreeKernel,
    PartialTreeKernel, PartialTreeKernelConfig, SmoothedPartialTreeKernel,
    SmoothedPartialTreeKernelConfig, SubTreeKernel, Tree, TreeKernel,
};

fn tagged(tag: &str, word: &str) -> NodeBuilder {
    NodeBuilder::with_children(tag, vec![NodeBuilder::new(word)])
}

fn main() -> anyhow::Result<()> {
    println!("=== Tree Kernels Demonstration ===\n");

    println!("1. Building parse trees...");

    // (S (NP (DT the) (NN dog)) (VP (VBZ barks)))
    let tree1: Tree = Tree::build(NodeBuilder::with_children(
        "S",
        vec![
            NodeBuilder::with_children("NP", vec![tagged("DT", "the"), tagged("NN", "dog")]),
            NodeBuilder::with_children("VP", vec![tagged("VBZ", "barks")]),
        ],
    ));
    // (S (NP (DT the) (NNS dogs)) (VP (VBP bark)))
    let tree2: Tree = Tree::build(NodeBuilder::with_children(
        "S",
        vec![
            NodeBuilder::with_children("NP", vec![tagged("DT", "the"), tagged("NNS", "dogs")]),
            NodeBuilder::with_children("VP", vec![tagged("VBP", "bark")]),
        ],
    ));
    // (S (NP (PRP it)) (VP (VBD rained)))
    let tree3: Tree = Tree::build(NodeBuilder::with_children(
        "S",
        vec![
            NodeBuilder::with_children("NP", vec![tagged("PRP", "it")]),
            NodeBuilder::with_children("VP", vec![tagged("VBD", "rained")]),
        ],
    ));

    let trees = vec![tree1, tree2, tree3];
    for (i, tree) in trees.iter().enumerate() {
        println!("  Tree {}: {}", i + 1, tree);
    }
    println!();

    println!("2. Raw kernel values");
    println!();

    let kernels: Vec<Box<dyn TreeKernel<String>>> = vec![
        Box::new(SubTreeKernel::subtree(0.4)?),
        Box::new(SubTreeKernel::subset_tree(0.4)?),
        Box::new(PartialTreeKernel::new(PartialTreeKernelConfig::new())),
        Box::new(SmoothedPartialTreeKernel::new(
            SmoothedPartialTreeKernelConfig::new().with_similarity_threshold(0.3)?,
            CharJaccardSimilarity,
        )),
    ];

    for kernel in &kernels {
        let mut workspace = kernel.workspace();
        let k12 = kernel.compute_with(&mut workspace, &trees[0], &trees[1])?;
        let k13 = kernel.compute_with(&mut workspace, &trees[0], &trees[2])?;
        let k23 = kernel.compute_with(&mut workspace, &trees[1], &trees[2])?;
        println!("   {:<20} K(1,2) = {:.4}  K(1,3) = {:.4}  K(2,3) = {:.4}", kernel.name(), k12, k13, k23);
    }
    println!("   → Only the smoothed kernel sees that NN/NNS and VBZ/VBP are related");
    println!();

    println!("3. Normalized Gram matrix (PartialTree)");
    println!();

    let ptk = PartialTreeKernel::new(PartialTreeKernelConfig::new().with_lambda(0.5)?);
    let gram = normalize_gram_matrix(&gram_matrix(&ptk, &trees)?)?;
    for row in &gram {
        let cells: Vec<String> = row.iter().map(|v| format!("{:.4}", v)).collect();
        println!("   [{}]", cells.join(", "));
    }
    println!();

    let normalized = NormalizedTreeKernel::new(ptk);
    println!(
        "   NormalizedTreeKernel(tree1, tree2) = {:.4}",
        normalized.compute_trees(&trees[0], &trees[1])?
    );
    println!();

    println!("=== Demonstration Complete ===");
    Ok(())
}
