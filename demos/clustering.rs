//! BHC on a small 2D dataset, plus hit alignment between two sequences.

use bhc::cluster::{Bhc, Clustering, NormalWishart};
use bhc::lcs::{FnExtract, MultiLcs};

/// A binding-site hit on one sequence.
struct Hit {
    factor: &'static str,
    start: i64,
    end: i64,
    score: f64,
}

impl Hit {
    fn new(factor: &'static str, start: i64, end: i64, score: f64) -> Self {
        Self {
            factor,
            start,
            end,
            score,
        }
    }
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .format_target(false)
        .init();

    // Three well-separated clusters in 2D.
    let data: Vec<Vec<f64>> = vec![
        // Cluster A (near origin)
        vec![0.0, 0.0],
        vec![0.1, 0.2],
        vec![0.2, 0.1],
        vec![-0.1, 0.1],
        // Cluster B (near (5, 5))
        vec![5.0, 5.0],
        vec![5.1, 4.9],
        vec![4.9, 5.1],
        // Cluster C (near (10, 0))
        vec![10.0, 0.0],
        vec![10.1, 0.1],
        vec![9.9, -0.1],
    ];

    let bhc = Bhc::new(NormalWishart::standard(2).unwrap());

    // --- Merge tree ---
    let tree = bhc.fit(&data).unwrap();
    println!("=== BHC merge tree ===");
    for node in tree.nodes().iter().filter(|n| !n.is_leaf()) {
        println!(
            "  node {:2} = {:2} + {:2}  size {:2}  r = {:.4}",
            node.id,
            node.children[0],
            node.children[1],
            node.size,
            node.score.merge_posterior()
        );
    }
    println!("  leaf order: {:?}", tree.leaves());

    // --- Flat clusters (cut at r = 0.5) ---
    let labels = bhc.fit_predict(&data).unwrap();
    println!("\n=== BHC clusters (cut_threshold = 0.5) ===");
    for (i, label) in labels.iter().enumerate() {
        println!("  point {:2} ({:5.1}, {:5.1}) => cluster {}", i, data[i][0], data[i][1], label);
    }

    // --- Hit alignment ---
    let seq1 = vec![
        Hit::new("SP1", 10, 19, 0.9),
        Hit::new("AP1", 40, 47, 0.7),
        Hit::new("NFKB", 80, 89, 0.8),
    ];
    let seq2 = vec![
        Hit::new("SP1", 5, 14, 0.8),
        Hit::new("P53", 30, 49, 0.6),
        Hit::new("NFKB", 60, 69, 0.9),
    ];
    let extract = FnExtract::new(
        |h: &Hit| h.factor,
        |h: &Hit| h.start,
        |h: &Hit| h.end,
        |h: &Hit| h.score,
    );
    let mut lcs = MultiLcs::new([seq1.as_slice(), seq2.as_slice()], extract).unwrap();
    let best = lcs.calculate_best().unwrap();
    println!("\n=== Common hits ===");
    println!("  {:?} (score {:.2})", best.characters(), best.score);
}
