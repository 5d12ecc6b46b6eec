//! Run as `cargo run --example repertoire -- <model dir> [sequences...]`.

use std::env::args;

use bertrep::{Config, Pipeline, Pooling};

fn main() {
    let mut args = args().skip(1);
    let dir = args.next().unwrap_or_else(|| "../data/bertrep_v0000".into());
    let mut sequences = args.collect::<Vec<_>>();
    if sequences.is_empty() {
        sequences.push("Secondo me la colpa è stata dell'azienda.".into());
    }

    let config = Config::from_dir(dir)
        .unwrap()
        .with_token_size(128)
        .unwrap();
    let pipeline = Pipeline::from(config).unwrap();

    let labels = pipeline.predict(&sequences).unwrap();
    for (sequence, label) in sequences.iter().zip(labels) {
        println!("{}: {}", label, sequence);
    }

    for pooling in Pooling::ALL {
        let embedding = pipeline.pool(&sequences, pooling).unwrap();
        assert_eq!(
            embedding.len(),
            pooling.embedding_size(pipeline.embedding_size(), pipeline.token_size()),
        );
        println!("{}: {} values", pooling, embedding.len());
    }
}
