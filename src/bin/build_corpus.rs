use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    vidore_corpora::apps::run_build_corpus(std::env::args().skip(1))
}
