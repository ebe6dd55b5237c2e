// learnhub - chapters, practice answers and exams

use learnhub::cli;

#[tokio::main]
async fn main() {
    if let Err(e) = cli::run().await {
        // debug formatting gives miette's report with help text
        eprintln!("{e:?}");
        std::process::exit(1);
    }
}
