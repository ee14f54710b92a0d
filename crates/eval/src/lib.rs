pub mod benchmark;
pub mod test_set;

pub use benchmark::{BenchmarkResults, Benchmarker, CategoryScore};
pub use test_set::{get_test_set, score_answer, QAPair, QuestionType};
