use criterion::{black_box, criterion_group, criterion_main, Criterion};

use std::path::PathBuf;

fn bench_toml_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("toml_parsing");

    let small_toml = generate_quiz_toml(5);
    let medium_toml = generate_quiz_toml(50);
    let large_toml = generate_quiz_toml(200);
    let path = PathBuf::from("bench.toml");

    for (name, toml) in [
        ("5_questions", &small_toml),
        ("50_questions", &medium_toml),
        ("200_questions", &large_toml),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| quizforge_core::parser::parse_quiz_str(black_box(toml), &path))
        });
    }

    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");
    let path = PathBuf::from("bench.toml");
    let Ok(quiz) = quizforge_core::parser::parse_quiz_str(&generate_quiz_toml(200), &path) else {
        return;
    };

    group.bench_function("200_questions", |b| {
        b.iter(|| quizforge_core::parser::validate_quiz(black_box(&quiz)))
    });

    group.finish();
}

fn generate_quiz_toml(num_questions: usize) -> String {
    let mut s = String::from(
        r#"[quiz]
id = "bench"
title = "Benchmark quiz"
training_id = "bench-training"
module_id = "m1"
passing_score = 70
"#,
    );
    for i in 0..num_questions {
        s.push_str(&format!(
            r#"
[[questions]]
id = "q{i}"
type = "multiple-choice"
prompt = "Question number {i}?"
options = ["first", "second", "third", "fourth"]
correct_answer = {}
points = {}
"#,
            i % 4,
            1 + i % 3
        ));
    }
    s
}

criterion_group!(benches, bench_toml_parsing, bench_validation);
criterion_main!(benches);
