use criterion::{black_box, criterion_group, criterion_main, Criterion};

use ielts_core::band::BandEstimator;
use ielts_core::model::{
    AnswerMap, AnswerValue, CorrectAnswer, Difficulty, PassageSet, Question, QuestionBody,
    QuestionKind, SkillType, SubQuestion,
};
use ielts_core::scoring::evaluate;

/// Three passages of `per_passage` gap-fill items, every other one answered correctly.
fn make_reading(per_passage: usize) -> (Vec<Question>, AnswerMap) {
    let mut answers = AnswerMap::new();
    let questions = (0..3)
        .map(|p| {
            let items = (0..per_passage)
                .map(|i| {
                    let id = format!("p{p}-q{i}");
                    let value = if i % 2 == 0 { "river" } else { "lake" };
                    answers.record(id.clone(), AnswerValue::from(value));
                    SubQuestion {
                        id,
                        text: "The settlement grew beside a ______.".into(),
                        kind: QuestionKind::GapFill,
                        options: None,
                        correct_answer: CorrectAnswer::AnyOf(vec!["river".into(), "stream".into()]),
                    }
                })
                .collect::<Vec<_>>();
            Question {
                id: format!("p{p}"),
                difficulty: Difficulty::Medium,
                points: per_passage as u32,
                time_limit: None,
                body: QuestionBody::Reading(PassageSet {
                    title: format!("Passage {p}"),
                    items,
                }),
            }
        })
        .collect();
    (questions, answers)
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("evaluate");

    for per_passage in [4, 13, 100] {
        let (questions, answers) = make_reading(per_passage);
        group.bench_function(format!("reading_{}_items", per_passage * 3), |b| {
            b.iter(|| evaluate(SkillType::Reading, black_box(&questions), black_box(&answers)))
        });
    }

    group.finish();
}

fn bench_band_estimate(c: &mut Criterion) {
    let mut group = c.benchmark_group("band_estimate");
    let estimator = BandEstimator::default();

    group.bench_function("40_item_sweep", |b| {
        b.iter(|| {
            for score in 0..=40 {
                black_box(estimator.estimate(black_box(score), black_box(40)));
            }
        })
    });

    group.finish();
}

criterion_group!(benches, bench_evaluate, bench_band_estimate);
criterion_main!(benches);
