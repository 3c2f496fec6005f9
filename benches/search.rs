use cadence_core::{Schedule, ScheduleParams, ScheduleSearch, SearchOptions};
use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid benchmark date")
}

fn semi_monthly_history() -> Vec<NaiveDate> {
    let params = ScheduleParams::semi_monthly(5, 20).expect("valid params");
    Schedule::new(params, -1, None)
        .expect("valid schedule")
        .between(date(2016, 1, 1), date(2018, 5, 10), true)
        .expect("valid range")
}

fn benchmark_search(c: &mut Criterion) {
    let observed = semi_monthly_history();
    let search = ScheduleSearch::new(SearchOptions::new(date(2018, 5, 10)));

    let mut group = c.benchmark_group("search");
    group.bench_function("semi_monthly_two_years", |b| {
        b.iter(|| {
            let mut rng = ChaCha8Rng::seed_from_u64(17);
            search
                .run_with_rng(black_box(&observed), &mut rng)
                .expect("search should succeed")
        })
    });

    let weekly = Schedule::new(
        ScheduleParams::weekly([chrono::Weekday::Fri]).expect("valid params"),
        1,
        None,
    )
    .expect("valid schedule");
    group.bench_function("weekly_between_one_year", |b| {
        b.iter(|| {
            weekly
                .between(black_box(date(2017, 1, 1)), black_box(date(2018, 1, 1)), true)
                .expect("valid range")
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_search);
criterion_main!(benches);
