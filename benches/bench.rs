// Criterion benchmarks for Roomie Match

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use roomie_match::core::{decide, filter_candidates};
use roomie_match::models::{LifestylePreferences, Profile, RelationshipRecord, SetField, UserId};

fn create_profile(id: usize, university: &str) -> Profile {
    Profile {
        id: UserId::new(format!("user_{}", id)),
        university: university.to_string(),
        first_name: format!("User {}", id),
        last_name: "Bench".to_string(),
        age: Some(18 + (id % 10) as u8),
        bio: None,
        lifestyle_preferences: LifestylePreferences {
            smoking: Some("No".to_string()),
            ..LifestylePreferences::default()
        },
        profile_picture: None,
    }
}

/// Record that has processed every `step`-th user
fn create_record(size: usize, step: usize) -> RelationshipRecord {
    let mut record = RelationshipRecord::default();
    for i in (0..size).step_by(step) {
        let field = match i % 4 {
            0 => SetField::Likes,
            1 => SetField::Dislikes,
            2 => SetField::Matches,
            _ => SetField::Roommates,
        };
        record.set_mut(field).insert(UserId::new(format!("user_{}", i)));
    }
    record
}

fn bench_filter_candidates(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_candidates");
    let actor = create_profile(0, "State University");

    for size in [100, 1_000, 10_000].iter() {
        let snapshot: Vec<Profile> = (0..*size)
            .map(|i| {
                let university = if i % 5 == 0 { "Other College" } else { "State University" };
                create_profile(i, university)
            })
            .collect();
        let record = create_record(*size, 3);

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| filter_candidates(black_box(&actor), black_box(&snapshot), black_box(&record)));
        });
    }

    group.finish();
}

fn bench_decide(c: &mut Criterion) {
    let a = UserId::from("user_a");
    let b = UserId::from("user_b");
    let mut a_record = create_record(500, 2);
    let mut b_record = create_record(500, 2);
    a_record.matches.insert(b.clone());
    b_record.matches.insert(a.clone());
    b_record.pending_roommate_requests.insert(a.clone());

    c.bench_function("handshake_decide", |bench| {
        bench.iter(|| decide(black_box(&a), black_box(&a_record), black_box(&b), black_box(&b_record)));
    });
}

criterion_group!(benches, bench_filter_candidates, bench_decide);

criterion_main!(benches);
