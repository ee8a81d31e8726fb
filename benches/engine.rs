use std::sync::Arc;

use chrono::{NaiveDate, TimeZone, Utc};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use wage_ledger::clock::{FixedClock, SharedClock};
use wage_ledger::{Amount, Command, Engine};

fn clock() -> SharedClock {
    Arc::new(FixedClock(Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()))
}

/// Generates valid wallet command sequences for benchmarking.
///
/// Pattern per user (repeating):
/// 1. Deposit 100
/// 2. Deposit 50
/// 3. Withdraw 30
/// 4. Transfer 10 to the next user
///
/// This ensures debits never exceed the balance.
pub struct CommandGenerator {
    num_users: u32,
    commands_per_user: u32,
    current_user: u32,
    current_step: u32,
}

impl CommandGenerator {
    pub fn new(num_users: u32, commands_per_user: u32) -> Self {
        Self {
            num_users,
            commands_per_user,
            current_user: 1,
            current_step: 0,
        }
    }

    fn user(id: u32) -> String {
        format!("user{id}")
    }
}

impl Iterator for CommandGenerator {
    type Item = Command;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current_user > self.num_users {
            return None;
        }

        let user = Self::user(self.current_user);
        let command = match self.current_step % 4 {
            0 => Command::Deposit {
                user,
                amount: Amount::from_major(100),
                title: "Salary".into(),
            },
            1 => Command::Deposit {
                user,
                amount: Amount::from_major(50),
                title: "Bonus".into(),
            },
            2 => Command::Withdraw {
                user,
                amount: Amount::from_major(30),
            },
            _ => {
                let to = Self::user(self.current_user % self.num_users + 1);
                Command::Transfer {
                    from: user,
                    recipient_name: to.clone(),
                    to,
                    amount: Amount::from_major(10),
                }
            }
        };

        self.current_step += 1;

        // Move to next user after commands_per_user commands
        if self.current_step >= self.commands_per_user {
            self.current_step = 0;
            self.current_user += 1;
        }

        Some(command)
    }
}

/// Request-then-approve pairs, one request per user.
fn advance_commands(num_users: u32) -> Vec<Command> {
    let repayment_date = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
    (1..=num_users)
        .flat_map(|id| {
            [
                Command::RequestAdvance {
                    user: format!("user{id}"),
                    amount: Amount::from_major(10_000),
                    fee: Amount::from_major(350),
                    repayment_date,
                },
                Command::ApproveAdvance {
                    request: id as u64,
                },
            ]
        })
        .collect()
}

fn bench_deposit_only(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_user");

    for count in [10_000u32, 100_000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            b.iter(|| {
                let mut engine = Engine::new(clock());
                for command in CommandGenerator::new(1, count) {
                    let _ = black_box(engine.apply(command));
                }
                engine
            });
        });
    }

    group.finish();
}

fn bench_mixed_commands(c: &mut Criterion) {
    let mut group = c.benchmark_group("mixed");

    for (users, per_user) in [(100, 1_000), (1_000, 100), (10, 10_000)] {
        let label = format!("{users}u_{per_user}cmd");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(users, per_user),
            |b, &(users, per_user)| {
                b.iter(|| {
                    let mut engine = Engine::new(clock());
                    for command in CommandGenerator::new(users, per_user) {
                        let _ = black_box(engine.apply(command));
                    }
                    engine
                });
            },
        );
    }

    group.finish();
}

fn bench_advances(c: &mut Criterion) {
    let mut group = c.benchmark_group("advances");

    group.bench_function("10k_request_approve", |b| {
        b.iter_batched(
            || advance_commands(10_000),
            |commands| {
                let mut engine = Engine::new(clock());
                for command in commands {
                    let _ = black_box(engine.apply(command));
                }
                engine
            },
            criterion::BatchSize::LargeInput,
        );
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_deposit_only,
    bench_mixed_commands,
    bench_advances
);
criterion_main!(benches);
